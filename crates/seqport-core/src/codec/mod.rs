//! Conversions between caller-side ragged batches and [`BatchedValue`]s.
//!
//! Every pack call accumulates into its own builder and only produces a
//! value once the whole batch validated, so a failure never yields a
//! partially filled value.
//!
//! [`BatchedValue`]: crate::BatchedValue

pub mod dense;
pub mod one_hot;
pub mod sparse;

pub use dense::{pack_dense, unpack_dense, DenseBatch, DenseBuilder};
pub use one_hot::{pack_one_hot, unpack_one_hot, unpack_one_hot_dense};
pub use sparse::{
    pack_sparse, pack_sparse_samples, unpack_sparse, unpack_sparse_dense, SparseBuilder,
    SparseSample,
};
