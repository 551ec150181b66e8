//! Marshalling between ragged per-sequence sample data and the fixed-shape
//! values an evaluation engine consumes.

pub mod artifact;
pub mod backend;
pub mod codec;
pub mod error;
pub mod registry;
pub mod shape;
pub mod spec;
pub mod tensor;
pub mod value;

pub use artifact::*;
pub use backend::*;
pub use error::{Error, ErrorKind, Result};
pub use registry::VariableRegistry;
pub use shape::{Coordinates, Shape};
pub use spec::*;
pub use tensor::*;
pub use value::*;
