use proptest::prelude::*;
use seqport_core::codec::{
    pack_dense, pack_sparse, pack_sparse_samples, unpack_dense, unpack_sparse,
    unpack_sparse_dense, SparseSample,
};
use seqport_core::Shape;

fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=4, 0..=3)
}

/// A shape plus a ragged batch of dense samples for it, roughly half zeros.
fn dense_batch() -> impl Strategy<Value = (Vec<usize>, Vec<Vec<f32>>)> {
    shape_strategy().prop_flat_map(|dims| {
        let size = dims.iter().product::<usize>();
        let sequence = (0usize..=3).prop_flat_map(move |n| {
            prop::collection::vec(prop_oneof![Just(0.0f32), -100.0f32..100.0], n * size)
        });
        (Just(dims), prop::collection::vec(sequence, 0..=4))
    })
}

fn sparse_batch() -> impl Strategy<Value = (Vec<usize>, Vec<Vec<SparseSample<f64>>>)> {
    shape_strategy().prop_flat_map(|dims| {
        let size = dims.iter().product::<usize>();
        let sample = prop::collection::vec(any::<bool>(), size).prop_flat_map(|mask| {
            let indices: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
            let n = indices.len();
            (Just(indices), prop::collection::vec(1.0f64..10.0, n))
                .prop_map(|(indices, values)| SparseSample::new(indices, values))
        });
        let sequence = prop::collection::vec(sample, 0..=3);
        (Just(dims), prop::collection::vec(sequence, 0..=4))
    })
}

proptest! {
    #[test]
    fn coordinates_round_trip(dims in shape_strategy()) {
        let shape = Shape::from_slice(&dims);
        for i in 0..shape.total_size() {
            let coords = shape.to_coordinates(i).unwrap();
            prop_assert_eq!(coords.len(), shape.rank());
            prop_assert_eq!(shape.to_flat_index(&coords).unwrap(), i);
        }
        prop_assert!(shape.to_coordinates(shape.total_size()).is_err());
    }

    #[test]
    fn dense_round_trip((dims, batch) in dense_batch()) {
        let shape = Shape::from_slice(&dims);
        let packed = pack_dense(&batch, &shape).unwrap();
        for len in &packed.sequence_lengths {
            prop_assert_eq!(len % shape.total_size(), 0);
        }
        prop_assert_eq!(unpack_dense::<f32>(&packed).unwrap().into_sequences(), batch);
    }

    #[test]
    fn sparse_pack_of_dense_round_trip((dims, batch) in dense_batch()) {
        let shape = Shape::from_slice(&dims);
        let packed = pack_sparse(&batch, &shape).unwrap();
        let nnz: usize = packed.nnz_counts.iter().sum();
        prop_assert_eq!(nnz, packed.values.len());
        prop_assert_eq!(nnz, packed.indices.len());
        prop_assert_eq!(unpack_sparse_dense::<f32>(&packed).unwrap(), batch);
    }

    #[test]
    fn sparse_round_trip((dims, batch) in sparse_batch()) {
        let shape = Shape::from_slice(&dims);
        let packed = pack_sparse_samples(&batch, &shape).unwrap();
        let nnz: usize = packed.nnz_counts.iter().sum();
        prop_assert_eq!(nnz, packed.values.len());
        prop_assert_eq!(nnz, packed.indices.len());
        prop_assert_eq!(packed.sequence_boundaries.len(), batch.len() + 1);
        prop_assert_eq!(unpack_sparse::<f64>(&packed).unwrap(), batch);
    }
}
