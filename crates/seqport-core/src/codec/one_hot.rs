use std::cmp::Ordering;

use crate::codec::sparse::{SparseBuilder, SparseSample};
use crate::{DenseValue, Element, Error, Result, Shape, SparseValue};

/// Packs sequences of vocabulary indices as one-hot samples of shape
/// `[vocabulary_size]`.
pub fn pack_one_hot<T: Element, S: AsRef<[usize]>>(
    sequences: &[S],
    vocabulary_size: usize,
) -> Result<SparseValue> {
    let mut builder = SparseBuilder::<T>::new(Shape::from([vocabulary_size]))?;
    for seq in sequences {
        for &index in seq.as_ref() {
            builder.push_sample(&SparseSample::new(vec![index], vec![T::one()]))?;
        }
        builder.end_sequence();
    }
    Ok(builder.finish())
}

/// Recovers the hot index of every sample.
pub fn unpack_one_hot(value: &SparseValue) -> Result<Vec<Vec<usize>>> {
    value.validate()?;

    let mut sequences = Vec::with_capacity(value.num_sequences());
    let mut sample = 0;
    for bounds in value.sequence_boundaries.windows(2) {
        let mut seq = Vec::with_capacity(bounds[1] - bounds[0]);
        for k in bounds[0]..bounds[1] {
            let nnz = value.nnz_counts[k];
            if nnz != 1 {
                return Err(Error::NotOneHot { sample: k, nnz });
            }
            seq.push(value.indices[sample]);
            sample += nnz;
        }
        sequences.push(seq);
    }
    Ok(sequences)
}

/// Decodes dense scores into the arg-max index of each sample. Ties resolve
/// to the lowest index.
pub fn unpack_one_hot_dense<T: Element>(value: &DenseValue) -> Result<Vec<Vec<usize>>> {
    let batch = super::unpack_dense::<T>(value)?;
    Ok((0..batch.num_sequences())
        .map(|i| batch.samples(i).map(arg_max).collect())
        .collect())
}

fn arg_max<T: Element>(sample: &[T]) -> usize {
    sample
        .iter()
        .enumerate()
        .fold(None::<(usize, T)>, |best, (i, &v)| match best {
            Some((_, b)) if v.partial_cmp(&b) != Some(Ordering::Greater) => best,
            _ => Some((i, v)),
        })
        .map_or(0, |(i, _)| i)
}
