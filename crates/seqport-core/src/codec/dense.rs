use std::slice::ChunksExact;

use tracing::debug;

use crate::{DenseValue, Element, Error, Result, Shape};

/// Append-only accumulator for one dense pack call.
#[derive(Debug)]
pub struct DenseBuilder<T> {
    shape: Shape,
    sample_size: usize,
    data: Vec<T>,
    sequence_lengths: Vec<usize>,
}

impl<T: Element> DenseBuilder<T> {
    pub fn new(shape: Shape) -> Result<Self> {
        shape.validate()?;
        Ok(Self {
            sample_size: shape.total_size(),
            shape,
            data: Vec::new(),
            sequence_lengths: Vec::new(),
        })
    }

    /// Appends one sequence given as concatenated samples.
    pub fn push_sequence(&mut self, sequence: &[T]) -> Result<()> {
        if sequence.len() % self.sample_size != 0 {
            return Err(Error::MalformedSequence {
                sequence: self.sequence_lengths.len(),
                len: sequence.len(),
                sample_size: self.sample_size,
            });
        }
        self.data.extend_from_slice(sequence);
        self.sequence_lengths.push(sequence.len());
        Ok(())
    }

    pub fn finish(self) -> DenseValue {
        DenseValue {
            shape: self.shape,
            sequence_lengths: self.sequence_lengths,
            data: T::wrap(self.data),
        }
    }
}

/// Packs ragged sequences into one contiguous buffer, preserving order.
pub fn pack_dense<T: Element, S: AsRef<[T]>>(sequences: &[S], shape: &Shape) -> Result<DenseValue> {
    let mut builder = DenseBuilder::new(shape.clone())?;
    for seq in sequences {
        builder.push_sequence(seq.as_ref())?;
    }
    let value = builder.finish();
    debug!(
        shape = %value.shape,
        sequences = value.num_sequences(),
        elements = value.data.len(),
        "packed dense batch"
    );
    Ok(value)
}

/// Sequences recovered from a [`DenseValue`], grouped into samples on demand.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseBatch<T> {
    sample_size: usize,
    sequences: Vec<Vec<T>>,
}

impl<T> DenseBatch<T> {
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequence(&self, i: usize) -> Option<&[T]> {
        self.sequences.get(i).map(Vec::as_slice)
    }

    pub fn sample_count(&self, i: usize) -> usize {
        self.sequences.get(i).map_or(0, |s| s.len() / self.sample_size)
    }

    /// Samples of sequence `i` in encounter order.
    pub fn samples(&self, i: usize) -> ChunksExact<'_, T> {
        self.sequence(i).unwrap_or(&[]).chunks_exact(self.sample_size)
    }

    pub fn sequences(&self) -> &[Vec<T>] {
        &self.sequences
    }

    pub fn into_sequences(self) -> Vec<Vec<T>> {
        self.sequences
    }
}

/// Slices a dense value back into its sequences.
pub fn unpack_dense<T: Element>(value: &DenseValue) -> Result<DenseBatch<T>> {
    value.validate()?;
    let data = value.data.as_slice::<T>()?;

    let mut offset = 0;
    let mut sequences = Vec::with_capacity(value.num_sequences());
    for &len in &value.sequence_lengths {
        sequences.push(data[offset..offset + len].to_vec());
        offset += len;
    }

    Ok(DenseBatch {
        sample_size: value.shape.total_size(),
        sequences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    #[test]
    fn packs_two_ragged_sequences() {
        let shape = Shape::from([3]);
        let batch = vec![vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], vec![7.0, 8.0, 9.0]];

        let packed = pack_dense(&batch, &shape).unwrap();
        assert_eq!(packed.sequence_lengths, vec![6, 3]);
        assert_eq!(
            packed.data.as_slice::<f32>().unwrap(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
        assert_eq!(packed.sample_counts(), vec![2, 1]);

        let unpacked = unpack_dense::<f32>(&packed).unwrap();
        assert_eq!(unpacked.sample_count(0), 2);
        assert_eq!(unpacked.sample_count(1), 1);
        let first: Vec<_> = unpacked.samples(0).collect();
        assert_eq!(first, vec![&[1.0, 2.0, 3.0][..], &[4.0, 5.0, 6.0][..]]);
        assert_eq!(unpacked.into_sequences(), batch);
    }

    #[test]
    fn rejects_partial_sample() {
        let shape = Shape::from([2, 2]);
        let batch = vec![vec![0.0f64; 4], vec![0.0; 5]];
        assert!(matches!(
            pack_dense(&batch, &shape),
            Err(Error::MalformedSequence { sequence: 1, len: 5, sample_size: 4 })
        ));
    }

    #[test]
    fn empty_sequences_survive() {
        let shape = Shape::from([2]);
        let batch: Vec<Vec<f64>> = vec![vec![], vec![1.0, 2.0], vec![]];
        let packed = pack_dense(&batch, &shape).unwrap();
        assert_eq!(packed.data.dtype(), DType::F64);
        assert_eq!(packed.sequence_lengths, vec![0, 2, 0]);
        assert_eq!(unpack_dense::<f64>(&packed).unwrap().into_sequences(), batch);
    }

    #[test]
    fn unpack_checks_element_type() {
        let packed = pack_dense(&[vec![1.0f32]], &Shape::scalar()).unwrap();
        assert!(matches!(
            unpack_dense::<f64>(&packed),
            Err(Error::UnsupportedDataType { .. })
        ));
    }

    #[test]
    fn unpack_reports_truncation() {
        let mut packed = pack_dense(&[vec![1.0f32, 2.0]], &Shape::from([2])).unwrap();
        packed.sequence_lengths.push(2);
        assert!(matches!(
            unpack_dense::<f32>(&packed),
            Err(Error::TruncatedBuffer { expected: 4, got: 2 })
        ));
    }

    #[test]
    fn unpack_rejects_overflowing_lengths() {
        let value = DenseValue {
            shape: Shape::from([1]),
            sequence_lengths: vec![usize::MAX, 1],
            data: Vec::<f32>::new().into(),
        };
        assert!(matches!(
            unpack_dense::<f32>(&value),
            Err(Error::TruncatedBuffer { got: 0, .. })
        ));
    }
}
