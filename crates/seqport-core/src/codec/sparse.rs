use tracing::debug;

use crate::{DType, DenseValue, Element, Error, NumericBuffer, Result, Shape, SparseValue};

/// Non-zero set of one sample. Indices are flat offsets inside the sample,
/// strictly increasing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseSample<T> {
    pub indices: Vec<usize>,
    pub values: Vec<T>,
}

impl<T: Element> SparseSample<T> {
    pub fn new(indices: Vec<usize>, values: Vec<T>) -> Self {
        Self { indices, values }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Expands the sample to `size` elements.
    pub fn to_dense(&self, size: usize) -> Vec<T> {
        let mut out = vec![T::zero(); size];
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            if let Some(slot) = out.get_mut(i) {
                *slot = v;
            }
        }
        out
    }
}

/// Append-only accumulator for the three sparse arrays of one pack call.
#[derive(Debug)]
pub struct SparseBuilder<T> {
    shape: Shape,
    sample_size: usize,
    values: Vec<T>,
    indices: Vec<usize>,
    nnz_counts: Vec<usize>,
    boundaries: Vec<usize>,
}

impl<T: Element> SparseBuilder<T> {
    pub fn new(shape: Shape) -> Result<Self> {
        shape.validate()?;
        Ok(Self {
            sample_size: shape.total_size(),
            shape,
            values: Vec::new(),
            indices: Vec::new(),
            nnz_counts: Vec::new(),
            boundaries: vec![0],
        })
    }

    /// Scans one dense sample in ascending flat order, keeping non-zeros.
    /// The sample must hold exactly `shape.total_size()` elements.
    pub fn push_dense_sample(&mut self, sample: &[T]) -> Result<()> {
        if sample.len() != self.sample_size {
            return Err(Error::MalformedSequence {
                sequence: self.boundaries.len() - 1,
                len: sample.len(),
                sample_size: self.sample_size,
            });
        }
        let mut nnz = 0;
        for (index, &v) in sample.iter().enumerate() {
            if !v.is_zero() {
                self.values.push(v);
                self.indices.push(index);
                nnz += 1;
            }
        }
        self.nnz_counts.push(nnz);
        Ok(())
    }

    pub fn push_sample(&mut self, sample: &SparseSample<T>) -> Result<()> {
        let sample_no = self.nnz_counts.len();
        if sample.indices.len() != sample.values.len() {
            return Err(Error::InconsistentNnzTotal {
                nnz_total: sample.indices.len(),
                values: sample.values.len(),
                indices: sample.indices.len(),
            });
        }
        if let Some(&index) = sample.indices.iter().find(|&&i| i >= self.sample_size) {
            return Err(Error::IndexOutOfRange {
                index,
                size: self.sample_size,
            });
        }
        if sample.indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::UnsortedSparseIndices { sample: sample_no });
        }

        self.values.extend_from_slice(&sample.values);
        self.indices.extend_from_slice(&sample.indices);
        self.nnz_counts.push(sample.nnz());
        Ok(())
    }

    /// Closes the current sequence.
    pub fn end_sequence(&mut self) {
        self.boundaries.push(self.nnz_counts.len());
    }

    pub fn finish(self) -> SparseValue {
        SparseValue {
            shape: self.shape,
            values: T::wrap(self.values),
            indices: self.indices,
            nnz_counts: self.nnz_counts,
            sequence_boundaries: self.boundaries,
        }
    }
}

/// Sparsifies ragged dense sequences sample by sample.
pub fn pack_sparse<T: Element, S: AsRef<[T]>>(
    sequences: &[S],
    shape: &Shape,
) -> Result<SparseValue> {
    let mut builder = SparseBuilder::new(shape.clone())?;
    let sample_size = builder.sample_size;

    for (sequence, seq) in sequences.iter().enumerate() {
        let seq = seq.as_ref();
        if seq.len() % sample_size != 0 {
            return Err(Error::MalformedSequence {
                sequence,
                len: seq.len(),
                sample_size,
            });
        }
        for sample in seq.chunks_exact(sample_size) {
            builder.push_dense_sample(sample)?;
        }
        builder.end_sequence();
    }

    let value = builder.finish();
    debug!(
        shape = %value.shape,
        sequences = value.num_sequences(),
        samples = value.nnz_counts.len(),
        nnz = value.indices.len(),
        "packed sparse batch"
    );
    Ok(value)
}

/// Packs samples that are already in sparse form.
pub fn pack_sparse_samples<T: Element>(
    sequences: &[Vec<SparseSample<T>>],
    shape: &Shape,
) -> Result<SparseValue> {
    let mut builder = SparseBuilder::new(shape.clone())?;
    for seq in sequences {
        for sample in seq {
            builder.push_sample(sample)?;
        }
        builder.end_sequence();
    }
    Ok(builder.finish())
}

/// Regroups the flat sparse arrays into sequences of samples.
///
/// Sample boundaries come only from `nnz_counts`; one count is consumed per
/// sample.
pub fn unpack_sparse<T: Element>(value: &SparseValue) -> Result<Vec<Vec<SparseSample<T>>>> {
    value.validate()?;
    let values = value.values.as_slice::<T>()?;

    let mut cursor = 0;
    let mut sequences = Vec::with_capacity(value.num_sequences());
    for bounds in value.sequence_boundaries.windows(2) {
        let mut samples = Vec::with_capacity(bounds[1] - bounds[0]);
        for &nnz in &value.nnz_counts[bounds[0]..bounds[1]] {
            samples.push(SparseSample {
                indices: value.indices[cursor..cursor + nnz].to_vec(),
                values: values[cursor..cursor + nnz].to_vec(),
            });
            cursor += nnz;
        }
        sequences.push(samples);
    }
    Ok(sequences)
}

/// Like [`unpack_sparse`], expanding every sample to dense form.
pub fn unpack_sparse_dense<T: Element>(value: &SparseValue) -> Result<Vec<Vec<T>>> {
    let size = value.shape.total_size();
    Ok(unpack_sparse::<T>(value)?
        .into_iter()
        .map(|samples| samples.iter().flat_map(|s| s.to_dense(size)).collect())
        .collect())
}

impl SparseValue {
    pub fn to_dense(&self) -> Result<DenseValue> {
        let size = self.shape.total_size();
        let data: NumericBuffer = match self.values.dtype() {
            DType::F32 => unpack_sparse_dense::<f32>(self)?.concat().into(),
            DType::F64 => unpack_sparse_dense::<f64>(self)?.concat().into(),
        };
        Ok(DenseValue {
            shape: self.shape.clone(),
            sequence_lengths: self.sample_counts().iter().map(|n| n * size).collect(),
            data,
        })
    }
}
