use crate::{DType, Error, NumericBuffer, Result, Shape};

/// Ragged batch packed into one contiguous buffer.
///
/// Sequence `i` owns `sequence_lengths[i]` consecutive elements of `data`,
/// which is always a whole number of samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseValue {
    pub shape: Shape,
    pub sequence_lengths: Vec<usize>,
    pub data: NumericBuffer,
}

impl DenseValue {
    pub fn new(
        shape: Shape,
        sequence_lengths: Vec<usize>,
        data: impl Into<NumericBuffer>,
    ) -> Result<Self> {
        let value = Self {
            shape,
            sequence_lengths,
            data: data.into(),
        };
        value.validate()?;
        Ok(value)
    }

    pub fn validate(&self) -> Result<()> {
        self.shape.validate()?;
        let sample_size = self.shape.total_size();

        for (sequence, &len) in self.sequence_lengths.iter().enumerate() {
            if len % sample_size != 0 {
                return Err(Error::MalformedSequence {
                    sequence,
                    len,
                    sample_size,
                });
            }
        }

        let got = self.data.len();
        let expected = checked_sum(&self.sequence_lengths)
            .ok_or(Error::TruncatedBuffer {
                expected: usize::MAX,
                got,
            })?;
        if got < expected {
            return Err(Error::TruncatedBuffer { expected, got });
        }
        if got > expected {
            return Err(Error::ExcessData { expected, got });
        }
        Ok(())
    }

    pub fn num_sequences(&self) -> usize {
        self.sequence_lengths.len()
    }

    pub fn sample_counts(&self) -> Vec<usize> {
        let sample_size = self.shape.total_size().max(1);
        self.sequence_lengths
            .iter()
            .map(|len| len / sample_size)
            .collect()
    }
}

/// Ragged batch holding only non-zero elements.
///
/// `indices` are flat offsets local to their own sample. Sample `k` owns
/// `nnz_counts[k]` consecutive entries of `values`/`indices`; sequence `i`
/// owns samples `sequence_boundaries[i]..sequence_boundaries[i + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseValue {
    pub shape: Shape,
    pub values: NumericBuffer,
    pub indices: Vec<usize>,
    pub nnz_counts: Vec<usize>,
    pub sequence_boundaries: Vec<usize>,
}

impl SparseValue {
    pub fn validate(&self) -> Result<()> {
        self.shape.validate()?;

        let nnz_total = checked_sum(&self.nnz_counts).unwrap_or(usize::MAX);
        if nnz_total != self.values.len() || nnz_total != self.indices.len() {
            return Err(Error::InconsistentNnzTotal {
                nnz_total,
                values: self.values.len(),
                indices: self.indices.len(),
            });
        }

        self.validate_boundaries()?;

        let size = self.shape.total_size();
        let mut offset = 0;
        for (sample, &nnz) in self.nnz_counts.iter().enumerate() {
            let run = &self.indices[offset..offset + nnz];
            if let Some(&index) = run.iter().find(|&&i| i >= size) {
                return Err(Error::IndexOutOfRange { index, size });
            }
            if run.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::UnsortedSparseIndices { sample });
            }
            offset += nnz;
        }
        Ok(())
    }

    fn validate_boundaries(&self) -> Result<()> {
        let b = &self.sequence_boundaries;
        match (b.first(), b.last()) {
            (Some(0), Some(&last)) if last == self.nnz_counts.len() => {}
            _ => {
                return Err(Error::MalformedBoundaries(format!(
                    "expected offsets from 0 to {}, got {:?}",
                    self.nnz_counts.len(),
                    b
                )))
            }
        }
        if b.windows(2).any(|w| w[0] > w[1]) {
            return Err(Error::MalformedBoundaries(format!(
                "offsets must be non-decreasing, got {b:?}"
            )));
        }
        Ok(())
    }

    pub fn num_sequences(&self) -> usize {
        self.sequence_boundaries.len().saturating_sub(1)
    }

    pub fn sample_counts(&self) -> Vec<usize> {
        self.sequence_boundaries
            .windows(2)
            .map(|w| w[1].saturating_sub(w[0]))
            .collect()
    }
}

/// Sum of caller-supplied counts, `None` on overflow.
fn checked_sum(counts: &[usize]) -> Option<usize> {
    counts.iter().try_fold(0usize, |acc, &n| acc.checked_add(n))
}

/// The object exchanged with the evaluation engine.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchedValue {
    Dense(DenseValue),
    Sparse(SparseValue),
}

impl BatchedValue {
    pub fn shape(&self) -> &Shape {
        match self {
            BatchedValue::Dense(d) => &d.shape,
            BatchedValue::Sparse(s) => &s.shape,
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            BatchedValue::Dense(d) => d.data.dtype(),
            BatchedValue::Sparse(s) => s.values.dtype(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            BatchedValue::Dense(d) => d.validate(),
            BatchedValue::Sparse(s) => s.validate(),
        }
    }

    pub fn num_sequences(&self) -> usize {
        match self {
            BatchedValue::Dense(d) => d.num_sequences(),
            BatchedValue::Sparse(s) => s.num_sequences(),
        }
    }

    pub fn sample_counts(&self) -> Vec<usize> {
        match self {
            BatchedValue::Dense(d) => d.sample_counts(),
            BatchedValue::Sparse(s) => s.sample_counts(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, BatchedValue::Sparse(_))
    }

    /// Dense view of this value; sparse values are expanded with zeros.
    pub fn into_dense(self) -> Result<DenseValue> {
        match self {
            BatchedValue::Dense(d) => Ok(d),
            BatchedValue::Sparse(s) => s.to_dense(),
        }
    }
}

impl From<DenseValue> for BatchedValue {
    fn from(v: DenseValue) -> Self {
        BatchedValue::Dense(v)
    }
}

impl From<SparseValue> for BatchedValue {
    fn from(v: SparseValue) -> Self {
        BatchedValue::Sparse(v)
    }
}
