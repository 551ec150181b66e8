use anyhow::{bail, ensure, Result};
use seqport_core::{DenseValue, NumericBuffer, Shape};

/// How a ragged batch maps onto one ONNX tensor.
///
/// Leading dynamic axes (at most two) carry the batch: with two the tensor is
/// `[sequences, samples, ..]`, with one it is `[samples, ..]`. The remaining
/// axes are the sample itself in row-major order, which is the reverse of the
/// first-axis-fastest order used by [`Shape`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchLayout {
    pub batch_axes: usize,
    pub sample_dims: Vec<usize>,
}

impl BatchLayout {
    pub fn from_onnx_dims(name: &str, dims: &[i64]) -> Result<Self> {
        let batch_axes = dims.iter().take(2).take_while(|d| **d < 0).count();
        let mut sample_dims = Vec::with_capacity(dims.len() - batch_axes);
        for &d in &dims[batch_axes..] {
            ensure!(
                d > 0,
                "'{name}' has unsupported dimension {d} outside the leading batch axes"
            );
            sample_dims.push(d as usize);
        }
        Ok(Self {
            batch_axes,
            sample_dims,
        })
    }

    pub fn sample_shape(&self) -> Shape {
        let mut dims = self.sample_dims.clone();
        dims.reverse();
        Shape::from_slice(&dims)
    }

    /// ONNX tensor dims for a batch with the given per-sequence sample counts.
    pub fn tensor_dims(&self, sample_counts: &[usize]) -> Result<Vec<usize>> {
        let total: usize = sample_counts.iter().sum();
        let mut dims = match self.batch_axes {
            2 => {
                let per_sequence = sample_counts.first().copied().unwrap_or(0);
                if let Some(n) = sample_counts.iter().find(|n| **n != per_sequence) {
                    bail!(
                        "model needs equal-length sequences, got {per_sequence} and {n} samples"
                    );
                }
                vec![sample_counts.len(), per_sequence]
            }
            1 => vec![total],
            _ => {
                ensure!(
                    total == 1,
                    "model has no batch axis, batch must hold exactly one sample, got {total}"
                );
                Vec::new()
            }
        };
        dims.extend_from_slice(&self.sample_dims);
        Ok(dims)
    }

    /// Rebuilds a dense value from an output tensor. With a single batch axis
    /// the samples are regrouped using `sample_counts` from the inputs when
    /// they add up; otherwise they form one sequence.
    pub fn to_dense(
        &self,
        dims: &[usize],
        data: NumericBuffer,
        sample_counts: &[usize],
    ) -> Result<DenseValue> {
        ensure!(
            dims.len() >= self.batch_axes,
            "output rank {} is below its {} batch axes",
            dims.len(),
            self.batch_axes
        );
        let mut sample = dims[self.batch_axes..].to_vec();
        sample.reverse();
        let shape = Shape::from_slice(&sample);
        let sample_size = shape.total_size();

        let counts = match self.batch_axes {
            2 => vec![dims[1]; dims[0]],
            1 if sample_counts.iter().sum::<usize>() == dims[0] => sample_counts.to_vec(),
            1 => vec![dims[0]],
            _ => vec![1],
        };
        let value = DenseValue {
            shape,
            sequence_lengths: counts.iter().map(|n| n * sample_size).collect(),
            data,
        };
        value.validate()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_dynamic_axes_are_batch() {
        let layout = BatchLayout::from_onnx_dims("x", &[-1, -1, 4, 3]).unwrap();
        assert_eq!(layout.batch_axes, 2);
        assert_eq!(layout.sample_shape(), Shape::from([3, 4]));

        let layout = BatchLayout::from_onnx_dims("x", &[-1, 5]).unwrap();
        assert_eq!(layout.batch_axes, 1);
        assert_eq!(layout.sample_shape(), Shape::from([5]));

        let layout = BatchLayout::from_onnx_dims("x", &[]).unwrap();
        assert_eq!(layout.batch_axes, 0);
        assert_eq!(layout.sample_shape(), Shape::scalar());
    }

    #[test]
    fn inner_dynamic_axis_is_rejected() {
        assert!(BatchLayout::from_onnx_dims("x", &[-1, 4, -1]).is_err());
        assert!(BatchLayout::from_onnx_dims("x", &[-1, -1, -1]).is_err());
    }

    #[test]
    fn tensor_dims_per_layout() {
        let two = BatchLayout::from_onnx_dims("x", &[-1, -1, 3]).unwrap();
        assert_eq!(two.tensor_dims(&[2, 2]).unwrap(), vec![2, 2, 3]);
        assert!(two.tensor_dims(&[2, 1]).is_err());

        let one = BatchLayout::from_onnx_dims("x", &[-1, 3]).unwrap();
        assert_eq!(one.tensor_dims(&[2, 1]).unwrap(), vec![3, 3]);

        let none = BatchLayout::from_onnx_dims("x", &[3]).unwrap();
        assert_eq!(none.tensor_dims(&[1]).unwrap(), vec![3]);
        assert!(none.tensor_dims(&[2]).is_err());
    }

    #[test]
    fn single_batch_axis_output_is_regrouped() {
        let layout = BatchLayout::from_onnx_dims("y", &[-1, 2]).unwrap();
        let data = NumericBuffer::from(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let value = layout.to_dense(&[3, 2], data, &[2, 1]).unwrap();
        assert_eq!(value.shape, Shape::from([2]));
        assert_eq!(value.sequence_lengths, vec![4, 2]);
    }

    #[test]
    fn unmatched_counts_fall_back_to_one_sequence() {
        let layout = BatchLayout::from_onnx_dims("y", &[-1, 2]).unwrap();
        let data = NumericBuffer::from(vec![0.0f64; 6]);
        let value = layout.to_dense(&[3, 2], data, &[1]).unwrap();
        assert_eq!(value.sequence_lengths, vec![6]);
    }

    #[test]
    fn sequence_batched_output() {
        let layout = BatchLayout::from_onnx_dims("y", &[-1, -1, 2, 2]).unwrap();
        let data = NumericBuffer::from(vec![0.0f32; 16]);
        let value = layout.to_dense(&[2, 2, 2, 2], data, &[]).unwrap();
        assert_eq!(value.shape, Shape::from([2, 2]));
        assert_eq!(value.sequence_lengths, vec![8, 8]);
    }
}
