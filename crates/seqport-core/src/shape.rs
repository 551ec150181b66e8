use std::fmt;

use smallvec::SmallVec;

use crate::{Error, Result};

/// Coordinate tuple of one element inside a sample.
pub type Coordinates = SmallVec<[usize; 6]>;

/// Declared per-sample tensor shape.
///
/// Dimension 0 is the fastest-varying axis: the flat offset of a coordinate
/// is `sum(coord[r] * stride[r])` with `stride[0] == 1` and
/// `stride[r] == stride[r - 1] * dims[r - 1]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }

    pub fn scalar() -> Self {
        Self(SmallVec::new())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Number of elements in one sample. A rank-0 shape holds one element.
    /// Saturates at `usize::MAX`; [`Shape::validate`] rejects such shapes.
    pub fn total_size(&self) -> usize {
        self.checked_total_size().unwrap_or(usize::MAX)
    }

    /// `None` when the element count does not fit in `usize`.
    pub fn checked_total_size(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Rejects shapes with a zero-sized dimension or an element count that
    /// overflows `usize`.
    pub fn validate(&self) -> Result<()> {
        if self.0.contains(&0) || self.checked_total_size().is_none() {
            return Err(Error::InvalidShape {
                dims: self.0.to_vec(),
            });
        }
        Ok(())
    }

    pub fn strides(&self) -> SmallVec<[usize; 6]> {
        let mut strides = SmallVec::with_capacity(self.rank());
        let mut acc = 1usize;
        for &d in &self.0 {
            strides.push(acc);
            acc = acc.saturating_mul(d);
        }
        strides
    }

    /// Converts a flat offset in `[0, total_size)` into its coordinate tuple.
    pub fn to_coordinates(&self, flat_index: usize) -> Result<Coordinates> {
        let size = self.total_size();
        if flat_index >= size {
            return Err(Error::IndexOutOfRange {
                index: flat_index,
                size,
            });
        }

        let mut rest = flat_index;
        let mut coords = Coordinates::with_capacity(self.rank());
        for &d in &self.0 {
            coords.push(rest % d);
            rest /= d;
        }
        Ok(coords)
    }

    /// Inverse of [`Shape::to_coordinates`].
    pub fn to_flat_index(&self, coordinates: &[usize]) -> Result<usize> {
        let valid = coordinates.len() == self.rank()
            && coordinates.iter().zip(&self.0).all(|(c, d)| c < d);
        if !valid {
            return Err(Error::InvalidCoordinate {
                coordinates: coordinates.to_vec(),
                shape: self.clone(),
            });
        }

        Ok(coordinates
            .iter()
            .zip(self.strides())
            .map(|(c, stride)| c * stride)
            .sum())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(d: &[usize]) -> Self {
        Self::from_slice(d)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(d: [usize; N]) -> Self {
        Self::from_slice(&d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_dimension_varies_fastest() {
        let s = Shape::from([2, 3, 4]);
        assert_eq!(s.strides().as_slice(), &[1, 2, 6]);
        assert_eq!(s.to_coordinates(1).unwrap().as_slice(), &[1, 0, 0]);
        assert_eq!(s.to_coordinates(2).unwrap().as_slice(), &[0, 1, 0]);
        assert_eq!(s.to_coordinates(23).unwrap().as_slice(), &[1, 2, 3]);
        assert_eq!(s.to_flat_index(&[1, 2, 3]).unwrap(), 23);
    }

    #[test]
    fn scalar_shape() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.total_size(), 1);
        assert!(s.to_coordinates(0).unwrap().is_empty());
        assert_eq!(s.to_flat_index(&[]).unwrap(), 0);
        assert!(matches!(
            s.to_coordinates(1),
            Err(Error::IndexOutOfRange { index: 1, size: 1 })
        ));
    }

    #[test]
    fn unit_dimensions() {
        let s = Shape::from([1, 3, 1]);
        assert_eq!(s.total_size(), 3);
        assert_eq!(s.to_coordinates(2).unwrap().as_slice(), &[0, 2, 0]);
        assert_eq!(s.to_flat_index(&[0, 2, 0]).unwrap(), 2);
    }

    #[test]
    fn rejects_bad_coordinates() {
        let s = Shape::from([2, 2]);
        assert!(matches!(
            s.to_flat_index(&[0]),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            s.to_flat_index(&[0, 2]),
            Err(Error::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            s.to_coordinates(4),
            Err(Error::IndexOutOfRange { index: 4, size: 4 })
        ));
    }

    #[test]
    fn zero_dimension_is_invalid() {
        assert!(Shape::from([3, 0]).validate().is_err());
        assert!(Shape::from([3, 1]).validate().is_ok());
        assert!(Shape::scalar().validate().is_ok());
    }

    #[test]
    fn overflowing_element_count_is_invalid() {
        let s = Shape::from([usize::MAX, 2]);
        assert_eq!(s.checked_total_size(), None);
        assert_eq!(s.total_size(), usize::MAX);
        assert!(matches!(s.validate(), Err(Error::InvalidShape { .. })));
        assert_eq!(s.strides().as_slice(), &[1, usize::MAX]);
    }

    #[test]
    fn display() {
        assert_eq!(Shape::from([2, 2, 1]).to_string(), "[2, 2, 1]");
    }
}
