use std::fmt;

use crate::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Device {
    #[default]
    Cpu,
    Cuda { device_id: u32 },
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda { device_id } => write!(f, "cuda:{device_id}"),
        }
    }
}

/// Element types that may cross the evaluation boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
}

impl DType {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Rust scalar types with a [`DType`] tag.
pub trait Element: sealed::Sealed + Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn zero() -> Self;
    fn one() -> Self;
    fn is_zero(self) -> bool;

    fn wrap(data: Vec<Self>) -> NumericBuffer;
    fn view(buf: &NumericBuffer) -> Option<&[Self]>;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn is_zero(self) -> bool {
        self == 0.0
    }
    fn wrap(data: Vec<Self>) -> NumericBuffer {
        NumericBuffer::F32(data)
    }
    fn view(buf: &NumericBuffer) -> Option<&[Self]> {
        match buf {
            NumericBuffer::F32(v) => Some(v),
            NumericBuffer::F64(_) => None,
        }
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn is_zero(self) -> bool {
        self == 0.0
    }
    fn wrap(data: Vec<Self>) -> NumericBuffer {
        NumericBuffer::F64(data)
    }
    fn view(buf: &NumericBuffer) -> Option<&[Self]> {
        match buf {
            NumericBuffer::F64(v) => Some(v),
            NumericBuffer::F32(_) => None,
        }
    }
}

/// Flat element storage tagged with its element type.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericBuffer {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl NumericBuffer {
    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::F32 => NumericBuffer::F32(Vec::new()),
            DType::F64 => NumericBuffer::F64(Vec::new()),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            NumericBuffer::F32(_) => DType::F32,
            NumericBuffer::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NumericBuffer::F32(v) => v.len(),
            NumericBuffer::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of the elements; fails when `T` does not match the tag.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::view(self).ok_or(Error::UnsupportedDataType {
            expected: T::DTYPE,
            got: self.dtype(),
        })
    }
}

impl<T: Element> From<Vec<T>> for NumericBuffer {
    fn from(data: Vec<T>) -> Self {
        T::wrap(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_view_checks_tag() {
        let buf = NumericBuffer::from(vec![1.0f32, 2.0]);
        assert_eq!(buf.dtype(), DType::F32);
        assert_eq!(buf.as_slice::<f32>().unwrap(), &[1.0, 2.0]);
        assert!(matches!(
            buf.as_slice::<f64>(),
            Err(Error::UnsupportedDataType {
                expected: DType::F64,
                got: DType::F32
            })
        ));
    }

    #[test]
    fn device_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda { device_id: 1 }.to_string(), "cuda:1");
    }
}
