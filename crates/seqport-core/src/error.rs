use std::path::PathBuf;

use crate::{DType, Shape, VariableKind};

/// Coarse classification of [`Error`], used by callers that only care whether
/// a failure came from their data, their names, the engine, or call order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Resolution,
    Engine,
    Precondition,
}

/// Every failure surfaced by the marshalling boundary.
///
/// Validation and resolution errors are always raised before the engine is
/// invoked, so a failed evaluation never leaves caller state half-updated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid shape {dims:?}: every dimension must be > 0 and the element count must fit in usize")]
    InvalidShape { dims: Vec<usize> },

    #[error("flat index {index} out of range for {size} elements")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("invalid coordinate {coordinates:?} for shape {shape}")]
    InvalidCoordinate { coordinates: Vec<usize>, shape: Shape },

    #[error(
        "malformed sequence {sequence}: {len} elements is not a multiple of sample size {sample_size}"
    )]
    MalformedSequence {
        sequence: usize,
        len: usize,
        sample_size: usize,
    },

    #[error("truncated buffer: declared {expected} elements, got {got}")]
    TruncatedBuffer { expected: usize, got: usize },

    #[error("excess data: declared {expected} elements, got {got}")]
    ExcessData { expected: usize, got: usize },

    #[error(
        "inconsistent nnz total: counts sum to {nnz_total}, {values} values, {indices} indices"
    )]
    InconsistentNnzTotal {
        nnz_total: usize,
        values: usize,
        indices: usize,
    },

    #[error("sparse indices of sample {sample} are not strictly increasing")]
    UnsortedSparseIndices { sample: usize },

    #[error("malformed sequence boundaries: {0}")]
    MalformedBoundaries(String),

    #[error("sample {sample} is not one-hot: {nnz} non-zero entries")]
    NotOneHot { sample: usize, nnz: usize },

    #[error("unsupported data type: expected {expected}, got {got}")]
    UnsupportedDataType { expected: DType, got: DType },

    #[error("shape mismatch for '{variable}': expected {expected}, got {got}")]
    ShapeMismatch {
        variable: String,
        expected: Shape,
        got: Shape,
    },

    #[error("duplicate {kind} variable '{name}'")]
    DuplicateName { kind: VariableKind, name: String },

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown input variable '{0}'")]
    UnknownInputVariable(String),

    #[error("unknown output variable '{0}'")]
    UnknownOutputVariable(String),

    #[error("engine evaluation failed: {0:#}")]
    Engine(anyhow::Error),

    #[error("model file '{}' not found", .0.display())]
    ModelFileNotFound(PathBuf),

    #[error("no model is loaded; load a model before evaluation")]
    ModelNotLoaded,
}

impl Error {
    pub fn engine(err: impl Into<anyhow::Error>) -> Self {
        Error::Engine(err.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DuplicateName { .. }
            | Error::UnknownVariable(_)
            | Error::UnknownInputVariable(_)
            | Error::UnknownOutputVariable(_) => ErrorKind::Resolution,
            Error::Engine(_) => ErrorKind::Engine,
            Error::ModelFileNotFound(_) | Error::ModelNotLoaded => ErrorKind::Precondition,
            _ => ErrorKind::Validation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(
            Error::IndexOutOfRange { index: 4, size: 4 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::UnknownInputVariable("x".into()).kind(),
            ErrorKind::Resolution
        );
        assert_eq!(Error::ModelNotLoaded.kind(), ErrorKind::Precondition);
        assert_eq!(
            Error::engine(anyhow::anyhow!("boom")).kind(),
            ErrorKind::Engine
        );
    }

    #[test]
    fn engine_message_keeps_context() {
        let err = Error::engine(anyhow::anyhow!("inner").context("outer"));
        assert_eq!(err.to_string(), "engine evaluation failed: outer: inner");
    }
}
