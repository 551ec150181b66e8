use std::fmt;

use crate::{DType, Shape};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKind {
    Input,
    Output,
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKind::Input => write!(f, "input"),
            VariableKind::Output => write!(f, "output"),
        }
    }
}

/// Opaque engine-level reference to a declared variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableHandle(pub u32);

impl fmt::Display for VariableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub dtype: DType,
    /// Per-sample shape, excluding sequence and batch axes.
    pub shape: Shape,
    pub handle: VariableHandle,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name={}, kind={}, dtype={}, shape={}, total_size={}",
            self.name,
            self.kind,
            self.dtype,
            self.shape,
            self.shape.total_size()
        )
    }
}

/// What an engine reports about a loaded model.
#[derive(Clone, Debug, Default)]
pub struct ModelSpec {
    pub name: String,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
}

impl ModelSpec {
    /// Human-readable listing of the model's arguments and outputs.
    pub fn describe(&self) -> String {
        let name = if self.name.is_empty() {
            "(empty)"
        } else {
            &self.name
        };
        let mut out = format!("model: {name}\n");
        out.push_str("arguments:\n");
        for v in &self.inputs {
            out.push_str(&format!("    {v}\n"));
        }
        out.push_str("outputs:\n");
        for v in &self.outputs {
            out.push_str(&format!("    {v}\n"));
        }
        out
    }
}
