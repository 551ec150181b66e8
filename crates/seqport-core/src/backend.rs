use std::collections::HashMap;

use anyhow::Result;

use crate::{BatchedValue, Device, ModelArtifact, ModelSpec, VariableHandle};

/// Output request: either a caller-provided value, or ask the engine to
/// allocate and fill the result.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputSlot {
    Provided(BatchedValue),
    EngineAllocate,
}

impl OutputSlot {
    pub fn value(&self) -> Option<&BatchedValue> {
        match self {
            OutputSlot::Provided(v) => Some(v),
            OutputSlot::EngineAllocate => None,
        }
    }

    pub fn into_value(self) -> Option<BatchedValue> {
        match self {
            OutputSlot::Provided(v) => Some(v),
            OutputSlot::EngineAllocate => None,
        }
    }
}

pub type HandleInputs = HashMap<VariableHandle, BatchedValue>;
pub type HandleOutputs = HashMap<VariableHandle, OutputSlot>;

#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    /// Engine accepts [`BatchedValue::Sparse`] inputs as-is. When false the
    /// dispatcher densifies them first.
    pub sparse_inputs: bool,
    pub cuda: bool,
}

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
    fn capabilities(&self) -> BackendCapabilities;
}

pub trait BackendModel: Send + 'static {
    fn spec(&self) -> &ModelSpec;

    /// Runs the model once. Every entry of `outputs` must hold a
    /// [`OutputSlot::Provided`] value on success.
    fn evaluate(
        &mut self,
        inputs: &HandleInputs,
        outputs: &mut HandleOutputs,
        device: &Device,
    ) -> Result<()>;

    /// An independent handle that can be evaluated concurrently with `self`.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;
}
