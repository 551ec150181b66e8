use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use seqport_core::{
    BackendCapabilities, BackendModel, BatchedValue, Device, Error, HandleInputs, HandleOutputs,
    OutputSlot, Result, Variable, VariableRegistry,
};
use tracing::debug;

pub type NamedInputs = HashMap<String, BatchedValue>;
pub type NamedOutputs = HashMap<String, OutputSlot>;

/// Translates name-keyed maps into the engine's handle-keyed maps and back.
///
/// All names are resolved and all values validated before the engine runs.
/// The caller's output map is only written once every requested output came
/// back well-formed.
#[derive(Clone, Debug)]
pub struct EvaluationDispatcher {
    registry: Arc<VariableRegistry>,
    capabilities: BackendCapabilities,
}

impl EvaluationDispatcher {
    pub fn new(registry: Arc<VariableRegistry>, capabilities: BackendCapabilities) -> Self {
        Self {
            registry,
            capabilities,
        }
    }

    pub fn registry(&self) -> &Arc<VariableRegistry> {
        &self.registry
    }

    pub fn dispatch<M: BackendModel + ?Sized>(
        &self,
        model: &mut M,
        inputs: &NamedInputs,
        outputs: &mut NamedOutputs,
        device: &Device,
    ) -> Result<()> {
        let inputs = resolve_sorted(inputs, |name| self.registry.resolve_input(name))?;
        let requested = resolve_sorted(outputs, |name| self.registry.resolve_output(name))?;

        for (var, value) in &inputs {
            check_value(var, value)?;
        }
        for (var, slot) in &requested {
            if let Some(value) = slot.value() {
                check_value(var, value)?;
            }
        }

        let mut handle_inputs = HandleInputs::with_capacity(inputs.len());
        for (var, value) in &inputs {
            let value = match value {
                BatchedValue::Sparse(s) if !self.capabilities.sparse_inputs => {
                    BatchedValue::Dense(s.to_dense()?)
                }
                other => (*other).clone(),
            };
            handle_inputs.insert(var.handle, value);
        }
        let mut handle_outputs: HandleOutputs = requested
            .iter()
            .map(|(var, slot)| (var.handle, (*slot).clone()))
            .collect();

        model
            .evaluate(&handle_inputs, &mut handle_outputs, device)
            .map_err(Error::Engine)?;

        let mut results = Vec::with_capacity(requested.len());
        for (var, _) in &requested {
            let value = handle_outputs
                .remove(&var.handle)
                .and_then(OutputSlot::into_value)
                .ok_or_else(|| {
                    Error::engine(anyhow!("engine did not populate output '{}'", var.name))
                })?;
            check_value(var, &value)?;
            results.push((var.name.clone(), value));
        }

        debug!(
            inputs = inputs.len(),
            outputs = results.len(),
            %device,
            "dispatched evaluation"
        );
        for (name, value) in results {
            outputs.insert(name, OutputSlot::Provided(value));
        }
        Ok(())
    }
}

/// Resolves every key in name order so the first failure is deterministic.
fn resolve_sorted<'a, V>(
    map: &'a HashMap<String, V>,
    resolve: impl Fn(&str) -> Result<&'a Variable>,
) -> Result<Vec<(&'a Variable, &'a V)>> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(name, v)| Ok((resolve(name)?, v)))
        .collect()
}

fn check_value(var: &Variable, value: &BatchedValue) -> Result<()> {
    if value.dtype() != var.dtype {
        return Err(Error::UnsupportedDataType {
            expected: var.dtype,
            got: value.dtype(),
        });
    }
    if value.shape() != &var.shape {
        return Err(Error::ShapeMismatch {
            variable: var.name.clone(),
            expected: var.shape.clone(),
            got: value.shape().clone(),
        });
    }
    value.validate()
}
