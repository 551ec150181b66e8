use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use seqport_core::{
    Backend, BackendModel, BatchedValue, Device, Error, ModelArtifact, ModelSpec, OutputSlot,
    Result, VariableRegistry,
};
use tracing::info;

use crate::{EvaluationDispatcher, NamedInputs, NamedOutputs};

struct Loaded<M> {
    model: M,
    dispatcher: EvaluationDispatcher,
    device: Device,
}

/// Caller-facing handle: load a model once, then evaluate name-keyed batches.
///
/// One `Evaluation` must not be driven from several threads at once; use
/// [`Evaluation::try_clone`] to get an independent engine handle per caller.
pub struct Evaluation<B: Backend> {
    backend: Arc<B>,
    loaded: Option<Loaded<B::Model>>,
}

impl<B: Backend> Evaluation<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Arc::new(backend),
            loaded: None,
        }
    }

    pub fn load_model(&mut self, path: impl AsRef<Path>, device: Device) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ModelFileNotFound(path.to_path_buf()));
        }
        self.load_artifact(&ModelArtifact::OnnxPath(path.to_path_buf()), device)
    }

    pub fn load_artifact(&mut self, artifact: &ModelArtifact, device: Device) -> Result<()> {
        let model = self
            .backend
            .load(artifact, device.clone())
            .map_err(Error::Engine)?;
        let registry = VariableRegistry::from_spec(model.spec())?;

        info!(
            backend = self.backend.name(),
            model = %artifact.path().display(),
            inputs = model.spec().inputs.len(),
            outputs = model.spec().outputs.len(),
            %device,
            "model loaded"
        );

        let dispatcher = EvaluationDispatcher::new(Arc::new(registry), self.backend.capabilities());
        self.loaded = Some(Loaded {
            model,
            dispatcher,
            device,
        });
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn loaded(&self) -> Result<&Loaded<B::Model>> {
        self.loaded.as_ref().ok_or(Error::ModelNotLoaded)
    }

    pub fn spec(&self) -> Result<&ModelSpec> {
        Ok(self.loaded()?.model.spec())
    }

    pub fn registry(&self) -> Result<&VariableRegistry> {
        Ok(self.loaded()?.dispatcher.registry().as_ref())
    }

    pub fn device(&self) -> Result<&Device> {
        Ok(&self.loaded()?.device)
    }

    /// Evaluates on the device the model was loaded for.
    pub fn evaluate(&mut self, inputs: &NamedInputs, outputs: &mut NamedOutputs) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(Error::ModelNotLoaded)?;
        let device = loaded.device.clone();
        loaded
            .dispatcher
            .dispatch(&mut loaded.model, inputs, outputs, &device)
    }

    pub fn evaluate_on(
        &mut self,
        inputs: &NamedInputs,
        outputs: &mut NamedOutputs,
        device: &Device,
    ) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(Error::ModelNotLoaded)?;
        loaded
            .dispatcher
            .dispatch(&mut loaded.model, inputs, outputs, device)
    }

    /// Evaluates with engine-allocated outputs and returns them by name.
    pub fn evaluate_outputs<S: AsRef<str>>(
        &mut self,
        inputs: &NamedInputs,
        output_names: &[S],
    ) -> Result<HashMap<String, BatchedValue>> {
        let mut outputs: NamedOutputs = output_names
            .iter()
            .map(|name| (name.as_ref().to_string(), OutputSlot::EngineAllocate))
            .collect();
        self.evaluate(inputs, &mut outputs)?;
        Ok(outputs
            .into_iter()
            .filter_map(|(name, slot)| slot.into_value().map(|v| (name, v)))
            .collect())
    }

    /// Independent engine handle sharing this evaluation's read-only registry.
    pub fn try_clone(&self) -> Result<Self> {
        let loaded = match &self.loaded {
            None => None,
            Some(l) => Some(Loaded {
                model: l.model.try_clone().map_err(Error::Engine)?,
                dispatcher: l.dispatcher.clone(),
                device: l.device.clone(),
            }),
        };
        Ok(Self {
            backend: Arc::clone(&self.backend),
            loaded,
        })
    }
}
