use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use ort::{
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use seqport_core::{
    Backend, BackendCapabilities, BackendModel, BatchedValue, DType, Device, HandleInputs,
    HandleOutputs, ModelArtifact, ModelSpec, NumericBuffer, OutputSlot, Variable, VariableHandle,
    VariableKind,
};
use tracing::{debug, info};

mod layout;

pub use layout::BatchLayout;

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

struct Binding {
    handle: VariableHandle,
    name: String,
    layout: BatchLayout,
}

pub struct OrtModel {
    spec: ModelSpec,
    session: Session,
    inputs: Vec<Binding>,
    outputs: Vec<Binding>,
    path: PathBuf,
    device: Device,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let ModelArtifact::OnnxPath(path) = artifact;
        OrtModel::open(path, device)
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            sparse_inputs: false,
            cuda: cfg!(feature = "cuda"),
        }
    }
}

impl OrtModel {
    /// Batch layout the session uses for the named input.
    pub fn input_layout(&self, name: &str) -> Option<&BatchLayout> {
        self.inputs.iter().find(|b| b.name == name).map(|b| &b.layout)
    }

    fn open(path: &Path, device: Device) -> Result<Self> {
        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &device)?;

        let session = builder
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;

        let mut inputs = Vec::with_capacity(session.inputs.len());
        let mut outputs = Vec::with_capacity(session.outputs.len());
        let mut spec = ModelSpec {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        };

        for input in &session.inputs {
            let handle = VariableHandle(inputs.len() as u32);
            let (var, binding) =
                bind(&input.name, VariableKind::Input, &input.input_type, handle)?;
            spec.inputs.push(var);
            inputs.push(binding);
        }
        for output in &session.outputs {
            let handle = VariableHandle((inputs.len() + outputs.len()) as u32);
            let (var, binding) =
                bind(&output.name, VariableKind::Output, &output.output_type, handle)?;
            spec.outputs.push(var);
            outputs.push(binding);
        }

        info!(
            model = %path.display(),
            inputs = inputs.len(),
            outputs = outputs.len(),
            %device,
            "ORT session ready"
        );

        Ok(OrtModel {
            spec,
            session,
            inputs,
            outputs,
            path: path.to_path_buf(),
            device,
        })
    }
}

impl BackendModel for OrtModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn evaluate(
        &mut self,
        inputs: &HandleInputs,
        outputs: &mut HandleOutputs,
        device: &Device,
    ) -> Result<()> {
        ensure!(
            *device == self.device,
            "session was created for {}, cannot evaluate on {device}",
            self.device
        );

        let mut sample_counts = Vec::new();
        let mut ort_inputs = Vec::with_capacity(self.inputs.len());
        for binding in &self.inputs {
            let value = inputs
                .get(&binding.handle)
                .with_context(|| format!("missing value for input '{}'", binding.name))?;
            let BatchedValue::Dense(dense) = value else {
                bail!("input '{}' must be dense", binding.name);
            };
            let counts = dense.sample_counts();
            let dims = binding.layout.tensor_dims(&counts)?;
            if sample_counts.is_empty() {
                sample_counts = counts;
            }
            let value = to_ort_value(dims, &dense.data)?;
            ort_inputs.push((binding.name.clone(), SessionInputValue::from(value)));
        }

        let results = self.session.run(ort_inputs)?;
        let mut produced = 0;
        for (name, value) in results.iter() {
            let Some(binding) = self.outputs.iter().find(|b| b.name == name) else {
                continue;
            };
            let Some(slot) = outputs.get_mut(&binding.handle) else {
                continue;
            };
            let (dims, data) = from_ort_value(&value)?;
            let dense = binding.layout.to_dense(&dims, data, &sample_counts)?;
            *slot = OutputSlot::Provided(BatchedValue::Dense(dense));
            produced += 1;
        }
        debug!(requested = outputs.len(), produced, "ORT run finished");
        Ok(())
    }

    fn try_clone(&self) -> Result<Self> {
        OrtModel::open(&self.path, self.device.clone())
    }
}

fn bind(
    name: &str,
    kind: VariableKind,
    value_type: &ValueType,
    handle: VariableHandle,
) -> Result<(Variable, Binding)> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("'{name}' is not a tensor");
    };
    let layout = BatchLayout::from_onnx_dims(name, shape)?;
    let var = Variable {
        name: name.to_string(),
        kind,
        dtype: ort_tensor_element_to_dtype(*ty)?,
        shape: layout.sample_shape(),
        handle,
    };
    Ok((
        var,
        Binding {
            handle,
            name: name.to_string(),
            layout,
        },
    ))
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but seqport-backend-ort was built without the `cuda` feature")
    }
}

fn ort_tensor_element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        TensorElementType::Float64 => Ok(DType::F64),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

fn to_ort_value(dims: Vec<usize>, data: &NumericBuffer) -> Result<DynValue> {
    let value = match data {
        NumericBuffer::F32(v) => ort::value::Tensor::from_array((dims, v.clone()))?.into_dyn(),
        NumericBuffer::F64(v) => ort::value::Tensor::from_array((dims, v.clone()))?.into_dyn(),
    };
    Ok(value)
}

fn from_ort_value(value: &ort::value::ValueRef<'_>) -> Result<(Vec<usize>, NumericBuffer)> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };
    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();

    let data = match *ty {
        TensorElementType::Float32 => {
            let array = value.try_extract_array::<f32>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            NumericBuffer::from(slice.to_vec())
        }
        TensorElementType::Float64 => {
            let array = value.try_extract_array::<f64>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            NumericBuffer::from(slice.to_vec())
        }
        _ => bail!("unsupported output tensor element type: {ty}"),
    };
    Ok((dims, data))
}
