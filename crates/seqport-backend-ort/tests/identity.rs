use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use seqport_backend_ort::OrtBackend;
use seqport_core::codec::{pack_dense, unpack_dense};
use seqport_core::{
    Backend, BackendModel, BatchedValue, DType, Device, HandleInputs, HandleOutputs,
    ModelArtifact, OutputSlot,
};

/// Round-trips a ragged batch through an identity model, when one is present.
#[test]
fn ort_identity_cpu() -> Result<()> {
    let model_path = std::env::var_os("SEQPORT_IDENTITY_MODEL")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/identity.onnx")
        });
    if !model_path.exists() {
        eprintln!("skipping: no identity model at {}", model_path.display());
        return Ok(());
    }

    let backend = OrtBackend::new();
    let mut model = backend.load(&ModelArtifact::OnnxPath(model_path), Device::Cpu)?;
    let spec = model.spec().clone();

    let input = spec.inputs.first().context("missing model input")?;
    let output = spec.outputs.first().context("missing model output")?;
    ensure!(input.dtype == DType::F32, "expected f32 identity model");

    let layout = model.input_layout(&input.name).context("missing input layout")?;
    let counts = if layout.batch_axes == 0 { vec![1] } else { vec![2, 2] };
    let sample_size = input.shape.total_size();

    let mut next = 0.0f32;
    let batch: Vec<Vec<f32>> = counts
        .iter()
        .map(|n| {
            (0..n * sample_size)
                .map(|_| {
                    next += 1.0;
                    next
                })
                .collect()
        })
        .collect();
    let packed = pack_dense(&batch, &input.shape)?;

    let inputs = HandleInputs::from([(input.handle, BatchedValue::Dense(packed))]);
    let mut outputs = HandleOutputs::from([(output.handle, OutputSlot::EngineAllocate)]);
    model.evaluate(&inputs, &mut outputs, &Device::Cpu)?;

    let value = outputs
        .remove(&output.handle)
        .and_then(OutputSlot::into_value)
        .context("identity output not populated")?;
    let BatchedValue::Dense(dense) = value else {
        anyhow::bail!("expected a dense output");
    };
    assert_eq!(dense.shape, input.shape);
    assert_eq!(dense.sample_counts(), counts);
    assert_eq!(unpack_dense::<f32>(&dense)?.into_sequences(), batch);

    Ok(())
}
