mod cli;
mod report;
mod request;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use seqport_backend_ort::OrtBackend;
use seqport_core::{Device, OutputSlot};
use seqport_runtime::{Evaluation, EvaluationPool, NamedOutputs, PoolConfig};
use tracing_subscriber::EnvFilter;

use request::RequestFile;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log)
        .with_context(|| format!("invalid log filter '{}'", cli.log))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Inspect { model, device } => inspect(&model, device),
        Command::Eval {
            model,
            device,
            request,
            workers,
            repeat,
        } => eval(&model, device, &request, workers, repeat).await,
    }
}

fn load(model: &Path, device: Device) -> Result<Evaluation<OrtBackend>> {
    let mut evaluation = Evaluation::new(OrtBackend::new());
    evaluation.load_model(model, device)?;
    Ok(evaluation)
}

fn inspect(model: &Path, device: Device) -> Result<()> {
    let evaluation = load(model, device)?;
    println!("{}", evaluation.spec()?.describe());
    Ok(())
}

async fn eval(
    model: &Path,
    device: Device,
    request: &Path,
    workers: usize,
    repeat: usize,
) -> Result<()> {
    let evaluation = load(model, device)?;
    let request = RequestFile::load(request)?;
    let registry = evaluation.registry()?;
    let inputs = request.named_inputs(registry)?;
    let outputs: NamedOutputs = request
        .output_names(registry)
        .into_iter()
        .map(|name| (name, OutputSlot::EngineAllocate))
        .collect();

    let pool = Arc::new(EvaluationPool::spawn(
        evaluation,
        PoolConfig {
            workers,
            ..PoolConfig::default()
        },
    )?);

    let mut pending = Vec::with_capacity(repeat.max(1));
    for _ in 0..repeat.max(1) {
        let pool = Arc::clone(&pool);
        let (inputs, outputs) = (inputs.clone(), outputs.clone());
        pending.push(tokio::spawn(async move { pool.submit(inputs, outputs).await }));
    }

    let mut last = None;
    for (i, task) in pending.into_iter().enumerate() {
        let response = task.await.context("evaluation task panicked")??;
        tracing::info!(
            request = i,
            queued_us = response.timings.queued_us,
            evaluate_us = response.timings.evaluate_us,
            "evaluation finished"
        );
        last = Some(response.result?);
    }

    if let Some(outputs) = last {
        let values: HashMap<_, _> = outputs
            .into_iter()
            .filter_map(|(name, slot)| slot.into_value().map(|v| (name, v)))
            .collect();
        report::write_outputs(&mut std::io::stdout().lock(), &values)?;
    }

    if let Ok(pool) = Arc::try_unwrap(pool) {
        pool.shutdown().await;
    }
    Ok(())
}
