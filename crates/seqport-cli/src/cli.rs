use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use seqport_core::Device;

#[derive(Parser, Debug)]
#[command(name = "seqport", version, about = "Evaluate sequence models on ragged batches")]
pub struct Cli {
    /// Log filter (RUST_LOG syntax)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the model's input and output variables
    Inspect {
        /// Path to ONNX model file
        #[arg(long)]
        model: PathBuf,

        /// Device to load the model on (cpu or cuda:N)
        #[arg(long, default_value = "cpu", value_parser = parse_device)]
        device: Device,
    },
    /// Evaluate a JSON request against the model
    Eval {
        /// Path to ONNX model file
        #[arg(long)]
        model: PathBuf,

        /// Device to evaluate on (cpu or cuda:N)
        #[arg(long, default_value = "cpu", value_parser = parse_device)]
        device: Device,

        /// JSON request file
        #[arg(long)]
        request: PathBuf,

        /// Number of workers, each with its own engine handle
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Times to submit the request
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
}

pub fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}
