use seqport_core::Result;
use tokio::sync::oneshot;

use crate::{NamedInputs, NamedOutputs};

#[derive(Debug)]
pub struct EvaluationRequest {
    pub inputs: NamedInputs,
    pub outputs: NamedOutputs,
    pub enqueued_at: std::time::Instant,
    pub resp_tx: oneshot::Sender<EvaluationResponse>,
}

#[derive(Debug)]
pub struct EvaluationResponse {
    pub result: Result<NamedOutputs>,
    pub timings: Timings,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub queued_us: u64,
    pub evaluate_us: u64,
}
