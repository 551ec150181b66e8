use anyhow::Result;
use seqport_core::Backend;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{Evaluation, EvaluationRequest, EvaluationResponse, Timings};

/// Owns one independent engine handle and serves requests one at a time.
pub struct Worker<B: Backend> {
    pub id: u32,
    pub inbox: mpsc::Receiver<EvaluationRequest>,
    pub evaluation: Evaluation<B>,
}

impl<B: Backend> Worker<B> {
    pub async fn run(mut self) -> Result<()> {
        info!(worker_id = self.id, "worker started");
        while let Some(req) = self.inbox.recv().await {
            let queued_us = req.enqueued_at.elapsed().as_micros() as u64;
            let t0 = std::time::Instant::now();

            let mut outputs = req.outputs;
            let evaluation = &mut self.evaluation;
            let result = run_blocking(|| evaluation.evaluate(&req.inputs, &mut outputs))
                .map(|()| outputs);
            let evaluate_us = t0.elapsed().as_micros() as u64;

            debug!(worker_id = self.id, ok = result.is_ok(), evaluate_us, "request served");
            // receiver may have given up; nothing to do then
            let _ = req.resp_tx.send(EvaluationResponse {
                result,
                timings: Timings {
                    queued_us,
                    evaluate_us,
                },
            });
        }
        Ok(())
    }
}

/// Runs an engine call without stalling the other tasks on a multi-threaded
/// runtime. `block_in_place` is unavailable on a current-thread runtime, so
/// the call runs inline there.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current().map(|h| h.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(f),
        _ => f(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_call_on_multi_thread_runtime() {
        let mut calls = 0;
        assert_eq!(run_blocking(|| { calls += 1; calls * 10 }), 10);
        assert_eq!(calls, 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn blocking_call_on_current_thread_runtime() {
        assert_eq!(run_blocking(|| 7), 7);
    }

    #[test]
    fn blocking_call_outside_a_runtime() {
        assert_eq!(run_blocking(|| "inline"), "inline");
    }
}
