use anyhow::{ensure, Context, Result};
use seqport_core::Backend;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{
    Evaluation, EvaluationRequest, EvaluationResponse, NamedInputs, NamedOutputs, Scheduler,
    SchedulerHandle, Worker,
};

#[derive(Clone, Debug)]
pub struct PoolConfig {
    pub workers: usize,
    pub queue_depth: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_depth: 128,
        }
    }
}

/// Concurrent front for a loaded model: requests -> scheduler -> worker(s),
/// each worker holding its own cloned engine handle.
pub struct EvaluationPool {
    scheduler: SchedulerHandle,
    tasks: Vec<JoinHandle<()>>,
}

impl EvaluationPool {
    /// Must be called inside a Tokio runtime.
    pub fn spawn<B: Backend>(evaluation: Evaluation<B>, config: PoolConfig) -> Result<Self> {
        ensure!(config.workers > 0, "evaluation pool needs at least one worker");
        ensure!(evaluation.is_loaded(), "evaluation pool needs a loaded model");

        let mut evaluations = Vec::with_capacity(config.workers);
        for id in 1..config.workers {
            evaluations.push(
                evaluation
                    .try_clone()
                    .with_context(|| format!("failed to clone model for worker {id}"))?,
            );
        }
        evaluations.insert(0, evaluation);

        let (sched_tx, sched_rx) = mpsc::channel(config.queue_depth);
        let mut worker_txs = Vec::with_capacity(config.workers);
        let mut tasks = Vec::with_capacity(config.workers + 1);
        for (id, evaluation) in evaluations.into_iter().enumerate() {
            let (w_tx, w_rx) = mpsc::channel(config.queue_depth);
            worker_txs.push(w_tx);
            let worker = Worker {
                id: id as u32,
                inbox: w_rx,
                evaluation,
            };
            tasks.push(tokio::spawn(async move {
                if let Err(e) = worker.run().await {
                    tracing::error!(error = ?e, "worker exited");
                }
            }));
        }

        let scheduler = Scheduler::new(sched_rx, worker_txs);
        tasks.push(tokio::spawn(async move {
            if let Err(e) = scheduler.run().await {
                tracing::error!(error = ?e, "scheduler exited");
            }
        }));

        Ok(Self {
            scheduler: Scheduler::handle(sched_tx),
            tasks,
        })
    }

    pub async fn submit(
        &self,
        inputs: NamedInputs,
        outputs: NamedOutputs,
    ) -> Result<EvaluationResponse> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.scheduler
            .submit(EvaluationRequest {
                inputs,
                outputs,
                enqueued_at: std::time::Instant::now(),
                resp_tx,
            })
            .await?;
        resp_rx.await.context("worker dropped the request")
    }

    pub async fn evaluate(&self, inputs: NamedInputs, outputs: NamedOutputs) -> Result<NamedOutputs> {
        Ok(self.submit(inputs, outputs).await?.result?)
    }

    /// Stops accepting requests and waits for in-flight ones to finish.
    pub async fn shutdown(self) {
        drop(self.scheduler);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}
