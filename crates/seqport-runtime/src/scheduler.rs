use anyhow::{anyhow, ensure, Result};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::EvaluationRequest;

#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<EvaluationRequest>,
}

impl SchedulerHandle {
    pub async fn submit(&self, req: EvaluationRequest) -> Result<()> {
        self.tx
            .send(req)
            .await
            .map_err(|_| anyhow!("evaluation pool is shut down"))
    }
}

/// Hands each request to the next worker with queue space, starting after the
/// last one served. Waits on that worker only when every queue is full.
pub struct Scheduler {
    rx: mpsc::Receiver<EvaluationRequest>,
    worker_txs: Vec<mpsc::Sender<EvaluationRequest>>,
    next: usize,
}

impl Scheduler {
    pub fn new(
        rx: mpsc::Receiver<EvaluationRequest>,
        worker_txs: Vec<mpsc::Sender<EvaluationRequest>>,
    ) -> Self {
        Self {
            rx,
            worker_txs,
            next: 0,
        }
    }

    pub fn handle(tx: mpsc::Sender<EvaluationRequest>) -> SchedulerHandle {
        SchedulerHandle { tx }
    }

    pub async fn run(mut self) -> Result<()> {
        ensure!(!self.worker_txs.is_empty(), "scheduler has no workers");
        while let Some(req) = self.rx.recv().await {
            self.route(req).await?;
        }
        Ok(())
    }

    async fn route(&mut self, mut req: EvaluationRequest) -> Result<()> {
        let n = self.worker_txs.len();
        for offset in 0..n {
            let idx = (self.next + offset) % n;
            match self.worker_txs[idx].try_send(req) {
                Ok(()) => {
                    self.next = idx + 1;
                    return Ok(());
                }
                Err(TrySendError::Full(r)) => req = r,
                Err(TrySendError::Closed(_)) => return Err(anyhow!("worker {idx} has exited")),
            }
        }

        let idx = self.next % n;
        trace!(worker_id = idx, "all worker queues full, waiting");
        self.next = idx + 1;
        self.worker_txs[idx]
            .send(req)
            .await
            .map_err(|_| anyhow!("worker {idx} has exited"))
    }
}
