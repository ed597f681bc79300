use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;

use crate::error::{CrawlError, Result};
use crate::queue::QueueStore;

use super::worker_task::{CrawlWorker, WorkerReport};
use super::EngineState;

/// A panicking worker is respawned at most this many times.
const MAX_RESTARTS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Running,
    Finished,
    Failed,
}

/// A worker that stopped with an error.
#[derive(Debug)]
pub struct WorkerFailure {
    pub worker_id: u32,
    pub error: CrawlError,
}

#[derive(Debug, Default)]
pub struct PoolReport {
    /// Reports of the workers that reached the idle exit.
    pub finished: Vec<WorkerReport>,
    pub failed: Vec<WorkerFailure>,
    pub restarts: u32,
}

impl PoolReport {
    pub fn total_emitted(&self) -> u64 {
        self.finished.iter().map(|r| r.emitted).sum()
    }
}

type WorkerOutcome = (u32, std::result::Result<Result<WorkerReport>, JoinError>);

pub(super) struct WorkerPool {
    state: Arc<EngineState>,
    queues: Vec<Arc<dyn QueueStore>>,
}

impl WorkerPool {
    pub fn new(state: Arc<EngineState>, queues: Vec<Arc<dyn QueueStore>>) -> Self {
        Self { state, queues }
    }

    /// Spawns one worker per queue and waits for all of them.
    pub async fn run(self) -> PoolReport {
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<WorkerOutcome>();

        let mut slots = vec![SlotState::Running; self.queues.len()];
        let mut restarts = vec![0u32; self.queues.len()];
        for idx in 0..self.queues.len() {
            self.spawn_worker_and_monitor_thread(idx, outcome_tx.clone());
        }

        let mut report = PoolReport::default();
        while slots.contains(&SlotState::Running) {
            let Some((worker_id, outcome)) = outcome_rx.recv().await else {
                break;
            };
            let idx = (worker_id - 1) as usize;

            match outcome {
                Ok(Ok(worker_report)) => {
                    slots[idx] = SlotState::Finished;
                    report.finished.push(worker_report);
                }
                Ok(Err(error)) => {
                    slots[idx] = SlotState::Failed;
                    report.failed.push(WorkerFailure { worker_id, error });
                }
                Err(e) if e.is_panic() && restarts[idx] < MAX_RESTARTS => {
                    // The task being processed when it panicked is lost.
                    log::error!("[worker-{}] panicked, restarting: {}", worker_id, e);
                    restarts[idx] += 1;
                    report.restarts += 1;
                    self.spawn_worker_and_monitor_thread(idx, outcome_tx.clone());
                }
                Err(e) => {
                    log::error!("[worker-{}] stopped abnormally: {}", worker_id, e);
                    slots[idx] = SlotState::Failed;
                    report.failed.push(WorkerFailure {
                        worker_id,
                        error: CrawlError::Worker(e.to_string()),
                    });
                }
            }
        }
        report
    }

    fn spawn_worker_and_monitor_thread(
        &self,
        idx: usize,
        outcome_tx: mpsc::UnboundedSender<WorkerOutcome>,
    ) {
        let worker_id = (idx + 1) as u32;
        let worker = CrawlWorker::new(worker_id, self.state.clone(), self.queues[idx].clone());
        let handle = tokio::spawn(worker.run());

        // Monitors the worker so a panic is reported instead of lost.
        tokio::spawn(async move {
            let result = handle.await;
            let _ = outcome_tx.send((worker_id, result));
        });
    }
}
