//! Fixed-size worker pools fed from one shared input queue.
//!
//! [`TaskBatch`] pushes a known list of argument sets and gathers every
//! result in submission order. [`TaskStream`] forwards argument sets from a
//! caller-owned channel and emits each outcome as soon as it is available.

pub(crate) mod batch;
pub(crate) mod stream;
pub(crate) mod worker;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    messaging::{Job, Report},
};

use worker::Worker;

/// Running workers plus both ends of their queues.
pub(crate) struct Pool {
    pub(crate) jobs: async_channel::Sender<Job>,
    pub(crate) reports: mpsc::UnboundedReceiver<Report>,
    pub(crate) quit: CancellationToken,
}

impl Pool {
    /// Spawns `config.workers` workers sharing one input and one output queue.
    pub(crate) fn start(config: &Config) -> Self {
        let (jobs_tx, jobs_rx) = async_channel::unbounded();
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let quit = CancellationToken::new();

        for id in 0..config.workers {
            let worker = Worker {
                id,
                target: config.target.clone(),
                retries: config.retries,
                retry_delay: config.retry_delay,
                jobs: jobs_rx.clone(),
                reports: reports_tx.clone(),
                quit: quit.clone(),
            };
            tokio::spawn(worker.run());
        }
        tracing::debug!(workers = config.workers, "pool started");

        Self {
            jobs: jobs_tx,
            reports: reports_rx,
            quit,
        }
    }

    /// Broadcasts the quit command. Workers observe it at their next wait.
    pub(crate) fn shutdown(&self) {
        self.quit.cancel();
    }
}
