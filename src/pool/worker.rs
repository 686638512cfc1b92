use std::{panic::AssertUnwindSafe, time::Duration};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::InvocationError,
    invoke::{invoke, panic_message},
    messaging::{CallResult, Job, Report},
    value::Value,
};

/// One pool task: pulls jobs, calls the target with bounded retry, reports.
pub(crate) struct Worker {
    pub(crate) id: usize,
    pub(crate) target: Value,
    pub(crate) retries: u32,
    pub(crate) retry_delay: Duration,
    pub(crate) jobs: async_channel::Receiver<Job>,
    pub(crate) reports: mpsc::UnboundedSender<Report>,
    pub(crate) quit: CancellationToken,
}

impl Worker {
    pub(crate) async fn run(self) {
        tracing::debug!(worker = self.id, "worker started");
        loop {
            let job = tokio::select! {
                biased;
                _ = self.quit.cancelled() => break,
                job = self.jobs.recv() => match job {
                    Ok(job) => job,
                    // Every sender is gone, nothing more to do.
                    Err(_) => break,
                },
            };

            let task = job.task;
            let report = match AssertUnwindSafe(self.handle(job)).catch_unwind().await {
                Ok(result) => Report::Done {
                    task,
                    worker: self.id,
                    result,
                },
                Err(payload) => {
                    let reason = panic_message(&*payload);
                    tracing::error!(worker = self.id, %reason, "worker faulted");
                    Report::Fatal {
                        task,
                        worker: self.id,
                        reason,
                    }
                }
            };

            if self.reports.send(report).is_err() {
                tracing::debug!(worker = self.id, "output queue closed");
                break;
            }
        }
        tracing::debug!(worker = self.id, "worker exited");
    }

    /// Runs one job, retrying any failed call up to `retries` times.
    async fn handle(&self, job: Job) -> CallResult {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
                tracing::debug!(worker = self.id, attempt, "retrying with last args");
            }
            match self.call(job.args.clone()).await {
                Ok(values) => return Ok(values),
                Err(err) if attempt < self.retries => {
                    tracing::warn!(
                        worker = self.id,
                        attempt,
                        fault = err.is_fault(),
                        error = %err,
                        "call failed"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    tracing::warn!(worker = self.id, error = %err, "call failed, no retry left");
                    return Err(err);
                }
            }
        }
    }

    async fn call(&self, args: Vec<Value>) -> CallResult {
        let target = self.target.clone();
        tokio::task::spawn_blocking(move || invoke(&target, args))
            .await
            .unwrap_or_else(|err| Err(InvocationError::Aborted(err.to_string())))
    }
}
