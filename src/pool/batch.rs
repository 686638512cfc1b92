use crate::{
    config::Config,
    error::{InvocationError, RuntimeError},
    messaging::{CallResult, Correlation, Job, Report},
    value::Value,
};

use super::Pool;

/// Runs a fixed list of argument sets across a worker pool.
///
/// ```rust,no_run
/// use easy_worker::{args, Config, Func, TaskBatch};
/// use std::time::Duration;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::new(Func::new(|a: i64, b: i64| a + b), 2, 0, Duration::ZERO)?;
/// let mut batch = TaskBatch::new(config);
/// batch.add_task(args![1, 2]);
/// batch.add_task(args![3, 4]);
///
/// let results = batch.run().await?; // [Ok([Int(3)]), Ok([Int(7)])]
/// # let _ = results;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TaskBatch {
    config: Config,
    tasks: Vec<Vec<Value>>,
}

impl TaskBatch {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tasks: Vec::new(),
        }
    }

    /// Queues one argument set and returns its index in the result list.
    pub fn add_task(&mut self, args: Vec<Value>) -> usize {
        self.tasks.push(args);
        self.tasks.len() - 1
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Runs every queued task and waits for all of them.
    ///
    /// The returned list is ordered like the submissions, not like the
    /// completions. A failed task shows up as an `Err` at its index; the run
    /// as a whole only fails when nothing was queued.
    pub async fn run(&self) -> Result<Vec<CallResult>, RuntimeError> {
        if self.tasks.is_empty() {
            return Err(RuntimeError::NoTasks);
        }

        let mut pool = Pool::start(&self.config);
        for (index, args) in self.tasks.iter().enumerate() {
            let job = Job {
                task: Correlation::Index(index),
                args: args.clone(),
            };
            // Unbounded and we hold the receiver side through the workers.
            let _ = pool.jobs.try_send(job);
        }

        let mut results: Vec<Option<CallResult>> = vec![None; self.tasks.len()];
        let mut pending = self.tasks.len();

        while pending > 0 {
            let Some(report) = pool.reports.recv().await else {
                tracing::error!(pending, "every worker exited before the batch completed");
                break;
            };
            let (task, result) = match report {
                Report::Done {
                    task,
                    worker,
                    result,
                } => {
                    tracing::debug!(?task, worker, ok = result.is_ok(), "task reported");
                    (task, result)
                }
                Report::Fatal {
                    task,
                    worker,
                    reason,
                } => {
                    tracing::error!(?task, worker, %reason, "worker fatal error");
                    (task, Err(InvocationError::Aborted(reason)))
                }
            };
            let Correlation::Index(index) = task else {
                continue;
            };
            match results.get_mut(index) {
                Some(slot) if slot.is_none() => {
                    *slot = Some(result);
                    pending -= 1;
                }
                _ => tracing::warn!(index, "unexpected report for task"),
            }
        }

        pool.shutdown();
        tracing::debug!(tasks = self.tasks.len(), "collected all results");

        Ok(results
            .into_iter()
            .map(|result| {
                result.unwrap_or_else(|| Err(InvocationError::Aborted("task never reported".into())))
            })
            .collect())
    }
}
