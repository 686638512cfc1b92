use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    error::RuntimeError,
    messaging::{CallResult, Correlation, Job, Report},
    value::Value,
};

use super::Pool;

/// Continuously processes argument sets read from `input`, writing every
/// outcome to `output` in completion order.
///
/// The stream runs until [`TaskStream::stop`] is called or `input` is closed
/// and drained. `output` stays open until the last running call is forwarded.
#[derive(Debug)]
pub struct TaskStream {
    config: Config,
    input: Option<mpsc::Receiver<Vec<Value>>>,
    output: mpsc::Sender<CallResult>,
    quit: Option<CancellationToken>,
}

impl TaskStream {
    pub fn new(
        config: Config,
        input: mpsc::Receiver<Vec<Value>>,
        output: mpsc::Sender<CallResult>,
    ) -> Self {
        Self {
            config,
            input: Some(input),
            output,
            quit: None,
        }
    }

    /// Starts the workers and the forwarding tasks, then returns.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let Some(mut input) = self.input.take() else {
            return Err(RuntimeError::AlreadyRunning);
        };
        let Pool {
            jobs,
            mut reports,
            quit,
        } = Pool::start(&self.config);

        let token = quit.clone();
        tokio::spawn(async move {
            loop {
                let args = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    args = input.recv() => match args {
                        Some(args) => args,
                        None => break,
                    },
                };
                let job = Job {
                    task: Correlation::Stream,
                    args,
                };
                if jobs.send(job).await.is_err() {
                    break;
                }
            }
            tracing::debug!("stream input forwarder exited");
        });

        // Not tied to quit: ends once every worker dropped its report sender.
        let token = quit.clone();
        let output = self.output.clone();
        tokio::spawn(async move {
            while let Some(report) = reports.recv().await {
                match report {
                    Report::Done { worker, result, .. } => {
                        tracing::debug!(worker, ok = result.is_ok(), "stream task done");
                        if output.send(result).await.is_err() {
                            tracing::warn!("stream output closed, stopping");
                            token.cancel();
                            break;
                        }
                    }
                    Report::Fatal { worker, reason, .. } => {
                        tracing::error!(worker, %reason, "stream worker fatal error");
                    }
                }
            }
            tracing::debug!("stream output forwarder exited");
        });

        self.quit = Some(quit);
        Ok(())
    }

    /// Broadcasts quit to every worker and to the input forwarder.
    ///
    /// No new argument set is picked up afterwards. Calls already running
    /// finish and their outcome is still sent to `output`, which closes once
    /// the last worker has exited.
    pub fn stop(&self) -> Result<(), RuntimeError> {
        let Some(quit) = &self.quit else {
            return Err(RuntimeError::NotRunning);
        };
        quit.cancel();
        Ok(())
    }

    /// True between `run` and `stop`.
    pub fn is_running(&self) -> bool {
        self.quit.as_ref().is_some_and(|quit| !quit.is_cancelled())
    }
}
