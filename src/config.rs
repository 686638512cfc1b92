use std::{num::NonZeroUsize, thread, time::Duration};

use crate::{
    error::ConfigError,
    invoke::ensure_callable,
    value::{IntoValue, Value},
};

/// Retry count used by [`ConfigBuilder`] unless overridden.
pub const DEFAULT_RETRIES: u32 = 3;

/// Number of workers used by [`ConfigBuilder`] unless overridden: one per CPU.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Options shared by [`TaskBatch`](crate::TaskBatch) and [`TaskStream`](crate::TaskStream).
#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) target: Value,
    pub(crate) workers: usize,
    pub(crate) retries: u32,
    pub(crate) retry_delay: Duration,
}

impl Config {
    /// Validates and builds a configuration.
    ///
    /// `target` must be a [`Func`](crate::Func) and `workers` at least 1.
    pub fn new(
        target: impl IntoValue,
        workers: usize,
        retries: u32,
        retry_delay: Duration,
    ) -> Result<Self, ConfigError> {
        Self::builder(target)
            .with_workers(workers)
            .with_retries(retries)
            .with_retry_delay(retry_delay)
            .build()
    }

    /// Starts a builder with one worker per CPU and [`DEFAULT_RETRIES`].
    pub fn builder(target: impl IntoValue) -> ConfigBuilder {
        ConfigBuilder::new(target.into_value())
    }

    pub fn target(&self) -> &Value {
        &self.target
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

/// Builds a [`Config`] with configurable parameters.
pub struct ConfigBuilder {
    target: Value,
    workers: usize,
    retries: u32,
    retry_delay: Duration,
}

impl ConfigBuilder {
    fn new(target: Value) -> Self {
        Self {
            target,
            workers: default_workers(),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::ZERO,
        }
    }

    /// Sets the number of workers (at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets how many times a failed call is retried. `0` means a single attempt.
    ///
    /// Every failure counts, including calls rejected for their arguments,
    /// with `retry_delay` between attempts.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Sets the pause between two attempts of the same task.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Validates the settings and constructs the [`Config`].
    pub fn build(self) -> Result<Config, ConfigError> {
        ensure_callable(&self.target)?;
        if self.workers < 1 {
            return Err(ConfigError::InvalidWorkerCount(self.workers));
        }
        Ok(Config {
            target: self.target,
            workers: self.workers,
            retries: self.retries,
            retry_delay: self.retry_delay,
        })
    }
}
