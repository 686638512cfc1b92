use crate::{child::Child, error::InvocationError, value::Value};

/// Outcome of one task: the function's return values or why it failed.
pub type CallResult = Result<Vec<Value>, InvocationError>;

/// Which submission a task message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Correlation {
    // Position in a batch, results are reassembled by it
    Index(usize),
    // Streamed task, never indexed
    Stream,
}

/// A task sent to the pool's shared input queue.
#[derive(Debug)]
pub(crate) struct Job {
    pub(crate) task: Correlation,
    pub(crate) args: Vec<Value>,
}

/// Sent by workers to the pool's output queue.
#[derive(Debug)]
pub(crate) enum Report {
    /// Exactly one per job, after the last attempt.
    Done {
        task: Correlation,
        worker: usize,
        result: CallResult,
    },
    /// The worker itself faulted while handling `task`.
    Fatal {
        task: Correlation,
        worker: usize,
        reason: String,
    },
}

/// Kind of a finished child iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    Done,
    Failed,
}

/// Sent by a child to its supervisor after every iteration.
#[derive(Debug, Clone)]
pub(crate) struct ChildSignal {
    pub(crate) child: Child,
    pub(crate) outcome: ChildOutcome,
}
