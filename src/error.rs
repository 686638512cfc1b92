//! Error types for the whole crate.
//!
//! - [`ConfigError`]: a component could not be constructed.
//! - [`InvocationError`]: one call of a user function failed. Always delivered
//!   as data (task result, child signal, monitor signal), never as a panic.
//! - [`RuntimeError`]: misuse of a running component.

use thiserror::Error;

use crate::id::{ChildId, SupervisorId};

/// Errors raised synchronously by constructors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The target handed to a constructor is not a function.
    #[error("target is not callable (got {0})")]
    NotCallable(&'static str),

    /// A pool needs at least one worker.
    #[error("number of workers is incorrect: {0}")]
    InvalidWorkerCount(usize),

    /// `Supervisor::with_context` was given `Value::Nil`.
    #[error("supervisor context must not be nil")]
    MissingContext,
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NotCallable(_) => "config_not_callable",
            ConfigError::InvalidWorkerCount(_) => "config_invalid_worker_count",
            ConfigError::MissingContext => "config_missing_context",
        }
    }
}

/// Failure of a single invocation of a user function.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// The target is not a function value.
    #[error("target is not callable (got {0})")]
    NotCallable(&'static str),

    /// Wrong number of arguments.
    #[error("function takes {} {expected} arguments, got {actual}", arity_bound(.variadic))]
    ArityMismatch {
        expected: usize,
        actual: usize,
        variadic: bool,
    },

    /// An argument cannot be converted to its parameter type. Nothing was called.
    #[error("argument {position} must be {expected}, got {actual}")]
    TypeMismatch {
        position: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// The user function panicked.
    #[error("user function panicked: {0}")]
    Panic(String),

    /// The user function returned `Err`.
    #[error("user function returned an error: {0}")]
    Returned(String),

    /// The call never reported back (its worker or blocking thread died).
    #[error("execution aborted: {0}")]
    Aborted(String),
}

fn arity_bound(variadic: &bool) -> &'static str {
    if *variadic {
        "at least"
    } else {
        "exactly"
    }
}

impl InvocationError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            InvocationError::NotCallable(_) => "invoke_not_callable",
            InvocationError::ArityMismatch { .. } => "invoke_arity_mismatch",
            InvocationError::TypeMismatch { .. } => "invoke_type_mismatch",
            InvocationError::Panic(_) => "invoke_panic",
            InvocationError::Returned(_) => "invoke_returned_error",
            InvocationError::Aborted(_) => "invoke_aborted",
        }
    }

    /// True when the user function actually ran (and failed).
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            InvocationError::Panic(_) | InvocationError::Returned(_) | InvocationError::Aborted(_)
        )
    }
}

/// Errors produced by running components.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `TaskBatch::run` was called without any queued task.
    #[error("need at least one task to run")]
    NoTasks,

    /// `TaskStream::stop` was called before `TaskStream::run`.
    #[error("stream is not running")]
    NotRunning,

    /// `TaskStream::run` was called twice.
    #[error("stream is already running")]
    AlreadyRunning,

    /// The monitor unit was stopped and cannot run again.
    #[error("unit was stopped and cannot run again")]
    AlreadyStopped,

    /// No child with this id in the supervisor.
    #[error("unknown child {0}")]
    UnknownChild(ChildId),

    /// No supervisor with this id in the registry.
    #[error("unknown supervisor {0}")]
    UnknownSupervisor(SupervisorId),

    /// The child already belongs to a supervisor.
    #[error("child {child} is already supervised by {supervisor}")]
    AlreadySupervised {
        child: ChildId,
        supervisor: SupervisorId,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoTasks => "runtime_no_tasks",
            RuntimeError::NotRunning => "runtime_not_running",
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::AlreadyStopped => "runtime_already_stopped",
            RuntimeError::UnknownChild(_) => "runtime_unknown_child",
            RuntimeError::UnknownSupervisor(_) => "runtime_unknown_supervisor",
            RuntimeError::AlreadySupervised { .. } => "runtime_already_supervised",
        }
    }
}
