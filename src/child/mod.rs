mod policy;

pub use policy::RestartPolicy;

use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc, Mutex,
};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{ConfigError, InvocationError, RuntimeError},
    id::{ChildId, SupervisorId},
    invoke::{ensure_callable, invoke},
    messaging::{ChildOutcome, ChildSignal},
    sync::lock,
    value::{FromValue, IntoValue, Opaque, Value},
};

/// Lifecycle state of a [`Child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChildState {
    /// Created but not attached to a supervisor yet.
    Standby = 0,
    Running = 1,
    /// Failed and about to be relaunched.
    Restarting = 2,
    Stopped = 3,
    /// Stop requested while a call is in flight; becomes `Stopped` when it returns.
    ForceQuit = 4,
}

impl ChildState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Standby,
            1 => Self::Running,
            2 => Self::Restarting,
            3 => Self::Stopped,
            _ => Self::ForceQuit,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ChildState::Running | ChildState::ForceQuit)
    }

    pub fn is_restarting(&self) -> bool {
        matches!(self, ChildState::Restarting)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, ChildState::Stopped)
    }
}

impl std::fmt::Display for ChildState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standby => write!(f, "standby"),
            Self::Running => write!(f, "running"),
            Self::Restarting => write!(f, "restarting"),
            Self::Stopped => write!(f, "stopped"),
            Self::ForceQuit => write!(f, "force_quit"),
        }
    }
}

/// Snapshot of a child's state and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildStats {
    pub state: ChildState,
    pub restarts: u64,
    pub failures: u64,
}

/// Leading argument handed to children of a context-bearing supervisor.
///
/// Declare it as the first parameter of the child's function:
///
/// ```rust
/// use easy_worker::{ChildContext, Func};
///
/// let f = Func::new(|ctx: ChildContext, n: i64| {
///     println!("child {} of {} got {n}", ctx.child(), ctx.supervisor());
/// });
/// # let _ = f;
/// ```
#[derive(Debug, Clone)]
pub struct ChildContext {
    supervisor: SupervisorId,
    child: ChildId,
    value: Value,
}

impl ChildContext {
    pub fn supervisor(&self) -> SupervisorId {
        self.supervisor
    }

    pub fn child(&self) -> ChildId {
        self.child
    }

    /// The value given to `Supervisor::with_context`.
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl FromValue for ChildContext {
    fn type_name() -> &'static str {
        "ChildContext"
    }

    fn from_value(value: Value) -> Option<Self> {
        Opaque::<ChildContext>::from_value(value).map(|Opaque(ctx)| ctx)
    }
}

/// Where a child reports, set once when a supervisor adopts it.
#[derive(Debug, Clone)]
pub(crate) struct Parent {
    pub(crate) supervisor: SupervisorId,
    pub(crate) signals: mpsc::UnboundedSender<ChildSignal>,
    pub(crate) context: Option<Value>,
}

/// One restartable unit of work: a function, its arguments and a restart policy.
///
/// Cloning is cheap and every clone observes the same child.
#[derive(Debug, Clone)]
pub struct Child {
    inner: Arc<ChildInner>,
}

#[derive(Debug)]
struct ChildInner {
    id: ChildId,
    policy: RestartPolicy,
    target: Value,
    args: Vec<Value>,
    state: AtomicU8,
    restarts: AtomicU64,
    failures: AtomicU64,
    result: Mutex<Vec<Value>>,
    quit: CancellationToken,
    parent: Mutex<Option<Parent>>,
}

impl Child {
    /// Creates a standalone child; it starts once added to a supervisor.
    pub fn new(
        policy: RestartPolicy,
        target: impl IntoValue,
        args: Vec<Value>,
    ) -> Result<Self, ConfigError> {
        Self::build(policy, target.into_value(), args, None)
    }

    pub(crate) fn build(
        policy: RestartPolicy,
        target: Value,
        args: Vec<Value>,
        parent: Option<Parent>,
    ) -> Result<Self, ConfigError> {
        ensure_callable(&target)?;
        Ok(Self {
            inner: Arc::new(ChildInner {
                id: ChildId::next(),
                policy,
                target,
                args,
                state: AtomicU8::new(ChildState::Standby as u8),
                restarts: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                result: Mutex::new(Vec::new()),
                quit: CancellationToken::new(),
                parent: Mutex::new(parent),
            }),
        })
    }

    pub fn id(&self) -> ChildId {
        self.inner.id
    }

    pub fn policy(&self) -> RestartPolicy {
        self.inner.policy
    }

    pub fn state(&self) -> ChildState {
        ChildState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    pub fn restarts(&self) -> u64 {
        self.inner.restarts.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> ChildStats {
        ChildStats {
            state: self.state(),
            restarts: self.restarts(),
            failures: self.failures(),
        }
    }

    /// Values returned by the last successful call.
    pub fn result(&self) -> Vec<Value> {
        lock(&self.inner.result).clone()
    }

    /// The supervisor owning this child, if any.
    pub fn supervisor(&self) -> Option<SupervisorId> {
        lock(&self.inner.parent).as_ref().map(|parent| parent.supervisor)
    }

    /// Requests a stop. A call in flight is not interrupted; the child stops
    /// after it returns instead of being relaunched.
    pub fn stop(&self) {
        tracing::debug!(child = %self.id(), "force stop");
        self.inner.quit.cancel();
        let _ = self
            .inner
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |raw| {
                match ChildState::from_u8(raw) {
                    ChildState::Running | ChildState::Restarting => {
                        Some(ChildState::ForceQuit as u8)
                    }
                    ChildState::Standby => Some(ChildState::Stopped as u8),
                    ChildState::Stopped | ChildState::ForceQuit => None,
                }
            });
    }

    /// False once a stop was requested.
    pub fn can_run(&self) -> bool {
        !self.inner.quit.is_cancelled()
    }

    pub(crate) fn mark(&self, state: ChildState) {
        self.inner.state.store(state as u8, Ordering::SeqCst);
    }

    pub(crate) fn record_restart(&self) {
        self.inner.restarts.fetch_add(1, Ordering::SeqCst);
    }

    /// Binds the child to a supervisor. A child has at most one owner.
    pub(crate) fn attach(&self, parent: Parent) -> Result<(), RuntimeError> {
        let mut current = lock(&self.inner.parent);
        if let Some(owner) = current.as_ref() {
            return Err(RuntimeError::AlreadySupervised {
                child: self.id(),
                supervisor: owner.supervisor,
            });
        }
        *current = Some(parent);
        Ok(())
    }

    /// Starts one iteration on a new task. Does nothing without a parent.
    pub(crate) fn launch(&self) {
        let Some(parent) = lock(&self.inner.parent).clone() else {
            return;
        };
        if !self.can_run() {
            self.mark(ChildState::Stopped);
            return;
        }
        self.mark(ChildState::Running);
        tokio::spawn(self.clone().run_once(parent));
    }

    async fn run_once(self, parent: Parent) {
        let id = self.id();
        let args = self.call_args(&parent);
        let target = self.inner.target.clone();
        let result = tokio::task::spawn_blocking(move || invoke(&target, args))
            .await
            .unwrap_or_else(|err| Err(InvocationError::Aborted(err.to_string())));

        let outcome = match result {
            Ok(values) => {
                *lock(&self.inner.result) = values;
                ChildOutcome::Done
            }
            Err(err) => {
                self.inner.failures.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(child = %id, error = %err, "call user function failed");
                ChildOutcome::Failed
            }
        };

        let signal = ChildSignal {
            child: self.clone(),
            outcome,
        };
        if parent.signals.send(signal).is_err() {
            tracing::debug!(child = %id, "supervisor is gone, stopping");
            self.mark(ChildState::Stopped);
        }
    }

    fn call_args(&self, parent: &Parent) -> Vec<Value> {
        let Some(context) = &parent.context else {
            return self.inner.args.clone();
        };
        let ctx = ChildContext {
            supervisor: parent.supervisor,
            child: self.id(),
            value: context.clone(),
        };
        let mut args = Vec::with_capacity(self.inner.args.len() + 1);
        args.push(Value::opaque(ctx));
        args.extend(self.inner.args.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, invoke::Func};

    #[test]
    fn new_child_rejects_non_functions() {
        let err = Child::new(RestartPolicy::Always, "not a function", args![5]).unwrap_err();
        assert_eq!(err, ConfigError::NotCallable("string"));
    }

    #[test]
    fn stop_before_attach_goes_straight_to_stopped() {
        let child = Child::new(RestartPolicy::Never, Func::new(|| {}), args![]).unwrap();
        assert_eq!(child.state(), ChildState::Standby);
        child.stop();
        assert_eq!(child.state(), ChildState::Stopped);
        assert!(!child.can_run());
    }

    #[test]
    fn stop_while_running_requests_force_quit() {
        let child = Child::new(RestartPolicy::Always, Func::new(|| {}), args![]).unwrap();
        child.mark(ChildState::Running);
        child.stop();
        assert_eq!(child.state(), ChildState::ForceQuit);
        assert!(child.state().is_running());
    }

    #[test]
    fn context_is_prepended_to_arguments() {
        let (signals, _rx) = mpsc::unbounded_channel();
        let supervisor = SupervisorId::next();
        let child = Child::new(RestartPolicy::Never, Func::new(|_: i64| {}), args![7]).unwrap();
        let parent = Parent {
            supervisor,
            signals,
            context: Some(Value::Str("ctx".into())),
        };

        let args = child.call_args(&parent);
        assert_eq!(args.len(), 2);
        let ctx = args[0].get::<ChildContext>().unwrap();
        assert_eq!(ctx.supervisor(), supervisor);
        assert_eq!(ctx.child(), child.id());
        assert_eq!(ctx.value(), &Value::Str("ctx".into()));
        assert_eq!(args[1], Value::Int(7));
    }
}
