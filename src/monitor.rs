//! A runnable unit with completion notification for any number of observers.
//!
//! Each [`MonitorUnit::monitor`] call opens a private capacity-1 queue. When
//! a run finishes, the outcome is offered to every queue with `try_send`, so
//! a slow or vanished subscriber never holds up the others.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    error::{ConfigError, InvocationError, RuntimeError},
    id::{SubscriptionId, UnitId},
    invoke::{ensure_callable, invoke},
    messaging::CallResult,
    sync::lock,
    value::{IntoValue, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Done,
    Failed,
}

/// Completion notice, tagged with the id of the subscription it was sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSignal {
    pub subscription: SubscriptionId,
    pub kind: SignalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Standby,
    Running,
    Stopped,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standby => write!(f, "standby"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// One function and its arguments, runnable many times, with pub/sub completion.
///
/// ```rust,no_run
/// use easy_worker::{args, Func, MonitorUnit, SignalKind};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let unit = MonitorUnit::new(Func::new(|a: i64, b: i64| a * b), args![6, 7])?;
/// let (id, mut done) = unit.monitor();
/// unit.run()?;
///
/// let signal = done.recv().await.unwrap();
/// assert_eq!(signal.subscription, id);
/// assert_eq!(signal.kind, SignalKind::Done);
/// assert_eq!(unit.result()[0].as_i64(), Some(42));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MonitorUnit {
    inner: Arc<UnitInner>,
}

#[derive(Debug)]
struct UnitInner {
    id: UnitId,
    target: Value,
    args: Vec<Value>,
    subscribers: Mutex<Subscribers>,
    result: Mutex<Vec<Value>>,
    running: AtomicUsize,
}

#[derive(Debug, Default)]
struct Subscribers {
    stopped: bool,
    senders: HashMap<SubscriptionId, mpsc::Sender<MonitorSignal>>,
}

impl MonitorUnit {
    pub fn new(target: impl IntoValue, args: Vec<Value>) -> Result<Self, ConfigError> {
        let target = target.into_value();
        ensure_callable(&target)?;
        Ok(Self {
            inner: Arc::new(UnitInner {
                id: UnitId::next(),
                target,
                args,
                subscribers: Mutex::new(Subscribers::default()),
                result: Mutex::new(Vec::new()),
                running: AtomicUsize::new(0),
            }),
        })
    }

    /// Creates the unit and starts its first run right away.
    pub fn new_and_run(target: impl IntoValue, args: Vec<Value>) -> Result<Self, ConfigError> {
        let unit = Self::new(target, args)?;
        // A fresh unit cannot be stopped yet.
        let _ = unit.run();
        Ok(unit)
    }

    pub fn id(&self) -> UnitId {
        self.inner.id
    }

    pub fn state(&self) -> UnitState {
        if lock(&self.inner.subscribers).stopped {
            UnitState::Stopped
        } else if self.inner.running.load(Ordering::SeqCst) > 0 {
            UnitState::Running
        } else {
            UnitState::Standby
        }
    }

    /// Opens a subscription. The queue only sees runs finishing after this call.
    ///
    /// On a stopped unit the returned queue is already closed.
    pub fn monitor(&self) -> (SubscriptionId, mpsc::Receiver<MonitorSignal>) {
        let id = SubscriptionId::next();
        let (tx, rx) = mpsc::channel(1);
        let mut subscribers = lock(&self.inner.subscribers);
        if !subscribers.stopped {
            subscribers.senders.insert(id, tx);
        }
        (id, rx)
    }

    /// Closes one subscription. Unknown ids are ignored.
    pub fn demonitor(&self, id: SubscriptionId) {
        if lock(&self.inner.subscribers).senders.remove(&id).is_none() {
            tracing::debug!(unit = %self.id(), subscription = %id, "unknown subscription");
        }
    }

    /// Number of open subscriptions.
    pub fn subscribers(&self) -> usize {
        lock(&self.inner.subscribers).senders.len()
    }

    /// Starts one invocation on a new task and returns immediately.
    pub fn run(&self) -> Result<(), RuntimeError> {
        if lock(&self.inner.subscribers).stopped {
            return Err(RuntimeError::AlreadyStopped);
        }
        self.inner.running.fetch_add(1, Ordering::SeqCst);
        let unit = self.clone();
        tokio::spawn(async move {
            let target = unit.inner.target.clone();
            let args = unit.inner.args.clone();
            let result = tokio::task::spawn_blocking(move || invoke(&target, args))
                .await
                .unwrap_or_else(|err| Err(InvocationError::Aborted(err.to_string())));
            unit.finish(result);
        });
        Ok(())
    }

    /// Runs once and waits for that run. `Ok(true)` when the call succeeded.
    pub async fn run_and_wait(&self) -> Result<bool, RuntimeError> {
        let (id, mut done) = self.monitor();
        if let Err(err) = self.run() {
            self.demonitor(id);
            return Err(err);
        }
        let signal = done.recv().await;
        self.demonitor(id);
        match signal {
            Some(signal) => Ok(signal.kind == SignalKind::Done),
            // Stopped while waiting.
            None => Err(RuntimeError::AlreadyStopped),
        }
    }

    /// Closes every subscription, drops the last result and forbids further runs.
    ///
    /// A call in flight still completes but its outcome is discarded.
    pub fn stop(&self) {
        {
            let mut subscribers = lock(&self.inner.subscribers);
            subscribers.stopped = true;
            subscribers.senders.clear();
        }
        lock(&self.inner.result).clear();
        tracing::debug!(unit = %self.id(), "unit stopped");
    }

    /// Values of the most recent successful run.
    pub fn result(&self) -> Vec<Value> {
        lock(&self.inner.result).clone()
    }

    fn finish(&self, result: CallResult) {
        let subscribers = lock(&self.inner.subscribers);
        self.inner.running.fetch_sub(1, Ordering::SeqCst);

        let kind = match result {
            Ok(values) => {
                if !subscribers.stopped {
                    *lock(&self.inner.result) = values;
                }
                SignalKind::Done
            }
            Err(err) => {
                tracing::warn!(unit = %self.id(), error = %err, "call user function failed");
                SignalKind::Failed
            }
        };

        for (&subscription, sender) in &subscribers.senders {
            match sender.try_send(MonitorSignal { subscription, kind }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(unit = %self.id(), %subscription, "subscriber queue full, signal dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(unit = %self.id(), %subscription, "subscriber gone");
                }
            }
        }
    }
}
