pub(crate) mod builder;
pub(crate) mod registry;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, Weak},
};

use tokio::sync::mpsc;

use crate::{
    child::{Child, ChildState, Parent, RestartPolicy},
    error::{ConfigError, RuntimeError},
    id::{ChildId, SupervisorId},
    messaging::{ChildOutcome, ChildSignal},
    sync::lock,
    value::{IntoValue, Value},
};

/// Counts of children per state, taken by scanning every child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SupervisorStats {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub restarting: usize,
}

/// Owns a set of [`Child`]ren and decides, from their outcomes and restart
/// policies, whether each one is relaunched or stopped.
///
/// Children report to one shared queue after every iteration. A single
/// event loop task reads it and is the only place where restarts happen.
/// The handle is cheap to clone. Every supervisor is registered in the
/// process-wide registry until [`remove_supervisor`](crate::remove_supervisor)
/// is called.
#[derive(Debug, Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

#[derive(Debug)]
struct SupervisorInner {
    id: SupervisorId,
    children: Mutex<HashMap<ChildId, Child>>,
    signals: mpsc::UnboundedSender<ChildSignal>,
    context: Option<Value>,
}

impl Supervisor {
    /// Creates, starts and registers a supervisor. Must be called inside a
    /// tokio runtime.
    pub fn new() -> Self {
        Self::start(None)
    }

    /// Like [`Supervisor::new`], but every child receives a
    /// [`ChildContext`](crate::ChildContext) carrying `context` as its first
    /// argument.
    pub fn with_context(context: impl IntoValue) -> Result<Self, ConfigError> {
        let context = context.into_value();
        if context.is_nil() {
            return Err(ConfigError::MissingContext);
        }
        Ok(Self::start(Some(context)))
    }

    fn start(context: Option<Value>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let supervisor = Self {
            inner: Arc::new(SupervisorInner {
                id: SupervisorId::next(),
                children: Mutex::new(HashMap::new()),
                signals: tx,
                context,
            }),
        };
        tokio::spawn(supervise(Arc::downgrade(&supervisor.inner), rx));
        registry::register(supervisor.clone());
        tracing::debug!(supervisor = %supervisor.id(), "supervisor started");
        supervisor
    }

    pub fn id(&self) -> SupervisorId {
        self.inner.id
    }

    pub fn context(&self) -> Option<&Value> {
        self.inner.context.as_ref()
    }

    /// Creates a child owned by this supervisor and starts it.
    pub fn new_child(
        &self,
        policy: RestartPolicy,
        target: impl IntoValue,
        args: Vec<Value>,
    ) -> Result<ChildId, ConfigError> {
        let child = Child::build(policy, target.into_value(), args, Some(self.parent()))?;
        let id = child.id();
        self.adopt(child);
        Ok(id)
    }

    /// Takes ownership of an existing child and starts it.
    ///
    /// A child belongs to at most one supervisor: adding it a second time,
    /// here or elsewhere, fails with [`RuntimeError::AlreadySupervised`].
    pub fn add_child(&self, child: &Child) -> Result<(), RuntimeError> {
        child.attach(self.parent())?;
        self.adopt(child.clone());
        Ok(())
    }

    pub fn get_child(&self, id: ChildId) -> Option<Child> {
        lock(&self.inner.children).get(&id).cloned()
    }

    /// Ids of every owned child, ascending.
    pub fn children(&self) -> Vec<ChildId> {
        let mut ids: Vec<ChildId> = lock(&self.inner.children).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Requests a stop of one child. See [`Child::stop`].
    pub fn stop_child(&self, id: ChildId) -> Result<(), RuntimeError> {
        let child = self.get_child(id).ok_or(RuntimeError::UnknownChild(id))?;
        child.stop();
        Ok(())
    }

    /// Requests a stop of every child. Calls in flight finish first.
    pub fn stop(&self) {
        tracing::debug!(supervisor = %self.id(), "stopping all children");
        for child in lock(&self.inner.children).values() {
            child.stop();
        }
    }

    pub fn stats(&self) -> SupervisorStats {
        let children = lock(&self.inner.children);
        let mut stats = SupervisorStats {
            total: children.len(),
            ..SupervisorStats::default()
        };
        for child in children.values() {
            match child.state() {
                state if state.is_running() => stats.running += 1,
                ChildState::Restarting => stats.restarting += 1,
                ChildState::Stopped => stats.stopped += 1,
                _ => {}
            }
        }
        stats
    }

    fn parent(&self) -> Parent {
        Parent {
            supervisor: self.id(),
            signals: self.inner.signals.clone(),
            context: self.inner.context.clone(),
        }
    }

    fn adopt(&self, child: Child) {
        lock(&self.inner.children).insert(child.id(), child.clone());
        child.launch();
    }

    /// Restart decision for one finished iteration.
    fn handle_signal(&self, signal: ChildSignal) {
        let Some(child) = self.get_child(signal.child.id()) else {
            tracing::warn!(child = %signal.child.id(), "signal from unknown child");
            return;
        };

        if child.can_run() && child.policy().restarts_after(signal.outcome) {
            if signal.outcome == ChildOutcome::Failed {
                child.mark(ChildState::Restarting);
                tracing::debug!(child = %child.id(), "restarting child");
            }
            child.record_restart();
            child.launch();
        } else {
            child.mark(ChildState::Stopped);
            tracing::info!(child = %child.id(), outcome = ?signal.outcome, "child stopped");
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// Event loop of one supervisor. Ends once every handle is dropped; children
/// reporting after that are stopped instead of relaunched.
async fn supervise(
    inner: Weak<SupervisorInner>,
    mut signals: mpsc::UnboundedReceiver<ChildSignal>,
) {
    while let Some(signal) = signals.recv().await {
        let Some(inner) = inner.upgrade() else {
            signal.child.mark(ChildState::Stopped);
            signals.close();
            while let Ok(pending) = signals.try_recv() {
                pending.child.mark(ChildState::Stopped);
            }
            break;
        };
        Supervisor { inner }.handle_signal(signal);
    }
    tracing::debug!("supervisor loop exited");
}
