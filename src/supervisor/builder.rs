use crate::{
    child::{Child, RestartPolicy},
    error::ConfigError,
    value::{IntoValue, Value},
};

use super::Supervisor;

/// Builds a [`Supervisor`] together with its initial children.
///
/// Every child is validated by [`SupervisorBuilder::build`] before anything
/// is started, so a bad target leaves no half-populated supervisor behind.
#[derive(Default)]
pub struct SupervisorBuilder {
    context: Option<Value>,
    children: Vec<(RestartPolicy, Value, Vec<Value>)>,
}

impl SupervisorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Passes a [`ChildContext`](crate::ChildContext) wrapping `context` to every child.
    pub fn with_context(mut self, context: impl IntoValue) -> Self {
        self.context = Some(context.into_value());
        self
    }

    /// Adds a child started as soon as the supervisor is built.
    pub fn with_child(
        mut self,
        policy: RestartPolicy,
        target: impl IntoValue,
        args: Vec<Value>,
    ) -> Self {
        self.children.push((policy, target.into_value(), args));
        self
    }

    /// Validates every child, then starts the supervisor and its children.
    pub fn build(self) -> Result<Supervisor, ConfigError> {
        let children = self
            .children
            .into_iter()
            .map(|(policy, target, args)| Child::new(policy, target, args))
            .collect::<Result<Vec<_>, _>>()?;

        let supervisor = match self.context {
            Some(context) => Supervisor::with_context(context)?,
            None => Supervisor::new(),
        };
        for child in &children {
            // Fresh children have no owner yet.
            let _ = supervisor.add_child(child);
        }
        Ok(supervisor)
    }
}
