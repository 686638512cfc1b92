use crate::messaging::ChildOutcome;

/// Decides whether a child is relaunched after an iteration.
///
/// - [`RestartPolicy::Always`] relaunches after success and after failure.
/// - [`RestartPolicy::OnError`] relaunches only after a failure.
/// - [`RestartPolicy::Never`] runs exactly once.
///
/// A stop request overrides every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    Always,
    #[default]
    OnError,
    Never,
}

impl RestartPolicy {
    pub fn restarts_after(self, outcome: ChildOutcome) -> bool {
        match self {
            RestartPolicy::Always => true,
            RestartPolicy::OnError => outcome == ChildOutcome::Failed,
            RestartPolicy::Never => false,
        }
    }
}
