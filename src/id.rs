//! Process-unique identifiers.
//!
//! Every id kind has its own atomic counter starting at 1, so ids are
//! monotonically increasing in creation order.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            pub(crate) fn next() -> Self {
                static LAST: AtomicU64 = AtomicU64::new(0);
                Self(LAST.fetch_add(1, Ordering::Relaxed) + 1)
            }

            /// Raw numeric value.
            pub const fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a [`Child`](crate::Child).
    ChildId
);
define_id!(
    /// Identity of a [`Supervisor`](crate::Supervisor).
    SupervisorId
);
define_id!(
    /// Identity of a [`MonitorUnit`](crate::MonitorUnit).
    UnitId
);
define_id!(
    /// Identity of one subscription on a [`MonitorUnit`](crate::MonitorUnit).
    SubscriptionId
);
