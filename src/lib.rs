//! # easy-worker
//!
//! `easy-worker` runs plain Rust functions concurrently on Tokio and keeps
//! them under control.
//! Functions are erased into [`Func`] values and called with untyped
//! [`Value`] arguments; every call is fault-isolated, so a panic or a bad
//! argument becomes an error value instead of tearing down the caller.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use easy_worker::{args, Config, Func, RestartPolicy, Supervisor, TaskBatch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Worker pool: two workers, up to three retries per task.
//!     let config = Config::new(Func::new(|a: i64, b: i64| a + b), 2, 3, Duration::ZERO)?;
//!     let mut batch = TaskBatch::new(config);
//!     batch.add_task(args![1, 2]);
//!     batch.add_task(args![3, 4]);
//!     let results = batch.run().await?;
//!     println!("{results:?}");
//!
//!     // Supervised child, relaunched whenever it fails.
//!     let supervisor = Supervisor::new();
//!     supervisor.new_child(RestartPolicy::OnError, Func::new(|| println!("tick")), args![])?;
//!     supervisor.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## What you get
//!
//! * **Worker pools** – [`TaskBatch`] for a fixed list of inputs, [`TaskStream`] for a channel of them.
//! * **Supervision** – [`Child`]ren relaunched by a [`Supervisor`] per [`RestartPolicy`].
//! * **Pub/sub completion** – [`MonitorUnit`] notifies any number of subscribers of each run.
//!
//! ## API overview
//!
//! | Item                                   | Purpose                                                  |
//! | -------------------------------------- | -------------------------------------------------------- |
//! | `invoke(&target, args)`                | Call a function value once, fault-isolated               |
//! | `TaskBatch::run().await`               | Run every queued task, results in submission order       |
//! | `TaskStream::run()` / `stop()`         | Process argument sets from a channel until stopped       |
//! | `Supervisor::new_child(policy, f, a)`  | Start a supervised child                                 |
//! | `Supervisor::stop_child(id)`           | Stop one child once its current call returns             |
//! | `Supervisor::stats()`                  | Count children per state                                 |
//! | `get_supervisor(id)`                   | Look up a supervisor anywhere in the process             |
//! | `MonitorUnit::monitor()` / `run()`     | Subscribe to and trigger runs of one function            |
//!
//! Every component that spawns work must be used inside a Tokio runtime.
//! Logging goes through `tracing`; install any subscriber to see it.

pub use child::{Child, ChildContext, ChildState, ChildStats, RestartPolicy};
pub use config::{default_workers, Config, ConfigBuilder, DEFAULT_RETRIES};
pub use error::{ConfigError, InvocationError, RuntimeError};
pub use id::{ChildId, SubscriptionId, SupervisorId, UnitId};
pub use invoke::{ensure_callable, invoke, Func, IntoFunc, Signature};
pub use messaging::{CallResult, ChildOutcome};
pub use monitor::{MonitorSignal, MonitorUnit, SignalKind, UnitState};
pub use pool::{batch::TaskBatch, stream::TaskStream};
pub use supervisor::{
    builder::SupervisorBuilder,
    registry::{get_supervisor, remove_supervisor},
    Supervisor, SupervisorStats,
};
pub use value::{FromValue, IntoValue, IntoValues, Opaque, Value, Variadic};

mod child;
mod config;
mod error;
mod id;
mod invoke;
mod messaging;
mod monitor;
mod pool;
mod supervisor;
mod sync;
mod value;
