//! Shared worker primitives for background synchronization work.
//!
//! Provides task classification, serial per-consumer lanes with a shared
//! fallback runtime, and the [`Scheduler`] seam used by the sync engine.

mod class;
mod lane;
mod scheduler;
mod status;
mod task;
mod token;

pub use class::TaskClass;
pub use lane::SerialLane;
pub use scheduler::{InlineScheduler, ManualScheduler, Scheduler, WorkerScheduler};
pub use status::{TaskFailure, TaskStatus, join_error_panic_message};
pub use task::{Task, TaskId, TaskTicket};
pub use token::LogicalClock;
