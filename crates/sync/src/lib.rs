//! Keeps rendered views of large, sparse address spaces consistent with a
//! live data source.
//!
//! A [`SyncEngine`] receives [`ChangeDelta`] notifications, pessimistically
//! invalidates its [`ContentCache`], and, only while its consumer is visible,
//! schedules refresh or navigate work through a [`lumen_worker::Scheduler`].

pub mod cache;
pub mod config;
pub mod delta;
mod descriptor;
pub mod engine;
pub mod error;
pub mod memory;
pub mod model;

pub use cache::{CacheEntry, ContentCache};
pub use config::{ConfigError, SyncConfig};
pub use delta::{ChangeDelta, DeltaFlags, DeltaKind, ElementRef};
pub use descriptor::ContentDescriptor;
pub use engine::{DiscardReason, EngineParts, SyncDecision, SyncEngine, TaskOutcome};
pub use error::{CacheError, ModelError, Result, SyncError};
pub use memory::MemoryBlock;
pub use model::{AddressSpaceModel, Consumer, IgnoreStructural, StructuralHandler, VisibilitySet, VisibilityOracle, VisibleElement};
