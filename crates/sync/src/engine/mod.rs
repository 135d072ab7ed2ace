//! Delta-driven, visibility-gated synchronization of one consumer.
//!
//! Per notification the engine:
//! - clears the content cache unconditionally (pessimistic invalidation)
//! - stops if the consumer is not visible
//! - hands deltas without a root content change to the structural handler
//! - snapshots the visible elements, then schedules a refresh (same base,
//!   already applied) or a navigation (moved base, or a recorded base the
//!   consumer never reached)
//!
//! `on_delta` never blocks on the consumer's display work and never returns
//! an error; failures surface through [`Consumer::report_failure`].

use std::sync::{Arc, Weak};

use lumen_primitives::{Address, AddressRange, ConsumerId, ModelId};
use lumen_worker::{Scheduler, Task, TaskStatus, TaskTicket};
use parking_lot::Mutex;

use crate::cache::{CacheEntry, ContentCache};
use crate::config::SyncConfig;
use crate::delta::ChangeDelta;
use crate::descriptor::ContentDescriptor;
use crate::error::{ModelError, Result, SyncError};
use crate::model::{AddressSpaceModel, Consumer, StructuralHandler, VisibilityOracle};

mod tasks;

pub use tasks::{DiscardReason, TaskOutcome};
use tasks::TaskContext;

/// Reaction chosen for one notification. Derived per call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
	/// The consumer is gone; only the cache was cleared.
	Noop,
	/// Cache cleared; nothing scheduled.
	ClearOnly,
	/// Cache cleared and re-snapshotted; refresh scheduled at the same base.
	ClearAndRecache,
	/// Base moved, or the recorded base was never applied; navigation scheduled.
	Renavigate,
}

impl SyncDecision {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Noop => "noop",
			Self::ClearOnly => "clear_only",
			Self::ClearAndRecache => "clear_and_recache",
			Self::Renavigate => "renavigate",
		}
	}
}

/// Collaborators handed to [`SyncEngine::new`].
pub struct EngineParts {
	pub model: Arc<dyn AddressSpaceModel>,
	pub consumer: Weak<dyn Consumer>,
	pub oracle: Arc<dyn VisibilityOracle>,
	pub structural: Arc<dyn StructuralHandler>,
	pub scheduler: Arc<dyn Scheduler>,
}

/// Keeps one consumer's view of one address-space model in sync.
pub struct SyncEngine {
	model_id: ModelId,
	consumer_id: ConsumerId,
	config: SyncConfig,
	structural: Arc<dyn StructuralHandler>,
	scheduler: Arc<dyn Scheduler>,
	ctx: TaskContext,
	cache: Mutex<ContentCache>,
	/// Serializes notifications so each one is handled to completion.
	notify_gate: Mutex<()>,
}

impl SyncEngine {
	/// Attaches to a consumer, recording the model's current base address.
	pub fn new(parts: EngineParts, config: SyncConfig) -> Result<Self> {
		let base = parts.model.base_address().map_err(|e| SyncError::resolution("base address", e))?;
		Self::with_base(parts, config, base)
	}

	/// Attaches to a consumer that is laid out for `base`.
	pub fn with_base(parts: EngineParts, config: SyncConfig, base: Address) -> Result<Self> {
		let EngineParts {
			model,
			consumer,
			oracle,
			structural,
			scheduler,
		} = parts;

		let consumer_id = consumer.upgrade().map(|c| c.id()).ok_or(SyncError::ConsumerUnavailable)?;
		let model_id = model.id();
		tracing::debug!(model = %model_id, consumer = %consumer_id, %base, "sync.engine.attach");

		Ok(Self {
			model_id,
			consumer_id,
			config,
			structural,
			scheduler,
			cache: Mutex::new(ContentCache::new(model_id)),
			notify_gate: Mutex::new(()),
			ctx: TaskContext {
				consumer_id,
				consumer,
				model,
				oracle,
				descriptor: Arc::new(ContentDescriptor::new(base.clone())),
				applied: Arc::new(Mutex::new(base)),
			},
		})
	}

	pub fn model_id(&self) -> ModelId {
		self.model_id
	}

	pub fn consumer_id(&self) -> ConsumerId {
		self.consumer_id
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	/// Base address the consumer was last laid out for.
	pub fn descriptor(&self) -> Address {
		self.ctx.descriptor.base()
	}

	/// Snapshot of the cached generation.
	pub fn cached_entries(&self) -> Vec<CacheEntry> {
		self.cache.lock().entries().to_vec()
	}

	/// Cached ranges whose content differs from the model right now.
	pub fn changed_ranges(&self) -> std::result::Result<Vec<AddressRange>, ModelError> {
		// Fetch from the model outside the cache lock.
		let snapshot = self.cache.lock().clone();
		snapshot.changed_ranges(self.ctx.model.as_ref())
	}

	/// Handles one change notification.
	///
	/// Safe to call from the data source's notification thread. Concurrent
	/// callers are serialized; each call completes its cache and descriptor
	/// updates before the next begins.
	pub fn on_delta(&self, delta: &ChangeDelta) -> SyncDecision {
		let _gate = self.notify_gate.lock();

		// Any change may have shifted what every cached offset means.
		self.cache.lock().clear();

		let decision = self.react(delta);
		tracing::trace!(
			model = %self.model_id,
			consumer = %self.consumer_id,
			subject = %delta.subject(),
			decision = decision.as_str(),
			"sync.delta.handled"
		);
		decision
	}

	fn react(&self, delta: &ChangeDelta) -> SyncDecision {
		let Some(consumer) = self.ctx.consumer.upgrade().filter(|c| !c.is_disposed()) else {
			tracing::debug!(consumer = %self.consumer_id, "sync.delta.consumer_gone");
			return SyncDecision::Noop;
		};

		if !self.ctx.oracle.is_visible(self.consumer_id) {
			return SyncDecision::ClearOnly;
		}

		let Some(node) = delta.find_model_content(self.model_id) else {
			self.structural.handle(delta);
			return SyncDecision::ClearOnly;
		};

		if self.config.eager_cache && !consumer.is_displaying_error() {
			self.snapshot_visible(consumer.as_ref());
		}
		consumer.model_changed(node);

		let base = match self.ctx.model.base_address() {
			Ok(base) => base,
			Err(err) => {
				let err = SyncError::resolution("base address", err);
				tracing::warn!(model = %self.model_id, consumer = %self.consumer_id, error = %err, "sync.delta.base_unresolved");
				consumer.report_failure(&TaskStatus::failed(&err));
				return SyncDecision::ClearOnly;
			}
		};

		if self.ctx.descriptor.matches(&base) {
			// Recorded but never reached: the navigate task was discarded.
			if *self.ctx.applied.lock() != base {
				tracing::debug!(model = %self.model_id, to = %base, "sync.delta.navigation_pending");
				self.submit_navigate(base);
				return SyncDecision::Renavigate;
			}
			self.submit_refresh(base);
			SyncDecision::ClearAndRecache
		} else {
			let previous = self.ctx.descriptor.record(base.clone());
			tracing::debug!(model = %self.model_id, from = %previous, to = %base, "sync.delta.base_moved");
			self.submit_navigate(base);
			SyncDecision::Renavigate
		}
	}

	fn snapshot_visible(&self, consumer: &dyn Consumer) {
		let elements = consumer.visible_elements();
		let rendered_at = self.ctx.descriptor.base();
		match self.cache.lock().cache_elements(elements, rendered_at) {
			Ok(count) => tracing::trace!(consumer = %self.consumer_id, count, "sync.cache.populated"),
			Err(err) => tracing::warn!(consumer = %self.consumer_id, error = %err, "sync.cache.rejected"),
		}
	}

	fn submit_refresh(&self, base: Address) -> TaskTicket {
		let ctx = self.ctx.clone();
		self.scheduler.submit(Task::new("refresh", self.config.refresh_class, move || {
			ctx.finish("refresh", tasks::refresh(&ctx, &base))
		}))
	}

	fn submit_navigate(&self, target: Address) -> TaskTicket {
		let ctx = self.ctx.clone();
		self.scheduler.submit(Task::new("navigate", self.config.navigate_class, move || {
			ctx.finish("navigate", tasks::navigate(&ctx, &target))
		}))
	}
}

impl std::fmt::Debug for SyncEngine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SyncEngine")
			.field("model", &self.model_id)
			.field("consumer", &self.consumer_id)
			.field("descriptor", &self.ctx.descriptor.base())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests;
