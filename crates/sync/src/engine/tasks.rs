//! Bodies of the background navigate and refresh tasks.
//!
//! Tasks re-read state when they run instead of trusting what was captured
//! at scheduling time. A task whose trigger no longer holds is discarded as
//! a no-op; only resolution failures are reported to the consumer.

use std::sync::{Arc, Weak};

use lumen_primitives::{Address, ConsumerId};
use lumen_worker::TaskStatus;
use parking_lot::Mutex;

use crate::descriptor::ContentDescriptor;
use crate::error::{Result, SyncError};
use crate::model::{AddressSpaceModel, Consumer, VisibilityOracle};

/// Why a task exited without touching the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
	/// The consumer was dropped or disposed after scheduling.
	ConsumerUnavailable,
	/// The consumer is no longer visible.
	ConsumerHidden,
	/// A newer notification moved the recorded or live base address.
	Superseded,
	/// The consumer was already navigated to this address.
	AlreadyApplied,
}

impl DiscardReason {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::ConsumerUnavailable => "consumer_unavailable",
			Self::ConsumerHidden => "consumer_hidden",
			Self::Superseded => "superseded",
			Self::AlreadyApplied => "already_applied",
		}
	}
}

/// Result of a task that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
	Applied,
	Discarded(DiscardReason),
}

/// Shared, read-mostly state a background task needs.
#[derive(Clone)]
pub(crate) struct TaskContext {
	pub(crate) consumer_id: ConsumerId,
	pub(crate) consumer: Weak<dyn Consumer>,
	pub(crate) model: Arc<dyn AddressSpaceModel>,
	pub(crate) oracle: Arc<dyn VisibilityOracle>,
	pub(crate) descriptor: Arc<ContentDescriptor>,
	/// Base the consumer is actually laid out for: the attach base or the
	/// last navigation applied.
	pub(crate) applied: Arc<Mutex<Address>>,
}

impl TaskContext {
	fn live_consumer(&self) -> std::result::Result<Arc<dyn Consumer>, DiscardReason> {
		let consumer = self.consumer.upgrade().filter(|c| !c.is_disposed()).ok_or(DiscardReason::ConsumerUnavailable)?;
		if !self.oracle.is_visible(self.consumer_id) {
			return Err(DiscardReason::ConsumerHidden);
		}
		Ok(consumer)
	}

	/// Runs a task body and turns its result into a status.
	///
	/// Failures are reported to the consumer (if still alive) before being
	/// returned to the scheduler.
	pub(crate) fn finish(&self, task: &'static str, result: Result<TaskOutcome>) -> TaskStatus {
		match result {
			Ok(TaskOutcome::Applied) => {
				tracing::debug!(consumer = %self.consumer_id, task, "sync.task.applied");
				TaskStatus::Ok
			}
			Ok(TaskOutcome::Discarded(reason)) => {
				tracing::debug!(consumer = %self.consumer_id, task, reason = reason.as_str(), "sync.task.discarded");
				TaskStatus::Ok
			}
			Err(err) => {
				tracing::warn!(consumer = %self.consumer_id, task, error = %err, "sync.task.failed");
				let status = TaskStatus::failed(&err);
				if let Some(consumer) = self.consumer.upgrade() {
					consumer.report_failure(&status);
				}
				status
			}
		}
	}
}

/// Moves the consumer to `target` unless a newer notification superseded it.
pub(crate) fn navigate(ctx: &TaskContext, target: &Address) -> Result<TaskOutcome> {
	let consumer = match ctx.live_consumer() {
		Ok(consumer) => consumer,
		Err(reason) => return Ok(TaskOutcome::Discarded(reason)),
	};
	if !ctx.descriptor.matches(target) {
		return Ok(TaskOutcome::Discarded(DiscardReason::Superseded));
	}

	let live = ctx.model.base_address().map_err(|e| SyncError::resolution("base address", e))?;
	if live != *target {
		return Ok(TaskOutcome::Discarded(DiscardReason::Superseded));
	}

	let mut applied = ctx.applied.lock();
	if *applied == *target {
		return Ok(TaskOutcome::Discarded(DiscardReason::AlreadyApplied));
	}
	consumer.navigate_to(target).map_err(|e| SyncError::resolution("navigation", e))?;
	*applied = target.clone();
	Ok(TaskOutcome::Applied)
}

/// Refreshes the consumer's window in place at the recorded base.
pub(crate) fn refresh(ctx: &TaskContext, expected_base: &Address) -> Result<TaskOutcome> {
	let consumer = match ctx.live_consumer() {
		Ok(consumer) => consumer,
		Err(reason) => return Ok(TaskOutcome::Discarded(reason)),
	};

	let live = ctx.model.base_address().map_err(|e| SyncError::resolution("base address", e))?;
	// A moved base means a navigate task is (or will be) queued behind us.
	if live != *expected_base || !ctx.descriptor.matches(expected_base) {
		return Ok(TaskOutcome::Discarded(DiscardReason::Superseded));
	}

	consumer.refresh().map_err(|e| SyncError::resolution("refresh", e))?;
	Ok(TaskOutcome::Applied)
}
