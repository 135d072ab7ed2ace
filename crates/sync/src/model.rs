//! Contracts the sync engine consumes from its collaborators.

use bytes::Bytes;
use lumen_primitives::{Address, AddressRange, ConsumerId, ModelId};
use lumen_worker::TaskStatus;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

use crate::delta::ChangeDelta;
use crate::error::ModelError;

/// A live, addressable data source such as a debug target's memory block.
pub trait AddressSpaceModel: Send + Sync {
	fn id(&self) -> ModelId;

	/// Native-width start address, for models that cannot exceed 64 bits.
	fn start_address(&self) -> Result<u64, ModelError> {
		Err(ModelError::Unsupported("start_address"))
	}

	/// Current base address of the addressable window.
	///
	/// Defaults to [`Self::start_address`] widened to an [`Address`].
	fn base_address(&self) -> Result<Address, ModelError> {
		self.start_address().map(Address::from)
	}

	/// Number of addressable elements exposed by the model.
	fn extent(&self) -> u64;

	/// Reads the content of `range`.
	fn fetch(&self, range: &AddressRange) -> Result<Bytes, ModelError>;
}

/// One element a consumer currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VisibleElement {
	pub range: AddressRange,
	pub content: Bytes,
}

impl VisibleElement {
	pub fn new(range: AddressRange, content: impl Into<Bytes>) -> Self {
		Self {
			range,
			content: content.into(),
		}
	}
}

/// A rendered view over an address-space model.
///
/// All callbacks are invoked either from the notification context
/// (`is_displaying_error`, `visible_elements`, `model_changed`,
/// `report_failure`) or from the consumer's serial lane (`navigate_to`,
/// `refresh`, `report_failure`). Lane callbacks never overlap.
pub trait Consumer: Send + Sync {
	fn id(&self) -> ConsumerId;

	/// True while the consumer shows an error instead of content.
	fn is_displaying_error(&self) -> bool;

	/// Elements in the consumer's current visible window.
	fn visible_elements(&self) -> Vec<VisibleElement>;

	/// Moves the view so that `address` is displayed.
	fn navigate_to(&self, address: &Address) -> Result<(), ModelError>;

	/// Re-reads content for the current window.
	fn refresh(&self) -> Result<(), ModelError>;

	/// Receives the status of a failed background task.
	fn report_failure(&self, status: &TaskStatus);

	/// Observes a root content change before the engine reacts to it.
	fn model_changed(&self, _delta: &ChangeDelta) {}

	/// True once the consumer has been torn down.
	fn is_disposed(&self) -> bool {
		false
	}
}

/// Answers whether a consumer is currently visible.
pub trait VisibilityOracle: Send + Sync {
	fn is_visible(&self, consumer: ConsumerId) -> bool;
}

impl<F> VisibilityOracle for F
where
	F: Fn(ConsumerId) -> bool + Send + Sync,
{
	fn is_visible(&self, consumer: ConsumerId) -> bool {
		self(consumer)
	}
}

/// Visibility oracle backed by a shared set of visible consumers.
#[derive(Debug, Default)]
pub struct VisibilitySet {
	visible: RwLock<FxHashSet<ConsumerId>>,
}

impl VisibilitySet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn show(&self, consumer: ConsumerId) {
		self.visible.write().insert(consumer);
	}

	pub fn hide(&self, consumer: ConsumerId) {
		self.visible.write().remove(&consumer);
	}

	pub fn set(&self, consumer: ConsumerId, visible: bool) {
		if visible {
			self.show(consumer);
		} else {
			self.hide(consumer);
		}
	}
}

impl VisibilityOracle for VisibilitySet {
	fn is_visible(&self, consumer: ConsumerId) -> bool {
		self.visible.read().contains(&consumer)
	}
}

/// Default tree-diff update path for deltas the engine does not own.
pub trait StructuralHandler: Send + Sync {
	fn handle(&self, delta: &ChangeDelta);
}

impl<F> StructuralHandler for F
where
	F: Fn(&ChangeDelta) + Send + Sync,
{
	fn handle(&self, delta: &ChangeDelta) {
		self(delta)
	}
}

/// Structural handler that drops every delta.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreStructural;

impl StructuralHandler for IgnoreStructural {
	fn handle(&self, delta: &ChangeDelta) {
		tracing::trace!(subject = %delta.subject(), nodes = delta.len(), "sync.structural.ignored");
	}
}
