//! Common utilities for sync engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use lumen_primitives::{Address, AddressRange, ConsumerId};
use lumen_sync::{
	AddressSpaceModel, ChangeDelta, Consumer, EngineParts, MemoryBlock, ModelError, SyncConfig, SyncEngine, VisibilitySet, VisibleElement,
};
use lumen_worker::{Scheduler, TaskStatus};
use parking_lot::Mutex;

/// One observable consumer callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
	Navigate(Address),
	Refresh,
	Failure(String),
}

/// Consumer that records its callbacks and renders the model window into
/// its visible elements on every navigate/refresh.
pub struct RecordingConsumer {
	id: ConsumerId,
	model: Arc<MemoryBlock>,
	row_len: u64,
	rows: usize,
	top: Mutex<Address>,
	visible: Mutex<Vec<VisibleElement>>,
	calls: Mutex<Vec<Call>>,
}

impl RecordingConsumer {
	pub fn new(model: Arc<MemoryBlock>, row_len: u64, rows: usize) -> Self {
		let top = model.base_address().expect("model base");
		let consumer = Self {
			id: ConsumerId::next(),
			model,
			row_len,
			rows,
			top: Mutex::new(top),
			visible: Mutex::new(Vec::new()),
			calls: Mutex::new(Vec::new()),
		};
		consumer.render();
		consumer
	}

	pub fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	pub fn navigations(&self) -> Vec<Address> {
		self.calls()
			.into_iter()
			.filter_map(|c| match c {
				Call::Navigate(a) => Some(a),
				_ => None,
			})
			.collect()
	}

	pub fn refreshes(&self) -> usize {
		self.calls().iter().filter(|c| **c == Call::Refresh).count()
	}

	pub fn top(&self) -> Address {
		self.top.lock().clone()
	}

	fn render(&self) {
		let top = self.top();
		let rows = (0..self.rows as u64)
			.filter_map(|row| {
				let range = AddressRange::new(top.offset(row * self.row_len), self.row_len);
				self.model.fetch(&range).ok().map(|bytes| VisibleElement::new(range, bytes))
			})
			.collect();
		*self.visible.lock() = rows;
	}
}

impl Consumer for RecordingConsumer {
	fn id(&self) -> ConsumerId {
		self.id
	}

	fn is_displaying_error(&self) -> bool {
		false
	}

	fn visible_elements(&self) -> Vec<VisibleElement> {
		self.visible.lock().clone()
	}

	fn navigate_to(&self, address: &Address) -> Result<(), ModelError> {
		self.calls.lock().push(Call::Navigate(address.clone()));
		*self.top.lock() = address.clone();
		self.render();
		Ok(())
	}

	fn refresh(&self) -> Result<(), ModelError> {
		self.calls.lock().push(Call::Refresh);
		self.render();
		Ok(())
	}

	fn report_failure(&self, status: &TaskStatus) {
		let msg = status.failure().map(|f| f.message().to_string()).unwrap_or_default();
		self.calls.lock().push(Call::Failure(msg));
	}
}

/// Model, consumer, oracle, and engine wired together.
pub struct Fixture {
	pub block: Arc<MemoryBlock>,
	pub consumer: Arc<RecordingConsumer>,
	pub visibility: Arc<VisibilitySet>,
	pub structural: Arc<Mutex<Vec<ChangeDelta>>>,
	pub engine: SyncEngine,
}

impl Fixture {
	pub fn new(base: u64, scheduler: Arc<dyn Scheduler>) -> Self {
		let _ = tracing_subscriber::fmt().with_test_writer().try_init();

		let block = Arc::new(MemoryBlock::new(Address::from(base), (0..=255u8).collect()));
		let consumer = Arc::new(RecordingConsumer::new(Arc::clone(&block), 16, 4));
		let visibility = Arc::new(VisibilitySet::new());
		visibility.show(consumer.id());
		let structural = Arc::new(Mutex::new(Vec::new()));

		let log = Arc::clone(&structural);
		let consumer_dyn: Arc<dyn Consumer> = consumer.clone();
		let engine = SyncEngine::new(
			EngineParts {
				model: block.clone(),
				consumer: Arc::downgrade(&consumer_dyn),
				oracle: visibility.clone(),
				structural: Arc::new(move |d: &ChangeDelta| log.lock().push(d.clone())),
				scheduler,
			},
			SyncConfig::default(),
		)
		.expect("engine attaches");

		Self {
			block,
			consumer,
			visibility,
			structural,
			engine,
		}
	}

	pub fn hide(&self) {
		self.visibility.hide(self.consumer.id());
	}
}
