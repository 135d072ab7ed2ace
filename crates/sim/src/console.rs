//! Consumer that renders fixed-width rows and prints its callbacks.

use std::sync::Arc;

use lumen_primitives::{Address, AddressRange, ConsumerId};
use lumen_sync::{AddressSpaceModel, Consumer, MemoryBlock, ModelError, VisibleElement};
use lumen_worker::TaskStatus;
use parking_lot::Mutex;

pub struct ConsoleConsumer {
	id: ConsumerId,
	model: Arc<MemoryBlock>,
	row_len: u64,
	rows: u64,
	top: Mutex<Address>,
	visible: Mutex<Vec<VisibleElement>>,
}

impl ConsoleConsumer {
	pub fn new(model: Arc<MemoryBlock>, row_len: u64, rows: u64) -> Result<Self, ModelError> {
		let top = model.base_address()?;
		let consumer = Self {
			id: ConsumerId::next(),
			model,
			row_len,
			rows,
			top: Mutex::new(top),
			visible: Mutex::new(Vec::new()),
		};
		consumer.render()?;
		Ok(consumer)
	}

	pub fn top(&self) -> Address {
		self.top.lock().clone()
	}

	/// Fetches every row of the window, stopping at the end of the block.
	fn render(&self) -> Result<(), ModelError> {
		let top = self.top();
		let mut rows = Vec::with_capacity(self.rows as usize);
		for row in 0..self.rows {
			let range = AddressRange::new(top.offset(row * self.row_len), self.row_len);
			match self.model.fetch(&range) {
				Ok(bytes) => rows.push(VisibleElement::new(range, bytes)),
				Err(ModelError::OutOfRange { .. }) => break,
				Err(err) => return Err(err),
			}
		}
		for row in &rows {
			let hex: Vec<String> = row.content.iter().map(|b| format!("{b:02x}")).collect();
			println!("    {:>12} {}", row.range.start().to_string(), hex.join(" "));
		}
		*self.visible.lock() = rows;
		Ok(())
	}
}

impl Consumer for ConsoleConsumer {
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
		println!("  navigate_to({address})");
		*self.top.lock() = address.clone();
		self.render()
	}

	fn refresh(&self) -> Result<(), ModelError> {
		println!("  refresh()");
		self.render()
	}

	fn report_failure(&self, status: &TaskStatus) {
		if let Some(failure) = status.failure() {
			println!("  failure: {}", failure.message());
		}
	}
}
