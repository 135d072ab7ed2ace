//! Byte-backed [`AddressSpaceModel`] for simulations and tests.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use lumen_primitives::{Address, AddressRange, ModelId};
use parking_lot::RwLock;

use crate::delta::ChangeDelta;
use crate::error::ModelError;
use crate::model::AddressSpaceModel;

#[derive(Debug)]
struct BlockState {
	base: Address,
	data: Vec<u8>,
}

/// A contiguous block of bytes at a movable base address.
///
/// Mutators return the [`ChangeDelta`] a live data source would emit for the
/// change; callers forward it to their engines.
#[derive(Debug)]
pub struct MemoryBlock {
	id: ModelId,
	state: RwLock<BlockState>,
	unavailable: AtomicBool,
}

impl MemoryBlock {
	/// Largest size a block may grow to through [`MemoryBlock::write`].
	pub const MAX_LEN: usize = 16 << 20;

	pub fn new(base: Address, data: Vec<u8>) -> Self {
		Self {
			id: ModelId::next(),
			state: RwLock::new(BlockState { base, data }),
			unavailable: AtomicBool::new(false),
		}
	}

	/// Overwrites bytes at `offset` from the base, growing the block if needed.
	///
	/// Fails with [`ModelError::OutOfRange`] when the write would end past
	/// [`MemoryBlock::MAX_LEN`].
	pub fn write(&self, offset: usize, bytes: &[u8]) -> Result<ChangeDelta, ModelError> {
		let mut state = self.state.write();
		let Some(end) = offset.checked_add(bytes.len()).filter(|end| *end <= Self::MAX_LEN) else {
			return Err(ModelError::OutOfRange {
				range: AddressRange::new(state.base.offset(offset as u64), bytes.len() as u64),
			});
		};
		if state.data.len() < end {
			state.data.resize(end, 0);
		}
		state.data[offset..end].copy_from_slice(bytes);
		tracing::trace!(model = %self.id, offset, len = bytes.len(), "sync.memory.write");
		Ok(ChangeDelta::model_content(self.id))
	}

	/// Moves the block to a new base address. Content is unchanged.
	pub fn rebase(&self, base: Address) -> ChangeDelta {
		self.state.write().base = base;
		ChangeDelta::model_content(self.id)
	}

	/// Makes every query fail with [`ModelError::Unavailable`] until reset.
	pub fn set_unavailable(&self, unavailable: bool) {
		self.unavailable.store(unavailable, Ordering::Release);
	}

	/// Full address range currently covered by the block.
	pub fn range(&self) -> AddressRange {
		let state = self.state.read();
		AddressRange::new(state.base.clone(), state.data.len() as u64)
	}

	fn check_available(&self) -> Result<(), ModelError> {
		if self.unavailable.load(Ordering::Acquire) {
			return Err(ModelError::Unavailable {
				model: self.id,
				reason: "block marked unavailable".to_string(),
			});
		}
		Ok(())
	}
}

impl AddressSpaceModel for MemoryBlock {
	fn id(&self) -> ModelId {
		self.id
	}

	fn start_address(&self) -> Result<u64, ModelError> {
		self.check_available()?;
		self.state.read().base.to_u64().ok_or(ModelError::Unsupported("start_address beyond 64 bits"))
	}

	fn base_address(&self) -> Result<Address, ModelError> {
		self.check_available()?;
		Ok(self.state.read().base.clone())
	}

	fn extent(&self) -> u64 {
		self.state.read().data.len() as u64
	}

	fn fetch(&self, range: &AddressRange) -> Result<Bytes, ModelError> {
		self.check_available()?;
		let state = self.state.read();
		let out_of_range = || ModelError::OutOfRange { range: range.clone() };

		let start = range.start().checked_sub(&state.base).and_then(|off| off.to_u64()).ok_or_else(out_of_range)?;
		let end = start.checked_add(range.len()).ok_or_else(out_of_range)?;
		if end > state.data.len() as u64 {
			return Err(out_of_range());
		}
		Ok(Bytes::copy_from_slice(&state.data[start as usize..end as usize]))
	}
}
