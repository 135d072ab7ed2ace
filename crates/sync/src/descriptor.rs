use lumen_primitives::Address;
use parking_lot::RwLock;

/// The engine's record of which base address the consumer was laid out for.
///
/// Written only by the engine on the notification context; background tasks
/// read it to detect that they have been superseded.
#[derive(Debug)]
pub struct ContentDescriptor {
	base: RwLock<Address>,
}

impl ContentDescriptor {
	pub fn new(base: Address) -> Self {
		Self { base: RwLock::new(base) }
	}

	/// Last recorded base address.
	pub fn base(&self) -> Address {
		self.base.read().clone()
	}

	/// True if the recorded base equals `base`.
	pub fn matches(&self, base: &Address) -> bool {
		*self.base.read() == *base
	}

	/// Records a new base, returning the previous one.
	pub(crate) fn record(&self, base: Address) -> Address {
		std::mem::replace(&mut *self.base.write(), base)
	}
}
