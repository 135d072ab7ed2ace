use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic logical clock.
///
/// Cloned handles share one counter. Ticks start at 1 so `0` can mean
/// "never observed".
#[derive(Debug, Default, Clone)]
pub struct LogicalClock {
	next: Arc<AtomicU64>,
}

impl LogicalClock {
	/// Creates a new clock whose first tick is 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the clock and returns the new tick.
	pub fn tick(&self) -> u64 {
		self.next.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the most recent tick without advancing.
	pub fn now(&self) -> u64 {
		self.next.load(Ordering::Acquire)
	}
}
