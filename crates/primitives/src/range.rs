use std::fmt;

use crate::Address;

/// A half-open range of addresses `[start, start + len)`.
///
/// Ordering is by start address, then length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressRange {
	start: Address,
	len: u64,
}

impl AddressRange {
	/// Creates a range of `len` address units beginning at `start`.
	pub fn new(start: Address, len: u64) -> Self {
		Self { start, len }
	}

	/// First address in the range.
	#[inline]
	pub fn start(&self) -> &Address {
		&self.start
	}

	/// Number of address units covered.
	#[inline]
	pub fn len(&self) -> u64 {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// One past the last address in the range.
	pub fn end(&self) -> Address {
		self.start.offset(self.len)
	}

	/// Returns true if `addr` falls inside the range.
	pub fn contains(&self, addr: &Address) -> bool {
		*addr >= self.start && *addr < self.end()
	}

	/// Returns true if both ranges are non-empty and share at least one address.
	pub fn overlaps(&self, other: &AddressRange) -> bool {
		if self.is_empty() || other.is_empty() {
			return false;
		}
		self.start < other.end() && other.start < self.end()
	}

	/// Offset of `addr` from the range start, if `addr` is inside the range.
	pub fn offset_of(&self, addr: &Address) -> Option<u64> {
		if !self.contains(addr) {
			return None;
		}
		addr.checked_sub(&self.start)?.to_u64()
	}
}

impl fmt::Display for AddressRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}, {})", self.start, self.end())
	}
}
