use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;
use thiserror::Error;

const LIMB_BITS: u32 = u32::BITS;

/// An arbitrary-precision, non-negative memory address.
///
/// Stored as little-endian 32-bit limbs with no trailing zero limbs, so the
/// derived equality and hashing are structural. Addresses up to 128 bits stay
/// inline.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Address {
	limbs: SmallVec<[u32; 4]>,
}

/// Errors from parsing an [`Address`] out of text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
	/// No digits after the optional radix prefix.
	#[error("empty address")]
	Empty,
	/// A character that is not a digit in the selected radix.
	#[error("invalid digit {digit:?} in address")]
	InvalidDigit { digit: char },
}

impl Address {
	/// Returns the zero address.
	pub fn zero() -> Self {
		Self::default()
	}

	/// Returns true for the zero address.
	pub fn is_zero(&self) -> bool {
		self.limbs.is_empty()
	}

	/// Number of significant bits.
	pub fn bits(&self) -> u32 {
		match self.limbs.last() {
			None => 0,
			Some(top) => (self.limbs.len() as u32 - 1) * LIMB_BITS + (LIMB_BITS - top.leading_zeros()),
		}
	}

	/// Narrows to a native `u64`, if it fits.
	pub fn to_u64(&self) -> Option<u64> {
		if self.bits() > u64::BITS {
			return None;
		}
		Some(self.limbs.iter().rev().fold(0u64, |acc, &limb| (acc << LIMB_BITS) | u64::from(limb)))
	}

	/// Narrows to a native `u128`, if it fits.
	pub fn to_u128(&self) -> Option<u128> {
		if self.bits() > u128::BITS {
			return None;
		}
		Some(self.limbs.iter().rev().fold(0u128, |acc, &limb| (acc << LIMB_BITS) | u128::from(limb)))
	}

	/// Returns `self + delta`. Never overflows.
	pub fn offset(&self, delta: u64) -> Self {
		let mut out = self.clone();
		let mut carry = delta;
		let mut idx = 0;
		while carry != 0 {
			if idx == out.limbs.len() {
				out.limbs.push(0);
			}
			let sum = u64::from(out.limbs[idx]) + (carry & u64::from(u32::MAX));
			out.limbs[idx] = sum as u32;
			carry = (carry >> LIMB_BITS) + (sum >> LIMB_BITS);
			idx += 1;
		}
		out
	}

	/// Returns `self - rhs`, or `None` when `rhs > self`.
	pub fn checked_sub(&self, rhs: &Address) -> Option<Address> {
		if *self < *rhs {
			return None;
		}
		let mut out = self.clone();
		let mut borrow = 0u64;
		for (idx, limb) in out.limbs.iter_mut().enumerate() {
			let sub = u64::from(rhs.limbs.get(idx).copied().unwrap_or(0)) + borrow;
			let cur = u64::from(*limb);
			if cur >= sub {
				*limb = (cur - sub) as u32;
				borrow = 0;
			} else {
				*limb = ((1u64 << LIMB_BITS) + cur - sub) as u32;
				borrow = 1;
			}
		}
		out.normalize();
		Some(out)
	}

	fn normalize(&mut self) {
		while self.limbs.last() == Some(&0) {
			self.limbs.pop();
		}
	}

	/// `self = self * mul + add`, used by the digit parser.
	fn mul_small_add(&mut self, mul: u32, add: u32) {
		let mut carry = u64::from(add);
		for limb in self.limbs.iter_mut() {
			let v = u64::from(*limb) * u64::from(mul) + carry;
			*limb = v as u32;
			carry = v >> LIMB_BITS;
		}
		if carry != 0 {
			self.limbs.push(carry as u32);
		}
	}
}

impl From<u32> for Address {
	fn from(value: u32) -> Self {
		Self::from(u128::from(value))
	}
}

impl From<u64> for Address {
	fn from(value: u64) -> Self {
		Self::from(u128::from(value))
	}
}

impl From<usize> for Address {
	fn from(value: usize) -> Self {
		Self::from(value as u128)
	}
}

impl From<u128> for Address {
	fn from(mut value: u128) -> Self {
		let mut limbs = SmallVec::new();
		while value != 0 {
			limbs.push(value as u32);
			value >>= LIMB_BITS;
		}
		Self { limbs }
	}
}

impl Ord for Address {
	fn cmp(&self, other: &Self) -> Ordering {
		self.limbs
			.len()
			.cmp(&other.limbs.len())
			.then_with(|| self.limbs.iter().rev().cmp(other.limbs.iter().rev()))
	}
}

impl PartialOrd for Address {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl fmt::LowerHex for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut iter = self.limbs.iter().rev();
		match iter.next() {
			None => f.write_str("0"),
			Some(top) => {
				write!(f, "{top:x}")?;
				for limb in iter {
					write!(f, "{limb:08x}")?;
				}
				Ok(())
			}
		}
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{self:x}")
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Address(0x{self:x})")
	}
}

/// Parses `0x`-prefixed hexadecimal or plain decimal.
impl FromStr for Address {
	type Err = AddressParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
			Some(hex) => (hex, 16),
			None => (s, 10),
		};
		if digits.is_empty() {
			return Err(AddressParseError::Empty);
		}

		let mut out = Address::zero();
		for ch in digits.chars() {
			if ch == '_' {
				continue;
			}
			let digit = ch.to_digit(radix).ok_or(AddressParseError::InvalidDigit { digit: ch })?;
			out.mul_small_add(radix, digit);
		}
		Ok(out)
	}
}
