//! Core types for address-space views: addresses, ranges, and identifiers.

/// Arbitrary-precision memory addresses.
pub mod address;
/// Identifier types for models, consumers, and tree nodes.
pub mod ids;
/// Half-open address ranges.
pub mod range;

pub use address::{Address, AddressParseError};
pub use ids::{ConsumerId, ModelId, NodeId};
pub use range::AddressRange;
