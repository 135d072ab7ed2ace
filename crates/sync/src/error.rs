//! Error types for models, the content cache, and the sync engine.

use lumen_primitives::{AddressRange, ModelId};
use thiserror::Error;

/// Errors reported by an address-space model or a consumer callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
	/// The model cannot currently answer (target detached, suspended, gone).
	#[error("{model} unavailable: {reason}")]
	Unavailable { model: ModelId, reason: String },

	/// A fetch or navigation fell outside the model's addressable window.
	#[error("range {range} is outside the address space")]
	OutOfRange { range: AddressRange },

	/// The model does not implement the requested query.
	#[error("operation not supported: {0}")]
	Unsupported(&'static str),

	/// Consumer-side failure while applying navigation or refresh.
	#[error("{0}")]
	Consumer(String),
}

/// Errors from populating the content cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
	/// Two elements handed to the cache cover a common address.
	#[error("cached elements overlap: {first} and {second}")]
	Overlap { first: AddressRange, second: AddressRange },
}

/// Errors surfaced by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
	/// The model or consumer could not resolve an address or content.
	#[error("failed to resolve {stage}: {source}")]
	Resolution {
		/// What was being resolved (`base address`, `navigation`, `refresh`).
		stage: &'static str,
		#[source]
		source: ModelError,
	},

	/// The consumer was dropped before the engine could attach to it.
	#[error("consumer is no longer available")]
	ConsumerUnavailable,
}

impl SyncError {
	pub(crate) fn resolution(stage: &'static str, source: ModelError) -> Self {
		Self::Resolution { stage, source }
	}
}

/// Result type for sync engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;
