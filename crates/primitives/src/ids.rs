use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
	($(#[$meta:meta])* $name:ident, $counter:ident, $prefix:literal) => {
		static $counter: AtomicU64 = AtomicU64::new(1);

		$(#[$meta])*
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub struct $name(pub u64);

		impl $name {
			/// Generates a new process-unique identifier.
			pub fn next() -> Self {
				Self($counter.fetch_add(1, Ordering::Relaxed))
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, concat!($prefix, "#{}"), self.0)
			}
		}
	};
}

define_id!(
	/// Identifies one live address-space model (e.g. a memory block).
	ModelId,
	NEXT_MODEL_ID,
	"model"
);

define_id!(
	/// Identifies one consumer (a rendered view over a model).
	ConsumerId,
	NEXT_CONSUMER_ID,
	"consumer"
);

define_id!(
	/// Identifies a non-root element of a model's tree.
	NodeId,
	NEXT_NODE_ID,
	"node"
);
