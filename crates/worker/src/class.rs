use serde::{Deserialize, Serialize};

/// Shared execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
	/// Work triggered by a user action; may surface progress to the user.
	Interactive,
	/// System work triggered by model activity; never surfaces progress UI.
	#[default]
	Background,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}

	/// Returns true for non-interactive (system) work.
	pub const fn is_system(self) -> bool {
		matches!(self, Self::Background)
	}
}
