//! Engine configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use lumen_worker::TaskClass;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or values.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Tunables for a [`crate::SyncEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
	/// Snapshot the consumer's visible elements on root content changes.
	pub eager_cache: bool,
	/// Class for navigate-to tasks submitted after a base shift.
	pub navigate_class: TaskClass,
	/// Class for refresh tasks submitted after a content change.
	pub refresh_class: TaskClass,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			eager_cache: true,
			navigate_class: TaskClass::Background,
			refresh_class: TaskClass::Background,
		}
	}
}

impl SyncConfig {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	/// Reads and parses a TOML configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&text)
	}
}
