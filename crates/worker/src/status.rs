use std::any::Any;

use thiserror::Error;
use tokio::task::JoinError;

/// Completion status of one submitted task.
///
/// Failures are values, never panics or errors propagated into the
/// submitter's call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
	Ok,
	Failed(TaskFailure),
}

/// Cause attached to a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
	message: String,
}

impl TaskFailure {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

impl TaskStatus {
	/// Builds a failed status from any displayable cause.
	pub fn failed(cause: impl std::fmt::Display) -> Self {
		Self::Failed(TaskFailure::new(cause.to_string()))
	}

	pub fn is_ok(&self) -> bool {
		matches!(self, Self::Ok)
	}

	pub fn failure(&self) -> Option<&TaskFailure> {
		match self {
			Self::Ok => None,
			Self::Failed(failure) => Some(failure),
		}
	}

	/// Maps a join error from the blocking pool into a failed status.
	pub(crate) fn from_join_error(err: JoinError) -> Self {
		if err.is_cancelled() {
			return Self::failed("task cancelled before completion");
		}
		let msg = join_error_panic_message(err).unwrap_or_else(|| "<unknown panic>".to_string());
		Self::failed(format_args!("task panicked: {msg}"))
	}
}

impl<E: std::error::Error> From<Result<(), E>> for TaskStatus {
	fn from(result: Result<(), E>) -> Self {
		match result {
			Ok(()) => Self::Ok,
			Err(err) => Self::failed(err),
		}
	}
}

/// Extracts the panic message from a [`JoinError`], if it was a panic.
pub fn join_error_panic_message(err: JoinError) -> Option<String> {
	if !err.is_panic() {
		return None;
	}
	Some(panic_payload_message(err.into_panic()))
}

pub(crate) fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
	match payload.downcast::<&'static str>() {
		Ok(s) => (*s).to_string(),
		Err(payload) => match payload.downcast::<String>() {
			Ok(s) => *s,
			Err(_) => "<non-string panic payload>".to_string(),
		},
	}
}
