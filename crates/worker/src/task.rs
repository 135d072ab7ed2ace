use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::oneshot;

use crate::status::panic_payload_message;
use crate::{TaskClass, TaskStatus};

/// Identifier assigned to a task at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

type TaskFn = Box<dyn FnOnce() -> TaskStatus + Send + 'static>;

/// One unit of work handed to a [`crate::Scheduler`].
pub struct Task {
	name: &'static str,
	class: TaskClass,
	run: TaskFn,
}

impl Task {
	pub fn new<F>(name: &'static str, class: TaskClass, f: F) -> Self
	where
		F: FnOnce() -> TaskStatus + Send + 'static,
	{
		Self {
			name,
			class,
			run: Box::new(f),
		}
	}

	/// Creates a non-interactive task triggered by model activity.
	pub fn system<F>(name: &'static str, f: F) -> Self
	where
		F: FnOnce() -> TaskStatus + Send + 'static,
	{
		Self::new(name, TaskClass::Background, f)
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn class(&self) -> TaskClass {
		self.class
	}

	/// Runs the task on the current thread, converting a panic into a failed status.
	pub(crate) fn run_caught(self) -> TaskStatus {
		let name = self.name;
		match catch_unwind(AssertUnwindSafe(self.run)) {
			Ok(status) => status,
			Err(payload) => {
				let msg = panic_payload_message(payload);
				tracing::error!(task = name, panic = %msg, "worker.task.panicked");
				TaskStatus::failed(format_args!("task panicked: {msg}"))
			}
		}
	}
}

impl fmt::Debug for Task {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task").field("name", &self.name).field("class", &self.class).finish_non_exhaustive()
	}
}

/// Handle returned by [`crate::Scheduler::submit`].
///
/// Dropping the ticket does not cancel the task.
#[derive(Debug)]
pub struct TaskTicket {
	id: TaskId,
	name: &'static str,
	rx: oneshot::Receiver<TaskStatus>,
}

impl TaskTicket {
	pub(crate) fn new(id: TaskId, name: &'static str) -> (Self, oneshot::Sender<TaskStatus>) {
		let (tx, rx) = oneshot::channel();
		(Self { id, name, rx }, tx)
	}

	/// Creates a ticket that is already complete.
	pub(crate) fn resolved(id: TaskId, name: &'static str, status: TaskStatus) -> Self {
		let (ticket, tx) = Self::new(id, name);
		let _ = tx.send(status);
		ticket
	}

	pub fn id(&self) -> TaskId {
		self.id
	}

	pub fn name(&self) -> &'static str {
		self.name
	}

	/// Returns the status if the task has already completed.
	pub fn try_status(&mut self) -> Option<TaskStatus> {
		match self.rx.try_recv() {
			Ok(status) => Some(status),
			Err(oneshot::error::TryRecvError::Empty) => None,
			Err(oneshot::error::TryRecvError::Closed) => Some(dropped_status()),
		}
	}

	/// Waits for the task to complete.
	pub async fn wait(self) -> TaskStatus {
		self.rx.await.unwrap_or_else(|_| dropped_status())
	}

	/// Blocks the current thread until the task completes.
	///
	/// Must not be called from within an async context.
	pub fn wait_blocking(self) -> TaskStatus {
		self.rx.blocking_recv().unwrap_or_else(|_| dropped_status())
	}
}

fn dropped_status() -> TaskStatus {
	TaskStatus::failed("task dropped before completion")
}
