use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{LogicalClock, SerialLane, Task, TaskId, TaskStatus, TaskTicket};

/// Runs units of work off the submitter's call stack.
///
/// `submit` must return promptly. Each task executes exactly once and its
/// outcome is reported through the returned [`TaskTicket`].
pub trait Scheduler: Send + Sync {
	fn submit(&self, task: Task) -> TaskTicket;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
	fn submit(&self, task: Task) -> TaskTicket {
		(**self).submit(task)
	}
}

/// Scheduler backed by one [`SerialLane`] on the worker runtime.
#[derive(Debug, Clone)]
pub struct WorkerScheduler {
	lane: SerialLane,
}

impl WorkerScheduler {
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		Self { lane: SerialLane::new(name) }
	}

	/// Number of tasks queued or running.
	pub fn pending(&self) -> usize {
		self.lane.pending()
	}

	/// Waits until every task submitted before this call has completed.
	pub async fn flush(&self) {
		self.lane.push(Task::system("flush", || TaskStatus::Ok)).wait().await;
	}
}

impl Scheduler for WorkerScheduler {
	fn submit(&self, task: Task) -> TaskTicket {
		tracing::trace!(lane = self.lane.name(), task = task.name(), worker_class = task.class().as_str(), "worker.scheduler.submit");
		self.lane.push(task)
	}
}

/// Scheduler that runs each task immediately on the submitting thread.
///
/// Panics are still converted into a failed status.
#[derive(Debug, Default)]
pub struct InlineScheduler {
	clock: LogicalClock,
	submitted: AtomicUsize,
}

impl InlineScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Total number of tasks submitted so far.
	pub fn submitted(&self) -> usize {
		self.submitted.load(Ordering::Acquire)
	}
}

impl Scheduler for InlineScheduler {
	fn submit(&self, task: Task) -> TaskTicket {
		self.submitted.fetch_add(1, Ordering::AcqRel);
		let id = TaskId(self.clock.tick());
		let name = task.name();
		let status = task.run_caught();
		TaskTicket::resolved(id, name, status)
	}
}

struct Queued {
	task: Task,
	done: oneshot::Sender<TaskStatus>,
}

/// Scheduler that queues tasks until [`ManualScheduler::run_pending`] is called.
///
/// Lets callers interleave notifications with task execution
/// deterministically, e.g. to exercise stale-task handling.
#[derive(Default)]
pub struct ManualScheduler {
	clock: LogicalClock,
	queue: Mutex<VecDeque<Queued>>,
}

impl ManualScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Names of queued tasks, oldest first.
	pub fn pending(&self) -> Vec<&'static str> {
		self.queue.lock().iter().map(|q| q.task.name()).collect()
	}

	pub fn is_idle(&self) -> bool {
		self.queue.lock().is_empty()
	}

	/// Runs every queued task in FIFO order, including tasks queued while running.
	pub fn run_pending(&self) -> Vec<TaskStatus> {
		let mut statuses = Vec::new();
		while let Some(status) = self.run_next() {
			statuses.push(status);
		}
		statuses
	}

	/// Runs the oldest queued task, if any.
	pub fn run_next(&self) -> Option<TaskStatus> {
		let Queued { task, done } = self.queue.lock().pop_front()?;
		let status = task.run_caught();
		let _ = done.send(status.clone());
		Some(status)
	}
}

impl Scheduler for ManualScheduler {
	fn submit(&self, task: Task) -> TaskTicket {
		let (ticket, done) = TaskTicket::new(TaskId(self.clock.tick()), task.name());
		self.queue.lock().push_back(Queued { task, done });
		ticket
	}
}

impl std::fmt::Debug for ManualScheduler {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ManualScheduler").field("pending", &self.pending()).finish()
	}
}
