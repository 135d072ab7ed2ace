use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{mpsc, oneshot};

use crate::{LogicalClock, Task, TaskId, TaskStatus, TaskTicket};

struct LaneJob {
	id: TaskId,
	task: Task,
	done: oneshot::Sender<TaskStatus>,
}

/// FIFO executor that runs its tasks strictly one after another.
///
/// One lane per consumer keeps callbacks that touch the consumer's display
/// state serialized. Task bodies run on the blocking pool; the drain loop
/// waits for each to finish before starting the next.
#[derive(Debug, Clone)]
pub struct SerialLane {
	name: Arc<str>,
	tx: mpsc::UnboundedSender<LaneJob>,
	pending: Arc<AtomicUsize>,
	clock: LogicalClock,
}

/// Runtime a new lane drains on.
///
/// Lanes created inside a Tokio context use it. Lanes created on a plain
/// thread, such as a data source's notification thread, share one
/// process-wide runtime.
fn lane_runtime() -> Handle {
	if let Ok(handle) = Handle::try_current() {
		return handle;
	}

	static SHARED: OnceLock<Runtime> = OnceLock::new();
	SHARED
		.get_or_init(|| {
			Builder::new_multi_thread()
				.enable_all()
				.worker_threads(2)
				.thread_name("lumen-lane")
				.build()
				.expect("failed to build shared lane runtime")
		})
		.handle()
		.clone()
}

impl SerialLane {
	/// Creates a lane and spawns its drain loop.
	pub fn new(name: impl Into<Arc<str>>) -> Self {
		let name = name.into();
		let (tx, rx) = mpsc::unbounded_channel();
		let pending = Arc::new(AtomicUsize::new(0));

		let runtime = lane_runtime();
		tracing::trace!(lane = %name, "worker.lane.start");
		runtime.spawn(drain(runtime.clone(), Arc::clone(&name), rx, Arc::clone(&pending)));

		Self {
			name,
			tx,
			pending,
			clock: LogicalClock::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Number of tasks queued or running.
	pub fn pending(&self) -> usize {
		self.pending.load(Ordering::Acquire)
	}

	/// Enqueues a task behind every task already on the lane.
	pub fn push(&self, task: Task) -> TaskTicket {
		let id = TaskId(self.clock.tick());
		let name = task.name();
		let (ticket, done) = TaskTicket::new(id, name);

		self.pending.fetch_add(1, Ordering::AcqRel);
		if let Err(mpsc::error::SendError(job)) = self.tx.send(LaneJob { id, task, done }) {
			self.pending.fetch_sub(1, Ordering::AcqRel);
			tracing::warn!(lane = %self.name, task = name, "worker.lane.closed_on_push");
			let _ = job.done.send(TaskStatus::failed("serial lane closed"));
		}
		ticket
	}
}

async fn drain(runtime: Handle, name: Arc<str>, mut rx: mpsc::UnboundedReceiver<LaneJob>, pending: Arc<AtomicUsize>) {
	while let Some(LaneJob { id, task, done }) = rx.recv().await {
		let task_name = task.name();
		let class = task.class();
		tracing::trace!(
			lane = %name,
			task = task_name,
			task_id = id.0,
			worker_class = class.as_str(),
			system = class.is_system(),
			"worker.lane.run"
		);

		let status = match runtime.spawn_blocking(move || task.run_caught()).await {
			Ok(status) => status,
			Err(err) => TaskStatus::from_join_error(err),
		};
		if let Some(failure) = status.failure() {
			tracing::warn!(lane = %name, task = task_name, task_id = id.0, cause = %failure, "worker.lane.task_failed");
		}

		pending.fetch_sub(1, Ordering::AcqRel);
		let _ = done.send(status);
	}
	tracing::debug!(lane = %name, "worker.lane.drained");
}
