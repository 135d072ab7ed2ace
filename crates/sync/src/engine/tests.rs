use std::sync::Barrier;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use lumen_primitives::NodeId;
use lumen_worker::ManualScheduler;
use pretty_assertions::assert_eq;

use super::*;
use crate::delta::{DeltaFlags, ElementRef};
use crate::memory::MemoryBlock;
use crate::model::{VisibilitySet, VisibleElement};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
	ModelChanged,
	Navigate(Address),
	Refresh,
	Failure(String),
}

struct MockConsumer {
	id: ConsumerId,
	calls: Mutex<Vec<Call>>,
	visible: Mutex<Vec<VisibleElement>>,
	showing_error: AtomicBool,
	fail_refresh: AtomicBool,
}

impl MockConsumer {
	fn new() -> Self {
		Self {
			id: ConsumerId::next(),
			calls: Mutex::new(Vec::new()),
			visible: Mutex::new(Vec::new()),
			showing_error: AtomicBool::new(false),
			fail_refresh: AtomicBool::new(false),
		}
	}

	fn calls(&self) -> Vec<Call> {
		self.calls.lock().clone()
	}

	fn display_calls(&self) -> Vec<Call> {
		self.calls().into_iter().filter(|c| *c != Call::ModelChanged).collect()
	}
}

impl Consumer for MockConsumer {
	fn id(&self) -> ConsumerId {
		self.id
	}

	fn is_displaying_error(&self) -> bool {
		self.showing_error.load(Ordering::SeqCst)
	}

	fn visible_elements(&self) -> Vec<VisibleElement> {
		self.visible.lock().clone()
	}

	fn navigate_to(&self, address: &Address) -> std::result::Result<(), ModelError> {
		self.calls.lock().push(Call::Navigate(address.clone()));
		Ok(())
	}

	fn refresh(&self) -> std::result::Result<(), ModelError> {
		if self.fail_refresh.load(Ordering::SeqCst) {
			return Err(ModelError::Consumer("table disposed".into()));
		}
		self.calls.lock().push(Call::Refresh);
		Ok(())
	}

	fn report_failure(&self, status: &TaskStatus) {
		let msg = status.failure().map(|f| f.message().to_string()).unwrap_or_default();
		self.calls.lock().push(Call::Failure(msg));
	}

	fn model_changed(&self, _delta: &ChangeDelta) {
		self.calls.lock().push(Call::ModelChanged);
	}
}

struct Harness {
	block: Arc<MemoryBlock>,
	consumer: Arc<MockConsumer>,
	visibility: Arc<VisibilitySet>,
	scheduler: Arc<ManualScheduler>,
	structural: Arc<Mutex<Vec<ChangeDelta>>>,
	engine: SyncEngine,
}

fn harness_with(config: SyncConfig) -> Harness {
	let block = Arc::new(MemoryBlock::new(Address::from(100u64), vec![0; 32]));
	let consumer = Arc::new(MockConsumer::new());
	let visibility = Arc::new(VisibilitySet::new());
	visibility.show(consumer.id);
	let scheduler = Arc::new(ManualScheduler::new());
	let structural = Arc::new(Mutex::new(Vec::new()));

	let log = Arc::clone(&structural);
	let consumer_dyn: Arc<dyn Consumer> = consumer.clone();
	let engine = SyncEngine::new(
		EngineParts {
			model: block.clone(),
			consumer: Arc::downgrade(&consumer_dyn),
			oracle: visibility.clone(),
			structural: Arc::new(move |d: &ChangeDelta| log.lock().push(d.clone())),
			scheduler: scheduler.clone(),
		},
		config,
	)
	.unwrap();

	Harness {
		block,
		consumer,
		visibility,
		scheduler,
		structural,
		engine,
	}
}

fn harness() -> Harness {
	harness_with(SyncConfig::default())
}

fn elem(start: u64, bytes: &[u8]) -> VisibleElement {
	VisibleElement::new(AddressRange::new(Address::from(start), bytes.len() as u64), bytes.to_vec())
}

#[test]
fn attach_records_model_base() {
	let h = harness();
	assert_eq!(h.engine.descriptor(), Address::from(100u64));
	assert_eq!(h.engine.model_id(), h.block.id());
	assert_eq!(h.engine.consumer_id(), h.consumer.id);
}

#[test]
fn attach_fails_for_dropped_consumer() {
	let block: Arc<dyn AddressSpaceModel> = Arc::new(MemoryBlock::new(Address::zero(), vec![]));
	let dropped: Weak<dyn Consumer> = Arc::downgrade(&(Arc::new(MockConsumer::new()) as Arc<dyn Consumer>));
	let result = SyncEngine::new(
		EngineParts {
			model: block,
			consumer: dropped,
			oracle: Arc::new(VisibilitySet::new()),
			structural: Arc::new(crate::model::IgnoreStructural),
			scheduler: Arc::new(ManualScheduler::new()),
		},
		SyncConfig::default(),
	);
	assert_eq!(result.err(), Some(SyncError::ConsumerUnavailable));
}

#[test]
fn content_change_snapshots_visible_elements_before_refresh() {
	let h = harness();
	// The consumer still displays the pre-write bytes.
	*h.consumer.visible.lock() = vec![elem(100, &[0; 4]), elem(104, &[0; 4])];

	let decision = h.engine.on_delta(&h.block.write(0, b"X").unwrap());
	assert_eq!(decision, SyncDecision::ClearAndRecache);
	assert_eq!(h.engine.cached_entries().len(), 2);
	assert_eq!(h.scheduler.pending(), vec!["refresh"]);
	assert_eq!(h.consumer.calls(), vec![Call::ModelChanged]);

	h.scheduler.run_pending();
	assert_eq!(h.consumer.display_calls(), vec![Call::Refresh]);
	assert_eq!(h.engine.changed_ranges(), Ok(vec![AddressRange::new(Address::from(100u64), 4)]));
}

#[test]
fn error_display_skips_snapshot_but_still_refreshes() {
	let h = harness();
	*h.consumer.visible.lock() = vec![elem(100, b"ab")];
	h.consumer.showing_error.store(true, Ordering::SeqCst);

	assert_eq!(h.engine.on_delta(&ChangeDelta::model_content(h.block.id())), SyncDecision::ClearAndRecache);
	assert!(h.engine.cached_entries().is_empty());
	assert_eq!(h.scheduler.pending(), vec!["refresh"]);
}

#[test]
fn eager_cache_can_be_disabled() {
	let h = harness_with(SyncConfig {
		eager_cache: false,
		..SyncConfig::default()
	});
	*h.consumer.visible.lock() = vec![elem(100, b"ab")];

	h.engine.on_delta(&ChangeDelta::model_content(h.block.id()));
	assert!(h.engine.cached_entries().is_empty());
	assert_eq!(h.scheduler.pending(), vec!["refresh"]);
}

#[test]
fn overlapping_snapshot_is_dropped_without_blocking_refresh() {
	let h = harness();
	*h.consumer.visible.lock() = vec![elem(100, b"abcd"), elem(102, b"zz")];

	assert_eq!(h.engine.on_delta(&ChangeDelta::model_content(h.block.id())), SyncDecision::ClearAndRecache);
	assert!(h.engine.cached_entries().is_empty());
	assert_eq!(h.scheduler.pending(), vec!["refresh"]);
}

#[test]
fn next_notification_clears_previous_snapshot() {
	let h = harness();
	*h.consumer.visible.lock() = vec![elem(100, b"ab")];
	h.engine.on_delta(&ChangeDelta::model_content(h.block.id()));
	assert!(!h.engine.cached_entries().is_empty());

	h.visibility.hide(h.consumer.id);
	assert_eq!(h.engine.on_delta(&ChangeDelta::new(ElementRef::Node(NodeId::next()), DeltaFlags::STATE)), SyncDecision::ClearOnly);
	assert!(h.engine.cached_entries().is_empty());
}

#[test]
fn navigation_superseded_by_newer_base_is_discarded() {
	let h = harness();
	h.engine.on_delta(&h.block.rebase(Address::from(200u64)));
	h.engine.on_delta(&h.block.rebase(Address::from(300u64)));
	assert_eq!(h.scheduler.pending(), vec!["navigate", "navigate"]);
	assert_eq!(h.engine.descriptor(), Address::from(300u64));

	let statuses = h.scheduler.run_pending();
	assert!(statuses.iter().all(TaskStatus::is_ok));
	assert_eq!(h.consumer.display_calls(), vec![Call::Navigate(Address::from(300u64))]);
}

#[test]
fn refresh_queued_before_base_move_is_discarded() {
	let h = harness();
	h.engine.on_delta(&h.block.write(0, b"a").unwrap());
	h.engine.on_delta(&h.block.rebase(Address::from(200u64)));
	assert_eq!(h.scheduler.pending(), vec!["refresh", "navigate"]);

	h.scheduler.run_pending();
	assert_eq!(h.consumer.display_calls(), vec![Call::Navigate(Address::from(200u64))]);
}

#[test]
fn duplicate_navigation_applies_once() {
	let h = harness();
	let target = Address::from(200u64);
	h.engine.on_delta(&h.block.rebase(target.clone()));
	let _ = h.engine.submit_navigate(target.clone());
	assert_eq!(h.scheduler.pending(), vec!["navigate", "navigate"]);

	h.scheduler.run_pending();
	assert_eq!(h.consumer.display_calls(), vec![Call::Navigate(target)]);
}

#[test]
fn concurrent_duplicate_navigations_apply_once() {
	let h = harness();
	let target = Address::from(200u64);
	h.engine.on_delta(&h.block.rebase(target.clone()));
	let _ = h.engine.submit_navigate(target.clone());

	let start = Barrier::new(2);
	let statuses: Vec<Option<TaskStatus>> = std::thread::scope(|s| {
		let workers: Vec<_> = (0..2)
			.map(|_| {
				s.spawn(|| {
					start.wait();
					h.scheduler.run_next()
				})
			})
			.collect();
		workers.into_iter().map(|w| w.join().unwrap()).collect()
	});

	assert_eq!(statuses, vec![Some(TaskStatus::Ok), Some(TaskStatus::Ok)]);
	assert_eq!(h.consumer.display_calls(), vec![Call::Navigate(target)]);
}

#[test]
fn navigation_discarded_while_hidden_is_resubmitted_once_shown() {
	let h = harness();
	let target = Address::from(200u64);
	assert_eq!(h.engine.on_delta(&h.block.rebase(target.clone())), SyncDecision::Renavigate);

	h.visibility.hide(h.consumer.id);
	assert_eq!(h.scheduler.run_pending(), vec![TaskStatus::Ok]);
	assert!(h.consumer.display_calls().is_empty());

	h.visibility.show(h.consumer.id);
	assert_eq!(h.engine.on_delta(&h.block.write(0, b"x").unwrap()), SyncDecision::Renavigate);
	assert_eq!(h.engine.descriptor(), target);
	assert_eq!(h.scheduler.pending(), vec!["navigate"]);
	h.scheduler.run_pending();
	assert_eq!(h.consumer.display_calls(), vec![Call::Navigate(target.clone())]);

	// Once the view reached the base, content changes refresh in place.
	assert_eq!(h.engine.on_delta(&h.block.write(0, b"y").unwrap()), SyncDecision::ClearAndRecache);
	h.scheduler.run_pending();
	assert_eq!(h.consumer.display_calls(), vec![Call::Navigate(target), Call::Refresh]);
}

#[test]
fn moving_back_before_navigation_runs_keeps_the_view() {
	let h = harness();
	h.engine.on_delta(&h.block.rebase(Address::from(200u64)));
	h.engine.on_delta(&h.block.rebase(Address::from(100u64)));

	assert_eq!(h.scheduler.run_pending(), vec![TaskStatus::Ok, TaskStatus::Ok]);
	assert!(h.consumer.display_calls().is_empty());
	assert_eq!(h.engine.on_delta(&ChangeDelta::model_content(h.block.id())), SyncDecision::ClearAndRecache);
}

#[test]
fn returning_to_an_earlier_base_navigates_again() {
	let h = harness();
	h.engine.on_delta(&h.block.rebase(Address::from(200u64)));
	h.scheduler.run_pending();
	h.engine.on_delta(&h.block.rebase(Address::from(100u64)));
	h.scheduler.run_pending();

	assert_eq!(
		h.consumer.display_calls(),
		vec![Call::Navigate(Address::from(200u64)), Call::Navigate(Address::from(100u64))]
	);
}

#[test]
fn task_for_hidden_consumer_is_discarded() {
	let h = harness();
	h.engine.on_delta(&ChangeDelta::model_content(h.block.id()));
	h.visibility.hide(h.consumer.id);

	assert_eq!(h.scheduler.run_pending(), vec![TaskStatus::Ok]);
	assert!(h.consumer.display_calls().is_empty());
}

#[test]
fn task_for_dropped_consumer_is_discarded() {
	let Harness {
		block,
		consumer,
		scheduler,
		engine,
		..
	} = harness();
	engine.on_delta(&ChangeDelta::model_content(block.id()));
	drop(consumer);

	assert_eq!(scheduler.run_pending(), vec![TaskStatus::Ok]);
	assert_eq!(engine.on_delta(&ChangeDelta::model_content(block.id())), SyncDecision::Noop);
	assert!(scheduler.is_idle());
}

#[test]
fn unresolvable_base_is_reported_without_scheduling() {
	let h = harness();
	h.block.set_unavailable(true);

	assert_eq!(h.engine.on_delta(&ChangeDelta::model_content(h.block.id())), SyncDecision::ClearOnly);
	assert!(h.scheduler.is_idle());
	let calls = h.consumer.display_calls();
	assert_eq!(calls.len(), 1);
	assert!(matches!(&calls[0], Call::Failure(msg) if msg.contains("base address")));
}

#[test]
fn failure_at_execution_is_reported_once_and_not_retried() {
	let h = harness();
	h.engine.on_delta(&ChangeDelta::model_content(h.block.id()));
	h.consumer.fail_refresh.store(true, Ordering::SeqCst);

	let statuses = h.scheduler.run_pending();
	assert_eq!(statuses.len(), 1);
	assert!(!statuses[0].is_ok());
	assert!(h.scheduler.is_idle());

	let calls = h.consumer.display_calls();
	assert_eq!(calls.len(), 1);
	assert!(matches!(&calls[0], Call::Failure(msg) if msg.contains("table disposed")));
}

#[test]
fn model_unavailable_at_execution_is_a_resolution_failure() {
	let h = harness();
	h.engine.on_delta(&h.block.rebase(Address::from(200u64)));
	h.block.set_unavailable(true);

	let statuses = h.scheduler.run_pending();
	assert!(statuses[0].failure().is_some_and(|f| f.message().contains("failed to resolve base address")));
}

#[test]
fn structural_deltas_go_to_structural_handler() {
	let h = harness();
	let delta = ChangeDelta::new(ElementRef::Model(h.block.id()), DeltaFlags::CHILDREN)
		.with_child(ChangeDelta::new(ElementRef::Node(NodeId::next()), DeltaFlags::CONTENT));

	assert_eq!(h.engine.on_delta(&delta), SyncDecision::ClearOnly);
	assert_eq!(*h.structural.lock(), vec![delta]);
	assert!(h.scheduler.is_idle());
	assert!(h.consumer.calls().is_empty());
}

#[test]
fn content_change_for_another_model_is_structural() {
	let h = harness();
	let other = ChangeDelta::model_content(ModelId::next());
	assert_eq!(h.engine.on_delta(&other), SyncDecision::ClearOnly);
	assert_eq!(h.structural.lock().len(), 1);
	assert!(h.scheduler.is_idle());
}

/// Model whose next fetch parks until the test lets it continue.
struct ParkedFetch {
	inner: MemoryBlock,
	armed: AtomicBool,
	gate: Barrier,
}

impl AddressSpaceModel for ParkedFetch {
	fn id(&self) -> ModelId {
		self.inner.id()
	}

	fn base_address(&self) -> std::result::Result<Address, ModelError> {
		self.inner.base_address()
	}

	fn extent(&self) -> u64 {
		self.inner.extent()
	}

	fn fetch(&self, range: &AddressRange) -> std::result::Result<Bytes, ModelError> {
		if self.armed.swap(false, Ordering::SeqCst) {
			self.gate.wait();
			self.gate.wait();
		}
		self.inner.fetch(range)
	}
}

#[test]
fn changed_ranges_does_not_hold_the_cache_during_fetch() {
	let model = Arc::new(ParkedFetch {
		inner: MemoryBlock::new(Address::from(100u64), vec![0; 8]),
		armed: AtomicBool::new(false),
		gate: Barrier::new(2),
	});
	let consumer = Arc::new(MockConsumer::new());
	*consumer.visible.lock() = vec![elem(100, &[0; 4]), elem(104, &[0; 4])];
	let visibility = Arc::new(VisibilitySet::new());
	visibility.show(consumer.id);

	let consumer_dyn: Arc<dyn Consumer> = consumer.clone();
	let engine = SyncEngine::new(
		EngineParts {
			model: model.clone(),
			consumer: Arc::downgrade(&consumer_dyn),
			oracle: visibility,
			structural: Arc::new(crate::model::IgnoreStructural),
			scheduler: Arc::new(ManualScheduler::new()),
		},
		SyncConfig::default(),
	)
	.unwrap();
	engine.on_delta(&ChangeDelta::model_content(model.id()));
	assert_eq!(engine.cached_entries().len(), 2);

	model.armed.store(true, Ordering::SeqCst);
	std::thread::scope(|s| {
		let reader = s.spawn(|| engine.changed_ranges());
		// Reader is now parked inside the model fetch.
		model.gate.wait();
		let decision = engine.on_delta(&ChangeDelta::new(ElementRef::Node(NodeId::next()), DeltaFlags::STATE));
		assert_eq!(decision, SyncDecision::ClearOnly);
		assert!(engine.cached_entries().is_empty());
		model.gate.wait();
		assert_eq!(reader.join().unwrap(), Ok(vec![]));
	});
}
