//! Universal properties of the notification path.

mod common;

use std::sync::Arc;

use common::Fixture;
use lumen_primitives::{ModelId, NodeId};
use lumen_sync::{AddressSpaceModel, ChangeDelta, DeltaFlags, ElementRef};
use lumen_worker::ManualScheduler;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Subject {
	OwnModel,
	OtherModel,
	Node,
}

fn arb_flags() -> impl Strategy<Value = DeltaFlags> {
	any::<u32>().prop_map(DeltaFlags::from_bits_truncate)
}

fn arb_subject() -> impl Strategy<Value = Subject> {
	prop_oneof![Just(Subject::OwnModel), Just(Subject::OtherModel), Just(Subject::Node)]
}

/// Delta trees as (subject, flags) nodes with nested children.
#[derive(Debug, Clone)]
struct Shape {
	subject: Subject,
	flags: DeltaFlags,
	children: Vec<Shape>,
}

fn arb_shape() -> impl Strategy<Value = Shape> {
	let leaf = (arb_subject(), arb_flags()).prop_map(|(subject, flags)| Shape {
		subject,
		flags,
		children: Vec::new(),
	});
	leaf.prop_recursive(4, 32, 4, |inner| {
		(arb_subject(), arb_flags(), prop::collection::vec(inner, 0..4)).prop_map(|(subject, flags, children)| Shape { subject, flags, children })
	})
}

fn build(shape: &Shape, own: ModelId, other: ModelId) -> ChangeDelta {
	let subject = match shape.subject {
		Subject::OwnModel => ElementRef::Model(own),
		Subject::OtherModel => ElementRef::Model(other),
		Subject::Node => ElementRef::Node(NodeId::next()),
	};
	ChangeDelta::new(subject, shape.flags).with_children(shape.children.iter().map(|c| build(c, own, other)))
}

fn strip_own_root_content(shape: &mut Shape) {
	if matches!(shape.subject, Subject::OwnModel) {
		shape.flags.remove(DeltaFlags::CONTENT);
	}
	shape.children.iter_mut().for_each(strip_own_root_content);
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	#[test]
	fn without_root_content_nothing_is_scheduled(mut shape in arb_shape()) {
		strip_own_root_content(&mut shape);
		let sched = Arc::new(ManualScheduler::new());
		let fx = Fixture::new(100, sched.clone());
		let delta = build(&shape, fx.block.id(), ModelId::next());

		fx.engine.on_delta(&delta);

		prop_assert!(fx.engine.cached_entries().is_empty());
		prop_assert!(sched.is_idle());
		prop_assert_eq!(fx.structural.lock().len(), 1);
	}

	#[test]
	fn invisible_consumers_never_schedule(shape in arb_shape(), rebase in any::<u64>()) {
		let sched = Arc::new(ManualScheduler::new());
		let fx = Fixture::new(100, sched.clone());
		fx.hide();
		let _ = fx.block.rebase(rebase.into());
		let delta = build(&shape, fx.block.id(), ModelId::next());

		fx.engine.on_delta(&delta);
		fx.engine.on_delta(&ChangeDelta::model_content(fx.block.id()));

		prop_assert!(fx.engine.cached_entries().is_empty());
		prop_assert!(sched.is_idle());
		prop_assert!(fx.structural.lock().is_empty());
		prop_assert!(fx.consumer.calls().is_empty());
	}
}
