//! Structured change notifications about a hierarchical address-space model.
//!
//! A [`ChangeDelta`] is a tree: each node names the element that changed, a
//! set of [`DeltaFlags`], and child deltas. Each node is classified into a
//! [`DeltaKind`] once, when it is built, so consumers match on the kind
//! instead of re-inspecting subjects and flags.

use std::fmt;

use bitflags::bitflags;
use lumen_primitives::{ModelId, NodeId};

mod walk;

pub use walk::PreOrder;

bitflags! {
	/// What changed on a delta's subject.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct DeltaFlags: u32 {
		/// The subject's content (memory bytes, values) changed.
		const CONTENT = 1 << 0;
		/// The subject's children need to be re-fetched.
		const CHILDREN = 1 << 1;
		/// The subject's structure changed wholesale.
		const STRUCTURE = 1 << 2;
		/// Presentation state (labels, images) changed.
		const STATE = 1 << 3;
		const ADDED = 1 << 4;
		const REMOVED = 1 << 5;
		const REPLACED = 1 << 6;
		const INSERTED = 1 << 7;
		/// Request to select the subject.
		const SELECT = 1 << 8;
		/// Request to expand the subject.
		const EXPAND = 1 << 9;
	}
}

impl DeltaFlags {
	/// Flags that describe a change to the shape of the tree.
	pub const STRUCTURAL: Self = Self::CHILDREN
		.union(Self::STRUCTURE)
		.union(Self::ADDED)
		.union(Self::REMOVED)
		.union(Self::REPLACED)
		.union(Self::INSERTED);
}

/// The element a delta node is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRef {
	/// The address-space model itself.
	Model(ModelId),
	/// A structural descendant of a model.
	Node(NodeId),
}

impl fmt::Display for ElementRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Model(id) => fmt::Display::fmt(id, f),
			Self::Node(id) => fmt::Display::fmt(id, f),
		}
	}
}

/// Classification of one delta node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
	/// `CONTENT` flagged directly on a model root.
	ModelRootContentChange(ModelId),
	/// Any structural flag on a subject that is not a root content change.
	StructuralChange,
	/// Everything else (state, selection, expansion, node content).
	OtherChange,
}

impl DeltaKind {
	fn classify(subject: ElementRef, flags: DeltaFlags) -> Self {
		match subject {
			ElementRef::Model(model) if flags.contains(DeltaFlags::CONTENT) => Self::ModelRootContentChange(model),
			_ if flags.intersects(DeltaFlags::STRUCTURAL) => Self::StructuralChange,
			_ => Self::OtherChange,
		}
	}
}

/// One immutable node of a change notification tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDelta {
	subject: ElementRef,
	flags: DeltaFlags,
	kind: DeltaKind,
	children: Vec<ChangeDelta>,
}

impl ChangeDelta {
	pub fn new(subject: ElementRef, flags: DeltaFlags) -> Self {
		Self {
			subject,
			flags,
			kind: DeltaKind::classify(subject, flags),
			children: Vec::new(),
		}
	}

	/// Shorthand for a `CONTENT` delta on a model root.
	pub fn model_content(model: ModelId) -> Self {
		Self::new(ElementRef::Model(model), DeltaFlags::CONTENT)
	}

	/// Appends a child delta.
	pub fn with_child(mut self, child: ChangeDelta) -> Self {
		self.children.push(child);
		self
	}

	/// Appends several child deltas in order.
	pub fn with_children(mut self, children: impl IntoIterator<Item = ChangeDelta>) -> Self {
		self.children.extend(children);
		self
	}

	pub fn subject(&self) -> ElementRef {
		self.subject
	}

	pub fn flags(&self) -> DeltaFlags {
		self.flags
	}

	pub fn kind(&self) -> DeltaKind {
		self.kind
	}

	pub fn children(&self) -> &[ChangeDelta] {
		&self.children
	}

	/// Iterates this node and all descendants in pre-order.
	pub fn iter(&self) -> PreOrder<'_> {
		PreOrder::new(self)
	}

	/// Total number of nodes in the tree.
	pub fn len(&self) -> usize {
		self.iter().count()
	}

	/// Always false: a delta tree has at least its root.
	pub fn is_empty(&self) -> bool {
		false
	}

	/// Finds the first root content change for `model`, in pre-order.
	///
	/// Content flagged on descendants of the model never matches.
	pub fn find_model_content(&self, model: ModelId) -> Option<&ChangeDelta> {
		self.iter().find(|node| node.kind == DeltaKind::ModelRootContentChange(model))
	}

	/// Union of the flags of every node in the tree.
	pub fn all_flags(&self) -> DeltaFlags {
		self.iter().fold(DeltaFlags::empty(), |acc, node| acc | node.flags)
	}
}

impl<'a> IntoIterator for &'a ChangeDelta {
	type Item = &'a ChangeDelta;
	type IntoIter = PreOrder<'a>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
