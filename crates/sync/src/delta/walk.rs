use super::ChangeDelta;

/// Pre-order iterator over a delta tree.
///
/// Uses an explicit stack so deep notification trees cannot overflow the
/// call stack.
#[derive(Debug, Clone)]
pub struct PreOrder<'a> {
	stack: Vec<&'a ChangeDelta>,
}

impl<'a> PreOrder<'a> {
	pub(super) fn new(root: &'a ChangeDelta) -> Self {
		Self { stack: vec![root] }
	}
}

impl<'a> Iterator for PreOrder<'a> {
	type Item = &'a ChangeDelta;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		self.stack.extend(node.children.iter().rev());
		Some(node)
	}
}
