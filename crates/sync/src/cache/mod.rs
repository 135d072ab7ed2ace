//! Single-generation cache of content the consumer last displayed.
//!
//! The cache never merges: every population replaces the previous
//! generation, and any change notification clears it wholesale. Entries are
//! tagged with the base address they were rendered at and are only served
//! while the model still reports that base.

use bytes::Bytes;
use lumen_primitives::{Address, AddressRange, ModelId};
use lumen_worker::LogicalClock;

use crate::error::{CacheError, ModelError};
use crate::model::{AddressSpaceModel, VisibleElement};

/// One cached content window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
	pub range: AddressRange,
	pub content: Bytes,
	/// Logical clock tick of the population that inserted this entry.
	pub inserted_at: u64,
}

/// Cache of previously rendered content for one model.
#[derive(Debug, Clone)]
pub struct ContentCache {
	model: ModelId,
	clock: LogicalClock,
	/// Base address the current generation was rendered at.
	base: Option<Address>,
	/// Sorted by range start; no two entries overlap.
	entries: Vec<CacheEntry>,
}

impl ContentCache {
	pub fn new(model: ModelId) -> Self {
		Self {
			model,
			clock: LogicalClock::new(),
			base: None,
			entries: Vec::new(),
		}
	}

	/// Drops every entry. Safe to call when already empty.
	pub fn clear(&mut self) {
		self.entries.clear();
		self.base = None;
	}

	/// Replaces the cache content with exactly `elements`, rendered at `base`.
	///
	/// Empty ranges are skipped. If any two elements overlap the cache is left
	/// empty and the overlap is returned.
	pub fn cache_elements(&mut self, elements: impl IntoIterator<Item = VisibleElement>, base: Address) -> Result<usize, CacheError> {
		self.clear();

		let mut incoming: Vec<VisibleElement> = elements.into_iter().filter(|e| !e.range.is_empty()).collect();
		incoming.sort_by(|a, b| a.range.cmp(&b.range));
		if let Some(pair) = incoming.windows(2).find(|w| w[0].range.overlaps(&w[1].range)) {
			return Err(CacheError::Overlap {
				first: pair[0].range.clone(),
				second: pair[1].range.clone(),
			});
		}

		let tick = self.clock.tick();
		self.entries = incoming
			.into_iter()
			.map(|e| CacheEntry {
				range: e.range,
				content: e.content,
				inserted_at: tick,
			})
			.collect();
		self.base = Some(base);
		Ok(self.entries.len())
	}

	pub fn entries(&self) -> &[CacheEntry] {
		&self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Base address the current generation was rendered at.
	pub fn base(&self) -> Option<&Address> {
		self.base.as_ref()
	}

	/// Clock tick of the current generation, if populated.
	pub fn generation(&self) -> Option<u64> {
		self.entries.first().map(|e| e.inserted_at)
	}

	/// True if the cached generation was rendered at `base`.
	pub fn is_valid_for(&self, base: &Address) -> bool {
		self.base.as_ref() == Some(base)
	}

	/// The entry whose range contains `addr`.
	pub fn entry_at(&self, addr: &Address) -> Option<&CacheEntry> {
		let idx = self.entries.partition_point(|e| e.range.start() <= addr);
		idx.checked_sub(1).map(|i| &self.entries[i]).filter(|e| e.range.contains(addr))
	}

	/// Cached content for exactly `range`, if still valid at `current_base`.
	pub fn lookup(&self, range: &AddressRange, current_base: &Address) -> Option<&Bytes> {
		if !self.is_valid_for(current_base) {
			return None;
		}
		let idx = self.entries.binary_search_by(|e| e.range.cmp(range)).ok()?;
		Some(&self.entries[idx].content)
	}

	/// Ranges whose current model content differs from the cached snapshot.
	///
	/// Returns nothing when the cache is empty, belongs to another model, or
	/// was rendered at a base the model no longer reports.
	pub fn changed_ranges(&self, model: &dyn AddressSpaceModel) -> Result<Vec<AddressRange>, ModelError> {
		if self.entries.is_empty() || model.id() != self.model {
			return Ok(Vec::new());
		}
		let base = model.base_address()?;
		if !self.is_valid_for(&base) {
			tracing::trace!(model = %self.model, %base, "sync.cache.changed_ranges.stale_base");
			return Ok(Vec::new());
		}

		let mut changed = Vec::new();
		for entry in &self.entries {
			if model.fetch(&entry.range)? != entry.content {
				changed.push(entry.range.clone());
			}
		}
		Ok(changed)
	}
}
