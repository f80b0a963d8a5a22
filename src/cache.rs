//! Caching of folded page trees per collection owner.
use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
	directory::{Directory, Parent},
	node::PageRef,
	page::{self, PageNode},
};

/// The top level pages covering a whole collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSet {
	/// Top level pages in index order
	pages: Vec<PageNode>,
}

impl PageSet {
	/// Fold a collection of `len` items.
	#[must_use]
	pub fn build(owner: Parent, len: usize, page_size: usize) -> Self {
		Self { pages: page::build_pages(owner, len, page_size) }
	}

	/// Top level pages.
	#[must_use]
	pub fn pages(&self) -> &[PageNode] {
		&self.pages
	}

	/// Last index covered by the set, `None` if it is empty.
	#[must_use]
	pub fn last(&self) -> Option<usize> {
		self.pages.last().map(PageNode::last)
	}

	/// Whether the set was built for a collection of `len` items.
	///
	/// Only the final index is compared. A collection whose items were
	/// replaced or reordered without changing its length is not detected.
	#[must_use]
	pub fn covers(&self, len: usize) -> bool {
		self.last() == len.checked_sub(1)
	}

	/// The innermost page containing collection index `index`.
	#[must_use]
	pub fn parent_of(&self, index: usize) -> Option<&PageNode> {
		self.pages.iter().find_map(|page| page.parent_of(index))
	}

	/// Look up a page by key, together with the page enclosing it (`None` for
	/// top level pages).
	#[must_use]
	pub fn find(&self, page: PageRef) -> Option<(&PageNode, Option<&PageNode>)> {
		self.pages.iter().find_map(|top| top.find(page.first, page.last))
	}
}

/// Page trees of folded collections, rebuilt when a collection changes
/// length.
#[derive(Debug, Clone)]
pub struct PageCache {
	/// Maximum number of children per page
	page_size: usize,
	/// Cached page sets by owner
	sets: HashMap<Parent, Arc<PageSet>>,
}

impl PageCache {
	/// Create an empty cache folding by `page_size`.
	///
	/// # Panics
	/// A `page_size` of 0 is a programming error.
	#[must_use]
	pub fn new(page_size: usize) -> Self {
		assert!(page_size > 0, "page size must be positive");
		Self { page_size, sets: HashMap::new() }
	}

	/// Maximum number of children per page.
	#[must_use]
	pub fn page_size(&self) -> usize {
		self.page_size
	}

	/// The page set for `parent`'s collection, built on first use and rebuilt
	/// when the collection's length no longer matches. Repeated calls
	/// against an unchanged collection return the same set.
	///
	/// # Panics
	/// Paging a collection that is not initialized is a programming error;
	/// the fetch trigger has to run first.
	pub fn pages(&mut self, dir: &Directory, parent: Parent) -> Arc<PageSet> {
		let collection = dir.collection(parent);
		assert!(collection.is_initialized(), "paging uninitialized collection of {parent:?}");
		let len = collection.len();
		match self.sets.get(&parent) {
			Some(set) if set.covers(len) => Arc::clone(set),
			cached => {
				debug!(?parent, len, stale = cached.is_some(), "Building page set");
				let set = Arc::new(PageSet::build(parent, len, self.page_size));
				self.sets.insert(parent, Arc::clone(&set));
				set
			}
		}
	}

	/// The cached page set for `parent`, without rebuilding.
	#[must_use]
	pub fn get(&self, parent: Parent) -> Option<&Arc<PageSet>> {
		self.sets.get(&parent)
	}

	/// Forget the page set of `parent`.
	pub fn remove(&mut self, parent: Parent) -> Option<Arc<PageSet>> {
		self.sets.remove(&parent)
	}

	/// Forget all page sets.
	pub fn clear(&mut self) {
		self.sets.clear();
	}

	/// Number of cached page sets.
	#[must_use]
	pub fn len(&self) -> usize {
		self.sets.len()
	}

	/// Whether nothing is cached.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.sets.is_empty()
	}
}
