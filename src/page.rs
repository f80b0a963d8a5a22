//! Folding of large collections into nested pages.
//!
//! A collection of `len` items is split into pages so that no page shows more
//! than `page_size` direct children, nesting deeper as the collection grows.
//! The nesting factor of a range `[first, last]` is the largest `k` with
//! `page_size^k <= last - first`; the range is cut into blocks of
//! `page_size^k` items, and blocks are subdivided again while `k > 1`. A
//! range of at most `page_size` items is a single page.
//!
//! All arithmetic is done on integers. Computing the factor as
//! `log(diff) / log(page_size)` in floating point rounds down at exact powers
//! (`log(1000) / log(10)` is `2.9999999999999996`), which moves page
//! boundaries.

use crate::{
	directory::{Directory, Parent},
	node::{Node, PageRef},
};

/// One page of a folded collection. Pages only hold indices, the items stay
/// in the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNode {
	/// Owner of the collection
	owner: Parent,
	/// First covered index
	first: usize,
	/// Last covered index, inclusive
	last: usize,
	/// Sub-pages, or `None` if the page shows items directly
	subpages: Option<Vec<PageNode>>,
}

impl PageNode {
	/// First covered index.
	#[must_use]
	pub fn first(&self) -> usize {
		self.first
	}

	/// Last covered index. Used for staleness checks.
	#[must_use]
	pub fn last(&self) -> usize {
		self.last
	}

	/// Owner of the collection.
	#[must_use]
	pub fn owner(&self) -> Parent {
		self.owner
	}

	/// Sub-pages of this page, if it has any.
	#[must_use]
	pub fn subpages(&self) -> Option<&[PageNode]> {
		self.subpages.as_deref()
	}

	/// The key of this page.
	#[must_use]
	pub fn page_ref(&self) -> PageRef {
		PageRef { owner: self.owner, first: self.first, last: self.last }
	}

	/// The children of this page: its sub-pages, or the items in its range as
	/// they are in the collection right now.
	#[must_use]
	pub fn children(&self, dir: &Directory) -> Vec<Node> {
		match &self.subpages {
			Some(subpages) => subpages.iter().map(|page| Node::Page(page.page_ref())).collect(),
			None => dir.item_nodes(self.owner, self.first, self.last),
		}
	}

	/// The innermost page whose range contains `index`, or `None` if `index`
	/// is outside this page.
	#[must_use]
	pub fn parent_of(&self, index: usize) -> Option<&PageNode> {
		if index < self.first || index > self.last {
			return None;
		}
		match &self.subpages {
			Some(subpages) => subpages.iter().find_map(|page| page.parent_of(index)),
			None => Some(self),
		}
	}

	/// Find the page with the given range in this page's subtree, together
	/// with the page directly containing it (`None` if it is this page).
	pub(crate) fn find(&self, first: usize, last: usize) -> Option<(&PageNode, Option<&PageNode>)> {
		if first < self.first || last > self.last {
			return None;
		}
		if first == self.first && last == self.last {
			return Some((self, None));
		}
		let subpages = self.subpages.as_ref()?;
		subpages.iter().find_map(|page| {
			page.find(first, last).map(|(found, enclosing)| (found, enclosing.or(Some(self))))
		})
	}
}

/// The nesting factor for a range spanning `diff + 1` items, and the block
/// size `page_size^factor` that goes with it.
///
/// # Panics
/// A `page_size` of 0 is a programming error.
#[must_use]
pub fn nesting_factor(diff: usize, page_size: usize) -> (u32, usize) {
	assert!(page_size > 0, "page size must be positive");
	if page_size == 1 {
		return (0, 1);
	}
	let mut factor = 0;
	let mut block = 1_usize;
	while block <= diff / page_size {
		block *= page_size;
		factor += 1;
	}
	(factor, block)
}

/// Fold a collection of `len` items into top level pages covering
/// `[0, len - 1]`. An empty collection yields no pages.
///
/// # Panics
/// A `page_size` of 0 is a programming error.
#[must_use]
pub fn build_pages(owner: Parent, len: usize, page_size: usize) -> Vec<PageNode> {
	assert!(page_size > 0, "page size must be positive");
	match len {
		0 => Vec::new(),
		len => build_range(owner, 0, len - 1, page_size),
	}
}

/// Fold the range `[first, last]`.
fn build_range(owner: Parent, first: usize, last: usize, page_size: usize) -> Vec<PageNode> {
	assert!(first <= last, "page range {first}..={last} is inverted");
	let diff = last - first;
	if diff < page_size {
		return vec![PageNode { owner, first, last, subpages: None }];
	}
	let (factor, block) = nesting_factor(diff, page_size);
	let count = diff / block + 1;
	(0..count)
		.map(|i| {
			let group_first = first + i * block;
			let group_last = (group_first + (block - 1)).min(last);
			// A short trailing block holds its items directly instead of
			// nesting a single page with the same range.
			let nested = factor > 1 && group_last - group_first >= page_size;
			let subpages = nested.then(|| build_range(owner, group_first, group_last, page_size));
			PageNode { owner, first: group_first, last: group_last, subpages }
		})
		.collect()
}
