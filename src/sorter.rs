//! Ordering of sibling nodes in the browser tree.
//!
//! Entries are bucketed into categories first (subentries, then leaves or
//! containers if configured, then the rest, then administrative entries if
//! configured) and compared by their relative name within a bucket. Fetch
//! more rows are pinned to the edges, and the quick search leads its
//! siblings.

use std::cmp::Ordering;

use crate::{
	config::{BrowserPreferences, SortBy, SortOrder},
	directory::{Directory, Entry, EntryId},
	dn::Rdn,
	node::{Node, Placeholder},
};

/// Category of subentries.
const SUBENTRY: u8 = 0;
/// Category of leaves or containers, if either is configured to go first.
const FIRST: u8 = 1;
/// Category of ordinary entries.
const NORMAL: u8 = 2;
/// Category of administrative entries, if configured to go last.
const META: u8 = 3;
/// Category of everything that is not an entry.
const OTHER: u8 = 4;

/// Node kinds that are compared among themselves, in the order they are
/// checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
	/// DIT entries
	Entry,
	/// Search results
	SearchResult,
	/// Saved searches
	Search,
	/// Bookmarks
	Bookmark,
}

/// Compares tree nodes according to [`BrowserPreferences`].
#[derive(Debug, Clone)]
pub struct Sorter {
	/// The preferences the order is derived from
	prefs: BrowserPreferences,
}

impl Sorter {
	/// Create a sorter for the given preferences.
	#[must_use]
	pub fn new(prefs: &BrowserPreferences) -> Self {
		Self { prefs: prefs.clone() }
	}

	/// The display bucket of a node. Smaller buckets come first regardless of
	/// the sort order. Search results take the bucket of their entry.
	#[must_use]
	pub fn category(&self, dir: &Directory, node: &Node) -> u8 {
		match *node {
			Node::Entry(id) | Node::SearchResult { entry: id, .. } => {
				self.entry_category(dir.entry(id))
			}
			_ => OTHER,
		}
	}

	/// Bucket of an entry.
	fn entry_category(&self, entry: &Entry) -> u8 {
		let prefs = &self.prefs;
		if entry.flags().subentry {
			SUBENTRY
		} else if prefs.meta_entries_last && entry.is_meta() {
			META
		} else if prefs.leaf_entries_first && !entry.has_children() {
			FIRST
		} else if prefs.container_entries_first && entry.has_children() {
			FIRST
		} else {
			NORMAL
		}
	}

	/// Compare two sibling nodes.
	#[must_use]
	pub fn compare(&self, dir: &Directory, a: &Node, b: &Node) -> Ordering {
		let entries = self.prefs.sort_entries_order;
		let (rank_a, rank_b) = (fetch_rank(a), fetch_rank(b));
		if rank_a != 0 || rank_b != 0 {
			return entries.apply(rank_a.cmp(&rank_b));
		}

		match (is_quick(dir, a), is_quick(dir, b)) {
			(true, true) => return Ordering::Equal,
			(true, false) => return Ordering::Less,
			(false, true) => return Ordering::Greater,
			(false, false) => {}
		}

		let cascade = [
			(Kind::Entry, entries),
			(Kind::SearchResult, entries),
			(Kind::Search, self.prefs.sort_searches_order),
			(Kind::Bookmark, self.prefs.sort_bookmarks_order),
		];
		for (kind, order) in cascade {
			match (kind_of(a) == Some(kind), kind_of(b) == Some(kind)) {
				(false, false) => continue,
				(false, true) => return order.apply(Ordering::Less),
				(true, false) => return order.apply(Ordering::Greater),
				(true, true) => return self.compare_same_kind(dir, a, b, order),
			}
		}
		Ordering::Equal
	}

	/// Compare two nodes that may be absent. An absent node sorts before
	/// present ones, except that fetch more rows keep their edge.
	#[must_use]
	pub fn compare_optional(
		&self,
		dir: &Directory,
		a: Option<&Node>,
		b: Option<&Node>,
	) -> Ordering {
		match (a, b) {
			(Some(a), Some(b)) => self.compare(dir, a, b),
			_ => {
				let rank = |node: Option<&Node>| node.map_or(0, fetch_rank);
				let ordering =
					rank(a).cmp(&rank(b)).then_with(|| a.is_some().cmp(&b.is_some()));
				self.prefs.sort_entries_order.apply(ordering)
			}
		}
	}

	/// Sort `nodes` in place, unless there are at least as many as the sort
	/// limit. Returns whether they were sorted.
	pub fn sort(&self, dir: &Directory, nodes: &mut [Node]) -> bool {
		let limit = self.prefs.sort_limit;
		if limit > 0 && nodes.len() >= limit {
			return false;
		}
		nodes.sort_by(|a, b| self.compare(dir, a, b));
		true
	}

	/// Compare two nodes of the same [`Kind`].
	fn compare_same_kind(&self, dir: &Directory, a: &Node, b: &Node, order: SortOrder) -> Ordering {
		match (*a, *b) {
			(Node::Entry(a), Node::Entry(b))
			| (Node::SearchResult { entry: a, .. }, Node::SearchResult { entry: b, .. }) => {
				self.compare_entries(dir, a, b)
			}
			(Node::Search(a), Node::Search(b)) if order != SortOrder::None => {
				order.apply(cmp_ignore_case(dir.search(a).name(), dir.search(b).name()))
			}
			(Node::Bookmark(a), Node::Bookmark(b)) if order != SortOrder::None => {
				order.apply(cmp_ignore_case(&dir.bookmark(a).name, &dir.bookmark(b).name))
			}
			_ => Ordering::Equal,
		}
	}

	/// Compare two entries by category, then by the configured key.
	fn compare_entries(&self, dir: &Directory, a: EntryId, b: EntryId) -> Ordering {
		let (a, b) = (dir.entry(a), dir.entry(b));
		let category = self.entry_category(a).cmp(&self.entry_category(b));
		if category != Ordering::Equal {
			return category;
		}
		let order = self.prefs.sort_entries_order;
		match self.prefs.sort_entries_by {
			SortBy::None => Ordering::Equal,
			SortBy::RelativeName => {
				order.apply(compare_present(rdn_name(a), rdn_name(b), cmp_ignore_case))
			}
			SortBy::RelativeNameValue => {
				order.apply(compare_present(rdn_value(a), rdn_value(b), compare_values))
			}
		}
	}
}

/// Position of fetch more rows: the top page trigger before everything, the
/// next page trigger after everything.
fn fetch_rank(node: &Node) -> i8 {
	match node {
		Node::Placeholder(Placeholder::TopPage(_)) => -1,
		Node::Placeholder(Placeholder::NextPage(_)) => 1,
		_ => 0,
	}
}

/// Whether `node` shows the designated quick search.
fn is_quick(dir: &Directory, node: &Node) -> bool {
	match *node {
		Node::QuickSearch(_) => true,
		Node::Search(id) => dir.quick_search() == Some(id),
		_ => false,
	}
}

/// The [`Kind`] of a node, if it is compared by kind.
fn kind_of(node: &Node) -> Option<Kind> {
	match node {
		Node::Entry(_) => Some(Kind::Entry),
		Node::SearchResult { .. } => Some(Kind::SearchResult),
		Node::Search(_) => Some(Kind::Search),
		Node::Bookmark(_) => Some(Kind::Bookmark),
		_ => None,
	}
}

/// The full relative name of an entry.
fn rdn_name(entry: &Entry) -> Option<&str> {
	entry.rdn().map(Rdn::name)
}

/// The first relative name value of an entry, unless it is empty.
fn rdn_value(entry: &Entry) -> Option<&str> {
	entry.rdn().map(Rdn::first_value).filter(|value| !value.is_empty())
}

/// Compare two optional keys, missing keys last.
fn compare_present(a: Option<&str>, b: Option<&str>, cmp: fn(&str, &str) -> Ordering) -> Ordering {
	match (a, b) {
		(Some(a), Some(b)) => cmp(a, b),
		(Some(_), None) => Ordering::Less,
		(None, Some(_)) => Ordering::Greater,
		(None, None) => Ordering::Equal,
	}
}

/// Case-insensitive string comparison.
fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
	a.chars().flat_map(char::to_lowercase).cmp(b.chars().flat_map(char::to_lowercase))
}

/// Whether `value` is a non-empty run of ASCII digits.
fn is_numeric(value: &str) -> bool {
	!value.is_empty() && value.bytes().all(|byte| byte.is_ascii_digit())
}

/// Compare relative name values, numbers by magnitude. Numbers sort before
/// other values so that the order stays transitive.
fn compare_values(a: &str, b: &str) -> Ordering {
	match (is_numeric(a), is_numeric(b)) {
		(true, true) => compare_numeric(a, b),
		(true, false) => Ordering::Less,
		(false, true) => Ordering::Greater,
		(false, false) => cmp_ignore_case(a, b),
	}
}

/// Compare two digit strings of any length as integers.
fn compare_numeric(a: &str, b: &str) -> Ordering {
	let a = a.trim_start_matches('0');
	let b = b.trim_start_matches('0');
	a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
