//! Arena holding the entries, searches and bookmarks of one connection.
//!
//! Tree nodes refer to arena slots by id, so parent links never form owning
//! cycles. Every lazily filled collection carries its own fetch state; the
//! only ways to change it are scheduling a fetch, applying the
//! [`FetchEvent`] that answers it, and explicit invalidation.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
	dn::{self, Rdn},
	jobs::{
		FetchEvent, FetchOutcome, FetchTask, FetchedEntry, FetchedPage, PageCursor, SearchRequest,
	},
	node::Node,
};

/// Handle of an entry in a [`Directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

/// Handle of a search in a [`Directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchId(usize);

/// Handle of a bookmark in a [`Directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BookmarkId(usize);

/// Owner of a lazily fetched collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
	/// The children of an entry
	Entry(EntryId),
	/// The results of a search
	Search(SearchId),
}

/// Where a collection is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
	/// Nothing fetched yet, or invalidated since
	Uninitialized,
	/// A fetch was scheduled and has not reported back
	Fetching {
		/// Generation the fetch was scheduled with
		generation: u64,
	},
	/// The last fetch completed
	Initialized,
}

/// An ordered, lazily fetched list of items owned by an entry or a search.
#[derive(Debug, Clone)]
pub struct Collection<T> {
	/// The items fetched so far
	items: Vec<T>,
	/// Lifecycle state
	state: FetchState,
	/// Bumped every time a fetch is scheduled
	generation: u64,
	/// Whether the server held back items because of a limit
	has_more: bool,
	/// Cursor to restart a scrolled paged search from the beginning
	top_page: Option<PageCursor>,
	/// Cursor to continue a scrolled paged search
	next_page: Option<PageCursor>,
	/// Message of the last failed fetch
	error: Option<String>,
}

impl<T> Default for Collection<T> {
	fn default() -> Self {
		Self {
			items: Vec::new(),
			state: FetchState::Uninitialized,
			generation: 0,
			has_more: false,
			top_page: None,
			next_page: None,
			error: None,
		}
	}
}

impl<T> Collection<T> {
	/// The items currently held.
	#[must_use]
	pub fn items(&self) -> &[T] {
		&self.items
	}

	/// Number of items currently held.
	#[must_use]
	pub fn len(&self) -> usize {
		self.items.len()
	}

	/// Whether no items are held.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Current lifecycle state.
	#[must_use]
	pub fn state(&self) -> FetchState {
		self.state
	}

	/// Whether the last fetch completed and nothing invalidated it since.
	#[must_use]
	pub fn is_initialized(&self) -> bool {
		self.state == FetchState::Initialized
	}

	/// Whether a server side limit truncated the collection.
	#[must_use]
	pub fn has_more(&self) -> bool {
		self.has_more
	}

	/// Cursor for the top page fetch trigger, if the collection shows a
	/// later page of a scrolled paged search.
	#[must_use]
	pub fn top_page(&self) -> Option<&PageCursor> {
		self.top_page.as_ref()
	}

	/// Cursor for the next page fetch trigger.
	#[must_use]
	pub fn next_page(&self) -> Option<&PageCursor> {
		self.next_page.as_ref()
	}

	/// Message of the last failed fetch, if it failed.
	#[must_use]
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	/// Move to [`FetchState::Fetching`] and hand out the new generation, unless
	/// a fetch is in flight or the collection is already initialized.
	fn begin_fetch(&mut self) -> Option<u64> {
		match self.state {
			FetchState::Uninitialized => {
				self.generation += 1;
				self.state = FetchState::Fetching { generation: self.generation };
				Some(self.generation)
			}
			FetchState::Fetching { .. } | FetchState::Initialized => None,
		}
	}

	/// Whether a result of `generation` answers the fetch in flight.
	fn is_current(&self, generation: u64) -> bool {
		self.state == FetchState::Fetching { generation }
	}

	/// Store a completed fetch.
	fn complete(&mut self, items: Vec<T>, page: &FetchedPage) {
		self.items = items;
		self.has_more = page.has_more;
		self.top_page = page.top_page.clone();
		self.next_page = page.next_page.clone();
		self.error = None;
		self.state = FetchState::Initialized;
	}

	/// Store a failed fetch: initialized and empty, so the failure does not
	/// retrigger a fetch on every query.
	fn fail(&mut self, message: String) {
		self.items.clear();
		self.has_more = false;
		self.top_page = None;
		self.next_page = None;
		self.error = Some(message);
		self.state = FetchState::Initialized;
	}

	/// Back to [`FetchState::Uninitialized`]. Items stay visible to page
	/// lookups until the next fetch replaces them; a fetch still in flight is
	/// ignored when it reports back.
	fn invalidate(&mut self) {
		self.state = FetchState::Uninitialized;
	}
}

/// Kind flags of an entry relevant for display ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFlags {
	/// An RFC 3672 subentry
	pub subentry: bool,
	/// An alias object
	pub alias: bool,
	/// A referral object
	pub referral: bool,
	/// Schema, configuration or monitor entry announced by the root DSE
	pub directory_meta: bool,
	/// The root DSE itself
	pub root_dse: bool,
}

/// A directory entry.
#[derive(Debug, Clone)]
pub struct Entry {
	/// Distinguished name as received
	dn: String,
	/// Leftmost relative name, `None` for the root DSE
	rdn: Option<Rdn>,
	/// Entry this one is a child of
	parent: Option<EntryId>,
	/// Kind flags
	flags: EntryFlags,
	/// Whether the server indicated children before they were fetched
	has_children_hint: bool,
	/// Fetched children
	children: Collection<EntryId>,
}

impl Entry {
	/// Create an entry that is not yet linked into a directory.
	fn new(dn: &str, parent: Option<EntryId>, flags: EntryFlags, has_children_hint: bool) -> Self {
		Self {
			dn: dn.to_owned(),
			rdn: Rdn::from_dn(dn),
			parent,
			flags,
			has_children_hint,
			children: Collection::default(),
		}
	}

	/// Distinguished name.
	#[must_use]
	pub fn dn(&self) -> &str {
		&self.dn
	}

	/// Leftmost relative name.
	#[must_use]
	pub fn rdn(&self) -> Option<&Rdn> {
		self.rdn.as_ref()
	}

	/// Parent entry, if known.
	#[must_use]
	pub fn parent(&self) -> Option<EntryId> {
		self.parent
	}

	/// Kind flags.
	#[must_use]
	pub fn flags(&self) -> EntryFlags {
		self.flags
	}

	/// Whether the entry is administrative: the root DSE, a directory meta
	/// entry, an alias or a referral.
	#[must_use]
	pub fn is_meta(&self) -> bool {
		let flags = self.flags;
		flags.root_dse || flags.directory_meta || flags.alias || flags.referral
	}

	/// Whether the entry has children. Before the children are fetched this
	/// is the hint the server gave.
	#[must_use]
	pub fn has_children(&self) -> bool {
		if self.children.is_initialized() {
			!self.children.is_empty() || self.children.has_more()
		} else {
			self.has_children_hint
		}
	}

	/// The children collection.
	#[must_use]
	pub fn children(&self) -> &Collection<EntryId> {
		&self.children
	}
}

/// Scope of a saved search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
	/// Only the base entry
	Base,
	/// Direct children of the base entry
	OneLevel,
	/// The whole subtree under the base entry
	Subtree,
}

/// A saved search.
#[derive(Debug, Clone)]
pub struct Search {
	/// Display name
	name: String,
	/// What to ask the server
	request: SearchRequest,
	/// Results, as entries interned in the directory
	results: Collection<EntryId>,
}

impl Search {
	/// Create a search that has not been performed yet.
	#[must_use]
	pub fn new(name: impl Into<String>, request: SearchRequest) -> Self {
		Self { name: name.into(), request, results: Collection::default() }
	}

	/// Display name.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Search parameters.
	#[must_use]
	pub fn request(&self) -> &SearchRequest {
		&self.request
	}

	/// The results collection.
	#[must_use]
	pub fn results(&self) -> &Collection<EntryId> {
		&self.results
	}
}

/// A bookmark pointing at an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
	/// Display name
	pub name: String,
	/// Target DN
	pub dn: String,
}

/// All browser state of one connection.
#[derive(Debug, Clone)]
pub struct Directory {
	/// Entry slots, indexed by [`EntryId`]
	entries: Vec<Entry>,
	/// Normalized DN to entry lookup
	by_dn: HashMap<String, EntryId>,
	/// Search slots, indexed by [`SearchId`]; removed searches leave `None`
	searches: Vec<Option<Search>>,
	/// Bookmark slots, indexed by [`BookmarkId`]
	bookmarks: Vec<Bookmark>,
	/// The search shown in front of the children of its base entry
	quick_search: Option<SearchId>,
}

impl Default for Directory {
	fn default() -> Self {
		Self::new()
	}
}

impl Directory {
	/// The id of the root DSE, which every directory has.
	pub const ROOT: EntryId = EntryId(0);

	/// Create a directory holding only the root DSE.
	#[must_use]
	pub fn new() -> Self {
		let flags = EntryFlags { root_dse: true, ..EntryFlags::default() };
		let root = Entry::new("", None, flags, true);
		Self {
			entries: vec![root],
			by_dn: HashMap::from([(String::new(), Self::ROOT)]),
			searches: Vec::new(),
			bookmarks: Vec::new(),
			quick_search: None,
		}
	}

	/// The root DSE.
	#[must_use]
	pub fn root(&self) -> EntryId {
		Self::ROOT
	}

	/// Look up an entry.
	///
	/// # Panics
	/// Ids are only handed out by this directory, so a foreign id is a bug.
	#[must_use]
	pub fn entry(&self, id: EntryId) -> &Entry {
		&self.entries[id.0]
	}

	/// Find an entry by DN.
	#[must_use]
	pub fn entry_by_dn(&self, dn: &str) -> Option<EntryId> {
		self.by_dn.get(&dn::normalize(dn)).copied()
	}

	/// Add an entry under `parent`, or update the flags of the entry already
	/// known under the same DN. Being the root DSE or a directory meta entry
	/// is only learned from the root DSE and survives later updates.
	pub fn add_entry(
		&mut self,
		parent: Option<EntryId>,
		dn: &str,
		flags: EntryFlags,
		has_children_hint: bool,
	) -> EntryId {
		let key = dn::normalize(dn);
		if let Some(&id) = self.by_dn.get(&key) {
			let entry = &mut self.entries[id.0];
			entry.flags = EntryFlags {
				root_dse: entry.flags.root_dse,
				directory_meta: entry.flags.directory_meta || flags.directory_meta,
				..flags
			};
			if !entry.children.is_initialized() {
				entry.has_children_hint = has_children_hint;
			}
			if entry.parent.is_none() {
				entry.parent = parent;
			}
			return id;
		}
		let id = EntryId(self.entries.len());
		self.entries.push(Entry::new(dn, parent, flags, has_children_hint));
		self.by_dn.insert(key, id);
		id
	}

	/// Look up a search.
	///
	/// # Panics
	/// Panics if the search was removed.
	#[must_use]
	pub fn search(&self, id: SearchId) -> &Search {
		match self.searches.get(id.0) {
			Some(Some(search)) => search,
			_ => panic!("search {id:?} is not part of this directory"),
		}
	}

	/// Mutable access to a search slot.
	fn search_mut(&mut self, id: SearchId) -> &mut Search {
		match self.searches.get_mut(id.0) {
			Some(Some(search)) => search,
			_ => panic!("search {id:?} is not part of this directory"),
		}
	}

	/// Whether `id` still refers to a search.
	#[must_use]
	pub fn contains_search(&self, id: SearchId) -> bool {
		matches!(self.searches.get(id.0), Some(Some(_)))
	}

	/// Ids of all searches, in insertion order.
	pub fn searches(&self) -> impl Iterator<Item = SearchId> + '_ {
		self.searches
			.iter()
			.enumerate()
			.filter_map(|(index, slot)| slot.as_ref().map(|_| SearchId(index)))
	}

	/// Add a search.
	pub fn add_search(&mut self, search: Search) -> SearchId {
		self.searches.push(Some(search));
		SearchId(self.searches.len() - 1)
	}

	/// Remove a search. Clears the quick search if it was the one removed.
	pub fn remove_search(&mut self, id: SearchId) -> Option<Search> {
		if self.quick_search == Some(id) {
			self.quick_search = None;
		}
		self.searches.get_mut(id.0).and_then(Option::take)
	}

	/// Look up a bookmark.
	#[must_use]
	pub fn bookmark(&self, id: BookmarkId) -> &Bookmark {
		&self.bookmarks[id.0]
	}

	/// Ids of all bookmarks.
	pub fn bookmarks(&self) -> impl Iterator<Item = BookmarkId> {
		(0..self.bookmarks.len()).map(BookmarkId)
	}

	/// Add a bookmark.
	pub fn add_bookmark(&mut self, bookmark: Bookmark) -> BookmarkId {
		self.bookmarks.push(bookmark);
		BookmarkId(self.bookmarks.len() - 1)
	}

	/// The current quick search.
	#[must_use]
	pub fn quick_search(&self) -> Option<SearchId> {
		self.quick_search
	}

	/// Designate the quick search.
	pub fn set_quick_search(&mut self, search: Option<SearchId>) {
		self.quick_search = search;
	}

	/// The quick search anchored at `entry`, i.e. whose base is its DN.
	#[must_use]
	pub fn quick_search_at(&self, entry: EntryId) -> Option<SearchId> {
		let id = self.quick_search?;
		let base = &self.search(id).request.base;
		dn::dn_eq(base, &self.entry(entry).dn).then_some(id)
	}

	/// The collection owned by `parent`.
	#[must_use]
	pub fn collection(&self, parent: Parent) -> &Collection<EntryId> {
		match parent {
			Parent::Entry(id) => &self.entry(id).children,
			Parent::Search(id) => &self.search(id).results,
		}
	}

	/// Mutable access to the collection owned by `parent`.
	fn collection_mut(&mut self, parent: Parent) -> &mut Collection<EntryId> {
		match parent {
			Parent::Entry(id) => &mut self.entries[id.0].children,
			Parent::Search(id) => &mut self.search_mut(id).results,
		}
	}

	/// Tree nodes for the items of `parent`'s collection in `first..=last`,
	/// clamped to what the collection currently holds.
	#[must_use]
	pub fn item_nodes(&self, parent: Parent, first: usize, last: usize) -> Vec<Node> {
		let items = self.collection(parent).items();
		let end = last.saturating_add(1).min(items.len());
		let range = items.get(first..end).unwrap_or_default();
		match parent {
			Parent::Entry(_) => range.iter().map(|&id| Node::Entry(id)).collect(),
			Parent::Search(search) => {
				range.iter().map(|&entry| Node::SearchResult { search, entry }).collect()
			}
		}
	}

	/// Position of `entry` within `parent`'s collection.
	#[must_use]
	pub fn position(&self, parent: Parent, entry: EntryId) -> Option<usize> {
		self.collection(parent).items().iter().position(|&id| id == entry)
	}

	/// Schedule a fetch for `parent`'s collection if it is uninitialized and
	/// nothing is in flight. Returns the task to hand to a job submitter.
	pub fn schedule_fetch(
		&mut self,
		parent: Parent,
		cursor: Option<PageCursor>,
	) -> Option<FetchTask> {
		let generation = self.collection_mut(parent).begin_fetch()?;
		let task = match parent {
			Parent::Entry(entry) => FetchTask::InitializeChildren {
				entry,
				dn: self.entry(entry).dn.clone(),
				generation,
				cursor,
			},
			Parent::Search(search) => FetchTask::Search {
				search,
				request: self.search(search).request.clone(),
				generation,
				cursor,
			},
		};
		Some(task)
	}

	/// Mark `parent`'s collection uninitialized so the next query fetches it
	/// again.
	pub fn invalidate(&mut self, parent: Parent) {
		debug!(?parent, "Invalidating collection");
		self.collection_mut(parent).invalidate();
	}

	/// Apply the result of a fetch. Returns the parent whose collection
	/// changed, or `None` if the event answered a fetch that is no longer
	/// current.
	pub fn apply(&mut self, event: FetchEvent) -> Option<Parent> {
		let FetchEvent { parent, generation, outcome } = event;
		if let Parent::Search(id) = parent {
			if !self.contains_search(id) {
				debug!(?parent, "Dropping result for removed search");
				return None;
			}
		}
		if !self.collection(parent).is_current(generation) {
			debug!(?parent, generation, "Dropping stale fetch result");
			return None;
		}
		match outcome {
			FetchOutcome::Completed(page) => {
				let items = self.intern(parent, &page.entries);
				if let Parent::Entry(id) = parent {
					let entry = &mut self.entries[id.0];
					if items.is_empty() && !page.has_more {
						entry.has_children_hint = false;
					}
				}
				self.collection_mut(parent).complete(items, &page);
			}
			FetchOutcome::Cancelled => {
				debug!(?parent, "Fetch cancelled");
				self.collection_mut(parent).invalidate();
			}
			FetchOutcome::Failed(err) => {
				warn!(?parent, "Fetch failed: {err}");
				self.collection_mut(parent).fail(err.to_string());
			}
		}
		Some(parent)
	}

	/// Intern fetched entries, linking children of an entry to it.
	fn intern(&mut self, parent: Parent, fetched: &[FetchedEntry]) -> Vec<EntryId> {
		let mut ids = Vec::with_capacity(fetched.len());
		let mut seen = HashSet::with_capacity(fetched.len());
		for entry in fetched {
			let entry_parent = match parent {
				Parent::Entry(id) => Some(id),
				Parent::Search(_) => self.lookup_parent(&entry.dn),
			};
			let id = self.add_entry(entry_parent, &entry.dn, entry.flags, entry.has_children_hint);
			if seen.insert(id) {
				ids.push(id);
			}
		}
		ids
	}

	/// The known entry a search result hangs under. Naming contexts hang
	/// under the root DSE when it lists them.
	fn lookup_parent(&self, dn: &str) -> Option<EntryId> {
		dn::parent_dn(dn).and_then(|parent| self.entry_by_dn(parent))
	}
}
