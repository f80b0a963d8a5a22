//! The lazy tree contract: children, parent and has-children queries over a
//! [`Directory`].
//!
//! Queries never block. A query touching a collection that has not been
//! fetched schedules a fetch through the [`JobSubmitter`] and answers with a
//! placeholder; once the caller has applied the resulting
//! [`FetchEvent`](crate::jobs::FetchEvent) the same query returns the items,
//! folded into pages when there are more than the folding size.

use std::sync::Arc;

use crate::{
	cache::{PageCache, PageSet},
	config::BrowserPreferences,
	directory::{Directory, EntryId, Parent, SearchId},
	error::Error,
	jobs::{JobSubmitter, PageCursor},
	node::{CategoryKind, FetchingKind, Node, PageRef, Placeholder},
	sorter::Sorter,
};

/// What a viewer shows at its top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
	/// The categories of a connection
	Connection,
	/// A fixed list of entries
	Entries(Vec<EntryId>),
	/// The children of a node
	Node(Node),
}

/// Answers tree queries for one viewer.
#[derive(Debug)]
pub struct ContentProvider<S> {
	/// Folding, sorting and filtering preferences
	prefs: BrowserPreferences,
	/// Orders the children handed out
	sorter: Sorter,
	/// Page trees of folded collections
	pages: PageCache,
	/// Where fetches are sent
	submitter: S,
}

impl<S: JobSubmitter> ContentProvider<S> {
	/// Create a provider sending fetches to `submitter`.
	pub fn new(prefs: BrowserPreferences, submitter: S) -> Result<Self, Error> {
		prefs.validate()?;
		Ok(Self {
			sorter: Sorter::new(&prefs),
			pages: PageCache::new(prefs.folding_size),
			prefs,
			submitter,
		})
	}

	/// The preferences in effect.
	#[must_use]
	pub fn preferences(&self) -> &BrowserPreferences {
		&self.prefs
	}

	/// Replace the preferences. Cached page trees are dropped, as they depend
	/// on the folding size.
	pub fn set_preferences(&mut self, prefs: BrowserPreferences) -> Result<(), Error> {
		prefs.validate()?;
		self.sorter = Sorter::new(&prefs);
		self.pages = PageCache::new(prefs.folding_size);
		self.prefs = prefs;
		Ok(())
	}

	/// The sorter applied to children.
	#[must_use]
	pub fn sorter(&self) -> &Sorter {
		&self.sorter
	}

	/// The submitter fetches are sent to.
	#[must_use]
	pub fn submitter(&self) -> &S {
		&self.submitter
	}

	/// The top level nodes for `input`.
	pub fn elements(&mut self, dir: &mut Directory, input: &Input) -> Vec<Node> {
		match input {
			Input::Connection => {
				let prefs = &self.prefs;
				[
					(prefs.show_dit, CategoryKind::Dit),
					(prefs.show_searches, CategoryKind::Searches),
					(prefs.show_bookmarks, CategoryKind::Bookmarks),
				]
				.into_iter()
				.filter_map(|(shown, kind)| shown.then_some(Node::Category(kind)))
				.collect()
			}
			Input::Entries(entries) => entries.iter().map(|&id| Node::Entry(id)).collect(),
			Input::Node(node) => self.children(dir, node),
		}
	}

	/// The sorted children of `node`. Unfetched collections yield a single
	/// placeholder and get a fetch scheduled.
	pub fn children(&mut self, dir: &mut Directory, node: &Node) -> Vec<Node> {
		let mut nodes = match *node {
			Node::Category(kind) => category_children(dir, kind),
			Node::Entry(id) if id == dir.root() => self.root_children(dir),
			Node::Entry(id) => self.entry_children(dir, id),
			Node::Search(id) | Node::QuickSearch(id) if dir.contains_search(id) => {
				self.search_children(dir, id)
			}
			Node::Page(page) if owner_exists(dir, page.owner) => self.page_children(dir, page),
			_ => return Vec::new(),
		};
		self.sorter.sort(dir, &mut nodes);
		nodes
	}

	/// The node `node` is shown under, or `None` for top level nodes and
	/// nodes that are no longer part of the tree.
	pub fn parent(&mut self, dir: &Directory, node: &Node) -> Option<Node> {
		match *node {
			Node::Category(_) | Node::Placeholder(Placeholder::Fetching(_)) => None,
			Node::Entry(id) => match dir.entry(id).parent() {
				None => Some(Node::Category(CategoryKind::Dit)),
				Some(parent) => self.item_parent(dir, Parent::Entry(parent), id),
			},
			Node::SearchResult { search, entry } if dir.contains_search(search) => {
				self.item_parent(dir, Parent::Search(search), entry)
			}
			Node::Search(id) if dir.contains_search(id) => {
				Some(Node::Category(CategoryKind::Searches))
			}
			Node::QuickSearch(id) if dir.contains_search(id) => {
				dir.entry_by_dn(&dir.search(id).request().base).map(Node::Entry)
			}
			Node::Bookmark(_) => Some(Node::Category(CategoryKind::Bookmarks)),
			Node::Page(page) if owner_exists(dir, page.owner) => {
				let set = self.page_set(dir, page.owner)?;
				let (_, enclosing) = set.find(page)?;
				let node = enclosing
					.map_or(Node::from_parent(page.owner), |outer| Node::Page(outer.page_ref()));
				Some(node)
			}
			Node::Placeholder(Placeholder::TopPage(owner) | Placeholder::NextPage(owner)) => {
				Some(Node::from_parent(owner))
			}
			Node::SearchResult { .. }
			| Node::Search(_)
			| Node::QuickSearch(_)
			| Node::Page(_) => None,
		}
	}

	/// Whether `node` can be expanded. Entries report the server's hint
	/// until their children are fetched.
	#[must_use]
	pub fn has_children(&self, dir: &Directory, node: &Node) -> bool {
		match *node {
			Node::Entry(id) => {
				let entry = dir.entry(id);
				let flags = entry.flags();
				let shown_link =
					self.prefs.show_alias_and_referral_objects && (flags.alias || flags.referral);
				entry.has_children() || shown_link
			}
			Node::Search(id) | Node::QuickSearch(id) => dir.contains_search(id),
			Node::Page(_) | Node::Category(_) => true,
			Node::SearchResult { .. } | Node::Bookmark(_) | Node::Placeholder(_) => false,
		}
	}

	/// A node was collapsed. Entries whose children were cut short by a limit
	/// are invalidated, so expanding them again fetches anew.
	pub fn tree_collapsed(&mut self, dir: &mut Directory, node: &Node) {
		if let Node::Entry(id) = *node {
			let parent = Parent::Entry(id);
			if dir.collection(parent).has_more() {
				dir.invalidate(parent);
			}
		}
	}

	/// Discard what is known about `parent`'s collection and fetch it again.
	pub fn reload(&mut self, dir: &mut Directory, parent: Parent) {
		dir.invalidate(parent);
		self.pages.remove(parent);
		self.trigger(dir, parent, None);
	}

	/// Act on a top page or next page row: refetch its collection starting at
	/// the stored cursor. Returns whether a fetch was scheduled.
	pub fn fetch_page(&mut self, dir: &mut Directory, placeholder: &Placeholder) -> bool {
		let (parent, cursor) = match *placeholder {
			Placeholder::TopPage(parent) => (parent, dir.collection(parent).top_page()),
			Placeholder::NextPage(parent) => (parent, dir.collection(parent).next_page()),
			Placeholder::Fetching(_) => return false,
		};
		let Some(cursor) = cursor.cloned() else {
			return false;
		};
		dir.invalidate(parent);
		self.pages.remove(parent);
		self.trigger(dir, parent, Some(cursor))
	}

	/// Forget the cached pages of a removed entry or search.
	pub fn remove(&mut self, parent: Parent) {
		self.pages.remove(parent);
	}

	/// Forget all cached pages.
	pub fn dispose(&mut self) {
		self.pages.clear();
	}

	/// Schedule a fetch of `parent`'s collection if it needs one.
	fn trigger(&self, dir: &mut Directory, parent: Parent, cursor: Option<PageCursor>) -> bool {
		match dir.schedule_fetch(parent, cursor) {
			Some(task) => {
				self.submitter.submit(task);
				true
			}
			None => false,
		}
	}

	/// Children of the root DSE: the naming contexts, and the schema,
	/// configuration and monitor entries if they are shown. Never folded.
	fn root_children(&mut self, dir: &mut Directory) -> Vec<Node> {
		let parent = Parent::Entry(dir.root());
		if !dir.collection(parent).is_initialized() {
			self.trigger(dir, parent, None);
			return vec![Node::fetching(parent)];
		}
		let show_meta = self.prefs.show_directory_meta_entries;
		dir.collection(parent)
			.items()
			.iter()
			.filter(|&&id| show_meta || !dir.entry(id).flags().directory_meta)
			.map(|&id| Node::Entry(id))
			.collect()
	}

	/// Children of an entry, behind the quick search anchored at it.
	fn entry_children(&mut self, dir: &mut Directory, id: EntryId) -> Vec<Node> {
		let parent = Parent::Entry(id);
		if !dir.collection(parent).is_initialized() {
			self.trigger(dir, parent, None);
			return vec![Node::fetching(parent)];
		}
		let mut nodes: Vec<Node> =
			dir.quick_search_at(id).map(Node::QuickSearch).into_iter().collect();
		self.extend_items(dir, parent, &mut nodes);
		nodes
	}

	/// Results of a search.
	fn search_children(&mut self, dir: &mut Directory, id: SearchId) -> Vec<Node> {
		let parent = Parent::Search(id);
		if !dir.collection(parent).is_initialized() {
			self.trigger(dir, parent, None);
			return vec![Node::Placeholder(Placeholder::Fetching(FetchingKind::PerformingSearch))];
		}
		if dir.collection(parent).is_empty() {
			return vec![Node::Placeholder(Placeholder::Fetching(FetchingKind::NoResults))];
		}
		let mut nodes = Vec::new();
		self.extend_items(dir, parent, &mut nodes);
		nodes
	}

	/// Children of a page: its sub-pages, or the items in its range.
	fn page_children(&mut self, dir: &mut Directory, page: PageRef) -> Vec<Node> {
		let owner = page.owner;
		if !dir.collection(owner).is_initialized() {
			self.trigger(dir, owner, None);
			return vec![Node::fetching(owner)];
		}
		let set = self.pages.pages(dir, owner);
		set.find(page).map(|(found, _)| found.children(dir)).unwrap_or_default()
	}

	/// Append an initialized collection to `nodes`: the top level pages if it
	/// is folded, else its items between the fetch more rows.
	fn extend_items(&mut self, dir: &Directory, parent: Parent, nodes: &mut Vec<Node>) {
		if self.is_folded(dir, parent) {
			let set = self.pages.pages(dir, parent);
			nodes.extend(set.pages().iter().map(|page| Node::Page(page.page_ref())));
			return;
		}
		self.pages.remove(parent);
		let collection = dir.collection(parent);
		if collection.top_page().is_some() {
			nodes.push(Node::Placeholder(Placeholder::TopPage(parent)));
		}
		nodes.extend(dir.item_nodes(parent, 0, usize::MAX));
		if collection.next_page().is_some() {
			nodes.push(Node::Placeholder(Placeholder::NextPage(parent)));
		}
	}

	/// Whether `parent`'s collection is shown as pages.
	fn is_folded(&self, dir: &Directory, parent: Parent) -> bool {
		self.prefs.use_folding
			&& parent != Parent::Entry(dir.root())
			&& dir.collection(parent).len() > self.prefs.folding_size
	}

	/// The page set of `parent`, rebuilt if the collection is initialized and
	/// changed, else whatever was cached.
	fn page_set(&mut self, dir: &Directory, parent: Parent) -> Option<Arc<PageSet>> {
		if dir.collection(parent).is_initialized() {
			Some(self.pages.pages(dir, parent))
		} else {
			self.pages.get(parent).cloned()
		}
	}

	/// The node an item of `owner`'s collection is shown under: the leaf page
	/// holding it if the collection is folded, else the owner.
	fn item_parent(&mut self, dir: &Directory, owner: Parent, item: EntryId) -> Option<Node> {
		if !self.is_folded(dir, owner) {
			return Some(Node::from_parent(owner));
		}
		let index = dir.position(owner, item)?;
		let set = self.page_set(dir, owner)?;
		set.parent_of(index).map(|page| Node::Page(page.page_ref()))
	}
}

/// Whether the owner of a collection still exists.
fn owner_exists(dir: &Directory, owner: Parent) -> bool {
	match owner {
		Parent::Entry(_) => true,
		Parent::Search(id) => dir.contains_search(id),
	}
}

/// Contents of a category folder.
fn category_children(dir: &Directory, kind: CategoryKind) -> Vec<Node> {
	match kind {
		CategoryKind::Dit => vec![Node::Entry(dir.root())],
		CategoryKind::Searches => dir.searches().map(Node::Search).collect(),
		CategoryKind::Bookmarks => dir.bookmarks().map(Node::Bookmark).collect(),
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use std::cell::RefCell;

	use super::{ContentProvider, Input};
	use crate::{
		config::BrowserPreferences,
		directory::{Bookmark, Directory, EntryFlags, EntryId, Parent, Search, SearchScope},
		jobs::{
			FetchEvent, FetchOutcome, FetchTask, FetchedEntry, FetchedPage, JobSubmitter,
			PageCursor, SearchRequest,
		},
		node::{CategoryKind, FetchingKind, Node, PageRef, Placeholder},
	};

	/// Keeps submitted tasks for inspection.
	#[derive(Debug, Default)]
	struct Recorder {
		tasks: RefCell<Vec<FetchTask>>,
	}

	impl JobSubmitter for Recorder {
		fn submit(&self, task: FetchTask) {
			self.tasks.borrow_mut().push(task);
		}
	}

	impl Recorder {
		fn take(&self) -> Vec<FetchTask> {
			self.tasks.take()
		}
	}

	fn provider(prefs: BrowserPreferences) -> ContentProvider<Recorder> {
		ContentProvider::new(prefs, Recorder::default()).unwrap()
	}

	fn leaf(dn: String) -> FetchedEntry {
		FetchedEntry { dn, flags: EntryFlags::default(), has_children_hint: false }
	}

	/// Answer `task` with the given page.
	fn answer(dir: &mut Directory, task: &FetchTask, page: FetchedPage) {
		let applied = dir.apply(FetchEvent {
			parent: task.parent(),
			generation: task.generation(),
			outcome: FetchOutcome::Completed(page),
		});
		assert_eq!(applied, Some(task.parent()));
	}

	/// Expand `node` and answer the resulting fetch with `entries`.
	fn expand(
		provider: &mut ContentProvider<Recorder>,
		dir: &mut Directory,
		node: Node,
		page: FetchedPage,
	) -> Vec<Node> {
		provider.children(dir, &node);
		let tasks = provider.submitter().take();
		assert_eq!(tasks.len(), 1);
		answer(dir, &tasks[0], page);
		provider.children(dir, &node)
	}

	fn numbered(base: &str, count: usize) -> FetchedPage {
		FetchedPage {
			entries: (0..count).map(|i| leaf(format!("cn={i},{base}"))).collect(),
			..FetchedPage::default()
		}
	}

	fn container(dir: &mut Directory, dn: &str) -> EntryId {
		dir.add_entry(Some(dir.root()), dn, EntryFlags::default(), true)
	}

	fn request(base: &str) -> SearchRequest {
		SearchRequest {
			base: base.to_owned(),
			filter: "(objectClass=*)".to_owned(),
			scope: SearchScope::OneLevel,
			count_limit: 0,
		}
	}

	#[test]
	fn unfetched_children_trigger_a_single_fetch() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let root = Node::Entry(dir.root());
		let fetching =
			vec![Node::Placeholder(Placeholder::Fetching(FetchingKind::FetchingEntries))];

		assert_eq!(provider.children(&mut dir, &root), fetching);
		assert_eq!(
			provider.children(&mut dir, &root),
			fetching,
			"Repeated queries return the same placeholder"
		);
		let tasks = provider.submitter().take();
		assert_eq!(tasks.len(), 1);
		assert!(matches!(
			&tasks[0],
			FetchTask::InitializeChildren { dn, cursor: None, .. } if dn.is_empty()
		));
	}

	#[test]
	fn small_collections_are_flat_and_sorted() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let base = container(&mut dir, "dc=example");
		let children =
			expand(&mut provider, &mut dir, Node::Entry(base), numbered("dc=example", 12));

		assert_eq!(children.len(), 12);
		let values: Vec<&str> = children
			.iter()
			.map(|node| match node {
				Node::Entry(id) => dir.entry(*id).rdn().unwrap().first_value(),
				other => panic!("unexpected {other:?}"),
			})
			.collect();
		assert_eq!(values, ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"]);
		let child = children[4];
		assert_eq!(provider.parent(&dir, &child), Some(Node::Entry(base)));
		assert!(!provider.has_children(&dir, &child));
	}

	#[test]
	fn quick_search_leads_the_children_of_its_base() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let base = container(&mut dir, "dc=example");
		let quick = dir.add_search(Search::new("quick", request("DC=example")));
		dir.set_quick_search(Some(quick));

		let children =
			expand(&mut provider, &mut dir, Node::Entry(base), numbered("dc=example", 3));
		assert_eq!(children.len(), 4);
		assert_eq!(children[0], Node::QuickSearch(quick));
		assert_eq!(provider.parent(&dir, &children[0]), Some(Node::Entry(base)));
	}

	#[test]
	fn large_collections_fold_into_pages() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let base = container(&mut dir, "ou=big");
		let owner = Parent::Entry(base);
		let pages = expand(&mut provider, &mut dir, Node::Entry(base), numbered("ou=big", 250));

		let expected: Vec<Node> = [(0, 99), (100, 199), (200, 249)]
			.into_iter()
			.map(|(first, last)| Node::Page(PageRef { owner, first, last }))
			.collect();
		assert_eq!(pages, expected);
		assert!(provider.has_children(&dir, &pages[1]));
		assert_eq!(provider.parent(&dir, &pages[1]), Some(Node::Entry(base)));

		let items = provider.children(&mut dir, &pages[1]);
		assert_eq!(items.len(), 100);
		let item = dir.entry_by_dn("cn=150,ou=big").unwrap();
		assert!(items.contains(&Node::Entry(item)));
		assert_eq!(provider.parent(&dir, &Node::Entry(item)), Some(pages[1]));

		let missing = Node::Page(PageRef { owner, first: 5, last: 7 });
		assert!(provider.children(&mut dir, &missing).is_empty());
		assert_eq!(provider.parent(&dir, &missing), None);
	}

	#[test]
	fn folding_can_be_turned_off() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let base = container(&mut dir, "ou=big");
		expand(&mut provider, &mut dir, Node::Entry(base), numbered("ou=big", 150));

		let flat = BrowserPreferences { use_folding: false, ..BrowserPreferences::default() };
		provider.set_preferences(flat).unwrap();
		let children = provider.children(&mut dir, &Node::Entry(base));
		assert_eq!(children.len(), 150);
		assert!(children.iter().all(|node| matches!(node, Node::Entry(_))));

		let invalid = BrowserPreferences { folding_size: 0, ..BrowserPreferences::default() };
		assert!(provider.set_preferences(invalid).is_err());
		assert!(!provider.preferences().use_folding);
	}

	#[test]
	fn root_dse_hides_directory_meta_entries() {
		let mut dir = Directory::new();
		let mut provider =
			provider(BrowserPreferences { folding_size: 2, ..BrowserPreferences::default() });
		let meta = EntryFlags { directory_meta: true, ..EntryFlags::default() };
		let page = FetchedPage {
			entries: vec![
				leaf("dc=one".to_owned()),
				leaf("dc=two".to_owned()),
				leaf("dc=three".to_owned()),
				FetchedEntry { dn: "cn=schema".to_owned(), flags: meta, has_children_hint: false },
			],
			..FetchedPage::default()
		};
		let root = Node::Entry(dir.root());
		let children = expand(&mut provider, &mut dir, root, page);
		assert_eq!(children.len(), 3, "Root DSE children are never folded");
		assert!(children.iter().all(|node| matches!(node, Node::Entry(_))));
		assert_eq!(provider.parent(&dir, &children[0]), Some(root));
		assert_eq!(provider.parent(&dir, &root), Some(Node::Category(CategoryKind::Dit)));

		provider
			.set_preferences(BrowserPreferences {
				folding_size: 2,
				show_directory_meta_entries: true,
				..BrowserPreferences::default()
			})
			.unwrap();
		assert_eq!(provider.children(&mut dir, &root).len(), 4);
	}

	#[test]
	fn searches() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let search = dir.add_search(Search::new("people", request("ou=people")));
		let node = Node::Search(search);

		assert_eq!(
			provider.children(&mut dir, &node),
			[Node::Placeholder(Placeholder::Fetching(FetchingKind::PerformingSearch))]
		);
		let tasks = provider.submitter().take();
		answer(&mut dir, &tasks[0], FetchedPage::default());
		assert_eq!(
			provider.children(&mut dir, &node),
			[Node::Placeholder(Placeholder::Fetching(FetchingKind::NoResults))]
		);

		provider.reload(&mut dir, Parent::Search(search));
		let tasks = provider.submitter().take();
		answer(&mut dir, &tasks[0], numbered("ou=people", 2));
		let results = provider.children(&mut dir, &node);
		assert_eq!(results.len(), 2);
		assert!(matches!(results[0], Node::SearchResult { search: s, .. } if s == search));
		assert_eq!(provider.parent(&dir, &results[0]), Some(node));
		assert_eq!(provider.parent(&dir, &node), Some(Node::Category(CategoryKind::Searches)));
		assert!(!provider.has_children(&dir, &results[0]));

		dir.remove_search(search);
		provider.remove(Parent::Search(search));
		assert!(provider.children(&mut dir, &node).is_empty());
		assert_eq!(provider.parent(&dir, &results[0]), None);
	}

	#[test]
	fn folded_search_results_of_an_invalidated_search() {
		let mut dir = Directory::new();
		let mut provider =
			provider(BrowserPreferences { folding_size: 10, ..BrowserPreferences::default() });
		let search = dir.add_search(Search::new("people", request("ou=people")));
		let pages =
			expand(&mut provider, &mut dir, Node::Search(search), numbered("ou=people", 25));
		assert_eq!(pages.len(), 3);

		dir.invalidate(Parent::Search(search));
		assert_eq!(
			provider.children(&mut dir, &pages[0]),
			[Node::Placeholder(Placeholder::Fetching(FetchingKind::FetchingSearchResults))]
		);
		assert_eq!(provider.submitter().take().len(), 1);
		assert_eq!(
			provider.parent(&dir, &pages[2]),
			Some(Node::Search(search)),
			"Cached pages still resolve"
		);
	}

	#[test]
	fn scrolled_pages() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let base = container(&mut dir, "ou=scroll");
		let parent = Parent::Entry(base);
		let next = PageCursor { size: 2, cookie: vec![7] };
		let page = FetchedPage {
			next_page: Some(next.clone()),
			top_page: Some(PageCursor::first(2)),
			..numbered("ou=scroll", 2)
		};
		let children = expand(&mut provider, &mut dir, Node::Entry(base), page);
		assert_eq!(children.len(), 4);
		assert_eq!(children[0], Node::Placeholder(Placeholder::TopPage(parent)));
		assert_eq!(children[3], Node::Placeholder(Placeholder::NextPage(parent)));
		assert_eq!(provider.parent(&dir, &children[3]), Some(Node::Entry(base)));

		assert!(provider.fetch_page(&mut dir, &Placeholder::NextPage(parent)));
		let tasks = provider.submitter().take();
		assert!(matches!(
			&tasks[0],
			FetchTask::InitializeChildren { cursor: Some(cursor), .. } if *cursor == next
		));
		assert_eq!(
			provider.children(&mut dir, &Node::Entry(base)),
			[Node::Placeholder(Placeholder::Fetching(FetchingKind::FetchingEntries))]
		);
		let fetching = Placeholder::Fetching(FetchingKind::FetchingEntries);
		assert!(!provider.fetch_page(&mut dir, &fetching));
	}

	#[test]
	fn collapsing_refetches_truncated_collections() {
		let mut dir = Directory::new();
		let mut provider = provider(BrowserPreferences::default());
		let complete = container(&mut dir, "ou=complete");
		let truncated = container(&mut dir, "ou=truncated");
		expand(&mut provider, &mut dir, Node::Entry(complete), numbered("ou=complete", 3));
		let page = FetchedPage { has_more: true, ..numbered("ou=truncated", 3) };
		expand(&mut provider, &mut dir, Node::Entry(truncated), page);

		provider.tree_collapsed(&mut dir, &Node::Entry(complete));
		provider.tree_collapsed(&mut dir, &Node::Entry(truncated));
		assert!(dir.collection(Parent::Entry(complete)).is_initialized());
		assert!(!dir.collection(Parent::Entry(truncated)).is_initialized());
		provider.children(&mut dir, &Node::Entry(truncated));
		assert_eq!(provider.submitter().take().len(), 1);
	}

	#[test]
	fn connection_elements() {
		let mut dir = Directory::new();
		let mut provider =
			provider(BrowserPreferences { show_searches: false, ..BrowserPreferences::default() });
		let elements = provider.elements(&mut dir, &Input::Connection);
		assert_eq!(
			elements,
			[Node::Category(CategoryKind::Dit), Node::Category(CategoryKind::Bookmarks)]
		);

		let b = dir.add_bookmark(Bookmark { name: "b".to_owned(), dn: "dc=b".to_owned() });
		let a = dir.add_bookmark(Bookmark { name: "A".to_owned(), dn: "dc=a".to_owned() });
		let bookmarks = provider.elements(&mut dir, &Input::Node(elements[1]));
		assert_eq!(bookmarks, [Node::Bookmark(a), Node::Bookmark(b)]);
		assert_eq!(provider.parent(&dir, &bookmarks[0]), Some(elements[1]));
		assert_eq!(provider.children(&mut dir, &elements[0]), [Node::Entry(dir.root())]);

		let entries = Input::Entries(vec![dir.root()]);
		assert_eq!(provider.elements(&mut dir, &entries), [Node::Entry(dir.root())]);
	}

	#[test]
	fn aliases_expand_when_shown() {
		let mut dir = Directory::new();
		let flags = EntryFlags { alias: true, ..EntryFlags::default() };
		let alias = Node::Entry(dir.add_entry(Some(dir.root()), "cn=alias", flags, false));
		assert!(provider(BrowserPreferences::default()).has_children(&dir, &alias));
		let hidden = BrowserPreferences {
			show_alias_and_referral_objects: false,
			..BrowserPreferences::default()
		};
		assert!(!provider(hidden).has_children(&dir, &alias));
	}

	#[test]
	fn dispose_forgets_pages() {
		let mut dir = Directory::new();
		let mut provider =
			provider(BrowserPreferences { folding_size: 10, ..BrowserPreferences::default() });
		let base = container(&mut dir, "ou=big");
		let pages = expand(&mut provider, &mut dir, Node::Entry(base), numbered("ou=big", 30));
		dir.invalidate(Parent::Entry(base));
		assert_eq!(provider.parent(&dir, &pages[0]), Some(Node::Entry(base)));
		provider.dispose();
		assert_eq!(provider.parent(&dir, &pages[0]), None);
	}
}
