//! The closed set of node kinds a browser tree is made of.

use crate::directory::{BookmarkId, EntryId, Parent, SearchId};

/// A node in the browser tree. Nodes are cheap handles into the
/// [`Directory`](crate::directory::Directory) arena and the page cache; they
/// never own entry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Node {
	/// One of the top level folders of a connection
	Category(CategoryKind),
	/// A directory entry in the DIT
	Entry(EntryId),
	/// A search result, pointing back at its search and its entry
	SearchResult {
		/// The search that produced the result
		search: SearchId,
		/// The entry the result refers to
		entry: EntryId,
	},
	/// A saved search
	Search(SearchId),
	/// A bookmark
	Bookmark(BookmarkId),
	/// A folded range of a large collection
	Page(PageRef),
	/// A transient marker row
	Placeholder(Placeholder),
	/// The quick search, shown in front of the children of its base entry
	QuickSearch(SearchId),
}

/// The top level folders of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKind {
	/// The directory information tree, rooted at the root DSE
	Dit,
	/// Saved searches
	Searches,
	/// Bookmarks
	Bookmarks,
}

/// Key of a page: the collection it belongs to and the inclusive index range
/// it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRef {
	/// Owner of the paged collection
	pub owner: Parent,
	/// First covered index
	pub first: usize,
	/// Last covered index, inclusive
	pub last: usize,
}

/// Rows standing in for data that is not there yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
	/// A fetch is in progress, or nothing is there to show.
	Fetching(FetchingKind),
	/// Fetch the first page of a paged collection again.
	TopPage(Parent),
	/// Fetch the next page of a paged collection.
	NextPage(Parent),
}

/// What a [`Placeholder::Fetching`] row says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchingKind {
	/// Children of an entry are being fetched
	FetchingEntries,
	/// Results of a folded search are not available
	FetchingSearchResults,
	/// A search is running
	PerformingSearch,
	/// A search finished without results
	NoResults,
}

impl FetchingKind {
	/// The label shown for the row.
	#[must_use]
	pub fn message(self) -> &'static str {
		match self {
			FetchingKind::FetchingEntries => "Fetching Entries...",
			FetchingKind::FetchingSearchResults => "Fetching Search Results...",
			FetchingKind::PerformingSearch => "Performing Search...",
			FetchingKind::NoResults => "No Results",
		}
	}
}

impl Node {
	/// The fetching placeholder for collections owned by `parent`.
	pub(crate) fn fetching(parent: Parent) -> Self {
		match parent {
			Parent::Entry(_) => {
				Node::Placeholder(Placeholder::Fetching(FetchingKind::FetchingEntries))
			}
			Parent::Search(_) => {
				Node::Placeholder(Placeholder::Fetching(FetchingKind::FetchingSearchResults))
			}
		}
	}

	/// The node standing for the owner of a collection.
	pub(crate) fn from_parent(parent: Parent) -> Self {
		match parent {
			Parent::Entry(id) => Node::Entry(id),
			Parent::Search(id) => Node::Search(id),
		}
	}
}
