//! A lazily populated, paged tree model for browsing an LDAP directory.
//!
//! The model answers the queries a tree widget makes (children, parent,
//! has-children) over the entries, searches and bookmarks of one connection.
//! It never waits on the server: a query that needs data which has not been
//! fetched yet schedules a fetch and answers with a placeholder row. Large
//! collections are folded into nested pages of at most
//! [`folding_size`](BrowserPreferences::folding_size) children, and siblings
//! are ordered by a configurable [`Sorter`].
//!
//! State lives in a [`Directory`] arena owned by the caller. Fetches run as
//! tokio tasks through a [`JobRunner`], whose completion events the caller
//! applies to the directory before querying again, so the model itself needs
//! no locking.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate which
//! is used here for interfacing with LDAP is an excellent resource.
//!
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//!
//! # Getting started
//! A minimal example of expanding the root DSE might look like so:
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use url::Url;
//! use ldap_browser::{
//!     BrowserPreferences, Config, ConnectionConfig, ContentProvider, Directory, JobRunner,
//!     LdapFetcher, Node,
//! };
//!
//! // Configuration can also be deserialized with serde. It's hand-constructed
//! // here for demonstration purposes.
//! let config = Config {
//!     url: Url::parse("ldap://localhost")?,
//!     connection: ConnectionConfig::default(),
//!     bind_dn: "cn=admin,dc=example,dc=com".to_owned(),
//!     bind_password: "verysecret".to_owned(),
//!     paged_search_size: Some(500),
//!     paged_search_scroll_mode: false,
//!     count_limit: 1000,
//!     fetch_subentries: false,
//! };
//!
//! let (runner, mut events) =
//!     JobRunner::new(LdapFetcher::new(config), tokio::runtime::Handle::current());
//! let mut provider = ContentProvider::new(BrowserPreferences::default(), runner)?;
//! let mut dir = Directory::new();
//! let root = Node::Entry(dir.root());
//!
//! // The first query schedules a fetch and shows a placeholder
//! println!("{:?}", provider.children(&mut dir, &root));
//! while let Some(event) = events.recv().await {
//!     if dir.apply(event).is_some() {
//!         println!("{:?}", provider.children(&mut dir, &root));
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//! * Cached page trees are only rebuilt when the length of their collection
//!   changes. Items replaced without a change in length keep their old page
//!   boundaries, which is harmless as pages slice the collection by index.
//! * Every fetch opens and binds its own connection.
//! * [secrecy](https://docs.rs/secrecy) is not used for storing the bind
//!   password, it probably should be

mod cache;
pub mod config;
pub mod directory;
pub mod dn;
pub mod entry;
pub mod error;
pub mod jobs;
pub mod ldap;
pub mod node;
pub mod page;
pub mod provider;
pub mod sorter;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	cache::{PageCache, PageSet},
	config::{BrowserPreferences, Config, ConnectionConfig, SortBy, SortOrder, TLSConfig},
	directory::{Bookmark, Directory, EntryFlags, EntryId, Parent, Search, SearchId, SearchScope},
	entry::SearchEntryExt,
	error::Error,
	jobs::{FetchEvent, FetchTask, Fetcher, JobRunner, JobSubmitter, SearchRequest},
	ldap::LdapFetcher,
	node::{CategoryKind, FetchingKind, Node, PageRef, Placeholder},
	provider::{ContentProvider, Input},
	sorter::Sorter,
};
