//! Background fetching of collections.
//!
//! The tree model never waits for the directory server. When it needs data it
//! does not have, it hands a [`FetchTask`] to a [`JobSubmitter`] and shows a
//! placeholder. The submitter runs the task somewhere else and reports back
//! with a [`FetchEvent`], which the owner of the
//! [`Directory`](crate::directory::Directory) applies before refreshing the
//! view.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
	runtime::Handle,
	sync::mpsc::{self, error::TrySendError},
	task::AbortHandle,
};
use tracing::{debug, warn};

use crate::{
	directory::{EntryFlags, EntryId, Parent, SearchId, SearchScope},
	error::Error,
};

/// Position in a [simple paged results] search.
///
/// [simple paged results]: https://www.rfc-editor.org/rfc/rfc2696.html
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
	/// Requested page size
	pub size: i32,
	/// Cookie returned by the server; empty for the first page
	pub cookie: Vec<u8>,
}

impl PageCursor {
	/// Cursor for the first page.
	#[must_use]
	pub fn first(size: i32) -> Self {
		Self { size, cookie: Vec::new() }
	}
}

/// Parameters of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
	/// Search base
	pub base: String,
	/// RFC 4515 filter
	pub filter: String,
	/// Search scope
	pub scope: SearchScope,
	/// Maximum number of results requested from the server, 0 for no limit
	pub count_limit: i32,
}

/// Work for a background job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTask {
	/// Fetch the children of an entry.
	InitializeChildren {
		/// The entry whose children to fetch
		entry: EntryId,
		/// Its DN
		dn: String,
		/// Generation of the fetch
		generation: u64,
		/// Page to fetch, for scrolled paged searches
		cursor: Option<PageCursor>,
	},
	/// Perform a saved search.
	Search {
		/// The search to perform
		search: SearchId,
		/// Its parameters
		request: SearchRequest,
		/// Generation of the fetch
		generation: u64,
		/// Page to fetch, for scrolled paged searches
		cursor: Option<PageCursor>,
	},
}

impl FetchTask {
	/// The collection the task fills.
	#[must_use]
	pub fn parent(&self) -> Parent {
		match *self {
			FetchTask::InitializeChildren { entry, .. } => Parent::Entry(entry),
			FetchTask::Search { search, .. } => Parent::Search(search),
		}
	}

	/// The generation the task was scheduled with.
	#[must_use]
	pub fn generation(&self) -> u64 {
		match *self {
			FetchTask::InitializeChildren { generation, .. }
			| FetchTask::Search { generation, .. } => generation,
		}
	}
}

/// An entry as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedEntry {
	/// Distinguished name
	pub dn: String,
	/// Kind flags
	pub flags: EntryFlags,
	/// Whether the server indicated that the entry has children
	pub has_children_hint: bool,
}

/// One fetched page of a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
	/// Entries in server order
	pub entries: Vec<FetchedEntry>,
	/// Whether a count limit cut the result short
	pub has_more: bool,
	/// Cursor to go back to the first page, if this is a later page
	pub top_page: Option<PageCursor>,
	/// Cursor for the following page, if there is one
	pub next_page: Option<PageCursor>,
}

/// How a fetch ended.
#[derive(Debug)]
pub enum FetchOutcome {
	/// The fetch returned a page.
	Completed(FetchedPage),
	/// The fetch was cancelled before it finished.
	Cancelled,
	/// The fetch failed.
	Failed(Error),
}

/// Completion notice of a [`FetchTask`].
#[derive(Debug)]
pub struct FetchEvent {
	/// The collection the task was for
	pub parent: Parent,
	/// The generation the task was scheduled with
	pub generation: u64,
	/// How it ended
	pub outcome: FetchOutcome,
}

/// Accepts fetch tasks, fire and forget.
pub trait JobSubmitter {
	/// Run `task` in the background. Completion is reported out of band.
	fn submit(&self, task: FetchTask);
}

impl<T: JobSubmitter + ?Sized> JobSubmitter for Arc<T> {
	fn submit(&self, task: FetchTask) {
		(**self).submit(task);
	}
}

/// Source of directory data.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
	/// Fetch the children of the entry named `dn`.
	async fn initialize_children(
		&self,
		dn: &str,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, Error>;

	/// Perform a search.
	async fn search(
		&self,
		request: &SearchRequest,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, Error>;
}

/// Fetches in flight, by collection.
type InFlight = Arc<Mutex<HashMap<Parent, (u64, AbortHandle)>>>;

/// Runs fetch tasks as tokio tasks and reports through a channel.
#[derive(Debug)]
pub struct JobRunner<F> {
	/// Where data comes from
	fetcher: Arc<F>,
	/// Runtime the tasks are spawned on
	runtime: Handle,
	/// The sender half of the channel completion events are pushed to
	sender: mpsc::Sender<FetchEvent>,
	/// Tasks that have not finished
	in_flight: InFlight,
}

impl<F: Fetcher> JobRunner<F> {
	/// Create a runner spawning on `runtime`. Also returns the receiver that
	/// completion events are pushed to.
	#[must_use]
	pub fn new(fetcher: F, runtime: Handle) -> (Self, mpsc::Receiver<FetchEvent>) {
		Self::with_capacity(fetcher, runtime, 1024)
	}

	/// Like [`JobRunner::new`], buffering at most `capacity` unreceived
	/// events. Finished tasks wait for room before reporting.
	///
	/// # Panics
	/// A `capacity` of 0 is a programming error.
	#[must_use]
	pub fn with_capacity(
		fetcher: F,
		runtime: Handle,
		capacity: usize,
	) -> (Self, mpsc::Receiver<FetchEvent>) {
		let (sender, receiver) = mpsc::channel::<FetchEvent>(capacity);
		let runner = JobRunner {
			fetcher: Arc::new(fetcher),
			runtime,
			sender,
			in_flight: Arc::new(Mutex::new(HashMap::new())),
		};
		(runner, receiver)
	}

	/// Abort the fetch running for `parent`, if any. The collection is
	/// reported as cancelled and returns to uninitialized once the event is
	/// applied. The report is never dropped: if the channel is full it is
	/// sent as soon as there is room.
	pub fn cancel(&self, parent: Parent) -> bool {
		let running = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(&parent);
		let Some((generation, handle)) = running else {
			return false;
		};
		handle.abort();
		let event = FetchEvent { parent, generation, outcome: FetchOutcome::Cancelled };
		match self.sender.try_send(event) {
			Ok(()) => {}
			Err(TrySendError::Full(event)) => {
				debug!(?parent, "Event channel full, queueing cancellation");
				let sender = self.sender.clone();
				self.runtime.spawn(async move {
					if let Err(err) = sender.send(event).await {
						warn!("Sending cancellation failed: {err}");
					}
				});
			}
			Err(TrySendError::Closed(_)) => {
				warn!(?parent, "Sending cancellation failed: channel closed");
			}
		}
		true
	}

	/// Number of fetches that have not reported back.
	#[must_use]
	pub fn pending(&self) -> usize {
		self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).len()
	}
}

impl<F: Fetcher> JobSubmitter for JobRunner<F> {
	fn submit(&self, task: FetchTask) {
		let parent = task.parent();
		let generation = task.generation();
		debug!(?parent, generation, "Submitting fetch");

		let fetcher = Arc::clone(&self.fetcher);
		let sender = self.sender.clone();
		let in_flight = Arc::clone(&self.in_flight);
		// Held until the task is registered, so a fast task cannot finish
		// before it is tracked.
		let mut tracked = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
		let handle = self.runtime.spawn(async move {
			let result = match task {
				FetchTask::InitializeChildren { dn, cursor, .. } => {
					fetcher.initialize_children(&dn, cursor).await
				}
				FetchTask::Search { request, cursor, .. } => fetcher.search(&request, cursor).await,
			};
			let outcome = match result {
				Ok(page) => FetchOutcome::Completed(page),
				Err(err) => FetchOutcome::Failed(err),
			};
			{
				let mut in_flight = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
				if in_flight.get(&parent).is_some_and(|(running, _)| *running == generation) {
					in_flight.remove(&parent);
				}
			}
			if let Err(e) = sender.send(FetchEvent { parent, generation, outcome }).await {
				warn!("Sending fetch result failed: {e}");
			}
		});

		if let Some((_, previous)) = tracked.insert(parent, (generation, handle.abort_handle())) {
			previous.abort();
		}
	}
}
