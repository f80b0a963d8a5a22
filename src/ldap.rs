//! Fetching children and search results from an LDAP server

use async_trait::async_trait;
use ldap3::{
	controls::{Control, ControlType, MakeCritical, PagedResults, RawControl},
	LdapConnAsync, LdapResult, Scope, SearchEntry, SearchOptions, SearchResult,
};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
	config::Config,
	directory::{EntryFlags, SearchScope},
	entry::{fetched_entry, SearchEntryExt},
	error::Error,
	jobs::{FetchedEntry, FetchedPage, Fetcher, PageCursor, SearchRequest},
};

/// Result code of a search cut short by the size limit.
const SIZE_LIMIT_EXCEEDED: u32 = 4;

/// OID of the RFC 3672 subentries control.
const SUBENTRIES_OID: &str = "1.3.6.1.4.1.4203.1.10.1";

/// Attributes needed to classify an entry.
const ENTRY_ATTRS: &[&str] = &["objectClass", "hasSubordinates", "numSubordinates"];

/// Root DSE attributes naming the top level entries.
const NAMING_CONTEXTS: &str = "namingContexts";

/// Root DSE attributes naming schema, configuration and monitor entries.
const DIRECTORY_META_ATTRS: &[&str] = &["subschemaSubentry", "configContext", "monitorContext"];

/// A [`Fetcher`] reading from an LDAP server. Every fetch binds on a fresh
/// connection.
#[derive(Debug, Clone)]
pub struct LdapFetcher {
	/// The configuration of the LDAP client.
	config: Config,
}

impl LdapFetcher {
	/// Create a fetcher for the server in `config`.
	#[must_use]
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Create a connection to an ldap server based on the settings and url
	/// specified in the configuration, and bind.
	async fn connect(&self) -> Result<(JoinHandle<()>, ldap3::Ldap), Error> {
		let settings = self.config.connection.to_settings()?;
		let (conn, mut ldap) =
			LdapConnAsync::from_url_with_settings(settings, &self.config.url).await?;
		let driver = tokio::spawn(async move {
			if let Err(err) = conn.drive().await {
				warn!("Ldap connection error {err}");
			}
		});
		ldap.simple_bind(&self.config.bind_dn, &self.config.bind_password).await?.success()?;
		Ok((driver, ldap))
	}

	/// Unbind and wait for the connection to close, then hand back the
	/// outcome of the fetch made on it.
	async fn finish(
		driver: JoinHandle<()>,
		mut ldap: ldap3::Ldap,
		page: Result<FetchedPage, Error>,
	) -> Result<FetchedPage, Error> {
		let closed = ldap.unbind().await;
		if let Err(err) = driver.await {
			warn!("Failed to join background task: {err}");
		}
		let page = page?;
		closed?;
		Ok(page)
	}

	/// The naming contexts and directory meta entries announced by the root
	/// DSE.
	async fn root_dse(ldap: &mut ldap3::Ldap) -> Result<FetchedPage, Error> {
		let attrs: Vec<&str> =
			std::iter::once(NAMING_CONTEXTS).chain(DIRECTORY_META_ATTRS.iter().copied()).collect();
		let (results, _) = ldap.search("", Scope::Base, "(objectClass=*)", attrs).await?.success()?;
		let root = results.into_iter().next().map(SearchEntry::construct).ok_or(Error::Missing)?;

		let announced = |attr: &str, directory_meta: bool| {
			root.attr_values(attr)
				.iter()
				.filter(|dn| !dn.is_empty())
				.map(|dn| FetchedEntry {
					dn: dn.clone(),
					flags: EntryFlags { directory_meta, ..EntryFlags::default() },
					has_children_hint: true,
				})
				.collect::<Vec<_>>()
		};
		let mut entries = announced(NAMING_CONTEXTS, false);
		for &attr in DIRECTORY_META_ATTRS {
			entries.extend(announced(attr, true));
		}
		Ok(FetchedPage { entries, ..FetchedPage::default() })
	}

	/// The children of `dn`, followed by its subentries if configured.
	async fn children(
		&self,
		ldap: &mut ldap3::Ldap,
		dn: &str,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, Error> {
		let first_page = cursor.is_none();
		let mut page = self
			.paged_search(
				ldap,
				dn,
				Scope::OneLevel,
				"(objectClass=*)",
				self.config.count_limit,
				cursor,
			)
			.await?;
		if self.config.fetch_subentries && first_page {
			let control = RawControl {
				ctype: SUBENTRIES_OID.to_owned(),
				crit: false,
				val: Some(vec![0x01, 0x01, 0xFF]),
			};
			ldap.with_controls(control).with_timeout(self.config.connection.operation_timeout);
			let (results, _) = ldap
				.search(dn, Scope::OneLevel, "(objectClass=subentry)", ENTRY_ATTRS)
				.await?
				.success()?;
			page.entries.extend(
				results.into_iter().map(|raw| fetched_entry(&SearchEntry::construct(raw))),
			);
		}
		Ok(page)
	}

	/// Search with the [simple paged results control] if a page size is
	/// configured. In scroll mode only one page is fetched and the cookie for
	/// the next one is handed back; otherwise pages are fetched until the
	/// server is done or the count limit is reached.
	///
	/// [simple paged results control]: https://www.rfc-editor.org/rfc/rfc2696.html
	async fn paged_search(
		&self,
		ldap: &mut ldap3::Ldap,
		base: &str,
		scope: Scope,
		filter: &str,
		count_limit: i32,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, Error> {
		let page_size = cursor.as_ref().map(|cursor| cursor.size).or(self.config.paged_search_size);
		let mut cookie = cursor.map(|cursor| cursor.cookie).unwrap_or_default();
		let resumed = !cookie.is_empty();
		let limit = usize::try_from(count_limit).unwrap_or(0);
		let mut page = FetchedPage::default();

		loop {
			if let Some(size) = page_size {
				ldap.with_controls(PagedResults { size, cookie: cookie.clone() }.critical());
			}
			if count_limit > 0 {
				ldap.with_search_options(SearchOptions::new().sizelimit(count_limit));
			}
			ldap.with_timeout(self.config.connection.operation_timeout);
			let SearchResult(results, result) =
				ldap.search(base, scope, filter, ENTRY_ATTRS).await?;
			page.entries.extend(
				results.into_iter().map(|raw| fetched_entry(&SearchEntry::construct(raw))),
			);

			let next = paged_cookie(&result);
			if result.rc == SIZE_LIMIT_EXCEEDED {
				debug!(base, count_limit, "Search hit the size limit");
				page.has_more = true;
				break;
			}
			result.success()?;

			let (Some(size), Some(next)) = (page_size, next) else {
				break;
			};
			if next.is_empty() {
				break;
			}
			if self.config.paged_search_scroll_mode {
				page.next_page = Some(PageCursor { size, cookie: next });
				break;
			}
			if limit > 0 && page.entries.len() >= limit {
				page.has_more = true;
				break;
			}
			cookie = next;
		}

		if resumed {
			page.top_page = page_size.map(PageCursor::first);
		}
		Ok(page)
	}
}

#[async_trait]
impl Fetcher for LdapFetcher {
	async fn initialize_children(
		&self,
		dn: &str,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, Error> {
		let (driver, mut ldap) = self.connect().await?;
		let page = if dn.is_empty() {
			Self::root_dse(&mut ldap).await
		} else {
			self.children(&mut ldap, dn, cursor).await
		};
		Self::finish(driver, ldap, page).await
	}

	async fn search(
		&self,
		request: &SearchRequest,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, Error> {
		let (driver, mut ldap) = self.connect().await?;
		let page = self
			.paged_search(
				&mut ldap,
				&request.base,
				scope(request.scope),
				&request.filter,
				request.count_limit,
				cursor,
			)
			.await;
		Self::finish(driver, ldap, page).await
	}
}

/// The `ldap3` scope for a search scope.
fn scope(scope: SearchScope) -> Scope {
	match scope {
		SearchScope::Base => Scope::Base,
		SearchScope::OneLevel => Scope::OneLevel,
		SearchScope::Subtree => Scope::Subtree,
	}
}

/// The cookie of the paged results control in a search result, if the server
/// sent one.
fn paged_cookie(result: &LdapResult) -> Option<Vec<u8>> {
	result.ctrls.iter().find_map(|Control(ctype, raw)| match ctype {
		Some(ControlType::PagedResults) => Some(raw.parse::<PagedResults>().cookie),
		_ => None,
	})
}
