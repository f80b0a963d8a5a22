use std::{collections::HashMap, error::Error, time::Duration};

use async_trait::async_trait;
use ldap3::LdapConnAsync;
use ldap_browser::{
	jobs::{FetchedEntry, FetchedPage, PageCursor},
	BrowserPreferences, ContentProvider, Directory, EntryFlags, FetchEvent, Fetcher, FetchingKind,
	JobRunner, Node, Placeholder, SearchRequest,
};
use tokio::sync::mpsc;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

pub fn init_tracing() {
	let tracing_filter = EnvFilter::default().add_directive(LevelFilter::DEBUG.into());
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_filter).with_test_writer().try_init();
}

/// A directory held in memory: children by parent DN.
#[derive(Debug, Default)]
pub struct MemoryTree {
	pub children: HashMap<String, Vec<String>>,
	pub page_size: Option<usize>,
}

impl MemoryTree {
	pub fn add(&mut self, parent: &str, rdns: impl IntoIterator<Item = String>) {
		let dns = rdns
			.into_iter()
			.map(|rdn| if parent.is_empty() { rdn } else { format!("{rdn},{parent}") });
		self.children.entry(parent.to_owned()).or_default().extend(dns);
	}

	fn page(&self, dns: &[String], cursor: Option<PageCursor>) -> FetchedPage {
		let start = cursor
			.map(|cursor| String::from_utf8_lossy(&cursor.cookie).parse().unwrap_or(0))
			.unwrap_or(0);
		let end = self.page_size.map_or(dns.len(), |size| (start + size).min(dns.len()));
		let entries = dns[start..end]
			.iter()
			.map(|dn| FetchedEntry {
				dn: dn.clone(),
				flags: EntryFlags::default(),
				has_children_hint: self.children.contains_key(dn),
			})
			.collect();
		let size = self.page_size.map_or(0, |size| i32::try_from(size).unwrap());
		FetchedPage {
			entries,
			has_more: false,
			top_page: (start > 0).then(|| PageCursor::first(size)),
			next_page: (end < dns.len())
				.then(|| PageCursor { size, cookie: end.to_string().into_bytes() }),
		}
	}
}

#[async_trait]
impl Fetcher for MemoryTree {
	async fn initialize_children(
		&self,
		dn: &str,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, ldap_browser::Error> {
		tokio::time::sleep(Duration::from_millis(5)).await;
		let dns = self.children.get(dn).cloned().unwrap_or_default();
		Ok(self.page(&dns, cursor))
	}

	async fn search(
		&self,
		request: &SearchRequest,
		cursor: Option<PageCursor>,
	) -> Result<FetchedPage, ldap_browser::Error> {
		let needle = request.filter.trim_start_matches("(cn=").trim_end_matches("*)").to_owned();
		let dns: Vec<String> = self
			.children
			.get(&request.base)
			.into_iter()
			.flatten()
			.filter(|dn| dn.starts_with(&format!("cn={needle}")))
			.cloned()
			.collect();
		Ok(self.page(&dns, cursor))
	}
}

/// Everything needed to browse through a [`JobRunner`].
pub struct Browser<F> {
	pub dir: Directory,
	pub provider: ContentProvider<JobRunner<F>>,
	pub events: mpsc::Receiver<FetchEvent>,
}

impl<F: Fetcher> Browser<F> {
	pub fn new(fetcher: F, prefs: BrowserPreferences) -> Self {
		let (runner, events) = JobRunner::new(fetcher, tokio::runtime::Handle::current());
		let provider = ContentProvider::new(prefs, runner).unwrap();
		Self { dir: Directory::new(), provider, events }
	}

	/// Query the children of `node` until they are no longer waiting on a
	/// fetch, applying fetch results in between.
	pub async fn settle(&mut self, node: Node) -> Vec<Node> {
		loop {
			let children = self.provider.children(&mut self.dir, &node);
			match children.as_slice() {
				[Node::Placeholder(Placeholder::Fetching(kind))]
					if *kind != FetchingKind::NoResults =>
				{
					self.next_event().await;
				}
				_ => return children,
			}
		}
	}

	/// Apply the next fetch result.
	pub async fn next_event(&mut self) {
		let event = tokio::time::timeout(Duration::from_secs(10), self.events.recv())
			.await
			.expect("fetch did not report back")
			.expect("runner is gone");
		self.dir.apply(event);
	}

	pub fn dn(&self, node: &Node) -> String {
		match node {
			Node::Entry(id) | Node::SearchResult { entry: id, .. } => {
				self.dir.entry(*id).dn().to_owned()
			}
			other => format!("{other:?}"),
		}
	}
}

pub async fn ldap_add_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(
		&format!("ou={},dc=example,dc=org", ou),
		vec![("objectClass", ["organizationalUnit"].into())],
	)
	.await?
	.success()?;
	Ok(())
}

pub async fn ldap_delete_organizational_unit(
	ldap: &mut ldap3::Ldap,
	ou: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("ou={},dc=example,dc=org", ou)).await?.success()?;
	Ok(())
}

pub async fn ldap_connect() -> Result<ldap3::Ldap, Box<dyn Error>> {
	let (conn, mut ldap) = LdapConnAsync::new("ldap://localhost:1389").await?;
	let _handle = tokio::spawn(async move {
		if let Err(err) = conn.drive().await {
			panic!("Ldap connection error {err}");
		}
	});
	ldap.simple_bind("cn=admin,dc=example,dc=org", "adminpassword").await?;
	Ok(ldap)
}

pub async fn ldap_add_user(
	ldap: &mut ldap3::Ldap,
	ou: &str,
	cn: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.add(
		&format!("cn={},ou={},dc=example,dc=org", cn, ou),
		vec![("objectClass", ["inetOrgPerson"].into()), ("sn", [cn].into())],
	)
	.await?
	.success()?;
	Ok(())
}

pub async fn ldap_delete_user(
	ldap: &mut ldap3::Ldap,
	ou: &str,
	cn: &str,
) -> Result<(), Box<dyn Error>> {
	ldap.delete(&format!("cn={},ou={},dc=example,dc=org", cn, ou)).await?.success()?;
	Ok(())
}

/// Create `ou` holding users `cn=0` up to `cn={count - 1}`, replacing what was
/// there.
pub async fn ldap_populate(
	ldap: &mut ldap3::Ldap,
	ou: &str,
	count: usize,
) -> Result<(), Box<dyn Error>> {
	ldap_clear(ldap, ou, count).await;
	ldap_add_organizational_unit(ldap, ou).await?;
	for i in 0..count {
		ldap_add_user(ldap, ou, &i.to_string()).await?;
	}
	Ok(())
}

/// Remove what [`ldap_populate`] created, ignoring entries that are not there.
pub async fn ldap_clear(ldap: &mut ldap3::Ldap, ou: &str, count: usize) {
	for i in 0..count {
		let _ = ldap_delete_user(ldap, ou, &i.to_string()).await;
	}
	let _ = ldap_delete_organizational_unit(ldap, ou).await;
}
