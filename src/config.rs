//! Browser preferences and the configuration of the LDAP client.
use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc, time::Duration};

use ldap3::LdapConnSettings;
use rustls::{Certificate, ClientConfig, PrivateKey, RootCertStore};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

/// What entries are sorted by, within their category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
	/// Keep the order the server returned
	None,
	/// The full relative name, e.g. `cn=foo`
	RelativeName,
	/// The first value of the relative name, numbers compared as numbers
	RelativeNameValue,
}

/// Direction of a sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
	/// Smallest first
	Ascending,
	/// Largest first
	Descending,
	/// Do not reorder. Only valid for searches and bookmarks.
	None,
}

impl SortOrder {
	/// Multiplier applied to a comparison result.
	pub(crate) fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
		match self {
			SortOrder::Descending => ordering.reverse(),
			SortOrder::Ascending | SortOrder::None => ordering,
		}
	}
}

/// How the browser tree folds, sorts and filters its nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserPreferences {
	/// Sort key for entries and search results
	pub sort_entries_by: SortBy,
	/// Direction for entries and search results
	pub sort_entries_order: SortOrder,
	/// Direction for searches
	pub sort_searches_order: SortOrder,
	/// Direction for bookmarks
	pub sort_bookmarks_order: SortOrder,
	/// Show entries without children before the others
	pub leaf_entries_first: bool,
	/// Show entries with children before the others
	pub container_entries_first: bool,
	/// Show administrative entries after the others
	pub meta_entries_last: bool,
	/// Children lists at least this long are left unsorted. 0 disables the
	/// limit.
	pub sort_limit: usize,
	/// Maximum number of children per page when folding
	pub folding_size: usize,
	/// Fold large collections into pages
	pub use_folding: bool,
	/// Show the directory information tree category
	pub show_dit: bool,
	/// Show the searches category
	pub show_searches: bool,
	/// Show the bookmarks category
	pub show_bookmarks: bool,
	/// Show the schema, configuration and monitor entries under the root DSE
	pub show_directory_meta_entries: bool,
	/// Let alias and referral entries be expanded
	pub show_alias_and_referral_objects: bool,
}

impl Default for BrowserPreferences {
	fn default() -> Self {
		Self {
			sort_entries_by: SortBy::RelativeNameValue,
			sort_entries_order: SortOrder::Ascending,
			sort_searches_order: SortOrder::Ascending,
			sort_bookmarks_order: SortOrder::Ascending,
			leaf_entries_first: true,
			container_entries_first: false,
			meta_entries_last: true,
			sort_limit: 10_000,
			folding_size: 100,
			use_folding: true,
			show_dit: true,
			show_searches: true,
			show_bookmarks: true,
			show_directory_meta_entries: false,
			show_alias_and_referral_objects: true,
		}
	}
}

impl BrowserPreferences {
	/// Reject combinations the tree model cannot honor.
	pub fn validate(&self) -> Result<(), Error> {
		if self.folding_size == 0 {
			return Err(Error::Invalid("folding size must be positive".to_owned()));
		}
		if self.sort_entries_order == SortOrder::None {
			return Err(Error::Invalid("entries must be sorted ascending or descending".to_owned()));
		}
		if self.leaf_entries_first && self.container_entries_first {
			return Err(Error::Invalid(
				"leaf entries first and container entries first are exclusive".to_owned(),
			));
		}
		Ok(())
	}
}

/// LDAP configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
	/// The URL to connect to the server with. Supports ldap, ldaps, and ldapi
	/// schemes
	pub url: Url,
	/// Connection settings.
	#[serde(default)]
	pub connection: ConnectionConfig,
	/// The DN to bind as
	pub bind_dn: String,
	/// The password to bind with
	pub bind_password: String,
	/// If set, enables the [simple paged search control] and sets the page size
	/// to the given value
	///
	/// [simple paged search control]: https://www.rfc-editor.org/rfc/rfc2696.html
	#[serde(default)]
	pub paged_search_size: Option<i32>,
	/// Stop after each page and let the user fetch the next one, instead of
	/// fetching all pages at once
	#[serde(default)]
	pub paged_search_scroll_mode: bool,
	/// Maximum number of children fetched per entry, 0 for no limit
	#[serde(default)]
	pub count_limit: i32,
	/// Also fetch RFC 3672 subentries
	#[serde(default)]
	pub fetch_subentries: bool,
}

/// Configuration for how to connect to the LDAP server
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
	/// Timeout to establish a connection in seconds.
	pub timeout: u64,

	/// LDAP operation timeout. For search per reply.
	pub operation_timeout: Duration,

	/// TLS config
	#[serde(default)]
	pub tls: TLSConfig,
}

impl Default for ConnectionConfig {
	fn default() -> Self {
		Self { timeout: 5, operation_timeout: Duration::from_secs(30), tls: TLSConfig::default() }
	}
}

/// TLS Configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TLSConfig {
	/// Use StartTLS extended operation for establishing a secure connection,
	/// rather than TLS on a dedicated port.
	pub starttls: bool,

	/// Disable verification of TLS certificates
	pub no_tls_verify: bool,

	/// TLS root certificates path
	pub root_certificates_path: Option<PathBuf>,

	/// Path of the TLS client key to use for the connection
	pub client_key_path: Option<PathBuf>,

	/// Path of the TLS client certificate to use for the connection
	pub client_certificate_path: Option<PathBuf>,
}

/// Read all PEM certificates from `path`.
fn read_certificates(path: &PathBuf) -> Result<Vec<Certificate>, Error> {
	let mut reader = BufReader::new(File::open(path)?);
	let certs = rustls_pemfile::certs(&mut reader)?;
	if certs.is_empty() {
		return Err(Error::Invalid(format!("No certificates in {}", path.display())));
	}
	Ok(certs.into_iter().map(Certificate).collect())
}

/// Read the first PKCS8 private key from `path`.
fn read_private_key(path: &PathBuf) -> Result<PrivateKey, Error> {
	let mut reader = BufReader::new(File::open(path)?);
	rustls_pemfile::pkcs8_private_keys(&mut reader)?
		.into_iter()
		.next()
		.map(PrivateKey)
		.ok_or_else(|| Error::Invalid(format!("No PKCS8 private key in {}", path.display())))
}

impl ConnectionConfig {
	/// Create a [`LdapConnSettings`] based on this [`ConnectionConfig`]
	pub(crate) fn to_settings(&self) -> Result<LdapConnSettings, Error> {
		let mut settings = LdapConnSettings::new();

		settings = settings.set_conn_timeout(Duration::from_secs(self.timeout));
		settings = settings.set_starttls(self.tls.starttls);
		settings = settings.set_no_tls_verify(self.tls.no_tls_verify);

		if let Some(path) = &self.tls.root_certificates_path {
			let mut roots = RootCertStore::empty();
			let ders: Vec<Vec<u8>> =
				read_certificates(path)?.into_iter().map(|cert| cert.0).collect();
			let (added, _ignored) = roots.add_parsable_certificates(&ders);
			if added == 0 {
				return Err(Error::Invalid("Could not read root certificate".to_owned()));
			}
			let builder =
				ClientConfig::builder().with_safe_defaults().with_root_certificates(roots);

			let config = match (&self.tls.client_key_path, &self.tls.client_certificate_path) {
				(Some(key_path), Some(cert_path)) => builder
					.with_client_auth_cert(
						read_certificates(cert_path)?,
						read_private_key(key_path)?,
					)
					.map_err(|_| Error::Invalid("Could not read client certificates".to_owned()))?,
				(None, None) => builder.with_no_client_auth(),
				_ => Err(Error::Invalid(
					"Both a client certificate and key file in PKCS8 format must be specified"
						.to_owned(),
				))?,
			};
			settings = settings.set_config(Arc::new(config));
		}
		Ok(settings)
	}
}
