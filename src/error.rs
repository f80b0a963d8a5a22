//! Error codes

/// Errors of the fallible paths of this library: fetching from a directory
/// server and loading configuration. Tree queries never fail.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// A required attribute in a search result was missing.
	#[error("Missing data")]
	Missing,
	/// Data did not conform to the expected syntax, or a configuration value
	/// is out of range.
	#[error("Malformed data: {0}")]
	Invalid(String),
	/// Reading a certificate or key file failed.
	#[error(transparent)]
	Io(#[from] std::io::Error),
	/// An underlying protocol error or similar occurred, or the LDAP library
	/// was used incorrectly.
	#[error(transparent)]
	Ldap(#[from] ldap3::LdapError),
}
