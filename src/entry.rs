//! Helper methods for extracting data from search results.
use ldap3::SearchEntry;
use tracing::warn;

use crate::{directory::EntryFlags, error::Error, jobs::FetchedEntry};

/// An extension trait for [`SearchEntry`] that provides convenience methods for
/// extracting data.
pub trait SearchEntryExt {
	/// All values of an attribute, looked up case-insensitively. Values that
	/// are not valid UTF-8 are not included.
	fn attr_values(&self, attr: &str) -> &[String];

	/// Get the first value of an attribute. Will return `None` if attribute
	/// value is not valid UTF-8.
	fn attr_first(&self, attr: &str) -> Option<&str> {
		self.attr_values(attr).first().map(String::as_str)
	}

	/// Get the first value of an attribute, interpreted as a boolean.
	fn bool_first(&self, attr: &str) -> Option<Result<bool, Error>> {
		match self.attr_first(attr) {
			Some("TRUE") => Some(Ok(true)),
			Some("FALSE") => Some(Ok(false)),
			Some(_) => Some(Err(Error::Invalid(attr.to_owned()))),
			None => None,
		}
	}

	/// Whether `objectClass` holds `class`, compared case-insensitively.
	fn has_object_class(&self, class: &str) -> bool {
		self.attr_values("objectClass").iter().any(|value| value.eq_ignore_ascii_case(class))
	}

	/// Whether the server says the entry has children. Uses
	/// `hasSubordinates`, falling back to `numSubordinates`. Without either the
	/// entry is assumed to have children, so it can be expanded.
	fn has_children_hint(&self) -> bool {
		match self.bool_first("hasSubordinates") {
			Some(Ok(has)) => return has,
			Some(Err(err)) => warn!("Ignoring hasSubordinates: {err}"),
			None => {}
		}
		match self.attr_first("numSubordinates").map(str::parse::<u64>) {
			Some(Ok(count)) => count > 0,
			Some(Err(err)) => {
				warn!("Ignoring numSubordinates: {err}");
				true
			}
			None => true,
		}
	}
}

impl SearchEntryExt for SearchEntry {
	fn attr_values(&self, attr: &str) -> &[String] {
		self.attrs
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(attr))
			.map(|(_, values)| values.as_slice())
			.unwrap_or_default()
	}
}

/// Classify a search result for the directory arena. Directory meta entries
/// are only announced by the root DSE, so search results never are one.
#[must_use]
pub fn fetched_entry(entry: &SearchEntry) -> FetchedEntry {
	let flags = EntryFlags {
		subentry: entry.has_object_class("subentry"),
		alias: entry.has_object_class("alias"),
		referral: entry.has_object_class("referral"),
		directory_meta: false,
		root_dse: false,
	};
	FetchedEntry { dn: entry.dn.clone(), flags, has_children_hint: entry.has_children_hint() }
}
