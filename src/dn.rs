//! Helpers for picking apart distinguished names.
//!
//! Only as much of RFC 4514 is understood as the tree model needs: splitting
//! off the leftmost relative name, and reading its first attribute value.
//! Escaped separators (`\,`, `\+`, `\=`) are respected, but values are not
//! unescaped.

/// The leftmost relative distinguished name of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
	/// The full relative name as written, e.g. `cn=foo+uid=bar`
	name: String,
	/// Start and end of the first value within `name`
	value: (usize, usize),
}

impl Rdn {
	/// Parse the leftmost relative name of `dn`. Returns `None` for the empty
	/// DN (the root DSE) or when the leftmost component has no `=`.
	#[must_use]
	pub fn from_dn(dn: &str) -> Option<Self> {
		let name = split_first(dn.trim_start(), b',').0.trim_end();
		if name.is_empty() {
			return None;
		}
		let first = split_first(name, b'+').0;
		let eq = find_unescaped(first, b'=')?;
		let start = eq + 1;
		let end = first.len();
		Some(Self { name: name.to_owned(), value: (start, end) })
	}

	/// The full relative name.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The value of the first attribute-value assertion in the relative name.
	#[must_use]
	pub fn first_value(&self) -> &str {
		self.name[self.value.0..self.value.1].trim()
	}
}

/// The DN of the parent of `dn`, or `None` if `dn` is a top level name or the
/// root DSE itself.
#[must_use]
pub fn parent_dn(dn: &str) -> Option<&str> {
	match split_first(dn, b',') {
		(_, Some(rest)) => Some(rest.trim_start()),
		(_, None) => None,
	}
}

/// Compare two DNs the way the directory would for attribute names and
/// surrounding whitespace, i.e. case-insensitively.
#[must_use]
pub fn dn_eq(a: &str, b: &str) -> bool {
	normalize(a) == normalize(b)
}

/// Lowercased DN with whitespace around separators removed, used as an arena
/// key.
#[must_use]
pub fn normalize(dn: &str) -> String {
	let mut out = String::with_capacity(dn.len());
	let mut rest = dn;
	loop {
		let (head, tail) = split_first(rest, b',');
		if !out.is_empty() {
			out.push(',');
		}
		out.push_str(&head.trim().to_lowercase());
		match tail {
			Some(tail) => rest = tail,
			None => break,
		}
	}
	out
}

/// Split `s` at the first unescaped `sep`.
fn split_first(s: &str, sep: u8) -> (&str, Option<&str>) {
	match find_unescaped(s, sep) {
		Some(pos) => (&s[..pos], Some(&s[pos + 1..])),
		None => (s, None),
	}
}

/// Byte position of the first occurrence of `sep` not preceded by a
/// backslash escape.
fn find_unescaped(s: &str, sep: u8) -> Option<usize> {
	let mut escaped = false;
	for (pos, byte) in s.bytes().enumerate() {
		if escaped {
			escaped = false;
		} else if byte == b'\\' {
			escaped = true;
		} else if byte == sep {
			return Some(pos);
		}
	}
	None
}
