// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Weak reference to a string in a [`StringPool`]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringRef(pub u32);

impl StringRef {
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

/// Deduplicated set of strings. Every textual field of the model refers into a pool by index.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct StringPool {
	strings: Vec<String>,
	lookup: HashMap<String, StringRef>,
}

impl StringPool {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn intern(&mut self, string: &str) -> StringRef {
		if let Some(existing) = self.lookup.get(string) {
			return *existing;
		}
		let string_ref = StringRef(self.strings.len() as u32);
		self.strings.push(string.to_owned());
		self.lookup.insert(string.to_owned(), string_ref);
		string_ref
	}

	pub fn find(&self, string: &str) -> Option<StringRef> {
		self.lookup.get(string).copied()
	}

	pub fn get(&self, string_ref: StringRef) -> Option<&str> {
		self.strings.get(string_ref.index()).map(String::as_str)
	}

	pub fn resolve(&self, string_ref: StringRef) -> Result<&str> {
		self.get(string_ref).ok_or(Error::UnresolvedReference {
			table: "string",
			index: string_ref.index(),
		})
	}

	pub fn len(&self) -> usize {
		self.strings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.strings.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (StringRef, &str)> {
		self.strings
			.iter()
			.enumerate()
			.map(|(i, s)| (StringRef(i as u32), s.as_str()))
	}

	/// Byte offset of every string when the pool is written out as a sorted, NUL separated table,
	/// indexed by [`StringRef`], together with the total table size
	pub fn table_layout(&self) -> (Vec<u64>, u64) {
		let mut offsets = vec![0; self.strings.len()];
		let mut size = 0;
		for (string_ref, string) in self.sorted() {
			offsets[string_ref.index()] = size;
			size += string.len() as u64 + 1;
		}
		(offsets, size)
	}

	pub fn sorted(&self) -> Vec<(StringRef, &str)> {
		let mut sorted = self.iter().collect::<Vec<_>>();
		sorted.sort_by(|(_, a), (_, b)| a.as_bytes().cmp(b.as_bytes()));
		sorted
	}

	/// Splits a NUL separated table into the pool.
	///
	/// The first string is always read, after that the walk stops at the end of the table or at the
	/// first empty string. Returns the offset of every string relative to the table start.
	pub fn intern_table(&mut self, table: &[u8], base: u64) -> Result<HashMap<u64, StringRef>> {
		let mut offsets = HashMap::new();
		let mut pos = 0usize;
		if table.is_empty() {
			return Ok(offsets);
		}
		loop {
			let rest = &table[pos..];
			let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
			let string = std::str::from_utf8(&rest[..len]).map_err(|_| Error::InvalidString(base + pos as u64))?;
			offsets.insert(pos as u64, self.intern(string));
			pos += len + 1;
			if pos >= table.len() || table[pos] == 0 {
				break;
			}
		}
		Ok(offsets)
	}
}

impl PartialEq for StringPool {
	fn eq(&self, other: &Self) -> bool {
		self.strings == other.strings
	}
}

/// Rebuilds a pool from its strings in index order. A repeated string would shift the index of
/// every later one, so it is rejected.
impl TryFrom<Vec<String>> for StringPool {
	type Error = Error;

	fn try_from(strings: Vec<String>) -> Result<Self> {
		let mut pool = StringPool::new();
		for string in &strings {
			if pool.find(string).is_some() {
				return Err(Error::Inconsistent("string pool lists a string twice"));
			}
			pool.intern(string);
		}
		Ok(pool)
	}
}

impl From<StringPool> for Vec<String> {
	fn from(pool: StringPool) -> Self {
		pool.strings
	}
}
