// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Known user names, used to label the hashed user keys of a resource.
//!
//! The list is plain text, one name per line, split into sections by `ELink:` and `SLink:` marker lines.

use std::collections::{BTreeMap, HashMap};

use xlink::{hash::name_hash, Resource, SystemKind};

#[derive(Clone, Debug, Default)]
pub struct UserNames {
	names: HashMap<(SystemKind, u32), String>,
}

impl UserNames {
	pub fn parse(text: &str) -> Self {
		let mut names = HashMap::new();
		let mut system = SystemKind::ELink;
		for line in text.lines().map(str::trim).filter(|line| !line.is_empty() && !line.starts_with('#')) {
			match line {
				"ELink:" => system = SystemKind::ELink,
				"SLink:" => system = SystemKind::SLink,
				name => {
					names.insert((system, name_hash(name)), name.to_string());
				}
			}
		}
		Self { names }
	}

	pub fn insert(&mut self, system: SystemKind, name: &str) -> u32 {
		let hash = name_hash(name);
		self.names.insert((system, hash), name.to_string());
		hash
	}

	pub fn get(&self, system: SystemKind, hash: u32) -> Option<&str> {
		self.names.get(&(system, hash)).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}

	/// Names of the users of `resource` that are known
	pub fn resolve(&self, resource: &Resource, system: SystemKind) -> BTreeMap<u32, String> {
		resource
			.users
			.keys()
			.filter_map(|&hash| Some((hash, self.get(system, hash)?.to_string())))
			.collect()
	}

	pub fn unknown(&self, resource: &Resource, system: SystemKind) -> Vec<u32> {
		resource.users.keys().copied().filter(|&hash| self.get(system, hash).is_none()).collect()
	}
}
