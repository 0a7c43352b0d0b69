// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! JSON rendering of a decoded resource, annotated with the profile it was read with

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use xlink::{hash::name_hash, Profile, Resource};

use crate::{names::UserNames, Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextDocument {
	pub profile: Profile,
	/// Readable names for the user keys that have one
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub user_names: BTreeMap<u32, String>,
	pub resource: Resource,
}

impl TextDocument {
	pub fn new(resource: Resource, profile: Profile, names: &UserNames) -> Self {
		let user_names = resource
			.system_kind(profile)
			.map(|system| names.resolve(&resource, system))
			.unwrap_or_default();
		Self {
			profile,
			user_names,
			resource,
		}
	}

	pub fn from_json(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}

	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	/// Checks that the document can be encoded for `profile` and returns its resource
	pub fn into_resource(self, profile: Profile) -> Result<Resource> {
		if self.profile != profile {
			return Err(Error::ProfileMismatch {
				document: self.profile,
				requested: profile,
			});
		}
		if profile.system_kind(self.resource.version).is_none() {
			return Err(xlink::Error::UnknownVersion(self.resource.version).into());
		}
		if let Some((&hash, name)) = self.user_names.iter().find(|(&hash, name)| name_hash(name) != hash) {
			return Err(Error::NameHashMismatch {
				name: name.clone(),
				hash,
			});
		}
		Ok(self.resource)
	}
}
