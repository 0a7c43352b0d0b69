// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Owned, fully resolved form of a resource.
//!
//! Entities refer to each other by index into sibling collections and to text by [`StringRef`].
//! Nothing here knows about byte offsets or presence masks.

pub mod condition;
pub mod container;
pub mod param;
pub mod user;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use self::{
	condition::{BlendCondition, Condition, ConditionValue, RandomCondition, SequenceCondition, SwitchCondition},
	container::{Container, ContainerFlags, ContainerKind, GridContainer, SwitchContainer},
	param::{DirectValue, Param, ParamSet, ParamValue, RandomKind, ValueReferenceType},
	user::{
		Action, ActionSlot, ActionTrigger, ActionTriggerStart, AlwaysTrigger, AssetCall, AssetCallTarget, Property,
		PropertyTrigger, User,
	},
};
use crate::{
	hash,
	profile::{Profile, SystemKind},
	schema::ParamSchema,
	strings::{StringPool, StringRef},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomRange {
	pub min: f32,
	pub max: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
	pub x: f32,
	pub y: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Curve {
	pub property_name: StringRef,
	pub property_index: i16,
	pub curve_type: u16,
	pub is_global: bool,
	pub unknown: i32,
	pub unknown2: u16,
	pub points: Vec<CurvePoint>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArrangeGroupParam {
	pub group_name: StringRef,
	pub limit_type: i8,
	pub limit_threshold: i8,
	pub unknown: u8,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ArrangeGroupParams {
	pub groups: Vec<ArrangeGroupParam>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
	pub version: u32,
	pub schema: ParamSchema,
	pub strings: StringPool,
	pub local_property_names: Vec<StringRef>,
	pub local_property_enum_names: Vec<StringRef>,
	pub direct_values: Vec<DirectValue>,
	pub random_calls: Vec<RandomRange>,
	pub curves: Vec<Curve>,
	pub asset_params: Vec<ParamSet>,
	pub trigger_overwrite_params: Vec<ParamSet>,
	pub arrange_group_params: Vec<ArrangeGroupParams>,
	pub conditions: Vec<Condition>,
	/// keyed by the CRC32 of the user name
	pub users: BTreeMap<u32, User>,
}

impl Resource {
	/// An empty resource of the given link system for `profile`
	pub fn new(profile: Profile, system: SystemKind) -> Self {
		Self {
			version: profile.version(system),
			schema: ParamSchema::new(system),
			strings: StringPool::new(),
			local_property_names: vec![],
			local_property_enum_names: vec![],
			direct_values: vec![],
			random_calls: vec![],
			curves: vec![],
			asset_params: vec![],
			trigger_overwrite_params: vec![],
			arrange_group_params: vec![],
			conditions: vec![],
			users: BTreeMap::new(),
		}
	}

	pub fn system_kind(&self, profile: Profile) -> Option<SystemKind> {
		profile.system_kind(self.version)
	}

	pub fn string(&self, string_ref: StringRef) -> Option<&str> {
		self.strings.get(string_ref)
	}

	pub fn user(&self, name: &str) -> Option<&User> {
		self.users.get(&hash::name_hash(name))
	}

	pub fn user_mut(&mut self, name: &str) -> Option<&mut User> {
		self.users.get_mut(&hash::name_hash(name))
	}

	/// Inserts a user under the hash of its name, returning the hash
	pub fn insert_user(&mut self, name: &str, user: User) -> u32 {
		let hash = hash::name_hash(name);
		self.users.insert(hash, user);
		hash
	}

	pub fn num_curve_points(&self) -> usize {
		self.curves.iter().map(|curve| curve.points.len()).sum()
	}

	/// Total number of params over all asset param sets
	pub fn num_asset_param_values(&self) -> usize {
		self.asset_params.iter().map(ParamSet::len).sum()
	}

	/// True if nothing besides the header would be written
	pub fn is_empty(&self) -> bool {
		self.schema.is_empty()
			&& self.strings.is_empty()
			&& self.local_property_names.is_empty()
			&& self.local_property_enum_names.is_empty()
			&& self.direct_values.is_empty()
			&& self.random_calls.is_empty()
			&& self.curves.is_empty()
			&& self.asset_params.is_empty()
			&& self.trigger_overwrite_params.is_empty()
			&& self.arrange_group_params.is_empty()
			&& self.conditions.is_empty()
			&& self.users.is_empty()
	}
}
