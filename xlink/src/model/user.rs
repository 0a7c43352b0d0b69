// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

use super::{container::Container, param::ParamValue};
use crate::strings::StringRef;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AssetCallTarget {
	/// index into the resource's asset param sets
	Asset(usize),
	/// index into the user's containers
	Container(usize),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AssetCall {
	pub key_name: StringRef,
	/// bit 0 marks a container call
	pub flag: u16,
	pub duration: i32,
	pub parent_index: i32,
	pub guid: u32,
	pub condition: Option<usize>,
	pub target: AssetCallTarget,
}

impl AssetCall {
	pub fn is_container(&self) -> bool {
		self.flag & 1 == 1
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActionSlot {
	pub name: StringRef,
	pub action_start: i16,
	pub action_count: i16,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Action {
	pub name: StringRef,
	pub trigger_start: i32,
	pub trigger_count: i32,
	/// only stored by targets with compact tags
	pub enable_match_start: Option<bool>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ActionTriggerStart {
	Frame(i32),
	/// fire once the named action has played
	PreviousAction(StringRef),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActionTrigger {
	pub guid: u32,
	pub unknown: u32,
	pub asset_call: usize,
	pub start: ActionTriggerStart,
	pub end_frame: i32,
	pub trigger_once: bool,
	pub fade: bool,
	pub always_trigger: bool,
	pub overwrite_hash: u16,
	pub trigger_overwrite: Option<usize>,
}

impl ActionTrigger {
	pub fn name_match(&self) -> bool {
		matches!(self.start, ActionTriggerStart::PreviousAction(_))
	}
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Property {
	pub name: StringRef,
	pub is_global: bool,
	pub trigger_start: i32,
	pub trigger_count: i32,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PropertyTrigger {
	pub guid: u32,
	pub flag: u16,
	pub overwrite_hash: u16,
	pub asset_call: usize,
	pub condition: Option<usize>,
	pub trigger_overwrite: Option<usize>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AlwaysTrigger {
	pub guid: u32,
	pub flag: u16,
	pub overwrite_hash: u16,
	pub asset_call: usize,
	pub trigger_overwrite: Option<usize>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub local_properties: Vec<StringRef>,
	/// one value per user param define, in slot order
	pub params: Vec<ParamValue>,
	pub asset_calls: Vec<AssetCall>,
	pub containers: Vec<Container>,
	pub action_slots: Vec<ActionSlot>,
	pub actions: Vec<Action>,
	pub action_triggers: Vec<ActionTrigger>,
	pub properties: Vec<Property>,
	pub property_triggers: Vec<PropertyTrigger>,
	pub always_triggers: Vec<AlwaysTrigger>,
	/// extra header field, only meaningful for TotK
	pub unknown: Option<u16>,
}

impl User {
	pub fn asset_count(&self) -> usize {
		self.asset_calls.iter().filter(|call| !call.is_container()).count()
	}

	pub fn random_container_count(&self) -> usize {
		self.containers
			.iter()
			.filter(|container| matches!(container.kind, super::container::ContainerKind::Random2))
			.count()
	}
}
