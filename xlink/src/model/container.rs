// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

pub use crate::res::container::ContainerType;
use crate::strings::StringRef;

/// Property watched by a switch container, or by a blend container that does not blend all children
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SwitchContainer {
	/// action slot name when switching on an action, otherwise the property name
	pub action_slot_name: StringRef,
	pub watch_property_id: i32,
	pub property_index: i16,
	pub is_global: bool,
	/// only stored by targets with compact tags
	pub is_action_trigger: Option<bool>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GridContainer {
	pub property_name1: StringRef,
	pub property_name2: StringRef,
	pub property_index1: i16,
	pub property_index2: i16,
	pub is_global1: bool,
	pub is_global2: bool,
	pub values1: Vec<u32>,
	pub values2: Vec<u32>,
	/// child index per (value1, value2) pair, row major
	pub indices: Vec<i32>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ContainerKind {
	Switch(SwitchContainer),
	Random,
	Random2,
	Blend(Option<SwitchContainer>),
	Sequence,
	Grid(GridContainer),
	Jump,
}

impl ContainerKind {
	pub fn container_type(&self) -> ContainerType {
		match self {
			ContainerKind::Switch(_) => ContainerType::Switch,
			ContainerKind::Random => ContainerType::Random,
			ContainerKind::Random2 => ContainerType::Random2,
			ContainerKind::Blend(_) => ContainerType::Blend,
			ContainerKind::Sequence => ContainerType::Sequence,
			ContainerKind::Grid(_) => ContainerType::Grid,
			ContainerKind::Jump => ContainerType::Jump,
		}
	}
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContainerFlags {
	pub is_not_blend_all: bool,
	pub is_need_observe: bool,
}

/// Selects among the asset calls `[child_start, child_start + child_count)` of its user
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Container {
	pub child_start: i32,
	pub child_count: i32,
	/// only stored by targets with compact tags
	pub flags: Option<ContainerFlags>,
	pub kind: ContainerKind,
}

impl Container {
	pub fn container_type(&self) -> ContainerType {
		self.kind.container_type()
	}

	pub fn children(&self) -> std::ops::Range<i32> {
		self.child_start..self.child_start.saturating_add(self.child_count)
	}
}
