// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

pub use crate::res::condition::{BlendType, CompareType, PropertyType};
use crate::{res::container::ContainerType, strings::StringRef};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConditionValue {
	Int(i32),
	Float(f32),
	Bool(bool),
}

impl ConditionValue {
	pub fn from_raw(property_type: PropertyType, raw: u32) -> Self {
		match property_type {
			PropertyType::F32 | PropertyType::Unknown5 => ConditionValue::Float(f32::from_bits(raw)),
			PropertyType::Bool if raw <= 1 => ConditionValue::Bool(raw != 0),
			_ => ConditionValue::Int(raw as i32),
		}
	}

	pub fn raw(&self) -> u32 {
		match *self {
			ConditionValue::Int(value) => value as u32,
			ConditionValue::Float(value) => value.to_bits(),
			ConditionValue::Bool(value) => value as u32,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchCondition {
	pub property_type: PropertyType,
	pub compare_type: CompareType,
	pub is_global: bool,
	/// action hash, or the enum value for enum properties
	pub action_hash: u32,
	pub value: ConditionValue,
	/// only for enum properties
	pub enum_name: Option<StringRef>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomCondition {
	pub weight: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendCondition {
	pub min: f32,
	pub max: f32,
	pub blend_type_to_max: BlendType,
	pub blend_type_to_min: BlendType,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SequenceCondition {
	pub continue_on_fade: i32,
}

/// Data consulted by the parent container to pick a child, keyed by the container kind
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Condition {
	Switch(SwitchCondition),
	Random(RandomCondition),
	Random2(RandomCondition),
	Blend(BlendCondition),
	Sequence(SequenceCondition),
	Grid,
	Jump,
}

impl Condition {
	pub fn container_type(&self) -> ContainerType {
		match self {
			Condition::Switch(_) => ContainerType::Switch,
			Condition::Random(_) => ContainerType::Random,
			Condition::Random2(_) => ContainerType::Random2,
			Condition::Blend(_) => ContainerType::Blend,
			Condition::Sequence(_) => ContainerType::Sequence,
			Condition::Grid => ContainerType::Grid,
			Condition::Jump => ContainerType::Jump,
		}
	}
}
