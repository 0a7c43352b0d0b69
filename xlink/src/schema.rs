// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The param define table: name, type and default of every param slot.

use std::collections::HashMap;

use derive_more::{Display, TryFrom};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
	accessor::ResourceAccessor,
	error::{Error, Result},
	profile::SystemKind,
	res::ResParamDefine,
	strings::{StringPool, StringRef},
};

#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, TryFrom, Sequence, Serialize, Deserialize)]
#[try_from(repr)]
pub enum ParamType {
	Int = 0,
	Float = 1,
	Bool = 2,
	Enum = 3,
	String = 4,
	Bitfield = 5,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, Sequence, Serialize, Deserialize)]
pub enum ParamCategory {
	#[display("user")]
	User,
	#[display("asset")]
	Asset,
	#[display("trigger")]
	Trigger,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
	Int(i32),
	Float(f32),
	Bool(bool),
	Enum(u32),
	/// refers into the schema's own string pool
	String(StringRef),
	Bitfield(u32),
}

impl DefaultValue {
	pub fn param_type(&self) -> ParamType {
		match self {
			DefaultValue::Int(_) => ParamType::Int,
			DefaultValue::Float(_) => ParamType::Float,
			DefaultValue::Bool(_) => ParamType::Bool,
			DefaultValue::Enum(_) => ParamType::Enum,
			DefaultValue::String(_) => ParamType::String,
			DefaultValue::Bitfield(_) => ParamType::Bitfield,
		}
	}

	fn from_raw(param_type: ParamType, raw: u64, strings: &HashMap<u64, StringRef>) -> Result<Self> {
		Ok(match param_type {
			ParamType::Int => DefaultValue::Int(raw as u32 as i32),
			ParamType::Float => DefaultValue::Float(f32::from_bits(raw as u32)),
			ParamType::Bool => DefaultValue::Bool(raw != 0),
			ParamType::Enum => DefaultValue::Enum(raw as u32),
			ParamType::String => DefaultValue::String(*strings.get(&raw).ok_or(Error::UnresolvedOffset {
				table: "param define name table",
				offset: raw,
			})?),
			ParamType::Bitfield => DefaultValue::Bitfield(raw as u32),
		})
	}

	/// Pointer-width raw value, with string defaults resolved through `string_offsets`
	pub(crate) fn to_raw(self, string_offsets: &[u64]) -> Result<u64> {
		Ok(match self {
			DefaultValue::Int(value) => value as i64 as u64,
			DefaultValue::Float(value) => value.to_bits() as u64,
			DefaultValue::Bool(value) => value as u64,
			DefaultValue::Enum(value) | DefaultValue::Bitfield(value) => value as u64,
			DefaultValue::String(string) => *string_offsets.get(string.index()).ok_or(Error::UnresolvedReference {
				table: "param define string",
				index: string.index(),
			})?,
		})
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDefine {
	pub name: StringRef,
	pub default: DefaultValue,
}

impl ParamDefine {
	pub fn param_type(&self) -> ParamType {
		self.default.param_type()
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSchema {
	/// Names and string defaults of the defines. Kept apart from the resource's name table.
	pub strings: StringPool,
	pub user_params: Vec<ParamDefine>,
	pub asset_params: Vec<ParamDefine>,
	pub trigger_params: Vec<ParamDefine>,
	pub system_user_param_count: usize,
	pub system_asset_param_count: usize,
}

impl ParamSchema {
	pub fn new(system: SystemKind) -> Self {
		Self {
			system_user_param_count: system.system_user_param_count(),
			..Default::default()
		}
	}

	pub fn initialize(accessor: &ResourceAccessor) -> Result<Self> {
		let mut schema = Self::new(accessor.system_kind());
		let Some(pdt) = accessor.param_define_table().cloned() else {
			return Ok(schema);
		};

		let string_offsets = schema.strings.intern_table(
			accessor.param_define_name_table(),
			accessor.param_define_name_table_pos(),
		)?;

		schema.system_asset_param_count = pdt.num_asset_params.saturating_sub(pdt.num_user_asset_params) as usize;

		for (category, count) in [
			(ParamCategory::User, pdt.num_user_params),
			(ParamCategory::Asset, pdt.num_asset_params),
			(ParamCategory::Trigger, pdt.num_trigger_params),
		] {
			let defines = (0..count as usize)
				.map(|index| {
					let res = accessor.param_define(category, index).ok_or(Error::OutOfBounds {
						table: "param define",
						index: index as u64,
						count: count as u64,
					})?;
					Self::define_from_res(&res, &string_offsets)
				})
				.collect::<Result<Vec<_>>>()?;
			*schema.params_mut(category) = defines;
		}

		trace!(
			user = schema.user_params.len(),
			asset = schema.asset_params.len(),
			trigger = schema.trigger_params.len(),
			"read param defines"
		);

		Ok(schema)
	}

	fn define_from_res(res: &ResParamDefine, strings: &HashMap<u64, StringRef>) -> Result<ParamDefine> {
		let param_type = ParamType::try_from(res.param_type).map_err(|_| Error::InvalidTag {
			kind: "param type",
			value: res.param_type,
		})?;
		Ok(ParamDefine {
			name: *strings.get(&res.name_offset).ok_or(Error::UnresolvedOffset {
				table: "param define name table",
				offset: res.name_offset,
			})?,
			default: DefaultValue::from_raw(param_type, res.default_value, strings)?,
		})
	}

	pub fn params(&self, category: ParamCategory) -> &[ParamDefine] {
		match category {
			ParamCategory::User => &self.user_params,
			ParamCategory::Asset => &self.asset_params,
			ParamCategory::Trigger => &self.trigger_params,
		}
	}

	pub fn params_mut(&mut self, category: ParamCategory) -> &mut Vec<ParamDefine> {
		match category {
			ParamCategory::User => &mut self.user_params,
			ParamCategory::Asset => &mut self.asset_params,
			ParamCategory::Trigger => &mut self.trigger_params,
		}
	}

	pub fn count(&self, category: ParamCategory) -> usize {
		self.params(category).len()
	}

	pub fn param(&self, category: ParamCategory, index: usize) -> Option<&ParamDefine> {
		self.params(category).get(index)
	}

	pub fn param_type(&self, category: ParamCategory, index: usize) -> Option<ParamType> {
		self.param(category, index).map(ParamDefine::param_type)
	}

	pub fn name(&self, define: &ParamDefine) -> Option<&str> {
		self.strings.get(define.name)
	}

	pub fn search_param_index(&self, name: &str, category: ParamCategory) -> Option<usize> {
		self.params(category)
			.iter()
			.position(|define| self.strings.get(define.name) == Some(name))
	}

	pub fn custom_user_params(&self) -> &[ParamDefine] {
		let split = self.system_user_param_count.min(self.user_params.len());
		&self.user_params[split..]
	}

	pub fn custom_asset_params(&self) -> &[ParamDefine] {
		let split = self.system_asset_param_count.min(self.asset_params.len());
		&self.asset_params[split..]
	}

	pub fn num_defines(&self) -> usize {
		self.user_params.len() + self.asset_params.len() + self.trigger_params.len()
	}

	/// A schema without defines or strings is not written out at all
	pub fn is_empty(&self) -> bool {
		self.num_defines() == 0 && self.strings.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn schema() -> ParamSchema {
		let mut schema = ParamSchema::new(SystemKind::SLink);
		for (category, name, default) in [
			(ParamCategory::User, "Volume", DefaultValue::Float(1.0)),
			(ParamCategory::Asset, "AssetName", DefaultValue::Int(0)),
			(ParamCategory::Asset, "Loop", DefaultValue::Bool(false)),
			(ParamCategory::Trigger, "Volume", DefaultValue::Float(0.5)),
		] {
			let name = schema.strings.intern(name);
			schema.params_mut(category).push(ParamDefine { name, default });
		}
		schema.system_asset_param_count = 1;
		schema
	}

	#[test]
	fn search_is_scoped_to_a_category() {
		let schema = schema();
		assert_eq!(schema.search_param_index("Loop", ParamCategory::Asset), Some(1));
		assert_eq!(schema.search_param_index("Loop", ParamCategory::Trigger), None);
		assert_eq!(schema.search_param_index("Volume", ParamCategory::Trigger), Some(0));
		assert_eq!(schema.param_type(ParamCategory::User, 0), Some(ParamType::Float));
		assert!(schema.param(ParamCategory::User, 1).is_none());
	}

	#[test]
	fn system_and_custom_split() {
		let schema = schema();
		assert_eq!(schema.custom_asset_params().len(), 1);
		assert_eq!(schema.name(&schema.custom_asset_params()[0]), Some("Loop"));
		// fewer user params than the system reserves
		assert!(schema.custom_user_params().is_empty());
		assert_eq!(ParamSchema::new(SystemKind::ELink).system_user_param_count, 0);
	}

	#[test]
	fn raw_defaults() {
		let strings = HashMap::from([(4, StringRef(1))]);
		assert_eq!(
			DefaultValue::from_raw(ParamType::Int, 0xFFFF_FFFF_FFFF_FFFE, &strings).unwrap(),
			DefaultValue::Int(-2)
		);
		assert_eq!(DefaultValue::Int(-2).to_raw(&[]).unwrap(), 0xFFFF_FFFF_FFFF_FFFE);
		assert_eq!(
			DefaultValue::from_raw(ParamType::Float, 0.25f32.to_bits() as u64, &strings).unwrap(),
			DefaultValue::Float(0.25)
		);
		assert_eq!(
			DefaultValue::from_raw(ParamType::String, 4, &strings).unwrap(),
			DefaultValue::String(StringRef(1))
		);
		assert_eq!(DefaultValue::String(StringRef(1)).to_raw(&[0, 4]).unwrap(), 4);
		assert!(DefaultValue::from_raw(ParamType::String, 5, &strings).is_err());
		assert!(DefaultValue::String(StringRef(2)).to_raw(&[0, 4]).is_err());
	}
}
