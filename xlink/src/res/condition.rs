// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Read, Seek, Write};

use binrw::{binrw, BinRead, BinReaderExt, BinResult, BinWrite, BinWriterExt, Endian};
use derive_more::{Display, TryFrom};
use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

use super::TargetPointer;
use crate::profile::Profile;

#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, TryFrom, Sequence, Serialize, Deserialize)]
#[try_from(repr)]
pub enum PropertyType {
	Enum = 0,
	S32 = 1,
	F32 = 2,
	Bool = 3,
	/// integer-like
	Unknown4 = 4,
	/// float-like
	Unknown5 = 5,
}

#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, TryFrom, Sequence, Serialize, Deserialize)]
#[try_from(repr)]
pub enum CompareType {
	Equal = 0,
	GreaterThan = 1,
	GreaterThanOrEqual = 2,
	LessThan = 3,
	LessThanOrEqual = 4,
	NotEqual = 5,
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, TryFrom, Sequence, Serialize, Deserialize)]
#[try_from(repr)]
pub enum BlendType {
	None = 0,
	Multiply = 1,
	SquareRoot = 2,
	Sin = 3,
	Add = 4,
	SetToOne = 5,
}

/// Every condition starts with the type of the container it belongs to
pub const CONDITION_TAG_SIZE: u64 = 4;

/// Payload of a switch condition, after its tag.
///
/// On compact-tag targets the trailing enum name offset only exists for enum properties.
/// Blitz keeps the enum name offset in the value field instead.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResSwitchCondition {
	pub property_type: u32,
	pub compare_type: u32,
	pub is_global: bool,
	pub action_hash: u32,
	pub value: u32,
	pub enum_name_offset: Option<TargetPointer>,
}

impl ResSwitchCondition {
	const ENUM_PROPERTY: u32 = PropertyType::Enum as u32;

	/// Size including the tag
	pub fn size(profile: Profile, is_enum: bool) -> u64 {
		if profile.compact_tags() {
			0x10 + if is_enum { profile.pointer_size() } else { 0 }
		} else {
			0x14
		}
	}
}

impl BinRead for ResSwitchCondition {
	type Args<'a> = Profile;

	fn read_options<R: Read + Seek>(reader: &mut R, endian: Endian, profile: Self::Args<'_>) -> BinResult<Self> {
		if profile.compact_tags() {
			let property_type = reader.read_type::<u8>(endian)? as u32;
			let compare_type = reader.read_type::<u8>(endian)? as u32;
			let _solved = reader.read_type::<u8>(endian)?;
			let is_global = reader.read_type::<u8>(endian)? != 0;
			let action_hash = reader.read_type(endian)?;
			let value = reader.read_type(endian)?;
			let enum_name_offset = if property_type == Self::ENUM_PROPERTY {
				Some(reader.read_type_args(endian, profile)?)
			} else {
				None
			};
			Ok(Self {
				property_type,
				compare_type,
				is_global,
				action_hash,
				value,
				enum_name_offset,
			})
		} else {
			let property_type = reader.read_type(endian)?;
			let compare_type = reader.read_type(endian)?;
			let value = reader.read_type(endian)?;
			let action_hash = reader.read_type::<u16>(endian)? as u32;
			let _solved = reader.read_type::<u8>(endian)?;
			let is_global = reader.read_type::<u8>(endian)? != 0;
			Ok(Self {
				property_type,
				compare_type,
				is_global,
				action_hash,
				value,
				enum_name_offset: None,
			})
		}
	}
}

impl BinWrite for ResSwitchCondition {
	type Args<'a> = Profile;

	fn write_options<W: Write + Seek>(&self, writer: &mut W, endian: Endian, profile: Self::Args<'_>) -> BinResult<()> {
		if profile.compact_tags() {
			writer.write_type(&(self.property_type as u8), endian)?;
			writer.write_type(&(self.compare_type as u8), endian)?;
			writer.write_type(&0u8, endian)?;
			writer.write_type(&(self.is_global as u8), endian)?;
			writer.write_type(&self.action_hash, endian)?;
			writer.write_type(&self.value, endian)?;
			if self.property_type == Self::ENUM_PROPERTY {
				writer.write_type_args(&self.enum_name_offset.unwrap_or_default(), endian, profile)?;
			}
		} else {
			writer.write_type(&self.property_type, endian)?;
			writer.write_type(&self.compare_type, endian)?;
			writer.write_type(&self.value, endian)?;
			writer.write_type(&(self.action_hash as u16), endian)?;
			writer.write_type(&0u8, endian)?;
			writer.write_type(&(self.is_global as u8), endian)?;
		}
		Ok(())
	}
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ResRandomCondition {
	pub weight: f32,
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ResBlendCondition {
	pub min: f32,
	pub max: f32,
	pub blend_type_to_max: u8,
	#[brw(pad_after = 2)]
	pub blend_type_to_min: u8,
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ResSequenceCondition {
	pub continue_on_fade: i32,
}
