// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Read, Seek, Write};

use binrw::{binrw, BinRead, BinReaderExt, BinResult, BinWrite, BinWriterExt, Endian};
use derive_more::{Display, TryFrom};
use enum_iterator::Sequence;
use modular_bitfield::{bitfield, prelude::*};
use serde::{Deserialize, Serialize};

use super::TargetPointer;
use crate::profile::Profile;

#[repr(u32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Display, TryFrom, Sequence, Serialize, Deserialize)]
#[try_from(repr)]
pub enum ContainerType {
	Switch = 0,
	Random = 1,
	Random2 = 2,
	Blend = 3,
	Sequence = 4,
	Grid = 5,
	Jump = 6,
}

impl ContainerType {
	pub fn is_supported(self, profile: Profile) -> bool {
		match self {
			ContainerType::Grid => profile.has_grid(),
			ContainerType::Jump => profile.has_jump(),
			_ => true,
		}
	}
}

/// Common head of every container record.
///
/// Compact-tag targets store the type in a byte followed by two flags, Blitz uses a full word
/// and has no flags.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResContainerBase {
	pub container_type: u32,
	pub is_not_blend_all: bool,
	pub is_need_observe: bool,
	pub child_start: i32,
	pub child_end: i32,
}

impl ResContainerBase {
	pub fn size(profile: Profile) -> u64 {
		if profile.compact_tags() { 0x10 } else { 0xC }
	}
}

impl BinRead for ResContainerBase {
	type Args<'a> = Profile;

	fn read_options<R: Read + Seek>(reader: &mut R, endian: Endian, profile: Self::Args<'_>) -> BinResult<Self> {
		if profile.compact_tags() {
			let container_type = reader.read_type::<u8>(endian)? as u32;
			let is_not_blend_all = reader.read_type::<u8>(endian)? != 0;
			let is_need_observe = reader.read_type::<u8>(endian)? != 0;
			let _unknown = reader.read_type::<u8>(endian)?;
			let child_start = reader.read_type(endian)?;
			let child_end = reader.read_type(endian)?;
			let _padding = reader.read_type::<u32>(endian)?;
			Ok(Self {
				container_type,
				is_not_blend_all,
				is_need_observe,
				child_start,
				child_end,
			})
		} else {
			Ok(Self {
				container_type: reader.read_type(endian)?,
				is_not_blend_all: false,
				is_need_observe: false,
				child_start: reader.read_type(endian)?,
				child_end: reader.read_type(endian)?,
			})
		}
	}
}

impl BinWrite for ResContainerBase {
	type Args<'a> = Profile;

	fn write_options<W: Write + Seek>(&self, writer: &mut W, endian: Endian, profile: Self::Args<'_>) -> BinResult<()> {
		if profile.compact_tags() {
			writer.write_type(&(self.container_type as u8), endian)?;
			writer.write_type(&(self.is_not_blend_all as u8), endian)?;
			writer.write_type(&(self.is_need_observe as u8), endian)?;
			writer.write_type(&0u8, endian)?;
			writer.write_type(&self.child_start, endian)?;
			writer.write_type(&self.child_end, endian)?;
			writer.write_type(&0u32, endian)?;
		} else {
			writer.write_type(&self.container_type, endian)?;
			writer.write_type(&self.child_start, endian)?;
			writer.write_type(&self.child_end, endian)?;
		}
		Ok(())
	}
}

/// Watched property of a switch container (and of a blend container that does not blend all
/// of its children), stored right after the base record
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResSwitchContainerParam {
	pub action_slot_name_offset: TargetPointer,
	pub watch_property_id: i32,
	pub property_index: i16,
	pub is_global: bool,
	pub is_action_trigger: bool,
}

impl ResSwitchContainerParam {
	/// Size excluding the base record
	pub fn size(profile: Profile) -> u64 {
		let lead = if profile.compact_tags() || !profile.is_wide() { 0 } else { 4 };
		lead + profile.pointer_size() + 8
	}
}

impl BinRead for ResSwitchContainerParam {
	type Args<'a> = Profile;

	fn read_options<R: Read + Seek>(reader: &mut R, endian: Endian, profile: Self::Args<'_>) -> BinResult<Self> {
		if !profile.compact_tags() && profile.is_wide() {
			let _padding = reader.read_type::<u32>(endian)?;
		}
		let action_slot_name_offset = reader.read_type_args(endian, profile)?;
		let watch_property_id = reader.read_type(endian)?;
		let property_index = reader.read_type(endian)?;
		let is_global = reader.read_type::<u8>(endian)? != 0;
		let last = reader.read_type::<u8>(endian)?;
		Ok(Self {
			action_slot_name_offset,
			watch_property_id,
			property_index,
			is_global,
			is_action_trigger: profile.compact_tags() && last != 0,
		})
	}
}

impl BinWrite for ResSwitchContainerParam {
	type Args<'a> = Profile;

	fn write_options<W: Write + Seek>(&self, writer: &mut W, endian: Endian, profile: Self::Args<'_>) -> BinResult<()> {
		if !profile.compact_tags() && profile.is_wide() {
			writer.write_type(&0u32, endian)?;
		}
		writer.write_type_args(&self.action_slot_name_offset, endian, profile)?;
		writer.write_type(&self.watch_property_id, endian)?;
		writer.write_type(&self.property_index, endian)?;
		writer.write_type(&(self.is_global as u8), endian)?;
		let last = profile.compact_tags() && self.is_action_trigger;
		writer.write_type(&(last as u8), endian)
	}
}

#[bitfield]
#[derive(BinRead, BinWrite, Clone, Copy, Debug, Eq, PartialEq)]
#[br(map = Self::from_bytes)]
#[bw(map = |&x| Self::into_bytes(x))]
pub struct GridFlags {
	pub is_property1_global: bool,
	pub is_property2_global: bool,
	#[skip]
	__: B14,
}

/// Two watched properties and a row-major table of child indices, stored after the base record
#[binrw]
#[brw(import_raw(profile: Profile))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResGridContainerParam {
	#[brw(args_raw = profile)]
	pub property_name_offset1: TargetPointer,
	#[brw(args_raw = profile)]
	pub property_name_offset2: TargetPointer,
	pub property_index1: i16,
	pub property_index2: i16,
	pub flags: GridFlags,
	pub property_value_count1: u8,
	pub property_value_count2: u8,
	#[br(count = property_value_count1)]
	pub values1: Vec<u32>,
	#[br(count = property_value_count2)]
	pub values2: Vec<u32>,
	#[br(count = property_value_count1 as usize * property_value_count2 as usize)]
	pub indices: Vec<i32>,
}

impl ResGridContainerParam {
	/// Size excluding the base record
	pub fn size(profile: Profile, count1: usize, count2: usize) -> u64 {
		2 * profile.pointer_size() + 8 + 4 * (count1 + count2 + count1 * count2) as u64
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use super::*;
	use crate::profile::PointerWidth;

	fn written_len<T>(value: &T, profile: Profile) -> u64
	where
		T: for<'a> BinWrite<Args<'a> = Profile>,
	{
		let mut cur = Cursor::new(vec![]);
		value.write_options(&mut cur, Endian::Little, profile).unwrap();
		cur.into_inner().len() as u64
	}

	#[test]
	fn switch_container_sizes() {
		let switch = ResSwitchContainerParam::default();
		let cases = [
			(Profile::TOTK, 0x20),
			(Profile::TOTK.with_pointer_width(PointerWidth::Bits32), 0x1C),
			(Profile::BLITZ, 0x20),
			(Profile::BLITZ.with_pointer_width(PointerWidth::Bits32), 0x18),
		];
		for (profile, total) in cases {
			let size = written_len(&ResContainerBase::default(), profile) + written_len(&switch, profile);
			assert_eq!(size, total, "{profile}");
			assert_eq!(
				ResContainerBase::size(profile) + ResSwitchContainerParam::size(profile),
				total
			);
		}
	}

	#[test]
	fn grid_container_layout() {
		let grid = ResGridContainerParam {
			property_name_offset1: TargetPointer(4),
			property_name_offset2: TargetPointer(8),
			property_index1: 1,
			property_index2: -1,
			flags: GridFlags::new().with_is_property2_global(true),
			property_value_count1: 2,
			property_value_count2: 3,
			values1: vec![1, 2],
			values2: vec![3, 4, 5],
			indices: vec![0, 1, 2, 3, 4, 5],
		};
		let mut cur = Cursor::new(vec![]);
		grid.write_options(&mut cur, Endian::Little, Profile::TOTK).unwrap();
		assert_eq!(cur.get_ref().len() as u64, ResGridContainerParam::size(Profile::TOTK, 2, 3));
		assert_eq!(ResContainerBase::size(Profile::TOTK) + ResGridContainerParam::size(Profile::TOTK, 0, 0), 0x28);

		cur.set_position(0);
		let read = ResGridContainerParam::read_options(&mut cur, Endian::Little, Profile::TOTK).unwrap();
		assert_eq!(read, grid);
		assert!(!read.flags.is_property1_global());
		assert!(read.flags.is_property2_global());
	}

	#[test]
	fn container_types() {
		assert_eq!(ContainerType::try_from(5u32).ok(), Some(ContainerType::Grid));
		assert!(ContainerType::try_from(7u32).is_err());
		assert!(!ContainerType::Grid.is_supported(Profile::BLITZ));
		assert!(ContainerType::Grid.is_supported(Profile::THUNDER));
		assert!(!ContainerType::Jump.is_supported(Profile::THUNDER));
	}
}
