// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{Read, Seek, Write};

use binrw::{binrw, BinRead, BinReaderExt, BinResult, BinWrite, BinWriterExt, Endian};
use modular_bitfield::{bitfield, prelude::*};

use super::TargetPointer;
use crate::profile::Profile;

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResUserHeader {
	pub is_setup: u32,
	pub local_property_count: u16,
	pub unknown: u16,
	pub call_count: u32,
	pub asset_count: u32,
	pub random_container_count: u32,
	pub action_slot_count: u32,
	pub action_count: u32,
	pub action_trigger_count: u32,
	pub property_count: u32,
	pub property_trigger_count: u32,
	#[brw(pad_after = 4)]
	pub always_trigger_count: u32,
	pub trigger_table_offset: u64,
}

impl ResUserHeader {
	pub const SIZE: u64 = 0x38;
}

#[binrw]
#[brw(import_raw(profile: Profile))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResAssetCallTable {
	#[brw(args_raw = profile)]
	pub key_name_offset: TargetPointer,
	pub asset_index: i16,
	pub flag: u16,
	pub duration: i32,
	pub parent_index: i32,
	pub guid: u32,
	pub key_name_hash: u32,
	#[brw(pad_before = if profile.is_wide() { 4 } else { 0 }, args_raw = profile)]
	pub param_offset: TargetPointer,
	#[brw(args_raw = profile)]
	pub condition_offset: TargetPointer,
}

impl ResAssetCallTable {
	pub fn size(profile: Profile) -> u64 {
		if profile.is_wide() { 0x30 } else { 0x20 }
	}

	pub fn is_container(&self) -> bool {
		self.flag & 1 == 1
	}
}

#[binrw]
#[brw(import_raw(profile: Profile))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResActionSlot {
	#[brw(args_raw = profile)]
	pub name_offset: TargetPointer,
	pub action_start: i16,
	#[brw(pad_after = if profile.is_wide() { 4 } else { 0 })]
	pub action_end: i16,
}

impl ResActionSlot {
	pub fn size(profile: Profile) -> u64 {
		2 * profile.pointer_size()
	}
}

/// Trigger ranges are 16-bit with a match flag on compact-tag targets and 32-bit otherwise
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResAction {
	pub name_offset: TargetPointer,
	pub trigger_start: i32,
	pub trigger_end: i32,
	pub enable_match_start: bool,
}

impl ResAction {
	pub fn size(profile: Profile) -> u64 {
		profile.pointer_size() + 8
	}
}

impl BinRead for ResAction {
	type Args<'a> = Profile;

	fn read_options<R: Read + Seek>(reader: &mut R, endian: Endian, profile: Self::Args<'_>) -> BinResult<Self> {
		let name_offset = reader.read_type_args(endian, profile)?;
		if profile.compact_tags() {
			let trigger_start = reader.read_type::<i16>(endian)? as i32;
			let enable_match_start = reader.read_type::<u8>(endian)? != 0;
			let _padding = reader.read_type::<u8>(endian)?;
			let trigger_end = reader.read_type::<i16>(endian)? as i32;
			let _padding = reader.read_type::<u16>(endian)?;
			Ok(Self {
				name_offset,
				trigger_start,
				trigger_end,
				enable_match_start,
			})
		} else {
			Ok(Self {
				name_offset,
				trigger_start: reader.read_type::<u32>(endian)? as i32,
				trigger_end: reader.read_type::<u32>(endian)? as i32,
				enable_match_start: false,
			})
		}
	}
}

impl BinWrite for ResAction {
	type Args<'a> = Profile;

	fn write_options<W: Write + Seek>(&self, writer: &mut W, endian: Endian, profile: Self::Args<'_>) -> BinResult<()> {
		writer.write_type_args(&self.name_offset, endian, profile)?;
		if profile.compact_tags() {
			writer.write_type(&(self.trigger_start as i16), endian)?;
			writer.write_type(&(self.enable_match_start as u8), endian)?;
			writer.write_type(&0u8, endian)?;
			writer.write_type(&(self.trigger_end as i16), endian)?;
			writer.write_type(&0u16, endian)?;
		} else {
			writer.write_type(&(self.trigger_start as u32), endian)?;
			writer.write_type(&(self.trigger_end as u32), endian)?;
		}
		Ok(())
	}
}

#[bitfield]
#[derive(BinRead, BinWrite, Clone, Copy, Debug, Eq, PartialEq)]
#[br(map = Self::from_bytes)]
#[bw(map = |&x| Self::into_bytes(x))]
pub struct ActionTriggerFlags {
	pub trigger_once: bool,
	#[skip]
	__: B1,
	pub fade: bool,
	pub always_trigger: bool,
	pub name_match: bool,
	#[skip]
	__: B11,
}

#[binrw]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResActionTrigger {
	pub guid: u32,
	pub unknown: u32,
	pub asset_call_offset: u64,
	/// previous action name offset when matching by name, otherwise the start frame in the low half
	pub start: u64,
	pub end_frame: i32,
	pub flags: ActionTriggerFlags,
	pub overwrite_hash: u16,
	pub overwrite_param_offset: u64,
}

impl ResActionTrigger {
	pub const SIZE: u64 = 0x28;

	pub fn start_frame(&self) -> i32 {
		self.start as u32 as i32
	}
}

#[binrw]
#[brw(import_raw(profile: Profile))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResProperty {
	#[brw(args_raw = profile)]
	pub name_offset: TargetPointer,
	pub is_global: u32,
	pub trigger_start: i32,
	#[brw(pad_after = if profile.is_wide() { 4 } else { 0 })]
	pub trigger_end: i32,
}

impl ResProperty {
	pub fn size(profile: Profile) -> u64 {
		if profile.is_wide() { 0x18 } else { 0x10 }
	}
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResPropertyTrigger {
	pub guid: u32,
	pub flag: u16,
	pub overwrite_hash: u16,
	pub asset_call_offset: u64,
	pub condition_offset: u64,
	pub overwrite_param_offset: u64,
}

impl ResPropertyTrigger {
	pub const SIZE: u64 = 0x20;
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResAlwaysTrigger {
	pub guid: u32,
	pub flag: u16,
	pub overwrite_hash: u16,
	pub asset_call_offset: u64,
	pub overwrite_param_offset: u64,
}

impl ResAlwaysTrigger {
	pub const SIZE: u64 = 0x18;
}
