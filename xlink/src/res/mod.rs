// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! On-disk records of the resource.
//!
//! Records whose layout depends on the pointer width or the target take the [`Profile`] as their
//! raw binrw arguments. Everything is little endian.

pub mod condition;
pub mod container;
pub mod user;

use std::io::{Read, Seek, Write};

use binrw::{binrw, BinRead, BinReaderExt, BinResult, BinWrite, BinWriterExt, Endian};
use modular_bitfield::{bitfield, prelude::*};

use crate::profile::Profile;

pub const RESOURCE_MAGIC: u32 = u32::from_le_bytes(*b"XLNK");

/// Lower 32 bits of an optional offset field that point nowhere
pub const NULL_OFFSET: u64 = 0xFFFF_FFFF;

pub fn is_null_offset(offset: u64) -> bool {
	offset as u32 == u32::MAX
}

/// An offset stored with the width of a pointer on the target
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TargetPointer(pub u64);

impl TargetPointer {
	pub const NULL: TargetPointer = TargetPointer(NULL_OFFSET);

	pub fn is_null(&self) -> bool {
		is_null_offset(self.0)
	}
}

impl From<u64> for TargetPointer {
	fn from(value: u64) -> Self {
		Self(value)
	}
}

impl BinRead for TargetPointer {
	type Args<'a> = Profile;

	fn read_options<R: Read + Seek>(reader: &mut R, endian: Endian, profile: Self::Args<'_>) -> BinResult<Self> {
		Ok(Self(if profile.is_wide() {
			reader.read_type::<u64>(endian)?
		} else {
			reader.read_type::<u32>(endian)? as u64
		}))
	}
}

impl BinWrite for TargetPointer {
	type Args<'a> = Profile;

	fn write_options<W: Write + Seek>(&self, writer: &mut W, endian: Endian, profile: Self::Args<'_>) -> BinResult<()> {
		if profile.is_wide() {
			writer.write_type(&self.0, endian)
		} else {
			let narrow = u32::try_from(self.0).map_err(|_| binrw::Error::AssertFail {
				pos: writer.stream_position().unwrap_or_default(),
				message: format!("offset {:#x} does not fit in a 32-bit pointer", self.0),
			})?;
			writer.write_type(&narrow, endian)
		}
	}
}

#[binrw]
#[brw(little, magic = b"XLNK", import_raw(profile: Profile))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceHeader {
	pub file_size: u32,
	pub version: u32,
	pub num_params: u32,
	pub num_asset_params: u32,
	pub num_trigger_overwrite_params: u32,
	#[brw(args_raw = profile)]
	pub trigger_overwrite_table_pos: TargetPointer,
	#[brw(args_raw = profile)]
	pub local_property_name_ref_table_pos: TargetPointer,
	pub num_local_property_name_refs: u32,
	pub num_local_property_enum_name_refs: u32,
	pub num_direct_values: u32,
	pub num_random: u32,
	pub num_curves: u32,
	pub num_curve_points: u32,
	#[brw(args_raw = profile)]
	pub ex_region_pos: TargetPointer,
	pub num_users: u32,
	#[brw(pad_before = if profile.is_wide() { 4 } else { 0 }, args_raw = profile)]
	pub condition_table_pos: TargetPointer,
	#[brw(args_raw = profile)]
	pub name_table_pos: TargetPointer,
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResParamDefineTableHeader {
	pub size: u32,
	pub num_user_params: u32,
	pub num_asset_params: u32,
	pub num_user_asset_params: u32,
	#[brw(pad_after = 4)]
	pub num_trigger_params: u32,
}

impl ResParamDefineTableHeader {
	pub const SIZE: u64 = 0x18;

	pub fn num_defines(&self) -> u64 {
		self.num_user_params as u64 + self.num_asset_params as u64 + self.num_trigger_params as u64
	}
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResParamDefine {
	pub name_offset: u64,
	#[brw(pad_after = 4)]
	pub param_type: u32,
	pub default_value: u64,
}

impl ResParamDefine {
	pub const SIZE: u64 = 0x18;
}

#[bitfield]
#[derive(BinRead, BinWrite, Clone, Copy, Debug, Eq, PartialEq)]
#[br(map = Self::from_bytes)]
#[bw(map = |&x| Self::into_bytes(x))]
pub struct ResParam {
	pub value: B24,
	pub reference_type: B8,
}

impl ResParam {
	pub const SIZE: u64 = 4;

	pub fn from_parts(reference_type: u8, value: u32) -> Self {
		Self::new().with_reference_type(reference_type).with_value(value & 0xFF_FFFF)
	}
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResAssetParam {
	pub mask: u64,
	#[br(count = mask.count_ones())]
	pub params: Vec<ResParam>,
}

impl ResAssetParam {
	pub fn size(&self) -> u64 {
		8 + ResParam::SIZE * self.params.len() as u64
	}
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResTriggerOverwriteParam {
	pub mask: u32,
	#[br(count = mask.count_ones())]
	pub params: Vec<ResParam>,
}

impl ResTriggerOverwriteParam {
	pub fn size(&self) -> u64 {
		4 + ResParam::SIZE * self.params.len() as u64
	}
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ResRandomCallTable {
	pub min: f32,
	pub max: f32,
}

impl ResRandomCallTable {
	pub const SIZE: u64 = 8;
}

#[binrw]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ResCurvePoint {
	pub x: f32,
	pub y: f32,
}

impl ResCurvePoint {
	pub const SIZE: u64 = 8;
}

#[binrw]
#[brw(import_raw(profile: Profile))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResCurveCallTable {
	pub point_base_index: u16,
	pub point_count: u16,
	pub curve_type: u16,
	pub is_global: u16,
	#[brw(args_raw = profile)]
	pub property_name_offset: TargetPointer,
	pub unknown: i32,
	pub property_index: i16,
	pub unknown2: u16,
}

impl ResCurveCallTable {
	pub fn size(profile: Profile) -> u64 {
		16 + profile.pointer_size()
	}
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResArrangeGroupParam {
	pub group_name_offset: u64,
	pub limit_type: i8,
	pub limit_threshold: i8,
	#[brw(pad_after = 5)]
	pub unknown: u8,
}

impl ResArrangeGroupParam {
	pub const SIZE: u64 = 0x10;
}

#[binrw]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResArrangeGroupParams {
	#[br(temp)]
	#[bw(calc = groups.len() as u32)]
	num_groups: u32,
	#[br(count = num_groups)]
	pub groups: Vec<ResArrangeGroupParam>,
}

impl ResArrangeGroupParams {
	pub fn new(groups: Vec<ResArrangeGroupParam>) -> Self {
		Self { groups }
	}

	pub fn size(num_groups: usize) -> u64 {
		4 + ResArrangeGroupParam::SIZE * num_groups as u64
	}
}

#[cfg(test)]
mod tests {
	use std::io::Cursor;

	use binrw::{BinReaderExt, BinWrite};

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
	fn header_sizes() {
		let header = ResourceHeader::default();
		assert_eq!(written_len(&header, Profile::TOTK), 0x60);
		let narrow = Profile::TOTK.with_pointer_width(PointerWidth::Bits32);
		assert_eq!(written_len(&header, narrow), 0x48);
	}

	#[test]
	fn header_magic() {
		let mut cur = Cursor::new(vec![]);
		ResourceHeader::default()
			.write_options(&mut cur, Endian::Little, Profile::TOTK)
			.unwrap();
		let bytes = cur.into_inner();
		assert_eq!(&bytes[0..4], b"XLNK");
		assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), RESOURCE_MAGIC);
	}

	#[test]
	fn res_param_packing() {
		let param = ResParam::from_parts(0x11, 0x123456);
		let mut cur = Cursor::new(vec![]);
		param.write_le(&mut cur).unwrap();
		assert_eq!(cur.get_ref(), &0x1112_3456u32.to_le_bytes());

		cur.set_position(0);
		let read: ResParam = cur.read_le().unwrap();
		assert_eq!(read.reference_type(), 0x11);
		assert_eq!(read.value(), 0x123456);
	}

	#[test]
	fn asset_param_reads_popcount_values() {
		let mut data = 0b1010u64.to_le_bytes().to_vec();
		data.extend(0x0000_0001u32.to_le_bytes());
		data.extend(0x0500_0003u32.to_le_bytes());
		let param: ResAssetParam = Cursor::new(data).read_le().unwrap();
		assert_eq!(param.params.len(), 2);
		assert_eq!(param.params[1].reference_type(), 5);
		assert_eq!(param.size(), 16);
	}

	#[test]
	fn null_offsets_only_look_at_the_low_half() {
		assert!(is_null_offset(0xFFFF_FFFF));
		assert!(is_null_offset(0x1_FFFF_FFFF));
		assert!(!is_null_offset(0xFFFF_FFFE));
		assert!(TargetPointer::NULL.is_null());
	}

	#[test]
	fn narrow_pointers_reject_wide_offsets() {
		let narrow = Profile::TOTK.with_pointer_width(PointerWidth::Bits32);
		let mut cur = Cursor::new(vec![]);
		assert!(TargetPointer(0x1_0000_0000)
			.write_options(&mut cur, Endian::Little, narrow)
			.is_err());
	}
}
