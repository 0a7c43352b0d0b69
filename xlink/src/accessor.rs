// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only view over a resource buffer.
//!
//! Every getter is bounds checked against the declared table counts and against the buffer itself
//! and returns `None` instead of reading past either.

use std::io::Cursor;

use binrw::{BinRead, Endian};
use tracing::debug;

use crate::{
	error::{Error, Result},
	profile::{Profile, SystemKind},
	res::{
		user::{ResAssetCallTable, ResUserHeader},
		ResArrangeGroupParams, ResAssetParam, ResCurveCallTable, ResCurvePoint, ResParamDefine,
		ResParamDefineTableHeader, ResRandomCallTable, ResTriggerOverwriteParam, ResourceHeader, RESOURCE_MAGIC,
	},
	schema::ParamCategory,
};

#[derive(Clone, Debug)]
pub struct ResourceAccessor<'a> {
	data: &'a [u8],
	profile: Profile,
	header: ResourceHeader,
	system: SystemKind,

	user_offset_table_pos: u64,
	pdt_pos: u64,
	pdt: Option<ResParamDefineTableHeader>,
	local_property_enum_ref_table_pos: u64,
	direct_value_table_pos: u64,
	random_table_pos: u64,
	curve_table_pos: u64,
	curve_point_table_pos: u64,
}

impl<'a> ResourceAccessor<'a> {
	pub fn load(data: &'a [u8], profile: Profile) -> Result<Self> {
		let magic = data
			.get(0..4)
			.map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
			.ok_or(Error::TooSmall {
				declared: data.len() as u64,
				minimum: profile.header_size(),
			})?;
		if magic != RESOURCE_MAGIC {
			return Err(Error::BadMagic(magic));
		}
		if (data.len() as u64) < profile.header_size() {
			return Err(Error::TooSmall {
				declared: data.len() as u64,
				minimum: profile.header_size(),
			});
		}

		let header = ResourceHeader::read_options(&mut Cursor::new(data), Endian::Little, profile)?;
		let file_size = header.file_size as u64;
		if file_size < profile.header_size() {
			return Err(Error::TooSmall {
				declared: file_size,
				minimum: profile.header_size(),
			});
		}
		if file_size != data.len() as u64 {
			return Err(Error::SizeMismatch {
				declared: file_size,
				actual: data.len() as u64,
			});
		}
		let system = profile
			.system_kind(header.version)
			.ok_or(Error::UnknownVersion(header.version))?;

		let ptr = profile.pointer_size();
		let num_users = header.num_users as u64;
		let user_offset_table_pos = profile.align(profile.header_size() + 4 * num_users);
		let pdt_pos = profile.align(user_offset_table_pos + ptr * num_users);
		if pdt_pos > file_size {
			return Err(Error::OutOfBounds {
				table: "user",
				index: num_users,
				count: num_users,
			});
		}

		// a resource without any content ends right where the define table would start
		let pdt = if pdt_pos == file_size {
			None
		} else {
			Some(ResParamDefineTableHeader::read_options(
				&mut Self::cursor_at(data, pdt_pos),
				Endian::Little,
				(),
			)?)
		};

		for (table, pos) in [
			("trigger overwrite table", header.trigger_overwrite_table_pos.0),
			("local property table", header.local_property_name_ref_table_pos.0),
			("ex region", header.ex_region_pos.0),
			("condition table", header.condition_table_pos.0),
			("name table", header.name_table_pos.0),
		] {
			if pos > file_size {
				return Err(Error::UnresolvedOffset { table, offset: pos });
			}
		}
		if header.condition_table_pos.0 > header.name_table_pos.0 {
			return Err(Error::UnresolvedOffset {
				table: "condition table",
				offset: header.condition_table_pos.0,
			});
		}

		// every table position is bounded by the file size from here on
		let local_property_enum_ref_table_pos =
			header.local_property_name_ref_table_pos.0 + ptr * header.num_local_property_name_refs as u64;
		let direct_value_table_pos =
			local_property_enum_ref_table_pos + ptr * header.num_local_property_enum_name_refs as u64;
		let random_table_pos = direct_value_table_pos + 4 * header.num_direct_values as u64;
		let curve_table_pos = random_table_pos + ResRandomCallTable::SIZE * header.num_random as u64;
		let curve_point_table_pos = curve_table_pos + ResCurveCallTable::size(profile) * header.num_curves as u64;

		debug!(
			version = header.version,
			%system,
			users = header.num_users,
			size = file_size,
			"loaded resource"
		);

		Ok(Self {
			data,
			profile,
			header,
			system,
			user_offset_table_pos,
			pdt_pos,
			pdt,
			local_property_enum_ref_table_pos,
			direct_value_table_pos,
			random_table_pos,
			curve_table_pos,
			curve_point_table_pos,
		})
	}

	fn cursor_at(data: &[u8], pos: u64) -> Cursor<&[u8]> {
		let mut cursor = Cursor::new(data);
		cursor.set_position(pos);
		cursor
	}

	/// Reads a record at an absolute position
	pub(crate) fn read_at<T>(&self, pos: u64, args: T::Args<'_>) -> Result<T>
	where
		T: BinRead,
	{
		if pos > self.data.len() as u64 {
			return Err(Error::UnresolvedOffset {
				table: std::any::type_name::<T>(),
				offset: pos,
			});
		}
		Ok(T::read_options(&mut Self::cursor_at(self.data, pos), Endian::Little, args)?)
	}

	fn get_at<T>(&self, pos: u64, args: T::Args<'_>) -> Option<T>
	where
		T: BinRead,
	{
		self.read_at(pos, args).ok()
	}

	fn pointer_at(&self, pos: u64) -> Option<u64> {
		self.get_at::<crate::res::TargetPointer>(pos, self.profile).map(|p| p.0)
	}

	fn checked(index: usize, count: u32) -> Option<u64> {
		(index < count as usize).then_some(index as u64)
	}

	pub fn data(&self) -> &'a [u8] {
		self.data
	}

	pub fn profile(&self) -> Profile {
		self.profile
	}

	pub fn header(&self) -> &ResourceHeader {
		&self.header
	}

	pub fn system_kind(&self) -> SystemKind {
		self.system
	}

	pub fn file_size(&self) -> u64 {
		self.header.file_size as u64
	}

	pub fn user_hash(&self, index: usize) -> Option<u32> {
		let index = Self::checked(index, self.header.num_users)?;
		self.get_at(self.profile.header_size() + 4 * index, ())
	}

	/// Absolute position of a user record
	pub fn user_offset(&self, index: usize) -> Option<u64> {
		let index = Self::checked(index, self.header.num_users)?;
		self.pointer_at(self.user_offset_table_pos + self.profile.pointer_size() * index)
			.filter(|&pos| pos < self.file_size())
	}

	pub fn user_header(&self, index: usize) -> Option<ResUserHeader> {
		self.get_at(self.user_offset(index)?, ())
	}

	/// Asset call indices of a user as stored in its sorted lookup table
	pub fn sorted_asset_ids(&self, index: usize) -> Option<Vec<u16>> {
		let offset = self.user_offset(index)?;
		let header = self.user_header(index)?;
		let pos = offset
			+ ResUserHeader::SIZE
			+ self.profile.pointer_size() * header.local_property_count as u64
			+ 4 * self.pdt.as_ref().map_or(0, |pdt| pdt.num_user_params as u64);
		(0..header.call_count as u64)
			.map(|i| self.get_at::<u16>(pos + 2 * i, ()))
			.collect()
	}

	/// Asset call record of a user, as stored
	pub fn asset_call(&self, index: usize, call: usize) -> Option<ResAssetCallTable> {
		let offset = self.user_offset(index)?;
		let header = self.user_header(index)?;
		let call = Self::checked(call, header.call_count)?;
		let call_count = header.call_count as u64;
		let pos = offset
			+ ResUserHeader::SIZE
			+ self.profile.pointer_size() * header.local_property_count as u64
			+ 4 * self.pdt.as_ref().map_or(0, |pdt| pdt.num_user_params as u64)
			+ 2 * (call_count + call_count % 2)
			+ ResAssetCallTable::size(self.profile) * call;
		self.get_at(pos, self.profile)
	}

	pub fn param_define_table(&self) -> Option<&ResParamDefineTableHeader> {
		self.pdt.as_ref()
	}

	pub fn param_define_table_pos(&self) -> u64 {
		self.pdt_pos
	}

	pub fn param_define(&self, category: ParamCategory, index: usize) -> Option<ResParamDefine> {
		let pdt = self.pdt.as_ref()?;
		let (skip, count) = match category {
			ParamCategory::User => (0, pdt.num_user_params),
			ParamCategory::Asset => (pdt.num_user_params as u64, pdt.num_asset_params),
			ParamCategory::Trigger => (
				pdt.num_user_params as u64 + pdt.num_asset_params as u64,
				pdt.num_trigger_params,
			),
		};
		let index = Self::checked(index, count)?;
		self.get_at(
			self.pdt_pos + ResParamDefineTableHeader::SIZE + ResParamDefine::SIZE * (skip + index),
			(),
		)
	}

	pub fn param_define_name_table_pos(&self) -> u64 {
		self.pdt.as_ref().map_or(self.pdt_pos, |pdt| {
			self.pdt_pos + ResParamDefineTableHeader::SIZE + ResParamDefine::SIZE * pdt.num_defines()
		})
	}

	/// Names of the param defines, up to the declared end of the define table
	pub fn param_define_name_table(&self) -> &'a [u8] {
		let Some(pdt) = &self.pdt else {
			return &[];
		};
		let start = self.param_define_name_table_pos() as usize;
		let end = (self.pdt_pos + pdt.size as u64).min(self.header.trigger_overwrite_table_pos.0) as usize;
		self.data.get(start..end).unwrap_or_default()
	}

	pub fn asset_param_table_pos(&self) -> u64 {
		self.pdt.as_ref().map_or(self.pdt_pos, |pdt| {
			self.pdt_pos + self.profile.align(pdt.size as u64)
		})
	}

	/// Asset param block at an offset relative to the asset param table
	pub fn asset_param(&self, offset: u64) -> Option<ResAssetParam> {
		let pos = self.asset_param_table_pos().checked_add(offset)?;
		if pos >= self.header.trigger_overwrite_table_pos.0 {
			return None;
		}
		self.get_at(pos, ())
	}

	/// Trigger overwrite param block at an offset relative to the trigger overwrite table
	pub fn trigger_overwrite_param(&self, offset: u64) -> Option<ResTriggerOverwriteParam> {
		let pos = self.header.trigger_overwrite_table_pos.0.checked_add(offset)?;
		if pos >= self.header.local_property_name_ref_table_pos.0 {
			return None;
		}
		self.get_at(pos, ())
	}

	/// Name table offset of a local property name
	pub fn local_property_name_offset(&self, index: usize) -> Option<u64> {
		let index = Self::checked(index, self.header.num_local_property_name_refs)?;
		self.pointer_at(self.header.local_property_name_ref_table_pos.0 + self.profile.pointer_size() * index)
	}

	pub fn local_property_enum_name_offset(&self, index: usize) -> Option<u64> {
		let index = Self::checked(index, self.header.num_local_property_enum_name_refs)?;
		self.pointer_at(self.local_property_enum_ref_table_pos + self.profile.pointer_size() * index)
	}

	pub fn direct_value(&self, index: usize) -> Option<u32> {
		let index = Self::checked(index, self.header.num_direct_values)?;
		self.get_at(self.direct_value_table_pos + 4 * index, ())
	}

	pub fn random_call(&self, index: usize) -> Option<ResRandomCallTable> {
		let index = Self::checked(index, self.header.num_random)?;
		self.get_at(self.random_table_pos + ResRandomCallTable::SIZE * index, ())
	}

	pub fn curve(&self, index: usize) -> Option<ResCurveCallTable> {
		let index = Self::checked(index, self.header.num_curves)?;
		self.get_at(
			self.curve_table_pos + ResCurveCallTable::size(self.profile) * index,
			self.profile,
		)
	}

	pub fn curve_point(&self, index: usize) -> Option<ResCurvePoint> {
		let index = Self::checked(index, self.header.num_curve_points)?;
		self.get_at(self.curve_point_table_pos + ResCurvePoint::SIZE * index, ())
	}

	pub fn ex_region_pos(&self) -> u64 {
		self.header.ex_region_pos.0
	}

	/// Arrange group block at an offset relative to the ex region
	pub fn arrange_group_params(&self, offset: u64) -> Option<ResArrangeGroupParams> {
		let pos = self.ex_region_pos().checked_add(offset)?;
		if pos >= self.header.condition_table_pos.0 {
			return None;
		}
		self.get_at(pos, ())
	}

	pub fn condition_table_pos(&self) -> u64 {
		self.header.condition_table_pos.0
	}

	pub fn condition_table(&self) -> &'a [u8] {
		let start = self.header.condition_table_pos.0 as usize;
		let end = self.header.name_table_pos.0 as usize;
		self.data.get(start..end).unwrap_or_default()
	}

	pub fn name_table_pos(&self) -> u64 {
		self.header.name_table_pos.0
	}

	pub fn name_table(&self) -> &'a [u8] {
		self.data
			.get(self.header.name_table_pos.0 as usize..)
			.unwrap_or_default()
	}

	/// NUL terminated string at an offset into the name table
	pub fn string(&self, offset: u64) -> Option<&'a str> {
		let table = self.name_table();
		let rest = table.get(usize::try_from(offset).ok()?..)?;
		let len = rest.iter().position(|&b| b == 0)?;
		std::str::from_utf8(&rest[..len]).ok()
	}
}
