// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

use crate::schema::{ParamCategory, ParamType};

#[derive(Error, Debug)]
pub enum Error {
	#[error("bad magic {0:#010x}, not an XLNK resource")]
	BadMagic(u32),
	#[error("declared file size {declared:#x} is smaller than the header ({minimum:#x})")]
	TooSmall { declared: u64, minimum: u64 },
	#[error("declared file size {declared:#x} does not match the buffer length {actual:#x}")]
	SizeMismatch { declared: u64, actual: u64 },
	#[error("unrecognized resource version {0:#x}")]
	UnknownVersion(u32),
	#[error("invalid {kind} tag {value:#x}")]
	InvalidTag { kind: &'static str, value: u32 },
	#[error("{table} index {index} is out of bounds (count {count})")]
	OutOfBounds {
		table: &'static str,
		index: u64,
		count: u64,
	},
	#[error("{table} offset {offset:#x} does not point at a known entry")]
	UnresolvedOffset { table: &'static str, offset: u64 },
	#[error("string at offset {0:#x} is not valid UTF-8")]
	InvalidString(u64),
	#[error("{category} param slot {slot} is declared as {declared} but is referenced as a {referenced}")]
	SchemaMismatch {
		category: ParamCategory,
		slot: usize,
		declared: ParamType,
		referenced: &'static str,
	},
	#[error("{category} param slot {slot} is not declared in the schema (count {count})")]
	UnknownParam {
		category: ParamCategory,
		slot: usize,
		count: usize,
	},
	#[error("reference to {table} #{index} does not resolve")]
	UnresolvedReference { table: &'static str, index: usize },
	#[error("{field} value {value} does not fit its on-disk field")]
	Overflow { field: &'static str, value: i64 },
	#[error("{0} cannot be expressed by this profile")]
	Unsupported(&'static str),
	#[error("inconsistent model: {0}")]
	Inconsistent(&'static str),
	#[error("{section} was laid out at {expected:#x} but written at {actual:#x}")]
	LayoutMismatch {
		section: &'static str,
		expected: u64,
		actual: u64,
	},
	#[error(transparent)]
	BinRead(#[from] binrw::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Narrows a count or index to the integer type of its on-disk field
pub(crate) fn narrow<T, S>(field: &'static str, value: S) -> Result<T>
where
	S: TryInto<T> + TryInto<i64> + Copy,
{
	TryInto::<T>::try_into(value).map_err(|_| Error::Overflow {
		field,
		value: TryInto::<i64>::try_into(value).unwrap_or(i64::MAX),
	})
}
