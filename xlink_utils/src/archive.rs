// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only access to SARC archives, which is how zstd dictionaries are shipped

use std::collections::BTreeMap;
use std::io::Cursor;

use binrw::{binrw, BinReaderExt};
use tracing::{debug, warn};

use crate::{Error, Result};

#[binrw]
#[brw(little, magic = b"SARC")]
#[derive(Clone, Debug, Eq, PartialEq)]
struct ArchiveHeader {
	header_size: u16,
	byte_order_mark: u16,
	file_size: u32,
	data_offset: u32,
	#[brw(pad_after = 2)]
	version: u16,
}

#[binrw]
#[brw(little, magic = b"SFAT")]
#[derive(Clone, Debug, Eq, PartialEq)]
struct AllocationTableHeader {
	header_size: u16,
	file_count: u16,
	hash_multiplier: u32,
}

#[binrw]
#[brw(little)]
#[derive(Clone, Debug, Eq, PartialEq)]
struct AllocationTableEntry {
	name_hash: u32,
	/// name offset in the low 24 bits, collision count in the high 8
	attributes: u32,
	data_start: u32,
	data_end: u32,
}

#[binrw]
#[brw(little, magic = b"SFNT")]
#[derive(Clone, Debug, Eq, PartialEq)]
struct NameTableHeader {
	#[brw(pad_after = 2)]
	header_size: u16,
}

const ARCHIVE_HEADER_SIZE: u16 = 0x14;
const ALLOCATION_TABLE_HEADER_SIZE: u16 = 0xC;
const NAME_TABLE_HEADER_SIZE: u16 = 0x8;

pub fn name_hash(name: &[u8], multiplier: u32) -> u32 {
	// bytes are signed
	name.iter()
		.fold(0u32, |hash, &byte| hash.wrapping_mul(multiplier).wrapping_add(byte as i8 as u32))
}

/// The files of an archive, keyed by their path
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Archive {
	files: BTreeMap<String, Vec<u8>>,
}

impl Archive {
	pub fn parse(data: &[u8]) -> Result<Self> {
		let mut cur = Cursor::new(data);
		let header: ArchiveHeader = cur.read_le()?;
		if header.header_size != ARCHIVE_HEADER_SIZE {
			return Err(Error::InvalidArchive("archive header size"));
		}
		if header.byte_order_mark != 0xFEFF {
			return Err(Error::InvalidArchive("big endian archives are not supported"));
		}
		if header.file_size as usize != data.len() {
			warn!(header = header.file_size, actual = data.len(), "archive size does not match its header");
		}

		let table: AllocationTableHeader = cur.read_le()?;
		if table.header_size != ALLOCATION_TABLE_HEADER_SIZE {
			return Err(Error::InvalidArchive("allocation table header size"));
		}
		let entries = (0..table.file_count)
			.map(|_| cur.read_le::<AllocationTableEntry>())
			.collect::<binrw::BinResult<Vec<_>>>()?;

		let names: NameTableHeader = cur.read_le()?;
		if names.header_size != NAME_TABLE_HEADER_SIZE {
			return Err(Error::InvalidArchive("name table header size"));
		}

		let mut files = BTreeMap::new();
		let mut name_pos = cur.position() as usize;
		for _ in 0..entries.len() {
			let rest = data.get(name_pos..).ok_or(Error::InvalidArchive("name table is truncated"))?;
			let len = rest
				.iter()
				.position(|&byte| byte == 0)
				.ok_or(Error::InvalidArchive("unterminated file name"))?;
			let name = std::str::from_utf8(&rest[..len]).map_err(|_| Error::InvalidArchive("file name is not utf-8"))?;
			name_pos += (len + 1).next_multiple_of(4);

			let hash = name_hash(name.as_bytes(), table.hash_multiplier);
			let Ok(index) = entries.binary_search_by_key(&hash, |entry| entry.name_hash) else {
				debug!(name, "file name has no allocation entry");
				continue;
			};
			let entry = &entries[index];
			let start = header.data_offset as usize + entry.data_start as usize;
			let end = header.data_offset as usize + entry.data_end as usize;
			let contents = data
				.get(start..end)
				.ok_or(Error::InvalidArchive("file data lies outside the archive"))?;
			files.insert(name.to_string(), contents.to_vec());
		}

		if files.len() != entries.len() {
			return Err(Error::UnresolvedArchiveEntries {
				resolved: files.len(),
				expected: entries.len(),
			});
		}
		debug!(files = files.len(), "loaded archive");
		Ok(Self { files })
	}

	pub fn get(&self, name: &str) -> Option<&[u8]> {
		self.files.get(name).map(Vec::as_slice)
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	/// Files in path order
	pub fn files(&self) -> impl Iterator<Item = (&str, &[u8])> {
		self.files.iter().map(|(name, data)| (name.as_str(), data.as_slice()))
	}

	pub fn into_files(self) -> impl Iterator<Item = (String, Vec<u8>)> {
		self.files.into_iter()
	}
}
