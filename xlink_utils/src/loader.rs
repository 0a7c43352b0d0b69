// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Loading and storing resource files, which may be zstd compressed with one of the game's dictionaries

use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, instrument};

use crate::{archive::Archive, Error, Result};

pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
pub const COMPRESSION_LEVEL: i32 = 22;

pub fn is_compressed(data: &[u8]) -> bool {
	data.starts_with(&ZSTD_MAGIC)
}

/// Dictionaries shipped in a (possibly compressed) archive, in path order
#[derive(Clone, Debug, Default)]
pub struct Dictionaries {
	dictionaries: Vec<(String, Vec<u8>)>,
}

impl Dictionaries {
	pub fn new(dictionaries: Vec<(String, Vec<u8>)>) -> Self {
		Self { dictionaries }
	}

	#[instrument(skip_all, fields(path = %path.display()))]
	pub fn load(path: &Path) -> Result<Self> {
		let data = decompress(std::fs::read(path)?, &Self::default())?;
		let archive = Archive::parse(&data)?;
		let dictionaries = archive.into_files().filter(|(name, _)| name.ends_with(".zsdic")).collect::<Vec<_>>();
		debug!(count = dictionaries.len(), "loaded dictionaries");
		Ok(Self { dictionaries })
	}

	pub fn is_empty(&self) -> bool {
		self.dictionaries.is_empty()
	}

	pub fn len(&self) -> usize {
		self.dictionaries.len()
	}

	pub fn get(&self, name: &str) -> Option<&[u8]> {
		self.dictionaries
			.iter()
			.find(|(path, _)| path == name || path.rsplit('/').next() == Some(name))
			.map(|(_, data)| data.as_slice())
	}

	/// The dictionary used to compress written resources
	pub fn preferred(&self) -> Option<&[u8]> {
		self.get("zs.zsdic")
			.or_else(|| self.dictionaries.first().map(|(_, data)| data.as_slice()))
	}
}

/// Returns `data` unchanged unless it is a zstd frame, which is decompressed without a dictionary if it can be,
/// otherwise with the first dictionary that accepts it.
pub fn decompress(data: Vec<u8>, dictionaries: &Dictionaries) -> Result<Vec<u8>> {
	if !is_compressed(&data) {
		return Ok(data);
	}
	match zstd::stream::decode_all(data.as_slice()) {
		Ok(plain) => return Ok(plain),
		Err(err) if dictionaries.is_empty() => return Err(err.into()),
		Err(err) => debug!(%err, "frame needs a dictionary"),
	}
	for (name, dictionary) in &dictionaries.dictionaries {
		match decompress_with(&data, dictionary) {
			Ok(plain) => {
				debug!(dictionary = name, "decompressed");
				return Ok(plain);
			}
			Err(err) => debug!(dictionary = name, %err, "dictionary rejected"),
		}
	}
	Err(Error::NoMatchingDictionary(dictionaries.len()))
}

fn decompress_with(data: &[u8], dictionary: &[u8]) -> std::io::Result<Vec<u8>> {
	let mut decoder = zstd::stream::Decoder::with_dictionary(data, dictionary)?;
	let mut plain = Vec::new();
	decoder.read_to_end(&mut plain)?;
	Ok(plain)
}

pub fn compress(data: &[u8], dictionary: Option<&[u8]>) -> Result<Vec<u8>> {
	let mut encoder = match dictionary {
		Some(dictionary) => zstd::stream::Encoder::with_dictionary(Vec::new(), COMPRESSION_LEVEL, dictionary)?,
		None => zstd::stream::Encoder::new(Vec::new(), COMPRESSION_LEVEL)?,
	};
	encoder.include_checksum(true)?;
	encoder.write_all(data)?;
	Ok(encoder.finish()?)
}

/// A file read from disk, remembering whether it has to be compressed again when written back
#[derive(Clone, Debug)]
pub struct LoadedFile {
	pub data: Vec<u8>,
	pub was_compressed: bool,
}

pub fn read_file(path: impl AsRef<Path>, dictionaries: &Dictionaries) -> Result<LoadedFile> {
	let raw = std::fs::read(path)?;
	let was_compressed = is_compressed(&raw);
	Ok(LoadedFile {
		data: decompress(raw, dictionaries)?,
		was_compressed,
	})
}

pub fn write_file(path: impl AsRef<Path>, data: &[u8], compressed: bool, dictionaries: &Dictionaries) -> Result<()> {
	if compressed {
		std::fs::write(path, compress(data, dictionaries.preferred())?)?;
	} else {
		std::fs::write(path, data)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::archive::tests::build_archive;

	fn dictionary() -> Vec<u8> {
		(0..4096u32).flat_map(|i| (i.wrapping_mul(2654435761) >> 7).to_le_bytes()).collect()
	}

	#[test]
	fn plain_data_is_passed_through() {
		let data = b"XLNK\x60\0\0\0".to_vec();
		assert_eq!(decompress(data.clone(), &Dictionaries::default()).unwrap(), data);
	}

	#[test]
	fn frames_without_a_dictionary() {
		let data = b"XLNK".repeat(100);
		let compressed = compress(&data, None).unwrap();
		assert!(is_compressed(&compressed));
		assert!(compressed.len() < data.len());
		assert_eq!(decompress(compressed, &Dictionaries::default()).unwrap(), data);
	}

	#[test]
	fn frames_with_a_dictionary() {
		let dictionary = dictionary();
		let data = [&dictionary[100..1100], &dictionary[2000..3000]].concat();
		let compressed = compress(&data, Some(dictionary.as_slice())).unwrap();
		let dictionaries = Dictionaries::new(vec![("zs/zs.zsdic".into(), dictionary)]);
		assert_eq!(decompress(compressed, &dictionaries).unwrap(), data);
	}

	#[test]
	fn dictionaries_are_looked_up_by_file_name() {
		let archive = build_archive(&[("zs/zs.zsdic", b"shared"), ("zs/pack.zsdic", b"pack"), ("readme", b"")]);
		let dir = std::env::temp_dir().join(format!("xlink_utils_dictionaries_{}", std::process::id()));
		std::fs::create_dir_all(&dir).unwrap();
		let path = dir.join("ZsDic.pack.zs");
		std::fs::write(&path, compress(&archive, None).unwrap()).unwrap();

		let dictionaries = Dictionaries::load(&path).unwrap();
		assert_eq!(dictionaries.len(), 2);
		assert_eq!(dictionaries.get("pack.zsdic"), Some(&b"pack"[..]));
		assert_eq!(dictionaries.preferred(), Some(&b"shared"[..]));
		assert!(dictionaries.get("readme").is_none());
		std::fs::remove_dir_all(dir).unwrap();
	}
}
