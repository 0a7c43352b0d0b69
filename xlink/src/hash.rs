// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

/// CRC32 used for user keys and asset call key names
pub fn name_hash(name: &str) -> u32 {
	crc32fast::hash(name.as_bytes())
}
