// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Reading and writing of XLNK link resources, the effect (ELink) and sound (SLink) trigger tables
//! used by several Nintendo titles.
//!
//! [`decode`] turns a resource buffer into a [`Resource`], [`encode`] turns it back. Both take the
//! [`Profile`] of the target the buffer was built for, as nothing in the file itself identifies it.

pub mod accessor;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hash;
pub mod model;
pub mod profile;
pub mod res;
pub mod schema;
pub mod strings;

pub use decoder::decode;
pub use encoder::encode;
pub use error::{Error, Result};
pub use model::Resource;
pub use profile::{PointerWidth, Profile, SystemKind, Target};
