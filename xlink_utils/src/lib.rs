// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod archive;
pub mod loader;
pub mod names;
pub mod text;

use std::time::Instant;

use thiserror::Error;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt};
use xlink::Profile;

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	IOError(#[from] std::io::Error),
	#[error(transparent)]
	ResourceError(#[from] xlink::Error),
	#[error(transparent)]
	BinRWError(#[from] binrw::Error),
	#[error(transparent)]
	JsonError(#[from] serde_json::Error),
	#[error("malformed archive: {0}")]
	InvalidArchive(&'static str),
	#[error("only {resolved} of {expected} archive entries could be matched to a name")]
	UnresolvedArchiveEntries { resolved: usize, expected: usize },
	#[error("none of the {0} dictionaries decompress this file")]
	NoMatchingDictionary(usize),
	#[error("the document was written for {document}, not for {requested}")]
	ProfileMismatch { document: Profile, requested: Profile },
	#[error("user name {name:?} does not hash to {hash:#010x}")]
	NameHashMismatch { name: String, hash: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Installs the global subscriber, runs `main` and reports how long it took
pub fn application_main<T>(main: impl FnOnce() -> T) -> T {
	if let Err(err) = tracing::subscriber::set_global_default(
		tracing_subscriber::registry()
			.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
			.with(EnvFilter::from_default_env()),
	) {
		eprintln!("could not set up logging: {err}");
	}

	let start = Instant::now();

	let result = main();

	let elapsed = start.elapsed();
	eprintln!("(in {:?})", elapsed);
	result
}
