// SPDX-FileCopyrightText: 2025 Chiel Douwes
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use humansize::{format_size, DECIMAL};
use itertools::Itertools;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use tracing::{error, info, warn};
use walkdir::WalkDir;
use xlink::{PointerWidth, Profile, Resource, Target};
use xlink_utils::{
	application_main,
	loader::{read_file, write_file, Dictionaries},
	names::UserNames,
	text::TextDocument,
	Result,
};

#[derive(Copy, Clone, Debug, ValueEnum)]
enum TargetArg {
	Blitz,
	Thunder,
	Totk,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum PointerWidthArg {
	#[value(name = "32")]
	Bits32,
	#[default]
	#[value(name = "64")]
	Bits64,
}

impl From<PointerWidthArg> for PointerWidth {
	fn from(value: PointerWidthArg) -> Self {
		match value {
			PointerWidthArg::Bits32 => PointerWidth::Bits32,
			PointerWidthArg::Bits64 => PointerWidth::Bits64,
		}
	}
}

impl From<TargetArg> for Target {
	fn from(value: TargetArg) -> Self {
		match value {
			TargetArg::Blitz => Target::Blitz,
			TargetArg::Thunder => Target::Thunder,
			TargetArg::Totk => Target::Totk,
		}
	}
}

#[derive(Parser)]
#[command(version, about = "Convert and check XLNK link resources")]
struct Args {
	/// Game the resources belong to [default: totk]
	#[arg(short, long, value_enum, global = true)]
	target: Option<TargetArg>,

	/// Pointer width the resources were built with
	#[arg(short, long, value_enum, global = true, default_value_t)]
	pointer_width: PointerWidthArg,

	/// Archive holding the zstd dictionaries of the game
	#[arg(short, long, global = true)]
	dictionaries: Option<PathBuf>,

	/// Text file listing user names, split in `ELink:` and `SLink:` sections
	#[arg(short, long, global = true)]
	names: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Decode a resource into JSON, written to stdout when no output is given
	ToText { input: PathBuf, output: Option<PathBuf> },
	/// Encode a JSON document back into a resource
	FromText {
		input: PathBuf,
		output: PathBuf,
		/// Compress the output with the game's dictionary
		#[arg(short, long)]
		compress: bool,
	},
	/// Decode and encode a resource, reporting where the output differs
	Roundtrip { input: PathBuf, output: Option<PathBuf> },
	/// Summarize a resource
	Info { input: PathBuf },
	/// Check that every resource found reencodes byte exact
	Verify {
		#[arg(required = true)]
		file_or_directory: Vec<PathBuf>,
	},
}

struct Context {
	target: Option<Target>,
	pointer_width: PointerWidth,
	dictionaries: Dictionaries,
	names: UserNames,
}

impl Context {
	fn new(args: &Args) -> Result<Self> {
		let dictionaries = match &args.dictionaries {
			Some(path) => Dictionaries::load(path)?,
			None => Dictionaries::default(),
		};
		let names = match &args.names {
			Some(path) => UserNames::parse(&std::fs::read_to_string(path)?),
			None => UserNames::default(),
		};
		Ok(Self {
			target: args.target.map(Target::from),
			pointer_width: args.pointer_width.into(),
			dictionaries,
			names,
		})
	}

	fn profile(&self) -> Profile {
		Profile::new(self.target.unwrap_or(Target::Totk)).with_pointer_width(self.pointer_width)
	}

	fn decode(&self, path: &Path) -> Result<(Vec<u8>, Resource, bool)> {
		let file = read_file(path, &self.dictionaries)?;
		let resource = xlink::decode(&file.data, self.profile())?;
		Ok((file.data, resource, file.was_compressed))
	}
}

fn first_difference(original: &[u8], encoded: &[u8]) -> Option<String> {
	capture_diff_slices(Algorithm::Myers, original, encoded)
		.into_iter()
		.find(|op| op.tag() != DiffTag::Equal)
		.map(|op| {
			let (old, new) = (op.old_range(), op.new_range());
			format!(
				"{:?} at {:#x}: {:02x?} became {:02x?}",
				op.tag(),
				old.start,
				&original[old.start..old.end.min(old.start + 16)],
				&encoded[new.start..new.end.min(new.start + 16)],
			)
		})
}

fn to_text(context: &Context, input: &Path, output: Option<&Path>) -> Result<()> {
	let (_, resource, _) = context.decode(input)?;
	let json = TextDocument::new(resource, context.profile(), &context.names).to_json()?;
	match output {
		Some(output) => std::fs::write(output, json)?,
		None => println!("{json}"),
	}
	Ok(())
}

fn from_text(context: &Context, input: &Path, output: &Path, compress: bool) -> Result<()> {
	let document = TextDocument::from_json(&std::fs::read_to_string(input)?)?;
	let profile = match context.target {
		Some(_) => context.profile(),
		None => document.profile,
	};
	let resource = document.into_resource(profile)?;
	let data = xlink::encode(&resource, profile)?;
	write_file(output, &data, compress, &context.dictionaries)?;
	info!(size = %format_size(data.len(), DECIMAL), "wrote {}", output.display());
	Ok(())
}

/// Whether a file survived decoding and encoding unchanged
enum Outcome {
	Exact,
	Structural(String),
}

fn reencode(context: &Context, original: &[u8], resource: &Resource) -> Result<(Vec<u8>, Outcome)> {
	let profile = context.profile();
	let encoded = xlink::encode(resource, profile)?;
	let outcome = match first_difference(original, &encoded) {
		None => Outcome::Exact,
		Some(difference) => {
			// the model still has to survive, only the byte layout may differ
			if &xlink::decode(&encoded, profile)? != resource {
				return Err(xlink::Error::Inconsistent("re-decoded model differs").into());
			}
			Outcome::Structural(difference)
		}
	};
	Ok((encoded, outcome))
}

fn roundtrip(context: &Context, input: &Path, output: Option<&Path>) -> Result<()> {
	let (original, resource, was_compressed) = context.decode(input)?;
	let (encoded, outcome) = reencode(context, &original, &resource)?;
	match outcome {
		Outcome::Exact => println!("{}: byte exact", input.display()),
		Outcome::Structural(difference) => println!("{}: model preserved, {difference}", input.display()),
	}
	if let Some(output) = output {
		write_file(output, &encoded, was_compressed, &context.dictionaries)?;
	}
	Ok(())
}

fn print_info(context: &Context, input: &Path) -> Result<()> {
	let (data, resource, was_compressed) = context.decode(input)?;
	let profile = context.profile();
	let system = resource
		.system_kind(profile)
		.map_or_else(|| "unknown".to_string(), |system| system.to_string());

	println!("{}", input.display());
	println!(
		"  {system} version {:#x} for {profile}, {}{}",
		resource.version,
		format_size(data.len(), DECIMAL),
		if was_compressed { " (zstd)" } else { "" }
	);
	println!(
		"  params: {} user, {} asset, {} trigger",
		resource.schema.user_params.len(),
		resource.schema.asset_params.len(),
		resource.schema.trigger_params.len()
	);
	println!(
		"  {} asset param sets, {} trigger param sets, {} conditions, {} strings",
		resource.asset_params.len(),
		resource.trigger_overwrite_params.len(),
		resource.conditions.len(),
		resource.strings.len()
	);
	println!("  {} users", resource.users.len());
	let names = resource.system_kind(profile).map(|system| context.names.resolve(&resource, system));
	for (hash, user) in &resource.users {
		let name = names
			.as_ref()
			.and_then(|names| names.get(hash))
			.map_or_else(|| format!("{hash:#010x}"), String::clone);
		println!(
			"    {name}: {} calls, {} containers, {} actions, {} properties",
			user.asset_calls.len(),
			user.containers.len(),
			user.actions.len(),
			user.properties.len()
		);
	}
	Ok(())
}

#[derive(Default)]
struct Summary {
	exact: usize,
	structural: usize,
	failed: usize,
	skipped: usize,
	bytes: usize,
}

fn verify_file(context: &Context, path: &Path, summary: &mut Summary) -> Result<()> {
	let file = read_file(path, &context.dictionaries)?;
	if !file.data.starts_with(b"XLNK") {
		summary.skipped += 1;
		return Ok(());
	}
	let resource = xlink::decode(&file.data, context.profile())?;
	summary.bytes += file.data.len();
	match reencode(context, &file.data, &resource)?.1 {
		Outcome::Exact => summary.exact += 1,
		Outcome::Structural(difference) => {
			warn!("{}: {difference}", path.display());
			summary.structural += 1;
		}
	}
	Ok(())
}

fn verify(context: &Context, paths: &[PathBuf]) -> Result<bool> {
	let mut summary = Summary::default();
	let files = paths
		.iter()
		.flat_map(WalkDir::new)
		.filter_map(|entry| entry.ok())
		.filter(|entry| entry.file_type().is_file())
		.map(|entry| entry.into_path())
		.sorted();
	for path in files {
		if let Err(err) = verify_file(context, &path, &mut summary) {
			error!("{}: {err}", path.display());
			summary.failed += 1;
		}
	}
	println!(
		"{} byte exact, {} structurally equal, {} failed, {} skipped ({} checked)",
		summary.exact,
		summary.structural,
		summary.failed,
		summary.skipped,
		format_size(summary.bytes, DECIMAL)
	);
	Ok(summary.failed == 0)
}

fn run(args: Args) -> Result<bool> {
	let context = Context::new(&args)?;
	match &args.command {
		Command::ToText { input, output } => to_text(&context, input, output.as_deref())?,
		Command::FromText {
			input,
			output,
			compress,
		} => from_text(&context, input, output, *compress)?,
		Command::Roundtrip { input, output } => roundtrip(&context, input, output.as_deref())?,
		Command::Info { input } => print_info(&context, input)?,
		Command::Verify { file_or_directory } => return verify(&context, file_or_directory),
	}
	Ok(true)
}

fn main() -> ExitCode {
	let args = Args::parse();
	application_main(|| match run(args) {
		Ok(true) => ExitCode::SUCCESS,
		Ok(false) => ExitCode::FAILURE,
		Err(err) => {
			error!("{err}");
			eprintln!("error: {err}");
			ExitCode::FAILURE
		}
	})
}
