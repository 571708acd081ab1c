
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use gumdrop::Options;
use tracing::{info, warn};

use particle_extract::config::ExtractionConfig;
use particle_extract::job::{self, CtfSource, ExtractJob};
use particle_extract::logging::{self, ResultExt};
use particle_extract::mrc;
use particle_extract::scale::PixelSize;


#[derive(Debug, Options)]
struct Args {

	/// print help message
	#[options(no_short)]
	help: bool,

	/// settings for log output
	#[options(no_short, default = "particle_extract=info")]
	log: String,

	/// also append log output to this file
	#[options(no_short, meta = "FILE")]
	log_file: Option<PathBuf>,

	#[options(command)]
	cmd: Option<Command>
}


#[derive(Debug, Options)]
enum Command {

	/// cut particles out of a micrograph into an MRC stack and a STAR table
	Extract(ArgsExtract),

	/// print the header of an MRC file
	Header(ArgsHeader)
}


#[derive(Debug, Options)]
struct ArgsExtract {

	/// print help message
	#[options(no_short)]
	help: bool,

	/// the micrograph, as an MRC file
	#[options(no_short, required, meta = "MRC")]
	micrograph: PathBuf,

	/// particle coordinates, as a STAR file or x y text columns
	#[options(no_short, required, meta = "FILE")]
	coords: PathBuf,

	/// CTF values from CTFFind's text output
	#[options(no_short, meta = "TXT")]
	ctffind: Option<PathBuf>,

	/// CTF values from a TOML file with a [ctf] table
	#[options(no_short, meta = "TOML")]
	ctf_toml: Option<PathBuf>,

	/// where to write the particle stack
	#[options(no_short, required, meta = "MRCS")]
	stack: PathBuf,

	/// where to write the particles STAR table
	#[options(no_short, required, meta = "STAR")]
	table: PathBuf,

	/// extraction settings, from the [extract] table of a TOML file
	#[options(no_short, meta = "TOML")]
	config: Option<PathBuf>,

	/// box size in pixels
	#[options(no_short, meta = "PX")]
	box_size: Option<u32>,

	/// background radius in pixels, defaults to 0.375 of the box size
	#[options(no_short, meta = "PX")]
	background_radius: Option<f64>,

	/// skip background normalization
	#[options(no_short)]
	no_normalize: bool,

	/// skip contrast inversion
	#[options(no_short)]
	no_invert: bool,

	/// downscale boxes to this size in pixels
	#[options(no_short, meta = "PX")]
	downscale: Option<u32>,

	/// micrograph pixel size in Angstroms, overrides the MRC header
	#[options(no_short, meta = "A")]
	pixel_size: Option<f64>,

	/// folder for PNG previews of the picks and particles
	#[options(no_short, meta = "DIR")]
	preview: Option<PathBuf>
}

impl ArgsExtract {

	/// file settings first, then command-line overrides
	fn config(&self) -> Result<ExtractionConfig> {

		let mut config = match &self.config {
			Some(path) => ExtractionConfig::read(path)?,
			None => ExtractionConfig::default()
		};

		if let Some(box_size) = self.box_size {
			config.box_size = box_size;
		}
		if let Some(radius) = self.background_radius {
			config.background_radius = Some(radius);
		}
		if self.no_normalize {
			config.normalize = false;
		}
		if self.no_invert {
			config.invert_contrast = false;
		}
		if let Some(size) = self.downscale {
			config.downscale = true;
			config.downscale_box_size = Some(size);
		}
		if let Some(pixel_size) = self.pixel_size {
			config.pixel_size = Some(PixelSize(pixel_size));
		}

		Ok(config)
	}

	fn ctf(&self) -> Result<CtfSource> {
		match (&self.ctffind, &self.ctf_toml) {
			(Some(path), None) => Ok(CtfSource::Ctffind(path.clone())),
			(None, Some(path)) => Ok(CtfSource::Toml(path.clone())),
			(Some(_), Some(_)) => bail!("Give only one of --ctffind or --ctf-toml"),
			(None, None) => bail!("CTF values are required: use --ctffind or --ctf-toml")
		}
	}
}


#[derive(Debug, Options)]
struct ArgsHeader {

	/// print help message
	#[options(no_short)]
	help: bool,

	/// the MRC file
	#[options(free, required)]
	path: PathBuf
}


fn main() -> ExitCode {

	let args = Args::parse_args_default_or_exit();

	// init logging
	let Ok(_) = logging::init(&args.log, args.log_file.as_deref())
		.log_err()
		else { return ExitCode::FAILURE; };

	let result = run(args);
	let retryable = result.as_ref()
		.is_err_and(job::is_retryable);
	let Ok(_) = result
		.log_err()
		else {
			if retryable {
				warn!("No outputs were written, running the same job again may succeed");
			}
			return ExitCode::FAILURE;
		};

	// we finished! =)
	ExitCode::SUCCESS
}


fn run(args: Args) -> Result<()> {
	match args.cmd {
		Some(Command::Extract(args)) => extract(args),
		Some(Command::Header(args)) => header(args),
		None => bail!("No command given, try --help")
	}
}


#[tracing::instrument(skip_all, level = 5, name = "ParticleExtract")]
fn extract(args: ArgsExtract) -> Result<()> {

	let job = ExtractJob {
		config: args.config()?,
		ctf: args.ctf()?,
		micrograph: args.micrograph,
		coordinates: args.coords,
		stack: args.stack,
		table: args.table,
		preview_dir: args.preview
	};

	let summary = job::run(&job)?;
	info!(
		"Done: {} particles, {}px boxes at {}",
		summary.num_particles,
		summary.box_size,
		summary.pixel_size
	);

	Ok(())
}


fn header(args: ArgsHeader) -> Result<()> {

	let header = mrc::read_header(&args.path)
		.context(format!("Failed to read MRC header: {}", args.path.to_string_lossy()))?;

	println!("{}", args.path.to_string_lossy());
	println!("\tdimensions: {} x {} x {}", header.nx, header.ny, header.nz);
	println!("\tmode: {:?}", header.mode);
	println!("\tbyte order: {:?}", header.endian);
	match header.pixel_size() {
		Some(pixel_size) => println!("\tpixel size: {}", pixel_size),
		None => println!("\tpixel size: unknown")
	}
	println!("\tmin/max/mean: {} / {} / {}", header.dmin, header.dmax, header.dmean);
	println!("\trms: {}", header.rms);

	Ok(())
}
