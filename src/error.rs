
use std::io;
use std::path::PathBuf;


/// The extraction settings can never work, no matter the inputs
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {

	#[error("box size must be positive")]
	BoxSize,

	#[error("downscaling requires a positive downscale box size")]
	DownscaleBoxSize,

	#[error("background radius must be finite and non-negative, not {0}")]
	BackgroundRadius(f64),

	#[error("background radius {radius} leaves no background pixels in a {box_size}px box")]
	EmptyBackground {
		radius: f64,
		box_size: u32
	},

	#[error("pixel size must be finite and positive, not {0}")]
	PixelSize(f64),

	#[error("config key {key}: {msg}")]
	Key {
		key: String,
		msg: String
	}
}


/// A micrograph, coordinate list, or CTF mapping was missing or malformed
#[derive(Debug, thiserror::Error)]
pub enum InputError {

	#[error("Failed to read {path}")]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("micrograph is empty")]
	EmptyMicrograph,

	#[error("micrograph contains only NaN values")]
	AllNan,

	#[error("micrograph has {0} sections, expected a single 2D image")]
	NotAnImage(u32),

	#[error("unsupported MRC mode: {0}")]
	MrcMode(u32),

	#[error("malformed MRC file: {0}")]
	Mrc(String),

	#[error("coordinate lists differ in length: {xs} x values, {ys} y values")]
	CoordinateLengths {
		xs: usize,
		ys: usize
	},

	#[error("line {line}: {msg}")]
	Coordinates {
		line: usize,
		msg: String
	},

	#[error("missing CTF value: {0}")]
	MissingCtf(&'static str),

	#[error("malformed CTF value {key}: {msg}")]
	Ctf {
		key: String,
		msg: String
	},

	#[error("malformed STAR file, line {line}: {msg}")]
	Star {
		line: usize,
		msg: String
	}
}

impl InputError {

	pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		Self::Io {
			path: path.into(),
			source
		}
	}
}


/// Why a single particle could not be extracted
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParticleError {

	#[error("coordinate ({x}, {y}) is not finite")]
	NonFinite {
		x: f64,
		y: f64
	},

	#[error("box around pixel ({px}, {py}) lies entirely outside the {cols}x{rows} micrograph")]
	OutOfBounds {
		px: i64,
		py: i64,
		cols: usize,
		rows: usize
	},

	#[error("can't normalize by a background with mean {mean} and standard deviation {std}")]
	Background {
		mean: f64,
		std: f64
	},

	#[error("resampling produced a non-finite value")]
	Resample
}


#[derive(Debug, thiserror::Error)]
pub enum ExtractError {

	#[error("invalid extraction config")]
	Config(#[from] ConfigError),

	#[error("Failed to extract particle {index}")]
	Particle {
		index: usize,
		#[source]
		source: ParticleError
	}
}

impl ExtractError {

	/// the coordinate index that failed, if the failure was per-particle
	pub fn particle_index(&self) -> Option<usize> {
		match self {
			Self::Particle { index, .. } => Some(*index),
			_ => None
		}
	}
}


#[derive(Debug, thiserror::Error)]
pub enum OutputError {

	#[error("Failed to write {path}")]
	Write {
		path: PathBuf,
		#[source]
		source: io::Error
	},

	#[error("Failed to move {from} into place at {to}")]
	Rename {
		from: PathBuf,
		to: PathBuf,
		#[source]
		source: io::Error
	}
}
