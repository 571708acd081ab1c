
use std::fs;
use std::path::Path;

use anyhow::Context;
use toml::{Table, Value};

use crate::error::ConfigError;
use crate::extract::normalize::BackgroundMask;
use crate::scale::PixelSize;


/// Settings for one extraction run
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionConfig {

	/// side length of the square box cut around each particle, in micrograph pixels
	pub box_size: u32,

	/// pixels farther than this from the box center are background, in micrograph pixels.
	/// None means 0.375 of the box size
	pub background_radius: Option<f64>,

	/// standardize each particle by its background mean and standard deviation
	pub normalize: bool,

	/// negate pixel values, so particles become bright
	pub invert_contrast: bool,

	/// resample each box to `downscale_box_size`
	pub downscale: bool,
	pub downscale_box_size: Option<u32>,

	/// overrides the pixel size in the micrograph header, in Angstroms per pixel
	pub pixel_size: Option<PixelSize>
}

impl Default for ExtractionConfig {

	fn default() -> Self {
		Self {
			box_size: 256,
			background_radius: None,
			normalize: true,
			invert_contrast: true,
			downscale: false,
			downscale_box_size: None,
			pixel_size: None
		}
	}
}

impl ExtractionConfig {

	pub const DEFAULT_BACKGROUND_FRACTION: f64 = 0.375;

	pub fn new(box_size: u32) -> Self {
		Self {
			box_size,
			.. Self::default()
		}
	}

	pub fn background_radius(&self) -> f64 {
		self.background_radius
			.unwrap_or(self.box_size as f64*Self::DEFAULT_BACKGROUND_FRACTION)
	}

	/// the side length of the frames written to the stack
	pub fn output_box_size(&self) -> u32 {
		match (self.downscale, self.downscale_box_size) {
			(true, Some(size)) => size,
			_ => self.box_size
		}
	}

	/// Checks everything that doesn't depend on the micrograph
	pub fn validate(&self) -> Result<(),ConfigError> {

		if self.box_size == 0 {
			return Err(ConfigError::BoxSize);
		}

		if self.downscale && !matches!(self.downscale_box_size, Some(size) if size > 0) {
			return Err(ConfigError::DownscaleBoxSize);
		}

		let radius = self.background_radius();
		if !radius.is_finite() || radius < 0.0 {
			return Err(ConfigError::BackgroundRadius(radius));
		}

		if let Some(pixel_size) = self.pixel_size {
			if !pixel_size.is_valid() {
				return Err(ConfigError::PixelSize(pixel_size.0));
			}
		}

		if self.normalize {
			BackgroundMask::new(self.box_size, radius)?;
		}

		Ok(())
	}

	/// Reads settings from the `[extract]` table of a TOML file.
	/// Missing keys keep their default values.
	pub fn read(path: impl AsRef<Path>) -> Result<Self,anyhow::Error> {

		let path = path.as_ref();
		let toml = fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file at: {}", path.to_string_lossy()))?
			.parse::<Table>()
			.with_context(|| format!("Failed to parse config file at: {}", path.to_string_lossy()))?;

		let table = toml.get("extract")
			.context("Missing [extract] section from config file")?
			.as_table()
			.context("extract key is not a table")?;

		Self::from_toml(table)
			.with_context(|| format!("Invalid config file at: {}", path.to_string_lossy()))
	}

	pub fn from_toml(table: &Table) -> Result<Self,ConfigError> {

		let mut config = Self::default();

		for (key, value) in table {
			match key.as_str() {
				"box_size" => config.box_size = as_u32(key, value)?,
				"background_radius" => config.background_radius = Some(as_f64(key, value)?),
				"normalize" => config.normalize = as_bool(key, value)?,
				"invert_contrast" => config.invert_contrast = as_bool(key, value)?,
				"downscale" => config.downscale = as_bool(key, value)?,
				"downscale_box_size" => config.downscale_box_size = Some(as_u32(key, value)?),
				"pixel_size" => config.pixel_size = Some(PixelSize(as_f64(key, value)?)),
				_ => return Err(key_err(key, "unrecognized setting"))
			}
		}

		Ok(config)
	}
}


fn key_err(key: &str, msg: impl Into<String>) -> ConfigError {
	ConfigError::Key {
		key: key.to_string(),
		msg: msg.into()
	}
}


fn as_u32(key: &str, value: &Value) -> Result<u32,ConfigError> {
	let i = value.as_integer()
		.ok_or_else(|| key_err(key, format!("expected an integer, not {}", value.type_str())))?;
	u32::try_from(i)
		.map_err(|_| key_err(key, format!("{} is out of range", i)))
}


fn as_f64(key: &str, value: &Value) -> Result<f64,ConfigError> {
	match value {
		Value::Float(f) => Ok(*f),
		Value::Integer(i) => Ok(*i as f64),
		_ => Err(key_err(key, format!("expected a number, not {}", value.type_str())))
	}
}


fn as_bool(key: &str, value: &Value) -> Result<bool,ConfigError> {
	value.as_bool()
		.ok_or_else(|| key_err(key, format!("expected true or false, not {}", value.type_str())))
}
