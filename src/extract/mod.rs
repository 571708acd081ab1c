
//! Cuts particles out of a micrograph.
//!
//! Each coordinate becomes one frame of the output stack, in input order:
//! the box around the rounded coordinate is cropped and edge-padded to full size,
//! then optionally contrast-inverted, normalized by its background, and downscaled.
//! Any failure fails the whole micrograph, so the stack and its records always agree.

pub mod window;
pub mod normalize;
pub mod resample;

use tracing::{debug, info, trace};

use crate::config::ExtractionConfig;
use crate::coords::Coordinates;
use crate::ctf::CtfAnnotation;
use crate::error::{ExtractError, InputError, ParticleError};
use crate::raster::Raster;
use crate::records::{Optics, OutputRecord};
use crate::scale::PixelSize;

use normalize::BackgroundMask;


/// A micrograph ready for extraction: non-empty, with some real values
#[derive(Debug, Clone)]
pub struct Micrograph {
	raster: Raster,
	pixel_size: PixelSize
}

impl Micrograph {

	pub fn new(raster: Raster, pixel_size: PixelSize) -> Result<Self,InputError> {
		if raster.is_empty() {
			return Err(InputError::EmptyMicrograph);
		}
		if raster.all_nan() {
			return Err(InputError::AllNan);
		}
		Ok(Self {
			raster,
			pixel_size
		})
	}

	pub fn raster(&self) -> &Raster {
		&self.raster
	}

	pub fn pixel_size(&self) -> PixelSize {
		self.pixel_size
	}
}


/// How the records refer to the files
#[derive(Debug, Clone, PartialEq)]
pub struct RecordNames {
	pub micrograph: String,
	pub stack: String
}


/// The stack frames and their records, index-aligned
#[derive(Debug, Clone)]
pub struct Extraction {
	pub frames: Vec<Raster>,
	pub records: Vec<OutputRecord>,
	/// Angstroms per pixel of the frames, after any downscaling
	pub pixel_size: PixelSize,
	/// side length of the frames
	pub box_size: u32
}

impl Extraction {

	pub fn len(&self) -> usize {
		self.frames.len()
	}

	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	pub fn optics(&self) -> Optics {
		Optics {
			pixel_size: self.pixel_size,
			image_size: self.box_size
		}
	}
}


/// A validated config, with the background mask built once for every particle
#[derive(Debug, Clone)]
pub struct Extractor {
	config: ExtractionConfig,
	mask: Option<BackgroundMask>
}

impl Extractor {

	pub fn new(config: ExtractionConfig) -> Result<Self,ExtractError> {

		config.validate()?;

		let mask = if config.normalize {
			Some(BackgroundMask::new(config.box_size, config.background_radius())?)
		} else {
			None
		};

		Ok(Self {
			config,
			mask
		})
	}

	pub fn config(&self) -> &ExtractionConfig {
		&self.config
	}

	/// The pixel size of the output frames, for a micrograph with the given pixel size
	pub fn output_pixel_size(&self, pixel_size: PixelSize) -> PixelSize {
		let pixel_size = self.config.pixel_size.unwrap_or(pixel_size);
		if self.config.downscale {
			pixel_size.resampled(self.config.box_size, self.config.output_box_size())
		} else {
			pixel_size
		}
	}

	#[tracing::instrument(skip_all, level = 5, name = "Extract", fields(micrograph = %names.micrograph))]
	pub fn extract(
		&self,
		micrograph: &Micrograph,
		coordinates: &Coordinates,
		ctf: &CtfAnnotation,
		names: &RecordNames
	) -> Result<Extraction,ExtractError> {

		debug!(
			"micrograph {}x{}, {} particles, box={}px",
			micrograph.raster.cols(),
			micrograph.raster.rows(),
			coordinates.len(),
			self.config.box_size
		);

		let mut frames = Vec::with_capacity(coordinates.len());
		let mut records = Vec::with_capacity(coordinates.len());
		let mut num_clipped = 0usize;

		for (index, (x, y)) in coordinates.iter().enumerate() {

			let (frame, clipped) = self.particle(&micrograph.raster, x, y)
				.map_err(|source| ExtractError::Particle {
					index,
					source
				})?;
			if clipped {
				num_clipped += 1;
			}
			frames.push(frame);

			records.push(OutputRecord {
				x,
				y,
				frame: index + 1,
				stack_name: names.stack.clone(),
				micrograph_name: names.micrograph.clone(),
				ctf: *ctf
			});
		}

		let pixel_size = self.output_pixel_size(micrograph.pixel_size);
		info!(
			"Extracted {} particles ({} padded at the micrograph edge), {}px boxes at {}",
			frames.len(),
			num_clipped,
			self.config.output_box_size(),
			pixel_size
		);

		Ok(Extraction {
			frames,
			records,
			pixel_size,
			box_size: self.config.output_box_size()
		})
	}

	/// One frame of the stack, and whether its box was padded
	fn particle(&self, micrograph: &Raster, x: f64, y: f64) -> Result<(Raster,bool),ParticleError> {

		let (mut frame, window) = window::crop_padded(micrograph, x, y, self.config.box_size as usize)?;
		if window.is_clipped() {
			trace!("particle at ({}, {}) padded: {:?}", x, y, window);
		}

		if self.config.invert_contrast {
			normalize::invert(&mut frame);
		}

		if let Some(mask) = &self.mask {
			frame = normalize::normalize_background(&frame, mask)?;
		}

		if self.config.downscale {
			let size = self.config.output_box_size() as usize;
			frame = resample::resample_cubic(&frame, size, size);
			if frame.pixels().iter().any(|v| !v.is_finite()) {
				return Err(ParticleError::Resample);
			}
		}

		Ok((frame, window.is_clipped()))
	}
}


/// Extracts every coordinate with a one-off extractor
pub fn extract(
	micrograph: &Micrograph,
	coordinates: &Coordinates,
	config: ExtractionConfig,
	ctf: &CtfAnnotation,
	names: &RecordNames
) -> Result<Extraction,ExtractError> {
	Extractor::new(config)?
		.extract(micrograph, coordinates, ctf, names)
}
