
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ExtractionConfig;
use crate::coords::Coordinates;
use crate::ctf::CtfAnnotation;
use crate::error::OutputError;
use crate::extract::{Extraction, Extractor, Micrograph, RecordNames};
use crate::logging::ResultExt;
use crate::mrc;
use crate::output;
use crate::preview::Preview;
use crate::scale::{PixelSize, ValuePx};


/// Where the CTF values for the micrograph come from
#[derive(Debug, Clone, PartialEq)]
pub enum CtfSource {
	/// CTFFind's diagnostic text output
	Ctffind(PathBuf),
	/// a TOML file with a `[ctf]` table
	Toml(PathBuf),
	Values(CtfAnnotation)
}

impl CtfSource {

	pub fn load(&self) -> Result<CtfAnnotation> {
		match self {
			Self::Ctffind(path) => CtfAnnotation::read_ctffind(path)
				.context(format!("Failed to read CTFFind output: {}", path.to_string_lossy())),
			Self::Toml(path) => CtfAnnotation::read_toml(path)
				.context(format!("Failed to read CTF values: {}", path.to_string_lossy())),
			Self::Values(ctf) => Ok(*ctf)
		}
	}
}


/// One unit of work: all the particles of one micrograph
#[derive(Debug, Clone)]
pub struct ExtractJob {
	pub micrograph: PathBuf,
	pub coordinates: PathBuf,
	pub ctf: CtfSource,
	pub stack: PathBuf,
	pub table: PathBuf,
	pub config: ExtractionConfig,
	/// folder for PNG previews, if wanted
	pub preview_dir: Option<PathBuf>
}


#[derive(Debug, Clone, PartialEq)]
pub struct ExtractSummary {
	pub num_particles: usize,
	pub box_size: u32,
	pub pixel_size: PixelSize
}


/// Runs the whole job, or fails without writing the stack or table
#[tracing::instrument(skip_all, level = 5, name = "ExtractJob", fields(micrograph = %job.micrograph.to_string_lossy()))]
pub fn run(job: &ExtractJob) -> Result<ExtractSummary> {

	// check the config before reading any big files
	let extractor = Extractor::new(job.config.clone())
		.context("Invalid extraction settings")?;

	let (raster, header_pixel_size) = mrc::read_micrograph(&job.micrograph)
		.context(format!("Failed to read micrograph: {}", job.micrograph.to_string_lossy()))?;
	let pixel_size = match (job.config.pixel_size, header_pixel_size) {
		(Some(pixel_size), _) => pixel_size,
		(None, Some(pixel_size)) => pixel_size,
		(None, None) => {
			warn!("Micrograph has no pixel size in its header, assuming {}", PixelSize::UNKNOWN);
			PixelSize::UNKNOWN
		}
	};
	let micrograph = Micrograph::new(raster, pixel_size)
		.context(format!("Unusable micrograph: {}", job.micrograph.to_string_lossy()))?;
	info!(
		"Micrograph {}x{} at {}, boxes of {}",
		micrograph.raster().cols(),
		micrograph.raster().rows(),
		pixel_size,
		ValuePx(job.config.box_size as f64).to_a(pixel_size)
	);

	let coordinates = Coordinates::read(&job.coordinates)
		.context(format!("Failed to read coordinates: {}", job.coordinates.to_string_lossy()))?;
	let ctf = job.ctf.load()?;

	let names = RecordNames {
		micrograph: job.micrograph.to_string_lossy().to_string(),
		stack: job.stack.to_string_lossy().to_string()
	};
	let extraction = extractor.extract(&micrograph, &coordinates, &ctf, &names)
		.context(format!("Failed to extract particles from {}", job.micrograph.to_string_lossy()))?;

	output::write_all(&extraction, &job.stack, &job.table)
		.context("Failed to write extraction outputs")?;

	// the outputs are committed now, so a preview problem can't fail the job anymore
	if let Some(dir) = &job.preview_dir {
		let _ = write_previews(dir, job, &micrograph, &coordinates, &extraction)
			.context("Failed to write previews, the extraction outputs are unaffected")
			.warn_err();
	}

	Ok(ExtractSummary {
		num_particles: extraction.len(),
		box_size: extraction.box_size,
		pixel_size: extraction.pixel_size
	})
}


fn write_previews(dir: &Path, job: &ExtractJob, micrograph: &Micrograph, coordinates: &Coordinates, extraction: &Extraction) -> Result<()> {

	let stem = job.micrograph.file_stem()
		.map(|s| s.to_string_lossy().to_string())
		.unwrap_or_else(|| "micrograph".to_string());
	fs::create_dir_all(dir)
		.context(format!("Failed to create preview folder: {}", dir.to_string_lossy()))?;

	Preview::micrograph(micrograph.raster(), coordinates, job.config.box_size)
		.save(dir.join(format!("{}_picks.png", stem)))?;
	if !extraction.is_empty() {
		Preview::montage(&extraction.frames, 10)
			.save(dir.join(format!("{}_particles.png", stem)))?;
	}

	Ok(())
}


/// Whether a failed run might succeed if tried again unchanged.
/// Only trouble writing the outputs qualifies: bad settings or inputs will fail the same way again.
pub fn is_retryable(err: &anyhow::Error) -> bool {
	err.chain()
		.any(|e| e.downcast_ref::<OutputError>().is_some())
}


#[cfg(test)]
mod test {

	use std::io;

	use galvanic_assert::{assert_that, matchers::*};

	use crate::error::InputError;

	use super::*;


	#[test]
	fn retryable_anywhere_in_the_chain() {

		let write = OutputError::Write {
			path: PathBuf::from("mic_1.mrcs"),
			source: io::Error::new(io::ErrorKind::Other, "disk full")
		};
		let err = Err::<(),_>(write)
			.context("Failed to write extraction outputs")
			.unwrap_err();
		assert_that!(&is_retryable(&err), eq(true));

		// a missing input stays missing
		let read = InputError::io("mic_1.mrc", io::Error::new(io::ErrorKind::NotFound, "no such file"));
		let err = Err::<(),_>(read)
			.context("Failed to read micrograph")
			.unwrap_err();
		assert_that!(&is_retryable(&err), eq(false));
	}
}
