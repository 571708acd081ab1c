
use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::info;

use crate::coords::Coordinates;
use crate::extract::window::round_half_even;
use crate::raster::{Raster, RasterStats};


/// contrast stretch range, in standard deviations around the mean
const STRETCH_SIGMAS: f32 = 3.0;

/// micrograph previews are binned down until they fit
const MAX_PREVIEW_SIZE: usize = 1024;


/// An 8-bit grayscale rendering of extraction results, for a quick look
pub struct Preview {
	img: GrayImage
}

impl Preview {

	/// The frames laid out in a grid, left to right then top to bottom
	pub fn montage(frames: &[Raster], columns: usize) -> Self {

		let Some(first) = frames.first()
			else {
				return Self {
					img: GrayImage::new(1, 1)
				};
			};
		let (fw, fh) = (first.cols(), first.rows());
		let columns = columns.clamp(1, frames.len());
		let rows = frames.len().div_ceil(columns);

		// one contrast stretch for the whole stack, so frames compare fairly
		let stats = RasterStats::of(frames.iter().flat_map(|f| f.pixels().iter().copied()));

		let mut img = GrayImage::new((fw*columns) as u32, (fh*rows) as u32);
		for (i, frame) in frames.iter().enumerate() {
			let ox = (i % columns)*fw;
			let oy = (i/columns)*fh;
			for y in 0 .. frame.rows() {
				for x in 0 .. frame.cols() {
					img.put_pixel((ox + x) as u32, (oy + y) as u32, to_gray(frame.get(x, y), &stats));
				}
			}
		}

		Self {
			img
		}
	}

	/// The micrograph, binned to fit, with the extraction boxes outlined
	pub fn micrograph(micrograph: &Raster, coordinates: &Coordinates, box_size: u32) -> Self {

		let bin = micrograph.cols().max(micrograph.rows())
			.div_ceil(MAX_PREVIEW_SIZE)
			.max(1);
		let binned = bin_raster(micrograph, bin);
		let stats = binned.stats();

		let mut img = GrayImage::new(binned.cols() as u32, binned.rows() as u32);
		for y in 0 .. binned.rows() {
			for x in 0 .. binned.cols() {
				img.put_pixel(x as u32, y as u32, to_gray(binned.get(x, y), &stats));
			}
		}

		for (x, y) in coordinates.iter() {
			if let Some(rect) = binned_box(x, y, box_size, bin) {
				draw_hollow_rect_mut(&mut img, rect, Luma([255u8]));
			}
		}

		Self {
			img
		}
	}

	pub fn width(&self) -> u32 {
		self.img.width()
	}

	pub fn height(&self) -> u32 {
		self.img.height()
	}

	pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		self.img.save(path)
			.context(format!("Failed to save preview to: {}", path.to_string_lossy()))?;
		info!("Saved preview: {}", path.to_string_lossy());
		Ok(())
	}
}


/// The extraction box around (x, y), in binned preview pixels.
/// Boxes hanging off the top or left edge round outward, like the rest of the binned grid.
fn binned_box(x: f64, y: f64, box_size: u32, bin: usize) -> Option<Rect> {
	if !x.is_finite() || !y.is_finite() {
		return None;
	}
	let half = (box_size/2) as i64;
	let bin = bin as i64;
	let left = (round_half_even(x) - half).div_euclid(bin);
	let top = (round_half_even(y) - half).div_euclid(bin);
	let size = (box_size as i64/bin).max(1) as u32;
	Some(Rect::at(left as i32, top as i32).of_size(size, size))
}


fn to_gray(v: f32, stats: &RasterStats) -> Luma<u8> {
	if !v.is_finite() {
		return Luma([0]);
	}
	let lo = stats.mean - STRETCH_SIGMAS*stats.rms;
	let hi = stats.mean + STRETCH_SIGMAS*stats.rms;
	if hi <= lo {
		return Luma([128]);
	}
	let t = ((v - lo)/(hi - lo)).clamp(0.0, 1.0);
	Luma([(t*255.0).round() as u8])
}


/// Averages non-overlapping bin x bin blocks; partial blocks at the edges average what they have
fn bin_raster(raster: &Raster, bin: usize) -> Raster {
	if bin <= 1 {
		return raster.clone();
	}
	let cols = raster.cols().div_ceil(bin);
	let rows = raster.rows().div_ceil(bin);
	Raster::from_fn(cols, rows, |bx, by| {
		let mut sum = 0f64;
		let mut count = 0usize;
		for y in by*bin .. ((by + 1)*bin).min(raster.rows()) {
			for x in bx*bin .. ((bx + 1)*bin).min(raster.cols()) {
				let v = raster.get(x, y);
				if v.is_finite() {
					sum += v as f64;
					count += 1;
				}
			}
		}
		if count == 0 {
			f32::NAN
		} else {
			(sum/count as f64) as f32
		}
	})
}
