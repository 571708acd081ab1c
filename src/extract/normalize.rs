
use crate::error::{ConfigError, ParticleError};
use crate::raster::Raster;


/// Marks the pixels of a box that lie outside the particle.
/// Distances are measured from the particle's own pixel, at offset (size/2, size/2) in the box.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundMask {
	size: usize,
	mask: Vec<bool>,
	count: usize
}

impl BackgroundMask {

	/// Fails if no pixel of the box lies farther than `radius` from the center
	pub fn new(box_size: u32, radius: f64) -> Result<Self,ConfigError> {

		let size = box_size as usize;
		let center = (size/2) as f64;
		let radius_sq = radius*radius;

		let mut mask = Vec::with_capacity(size*size);
		for y in 0 .. size {
			for x in 0 .. size {
				let dx = x as f64 - center;
				let dy = y as f64 - center;
				mask.push(dx*dx + dy*dy > radius_sq);
			}
		}

		let count = mask.iter()
			.filter(|m| **m)
			.count();
		if count == 0 {
			return Err(ConfigError::EmptyBackground {
				radius,
				box_size
			});
		}

		Ok(Self {
			size,
			mask,
			count
		})
	}

	pub fn size(&self) -> usize {
		self.size
	}

	/// number of background pixels
	pub fn count(&self) -> usize {
		self.count
	}

	pub fn contains(&self, x: usize, y: usize) -> bool {
		self.mask[y*self.size + x]
	}

	/// the values of the background pixels of a box-sized raster
	pub fn select<'a>(&'a self, raster: &'a Raster) -> impl Iterator<Item=f32> + Clone + 'a {
		debug_assert_eq!((raster.cols(), raster.rows()), (self.size, self.size));
		raster.pixels().iter()
			.zip(self.mask.iter())
			.filter(|(_, m)| **m)
			.map(|(v, _)| *v)
	}
}


/// Mean and population standard deviation of the background pixels
pub fn background_stats(raster: &Raster, mask: &BackgroundMask) -> (f64, f64) {

	let n = mask.count() as f64;
	let mean = mask.select(raster)
		.map(|v| v as f64)
		.sum::<f64>()/n;
	let var = mask.select(raster)
		.map(|v| {
			let d = v as f64 - mean;
			d*d
		})
		.sum::<f64>()/n;

	(mean, var.sqrt())
}


/// Standardizes the whole box by its background: v -> (v - mean)/std
pub fn normalize_background(raster: &Raster, mask: &BackgroundMask) -> Result<Raster,ParticleError> {

	let (mean, std) = background_stats(raster, mask);
	if !mean.is_finite() || !std.is_finite() || std <= 0.0 {
		return Err(ParticleError::Background {
			mean,
			std
		});
	}

	let mut out = raster.clone();
	for v in out.pixels_mut() {
		*v = ((*v as f64 - mean)/std) as f32;
	}
	Ok(out)
}


/// Negates every pixel
pub fn invert(raster: &mut Raster) {
	for v in raster.pixels_mut() {
		*v = -*v;
	}
}
