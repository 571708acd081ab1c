
/// A 2D grid of f32 values in row-major order.
/// Indexed by (x, y) where x is the column and y is the row, matching micrograph coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
	cols: usize,
	rows: usize,
	pixels: Vec<f32>
}

impl Raster {

	pub fn new(cols: usize, rows: usize) -> Self {
		Self::filled(cols, rows, 0.0)
	}

	pub fn filled(cols: usize, rows: usize, val: f32) -> Self {
		Self {
			cols,
			rows,
			pixels: vec![val; cols*rows]
		}
	}

	/// Returns None if the pixel count doesn't match the dimensions
	pub fn from_pixels(cols: usize, rows: usize, pixels: Vec<f32>) -> Option<Self> {
		if pixels.len() != cols*rows {
			return None;
		}
		Some(Self {
			cols,
			rows,
			pixels
		})
	}

	pub fn from_fn(cols: usize, rows: usize, f: impl Fn(usize, usize) -> f32) -> Self {
		let mut pixels = Vec::with_capacity(cols*rows);
		for y in 0 .. rows {
			for x in 0 .. cols {
				pixels.push(f(x, y));
			}
		}
		Self {
			cols,
			rows,
			pixels
		}
	}

	pub fn cols(&self) -> usize {
		self.cols
	}

	pub fn rows(&self) -> usize {
		self.rows
	}

	pub fn is_empty(&self) -> bool {
		self.pixels.is_empty()
	}

	fn index(&self, x: usize, y: usize) -> usize {
		debug_assert!(x < self.cols && y < self.rows, "({}, {}) outside {}x{}", x, y, self.cols, self.rows);
		y*self.cols + x
	}

	pub fn get(&self, x: usize, y: usize) -> f32 {
		self.pixels[self.index(x, y)]
	}

	pub fn pixels(&self) -> &[f32] {
		&self.pixels
	}

	pub fn pixels_mut(&mut self) -> &mut [f32] {
		&mut self.pixels
	}

	pub fn row(&self, y: usize) -> &[f32] {
		let start = self.index(0, y);
		&self.pixels[start .. start + self.cols]
	}

	pub fn all_nan(&self) -> bool {
		self.pixels.iter().all(|v| v.is_nan())
	}

	/// min, max, mean, and rms deviation from the mean, over the finite values
	pub fn stats(&self) -> RasterStats {
		RasterStats::of(self.pixels.iter().copied())
	}
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterStats {
	pub min: f32,
	pub max: f32,
	pub mean: f32,
	pub rms: f32
}

impl RasterStats {

	pub fn of(values: impl Iterator<Item=f32> + Clone) -> Self {

		let mut min = f32::INFINITY;
		let mut max = f32::NEG_INFINITY;
		let mut sum = 0f64;
		let mut count = 0usize;
		for v in values.clone().filter(|v| v.is_finite()) {
			min = min.min(v);
			max = max.max(v);
			sum += v as f64;
			count += 1;
		}

		if count == 0 {
			return Self {
				min: 0.0,
				max: 0.0,
				mean: 0.0,
				rms: 0.0
			};
		}

		let mean = sum/(count as f64);
		let sum_sq = values
			.filter(|v| v.is_finite())
			.map(|v| {
				let d = v as f64 - mean;
				d*d
			})
			.sum::<f64>();

		Self {
			min,
			max,
			mean: mean as f32,
			rms: (sum_sq/(count as f64)).sqrt() as f32
		}
	}
}
