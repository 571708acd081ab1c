
use crate::raster::Raster;


/// Keys' cubic convolution parameter, the same one bicubic resizing in most image tools uses
const A: f64 = -0.5;


fn cubic(t: f64) -> f64 {
	let t = t.abs();
	if t <= 1.0 {
		((A + 2.0)*t - (A + 3.0))*t*t + 1.0
	} else if t < 2.0 {
		((A*t - 5.0*A)*t + 8.0*A)*t - 4.0*A
	} else {
		0.0
	}
}


/// For one output sample: the four source indices it reads, and their weights
#[derive(Debug, Clone, Copy)]
struct Taps {
	indices: [usize; 4],
	weights: [f64; 4]
}

/// Maps output pixel centers onto source pixel centers, so both grids cover the same extent.
/// Source indices past either end repeat the edge pixel.
fn taps(src_len: usize, dst_len: usize) -> Vec<Taps> {
	let scale = src_len as f64/dst_len as f64;
	let last = src_len as i64 - 1;
	(0 .. dst_len)
		.map(|i| {
			let s = (i as f64 + 0.5)*scale - 0.5;
			let base = s.floor();
			let frac = s - base;
			let base = base as i64;
			let mut indices = [0usize; 4];
			let mut weights = [0f64; 4];
			for k in 0 .. 4 {
				let offset = k as i64 - 1;
				indices[k] = (base + offset).clamp(0, last) as usize;
				weights[k] = cubic(frac - offset as f64);
			}
			Taps {
				indices,
				weights
			}
		})
		.collect()
}


/// Resizes a raster with separable cubic convolution interpolation.
/// Same-size resampling returns the input unchanged.
pub fn resample_cubic(src: &Raster, cols: usize, rows: usize) -> Raster {

	if (src.cols(), src.rows()) == (cols, rows) {
		return src.clone();
	}
	if src.is_empty() || cols == 0 || rows == 0 {
		return Raster::new(cols, rows);
	}

	// resample the rows first
	let x_taps = taps(src.cols(), cols);
	let mut horizontal = vec![0f64; cols*src.rows()];
	for y in 0 .. src.rows() {
		let row = src.row(y);
		for (x, taps) in x_taps.iter().enumerate() {
			horizontal[y*cols + x] = taps.indices.iter()
				.zip(taps.weights.iter())
				.map(|(i, w)| row[*i] as f64*w)
				.sum();
		}
	}

	// then the columns
	let y_taps = taps(src.rows(), rows);
	Raster::from_fn(cols, rows, |x, y| {
		let taps = &y_taps[y];
		taps.indices.iter()
			.zip(taps.weights.iter())
			.map(|(i, w)| horizontal[i*cols + x]*w)
			.sum::<f64>() as f32
	})
}
