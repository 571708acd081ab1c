
use crate::error::ParticleError;
use crate::raster::Raster;


/// Rounds to the nearest integer, with ties going to the even neighbor: 2.5 -> 2, 3.5 -> 4.
/// Matches numpy's rounding.
pub fn round_half_even(v: f64) -> i64 {
	v.round_ties_even() as i64
}


/// The square box cut around one particle, and how much of it falls outside the micrograph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	/// micrograph column of the box's left edge, can be negative
	pub x0: i64,
	/// micrograph row of the box's top edge, can be negative
	pub y0: i64,
	pub size: usize,
	pub pad_left: usize,
	pub pad_right: usize,
	pub pad_top: usize,
	pub pad_bottom: usize
}

impl Window {

	/// The box of side `size` around the pixel (px, py).
	/// The box starts `size/2` pixels before the center, so even boxes span [p - size/2, p + size/2)
	/// and odd boxes are centered exactly.
	pub fn around(px: i64, py: i64, size: usize, cols: usize, rows: usize) -> Self {

		let half = (size/2) as i64;
		let x0 = px - half;
		let y0 = py - half;

		let pad_before = |start: i64| (-start).clamp(0, size as i64) as usize;
		let pad_after = |start: i64, len: usize| (start + size as i64 - len as i64).clamp(0, size as i64) as usize;

		Self {
			x0,
			y0,
			size,
			pad_left: pad_before(x0),
			pad_right: pad_after(x0, cols),
			pad_top: pad_before(y0),
			pad_bottom: pad_after(y0, rows)
		}
	}

	pub fn is_clipped(&self) -> bool {
		self.pad_left > 0 || self.pad_right > 0 || self.pad_top > 0 || self.pad_bottom > 0
	}

	/// the width and height of the part inside the micrograph
	pub fn inside(&self) -> (usize, usize) {
		(
			self.size.saturating_sub(self.pad_left + self.pad_right),
			self.size.saturating_sub(self.pad_top + self.pad_bottom)
		)
	}
}


/// Copies the part of the window that lies inside the micrograph
pub fn crop(micrograph: &Raster, window: &Window) -> Raster {
	let (cols, rows) = window.inside();
	let x0 = (window.x0 + window.pad_left as i64) as usize;
	let y0 = (window.y0 + window.pad_top as i64) as usize;
	Raster::from_fn(cols, rows, |x, y| micrograph.get(x0 + x, y0 + y))
}


/// Grows the crop back to the full window by repeating its nearest edge pixel
pub fn pad_edge(crop: &Raster, window: &Window) -> Raster {
	let last_x = crop.cols() as i64 - 1;
	let last_y = crop.rows() as i64 - 1;
	Raster::from_fn(window.size, window.size, |x, y| {
		let cx = (x as i64 - window.pad_left as i64).clamp(0, last_x) as usize;
		let cy = (y as i64 - window.pad_top as i64).clamp(0, last_y) as usize;
		crop.get(cx, cy)
	})
}


/// Cuts the box around (x, y) out of the micrograph, padding by edge replication
/// wherever the box extends past the micrograph
pub fn crop_padded(micrograph: &Raster, x: f64, y: f64, size: usize) -> Result<(Raster,Window),ParticleError> {

	if !x.is_finite() || !y.is_finite() {
		return Err(ParticleError::NonFinite {
			x,
			y
		});
	}

	let px = round_half_even(x);
	let py = round_half_even(y);
	let window = Window::around(px, py, size, micrograph.cols(), micrograph.rows());

	let (cols, rows) = window.inside();
	if cols == 0 || rows == 0 {
		return Err(ParticleError::OutOfBounds {
			px,
			py,
			cols: micrograph.cols(),
			rows: micrograph.rows()
		});
	}

	let cropped = crop(micrograph, &window);
	let frame = if window.is_clipped() {
		pad_edge(&cropped, &window)
	} else {
		cropped
	};

	Ok((frame, window))
}


#[cfg(test)]
mod test {

	use galvanic_assert::{assert_that, matchers::*};

	use super::*;


	fn ramp(cols: usize, rows: usize) -> Raster {
		Raster::from_fn(cols, rows, |x, y| (y*1000 + x) as f32)
	}

	#[test]
	fn rounding() {
		assert_that!(&round_half_even(2.5), eq(2));
		assert_that!(&round_half_even(3.5), eq(4));
		assert_that!(&round_half_even(-0.5), eq(0));
		assert_that!(&round_half_even(-1.5), eq(-2));
		assert_that!(&round_half_even(2.4999), eq(2));
		assert_that!(&round_half_even(2.5001), eq(3));
	}

	#[test]
	fn window_inside() {
		let window = Window::around(50, 50, 20, 100, 100);
		assert_that!(&window, eq(Window {
			x0: 40,
			y0: 40,
			size: 20,
			pad_left: 0,
			pad_right: 0,
			pad_top: 0,
			pad_bottom: 0
		}));
		assert_that!(&window.is_clipped(), eq(false));
	}

	#[test]
	fn window_odd() {
		let window = Window::around(50, 50, 21, 100, 100);
		assert_that!(&window.x0, eq(40));
		assert_that!(&(window.x0 + window.size as i64 - 1), eq(60));
	}

	#[test]
	fn window_clipped() {
		let window = Window::around(5, 95, 20, 100, 100);
		assert_that!(&window.pad_left, eq(5));
		assert_that!(&window.pad_right, eq(0));
		assert_that!(&window.pad_top, eq(0));
		assert_that!(&window.pad_bottom, eq(5));
		assert_that!(&window.inside(), eq((15, 15)));
	}

	#[test]
	fn window_outside() {
		let window = Window::around(-30, 50, 20, 100, 100);
		assert_that!(&window.pad_left, eq(20));
		assert_that!(&window.inside(), eq((0, 20)));
	}

	#[test]
	fn interior_is_plain_crop() {
		let micrograph = ramp(100, 80);
		let (frame, window) = crop_padded(&micrograph, 50.2, 40.0, 16).unwrap();
		assert_that!(&window.is_clipped(), eq(false));
		for y in 0 .. 16 {
			for x in 0 .. 16 {
				assert_that!(&frame.get(x, y), eq(micrograph.get(42 + x, 32 + y)));
			}
		}
	}

	#[test]
	fn corner_replicates_edges() {
		let micrograph = ramp(100, 80);
		let (frame, window) = crop_padded(&micrograph, 0.0, 0.0, 8).unwrap();
		assert_that!(&window.pad_left, eq(4));
		assert_that!(&window.pad_top, eq(4));
		for y in 0usize .. 8 {
			for x in 0usize .. 8 {
				let mx = x.saturating_sub(4);
				let my = y.saturating_sub(4);
				assert_that!(&frame.get(x, y), eq(micrograph.get(mx, my)));
			}
		}
		// nothing is zero-filled
		assert_that!(&frame.get(0, 0), eq(micrograph.get(0, 0)));
		assert_that!(&frame.get(7, 0), eq(micrograph.get(3, 0)));
	}

	#[test]
	fn far_edge_replicates() {
		let micrograph = ramp(10, 10);
		let (frame, _) = crop_padded(&micrograph, 9.0, 9.0, 6).unwrap();
		// the box spans 6..12, so columns and rows 10 and 11 repeat 9
		assert_that!(&frame.get(5, 5), eq(micrograph.get(9, 9)));
		assert_that!(&frame.get(4, 0), eq(micrograph.get(9, 6)));
		assert_that!(&frame.get(0, 4), eq(micrograph.get(6, 9)));
	}

	#[test]
	fn micrograph_smaller_than_box() {
		let micrograph = ramp(3, 3);
		let (frame, _) = crop_padded(&micrograph, 1.0, 1.0, 8).unwrap();
		assert_that!(&(frame.cols(), frame.rows()), eq((8, 8)));
		assert_that!(&frame.get(0, 0), eq(micrograph.get(0, 0)));
		assert_that!(&frame.get(7, 7), eq(micrograph.get(2, 2)));
	}

	#[test]
	fn outside_is_an_error() {
		let micrograph = ramp(100, 100);
		let err = crop_padded(&micrograph, 250.0, 50.0, 20).unwrap_err();
		assert_that!(&err, eq(ParticleError::OutOfBounds {
			px: 250,
			py: 50,
			cols: 100,
			rows: 100
		}));
	}

	#[test]
	fn nan_is_an_error() {
		let micrograph = ramp(100, 100);
		let err = crop_padded(&micrograph, f64::NAN, 50.0, 20).unwrap_err();
		assert_that!(&matches!(err, ParticleError::NonFinite { .. }), eq(true));
	}
}
