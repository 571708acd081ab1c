
use std::fmt;


/// A physical distance, in Angstroms
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ValueA(pub f64);

impl fmt::Display for ValueA {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} A", self.0)
	}
}


/// A distance in pixels of some raster
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ValuePx(pub f64);

impl ValuePx {

	pub fn to_a(self, pixel_size: PixelSize) -> ValueA {
		ValueA(self.0*pixel_size.0)
	}
}


/// Angstroms per pixel
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PixelSize(pub f64);

impl PixelSize {

	/// Micrographs with no calibration in their header get this value
	pub const UNKNOWN: PixelSize = PixelSize(1.0);

	pub fn is_valid(self) -> bool {
		self.0.is_finite() && self.0 > 0.0
	}

	/// The pixel size after resampling a box of `box_size` pixels to `new_box_size` pixels.
	/// The physical extent of the box doesn't change, so the pixels get bigger.
	pub fn resampled(self, box_size: u32, new_box_size: u32) -> PixelSize {
		PixelSize(self.0*(box_size as f64)/(new_box_size as f64))
	}
}

impl fmt::Display for PixelSize {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} A/px", self.0)
	}
}
