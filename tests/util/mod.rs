
#![allow(unused)]

pub mod cmd;
pub mod job_dir;


use particle_extract::ctf::CtfAnnotation;
use particle_extract::raster::Raster;


pub fn ctf() -> CtfAnnotation {
	CtfAnnotation {
		max_resolution: 3.612083,
		figure_of_merit: 0.130478,
		defocus_u: 10405.478516,
		defocus_v: 10123.083008,
		defocus_angle: -59.162594
	}
}


/// uniform noise in [0, 1), the same every time for a given seed
pub fn noise(cols: usize, rows: usize, seed: u64) -> Raster {
	let mut rng = fastrand::Rng::with_seed(seed);
	let pixels = (0 .. cols*rows)
		.map(|_| rng.f32())
		.collect();
	Raster::from_pixels(cols, rows, pixels)
		.expect("pixel count should match")
}
