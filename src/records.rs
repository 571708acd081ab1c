
use crate::ctf::CtfAnnotation;
use crate::scale::PixelSize;
use crate::star::{DataBlock, StarFile};


pub const OPTICS_GROUP: u32 = 1;
pub const CTF_BFACTOR: f64 = 0.0;
pub const CTF_SCALEFACTOR: f64 = 1.0;
pub const PHASE_SHIFT: f64 = 0.0;


/// The particles table columns, in order
pub const PARTICLE_COLUMNS: [&str; 13] = [
	"rlnCoordinateX",
	"rlnCoordinateY",
	"rlnImageName",
	"rlnMicrographName",
	"rlnOpticsGroup",
	"rlnCtfMaxResolution",
	"rlnCtfFigureOfMerit",
	"rlnDefocusU",
	"rlnDefocusV",
	"rlnDefocusAngle",
	"rlnCtfBfactor",
	"rlnCtfScalefactor",
	"rlnPhaseShift"
];

pub const OPTICS_COLUMNS: [&str; 5] = [
	"rlnOpticsGroupName",
	"rlnOpticsGroup",
	"rlnImagePixelSize",
	"rlnImageSize",
	"rlnImageDimensionality"
];


/// One extracted particle, as described in the particles table
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
	/// the picked coordinate, before rounding
	pub x: f64,
	pub y: f64,
	/// 1-based frame number in the stack
	pub frame: usize,
	pub stack_name: String,
	pub micrograph_name: String,
	pub ctf: CtfAnnotation
}

impl OutputRecord {

	/// eg `000012@Extract/job007/Movies/mic_1.mrcs`
	pub fn image_name(&self) -> String {
		format!("{:06}@{}", self.frame, self.stack_name)
	}

	fn to_row(&self) -> Vec<String> {
		vec![
			self.x.to_string(),
			self.y.to_string(),
			self.image_name(),
			self.micrograph_name.clone(),
			OPTICS_GROUP.to_string(),
			self.ctf.max_resolution.to_string(),
			self.ctf.figure_of_merit.to_string(),
			self.ctf.defocus_u.to_string(),
			self.ctf.defocus_v.to_string(),
			self.ctf.defocus_angle.to_string(),
			format!("{:.1}", CTF_BFACTOR),
			format!("{:.1}", CTF_SCALEFACTOR),
			format!("{:.1}", PHASE_SHIFT)
		]
	}
}


/// What the optics table says about the frames in the stack
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optics {
	pub pixel_size: PixelSize,
	pub image_size: u32
}


/// The `data_optics` and `data_particles` blocks describing one stack
pub fn to_star(records: &[OutputRecord], optics: Optics) -> StarFile {

	let mut optics_block = DataBlock::new("optics", OPTICS_COLUMNS);
	optics_block.push(vec![
		format!("opticsGroup{}", OPTICS_GROUP),
		OPTICS_GROUP.to_string(),
		optics.pixel_size.0.to_string(),
		optics.image_size.to_string(),
		"2".to_string()
	]);

	let mut particles_block = DataBlock::new("particles", PARTICLE_COLUMNS);
	for record in records {
		particles_block.push(record.to_row());
	}

	StarFile {
		blocks: vec![optics_block, particles_block]
	}
}
