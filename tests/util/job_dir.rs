
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use assert_fs::TempDir;

use particle_extract::mrc;
use particle_extract::raster::Raster;
use particle_extract::scale::PixelSize;


/// A temporary job folder, laid out like a RELION extraction job
pub struct JobDir {
	dir: TempDir
}

impl JobDir {

	pub const MICROGRAPH: &'static str = "MotionCorr/job002/Movies/mic_1.mrc";
	pub const COORDS: &'static str = "AutoPick/job004/Movies/mic_1_autopick.star";
	pub const CTFFIND: &'static str = "CtfFind/job003/Movies/mic_1_PS.txt";
	pub const STACK: &'static str = "Extract/job005/Movies/mic_1.mrcs";
	pub const TABLE: &'static str = "Extract/job005/Movies/mic_1_extract.star";

	pub fn new() -> JobDir {
		Self {
			dir: TempDir::new()
				.expect("Failed to make temp folder")
		}
	}

	pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
		self.dir.path().join(path.as_ref())
	}

	pub fn write(&self, path: impl AsRef<Path>, txt: impl AsRef<str>) {
		let path = self.path(path);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.expect(&format!("Failed to make folder: {}", parent.to_string_lossy()));
		}
		fs::write(&path, txt.as_ref())
			.expect(&format!("Failed to write file: {}", path.to_string_lossy()));
	}

	pub fn read(&self, path: impl AsRef<Path>) -> String {
		let path = self.path(path);
		fs::read_to_string(&path)
			.expect(&format!("Failed to read file: {}", path.to_string_lossy()))
	}

	pub fn exists(&self, path: impl AsRef<Path>) -> bool {
		self.path(path).exists()
	}

	pub fn write_micrograph(&self, raster: &Raster, pixel_size: PixelSize) {
		let path = self.path(Self::MICROGRAPH);
		fs::create_dir_all(path.parent().unwrap())
			.unwrap();
		let mut file = File::create(&path)
			.expect(&format!("Failed to create file: {}", path.to_string_lossy()));
		mrc::write_stack(&mut file, &[raster.clone()], pixel_size)
			.expect("Failed to write micrograph");
	}

	pub fn write_coords(&self, points: &[(f64,f64)]) {
		let mut star = String::from("\n# version 30001\n\ndata_\n\nloop_\n_rlnCoordinateX #1\n_rlnCoordinateY #2\n_rlnAutopickFigureOfMerit #3\n");
		for (x, y) in points {
			star.push_str(&format!("{:.6} {:.6} 0.9\n", x, y));
		}
		self.write(Self::COORDS, star);
	}

	pub fn write_ctffind(&self) {
		self.write(Self::CTFFIND, concat!(
			"# Output from CTFFind version 4.1.14\n",
			"# Columns: #1 - micrograph number; #2 - defocus 1 [Angstroms]; #3 - defocus 2; #4 - azimuth of astigmatism; #5 - additional phase shift [radians]; #6 - cross correlation; #7 - spacing (in Angstroms) up to which CTF rings were fit successfully\n",
			"1.000000 10405.478516 10123.083008 -59.162594 0.000000 0.130478 3.612083\n"
		));
	}

	/// Names of all the files under the folder, relative to it
	pub fn files(&self) -> Vec<String> {
		let mut files = Vec::new();
		let mut dirs = vec![self.dir.path().to_path_buf()];
		while let Some(dir) = dirs.pop() {
			for entry in fs::read_dir(&dir).unwrap() {
				let path = entry.unwrap().path();
				if path.is_dir() {
					dirs.push(path);
				} else {
					let rel = path.strip_prefix(self.dir.path()).unwrap();
					files.push(rel.to_string_lossy().to_string());
				}
			}
		}
		files.sort();
		files
	}

	pub fn print(&self) {
		println!("Job Folder: {}", self.dir.path().to_string_lossy());
		for file in self.files() {
			println!("\t{}", file);
		}
	}
}

impl AsRef<Path> for JobDir {
	fn as_ref(&self) -> &Path {
		self.dir.path()
	}
}
