
mod util;


use std::fs;

use galvanic_assert::{assert_that, matchers::*};

use particle_extract::config::ExtractionConfig;
use particle_extract::job::{self, CtfSource, ExtractJob};
use particle_extract::logging;
use particle_extract::scale::PixelSize;

use crate::util::job_dir::JobDir;


fn extract_job(job_dir: &JobDir) -> ExtractJob {
	ExtractJob {
		micrograph: job_dir.path(JobDir::MICROGRAPH),
		coordinates: job_dir.path(JobDir::COORDS),
		ctf: CtfSource::Values(util::ctf()),
		stack: job_dir.path(JobDir::STACK),
		table: job_dir.path(JobDir::TABLE),
		config: ExtractionConfig::new(32),
		preview_dir: None
	}
}


fn ready_job_dir() -> JobDir {
	let job_dir = JobDir::new();
	job_dir.write_micrograph(&util::noise(200, 160, 5), PixelSize(1.5));
	job_dir.write_coords(&[(100.0, 80.0), (20.0, 150.0)]);
	job_dir
}


#[test]
fn run() {
	let _logging = logging::init_test();

	let job_dir = ready_job_dir();
	let summary = job::run(&extract_job(&job_dir)).unwrap();

	assert_that!(&summary.num_particles, eq(2));
	assert_that!(&summary.box_size, eq(32));
	assert_that!(&summary.pixel_size, eq(PixelSize(1.5)));
	assert_that!(&job_dir.exists(JobDir::STACK), eq(true));
	assert_that!(&job_dir.exists(JobDir::TABLE), eq(true));
}


#[test]
fn failed_write_is_retryable() {
	let _logging = logging::init_test();

	let job_dir = ready_job_dir();

	// a folder in place of the stack's temporary file blocks the write
	let stack = job_dir.path(JobDir::STACK);
	let partial = stack.with_file_name(format!(".{}.partial", stack.file_name().unwrap().to_string_lossy()));
	fs::create_dir_all(&partial).unwrap();

	let err = job::run(&extract_job(&job_dir)).unwrap_err();
	println!("{:?}", err);

	assert_that!(&job::is_retryable(&err), eq(true));
	assert_that!(&job_dir.exists(JobDir::STACK), eq(false));
	assert_that!(&job_dir.exists(JobDir::TABLE), eq(false));
}


#[test]
fn bad_inputs_are_not_retryable() {
	let _logging = logging::init_test();

	// missing micrograph file
	let job_dir = JobDir::new();
	job_dir.write_coords(&[(100.0, 80.0)]);
	let err = job::run(&extract_job(&job_dir)).unwrap_err();
	assert_that!(&job::is_retryable(&err), eq(false));

	// particle outside the micrograph
	let job_dir = ready_job_dir();
	job_dir.write_coords(&[(100.0, 80.0), (5000.0, 80.0)]);
	let err = job::run(&extract_job(&job_dir)).unwrap_err();
	assert_that!(&job::is_retryable(&err), eq(false));

	// settings that can never work
	let job_dir = ready_job_dir();
	let mut extract = extract_job(&job_dir);
	extract.config.box_size = 0;
	let err = job::run(&extract).unwrap_err();
	assert_that!(&job::is_retryable(&err), eq(false));
}


#[test]
fn failed_preview_keeps_outputs() {
	let _logging = logging::init_test();

	let job_dir = ready_job_dir();
	// a file where the preview folder should go
	job_dir.write("Previews", "not a folder");

	let mut extract = extract_job(&job_dir);
	extract.preview_dir = Some(job_dir.path("Previews"));
	let summary = job::run(&extract).unwrap();
	job_dir.print();

	assert_that!(&summary.num_particles, eq(2));
	assert_that!(&job_dir.exists(JobDir::STACK), eq(true));
	assert_that!(&job_dir.exists(JobDir::TABLE), eq(true));
	let previews = job_dir.read("Previews");
	assert_that!(&previews.as_str(), eq("not a folder"));
}
