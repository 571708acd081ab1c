
use assert_cmd::assert::Assert;
use assert_cmd::Command;

use crate::util::job_dir::JobDir;


const BIN_NAME: &'static str = "particle-extract";


pub fn cmd() -> Command {
	Command::cargo_bin(BIN_NAME)
		.unwrap()
}


/// An extract command reading and writing the usual files of the job folder
pub fn cmd_extract(job_dir: &JobDir) -> Command {
	cmd_extract_with(job_dir, &["--log=particle_extract=debug"])
}


/// Like [cmd_extract], with the given global options ahead of the subcommand
pub fn cmd_extract_with(job_dir: &JobDir, global_args: &[&str]) -> Command {
	let mut cmd = cmd();
	cmd.current_dir(job_dir)
		.args(global_args)
		.arg("extract")
		.arg("--micrograph").arg(JobDir::MICROGRAPH)
		.arg("--coords").arg(JobDir::COORDS)
		.arg("--ctffind").arg(JobDir::CTFFIND)
		.arg("--stack").arg(JobDir::STACK)
		.arg("--table").arg(JobDir::TABLE);
	cmd
}


fn print_stream(name: &str, bytes: &[u8]) {
	if bytes.is_empty() {
		println!("{}: (empty)", name);
	} else {
		println!("{}:\n{}", name, String::from_utf8_lossy(bytes));
	}
}


/// Shows the process output in the test log, since cargo only prints it for failed tests
pub trait AssertExt {
	fn print_stdout(self) -> Self;
	fn print_stderr(self) -> Self;
}

impl AssertExt for Assert {

	fn print_stdout(self) -> Self {
		print_stream("STDOUT", &self.get_output().stdout);
		self
	}

	fn print_stderr(self) -> Self {
		print_stream("STDERR", &self.get_output().stderr);
		self
	}
}
