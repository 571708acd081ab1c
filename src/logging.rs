
use std::fs::{self, OpenOptions};
use std::ops::Deref;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use display_error_chain::ErrorChainExt;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::UtcOffset;
use tracing::{error, warn};
use tracing::dispatcher::DefaultGuard;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use tracing_subscriber::fmt::format::{Format, Full};
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};


/// Installs the global log subscriber, eg `init("particle_extract=debug", None)`.
/// Events always go to stderr. With a log file, they're appended there too,
/// like the run log kept in a job folder.
pub fn init(filter: impl AsRef<str>, log_file: Option<&Path>) -> Result<()> {

	let (writer, ansi) = match log_file {
		None => (BoxMakeWriter::new(std::io::stderr), true),
		Some(path) => {
			if let Some(parent) = path.parent() {
				if !parent.as_os_str().is_empty() {
					fs::create_dir_all(parent)
						.context(format!("Failed to create log folder: {}", parent.to_string_lossy()))?;
				}
			}
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(path)
				.context(format!("Failed to open log file: {}", path.to_string_lossy()))?;
			// no color codes in the file
			(BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file))), false)
		}
	};

	let log_subscriber = FmtSubscriber::builder()
		.with_env_filter(log_filter(filter)?)
		.event_format(log_format())
		.with_ansi(ansi)
		.with_writer(writer)
		.finish();

	tracing::subscriber::set_global_default(log_subscriber)
		.context("Failed to set logging subscriber")?;

	Ok(())
}


/// Logs everything from this crate to the test harness output, until the guard is dropped
pub fn init_test() -> DefaultGuard {

	let subscriber = FmtSubscriber::builder()
		.with_env_filter(EnvFilter::new("particle_extract=trace"))
		.event_format(log_format())
		.with_test_writer()
		.finish();

	tracing::subscriber::set_default(subscriber)
}


fn log_filter(filter: impl AsRef<str>) -> Result<EnvFilter> {
	let filter = filter.as_ref();
	EnvFilter::builder()
		.parse(filter)
		.context(format!("Failed to parse log filter: {}", filter))
}


fn log_format() -> Format<Full,OffsetTime<&'static [FormatItem<'static>]>> {

	let time_format = format_description!(
		version = 2,
		"[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:4] [offset_hour sign:mandatory]:[offset_minute]"
	);

	// reading the local offset can fail in multi-threaded processes, UTC is fine then
	let time_offset = UtcOffset::current_local_offset()
		.unwrap_or(UtcOffset::UTC);

	Format::default()
		.with_timer(OffsetTime::new(time_offset, time_format))
		.with_target(false)
}


/// Logs the whole error chain, then drops the error
pub trait ResultExt<T> {
	fn log_err(self) -> Result<T,()>;
	fn warn_err(self) -> Result<T,()>;
}

impl<T> ResultExt<T> for Result<T,anyhow::Error> {

	fn log_err(self) -> Result<T,()> {
		self.map_err(|e| error!("{}", e.deref().chain()))
	}

	fn warn_err(self) -> Result<T,()> {
		self.map_err(|e| warn!("{}", e.deref().chain()))
	}
}
