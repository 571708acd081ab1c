
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::OutputError;
use crate::extract::Extraction;
use crate::mrc;
use crate::records;


/// A sibling of the target in the same folder, so the final rename stays on one filesystem
fn partial_path(path: &Path) -> PathBuf {
	let name = path.file_name()
		.map(|n| n.to_string_lossy().to_string())
		.unwrap_or_default();
	path.with_file_name(format!(".{}.partial", name))
}


fn write_file(path: &Path, f: impl FnOnce(&mut BufWriter<File>) -> std::io::Result<()>) -> Result<(),OutputError> {

	let to_err = |source| OutputError::Write {
		path: path.to_path_buf(),
		source
	};

	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)
				.map_err(to_err)?;
		}
	}

	let file = File::create(path)
		.map_err(to_err)?;
	let mut writer = BufWriter::new(file);
	f(&mut writer)
		.map_err(to_err)?;

	// write buffers should be flushed before dropping
	writer.flush()
		.map_err(to_err)?;
	writer.get_ref().sync_all()
		.map_err(to_err)?;

	Ok(())
}


fn remove_quietly(path: &Path) {
	if let Err(e) = fs::remove_file(path) {
		if e.kind() != std::io::ErrorKind::NotFound {
			warn!("Failed to clean up {}: {}", path.to_string_lossy(), e);
		}
	}
}


fn rename(from: &Path, to: &Path) -> Result<(),OutputError> {
	fs::rename(from, to)
		.map_err(|source| OutputError::Rename {
			from: from.to_path_buf(),
			to: to.to_path_buf(),
			source
		})
}


/// Writes the particle stack and its table.
/// Both are written to temporary files first and only moved into place once both succeeded,
/// so a failure leaves neither output behind.
pub fn write_all(extraction: &Extraction, stack_path: impl AsRef<Path>, table_path: impl AsRef<Path>) -> Result<(),OutputError> {

	let stack_path = stack_path.as_ref();
	let table_path = table_path.as_ref();
	let stack_partial = partial_path(stack_path);
	let table_partial = partial_path(table_path);

	let cleanup = || {
		remove_quietly(&stack_partial);
		remove_quietly(&table_partial);
	};

	let result = write_file(&stack_partial, |out| mrc::write_stack(out, &extraction.frames, extraction.pixel_size))
		.and_then(|()| {
			let star = records::to_star(&extraction.records, extraction.optics());
			write_file(&table_partial, |out| write!(out, "{}", star))
		})
		.and_then(|()| rename(&stack_partial, stack_path));
	if let Err(e) = result {
		cleanup();
		return Err(e);
	}

	// the stack is in place now, so take it back out if the table can't follow
	if let Err(e) = rename(&table_partial, table_path) {
		cleanup();
		remove_quietly(stack_path);
		return Err(e);
	}

	info!("Wrote {} particles to {}", extraction.len(), stack_path.to_string_lossy());
	info!("Wrote particles table to {}", table_path.to_string_lossy());

	Ok(())
}
