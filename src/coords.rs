
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::InputError;
use crate::star::StarFile;


pub const COLUMN_X: &str = "rlnCoordinateX";
pub const COLUMN_Y: &str = "rlnCoordinateY";


/// Particle centers, in micrograph pixels, as index-aligned x and y lists.
/// x is the micrograph column, y is the row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coordinates {
	xs: Vec<f64>,
	ys: Vec<f64>
}

impl Coordinates {

	pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self,InputError> {
		if xs.len() != ys.len() {
			return Err(InputError::CoordinateLengths {
				xs: xs.len(),
				ys: ys.len()
			});
		}
		Ok(Self {
			xs,
			ys
		})
	}

	pub fn from_points(points: impl IntoIterator<Item=(f64,f64)>) -> Self {
		let (xs, ys) = points.into_iter().unzip();
		Self {
			xs,
			ys
		}
	}

	pub fn len(&self) -> usize {
		self.xs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.xs.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item=(f64,f64)> + '_ {
		self.xs.iter().copied()
			.zip(self.ys.iter().copied())
	}

	/// Reads a STAR file with `_rlnCoordinateX` and `_rlnCoordinateY` columns,
	/// an EMAN `.box` file, or a plain text file whose first two columns are x and y
	pub fn read(path: impl AsRef<Path>) -> Result<Self,InputError> {

		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|e| InputError::io(path, e))?;

		let has_ext = |e: &str| path.extension().is_some_and(|ext| ext == e);
		let coords = if has_ext("star") || text.lines().any(|line| line.trim() == "loop_") {
			Self::parse_star(&text)?
		} else if has_ext("box") {
			Self::parse_box(&text)?
		} else {
			Self::parse_columns(&text)?
		};

		debug!("Read {} coordinates from {}", coords.len(), path.to_string_lossy());
		Ok(coords)
	}

	pub fn parse_star(text: &str) -> Result<Self,InputError> {

		let star = StarFile::parse(text)?;

		// a file with no particles may not have a table at all
		let Some(block) = star.block_with_column(COLUMN_X)
			else {
				if star.blocks.iter().all(|b| b.rows.is_empty()) {
					return Ok(Self::default());
				}
				return Err(InputError::Coordinates {
					line: 0,
					msg: format!("no _{} column", COLUMN_X)
				});
			};

		let parse_column = |name: &str| -> Result<Vec<f64>,InputError> {
			let values = block.values(name)
				.ok_or_else(|| InputError::Coordinates {
					line: 0,
					msg: format!("no _{} column", name)
				})?;
			values.enumerate()
				.map(|(rowi, v)| parse_value(v, rowi + 1, name))
				.collect()
		};

		Self::new(parse_column(COLUMN_X)?, parse_column(COLUMN_Y)?)
	}

	/// Whitespace-separated particle centers, x then y, with any further columns ignored.
	/// `#` starts a comment.
	pub fn parse_columns(text: &str) -> Result<Self,InputError> {
		let rows = parse_rows(text, &["x", "y"])?;
		Ok(Self::from_points(rows.into_iter()
			.map(|row| (row[0], row[1]))))
	}

	/// EMAN box files, as written by crYOLO and e2boxer:
	/// the lower left corner of each box, then its width and height
	pub fn parse_box(text: &str) -> Result<Self,InputError> {
		let rows = parse_rows(text, &["x", "y", "width", "height"])?;
		Ok(Self::from_points(rows.into_iter()
			.map(|row| (row[0] + row[2]/2.0, row[1] + row[3]/2.0))))
	}
}


/// The leading named columns of every non-blank line
fn parse_rows(text: &str, names: &[&str]) -> Result<Vec<Vec<f64>>,InputError> {

	let mut rows = Vec::new();

	for (linei, line) in text.lines().enumerate() {
		let lineno = linei + 1;
		let line = line.split('#')
			.next()
			.unwrap_or("")
			.trim();
		if line.is_empty() {
			continue;
		}

		let parts = line.split_whitespace().collect::<Vec<_>>();
		if parts.len() < names.len() {
			return Err(InputError::Coordinates {
				line: lineno,
				msg: format!("expected at least {} columns ({}), found {}", names.len(), names.join(" "), parts.len())
			});
		}
		let row = names.iter()
			.zip(parts)
			.map(|(name, v)| parse_value(v, lineno, name))
			.collect::<Result<Vec<_>,_>>()?;
		rows.push(row);
	}

	Ok(rows)
}


fn parse_value(v: &str, line: usize, name: &str) -> Result<f64,InputError> {
	v.parse::<f64>()
		.map_err(|e| InputError::Coordinates {
			line,
			msg: format!("{} value {:?}: {}", name, v, e)
		})
}
