
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use toml::{Table, Value};

use crate::error::InputError;


pub const KEY_MAX_RESOLUTION: &str = "CtfMaxResolution";
pub const KEY_FIGURE_OF_MERIT: &str = "CtfFigureOfMerit";
pub const KEY_DEFOCUS_U: &str = "DefocusU";
pub const KEY_DEFOCUS_V: &str = "DefocusV";
pub const KEY_DEFOCUS_ANGLE: &str = "DefocusAngle";

const KEYS: [&str; 5] = [
	KEY_MAX_RESOLUTION,
	KEY_FIGURE_OF_MERIT,
	KEY_DEFOCUS_U,
	KEY_DEFOCUS_V,
	KEY_DEFOCUS_ANGLE
];


/// CTF estimates for one micrograph, shared by every particle picked from it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CtfAnnotation {
	/// Angstroms
	pub max_resolution: f64,
	pub figure_of_merit: f64,
	/// Angstroms
	pub defocus_u: f64,
	/// Angstroms
	pub defocus_v: f64,
	/// degrees
	pub defocus_angle: f64
}

impl CtfAnnotation {

	/// Requires all five keys; extra keys are ignored
	pub fn from_map(map: &HashMap<String,f64>) -> Result<Self,InputError> {
		let get = |key: &'static str| {
			map.get(key)
				.copied()
				.ok_or(InputError::MissingCtf(key))
		};
		Ok(Self {
			max_resolution: get(KEY_MAX_RESOLUTION)?,
			figure_of_merit: get(KEY_FIGURE_OF_MERIT)?,
			defocus_u: get(KEY_DEFOCUS_U)?,
			defocus_v: get(KEY_DEFOCUS_V)?,
			defocus_angle: get(KEY_DEFOCUS_ANGLE)?
		})
	}

	/// Reads the same keys as [Self::from_map], from eg a `[ctf]` table. Integers are accepted as numbers.
	pub fn from_toml(table: &Table) -> Result<Self,InputError> {
		let map = table.iter()
			.filter(|(key, _)| KEYS.contains(&key.as_str()))
			.map(|(key, value)| {
				let value = match value {
					Value::Float(f) => *f,
					Value::Integer(i) => *i as f64,
					_ => return Err(InputError::Ctf {
						key: key.clone(),
						msg: format!("expected a number, not {}", value.type_str())
					})
				};
				Ok((key.clone(), value))
			})
			.collect::<Result<HashMap<_,_>,_>>()?;
		Self::from_map(&map)
	}

	/// Reads a TOML file with the values in a `[ctf]` table
	pub fn read_toml(path: impl AsRef<Path>) -> Result<Self,InputError> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|e| InputError::io(path, e))?;
		let toml = text.parse::<Table>()
			.map_err(|e| InputError::Ctf {
				key: "ctf".to_string(),
				msg: format!("Failed to parse {}: {}", path.to_string_lossy(), e)
			})?;
		let table = toml.get("ctf")
			.and_then(Value::as_table)
			.ok_or_else(|| InputError::Ctf {
				key: "ctf".to_string(),
				msg: format!("missing [ctf] table in {}", path.to_string_lossy())
			})?;
		Self::from_toml(table)
	}

	/// Reads the diagnostic text output of CTFFind.
	/// The last data line has the columns:
	/// micrograph number, defocus 1, defocus 2, astigmatism angle, phase shift, cross correlation, fit resolution
	pub fn read_ctffind(path: impl AsRef<Path>) -> Result<Self,InputError> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|e| InputError::io(path, e))?;
		Self::parse_ctffind(&text)
	}

	pub fn parse_ctffind(text: &str) -> Result<Self,InputError> {

		let line = text.lines()
			.map(str::trim)
			.filter(|line| !line.is_empty() && !line.starts_with('#'))
			.last()
			.ok_or_else(|| InputError::Ctf {
				key: "ctffind".to_string(),
				msg: "no data lines".to_string()
			})?;

		let values = line.split_whitespace()
			.map(|v| v.parse::<f64>()
				.map_err(|e| InputError::Ctf {
					key: "ctffind".to_string(),
					msg: format!("value {:?}: {}", v, e)
				})
			)
			.collect::<Result<Vec<_>,_>>()?;
		if values.len() < 7 {
			return Err(InputError::Ctf {
				key: "ctffind".to_string(),
				msg: format!("expected 7 columns, found {}", values.len())
			});
		}

		Ok(Self {
			defocus_u: values[1],
			defocus_v: values[2],
			defocus_angle: values[3],
			figure_of_merit: values[5],
			max_resolution: values[6]
		})
	}
}
