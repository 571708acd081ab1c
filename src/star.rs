
// STAR file (Self-defining Text Archiving and Retrieval), as written by RELION
// https://relion.readthedocs.io/en/latest/Reference/Conventions.html

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::InputError;


/// One `data_` block, holding a single table.
/// Column names are stored without their leading underscore, eg `rlnCoordinateX`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataBlock {
	pub name: String,
	pub columns: Vec<String>,
	pub rows: Vec<Vec<String>>
}

impl DataBlock {

	pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item=impl Into<String>>) -> Self {
		Self {
			name: name.into(),
			columns: columns.into_iter()
				.map(|c| c.into())
				.collect(),
			rows: Vec::new()
		}
	}

	pub fn column(&self, name: impl AsRef<str>) -> Option<usize> {
		let name = name.as_ref();
		let name = name.strip_prefix('_').unwrap_or(name);
		self.columns.iter()
			.position(|c| c == name)
	}

	/// all the values of one column, in row order
	pub fn values(&self, name: impl AsRef<str>) -> Option<impl Iterator<Item=&str>> {
		let i = self.column(name)?;
		Some(self.rows.iter()
			.map(move |row| row[i].as_str()))
	}

	pub fn push(&mut self, row: Vec<String>) {
		debug_assert_eq!(row.len(), self.columns.len());
		self.rows.push(row);
	}

	fn write(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {

		writeln!(f, "\n# version 30001\n")?;
		writeln!(f, "data_{}\n", self.name)?;
		writeln!(f, "loop_")?;
		for (i, column) in self.columns.iter().enumerate() {
			writeln!(f, "_{} #{}", column, i + 1)?;
		}

		for row in &self.rows {
			let line = row.iter()
				.map(|v| quote(v))
				.collect::<Vec<_>>()
				.join(" ");
			writeln!(f, "{}", line)?;
		}
		writeln!(f)
	}
}


fn quote(v: &str) -> String {
	if v.is_empty() {
		"\"\"".to_string()
	} else if v.contains(char::is_whitespace) {
		format!("\"{}\"", v)
	} else {
		v.to_string()
	}
}


#[derive(Debug, Clone, PartialEq, Default)]
pub struct StarFile {
	pub blocks: Vec<DataBlock>
}

impl StarFile {

	pub fn block(&self, name: impl AsRef<str>) -> Option<&DataBlock> {
		let name = name.as_ref();
		self.blocks.iter()
			.find(|b| b.name == name)
	}

	/// The first block with the named column, since coordinate files use varying block names
	pub fn block_with_column(&self, column: impl AsRef<str>) -> Option<&DataBlock> {
		let column = column.as_ref();
		self.blocks.iter()
			.find(|b| b.column(column).is_some())
	}

	pub fn read(path: impl AsRef<Path>) -> Result<Self,InputError> {
		let path = path.as_ref();
		let text = fs::read_to_string(path)
			.map_err(|e| InputError::io(path, e))?;
		Self::parse(&text)
	}

	pub fn parse(text: &str) -> Result<Self,InputError> {

		let mut blocks = Vec::<DataBlock>::new();

		// loop_ tables collect column names first, then rows.
		// outside of a loop, `_name value` pairs make a one-row table
		#[derive(PartialEq)]
		enum State {
			Outside,
			Columns,
			Rows
		}
		let mut state = State::Outside;

		for (linei, line) in text.lines().enumerate() {
			let lineno = linei + 1;
			let line = strip_comment(line).trim();
			if line.is_empty() {
				continue;
			}

			if let Some(name) = line.strip_prefix("data_") {
				blocks.push(DataBlock::new(name.trim(), Vec::<String>::new()));
				state = State::Outside;
				continue;
			}

			let err = |msg: &str| InputError::Star {
				line: lineno,
				msg: msg.to_string()
			};
			let Some(block) = blocks.last_mut()
				else { return Err(err("content before any data_ block")); };

			if line == "loop_" {
				if !block.columns.is_empty() {
					return Err(err("only one table per data block is supported"));
				}
				state = State::Columns;
				continue;
			}

			if let Some(column) = line.strip_prefix('_') {
				let mut parts = column.split_whitespace();
				let Some(name) = parts.next()
					else { return Err(err("empty column name")); };
				match state {
					State::Columns => block.columns.push(name.to_string()),
					State::Outside => {
						// key/value pair: grow the single row
						let value = parts.next()
							.ok_or_else(|| err("missing value"))?;
						block.columns.push(name.to_string());
						match block.rows.first_mut() {
							Some(row) => row.push(unquote(value)),
							None => block.rows.push(vec![unquote(value)])
						}
					}
					State::Rows => return Err(err("column name after table rows"))
				}
				continue;
			}

			if state == State::Outside {
				return Err(err("value outside of a table"));
			}
			state = State::Rows;
			let row = split_values(line);
			if row.len() != block.columns.len() {
				return Err(err(&format!("expected {} values, found {}", block.columns.len(), row.len())));
			}
			block.rows.push(row);
		}

		Ok(Self {
			blocks
		})
	}
}

impl fmt::Display for StarFile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for block in &self.blocks {
			block.write(f)?;
		}
		Ok(())
	}
}


fn strip_comment(line: &str) -> &str {
	// comments only start at the beginning of a token, and never inside quotes
	let mut in_quote = false;
	let mut prev_space = true;
	for (i, c) in line.char_indices() {
		match c {
			'"' => in_quote = !in_quote,
			'#' if !in_quote && prev_space => return &line[.. i],
			_ => ()
		}
		prev_space = c.is_whitespace();
	}
	line
}


fn unquote(v: &str) -> String {
	v.strip_prefix('"')
		.and_then(|v| v.strip_suffix('"'))
		.unwrap_or(v)
		.to_string()
}


fn split_values(line: &str) -> Vec<String> {
	let mut values = Vec::new();
	let mut chars = line.chars().peekable();
	loop {
		while chars.next_if(|c| c.is_whitespace()).is_some() {}
		let Some(c) = chars.next()
			else { break; };
		let mut value = String::new();
		if c == '"' {
			while let Some(c) = chars.next() {
				if c == '"' {
					break;
				}
				value.push(c);
			}
		} else {
			value.push(c);
			while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
				value.push(c);
			}
		}
		values.push(value);
	}
	values
}


#[cfg(test)]
mod test {

	use galvanic_assert::{assert_that, matchers::*};
	use indoc::indoc;

	use super::*;


	#[test]
	fn parse_loop() {

		let star = StarFile::parse(indoc! { r#"

			# version 30001

			data_particles

			loop_
			_rlnCoordinateX #1
			_rlnCoordinateY #2
			_rlnMicrographName #3
			101.5 200.25 "MotionCorr/job002/Movies/a b.mrc"
			   7   8   mic.mrc
		"# }).unwrap();

		let block = star.block("particles").unwrap();
		assert_that!(&block.columns, eq(vec![
			"rlnCoordinateX".to_string(),
			"rlnCoordinateY".to_string(),
			"rlnMicrographName".to_string()
		]));
		assert_that!(&block.rows.len(), eq(2));
		assert_that!(&block.rows[0][2].as_str(), eq("MotionCorr/job002/Movies/a b.mrc"));
		let xs = block.values("_rlnCoordinateX").unwrap().collect::<Vec<_>>();
		assert_that!(&xs, eq(vec!["101.5", "7"]));
	}

	#[test]
	fn parse_key_values() {

		let star = StarFile::parse(indoc! { r#"
			data_job
			_rlnJobTypeLabel    relion.external
			_rlnJobIsContinue   0
		"# }).unwrap();

		let block = star.block("job").unwrap();
		assert_that!(&block.rows.len(), eq(1));
		assert_that!(&block.values("rlnJobIsContinue").unwrap().next(), eq(Some("0")));
	}

	#[test]
	fn bad_row_width() {
		let err = StarFile::parse(indoc! { r#"
			data_
			loop_
			_rlnCoordinateX
			_rlnCoordinateY
			1 2 3
		"# }).unwrap_err();
		assert_that!(&matches!(err, InputError::Star { line: 5, .. }), eq(true));
	}

	#[test]
	fn write_then_parse() {

		let mut block = DataBlock::new("particles", ["rlnCoordinateX", "rlnImageName"]);
		block.push(vec!["1.5".to_string(), "000001@Extract/a b.mrcs".to_string()]);
		let star = StarFile {
			blocks: vec![block]
		};

		let text = star.to_string();
		assert_that!(&text.contains("_rlnCoordinateX #1"), eq(true));
		assert_that!(&StarFile::parse(&text).unwrap(), eq(star));
	}
}
