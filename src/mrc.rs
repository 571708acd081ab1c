
// MRC file (from the Medical Research Council, in the UK)
// https://en.wikipedia.org/wiki/MRC_(file_format)

// format definition:
// https://www.ccpem.ac.uk/mrc_format/mrc2014.php

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{ByteOrder, ReadBytesExt, WriteBytesExt, BE, LE};
use tracing::debug;

use crate::error::InputError;
use crate::raster::{Raster, RasterStats};
use crate::scale::PixelSize;


const HEADER_BYTES: usize = 1024;

/// the header is 256 4-byte words, numbered from 1 in the MRC2014 format document
const fn word(n: usize) -> usize {
	(n - 1)*4
}

const MACHST_LE: [u8; 4] = [0x44, 0x44, 0x00, 0x00];
const MACHST_BE: [u8; 4] = [0x11, 0x11, 0x00, 0x00];


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// 8 bit signed int
	I8,
	/// 16 bit signed int
	I16,
	/// 32 bit float
	F32,
	/// 16 bit unsigned int
	U16
}

impl Mode {

	pub fn from_id(id: u32) -> Result<Self,InputError> {
		match id {
			0 => Ok(Self::I8),
			1 => Ok(Self::I16),
			2 => Ok(Self::F32),
			6 => Ok(Self::U16),
			_ => Err(InputError::MrcMode(id))
		}
	}

	pub fn id(self) -> u32 {
		match self {
			Self::I8 => 0,
			Self::I16 => 1,
			Self::F32 => 2,
			Self::U16 => 6
		}
	}

	pub fn bytes(self) -> usize {
		match self {
			Self::I8 => 1,
			Self::I16 | Self::U16 => 2,
			Self::F32 => 4
		}
	}
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
	Little,
	Big
}


#[derive(Debug, Clone, PartialEq)]
pub struct MrcHeader {
	pub nx: u32,
	pub ny: u32,
	pub nz: u32,
	pub mode: Mode,
	pub mx: u32,
	pub cella_x: f32,
	pub nsymbt: u32,
	pub dmin: f32,
	pub dmax: f32,
	pub dmean: f32,
	pub rms: f32,
	pub endian: Endian
}

impl MrcHeader {

	fn parse(buf: &[u8; HEADER_BYTES]) -> Result<Self,InputError> {

		// the machine stamp tells the byte order, but some writers leave it blank,
		// so fall back to whichever order gives a sensible mode
		let machst = &buf[word(54) .. word(54) + 4];
		let endian = if machst[0] == MACHST_BE[0] {
			Endian::Big
		} else if machst[0] == MACHST_LE[0] {
			Endian::Little
		} else if LE::read_u32(&buf[word(4) ..]) <= 16 {
			Endian::Little
		} else {
			Endian::Big
		};

		match endian {
			Endian::Little => Self::parse_ordered::<LE>(buf, endian),
			Endian::Big => Self::parse_ordered::<BE>(buf, endian)
		}
	}

	fn parse_ordered<B: ByteOrder>(buf: &[u8; HEADER_BYTES], endian: Endian) -> Result<Self,InputError> {

		let read_i32 = |n: usize| B::read_i32(&buf[word(n) ..]);
		let read_f32 = |n: usize| B::read_f32(&buf[word(n) ..]);

		let dim = |n: usize, name: &str| {
			let v = read_i32(n);
			u32::try_from(v)
				.map_err(|_| InputError::Mrc(format!("negative {}: {}", name, v)))
		};

		Ok(Self {
			nx: dim(1, "nx")?,
			ny: dim(2, "ny")?,
			nz: dim(3, "nz")?,
			mode: Mode::from_id(dim(4, "mode")?)?,
			mx: dim(8, "mx")?,
			cella_x: read_f32(11),
			nsymbt: dim(24, "nsymbt")?,
			dmin: read_f32(20),
			dmax: read_f32(21),
			dmean: read_f32(22),
			rms: read_f32(55),
			endian
		})
	}

	/// Angstroms per pixel along x, if the header records a calibration
	pub fn pixel_size(&self) -> Option<PixelSize> {
		if self.mx == 0 {
			return None;
		}
		let pixel_size = PixelSize(self.cella_x as f64/self.mx as f64);
		if pixel_size.is_valid() {
			Some(pixel_size)
		} else {
			None
		}
	}

	/// None when the dimensions overflow
	fn voxels(&self) -> Option<u64> {
		(self.nx as u64)
			.checked_mul(self.ny as u64)?
			.checked_mul(self.nz as u64)
	}

	/// size of the voxel data the header promises, after any extended header
	fn data_bytes(&self) -> Option<u64> {
		self.voxels()?
			.checked_mul(self.mode.bytes() as u64)
	}
}


pub fn read_header(path: impl AsRef<Path>) -> Result<MrcHeader,InputError> {
	let path = path.as_ref();
	let mut reader = open(path)?;
	read_header_from(&mut reader)
		.map_err(|e| at_path(e, path))
}


fn open(path: &Path) -> Result<BufReader<File>,InputError> {
	let file = File::open(path)
		.map_err(|e| InputError::io(path, e))?;
	Ok(BufReader::new(file))
}


fn at_path(e: InputError, path: &Path) -> InputError {
	match e {
		InputError::Mrc(msg) => InputError::Mrc(format!("{}: {}", path.to_string_lossy(), msg)),
		InputError::Io { source, .. } => InputError::io(path, source),
		e => e
	}
}


fn read_header_from(reader: &mut impl Read) -> Result<MrcHeader,InputError> {
	let mut buf = [0u8; HEADER_BYTES];
	reader.read_exact(&mut buf)
		.map_err(|e| InputError::Mrc(format!("truncated header: {}", e)))?;
	MrcHeader::parse(&buf)
}


/// Reads every section of the file, converting voxels to f32
fn read_voxels<R: Read + Seek>(reader: &mut R, header: &MrcHeader) -> Result<Vec<f32>,InputError> {

	let too_large = || InputError::Mrc(format!(
		"dimensions too large: {} x {} x {}",
		header.nx,
		header.ny,
		header.nz
	));
	let data_bytes = header.data_bytes()
		.ok_or_else(too_large)?;
	let n = header.voxels()
		.and_then(|n| usize::try_from(n).ok())
		.ok_or_else(too_large)?;

	// compare the header to the file size before allocating anything
	let unreadable = |e: std::io::Error| InputError::Mrc(format!("unreadable data: {}", e));
	let start = reader.stream_position()
		.map_err(unreadable)?;
	let end = reader.seek(SeekFrom::End(0))
		.map_err(unreadable)?;
	let expected = data_bytes.checked_add(header.nsymbt as u64)
		.ok_or_else(too_large)?;
	let available = end.saturating_sub(start);
	if available < expected {
		return Err(InputError::Mrc(format!(
			"truncated data, expected {} voxels of {} bytes after {} extended header bytes, but only {} bytes remain",
			n,
			header.mode.bytes(),
			header.nsymbt,
			available
		)));
	}

	// skip the extended header, if any
	reader.seek(SeekFrom::Start(start + header.nsymbt as u64))
		.map_err(unreadable)?;

	let voxels = match header.endian {
		Endian::Little => read_voxels_ordered::<LE>(reader, header.mode, n),
		Endian::Big => read_voxels_ordered::<BE>(reader, header.mode, n)
	};
	voxels.map_err(unreadable)
}


fn read_voxels_ordered<B: ByteOrder>(reader: &mut impl Read, mode: Mode, n: usize) -> std::io::Result<Vec<f32>> {
	Ok(match mode {
		Mode::I8 => {
			let mut buf = vec![0i8; n];
			reader.read_i8_into(&mut buf)?;
			buf.into_iter().map(|v| v as f32).collect()
		}
		Mode::I16 => {
			let mut buf = vec![0i16; n];
			reader.read_i16_into::<B>(&mut buf)?;
			buf.into_iter().map(|v| v as f32).collect()
		}
		Mode::U16 => {
			let mut buf = vec![0u16; n];
			reader.read_u16_into::<B>(&mut buf)?;
			buf.into_iter().map(|v| v as f32).collect()
		}
		Mode::F32 => {
			let mut buf = vec![0f32; n];
			reader.read_f32_into::<B>(&mut buf)?;
			buf
		}
	})
}


/// Reads a single 2D image, and its pixel size if the header has one
pub fn read_micrograph(path: impl AsRef<Path>) -> Result<(Raster,Option<PixelSize>),InputError> {

	let path = path.as_ref();
	let mut reader = open(path)?;
	let header = read_header_from(&mut reader)
		.map_err(|e| at_path(e, path))?;
	debug!("MRC header for {}: {:?}", path.to_string_lossy(), header);

	if header.nz != 1 {
		return Err(InputError::NotAnImage(header.nz));
	}
	if header.nx == 0 || header.ny == 0 {
		return Err(InputError::EmptyMicrograph);
	}

	let voxels = read_voxels(&mut reader, &header)
		.map_err(|e| at_path(e, path))?;
	let raster = Raster::from_pixels(header.nx as usize, header.ny as usize, voxels)
		.ok_or_else(|| InputError::Mrc("voxel count mismatch".to_string()))?;
	if raster.all_nan() {
		return Err(InputError::AllNan);
	}

	Ok((raster, header.pixel_size()))
}


/// Reads every section of a stack as its own raster
pub fn read_stack(path: impl AsRef<Path>) -> Result<(Vec<Raster>,MrcHeader),InputError> {

	let path = path.as_ref();
	let mut reader = open(path)?;
	let header = read_header_from(&mut reader)
		.map_err(|e| at_path(e, path))?;
	let voxels = read_voxels(&mut reader, &header)
		.map_err(|e| at_path(e, path))?;

	let section = (header.nx as usize)*(header.ny as usize);
	let frames = if section == 0 {
		Vec::new()
	} else {
		voxels.chunks_exact(section)
			.filter_map(|chunk| Raster::from_pixels(header.nx as usize, header.ny as usize, chunk.to_vec()))
			.collect()
	};

	Ok((frames, header))
}


/// Writes equal-sized frames as a little-endian float32 image stack
pub fn write_stack(out: &mut impl Write, frames: &[Raster], pixel_size: PixelSize) -> std::io::Result<()> {

	let (nx, ny) = frames.first()
		.map(|f| (f.cols() as u32, f.rows() as u32))
		.unwrap_or((0, 0));
	if let Some(f) = frames.iter().find(|f| f.cols() as u32 != nx || f.rows() as u32 != ny) {
		return Err(std::io::Error::new(
			std::io::ErrorKind::InvalidInput,
			format!("stack frames differ in size: {}x{} and {}x{}", nx, ny, f.cols(), f.rows())
		));
	}
	let nz = frames.len() as u32;

	let stats = RasterStats::of(frames.iter().flat_map(|f| f.pixels().iter().copied()));

	let mut writer = BufWriter::new(out);

	// words 1-4: dimensions and mode
	writer.write_u32::<LE>(nx)?;
	writer.write_u32::<LE>(ny)?;
	writer.write_u32::<LE>(nz)?;
	writer.write_u32::<LE>(Mode::F32.id())?;

	// words 5-7: nxstart, nystart, nzstart
	writer.write_all(&[0u8; 4*3])?;

	// words 8-10: sampling, one sample per pixel and per frame
	writer.write_u32::<LE>(nx)?;
	writer.write_u32::<LE>(ny)?;
	writer.write_u32::<LE>(nz)?;

	// words 11-16: cell dimensions in Angstroms, and cell angles
	let ps = pixel_size.0 as f32;
	writer.write_f32::<LE>(nx as f32*ps)?;
	writer.write_f32::<LE>(ny as f32*ps)?;
	writer.write_f32::<LE>(nz as f32*ps)?;
	for _ in 0 .. 3 {
		writer.write_f32::<LE>(90.0)?;
	}

	// words 17-19: axis mapping, columns=x, rows=y, sections=z
	writer.write_u32::<LE>(1)?;
	writer.write_u32::<LE>(2)?;
	writer.write_u32::<LE>(3)?;

	// words 20-22: density stats
	writer.write_f32::<LE>(stats.min)?;
	writer.write_f32::<LE>(stats.max)?;
	writer.write_f32::<LE>(stats.mean)?;

	// word 23: space group 0 means a stack of images
	writer.write_u32::<LE>(0)?;

	// word 24: no extended header
	writer.write_u32::<LE>(0)?;

	// words 25-26: extra
	writer.write_all(&[0u8; 4*2])?;

	// word 27: extended header type, word 28: format version
	writer.write_all(b"MRCO")?;
	writer.write_u32::<LE>(20140)?;

	// words 29-49: extra
	writer.write_all(&[0u8; 4*(50 - 29)])?;

	// words 50-52: origin
	writer.write_all(&[0u8; 4*3])?;

	// word 53: format tag, word 54: machine stamp
	writer.write_all(b"MAP ")?;
	writer.write_all(&MACHST_LE)?;

	// word 55: rms deviation
	writer.write_f32::<LE>(stats.rms)?;

	// word 56: label count, then ten 80-character labels
	writer.write_u32::<LE>(1)?;
	let mut label = [b' '; 80];
	let text = b"particle-extract: particle stack";
	label[.. text.len()].copy_from_slice(text);
	writer.write_all(&label)?;
	writer.write_all(&[0u8; 80*9])?;

	// voxels: z(y(x)) order
	for frame in frames {
		for v in frame.pixels() {
			writer.write_f32::<LE>(*v)?;
		}
	}

	// write buffers should be flushed before dropping
	writer.flush()?;

	Ok(())
}
