use std::io::{
	Error,
	ErrorKind,
	Read,
	Result,
	Write
};

use ultraviolet::vec::{
	Vec2,
	Vec3
};

pub trait ReadBinExt: Read {
	/// Reads a fixed-width string, dropping everything from the first NUL byte onwards
	#[inline]
	fn read_fixed_str(&mut self, width: usize) -> Result<String> {
		let mut buf = vec![0; width];
		self.read_exact(&mut buf)?;

		if let Some(end) = buf.iter().position(|b| *b == 0) {
			buf.truncate(end);
		}

		String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::InvalidData, e))
	}

	/// Reads a little endian 2D vector
	#[inline]
	fn read_vec2_le(&mut self) -> Result<Vec2> {
		let mut x = [0; 4];
		let mut y = x;

		self.read_exact(&mut x)?;
		self.read_exact(&mut y)?;

		Ok(Vec2::new(f32::from_le_bytes(x), f32::from_le_bytes(y)))
	}

	/// Reads a little endian 3D vector
	#[inline]
	fn read_vec3_le(&mut self) -> Result<Vec3> {
		let mut x = [0; 4];
		let mut y = x;
		let mut z = y;

		self.read_exact(&mut x)?;
		self.read_exact(&mut y)?;
		self.read_exact(&mut z)?;

		Ok(Vec3::new(f32::from_le_bytes(x), f32::from_le_bytes(y), f32::from_le_bytes(z)))
	}
}

impl<R> ReadBinExt for R
where
	R: Read + ?Sized,
{
}

pub trait WriteBinExt: Write {
	/// Writes a string NUL-padded to `width` bytes
	#[inline]
	fn write_fixed_str(&mut self, s: &str, width: usize) -> Result<()> {
		let bytes = s.as_bytes();
		if bytes.len() > width {
			return Err(Error::new(ErrorKind::InvalidInput,
				format!("\"{}\" does not fit in {} bytes", s, width)));
		}

		self.write_all(bytes)?;
		self.write_all(&vec![0; width - bytes.len()])
	}

	/// Writes a little endian 2D vector
	#[inline]
	fn write_vec2_le(&mut self, v: Vec2) -> Result<()> {
		self.write_all(&v.x.to_le_bytes())?;
		self.write_all(&v.y.to_le_bytes())
	}

	/// Writes a little endian 3D vector
	#[inline]
	fn write_vec3_le(&mut self, v: Vec3) -> Result<()> {
		self.write_all(&v.x.to_le_bytes())?;
		self.write_all(&v.y.to_le_bytes())?;
		self.write_all(&v.z.to_le_bytes())
	}
}

impl<W> WriteBinExt for W
where
	W: Write + ?Sized,
{
}
