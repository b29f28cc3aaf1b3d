use byteorder::{
	LE,
	ReadBytesExt,
	WriteBytesExt
};

use std::io;
use thiserror::Error;

use ultraviolet::vec::{
	Vec2,
	Vec3
};

#[cfg(feature = "import")]
use vdk_core::io_ext::ReadBinExt;

#[cfg(feature = "export")]
use vdk_core::io_ext::WriteBinExt;

pub const IDENT: i32 = 844121161;
pub const VERSION: i32 = 3;
/// Number of distinct values a 16 bit face index can address
pub const MAX_INDICES: usize = i16::MAX as usize + 1;

#[derive(Debug, Error)]
pub enum JoeError {
	#[error("I/O error")]
	IO {
		source: io::Error,
	},
	#[error("Unexpected end of stream")]
	Truncated,
	#[error("Not a JOE file: {0}")]
	Ident(i32),
	#[error("Unknown/unsupported version: {0}")]
	Version(i32),
	#[error("Negative {0} count: {1}")]
	Count(&'static str, i32),
	#[error("Face {0} index {1} out of range: {2} available")]
	IndexRange(&'static str, i16, usize),
	#[error("Max number of allowed {0} exceeded: {1}/32768")]
	MaxIndices(&'static str, usize),
	#[error("Frame {0} has {1} faces, expected {2}")]
	FaceCount(usize, usize, usize),
	#[error("Object has no frames")]
	NoFrames,
	#[error("Mesh has no faces")]
	NoFaces,
	#[error("Mesh has no texture coordinates")]
	NoTexCoords,
}

impl JoeError {
	/// Whether the error stems from host geometry the format can't represent, rather than from a broken
	/// stream
	pub fn is_unsupported_geometry(&self) -> bool {
		matches!(self, JoeError::MaxIndices(..) | JoeError::NoFaces | JoeError::NoTexCoords)
	}
}

impl From<io::Error> for JoeError {
	fn from(source: io::Error) -> Self {
		match source.kind() {
			io::ErrorKind::UnexpectedEof => JoeError::Truncated,
			_ => JoeError::IO {
				source: source,
			},
		}
	}
}

/// Reads `num` consecutive vertex or normal records
#[cfg(feature = "import")]
pub fn read_vec3s<R>(num: usize, buf: &mut R) -> Result<Vec<Vec3>, JoeError>
where
	R: ReadBytesExt,
{
	let mut values = Vec::with_capacity(num.min(MAX_INDICES));
	for _ in 0..num {
		values.push(buf.read_vec3_le()?);
	}

	Ok(values)
}

#[cfg(feature = "export")]
pub fn write_vec3s<W>(values: &[Vec3], buf: &mut W) -> Result<(), JoeError>
where
	W: WriteBytesExt,
{
	for v in values.iter() {
		buf.write_vec3_le(*v)?;
	}

	Ok(())
}

/// Reads `num` texture coordinates, undoing the V flip
#[cfg(feature = "import")]
pub fn read_texcoords<R>(num: usize, buf: &mut R) -> Result<Vec<Vec2>, JoeError>
where
	R: ReadBytesExt,
{
	let mut values = Vec::with_capacity(num.min(MAX_INDICES));
	for _ in 0..num {
		let uv = buf.read_vec2_le()?;
		values.push(Vec2::new(uv.x, 1.0 - uv.y));
	}

	Ok(values)
}

/// Writes texture coordinates, storing V as `1 - v`
#[cfg(feature = "export")]
pub fn write_texcoords<W>(values: &[Vec2], buf: &mut W) -> Result<(), JoeError>
where
	W: WriteBytesExt,
{
	for uv in values.iter() {
		buf.write_vec2_le(Vec2::new(uv.x, 1.0 - uv.y))?;
	}

	Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Face {
	pub vertex_index: [i16; 3],
	pub normal_index: [i16; 3],
	pub texture_index: [i16; 3],
}

impl Face {
	pub const SIZE: usize = 18;

	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<Face, JoeError>
	where
		R: ReadBytesExt,
	{
		let mut face = Face::default();

		for i in face.vertex_index.iter_mut() {
			*i = buf.read_i16::<LE>()?;
		}
		for i in face.normal_index.iter_mut() {
			*i = buf.read_i16::<LE>()?;
		}
		for i in face.texture_index.iter_mut() {
			*i = buf.read_i16::<LE>()?;
		}

		Ok(face)
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), JoeError>
	where
		W: WriteBytesExt,
	{
		for i in self.vertex_index.iter()
			.chain(self.normal_index.iter())
			.chain(self.texture_index.iter())
		{
			buf.write_i16::<LE>(*i)?;
		}

		Ok(())
	}

	/// Whether two corners share a vertex
	pub fn is_degenerate(&self) -> bool {
		let vi = self.vertex_index;
		vi[0] == vi[1] || vi[1] == vi[2] || vi[0] == vi[2]
	}
}

/// Per frame counts, in on-disk order
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameHeader {
	pub num_vertices: i32,
	pub num_texcoords: i32,
	pub num_normals: i32,
}

impl FrameHeader {
	#[cfg(feature = "import")]
	fn read<R>(buf: &mut R) -> Result<FrameHeader, JoeError>
	where
		R: ReadBytesExt,
	{
		let num_vertices = buf.read_i32::<LE>()?;
		let num_texcoords = buf.read_i32::<LE>()?;
		let num_normals = buf.read_i32::<LE>()?;

		for (what, num) in [("vertex", num_vertices), ("texcoord", num_texcoords), ("normal", num_normals)] {
			if num < 0 {
				return Err(JoeError::Count(what, num));
			}
		}

		Ok(FrameHeader {
			num_vertices: num_vertices,
			num_texcoords: num_texcoords,
			num_normals: num_normals,
		})
	}

	#[cfg(feature = "export")]
	fn write<W>(&self, buf: &mut W) -> Result<(), JoeError>
	where
		W: WriteBytesExt,
	{
		buf.write_i32::<LE>(self.num_vertices)?;
		buf.write_i32::<LE>(self.num_texcoords)?;
		buf.write_i32::<LE>(self.num_normals)?;

		Ok(())
	}
}

/// One keyframe's geometry.
///
/// On disk the faces precede the frame header, see [`JoeObject::read`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
	pub faces: Vec<Face>,
	pub verts: Vec<Vec3>,
	pub normals: Vec<Vec3>,
	pub texcoords: Vec<Vec2>,
}

impl Frame {
	pub fn header(&self) -> FrameHeader {
		FrameHeader {
			num_vertices: self.verts.len() as i32,
			num_texcoords: self.texcoords.len() as i32,
			num_normals: self.normals.len() as i32,
		}
	}

	/// Reads the frame header and attribute arrays; faces must be filled in by the caller
	#[cfg(feature = "import")]
	pub fn read<R>(faces: Vec<Face>, buf: &mut R) -> Result<Frame, JoeError>
	where
		R: ReadBytesExt,
	{
		let header = FrameHeader::read(buf)?;

		// header lists texcoords before normals, the body doesn't
		let verts = read_vec3s(header.num_vertices as usize, buf)?;
		let normals = read_vec3s(header.num_normals as usize, buf)?;
		let texcoords = read_texcoords(header.num_texcoords as usize, buf)?;

		Ok(Frame {
			faces: faces,
			verts: verts,
			normals: normals,
			texcoords: texcoords,
		})
	}

	/// Writes the frame header and attribute arrays, but not the faces
	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), JoeError>
	where
		W: WriteBytesExt,
	{
		self.header().write(buf)?;
		write_vec3s(&self.verts, buf)?;
		write_vec3s(&self.normals, buf)?;
		write_texcoords(&self.texcoords, buf)?;

		Ok(())
	}

	/// Checks every face index against the attribute arrays
	pub fn validate(&self) -> Result<(), JoeError> {
		let check = |what, indices: &[i16; 3], len: usize| {
			for i in indices.iter() {
				if *i < 0 || *i as usize >= len {
					return Err(JoeError::IndexRange(what, *i, len));
				}
			}
			Ok(())
		};

		for face in self.faces.iter() {
			check("vertex", &face.vertex_index, self.verts.len())?;
			check("normal", &face.normal_index, self.normals.len())?;
			if !self.texcoords.is_empty() {
				check("texture", &face.texture_index, self.texcoords.len())?;
			}
		}

		Ok(())
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Header {
	pub ident: i32,
	pub version: i32,
	pub num_faces: i32,
	pub num_frames: i32,
}

impl Header {
	#[cfg(feature = "import")]
	fn read<R>(buf: &mut R) -> Result<Header, JoeError>
	where
		R: ReadBytesExt,
	{
		let ident = buf.read_i32::<LE>()?;
		if ident != IDENT {
			return Err(JoeError::Ident(ident));
		}

		let version = buf.read_i32::<LE>()?;
		if version != VERSION {
			return Err(JoeError::Version(version));
		}

		let num_faces = buf.read_i32::<LE>()?;
		if num_faces < 0 {
			return Err(JoeError::Count("face", num_faces));
		}

		let num_frames = buf.read_i32::<LE>()?;
		if num_frames < 0 {
			return Err(JoeError::Count("frame", num_frames));
		}

		Ok(Header {
			ident: ident,
			version: version,
			num_faces: num_faces,
			num_frames: num_frames,
		})
	}

	#[cfg(feature = "export")]
	fn write<W>(&self, buf: &mut W) -> Result<(), JoeError>
	where
		W: WriteBytesExt,
	{
		buf.write_i32::<LE>(self.ident)?;
		buf.write_i32::<LE>(self.version)?;
		buf.write_i32::<LE>(self.num_faces)?;
		buf.write_i32::<LE>(self.num_frames)?;

		Ok(())
	}
}

/// A (possibly animated) JOE model
#[derive(Clone, Debug, PartialEq)]
pub struct JoeObject {
	pub header: Header,
	pub frames: Vec<Frame>,
}

impl JoeObject {
	/// Builds an object from frames that all share the face count of the first one
	pub fn new(frames: Vec<Frame>) -> Result<JoeObject, JoeError> {
		let num_faces = match frames.first() {
			Some(frame) => frame.faces.len(),
			None => return Err(JoeError::NoFrames),
		};

		for (i, frame) in frames.iter().enumerate() {
			if frame.faces.len() != num_faces {
				return Err(JoeError::FaceCount(i, frame.faces.len(), num_faces));
			}
		}

		Ok(JoeObject {
			header: Header {
				ident: IDENT,
				version: VERSION,
				num_faces: num_faces as i32,
				num_frames: frames.len() as i32,
			},
			frames: frames,
		})
	}

	#[cfg(feature = "import")]
	pub fn read<R>(buf: &mut R) -> Result<JoeObject, JoeError>
	where
		R: ReadBytesExt,
	{
		let header = Header::read(buf)?;

		let mut frames = vec![];
		for _ in 0..header.num_frames {
			let mut faces = vec![];
			for _ in 0..header.num_faces {
				faces.push(Face::read(buf)?);
			}

			frames.push(Frame::read(faces, buf)?);
		}

		Ok(JoeObject {
			header: header,
			frames: frames,
		})
	}

	#[cfg(feature = "export")]
	pub fn write<W>(&self, buf: &mut W) -> Result<(), JoeError>
	where
		W: WriteBytesExt,
	{
		let num_faces = self.header.num_faces as usize;
		for (i, frame) in self.frames.iter().enumerate() {
			if frame.faces.len() != num_faces {
				return Err(JoeError::FaceCount(i, frame.faces.len(), num_faces));
			}
		}

		Header {
			num_frames: self.frames.len() as i32,
			..self.header
		}.write(buf)?;

		for frame in self.frames.iter() {
			for face in frame.faces.iter() {
				face.write(buf)?;
			}
			frame.write(buf)?;
		}

		Ok(())
	}

	/// Size of the encoded object in bytes
	pub fn encoded_len(&self) -> usize {
		16 + self.frames.iter().map(|f| {
			f.faces.len() * Face::SIZE + 12 + (f.verts.len() + f.normals.len()) * 12 + f.texcoords.len() * 8
		}).sum::<usize>()
	}
}

#[cfg(all(test, feature = "import", feature = "export"))]
mod tests {
	use ultraviolet::vec::{
		Vec2,
		Vec3
	};

	use super::*;

	/// The single triangle object from the format description
	fn triangle() -> JoeObject {
		JoeObject::new(vec![Frame {
			faces: vec![Face {
				vertex_index: [0, 1, 2],
				normal_index: [0, 0, 0],
				texture_index: [0, 1, 2],
			}],
			verts: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
			normals: vec![Vec3::new(0.0, 0.0, 1.0)],
			texcoords: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
		}]).unwrap()
	}

	#[test]
	fn test_vec3_exact() {
		let values = vec![Vec3::new(0.1, -2.5e-7, 12345.678), Vec3::new(f32::MAX, f32::MIN_POSITIVE, -0.0)];
		let mut out = vec![];
		write_vec3s(&values, &mut out).unwrap();
		assert_eq!(out.len(), 24);
		assert_eq!(read_vec3s(2, &mut out.as_slice()).unwrap(), values);
	}

	#[test]
	fn test_texcoord_flip() {
		let mut out = vec![];
		write_texcoords(&[Vec2::new(0.25, 0.0), Vec2::new(0.5, 0.75)], &mut out).unwrap();
		assert_eq!(&out[4..8], &1.0f32.to_le_bytes());
		assert_eq!(&out[12..16], &0.25f32.to_le_bytes());

		let back = read_texcoords(2, &mut out.as_slice()).unwrap();
		assert_eq!(back, vec![Vec2::new(0.25, 0.0), Vec2::new(0.5, 0.75)]);
	}

	#[test]
	fn test_face_layout() {
		let face = Face {
			vertex_index: [1, 2, 3],
			normal_index: [4, 5, 6],
			texture_index: [7, 8, -1],
		};
		let mut out = vec![];
		face.write(&mut out).unwrap();
		assert_eq!(out, [1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7, 0, 8, 0, 0xff, 0xff]);
		assert_eq!(Face::read(&mut out.as_slice()).unwrap(), face);
	}

	#[test]
	fn test_degenerate() {
		let mut face = Face::default();
		face.vertex_index = [2, 2, 5];
		assert!(face.is_degenerate());
		face.vertex_index = [1, 2, 3];
		assert!(!face.is_degenerate());
	}

	#[test]
	fn test_frame_header_order() {
		let frame = Frame {
			faces: vec![],
			verts: vec![Vec3::zero(); 3],
			normals: vec![Vec3::unit_z()],
			texcoords: vec![Vec2::zero(); 2],
		};
		let mut out = vec![];
		frame.write(&mut out).unwrap();

		// vertices, texcoords, normals
		assert_eq!(&out[0..12], &[3, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0]);
		// normal directly follows the vertices
		assert_eq!(&out[12 + 36..12 + 48], &[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x80, 0x3f]);
		assert_eq!(out.len(), 12 + 36 + 12 + 16);
	}

	#[test]
	fn test_object_roundtrip() {
		let obj = triangle();
		let mut out = vec![];
		obj.write(&mut out).unwrap();
		assert_eq!(out.len(), obj.encoded_len());
		assert_eq!(&out[0..4], &IDENT.to_le_bytes());

		let back = JoeObject::read(&mut out.as_slice()).unwrap();
		assert_eq!(back, obj);
		assert_eq!(back.header.num_faces, 1);
		assert_eq!(back.header.num_frames, 1);
	}

	#[test]
	fn test_faces_per_frame() {
		let mut obj = triangle();
		obj.frames.push(obj.frames[0].clone());
		obj.header.num_frames = 2;

		let mut out = vec![];
		obj.write(&mut out).unwrap();

		// every frame block starts with its own copy of the faces
		let frame_len = Face::SIZE + 12 + 4 * 12 + 3 * 8;
		assert_eq!(out.len(), 16 + 2 * frame_len);
		assert_eq!(&out[16..16 + Face::SIZE], &out[16 + frame_len..16 + frame_len + Face::SIZE]);

		let back = JoeObject::read(&mut out.as_slice()).unwrap();
		assert_eq!(back.frames.len(), 2);
		assert_eq!(back.frames[1].faces, obj.frames[0].faces);
	}

	#[test]
	fn test_bad_ident() {
		let mut out = vec![];
		triangle().write(&mut out).unwrap();
		out[0] ^= 0xff;
		assert!(matches!(JoeObject::read(&mut out.as_slice()), Err(JoeError::Ident(_))));
	}

	#[test]
	fn test_bad_version() {
		let mut out = vec![];
		triangle().write(&mut out).unwrap();
		out[4] = 2;
		assert!(matches!(JoeObject::read(&mut out.as_slice()), Err(JoeError::Version(2))));
	}

	#[test]
	fn test_truncated() {
		let mut out = vec![];
		triangle().write(&mut out).unwrap();
		out.truncate(out.len() - 3);
		assert!(matches!(JoeObject::read(&mut out.as_slice()), Err(JoeError::Truncated)));
	}

	#[test]
	fn test_face_count_mismatch() {
		let mut frame = triangle().frames.remove(0);
		let first = frame.clone();
		frame.faces.push(frame.faces[0]);
		assert!(matches!(JoeObject::new(vec![first, frame]), Err(JoeError::FaceCount(1, 2, 1))));
		assert!(matches!(JoeObject::new(vec![]), Err(JoeError::NoFrames)));
	}

	#[test]
	fn test_validate() {
		let mut frame = triangle().frames.remove(0);
		assert!(frame.validate().is_ok());
		frame.faces[0].normal_index[2] = 1;
		assert!(matches!(frame.validate(), Err(JoeError::IndexRange("normal", 1, 1))));
	}
}
