use log::warn;
use std::collections::HashMap;

use ultraviolet::vec::{
	Vec2,
	Vec3
};

use vdk_core::scene::{
	self,
	Mesh,
	Shading,
	Triangle
};

use crate::{
	ConvertCfg,
	ConvertFlag,
	indexer::Indexer,
	joe::{
		Face,
		Frame,
		JoeError,
		JoeObject,
		MAX_INDICES
	}
};

/// Narrows an index handed out by an [`Indexer`] to the 16 bit on-disk type
fn to_index(what: &'static str, index: usize) -> Result<i16, JoeError> {
	if index >= MAX_INDICES {
		return Err(JoeError::MaxIndices(what, index + 1));
	}

	Ok(index as i16)
}

impl Frame {
	/// Builds a frame from triangulated host geometry.
	///
	/// Faces are emitted in triangle order and attribute arrays in first-seen order.
	pub fn from_triangles(tris: &[Triangle], cfg: &ConvertCfg) -> Result<Frame, JoeError> {
		if tris.is_empty() {
			return Err(JoeError::NoFaces);
		}

		let has_uvs = tris.iter().all(|t| t.uvs.is_some());
		if !has_uvs && !cfg.flags.contains(ConvertFlag::DEFAULT_MISSING_UVS) {
			return Err(JoeError::NoTexCoords);
		}

		let mut vertices = Indexer::new();
		let mut normals = Indexer::new();
		let mut texcoords = Indexer::new();
		let mut faces = Vec::with_capacity(tris.len());

		for tri in tris.iter() {
			let mut face = Face::default();

			for i in 0..3 {
				face.vertex_index[i] = to_index("vertices", vertices.get(tri.positions[i]))?;
			}

			match tri.shading {
				Shading::Flat(n) => {
					face.normal_index = [to_index("normals", normals.get(n))?; 3];
				},
				Shading::Smooth(ns) => for i in 0..3 {
					face.normal_index[i] = to_index("normals", normals.get(ns[i]))?;
				},
			}

			let uvs = match tri.uvs {
				Some(uvs) if has_uvs => uvs,
				_ => [Vec2::zero(); 3],
			};
			for i in 0..3 {
				face.texture_index[i] = to_index("texture coordinates", texcoords.get(uvs[i]))?;
			}

			faces.push(face);
		}

		Ok(Frame {
			faces: faces,
			verts: vertices.into_values(),
			normals: normals.into_values(),
			texcoords: texcoords.into_values(),
		})
	}

	/// Drops faces using the same vertex more than once
	pub fn remove_degenerate_faces(&mut self) {
		self.faces.retain(|f| !f.is_degenerate());
	}

	/// Rotates the corners of faces ending on vertex 0, so that index 0 never comes last.
	///
	/// Degenerate faces must already be gone, otherwise a single rotation may not be enough.
	pub fn swizzle_face_vertices(&mut self) {
		for f in self.faces.iter_mut() {
			if f.vertex_index[2] == 0 {
				f.vertex_index.rotate_right(1);
				f.normal_index.rotate_right(1);
				f.texture_index.rotate_right(1);
			}
		}
	}

	/// Gives every distinct (vertex, normal) pair its own vertex.
	///
	/// Returns the normal of each new vertex and the new vertex indices of each face. These may exceed the 16 bit
	/// range of the file, so the faces themselves are left untouched.
	pub fn duplicate_verts_with_multiple_normals(&mut self) -> (Vec<Vec3>, Vec<[usize; 3]>) {
		let mut face_vert: HashMap<(i16, i16), usize> = HashMap::new();
		let mut verts = vec![];
		let mut normals = vec![];
		let mut faces = Vec::with_capacity(self.faces.len());

		for f in self.faces.iter() {
			let mut face = [0; 3];
			for i in 0..3 {
				let vn = (f.vertex_index[i], f.normal_index[i]);
				face[i] = *face_vert.entry(vn).or_insert_with(|| {
					verts.push(self.verts[vn.0 as usize]);
					normals.push(self.normals[vn.1 as usize]);
					verts.len() - 1
				});
			}
			faces.push(face);
		}

		self.verts = verts;
		(normals, faces)
	}

	/// Cleans the frame up and converts it into a host mesh
	pub fn to_mesh(mut self, name: &str, cfg: &ConvertCfg) -> Result<Mesh, JoeError> {
		self.validate()?;

		self.remove_degenerate_faces();
		if cfg.flags.contains(ConvertFlag::NONZERO_LAST_INDEX) {
			self.swizzle_face_vertices();
		}

		let (normals, faces) = self.duplicate_verts_with_multiple_normals();

		if self.texcoords.is_empty() {
			warn!("{}: mesh has no texture coordinates", name);
		}

		Ok(Mesh {
			name: name.to_string(),
			positions: self.verts,
			normals: normals,
			texcoords: self.texcoords,
			faces: self.faces.iter().zip(faces).map(|(f, vertices)| scene::Face {
				vertices: vertices,
				texcoords: f.texture_index.map(|i| i.max(0) as usize),
			}).collect(),
		})
	}
}

impl JoeObject {
	/// Builds an object from one triangle list per frame
	pub fn from_triangles<T>(frames: &[T], cfg: &ConvertCfg) -> Result<JoeObject, JoeError>
	where
		T: AsRef<[Triangle]>,
	{
		let frames = frames.iter()
			.map(|tris| Frame::from_triangles(tris.as_ref(), cfg))
			.collect::<Result<Vec<_>, _>>()?;

		JoeObject::new(frames)
	}

	/// Converts every frame into a host mesh
	pub fn to_meshes(self, name: &str, cfg: &ConvertCfg) -> Result<Vec<Mesh>, JoeError> {
		let name = name.strip_suffix(".joe").unwrap_or(name);

		self.frames.into_iter().map(|frame| frame.to_mesh(name, cfg)).collect()
	}
}

#[cfg(test)]
mod tests {
	use ultraviolet::vec::{
		Vec2,
		Vec3
	};

	use vdk_core::scene::{
		Shading,
		Triangle
	};

	use crate::{
		ConvertCfg,
		ConvertFlag,
		joe::{
			Face,
			Frame,
			JoeError,
			MAX_INDICES
		}
	};

	fn v(x: f32, y: f32, z: f32) -> Vec3 {
		Vec3::new(x, y, z)
	}

	fn face(vi: [i16; 3], ni: [i16; 3]) -> Face {
		Face {
			vertex_index: vi,
			normal_index: ni,
			texture_index: [0, 0, 0],
		}
	}

	/// Two triangles forming a unit quad, sharing the diagonal
	fn quad(shading: [Shading; 2]) -> Vec<Triangle> {
		let uvs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];
		vec![
			Triangle::new([v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(1.0, 1.0, 0.0)], shading[0], Some(uvs)),
			Triangle::new([v(0.0, 0.0, 0.0), v(1.0, 1.0, 0.0), v(0.0, 1.0, 0.0)], shading[1],
				Some([uvs[0], uvs[2], Vec2::new(0.0, 1.0)])),
		]
	}

	#[test]
	fn test_from_triangles_flat() {
		let up = Shading::Flat(Vec3::unit_z());
		let frame = Frame::from_triangles(&quad([up, up]), &ConvertCfg::default()).unwrap();

		assert_eq!(frame.verts.len(), 4);
		assert_eq!(frame.normals, vec![Vec3::unit_z()]);
		assert_eq!(frame.texcoords.len(), 4);
		assert_eq!(frame.faces[0].vertex_index, [0, 1, 2]);
		assert_eq!(frame.faces[1].vertex_index, [0, 2, 3]);
		assert_eq!(frame.faces[1].normal_index, [0, 0, 0]);
		assert_eq!(frame.faces[1].texture_index, [0, 2, 3]);
	}

	#[test]
	fn test_from_triangles_smooth() {
		let smooth = Shading::Smooth([Vec3::unit_z(), Vec3::unit_x(), Vec3::unit_z()]);
		let frame = Frame::from_triangles(&quad([smooth, Shading::Flat(Vec3::unit_y())]),
			&ConvertCfg::default()).unwrap();

		assert_eq!(frame.normals, vec![Vec3::unit_z(), Vec3::unit_x(), Vec3::unit_y()]);
		assert_eq!(frame.faces[0].normal_index, [0, 1, 0]);
		assert_eq!(frame.faces[1].normal_index, [2, 2, 2]);
	}

	#[test]
	fn test_from_triangles_rounds() {
		let up = Shading::Flat(Vec3::unit_z());
		let mut tris = quad([up, up]);
		tris[1].positions[2] = v(0.0000001, 1.000001, 0.0);
		tris[1].positions[0] = v(0.000001, 0.0, 0.0);

		let frame = Frame::from_triangles(&tris, &ConvertCfg::default()).unwrap();
		assert_eq!(frame.verts.len(), 4);
		assert_eq!(frame.faces[1].vertex_index, [0, 2, 3]);
		assert_eq!(frame.verts[3], v(0.0, 1.0, 0.0));
	}

	#[test]
	fn test_missing_uvs() {
		let up = Shading::Flat(Vec3::unit_z());
		let mut tris = quad([up, up]);
		tris[1].uvs = None;

		let err = Frame::from_triangles(&tris, &ConvertCfg::default()).unwrap_err();
		assert!(matches!(err, JoeError::NoTexCoords));
		assert!(err.is_unsupported_geometry());

		let cfg = ConvertCfg {
			flags: ConvertFlag::DEFAULT_MISSING_UVS,
		};
		let frame = Frame::from_triangles(&tris, &cfg).unwrap();
		assert_eq!(frame.texcoords, vec![Vec2::zero()]);
		assert!(frame.faces.iter().all(|f| f.texture_index == [0, 0, 0]));
	}

	#[test]
	fn test_no_faces() {
		assert!(matches!(Frame::from_triangles(&[], &ConvertCfg::default()), Err(JoeError::NoFaces)));
	}

	#[test]
	fn test_too_many_vertices() {
		let up = Shading::Flat(Vec3::unit_z());
		let uvs = Some([Vec2::zero(); 3]);
		let tris: Vec<Triangle> = (0..11000).map(|i| {
			let x = i as f32;
			Triangle::new([v(x, 0.0, 0.0), v(x, 1.0, 0.0), v(x, 2.0, 0.0)], up, uvs)
		}).collect();

		let err = Frame::from_triangles(&tris, &ConvertCfg::default()).unwrap_err();
		assert!(matches!(err, JoeError::MaxIndices("vertices", 32769)));
	}

	#[test]
	fn test_remove_degenerate_faces() {
		let mut frame = Frame::default();
		frame.faces = vec![face([2, 2, 5], [0; 3]), face([1, 2, 3], [0; 3]), face([4, 1, 4], [0; 3])];
		frame.remove_degenerate_faces();
		assert_eq!(frame.faces, vec![face([1, 2, 3], [0; 3])]);
	}

	#[test]
	fn test_swizzle() {
		let mut frame = Frame::default();
		frame.faces = vec![
			Face {
				vertex_index: [1, 2, 0],
				normal_index: [3, 4, 5],
				texture_index: [6, 7, 8],
			},
			face([0, 1, 2], [0; 3]),
		];
		frame.swizzle_face_vertices();

		assert_eq!(frame.faces[0].vertex_index, [0, 1, 2]);
		assert_eq!(frame.faces[0].normal_index, [5, 3, 4]);
		assert_eq!(frame.faces[0].texture_index, [8, 6, 7]);
		assert_eq!(frame.faces[1].vertex_index, [0, 1, 2]);
	}

	#[test]
	fn test_duplicate_verts() {
		let mut frame = Frame::default();
		frame.verts = vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0), v(0.0, 0.0, 1.0)];
		frame.normals = vec![Vec3::unit_z(), Vec3::unit_x()];
		frame.faces = vec![face([0, 1, 2], [0, 0, 0]), face([0, 2, 3], [1, 0, 1])];

		let (normals, faces) = frame.duplicate_verts_with_multiple_normals();

		// vertex 0 is split, vertex 2 is shared
		assert_eq!(frame.verts.len(), 5);
		assert_eq!(faces, vec![[0, 1, 2], [3, 2, 4]]);
		assert_eq!(frame.faces[1].vertex_index, [0, 2, 3]);
		assert_eq!(frame.verts[0], frame.verts[3]);
		assert_eq!(frame.verts[4], v(0.0, 0.0, 1.0));
		assert_eq!(normals, vec![Vec3::unit_z(), Vec3::unit_z(), Vec3::unit_z(), Vec3::unit_x(),
			Vec3::unit_x()]);
	}

	#[test]
	fn test_to_mesh_many_corners() {
		// every corner gets its own normal, so the mesh ends up with more vertices than a file can index
		let num_normals = MAX_INDICES - 1;
		let mut frame = Frame::default();
		frame.verts = vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0), v(0.0, 0.0, 1.0)];
		frame.normals = vec![Vec3::unit_z(); num_normals];
		frame.faces = (0..11000).map(|k| {
			let n = |i: usize| ((3 * k + i) % num_normals) as i16;
			face([1, 2, 3], [n(0), n(1), n(2)])
		}).collect();

		let mesh = frame.to_mesh("big", &ConvertCfg::default()).unwrap();
		assert_eq!(mesh.positions.len(), 33000);
		assert_eq!(mesh.normals.len(), 33000);
		assert_eq!(mesh.faces.len(), 11000);
		assert_eq!(mesh.faces[10999].vertices, [32997, 32998, 32999]);
		assert_eq!(mesh.positions[32999], v(0.0, 0.0, 1.0));
	}

	#[test]
	fn test_to_mesh() {
		let mut frame = Frame::default();
		frame.verts = vec![v(0.0, 0.0, 0.0), v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0)];
		frame.normals = vec![Vec3::unit_z()];
		frame.texcoords = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
		frame.faces = vec![
			Face {
				vertex_index: [1, 2, 0],
				normal_index: [0, 0, 0],
				texture_index: [1, 2, 0],
			},
			face([1, 1, 2], [0; 3]),
		];

		let mesh = frame.clone().to_mesh("tri", &ConvertCfg::default()).unwrap();
		assert_eq!(mesh.faces.len(), 1);
		assert_eq!(mesh.faces[0].vertices, [0, 1, 2]);
		assert_eq!(mesh.positions, vec![v(1.0, 0.0, 0.0), v(0.0, 1.0, 0.0), v(0.0, 0.0, 0.0)]);
		assert_eq!(mesh.normals, vec![Vec3::unit_z(); 3]);

		let cfg = ConvertCfg {
			flags: ConvertFlag::NONZERO_LAST_INDEX,
		};
		let mesh = frame.to_mesh("tri", &cfg).unwrap();
		assert_eq!(mesh.faces[0].texcoords, [0, 1, 2]);
		assert_eq!(mesh.positions[0], v(0.0, 0.0, 0.0));
	}

	#[test]
	fn test_to_mesh_bad_index() {
		let mut frame = Frame::default();
		frame.verts = vec![Vec3::zero(); 2];
		frame.normals = vec![Vec3::unit_z()];
		frame.faces = vec![face([0, 1, 2], [0; 3])];

		assert!(matches!(frame.to_mesh("bad", &ConvertCfg::default()),
			Err(JoeError::IndexRange("vertex", 2, 2))));
	}
}
