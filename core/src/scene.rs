//! Geometry exchanged with the host editor.
//!
//! Encoders consume already-triangulated [`Triangle`]s; decoders hand back a [`Mesh`] with one normal per
//! vertex, which is the shape most editors build their meshes from.

use ultraviolet::vec::{
	Vec2,
	Vec3
};

/// Normals of a triangle
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shading {
	/// One face normal shared by all three corners
	Flat(Vec3),
	/// One normal per corner
	Smooth([Vec3; 3]),
}

/// A triangle as supplied by the host
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
	pub positions: [Vec3; 3],
	pub shading: Shading,
	/// Corner coordinates from the first UV layer, if the mesh has one
	pub uvs: Option<[Vec2; 3]>,
}

impl Triangle {
	pub fn new(positions: [Vec3; 3], shading: Shading, uvs: Option<[Vec2; 3]>) -> Triangle {
		Triangle {
			positions: positions,
			shading: shading,
			uvs: uvs,
		}
	}

	pub fn is_smooth(&self) -> bool {
		matches!(self.shading, Shading::Smooth(_))
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Face {
	/// Indices into [`Mesh::positions`] and [`Mesh::normals`]
	pub vertices: [usize; 3],
	/// Indices into [`Mesh::texcoords`], meaningless if the mesh has none
	pub texcoords: [usize; 3],
}

/// A decoded mesh, ready to be turned into a host object
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
	pub name: String,
	pub positions: Vec<Vec3>,
	/// Per vertex, parallel to `positions`
	pub normals: Vec<Vec3>,
	pub texcoords: Vec<Vec2>,
	pub faces: Vec<Face>,
}

impl Mesh {
	pub fn new(name: &str) -> Mesh {
		Mesh {
			name: name.to_string(),
			..Default::default()
		}
	}

	pub fn has_texcoords(&self) -> bool {
		!self.texcoords.is_empty()
	}

	/// Converts the mesh back into smooth shaded triangles
	pub fn triangles(&self) -> Vec<Triangle> {
		self.faces.iter().map(|f| {
			let uvs = if self.has_texcoords() {
				Some([self.texcoords[f.texcoords[0]], self.texcoords[f.texcoords[1]],
					self.texcoords[f.texcoords[2]]])
			} else {
				None
			};

			Triangle {
				positions: [self.positions[f.vertices[0]], self.positions[f.vertices[1]],
					self.positions[f.vertices[2]]],
				shading: Shading::Smooth([self.normals[f.vertices[0]], self.normals[f.vertices[1]],
					self.normals[f.vertices[2]]]),
				uvs: uvs,
			}
		}).collect()
	}
}

#[cfg(test)]
mod tests {
	use ultraviolet::vec::{
		Vec2,
		Vec3
	};

	use super::*;

	#[test]
	fn test_triangles() {
		let mut mesh = Mesh::new("quad");
		mesh.positions = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
		mesh.normals = vec![Vec3::unit_z(); 3];
		mesh.texcoords = vec![Vec2::new(0.5, 0.5)];
		mesh.faces = vec![Face {
			vertices: [2, 1, 0],
			texcoords: [0, 0, 0],
		}];

		let tris = mesh.triangles();
		assert_eq!(tris.len(), 1);
		assert_eq!(tris[0].positions[0], Vec3::new(0.0, 1.0, 0.0));
		assert_eq!(tris[0].uvs, Some([Vec2::new(0.5, 0.5); 3]));
		assert!(tris[0].is_smooth());

		mesh.texcoords.clear();
		assert_eq!(mesh.triangles()[0].uvs, None);
	}
}
