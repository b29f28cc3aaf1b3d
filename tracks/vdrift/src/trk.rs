//! Road splines (`.trk`).
//!
//! A road is a chain of patches, each a 4x4 grid of control points. Row 0 of patch `i` and row 3 of patch
//! `i - 1` lie on the same cross section; rows 1 and 2 only carry tangents and are derived from the
//! neighbouring cross sections whenever a road is encoded or built from a mesh. Decoding keeps the rows found in
//! the file.

use log::debug;

use nom::character::complete::u32;

use std::{
	fmt::Write as _,
	fs,
	io,
	path::Path
};

use thiserror::Error;

use ultraviolet::vec::{
	Vec2,
	Vec3
};

use vdk_core::nom_ext::{
	line,
	vec3ws,
	ws
};

use crate::{
	content_lines,
	parse_line
};

/// Maximum distance between the two ends of a closed road
pub const CLOSED_EPSILON: f32 = 1e-3;

#[derive(Debug, Error)]
pub enum RoadError {
	#[error("I/O error")]
	IO {
		#[from]
		source: io::Error,
	},
	#[error("Unexpected end of file")]
	Truncated,
	#[error("Syntax error on line {0}: {1:?}")]
	Syntax(usize, String),
	#[error("Road mesh {0} has {1} vertices, expected a multiple of 4 and at least 8")]
	VertexCount(String, usize),
	#[error("Road mesh {0} refers to vertex {1}, which does not exist")]
	VertexIndex(String, usize),
	#[error("Road mesh {0} is not made of quads")]
	NotQuad(String),
	#[error("Road mesh {0} has no uv coordinates")]
	NoTexCoords(String),
	#[error("Road mesh {0} has a uv coordinate out of range: {1:?}")]
	TexCoordRange(String, Vec2),
	#[error("Road mesh {name} has no point for patch {patch}, row {row}, column {column}")]
	MissingPoint {
		name: String,
		patch: usize,
		row: usize,
		column: usize,
	},
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Patch {
	pub rows: [[Vec3; 4]; 4],
}

impl Patch {
	/// A patch spanning two cross sections, with its middle rows still underived
	pub fn new(first: [Vec3; 4], last: [Vec3; 4]) -> Patch {
		Patch {
			rows: [first, [Vec3::zero(); 4], [Vec3::zero(); 4], last],
		}
	}

	/// Places middle row `row` (1 or 2) on the straight line between the end rows
	pub fn set_middlerow(&mut self, row: usize) {
		let scale = row as f32 / 3.0;
		for n in 0..4 {
			let (first, last) = (self.rows[0][n], self.rows[3][n]);
			self.rows[row][n] = first + (last - first) * scale;
		}
	}

	#[cfg(feature = "import")]
	fn read<'a, I>(lines: &mut I) -> Result<Patch, RoadError>
	where
		I: Iterator<Item = (usize, &'a str)>,
	{
		let mut patch = Patch::default();

		// stored last row first
		for row in (0..4).rev() {
			for n in 0..4 {
				let p = parse_line(lines, line(vec3ws)).map_err(RoadError::from_line)?;
				patch.rows[row][n] = Vec3::new(p.z, p.x, p.y);
			}
		}

		Ok(patch)
	}

	#[cfg(feature = "export")]
	fn write(&self, out: &mut String) {
		for row in self.rows.iter().rev() {
			for p in row.iter() {
				let _ = writeln!(out, "{:.4} {:.4} {:.4}", p.y, p.z, p.x);
			}
		}
		out.push('\n');
	}
}

/// Joins `patches[i0]` to `patches[i1]`, giving both the same tangent where they meet.
///
/// The tangent runs from the start of `i0` to the end of `i1`, and each side reaches a third of the shorter
/// patch length along it.
pub fn attach_patches(patches: &mut [Patch], i0: usize, i1: usize) {
	for n in 0..4 {
		let p0 = patches[i0].rows;
		let p1 = patches[i1].rows;

		let slope = p1[3][n] - p0[0][n];
		let slope = match slope.mag() {
			mag if mag > 0.0 => slope / mag,
			_ => Vec3::zero(),
		};
		let len0 = (p0[3][n] - p0[0][n]).mag();
		let len1 = (p1[3][n] - p1[0][n]).mag();
		let scale = len0.min(len1) / 3.0;

		patches[i0].rows[2][n] = p0[3][n] - slope * scale;
		patches[i1].rows[1][n] = p1[0][n] + slope * scale;
	}
}

/// A polygon of a road mesh, with one uv coordinate per corner
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
	pub vertices: Vec<usize>,
	pub uvs: Vec<Vec2>,
}

/// Editable form of a road: one vertex per control point on a cross section, three quads per patch.
///
/// The uv coordinates locate each corner on the road, `u * 3` giving the column and `v` the cross section.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoadMesh {
	pub name: String,
	pub positions: Vec<Vec3>,
	pub polygons: Vec<Polygon>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Road {
	pub patches: Vec<Patch>,
}

impl Road {
	/// Whether the last patch ends where the first one starts
	pub fn is_closed(&self) -> bool {
		match (self.patches.first(), self.patches.last()) {
			(Some(first), Some(last)) => (first.rows[0][0] - last.rows[3][0]).mag() < CLOSED_EPSILON,
			_ => false,
		}
	}

	/// Derives the middle rows of every patch from the end rows
	pub fn derive(&mut self) {
		let num = self.patches.len();
		if num == 0 {
			return;
		}

		for i in 0..(num - 1) {
			attach_patches(&mut self.patches, i, i + 1);
		}

		if self.is_closed() {
			attach_patches(&mut self.patches, num - 1, 0);
		} else {
			self.patches[0].set_middlerow(1);
			self.patches[num - 1].set_middlerow(2);
		}
	}

	/// Collects the cross sections of a road mesh and derives the patches between them
	pub fn from_mesh(mesh: &RoadMesh) -> Result<Road, RoadError> {
		let num_verts = mesh.positions.len();
		if num_verts < 8 || num_verts % 4 != 0 {
			return Err(RoadError::VertexCount(mesh.name.clone(), num_verts));
		}
		let num_patches = num_verts / 4 - 1;

		// cross section i is row 0 of patch i and row 3 of patch i - 1
		let mut sections: Vec<[Option<Vec3>; 4]> = vec![[None; 4]; num_patches + 1];

		for poly in mesh.polygons.iter() {
			if poly.vertices.len() != 4 {
				return Err(RoadError::NotQuad(mesh.name.clone()));
			}
			if poly.uvs.len() != poly.vertices.len() {
				return Err(RoadError::NoTexCoords(mesh.name.clone()));
			}

			for (&vi, &uv) in poly.vertices.iter().zip(poly.uvs.iter()) {
				let column = (uv.x * 3.0).round();
				let section = uv.y.round();
				if !(0.0..=3.0).contains(&column) || !(0.0..=num_patches as f32).contains(&section) {
					return Err(RoadError::TexCoordRange(mesh.name.clone(), uv));
				}

				let position = mesh.positions.get(vi).ok_or_else(|| RoadError::VertexIndex(mesh.name.clone(), vi))?;
				sections[section as usize][column as usize] = Some(*position);
			}
		}

		let section = |i: usize, patch: usize, row: usize| -> Result<[Vec3; 4], RoadError> {
			let mut points = [Vec3::zero(); 4];
			for (column, p) in sections[i].iter().enumerate() {
				points[column] = p.ok_or_else(|| RoadError::MissingPoint {
					name: mesh.name.clone(),
					patch: patch,
					row: row,
					column: column,
				})?;
			}
			Ok(points)
		};

		let mut road = Road::default();
		for i in 0..num_patches {
			road.patches.push(Patch::new(section(i, i, 0)?, section(i + 1, i, 3)?));
		}
		road.derive();

		debug!("{}: {} patches, closed: {}", mesh.name, num_patches, road.is_closed());

		Ok(road)
	}

	/// Builds the editable mesh from the end rows of every patch
	pub fn to_mesh(&self, name: &str) -> RoadMesh {
		let mut mesh = RoadMesh {
			name: name.to_string(),
			..Default::default()
		};

		let last = match self.patches.last() {
			Some(last) => last,
			None => return mesh,
		};

		// columns run backwards along the vertices
		let sections = self.patches.iter().map(|p| &p.rows[0]).chain(std::iter::once(&last.rows[3]));
		for row in sections {
			mesh.positions.extend(row.iter().rev());
		}

		for p in 0..self.patches.len() {
			for n in 0..3 {
				let vi = p * 4 + n;
				let (u, v) = (1.0 - n as f32 / 3.0, p as f32);
				mesh.polygons.push(Polygon {
					vertices: vec![vi, vi + 4, vi + 5, vi + 1],
					uvs: vec![Vec2::new(u, v), Vec2::new(u, v + 1.0), Vec2::new(u - 1.0 / 3.0, v + 1.0),
						Vec2::new(u - 1.0 / 3.0, v)],
				});
			}
		}

		mesh
	}

	#[cfg(feature = "import")]
	fn read<'a, I>(lines: &mut I) -> Result<Road, RoadError>
	where
		I: Iterator<Item = (usize, &'a str)>,
	{
		let num = parse_line(lines, line(ws(u32))).map_err(RoadError::from_line)?;

		let mut road = Road::default();
		for _ in 0..num {
			road.patches.push(Patch::read(lines)?);
		}

		Ok(road)
	}

	/// Writes the road with freshly derived middle rows
	#[cfg(feature = "export")]
	fn write(&self, out: &mut String) {
		let mut road = self.clone();
		road.derive();

		let _ = write!(out, "{}\n\n", road.patches.len());
		for patch in road.patches.iter() {
			patch.write(out);
		}
	}
}

impl RoadError {
	#[cfg(feature = "import")]
	fn from_line(line: Option<(usize, String)>) -> RoadError {
		match line {
			Some((i, text)) => RoadError::Syntax(i, text),
			None => RoadError::Truncated,
		}
	}
}

/// Encodes a single road block: the patch count, a blank line and the patches
#[cfg(feature = "export")]
pub fn encode_road(road: &Road) -> String {
	let mut out = String::new();
	road.write(&mut out);
	out
}

#[cfg(feature = "import")]
pub fn decode_road(text: &str) -> Result<Road, RoadError> {
	Road::read(&mut content_lines(text))
}

/// Encodes a whole `.trk` file
#[cfg(feature = "export")]
pub fn encode_roads(roads: &[Road]) -> String {
	let mut out = format!("{}\n\n", roads.len());
	for road in roads.iter() {
		road.write(&mut out);
	}
	out
}

#[cfg(feature = "import")]
pub fn decode_roads(text: &str) -> Result<Vec<Road>, RoadError> {
	let mut lines = content_lines(text);
	let num = parse_line(&mut lines, line(ws(u32))).map_err(RoadError::from_line)?;

	let mut roads = vec![];
	for _ in 0..num {
		roads.push(Road::read(&mut lines)?);
	}

	Ok(roads)
}

#[cfg(feature = "import")]
pub fn load<P>(path: P) -> Result<Vec<Road>, RoadError>
where
	P: AsRef<Path>,
{
	decode_roads(&fs::read_to_string(path)?)
}

#[cfg(feature = "export")]
pub fn save<P>(path: P, roads: &[Road]) -> Result<(), RoadError>
where
	P: AsRef<Path>,
{
	Ok(fs::write(path, encode_roads(roads))?)
}
