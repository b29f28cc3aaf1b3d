//! Track properties (`track.txt`).

use std::{
	collections::BTreeMap,
	fmt::Write as _,
	fs,
	io,
	path::Path
};

use log::warn;

use nom::IResult;

use thiserror::Error;

use ultraviolet::vec::Vec3;

use vdk_core::nom_ext::{
	key_value,
	line,
	vec3cs
};

use crate::content_lines;

pub const DEG_TO_RAD: f32 = 0.0174532925;
pub const RAD_TO_DEG: f32 = 57.2957795;

const DEFAULTS: [(&str, &str); 4] = [
	("cull faces", "on"),
	("vertical tracking skyboxes", "no"),
	("non-treaded friction coefficient", "1.0"),
	("treaded friction coefficient", "0.9"),
];

const LAP_SEQUENCE: &str = "lap sequence ";
const LAP_SEQUENCES: &str = "lap sequences";
const START_POSITION: &str = "start position ";
const START_ORIENTATION: &str = "start orientation ";

#[derive(Debug, Error)]
pub enum TrackError {
	#[error("I/O error")]
	IO {
		#[from]
		source: io::Error,
	},
	#[error("Syntax error on line {0}: {1:?}")]
	Syntax(usize, String),
	#[error("Invalid {1} on line {0}: {2:?}")]
	Value(usize, &'static str, String),
}

/// Where a lap starts, as a road and patch index
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LapSequence {
	pub road: i32,
	pub patch: i32,
}

/// A starting grid slot, in editor axes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StartPosition {
	pub location: Vec3,
	/// Euler angles in radians
	pub rotation: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackInfo {
	/// Generic `name = value` pairs in file order
	pub properties: Vec<(String, String)>,
	pub laps: BTreeMap<u32, LapSequence>,
	pub starts: BTreeMap<u32, StartPosition>,
}

impl Default for TrackInfo {
	fn default() -> Self {
		TrackInfo {
			properties: DEFAULTS.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
			laps: BTreeMap::new(),
			starts: BTreeMap::new(),
		}
	}
}

/// File axes `(x, y, z)` as editor axes
fn from_file_axes(v: Vec3) -> Vec3 {
	Vec3::new(v.z, v.x, v.y)
}

fn to_file_axes(v: Vec3) -> Vec3 {
	Vec3::new(v.y, v.z, v.x)
}

/// Index of a numbered key such as `lap sequence 2`
fn key_index(n: usize, key: &str, prefix: &str) -> Result<u32, TrackError> {
	key[prefix.len()..].trim().parse().map_err(|_| TrackError::Value(n, "index", key.to_string()))
}

/// Integer part of a possibly fractional number
fn integer_part(n: usize, value: &str) -> Result<i32, TrackError> {
	let int = value.split('.').next().unwrap_or(value).trim();
	int.parse().map_err(|_| TrackError::Value(n, "lap sequence", value.to_string()))
}

impl TrackInfo {
	pub fn get(&self, name: &str) -> Option<&str> {
		self.properties.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
	}

	/// Sets a property, keeping its position if it already exists
	pub fn set(&mut self, name: &str, value: &str) {
		match self.properties.iter_mut().find(|(k, _)| k == name) {
			Some((_, v)) => *v = value.to_string(),
			None => self.properties.push((name.to_string(), value.to_string())),
		}
	}

	#[cfg(feature = "import")]
	pub fn parse(text: &str) -> Result<TrackInfo, TrackError> {
		let mut info = TrackInfo::default();

		for (i, text) in content_lines(text) {
			let parsed: IResult<&str, (&str, &str)> = line(key_value('='))(text);
			let (name, value) = parsed.map(|(_, kv)| kv).map_err(|_| TrackError::Syntax(i, text.to_string()))?;

			if name == LAP_SEQUENCES {
				continue;
			} else if name.starts_with(LAP_SEQUENCE) {
				let index = key_index(i, name, LAP_SEQUENCE)?;
				let mut fields = value.splitn(3, ',');
				let road = integer_part(i, fields.next().unwrap_or(""))?;
				let patch = integer_part(i, fields.next().unwrap_or(""))?;
				info.laps.insert(index, LapSequence {
					road: road,
					patch: patch,
				});
			} else if name.starts_with(START_POSITION) {
				let index = key_index(i, name, START_POSITION)?;
				let location = parse_vec(i, "start position", value)?;
				info.starts.entry(index).or_default().location = from_file_axes(location);
			} else if name.starts_with(START_ORIENTATION) {
				let index = key_index(i, name, START_ORIENTATION)?;
				let degrees = parse_vec(i, "start orientation", value)?;
				info.starts.entry(index).or_default().rotation = from_file_axes(degrees * DEG_TO_RAD);
			} else {
				info.set(name, value);
			}
		}

		Ok(info)
	}

	#[cfg(feature = "export")]
	pub fn write(&self) -> String {
		let mut out = String::new();

		for (k, v) in self.properties.iter() {
			let _ = writeln!(out, "{} = {}", k, v);
		}

		let _ = writeln!(out, "{} = {}", LAP_SEQUENCES, self.laps.len());
		for (i, lap) in self.laps.iter() {
			let _ = writeln!(out, "{}{} = {},{},0", LAP_SEQUENCE, i, lap.road, lap.patch);
		}

		for (i, start) in self.starts.iter() {
			let p = to_file_axes(start.location);
			let _ = writeln!(out, "{}{} = {:.4},{:.4},{:.4}", START_POSITION, i, p.x, p.y, p.z);
			let r = to_file_axes(start.rotation * RAD_TO_DEG);
			let _ = writeln!(out, "{}{} = {:.2},{:.2},{:.2}", START_ORIENTATION, i, r.x, r.y, r.z);
		}

		out
	}

	#[cfg(feature = "import")]
	pub fn load<P>(path: P) -> Result<TrackInfo, TrackError>
	where
		P: AsRef<Path>,
	{
		TrackInfo::parse(&fs::read_to_string(path)?)
	}

	#[cfg(feature = "export")]
	pub fn save<P>(&self, path: P) -> Result<(), TrackError>
	where
		P: AsRef<Path>,
	{
		if self.starts.is_empty() {
			warn!("Track has no start positions");
		}

		Ok(fs::write(path, self.write())?)
	}
}

#[cfg(feature = "import")]
fn parse_vec(n: usize, what: &'static str, value: &str) -> Result<Vec3, TrackError> {
	let parsed: IResult<&str, Vec3> = line(vec3cs)(value);
	parsed.map(|(_, v)| v).map_err(|_| TrackError::Value(n, what, value.to_string()))
}
