//! Car rigs (`.car`), enough of them to place wheels and suspension in an editor.

use std::{
	collections::BTreeMap,
	fs,
	io,
	path::Path
};

use log::{
	debug,
	warn
};

use nom::{
	bytes::complete::take_till,
	character::complete::char,
	IResult,
	sequence::delimited
};

use thiserror::Error;

use ultraviolet::vec::Vec3;

use vdk_core::{
	nom_ext::{
		key_value,
		line,
		vec3cs,
		ws
	},
	scene::Mesh
};

use vdk_models_vdrift::joe::JoeError;

#[cfg(feature = "import")]
use vdk_models_vdrift::{
	ConvertCfg,
	decode_object
};

use crate::content_lines;

pub const WHEELS: [&str; 4] = ["wheel.fl", "wheel.fr", "wheel.rl", "wheel.rr"];

/// Body model, next to the car file
pub const BODY_NAME: &str = "body.joe";

#[derive(Debug, Error)]
pub enum CarError {
	#[error("I/O error")]
	IO {
		#[from]
		source: io::Error,
	},
	#[error("Syntax error on line {0}: {1:?}")]
	Syntax(usize, String),
	#[error("Missing section [{0}]")]
	Section(String),
	#[error("Missing {1} in [{0}]")]
	Key(String, &'static str),
	#[error("Invalid {key} in [{section}]: {value:?}")]
	Value {
		section: String,
		key: &'static str,
		value: String,
	},
	#[error("Car body")]
	Body {
		#[from]
		source: JoeError,
	},
}

/// Sections of an INI style file, each a map of keys to raw values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ini {
	pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Ini {
	pub fn parse(text: &str) -> Result<Ini, CarError> {
		let mut ini = Ini::default();
		let mut current: Option<String> = None;

		for (i, text) in content_lines(text) {
			let trimmed = text.trim_start();
			if trimmed.starts_with('#') || trimmed.starts_with(';') {
				continue;
			}

			let header: IResult<&str, &str> =
				line(ws(delimited(char('['), take_till(|c: char| c == ']'), char(']'))))(text);
			if let Ok((_, name)) = header {
				ini.sections.entry(name.trim().to_string()).or_default();
				current = Some(name.trim().to_string());
				continue;
			}

			let entry: IResult<&str, (&str, &str)> = key_value('=')(text);
			match (entry, current.as_ref()) {
				(Ok((_, (key, value))), Some(section)) => {
					ini.sections.entry(section.clone()).or_default().insert(key.to_string(), value.to_string());
				},
				_ => return Err(CarError::Syntax(i, text.to_string())),
			}
		}

		Ok(ini)
	}

	pub fn section(&self, name: &str) -> Result<&BTreeMap<String, String>, CarError> {
		self.sections.get(name).ok_or_else(|| CarError::Section(name.to_string()))
	}

	/// Reads a comma-separated vector from `[section] key`
	pub fn vec3(&self, section: &str, key: &'static str) -> Result<Vec3, CarError> {
		let value = self.section(section)?
			.get(key)
			.ok_or_else(|| CarError::Key(section.to_string(), key))?;

		let parsed: IResult<&str, Vec3> = line(vec3cs)(value);
		parsed.map(|(_, v)| v).map_err(|_| CarError::Value {
			section: section.to_string(),
			key: key,
			value: value.clone(),
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SuspensionKind {
	DoubleWishbone,
	MacphersonStrut,
	Hinge,
}

impl SuspensionKind {
	pub fn suffix(&self) -> &'static str {
		match self {
			SuspensionKind::DoubleWishbone => "double-wishbone",
			SuspensionKind::MacphersonStrut => "macpherson-strut",
			SuspensionKind::Hinge => "hinge",
		}
	}

	/// Point keys in output order, and the edges joining them
	fn layout(&self) -> (&'static [&'static str], &'static [[usize; 2]]) {
		match self {
			SuspensionKind::DoubleWishbone => (
				&["upper-chassis-front", "upper-hub", "upper-chassis-rear", "lower-chassis-front", "lower-hub",
					"lower-chassis-rear"],
				&[[0, 1], [1, 2], [2, 0], [3, 4], [4, 5], [5, 3], [1, 4]],
			),
			SuspensionKind::MacphersonStrut => (&["hinge", "strut-end", "strut-top"], &[[0, 1], [1, 2]]),
			SuspensionKind::Hinge => (&["wheel", "chassis"], &[[0, 1]]),
		}
	}
}

/// Suspension geometry as a wireframe
#[derive(Clone, Debug, PartialEq)]
pub struct Suspension {
	pub kind: SuspensionKind,
	/// Section the geometry came from, such as `wheel.fl.hinge`
	pub name: String,
	pub points: Vec<Vec3>,
	pub edges: Vec<[usize; 2]>,
}

impl Suspension {
	/// Reads the first suspension type present for `wheel`
	pub fn read(ini: &Ini, wheel: &str) -> Result<Suspension, CarError> {
		let kinds = [SuspensionKind::DoubleWishbone, SuspensionKind::MacphersonStrut, SuspensionKind::Hinge];
		let (kind, name) = kinds.iter()
			.map(|k| (*k, format!("{}.{}", wheel, k.suffix())))
			.find(|(_, name)| ini.sections.contains_key(name))
			.ok_or_else(|| CarError::Section(format!("{}.{}", wheel, SuspensionKind::Hinge.suffix())))?;

		let (keys, edges) = kind.layout();
		let points = keys.iter().map(|key| ini.vec3(&name, *key)).collect::<Result<Vec<_>, _>>()?;

		Ok(Suspension {
			kind: kind,
			name: name,
			points: points,
			edges: edges.to_vec(),
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Wheel {
	pub name: String,
	pub position: Vec3,
	/// Tire width in meters
	pub width: f32,
	/// Outer tire radius in meters
	pub radius: f32,
	pub suspension: Suspension,
}

impl Wheel {
	pub fn read(ini: &Ini, name: &str) -> Result<Wheel, CarError> {
		let position = ini.vec3(name, "position")?;

		// width in mm, aspect ratio in percent, rim diameter in inches
		let size = ini.vec3(&format!("{}.tire", name), "size")?;
		let width = size.x * 0.001;
		let radius = size.z * 0.5 * 0.0254 + width * size.y * 0.01;

		Ok(Wheel {
			name: name.to_string(),
			position: position,
			width: width,
			radius: radius,
			suspension: Suspension::read(ini, name)?,
		})
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct CarRig {
	pub wheels: Vec<Wheel>,
	/// One mesh per frame of the body model, if there is one
	pub body: Option<Vec<Mesh>>,
}

impl CarRig {
	pub fn from_ini(ini: &Ini) -> Result<CarRig, CarError> {
		let wheels = WHEELS.iter().map(|name| Wheel::read(ini, name)).collect::<Result<Vec<_>, _>>()?;

		for w in wheels.iter() {
			debug!("{}: radius {}, {:?} suspension", w.name, w.radius, w.suspension.kind);
		}

		Ok(CarRig {
			wheels: wheels,
			body: None,
		})
	}

	/// Loads a car file along with the body model in the same directory
	#[cfg(feature = "import")]
	pub fn load<P>(path: P) -> Result<CarRig, CarError>
	where
		P: AsRef<Path>,
	{
		let path = path.as_ref();
		let mut rig = decode_car(&fs::read_to_string(path)?)?;

		let body_path = path.with_file_name(BODY_NAME);
		match fs::read(&body_path) {
			Ok(data) => rig.body = Some(decode_object(BODY_NAME, &data, &ConvertCfg::default())?),
			Err(e) if e.kind() == io::ErrorKind::NotFound => warn!("{} not found.", body_path.display()),
			Err(e) => return Err(e.into()),
		}

		Ok(rig)
	}
}

pub fn decode_car(text: &str) -> Result<CarRig, CarError> {
	CarRig::from_ini(&Ini::parse(text)?)
}

#[cfg(test)]
mod tests {
	use ultraviolet::vec::Vec3;

	use super::*;

	fn car() -> String {
		let mut text = String::from("# test car\n[engine]\npeak-engine-rpm = 7000\n\n");
		for (i, wheel) in WHEELS.iter().enumerate() {
			let x = if i % 2 == 0 { -0.8 } else { 0.8 };
			text.push_str(&format!("[{}]\nposition = {}, 1.2, -0.2 # hub\n\n", wheel, x));
			text.push_str(&format!("[{}.tire]\nsize = 225, 50, 16\n\n", wheel));
		}
		text.push_str("[wheel.fl.double-wishbone]\nupper-chassis-front = 0,0,0\nupper-hub = 1,0,0\n\
			upper-chassis-rear = 0,1,0\nlower-chassis-front = 0,0,-1\nlower-hub = 1,0,-1\n\
			lower-chassis-rear = 0,1,-1\n\n");
		text.push_str("[wheel.fr.macpherson-strut]\nhinge = 0,0,0\nstrut-end = 0,0,1\nstrut-top = 0,0,2\n\n");
		text.push_str("[wheel.rl.hinge]\nwheel = -0.8,-1.2,-0.2\nchassis = 0,-1,0\n");
		text.push_str("[wheel.rr.hinge]\nwheel = 0.8,-1.2,-0.2\nchassis = 0,-1,0\n");
		// a hinge alongside a strut loses
		text.push_str("[wheel.fr.hinge]\nwheel = 0,0,0\nchassis = 0,0,0\n");
		text
	}

	#[test]
	fn test_ini() {
		let ini = Ini::parse("; comment\n[a]\nb = c = d\n[ e ]\n").unwrap();
		assert_eq!(ini.sections["a"]["b"], "c = d");
		assert!(ini.sections["e"].is_empty());

		assert!(matches!(Ini::parse("b = c\n"), Err(CarError::Syntax(1, _))));
		assert!(matches!(Ini::parse("[a]\nnonsense\n"), Err(CarError::Syntax(2, _))));
	}

	#[test]
	fn test_wheels() {
		let rig = decode_car(&car()).unwrap();
		assert_eq!(rig.wheels.len(), 4);

		let fl = &rig.wheels[0];
		assert_eq!(fl.name, "wheel.fl");
		assert_eq!(fl.position, Vec3::new(-0.8, 1.2, -0.2));
		assert!((fl.width - 0.225).abs() < 1e-6);
		assert!((fl.radius - (16.0 * 0.5 * 0.0254 + 0.225 * 0.5)).abs() < 1e-6);
	}

	#[test]
	fn test_suspension() {
		let rig = decode_car(&car()).unwrap();

		let fl = &rig.wheels[0].suspension;
		assert_eq!(fl.kind, SuspensionKind::DoubleWishbone);
		assert_eq!(fl.points.len(), 6);
		assert_eq!(fl.points[1], Vec3::new(1.0, 0.0, 0.0));
		assert_eq!(fl.edges.len(), 7);
		assert_eq!(fl.edges[6], [1, 4]);

		let fr = &rig.wheels[1].suspension;
		assert_eq!(fr.kind, SuspensionKind::MacphersonStrut);
		assert_eq!(fr.name, "wheel.fr.macpherson-strut");
		assert_eq!(fr.points, vec![Vec3::zero(), Vec3::unit_z(), Vec3::unit_z() * 2.0]);

		let rl = &rig.wheels[2].suspension;
		assert_eq!(rl.kind, SuspensionKind::Hinge);
		assert_eq!(rl.edges, vec![[0, 1]]);
	}

	#[test]
	fn test_missing() {
		let text = car().replace("[wheel.rr.hinge]", "[wheel.rr.other]");
		assert!(matches!(decode_car(&text), Err(CarError::Section(s)) if s == "wheel.rr.hinge"));

		let text = car().replace("size = 225, 50, 16", "size = 225, 50");
		assert!(matches!(decode_car(&text), Err(CarError::Value { key: "size", .. })));

		let text = car().replace("strut-top", "strut-bottom");
		assert!(matches!(decode_car(&text), Err(CarError::Key(s, "strut-top")) if s == "wheel.fr.macpherson-strut"));
	}

	#[cfg(feature = "import")]
	#[test]
	fn test_load() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.car");
		fs::write(&path, car()).unwrap();

		let rig = CarRig::load(&path).unwrap();
		assert_eq!(rig.wheels.len(), 4);
		assert!(rig.body.is_none());
	}

	#[cfg(all(feature = "import", feature = "export"))]
	#[test]
	fn test_load_body() {
		use ultraviolet::vec::Vec2;

		use vdk_core::scene::{
			Shading,
			Triangle
		};

		use vdk_models_vdrift::encode_object;

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("test.car");
		fs::write(&path, car()).unwrap();

		let tri = Triangle::new([Vec3::zero(), Vec3::unit_x(), Vec3::unit_y()], Shading::Flat(Vec3::unit_z()),
			Some([Vec2::zero(), Vec2::unit_x(), Vec2::unit_y()]));
		let data = encode_object(&[vec![tri]], &ConvertCfg::default()).unwrap();
		fs::write(dir.path().join(BODY_NAME), data).unwrap();

		let body = CarRig::load(&path).unwrap().body.unwrap();
		assert_eq!(body.len(), 1);
		assert_eq!(body[0].name, "body");
		assert_eq!(body[0].positions, vec![Vec3::zero(), Vec3::unit_x(), Vec3::unit_y()]);

		fs::write(dir.path().join(BODY_NAME), b"JPK01.00").unwrap();
		assert!(matches!(CarRig::load(&path), Err(CarError::Body { source: JoeError::Ident(_) })));
	}
}
