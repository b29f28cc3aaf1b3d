//! `list.txt`, the per-object property list stored next to a JPK.

use bitflags::bitflags;

use std::fmt::{
	self,
	Display,
	Formatter
};

use crate::JpkError;

pub const NUM_FIELDS: usize = 17;

pub const FIELD_NAMES: [&str; NUM_FIELDS] = ["model", "texture", "mipmap", "lighting", "skybox", "blend",
	"bump length", "bump amplitude", "drivable", "collidable", "non treaded", "treaded",
	"roll resistance", "roll drag", "shadow", "clamp", "surface"];

const DEFAULTS: [&str; NUM_FIELDS] = ["none", "none", "1", "0", "0", "0", "1.0", "0.0", "0", "0", "1.0",
	"0.9", "1.0", "0.0", "0", "0", "0"];

/// Rendering and physics properties of one track object
#[derive(Clone, Debug, PartialEq)]
pub struct TrackObject {
	pub values: [String; NUM_FIELDS],
}

impl Default for TrackObject {
	fn default() -> Self {
		TrackObject {
			values: DEFAULTS.map(|s| s.to_string()),
		}
	}
}

impl TrackObject {
	pub fn new(model: &str, texture: &str) -> TrackObject {
		let mut obj = TrackObject::default();
		obj.values[0] = model.to_string();
		obj.values[1] = texture.to_string();
		obj
	}

	pub fn model(&self) -> &str {
		&self.values[0]
	}

	pub fn texture(&self) -> &str {
		&self.values[1]
	}

	/// Looks a field up by its name in [`FIELD_NAMES`]
	pub fn get(&self, field: &str) -> Option<&str> {
		FIELD_NAMES.iter().position(|f| *f == field).map(|i| self.values[i].as_str())
	}

	pub fn set(&mut self, field: &str, value: &str) -> bool {
		match FIELD_NAMES.iter().position(|f| *f == field) {
			Some(i) => {
				self.values[i] = value.to_string();
				true
			},
			None => false,
		}
	}
}

impl Display for TrackObject {
	/// One value per line, followed by a blank line
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		for v in self.values.iter() {
			writeln!(f, "{}", v)?;
		}
		writeln!(f)
	}
}

bitflags! {
	/// Boolean properties of a track object, as editor groups see them
	pub struct ObjectFlag: u32 {
		const MIPMAP = 1;
		const NO_LIGHTING = 2;
		const SKYBOX = 4;
		const TRANSPARENT = 8;
		const DOUBLE_SIDED = 16;
		const COLLIDABLE = 32;
		const SHADOW = 64;
		const CLAMP_U = 128;
		const CLAMP_V = 256;
	}
}

impl Default for ObjectFlag {
	fn default() -> Self {
		ObjectFlag::empty()
	}
}

/// Typed view of the grouping fields of a [`TrackObject`]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ObjectGroups {
	pub flags: ObjectFlag,
	pub surface: u32,
}

impl ObjectGroups {
	pub fn from_record(obj: &TrackObject) -> Result<ObjectGroups, JpkError> {
		let v = &obj.values;
		let mut flags = ObjectFlag::empty();

		flags.set(ObjectFlag::MIPMAP, v[2] == "1");
		flags.set(ObjectFlag::NO_LIGHTING, v[3] == "1");
		flags.set(ObjectFlag::SKYBOX, v[4] == "1");
		flags.set(ObjectFlag::TRANSPARENT, v[5] == "1");
		flags.set(ObjectFlag::DOUBLE_SIDED, v[5] == "2");
		flags.set(ObjectFlag::COLLIDABLE, v[8] == "1" || v[9] == "1");
		flags.set(ObjectFlag::SHADOW, v[14] == "1");
		flags.set(ObjectFlag::CLAMP_U, v[15] == "1" || v[15] == "3");
		flags.set(ObjectFlag::CLAMP_V, v[15] == "2" || v[15] == "3");

		let surface = v[16].trim().parse()
			.map_err(|_| JpkError::Field(obj.model().to_string(), "surface", v[16].clone()))?;

		Ok(ObjectGroups {
			flags: flags,
			surface: surface,
		})
	}

	/// Writes the groups back into `obj`.
	///
	/// Collidability only ever sets the `collidable` field, `drivable` is left alone.
	pub fn apply(&self, obj: &mut TrackObject) {
		let bit = |flag| (if self.flags.contains(flag) { "1" } else { "0" }).to_string();

		obj.values[2] = bit(ObjectFlag::MIPMAP);
		obj.values[3] = bit(ObjectFlag::NO_LIGHTING);
		obj.values[4] = bit(ObjectFlag::SKYBOX);
		let blend = if self.flags.contains(ObjectFlag::TRANSPARENT) {
			"1"
		} else if self.flags.contains(ObjectFlag::DOUBLE_SIDED) {
			"2"
		} else {
			"0"
		};
		obj.values[5] = blend.to_string();
		obj.values[9] = bit(ObjectFlag::COLLIDABLE);
		obj.values[14] = bit(ObjectFlag::SHADOW);

		let clamp = (self.flags & (ObjectFlag::CLAMP_U | ObjectFlag::CLAMP_V)).bits() >> 7;
		obj.values[15] = clamp.to_string();
		obj.values[16] = self.surface.to_string();
	}
}

/// Parses the records of a `list.txt`, in file order.
///
/// Records start at any non-comment line mentioning `.joe`; the leading field count is ignored.
#[cfg(feature = "import")]
pub fn parse_list(text: &str) -> Result<Vec<TrackObject>, JpkError> {
	let mut objects = vec![];
	let mut current: Option<(TrackObject, usize)> = None;

	for line in text.lines() {
		if line.contains(".joe") && !line.starts_with('#') {
			if let Some((obj, _)) = current.take() {
				objects.push(obj);
			}

			let mut obj = TrackObject::default();
			obj.values[0] = line.trim().to_string();
			current = Some((obj, 0));
		} else if line.starts_with('#') || line.trim().is_empty() {
			continue;
		} else if let Some((obj, i)) = current.as_mut() {
			*i += 1;
			if *i >= NUM_FIELDS {
				return Err(JpkError::Fields(obj.model().to_string()));
			}
			obj.values[*i] = line.trim().to_string();
		}
	}

	if let Some((obj, _)) = current {
		objects.push(obj);
	}

	Ok(objects)
}

/// Formats records as a `list.txt`
#[cfg(feature = "export")]
pub fn format_list<'a, I>(objects: I) -> String
where
	I: IntoIterator<Item = &'a TrackObject>,
{
	let mut s = format!("{}\n\n", NUM_FIELDS);

	for (i, obj) in objects.into_iter().enumerate() {
		s.push_str(&format!("#entry {}\n{}", i, obj));
	}

	s
}
