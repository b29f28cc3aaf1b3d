use byteorder::{
	LE,
	ReadBytesExt,
	WriteBytesExt
};

use log::{
	debug,
	warn
};

use std::{
	collections::{
		BTreeMap,
		BTreeSet,
		HashMap
	},
	fs::{
		self,
		File,
		OpenOptions
	},
	io::{
		BufReader,
		BufWriter,
		Cursor,
		ErrorKind,
		Read,
		Seek,
		SeekFrom,
		Write
	},
	path::Path
};

use vdk_core::{
	io_ext::{
		ReadBinExt,
		WriteBinExt
	},
	scene::{
		Mesh,
		Triangle
	},
	texture::{
		resolve_all,
		TextureResolver
	}
};

use vdk_models_vdrift::{
	ConvertCfg,
	joe::{
		JoeError,
		JoeObject
	}
};

use crate::{
	JpkError,
	list::TrackObject
};

pub const MAGIC: &[u8; 8] = b"JPK01.00";
pub const LIST_NAME: &str = "list.txt";
/// Pack loaded when importing from something other than a `.jpk`
pub const DEFAULT_NAME: &str = "objects.jpk";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Header {
	pub numobjs: i32,
	pub maxstrlen: i32,
}

impl Header {
	#[cfg(feature = "import")]
	fn read<R>(buf: &mut R) -> Result<Header, JpkError>
	where
		R: ReadBytesExt,
	{
		let mut magic = [0; 8];
		buf.read_exact(&mut magic)?;
		if &magic != MAGIC {
			return Err(JpkError::Magic(String::from_utf8_lossy(&magic).to_string()));
		}

		let numobjs = buf.read_i32::<LE>()?;
		if numobjs < 0 {
			return Err(JpkError::Count("object count", numobjs));
		}

		let maxstrlen = buf.read_i32::<LE>()?;
		if maxstrlen < 0 {
			return Err(JpkError::Count("name length", maxstrlen));
		}

		Ok(Header {
			numobjs: numobjs,
			maxstrlen: maxstrlen,
		})
	}

	#[cfg(feature = "export")]
	fn write<W>(&self, buf: &mut W) -> Result<(), JpkError>
	where
		W: WriteBytesExt,
	{
		buf.write_all(MAGIC)?;
		buf.write_i32::<LE>(self.numobjs)?;
		buf.write_i32::<LE>(self.maxstrlen)?;

		Ok(())
	}
}

/// File allocation table entry
#[derive(Clone, Debug, PartialEq)]
pub struct FatEntry {
	/// Absolute position of the object in the pack
	pub offset: i32,
	pub length: i32,
	pub name: String,
}

impl FatEntry {
	pub fn size(maxstrlen: usize) -> usize {
		8 + maxstrlen
	}

	#[cfg(feature = "import")]
	fn read<R>(index: usize, maxstrlen: usize, buf: &mut R) -> Result<FatEntry, JpkError>
	where
		R: ReadBytesExt,
	{
		let offset = buf.read_i32::<LE>()?;
		let length = buf.read_i32::<LE>()?;
		let name = buf.read_fixed_str(maxstrlen).map_err(|e| match e.kind() {
			ErrorKind::InvalidData => JpkError::Name(index),
			_ => e.into(),
		})?;

		Ok(FatEntry {
			offset: offset,
			length: length,
			name: name,
		})
	}

	#[cfg(feature = "export")]
	fn write<W>(&self, maxstrlen: usize, buf: &mut W) -> Result<(), JpkError>
	where
		W: WriteBytesExt,
	{
		buf.write_i32::<LE>(self.offset)?;
		buf.write_i32::<LE>(self.length)?;
		buf.write_fixed_str(&self.name, maxstrlen).map_err(|e| match e.kind() {
			ErrorKind::InvalidInput => JpkError::NameLength(self.name.clone(), maxstrlen),
			_ => e.into(),
		})?;

		Ok(())
	}
}

/// An object handed over by the host for packing
#[derive(Clone, Debug, PartialEq)]
pub struct SourceObject {
	pub name: String,
	/// One triangle list per frame
	pub frames: Vec<Vec<Triangle>>,
	pub record: TrackObject,
}

/// Track objects along with their properties
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoePack {
	pub joe: BTreeMap<String, JoeObject>,
	pub list: BTreeMap<String, TrackObject>,
}

impl JoePack {
	pub fn new() -> JoePack {
		JoePack::default()
	}

	/// Builds a pack from host objects, skipping the ones that can't be converted.
	///
	/// Returns the skipped names along with the reason.
	pub fn from_sources<I>(sources: I, cfg: &ConvertCfg) -> (JoePack, Vec<(String, JoeError)>)
	where
		I: IntoIterator<Item = SourceObject>,
	{
		let mut pack = JoePack::new();
		let mut skipped = vec![];

		for src in sources {
			match JoeObject::from_triangles(&src.frames, cfg) {
				Ok(joe) => {
					pack.insert(&src.name, joe, src.record);
				},
				Err(e) => {
					warn!("{} not exported: {}", src.name, e);
					skipped.push((src.name, e));
				},
			}
		}

		(pack, skipped)
	}

	/// Adds an object, returning the name it's stored under.
	///
	/// The record's model name takes precedence over `name`, and the result always ends in `.joe`.
	pub fn insert(&mut self, name: &str, joe: JoeObject, mut record: TrackObject) -> String {
		let mut name = match record.model() {
			"" | "none" => name.to_string(),
			model => model.to_string(),
		};
		if !name.ends_with(".joe") {
			name.push_str(".joe");
		}

		record.values[0] = name.clone();
		self.list.insert(name.clone(), record);
		self.joe.insert(name.clone(), joe);

		name
	}

	pub fn header(&self) -> Header {
		Header {
			numobjs: self.joe.len() as i32,
			maxstrlen: self.joe.keys().map(|k| k.len()).max().unwrap_or(0) as i32,
		}
	}

	/// Distinct texture names referenced by the records
	pub fn textures(&self) -> BTreeSet<&str> {
		self.list.values()
			.map(|obj| obj.texture())
			.filter(|t| !t.is_empty() && *t != "none")
			.collect()
	}

	/// Looks up every referenced texture through the host's resolver
	pub fn resolve_textures<T>(&self, resolver: &mut T) -> HashMap<String, T::Handle>
	where
		T: TextureResolver + ?Sized,
	{
		let (found, missing) = resolve_all(resolver, self.textures());
		for name in missing.iter() {
			warn!("Texture {} not found", name);
		}

		found
	}

	/// Converts the objects listed in `list.txt` into host meshes, one per frame.
	///
	/// Objects missing from the list, or failing to convert, are skipped.
	#[cfg(feature = "import")]
	pub fn to_meshes(self, cfg: &ConvertCfg) -> Vec<(TrackObject, Vec<Mesh>)> {
		let mut list = self.list;
		let mut objects = vec![];

		for (name, joe) in self.joe.into_iter() {
			let record = match list.remove(&name) {
				Some(record) => record,
				None => {
					warn!("{} not imported. Not in {}.", name, LIST_NAME);
					continue;
				},
			};

			match joe.to_meshes(&name, cfg) {
				Ok(meshes) => objects.push((record, meshes)),
				Err(e) => warn!("{} not imported: {}", name, e),
			}
		}

		objects
	}

	/// Reads the allocation table and every object it lists
	#[cfg(feature = "import")]
	pub fn read_objects<R>(&mut self, buf: &mut R) -> Result<(), JpkError>
	where
		R: Read + Seek,
	{
		let header = Header::read(buf)?;
		let maxstrlen = header.maxstrlen as usize;

		let mut fat = vec![];
		for i in 0..(header.numobjs as usize) {
			let entry = FatEntry::read(i, maxstrlen, buf)?;
			debug!("{}: {} bytes at {}", entry.name, entry.length, entry.offset);
			fat.push(entry);
		}

		for entry in fat.into_iter() {
			let position = buf.stream_position()?;
			let delta = entry.offset as i64 - position as i64;
			if delta < 0 {
				return Err(JpkError::Offset {
					name: entry.name,
					offset: entry.offset,
					position: position,
				});
			} else if delta > 0 {
				buf.seek(SeekFrom::Current(delta))?;
			}

			let joe = JoeObject::read(buf).map_err(|e| JpkError::joe(&entry.name, e))?;

			let length = buf.stream_position()? - entry.offset as u64;
			if length != entry.length as u64 {
				warn!("{}: read {} bytes, table says {}", entry.name, length, entry.length);
			}

			if self.joe.insert(entry.name.clone(), joe).is_some() {
				warn!("Duplicate object {}, keeping the last one", entry.name);
			}
		}

		Ok(())
	}

	/// Writes the header, the objects and their allocation table.
	///
	/// The table is written last, by seeking back over the space reserved for it.
	#[cfg(feature = "export")]
	pub fn write_objects<W>(&self, buf: &mut W) -> Result<(), JpkError>
	where
		W: Write + Seek,
	{
		let header = self.header();
		let maxstrlen = header.maxstrlen as usize;
		header.write(buf)?;

		let fat_offset = buf.stream_position()?;
		buf.write_all(&vec![0; self.joe.len() * FatEntry::size(maxstrlen)])?;

		let mut fat = vec![];
		for (name, joe) in self.joe.iter() {
			let offset = buf.stream_position()?;
			joe.write(buf).map_err(|e| JpkError::joe(name, e))?;
			let end = buf.stream_position()?;

			fat.push(FatEntry {
				offset: i32::try_from(offset).map_err(|_| JpkError::Size(offset))?,
				length: i32::try_from(end - offset).map_err(|_| JpkError::Size(end))?,
				name: name.clone(),
			});
		}

		let end = buf.stream_position()?;
		buf.seek(SeekFrom::Start(fat_offset))?;
		for entry in fat.iter() {
			entry.write(maxstrlen, buf)?;
		}
		buf.seek(SeekFrom::Start(end))?;

		Ok(())
	}

	/// Reads `list.txt` records, keyed by model name
	#[cfg(feature = "import")]
	pub fn read_list(&mut self, text: &str) -> Result<(), JpkError> {
		let objects = crate::list::parse_list(text)?;
		if objects.is_empty() {
			warn!("Failed to load {}", LIST_NAME);
		}

		for obj in objects.into_iter() {
			self.list.insert(obj.model().to_string(), obj);
		}

		Ok(())
	}

	#[cfg(feature = "export")]
	pub fn list_text(&self) -> String {
		crate::list::format_list(self.list.values())
	}

	/// Loads a pack from disk.
	///
	/// `list.txt` is read from the same directory. Unless `path` is a `.jpk`, objects come from
	/// `objects.jpk` next to it; if that can't be read, each listed object is loaded as a loose `.joe`.
	#[cfg(feature = "import")]
	pub fn load<P>(path: P) -> Result<JoePack, JpkError>
	where
		P: AsRef<Path>,
	{
		let path = path.as_ref();
		let dir = path.parent().unwrap_or_else(|| Path::new(""));
		let mut pack = JoePack::new();

		let list_path = dir.join(LIST_NAME);
		match fs::read_to_string(&list_path) {
			Ok(text) => pack.read_list(&text)?,
			Err(e) if e.kind() == ErrorKind::NotFound => warn!("{} not found.", list_path.display()),
			Err(e) => return Err(e.into()),
		}

		let jpk_path = match path.extension() {
			Some(ext) if ext == "jpk" => path.to_path_buf(),
			_ => dir.join(DEFAULT_NAME),
		};

		let loaded = File::open(&jpk_path)
			.map_err(JpkError::from)
			.and_then(|file| pack.read_objects(&mut BufReader::new(file)));

		if let Err(e) = loaded {
			warn!("Unable to read {}: {}, loading separate objects", jpk_path.display(), e);
			pack.joe.clear();
			pack.load_joes(dir)?;
		}

		Ok(pack)
	}

	/// Loads every listed object from its own `.joe` file in `dir`
	#[cfg(feature = "import")]
	pub fn load_joes(&mut self, dir: &Path) -> Result<(), JpkError> {
		for name in self.list.keys() {
			let file = File::open(dir.join(name))?;
			let joe = JoeObject::read(&mut BufReader::new(file)).map_err(|e| JpkError::joe(name, e))?;
			self.joe.insert(name.clone(), joe);
		}

		Ok(())
	}

	/// Saves the pack to `path`, and/or `list.txt` next to it.
	///
	/// An existing pack is rewritten in place and truncated to its new length.
	#[cfg(feature = "export")]
	pub fn save<P>(&self, path: P, write_list: bool, write_jpk: bool) -> Result<(), JpkError>
	where
		P: AsRef<Path>,
	{
		let path = path.as_ref();

		if write_jpk {
			let file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
			let mut buf = BufWriter::new(file);
			self.write_objects(&mut buf)?;

			let end = buf.stream_position()?;
			let file = buf.into_inner().map_err(|e| e.into_error())?;
			file.set_len(end)?;
		}

		if write_list {
			let dir = path.parent().unwrap_or_else(|| Path::new(""));
			fs::write(dir.join(LIST_NAME), self.list_text())?;
		}

		Ok(())
	}
}

/// Encodes a pack and its `list.txt`
#[cfg(feature = "export")]
pub fn encode_pack(pack: &JoePack) -> Result<(Vec<u8>, String), JpkError> {
	let mut buf = Cursor::new(vec![]);
	pack.write_objects(&mut buf)?;

	Ok((buf.into_inner(), pack.list_text()))
}

/// Decodes a pack, along with its `list.txt` if there is one
#[cfg(feature = "import")]
pub fn decode_pack(data: &[u8], list: Option<&str>) -> Result<JoePack, JpkError> {
	let mut pack = JoePack::new();

	match list {
		Some(text) => pack.read_list(text)?,
		None => warn!("No {}, objects have no properties", LIST_NAME),
	}

	pack.read_objects(&mut Cursor::new(data))?;

	Ok(pack)
}
