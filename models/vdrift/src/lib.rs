pub mod indexer;
pub mod joe;
pub mod mesh;

use bitflags::bitflags;

#[cfg(feature = "import")]
use vdk_core::scene::Mesh;

#[cfg(feature = "export")]
use vdk_core::scene::Triangle;

use joe::{
	JoeError,
	JoeObject
};

bitflags! {
	/// Host specific conventions applied while converting geometry
	pub struct ConvertFlag: u32 {
		/// Rotate face corners so vertex index 0 never ends up last
		const NONZERO_LAST_INDEX = 1;
		/// Map every corner of a mesh without UVs to the texture coordinate (0, 0), instead of
		/// rejecting it
		const DEFAULT_MISSING_UVS = 2;
	}
}

impl Default for ConvertFlag {
	fn default() -> Self {
		ConvertFlag::empty()
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertCfg {
	pub flags: ConvertFlag,
}

/// Encodes one triangle list per frame into a JOE file
#[cfg(feature = "export")]
pub fn encode_object<T>(frames: &[T], cfg: &ConvertCfg) -> Result<Vec<u8>, JoeError>
where
	T: AsRef<[Triangle]>,
{
	let obj = JoeObject::from_triangles(frames, cfg)?;
	let mut out = Vec::with_capacity(obj.encoded_len());
	obj.write(&mut out)?;

	Ok(out)
}

/// Decodes a JOE file into one cleaned up mesh per frame
#[cfg(feature = "import")]
pub fn decode_object(name: &str, mut data: &[u8], cfg: &ConvertCfg) -> Result<Vec<Mesh>, JoeError> {
	JoeObject::read(&mut data)?.to_meshes(name, cfg)
}
