pub mod jpk;
pub mod list;

use std::io;
use thiserror::Error;

use vdk_models_vdrift::joe::JoeError;

#[derive(Debug, Error)]
pub enum JpkError {
	#[error("I/O error")]
	IO {
		source: io::Error,
	},
	#[error("Unexpected end of stream")]
	Truncated,
	#[error("Not a JPK file: {0:?}")]
	Magic(String),
	#[error("Negative {0}: {1}")]
	Count(&'static str, i32),
	#[error("Table entry {0} has an invalid name")]
	Name(usize),
	#[error("Name \"{0}\" is too long for a {1} byte table")]
	NameLength(String, usize),
	#[error("{name} starts at {offset}, but the stream is already at {position}")]
	Offset {
		name: String,
		offset: i32,
		position: u64,
	},
	#[error("Archive exceeds 2 GiB at {0} bytes")]
	Size(u64),
	#[error("Object {name}")]
	Joe {
		name: String,
		source: JoeError,
	},
	#[error("Too many fields in list entry {0}")]
	Fields(String),
	#[error("List entry {0} has an invalid {1}: {2:?}")]
	Field(String, &'static str, String),
}

impl From<io::Error> for JpkError {
	fn from(source: io::Error) -> Self {
		match source.kind() {
			io::ErrorKind::UnexpectedEof => JpkError::Truncated,
			_ => JpkError::IO {
				source: source,
			},
		}
	}
}

impl JpkError {
	/// Wraps an object error, keeping truncation a pack level error
	pub(crate) fn joe(name: &str, source: JoeError) -> JpkError {
		match source {
			JoeError::Truncated => JpkError::Truncated,
			_ => JpkError::Joe {
				name: name.to_string(),
				source: source,
			},
		}
	}
}
