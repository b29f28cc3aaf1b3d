use std::{
	env,
	fs::read,
	io,
	path::Path
};

use log::info;
use thiserror::Error;

use vdk_archives_vdrift::{
	JpkError,
	jpk::JoePack
};

use vdk_models_vdrift::{
	ConvertCfg,
	joe::{
		JoeError,
		JoeObject
	}
};

use vdk_tracks_vdrift::{
	car::{
		CarError,
		CarRig
	},
	track::{
		TrackError,
		TrackInfo
	},
	trk::{
		self,
		RoadError
	}
};

#[derive(Debug, Error)]
enum DumpError {
	#[error("Usage: vdk-dump <file>")]
	Usage,
	#[error("Don't know how to read {0}")]
	Unsupported(String),
	#[error("I/O error")]
	IO {
		#[from]
		source: io::Error,
	},
	#[error(transparent)]
	Joe(#[from] JoeError),
	#[error(transparent)]
	Jpk(#[from] JpkError),
	#[error(transparent)]
	Road(#[from] RoadError),
	#[error(transparent)]
	Track(#[from] TrackError),
	#[error(transparent)]
	Car(#[from] CarError),
}

fn main() -> Result<(), DumpError> {
	env_logger::init();

	let path = env::args().nth(1).ok_or(DumpError::Usage)?;
	let path = Path::new(&path);
	let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
	let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
	info!("Reading {}", path.display());

	match (file_name, ext) {
		("track.txt", _) => println!("{:#?}", TrackInfo::load(path)?),
		("list.txt", _) | (_, "jpk") => {
			let pack = JoePack::load(path)?;
			println!("{:#?}", pack.list);
			for (name, joe) in pack.joe.iter() {
				println!("{}: {:?}", name, joe.header);
			}
		},
		(_, "joe") => {
			let data = read(path)?;
			let joe = JoeObject::read(&mut data.as_slice())?;
			println!("{:#?}", joe.header);
			println!("{:#?}", joe.to_meshes(file_name, &ConvertCfg::default())?);
		},
		(_, "trk") => println!("{:#?}", trk::load(path)?),
		(_, "car") => println!("{:#?}", CarRig::load(path)?),
		_ => return Err(DumpError::Unsupported(path.display().to_string())),
	}

	Ok(())
}
