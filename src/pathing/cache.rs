//! Persisted coarse-level data so repeat loads of a map skip the terrain scan
//!
//! Building the block data of a large map costs seconds, so each level is
//! written to disk after first build and read back on later loads. A file is
//! tagged with a hash of the terrain it was computed from and a stale or
//! mismatched file is rejected and rebuilt rather than trusted.
//!

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::prelude::*;

/// Bump when the on-disk layout changes, older files are rebuilt
const CACHE_VERSION: u32 = 1;

/// Failure modes of reading or writing a cache file
#[derive(Error, Debug)]
pub enum CacheError {
	/// The file could not be read or written
	#[error("cache io: {0}")]
	Io(#[from] std::io::Error),
	/// The file exists but is not valid data
	#[error("cache parse: {0}")]
	Parse(#[from] ron::error::SpannedError),
	/// The data could not be serialized
	#[error("cache serialize: {0}")]
	Serialize(#[from] ron::Error),
	/// The file was written for different terrain
	#[error("cache built for different terrain, stored hash {stored:#010x}, current {current:#010x}")]
	Stale {
		/// Hash recorded in the file
		stored: u32,
		/// Hash of the terrain now loaded
		current: u32,
	},
	/// The file predates the current on-disk layout
	#[error("cache format version {found}, expected {expected}")]
	Version {
		/// Version recorded in the file
		found: u32,
		/// Version this build writes
		expected: u32,
	},
}

/// On-disk form of one coarse level
#[derive(serde::Deserialize, serde::Serialize, Debug)]
pub struct CacheFile {
	/// On-disk layout version
	version: u32,
	/// Hash of the terrain the data was computed from
	terrain_hash: u32,
	/// The block data itself
	data: LevelData,
}

/// File name of the cache of one level of a map
pub fn cache_file_name(map_name: &str, block_size: u32) -> String {
	format!("{map_name}.bc{block_size}.ron")
}

/// Write the block data of a level next to the other caches of the map
pub fn save_level(
	directory: &Path,
	map_name: &str,
	terrain_hash: u32,
	level: &LevelState,
) -> Result<PathBuf, CacheError> {
	let file = CacheFile {
		version: CACHE_VERSION,
		terrain_hash,
		data: level.to_data(),
	};
	let path = directory.join(cache_file_name(map_name, level.get_block_size()));
	let serialized = ron::ser::to_string(&file)?;
	fs::write(&path, serialized)?;
	Ok(path)
}

/// Read back the block data of a level, rejecting files written for other
/// terrain or an older layout
pub fn load_level(
	directory: &Path,
	map_name: &str,
	block_size: u32,
	terrain_hash: u32,
) -> Result<LevelData, CacheError> {
	let path = directory.join(cache_file_name(map_name, block_size));
	let contents = fs::read_to_string(&path)?;
	let file: CacheFile = ron::from_str(&contents)?;
	if file.version != CACHE_VERSION {
		return Err(CacheError::Version {
			found: file.version,
			expected: CACHE_VERSION,
		});
	}
	if file.terrain_hash != terrain_hash {
		return Err(CacheError::Stale {
			stored: file.terrain_hash,
			current: terrain_hash,
		});
	}
	if file.data.get_block_size() != block_size {
		return Err(CacheError::Version {
			found: file.data.get_block_size(),
			expected: block_size,
		});
	}
	Ok(file.data)
}

/// Delete the cache files of a map for the given block sizes. Missing files
/// are not an error, anything else is
pub fn remove_cache_files(
	directory: &Path,
	map_name: &str,
	block_sizes: &[u32],
) -> Result<(), CacheError> {
	for block_size in block_sizes {
		let path = directory.join(cache_file_name(map_name, *block_size));
		match fs::remove_file(&path) {
			Ok(()) => {}
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
			Err(error) => return Err(CacheError::Io(error)),
		}
	}
	Ok(())
}
