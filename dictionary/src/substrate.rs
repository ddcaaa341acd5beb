// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Storage substrate: a byte-addressable random-access file. The
//! low-level block device is out of scope — this module only wraps
//! `std::fs::File` with the read/write/seek/remove/rename surface the
//! dictionaries are built on.

use crate::error::{other_io_err, DictError};
use log::trace;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A byte-addressable random-access file. Implementations must make every
/// write durable-ordered with respect to later reads at the same offset.
pub trait StorageFile: Send {
	/// Reads exactly `buf.len()` bytes starting at `offset`.
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

	/// Writes `buf` starting at `offset`, extending the file if needed.
	fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;

	/// Current length in bytes.
	fn len(&mut self) -> io::Result<u64>;

	/// Flushes buffered writes to the backing medium.
	fn sync(&mut self) -> io::Result<()>;
}

/// `StorageFile` backed directly by an OS file handle.
pub struct FileStorage {
	file: File,
}

impl FileStorage {
	/// Opens `path`, creating it (and any missing parent header) if
	/// `create` is set.
	pub fn open(path: impl AsRef<Path>, create: bool) -> Result<Self, DictError> {
		OpenOptions::new()
			.read(true)
			.write(true)
			.create(create)
			.open(path)
			.map(|file| FileStorage { file })
			.map_err(DictError::FileOpenError)
	}
}

impl StorageFile for FileStorage {
	fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
		self.file.seek(SeekFrom::Start(offset))?;
		self.file.read_exact(buf)
	}

	fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
		self.file.seek(SeekFrom::Start(offset))?;
		self.file.write_all(buf)
	}

	fn len(&mut self) -> io::Result<u64> {
		self.file.seek(SeekFrom::End(0))
	}

	fn sync(&mut self) -> io::Result<()> {
		self.file.sync_all()
	}
}

/// Removes the file at `path`. Missing files are not an error — callers
/// use this from `destroy`, which may be racing a prior partial cleanup.
pub fn remove_file(path: impl AsRef<Path>) -> Result<(), DictError> {
	match fs::remove_file(&path) {
		Ok(()) => Ok(()),
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			trace!("remove_file: {} already gone, racing prior cleanup", path.as_ref().display());
			Ok(())
		}
		Err(e) => Err(DictError::FileDeleteError(e)),
	}
}

/// Renames `from` to `to`, used when rewriting a dictionary's files under
/// a temporary name before swapping them into place.
pub fn rename_file(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<(), DictError> {
	fs::rename(from, to).map_err(|e| DictError::FileRenameError(other_io_err(e)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn round_trips_bytes_at_offset() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("substrate.bin");
		let mut f = FileStorage::open(&path, true).unwrap();
		f.write_at(0, &[0u8; 16]).unwrap();
		f.write_at(4, b"data").unwrap();
		let mut buf = [0u8; 4];
		f.read_at(4, &mut buf).unwrap();
		assert_eq!(&buf, b"data");
		assert_eq!(f.len().unwrap(), 16);
	}

	#[test]
	fn remove_missing_file_is_not_an_error() {
		let dir = tempdir().unwrap();
		let path = dir.path().join("missing.bin");
		assert!(remove_file(&path).is_ok());
	}
}
