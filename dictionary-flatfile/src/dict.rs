// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Flat-file dictionary: a single ordered-append record file with in-use
//! flags.

use crate::cursor::FlatFileCursor;
use crate::header::{Header, HEADER_SIZE};
use crate::slot::{SlotStatus, STATUS_SIZE};
use dictionary::{
	remove_file, Comparator, DValue, DictCursor, DictError, Dictionary, DictionaryLifecycle, FileStorage, OpStatus,
	Predicate, Result, StorageFile, WriteConcern,
};
use log::{debug, trace};
use std::path::PathBuf;
use std::sync::Arc;

/// Construction parameters for a flat-file dictionary. `path` is the
/// single data file; the extension is delegated to the storage
/// substrate — this crate just picks `.ffd`.
#[derive(Debug, Clone)]
pub struct Config {
	pub path: PathBuf,
	pub key_size: usize,
	pub value_size: usize,
	pub write_concern: WriteConcern,
}

impl Default for Config {
	fn default() -> Self {
		Config { path: PathBuf::from("dictionary.ffd"), key_size: 4, value_size: 4, write_concern: WriteConcern::Unique }
	}
}

pub struct FlatFileDict {
	file: FileStorage,
	path: PathBuf,
	comparator: Arc<dyn Comparator>,
	key_size: usize,
	value_size: usize,
	write_concern: WriteConcern,
	record_size: usize,
	num_records: usize,
}

impl FlatFileDict {
	fn slot_area_end(&mut self) -> Result<u64> {
		self.file.len().map_err(DictError::FileReadError)
	}

	fn read_slot(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
		self.file.read_at(offset, buf).map_err(DictError::FileReadError)
	}

	fn write_slot(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
		self.file.write_at(offset, buf).map_err(DictError::FileWriteError)
	}

	/// Scans the slot area. `unique_dup_check` short-circuits with
	/// `DuplicateKey` the first time it sees an in-use slot matching
	/// `key`; regardless of that, the first `deleted` slot seen is
	/// remembered so inserts can reuse it.
	fn scan_for_insert(&mut self, key: &[u8], unique_dup_check: bool) -> Result<Option<u64>> {
		let end = self.slot_area_end()?;
		let mut offset = HEADER_SIZE as u64;
		let mut reusable: Option<u64> = None;
		let mut buf = vec![0u8; self.record_size];
		while offset < end {
			self.read_slot(offset, &mut buf)?;
			match SlotStatus::from_byte(buf[0]) {
				SlotStatus::Deleted => {
					if reusable.is_none() {
						reusable = Some(offset);
					}
				}
				SlotStatus::InUse if unique_dup_check => {
					let slot_key = &buf[STATUS_SIZE..STATUS_SIZE + self.key_size];
					if self.comparator.equal(slot_key, key) {
						return Err(DictError::DuplicateKey);
					}
				}
				_ => {}
			}
			offset += self.record_size as u64;
		}
		Ok(reusable)
	}

	fn append_or_reuse(&mut self, offset: Option<u64>, key: &[u8], value: &[u8]) -> Result<()> {
		let mut buf = vec![0u8; self.record_size];
		buf[0] = SlotStatus::InUse as u8;
		buf[STATUS_SIZE..STATUS_SIZE + self.key_size].copy_from_slice(key);
		buf[STATUS_SIZE + self.key_size..self.record_size].copy_from_slice(value);
		let target = match offset {
			Some(o) => o,
			None => self.slot_area_end()?,
		};
		self.write_slot(target, &buf)?;
		self.num_records += 1;
		Ok(())
	}

	fn write_header(&mut self) -> Result<()> {
		let header = Header { key_size: self.key_size as u32, value_size: self.value_size as u32, write_concern: self.write_concern };
		self.file.write_at(0, &header.encode()).map_err(DictError::FileWriteError)
	}
}

impl DictionaryLifecycle for FlatFileDict {
	type Config = Config;

	fn create(config: &Config, comparator: Box<dyn Comparator>) -> Result<Self> {
		if config.path.exists() {
			return Err(DictError::FileOpenError(std::io::Error::new(
				std::io::ErrorKind::AlreadyExists,
				"flat-file dictionary already exists",
			)));
		}
		let mut file = FileStorage::open(&config.path, true)?;
		let header = Header { key_size: config.key_size as u32, value_size: config.value_size as u32, write_concern: config.write_concern };
		file.write_at(0, &header.encode()).map_err(DictError::FileWriteError)?;
		debug!("created flat-file dictionary at {:?}", config.path);
		Ok(FlatFileDict {
			file,
			path: config.path.clone(),
			comparator: Arc::from(comparator),
			key_size: config.key_size,
			value_size: config.value_size,
			write_concern: config.write_concern,
			record_size: STATUS_SIZE + config.key_size + config.value_size,
			num_records: 0,
		})
	}

	fn open(config: &Config, comparator: Box<dyn Comparator>) -> Result<Self> {
		let mut file = FileStorage::open(&config.path, false)?;
		let mut header_buf = [0u8; HEADER_SIZE];
		file.read_at(0, &mut header_buf).map_err(DictError::FileReadError)?;
		let header = Header::decode(&header_buf)?;
		let record_size = STATUS_SIZE + header.key_size as usize + header.value_size as usize;
		let end = file.len().map_err(DictError::FileReadError)?;
		let mut num_records = 0usize;
		let mut offset = HEADER_SIZE as u64;
		let mut buf = vec![0u8; record_size];
		while offset < end {
			file.read_at(offset, &mut buf).map_err(DictError::FileReadError)?;
			if buf[0] == SlotStatus::InUse as u8 {
				num_records += 1;
			}
			offset += record_size as u64;
		}
		trace!("reopened flat-file dictionary at {:?}, {} live records", config.path, num_records);
		Ok(FlatFileDict {
			file,
			path: config.path.clone(),
			comparator: Arc::from(comparator),
			key_size: header.key_size as usize,
			value_size: header.value_size as usize,
			write_concern: header.write_concern,
			record_size,
			num_records,
		})
	}

	fn destroy(config: &Config) -> Result<()> {
		remove_file(&config.path)
	}
}

impl Dictionary for FlatFileDict {
	fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<OpStatus> {
		let unique = self.write_concern == WriteConcern::Unique;
		let reusable = self.scan_for_insert(key, unique)?;
		self.append_or_reuse(reusable, key, value)?;
		Ok(OpStatus::one())
	}

	fn get(&self, key: &[u8]) -> Result<DValue> {
		let mut cursor = self.find_internal(Predicate::equality(key))?;
		match cursor.next()? {
			Some((_, value)) => Ok(value),
			None => Err(DictError::ItemNotFound),
		}
	}

	fn update(&mut self, key: &[u8], value: &[u8]) -> Result<OpStatus> {
		let end = self.slot_area_end()?;
		let mut offset = HEADER_SIZE as u64;
		let mut buf = vec![0u8; self.record_size];
		let mut updated = 0usize;
		while offset < end {
			self.read_slot(offset, &mut buf)?;
			if buf[0] == SlotStatus::InUse as u8 {
				let slot_key = buf[STATUS_SIZE..STATUS_SIZE + self.key_size].to_vec();
				if self.comparator.equal(&slot_key, key) {
					let mut rec = buf.clone();
					rec[STATUS_SIZE + self.key_size..self.record_size].copy_from_slice(value);
					self.write_slot(offset, &rec)?;
					updated += 1;
				}
			}
			offset += self.record_size as u64;
		}
		if updated == 0 {
			self.insert(key, value)?;
			Ok(OpStatus::one())
		} else {
			Ok(OpStatus { count: updated })
		}
	}

	fn delete(&mut self, key: &[u8]) -> Result<OpStatus> {
		let end = self.slot_area_end()?;
		let mut offset = HEADER_SIZE as u64;
		let mut buf = vec![0u8; self.record_size];
		let mut removed = 0usize;
		while offset < end {
			self.read_slot(offset, &mut buf)?;
			if buf[0] == SlotStatus::InUse as u8 {
				let slot_key = &buf[STATUS_SIZE..STATUS_SIZE + self.key_size];
				if self.comparator.equal(slot_key, key) {
					self.write_slot(offset, &[SlotStatus::Deleted as u8])?;
					removed += 1;
					self.num_records -= 1;
				}
			}
			offset += self.record_size as u64;
		}
		Ok(OpStatus { count: removed })
	}

	fn find(&self, predicate: Predicate) -> Result<Box<dyn DictCursor>> {
		Ok(Box::new(self.find_internal(predicate)?))
	}

	fn close(self: Box<Self>) -> Result<()> {
		let mut this = *self;
		this.write_header()?;
		this.file.sync().map_err(DictError::FileCloseError)?;
		debug!("closed flat-file dictionary at {:?}", this.path);
		Ok(())
	}

	fn key_size(&self) -> usize {
		self.key_size
	}

	fn value_size(&self) -> usize {
		self.value_size
	}
}

impl FlatFileDict {
	/// `get`/`find` take `&self` (the contract's cursors are read-only), so
	/// this opens its own read handle on the data file rather than
	/// borrowing `self.file` mutably.
	fn find_internal(&self, predicate: Predicate) -> Result<FlatFileCursor> {
		let mut cursor_file = FileStorage::open(&self.path, false)?;
		let end = cursor_file.len().map_err(DictError::FileReadError)?;
		FlatFileCursor::new(cursor_file, Arc::clone(&self.comparator), predicate, end, self.key_size, self.value_size)
	}
}
