// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linear-hash dictionary: split-on-load bucket-paged hashing over a
//! primary and an overflow file.

use crate::addressing::{address_of, hash_key, level};
use crate::chain;
use crate::cursor::LinearHashCursor;
use crate::header::{Header, HEADER_SIZE};
use crate::page::{BucketFile, Layout};
use dictionary::{
	remove_file, Comparator, DictCursor, DictError, Dictionary, DictionaryLifecycle, FileStorage, OpStatus, Predicate, Result, StorageFile,
	WriteConcern,
};
use log::{debug, trace, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Construction parameters for a linear-hash dictionary. The exact file
/// paths are left to the caller rather than hardcoding an extension
/// convention.
#[derive(Debug, Clone)]
pub struct Config {
	pub primary_path: PathBuf,
	pub overflow_path: PathBuf,
	pub key_size: usize,
	pub value_size: usize,
	pub write_concern: WriteConcern,
	/// Bucket count the table is created with; also the modulus `l = 0`
	/// addressing is computed against.
	pub initial_size: u64,
	/// Percentage load factor (`num_records * 100 / (current_size *
	/// records_per_bucket)`) that triggers a split on insert.
	pub split_threshold: u32,
	pub records_per_bucket: u32,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			primary_path: PathBuf::from("dictionary.lhs"),
			overflow_path: PathBuf::from("dictionary.lhd"),
			key_size: 4,
			value_size: 4,
			write_concern: WriteConcern::Unique,
			initial_size: 4,
			split_threshold: 80,
			records_per_bucket: 4,
		}
	}
}

pub struct LinearHashDict {
	primary: FileStorage,
	overflow: FileStorage,
	primary_path: PathBuf,
	overflow_path: PathBuf,
	comparator: Arc<dyn Comparator>,
	header: Header,
	layout: Layout,
}

impl LinearHashDict {
	fn bucket_file(&mut self) -> BucketFile<'_> {
		BucketFile::new(&mut self.primary, HEADER_SIZE as u64)
	}

	fn address(&self, key: &[u8]) -> u64 {
		address_of(hash_key(key), self.header.initial_size, self.header.current_size, self.header.next_split)
	}

	fn write_header(&mut self) -> Result<()> {
		self.primary.write_at(0, &self.header.encode()).map_err(DictError::FileWriteError)
	}

	/// Splits exactly one bucket if the table's load factor has crossed
	/// `split_threshold`. Never splits more than once per insert — a
	/// burst of inserts may leave the table briefly over threshold
	/// rather than doubling outright.
	fn maybe_split(&mut self) -> Result<()> {
		let capacity = self.header.current_size * self.header.records_per_bucket as u64;
		if capacity == 0 {
			return Ok(());
		}
		let load_pct = (self.header.num_records * 100) / capacity;
		if (load_pct as u32) < self.header.split_threshold {
			return Ok(());
		}
		self.split_one_bucket()
	}

	fn split_one_bucket(&mut self) -> Result<()> {
		let l = level(self.header.initial_size, self.header.current_size);
		let round_modulus = self.header.initial_size << l;
		let old_bucket = self.header.next_split;
		let new_bucket = self.header.current_size;

		{
			let mut bf = self.bucket_file();
			self.layout.write_blank_page(&mut bf, new_bucket, new_bucket as u32)?;
		}

		let records = {
			let mut bf = self.bucket_file();
			chain::drain_bucket(&self.layout, &mut bf, &mut self.overflow, &mut self.header.overflow_free_head, old_bucket)?
		};

		self.header.current_size += 1;
		self.header.next_split += 1;
		if self.header.next_split >= round_modulus {
			self.header.next_split = 0;
		}

		for (k, v) in &records {
			let bucket = self.address(k);
			let mut bf = self.bucket_file();
			chain::insert_physical(&self.layout, &mut bf, &mut self.overflow, &mut self.header.overflow_free_head, bucket, k, v)?;
		}

		self.write_header()?;
		trace!(
			"split bucket {} into {}, current_size now {}, next_split {}, rehashed {} records",
			old_bucket,
			new_bucket,
			self.header.current_size,
			self.header.next_split,
			records.len()
		);
		Ok(())
	}
}

impl DictionaryLifecycle for LinearHashDict {
	type Config = Config;

	fn create(config: &Config, comparator: Box<dyn Comparator>) -> Result<Self> {
		if config.primary_path.exists() || config.overflow_path.exists() {
			return Err(DictError::FileOpenError(std::io::Error::new(
				std::io::ErrorKind::AlreadyExists,
				"linear-hash dictionary already exists",
			)));
		}
		let mut primary = FileStorage::open(&config.primary_path, true)?;
		let overflow = FileStorage::open(&config.overflow_path, true)?;

		let header = Header {
			key_size: config.key_size as u32,
			value_size: config.value_size as u32,
			write_concern: config.write_concern,
			initial_size: config.initial_size,
			current_size: config.initial_size,
			next_split: 0,
			split_threshold: config.split_threshold,
			records_per_bucket: config.records_per_bucket,
			num_records: 0,
			overflow_free_head: -1,
		};
		primary.write_at(0, &header.encode()).map_err(DictError::FileWriteError)?;

		let layout = Layout { key_size: config.key_size, value_size: config.value_size, records_per_bucket: config.records_per_bucket as usize };
		{
			let mut bf = BucketFile::new(&mut primary, HEADER_SIZE as u64);
			for bucket in 0..config.initial_size {
				layout.write_blank_page(&mut bf, bucket, bucket as u32)?;
			}
		}

		debug!("created linear-hash dictionary at {:?} / {:?}, initial_size {}", config.primary_path, config.overflow_path, config.initial_size);
		Ok(LinearHashDict {
			primary,
			overflow,
			primary_path: config.primary_path.clone(),
			overflow_path: config.overflow_path.clone(),
			comparator: Arc::from(comparator),
			header,
			layout,
		})
	}

	fn open(config: &Config, comparator: Box<dyn Comparator>) -> Result<Self> {
		let mut primary = FileStorage::open(&config.primary_path, false)?;
		let overflow = FileStorage::open(&config.overflow_path, false)?;
		let mut header_buf = [0u8; HEADER_SIZE];
		primary.read_at(0, &mut header_buf).map_err(DictError::FileReadError)?;
		let header = match Header::decode(&header_buf) {
			Ok(h) => h,
			Err(e) => {
				warn!("failed to decode linear-hash header at {:?}: {}", config.primary_path, e);
				return Err(e);
			}
		};
		let layout = Layout { key_size: header.key_size as usize, value_size: header.value_size as usize, records_per_bucket: header.records_per_bucket as usize };
		trace!("reopened linear-hash dictionary at {:?}, {} live records", config.primary_path, header.num_records);
		Ok(LinearHashDict {
			primary,
			overflow,
			primary_path: config.primary_path.clone(),
			overflow_path: config.overflow_path.clone(),
			comparator: Arc::from(comparator),
			header,
			layout,
		})
	}

	fn destroy(config: &Config) -> Result<()> {
		remove_file(&config.primary_path)?;
		remove_file(&config.overflow_path)
	}
}

impl Dictionary for LinearHashDict {
	fn insert(&mut self, key: &[u8], value: &[u8]) -> Result<OpStatus> {
		let bucket = self.address(key);
		if self.header.write_concern == WriteConcern::Unique {
			let mut bf = self.bucket_file();
			let existing = chain::find_first(&self.layout, self.comparator.as_ref(), &mut bf, &mut self.overflow, bucket, key)?;
			if existing.is_some() {
				return Err(DictError::DuplicateKey);
			}
		}
		{
			let mut bf = self.bucket_file();
			chain::insert_physical(&self.layout, &mut bf, &mut self.overflow, &mut self.header.overflow_free_head, bucket, key, value)?;
		}
		self.header.num_records += 1;
		self.maybe_split()?;
		Ok(OpStatus::one())
	}

	fn get(&self, key: &[u8]) -> Result<dictionary::DValue> {
		let bucket = self.address(key);
		let mut primary = FileStorage::open(&self.primary_path, false)?;
		let mut overflow = FileStorage::open(&self.overflow_path, false)?;
		let mut bf = BucketFile::new(&mut primary, HEADER_SIZE as u64);
		chain::find_first(&self.layout, self.comparator.as_ref(), &mut bf, &mut overflow, bucket, key)?.ok_or(DictError::ItemNotFound)
	}

	fn update(&mut self, key: &[u8], value: &[u8]) -> Result<OpStatus> {
		let bucket = self.address(key);
		let updated = {
			let mut bf = self.bucket_file();
			chain::update_all(&self.layout, self.comparator.as_ref(), &mut bf, &mut self.overflow, bucket, key, value)?
		};
		if updated == 0 {
			self.insert(key, value)?;
			Ok(OpStatus::one())
		} else {
			Ok(OpStatus { count: updated })
		}
	}

	fn delete(&mut self, key: &[u8]) -> Result<OpStatus> {
		let bucket = self.address(key);
		let removed = {
			let mut bf = self.bucket_file();
			chain::delete_all(&self.layout, self.comparator.as_ref(), &mut bf, &mut self.overflow, bucket, key)?
		};
		self.header.num_records -= removed as u64;
		Ok(OpStatus { count: removed })
	}

	fn find(&self, predicate: Predicate) -> Result<Box<dyn DictCursor>> {
		let primary = FileStorage::open(&self.primary_path, false)?;
		let overflow = FileStorage::open(&self.overflow_path, false)?;
		let cursor = LinearHashCursor::new(
			primary,
			overflow,
			self.layout,
			Arc::clone(&self.comparator),
			predicate,
			self.header.initial_size,
			self.header.current_size,
			self.header.next_split,
		)?;
		Ok(Box::new(cursor))
	}

	fn close(self: Box<Self>) -> Result<()> {
		let mut this = *self;
		this.write_header()?;
		this.primary.sync().map_err(DictError::FileCloseError)?;
		this.overflow.sync().map_err(DictError::FileCloseError)?;
		debug!("closed linear-hash dictionary at {:?} / {:?}", this.primary_path, this.overflow_path);
		Ok(())
	}

	fn key_size(&self) -> usize {
		self.layout.key_size
	}

	fn value_size(&self) -> usize {
		self.layout.value_size
	}
}
