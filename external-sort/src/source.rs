// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Abstracts over where unsorted records come from: a tightly-packed
//! flat file (the common case, and what every run/merge phase produces
//! internally) or a caller-supplied page-padded layout such as the
//! query executor's spool file.

use dictionary::{DictError, Result, StorageFile};

/// Visits every record of a record source, in physical order, feeding
/// `visit` exactly `record_size()` bytes at a time.
pub trait RecordSource {
	fn record_size(&self) -> usize;
	fn for_each(&mut self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()>;
}

/// The simplest source: records packed back-to-back with no padding,
/// starting at `base` and running for `record_count` records.
pub struct FlatRecordFile<'a> {
	file: &'a mut dyn StorageFile,
	base: u64,
	record_size: usize,
	record_count: u64,
}

impl<'a> FlatRecordFile<'a> {
	pub fn new(file: &'a mut dyn StorageFile, base: u64, record_size: usize, record_count: u64) -> Self {
		FlatRecordFile { file, base, record_size, record_count }
	}
}

impl RecordSource for FlatRecordFile<'_> {
	fn record_size(&self) -> usize {
		self.record_size
	}

	fn for_each(&mut self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
		let mut buf = vec![0u8; self.record_size];
		for i in 0..self.record_count {
			let offset = self.base + i * self.record_size as u64;
			self.file.read_at(offset, &mut buf).map_err(DictError::FileReadError)?;
			visit(&buf)?;
		}
		Ok(())
	}
}

/// A page-padded source: `page_size`-aligned pages each holding as many
/// whole `record_size`-byte records as fit, with the unused tail of each
/// page zero-filled. `usable_pages` bounds how much of the file has been
/// written.
pub struct PagedRecordFile<'a> {
	file: &'a mut dyn StorageFile,
	base: u64,
	page_size: usize,
	record_size: usize,
	record_count: u64,
}

impl<'a> PagedRecordFile<'a> {
	pub fn new(file: &'a mut dyn StorageFile, base: u64, page_size: usize, record_size: usize, record_count: u64) -> Self {
		PagedRecordFile { file, base, page_size, record_size, record_count }
	}
}

impl RecordSource for PagedRecordFile<'_> {
	fn record_size(&self) -> usize {
		self.record_size
	}

	fn for_each(&mut self, visit: &mut dyn FnMut(&[u8]) -> Result<()>) -> Result<()> {
		let records_per_page = self.page_size / self.record_size;
		let mut buf = vec![0u8; self.record_size];
		let mut emitted = 0u64;
		let mut page = 0u64;
		while emitted < self.record_count {
			let page_base = self.base + page * self.page_size as u64;
			for slot in 0..records_per_page {
				if emitted >= self.record_count {
					break;
				}
				let offset = page_base + (slot * self.record_size) as u64;
				self.file.read_at(offset, &mut buf).map_err(DictError::FileReadError)?;
				visit(&buf)?;
				emitted += 1;
			}
			page += 1;
		}
		Ok(())
	}
}
