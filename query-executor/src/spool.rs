// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The paged temporary spool file the materialized path writes
//! intermediate rows to. A spool file is opened with a fixed page size;
//! rows are page-padded — if the remaining space on the current page is
//! less than the row size, the remainder is zero-filled and writing
//! resumes on the next page.
//!
//! Records are placed at `page * page_size + slot * record_size` for
//! `slot in 0..records_per_page`, which is exactly the page-padded
//! layout `external_sort::PagedRecordFile` reads back — the gap between
//! the last slot used on a page and the next page boundary is simply
//! never written, and a freshly extended file reads as zero there.

use dictionary::{DictError, FileStorage, Result, StorageFile};
use std::path::{Path, PathBuf};

pub struct SpoolWriter {
	file: FileStorage,
	path: PathBuf,
	page_size: usize,
	record_size: usize,
	records_per_page: usize,
	record_count: u64,
}

impl SpoolWriter {
	pub fn create(path: impl Into<PathBuf>, page_size: usize, record_size: usize) -> Result<Self> {
		if record_size > page_size {
			return Err(DictError::RecordSizeTooLarge);
		}
		let path = path.into();
		let file = FileStorage::open(&path, true)?;
		let records_per_page = (page_size / record_size).max(1);
		Ok(SpoolWriter { file, path, page_size, record_size, records_per_page, record_count: 0 })
	}

	pub fn write(&mut self, record: &[u8]) -> Result<()> {
		debug_assert_eq!(record.len(), self.record_size);
		let slot = (self.record_count as usize) % self.records_per_page;
		let page = (self.record_count as usize) / self.records_per_page;
		let offset = (page * self.page_size + slot * self.record_size) as u64;
		self.file.write_at(offset, record).map_err(DictError::FileWriteError)?;
		self.record_count += 1;
		Ok(())
	}

	/// Consumes the writer, returning what the caller needs to build a
	/// `PagedRecordFile` reader over the spool: its path, how many
	/// records it holds, the page size, and records-per-page.
	pub fn finish(self) -> SpoolHandle {
		SpoolHandle { path: self.path, record_count: self.record_count, page_size: self.page_size, record_size: self.record_size }
	}
}

pub struct SpoolHandle {
	pub path: PathBuf,
	pub record_count: u64,
	pub page_size: usize,
	pub record_size: usize,
}

impl SpoolHandle {
	pub fn path(&self) -> &Path {
		&self.path
	}
}
