// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cursor over the final merged run, mirroring the dictionary cursor
//! interface.

use crate::key::{extract_key_bytes, KeyPart};
use dictionary::{DKey, DValue, DictCursor, DictError, CursorStatus, FileStorage, Result, StorageFile};
use std::sync::Arc;

pub struct SortedCursor {
	file: FileStorage,
	key_parts: Arc<Vec<KeyPart>>,
	record_size: usize,
	offset: u64,
	end: u64,
	status: CursorStatus,
}

impl SortedCursor {
	pub(crate) fn new(file: FileStorage, key_parts: Arc<Vec<KeyPart>>, record_size: usize, record_count: u64) -> Self {
		let end = record_count * record_size as u64;
		let status = if end > 0 { CursorStatus::Initialized } else { CursorStatus::EndOfResults };
		SortedCursor { file, key_parts, record_size, offset: 0, end, status }
	}
}

impl DictCursor for SortedCursor {
	fn status(&self) -> CursorStatus {
		self.status
	}

	fn next(&mut self) -> Result<Option<(DKey, DValue)>> {
		if matches!(self.status, CursorStatus::EndOfResults | CursorStatus::Invalid) {
			return Ok(None);
		}
		if self.offset >= self.end {
			self.status = CursorStatus::EndOfResults;
			return Ok(None);
		}
		let mut buf = vec![0u8; self.record_size];
		if let Err(e) = self.file.read_at(self.offset, &mut buf).map_err(DictError::FileReadError) {
			self.status = CursorStatus::Invalid;
			return Err(e);
		}
		self.offset += self.record_size as u64;
		self.status = CursorStatus::Active;
		let key = DKey::from_slice(&extract_key_bytes(&self.key_parts, &buf));
		let value = DValue::from_slice(&buf);
		Ok(Some((key, value)))
	}
}
