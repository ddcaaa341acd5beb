// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cursor over a flat-file dictionary.

use crate::header::HEADER_SIZE;
use crate::slot::{SlotStatus, STATUS_SIZE};
use dictionary::{Comparator, CursorStatus, DKey, DValue, DictCursor, FileStorage, Predicate, Result, StorageFile};
use std::sync::Arc;

/// Walks the slot area from front to back, skipping `empty`/`deleted`
/// slots and emitting `in_use` slots whose key satisfies the predicate.
/// Position is a file offset, as specified.
pub struct FlatFileCursor {
	file: FileStorage,
	comparator: Arc<dyn Comparator>,
	predicate: Predicate,
	offset: u64,
	end: u64,
	key_size: usize,
	value_size: usize,
	record_size: usize,
	status: CursorStatus,
}

impl FlatFileCursor {
	pub(crate) fn new(
		file: FileStorage,
		comparator: Arc<dyn Comparator>,
		predicate: Predicate,
		end: u64,
		key_size: usize,
		value_size: usize,
	) -> Result<Self> {
		let record_size = STATUS_SIZE + key_size + value_size;
		let mut cursor = FlatFileCursor {
			file,
			comparator,
			predicate,
			offset: HEADER_SIZE as u64,
			end,
			key_size,
			value_size,
			record_size,
			status: CursorStatus::Uninitialized,
		};
		cursor.status = if cursor.has_match_ahead()? { CursorStatus::Initialized } else { CursorStatus::EndOfResults };
		Ok(cursor)
	}

	fn matches(&self, key: &[u8]) -> bool {
		match &self.predicate {
			Predicate::AllRecords => true,
			Predicate::Equality(k) => self.comparator.equal(key, k),
			Predicate::Range(lo, hi) => {
				self.comparator.compare(key, lo) != std::cmp::Ordering::Less
					&& self.comparator.compare(key, hi) != std::cmp::Ordering::Greater
			}
		}
	}

	/// Peeks forward from `self.offset` without consuming, to decide the
	/// initial state `find` should report.
	fn has_match_ahead(&mut self) -> Result<bool> {
		let saved = self.offset;
		let found = self.advance_to_next_match()?.is_some();
		self.offset = saved;
		Ok(found)
	}

	/// Scans forward starting at `self.offset`, returns and consumes the
	/// next matching record's slot offset, key and value, leaving
	/// `self.offset` positioned just past it.
	fn advance_to_next_match(&mut self) -> Result<Option<(DKey, DValue)>> {
		let mut buf = vec![0u8; self.record_size];
		while self.offset < self.end {
			self.file.read_at(self.offset, &mut buf).map_err(dictionary::DictError::FileReadError)?;
			self.offset += self.record_size as u64;
			if buf[0] != SlotStatus::InUse as u8 {
				continue;
			}
			let key = &buf[STATUS_SIZE..STATUS_SIZE + self.key_size];
			if self.matches(key) {
				let value = &buf[STATUS_SIZE + self.key_size..STATUS_SIZE + self.key_size + self.value_size];
				return Ok(Some((DKey::from_slice(key), DValue::from_slice(value))));
			}
		}
		Ok(None)
	}
}

impl DictCursor for FlatFileCursor {
	fn status(&self) -> CursorStatus {
		self.status
	}

	fn next(&mut self) -> Result<Option<(DKey, DValue)>> {
		if matches!(self.status, CursorStatus::EndOfResults | CursorStatus::Invalid) {
			return Ok(None);
		}
		match self.advance_to_next_match() {
			Ok(Some(record)) => {
				self.status = CursorStatus::Active;
				Ok(Some(record))
			}
			Ok(None) => {
				self.status = CursorStatus::EndOfResults;
				Ok(None)
			}
			Err(e) => {
				self.status = CursorStatus::Invalid;
				Err(e)
			}
		}
	}
}
