// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cursor over a linear-hash dictionary.
//!
//! `all_records` and `range` both walk every bucket 0..current_size in
//! order, primary page then overflow chain, since linear hashing gives
//! no useful key ordering across buckets. `equality` computes the single
//! addressed bucket once
//! and scans only its chain.

use crate::addressing::{address_of, hash_key};
use crate::chain;
use crate::header::HEADER_SIZE;
use crate::page::{BucketFile, Layout};
use dictionary::{Comparator, CursorStatus, DKey, DValue, DictCursor, FileStorage, Predicate, Result};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;

fn matches(predicate: &Predicate, comparator: &dyn Comparator, key: &[u8]) -> bool {
	match predicate {
		Predicate::AllRecords => true,
		Predicate::Equality(k) => comparator.equal(key, k),
		Predicate::Range(lo, hi) => comparator.compare(key, lo) != Ordering::Less && comparator.compare(key, hi) != Ordering::Greater,
	}
}

pub struct LinearHashCursor {
	primary: FileStorage,
	overflow: FileStorage,
	layout: Layout,
	comparator: Arc<dyn Comparator>,
	predicate: Predicate,
	current_size: u64,
	next_bucket: u64,
	last_bucket: u64,
	pending: VecDeque<(DKey, DValue)>,
	status: CursorStatus,
}

impl LinearHashCursor {
	#[allow(clippy::too_many_arguments)]
	pub(crate) fn new(
		primary: FileStorage,
		overflow: FileStorage,
		layout: Layout,
		comparator: Arc<dyn Comparator>,
		predicate: Predicate,
		initial_size: u64,
		current_size: u64,
		next_split: u64,
	) -> Result<Self> {
		let (next_bucket, last_bucket) = match &predicate {
			Predicate::Equality(key) => {
				let bucket = address_of(hash_key(key), initial_size, current_size, next_split);
				(bucket, bucket)
			}
			Predicate::AllRecords | Predicate::Range(_, _) => (0, current_size.saturating_sub(1)),
		};

		let mut cursor = LinearHashCursor {
			primary,
			overflow,
			layout,
			comparator,
			predicate,
			current_size,
			next_bucket,
			last_bucket,
			pending: VecDeque::new(),
			status: CursorStatus::Uninitialized,
		};
		cursor.fill_pending()?;
		cursor.status = if cursor.pending.is_empty() { CursorStatus::EndOfResults } else { CursorStatus::Initialized };
		Ok(cursor)
	}

	/// Scans forward one bucket at a time, buffering every matching
	/// record of a bucket into `pending`, until a non-empty bucket is
	/// found or every bucket in range has been visited.
	fn fill_pending(&mut self) -> Result<()> {
		while self.pending.is_empty() && self.next_bucket < self.current_size && self.next_bucket <= self.last_bucket {
			let bucket = self.next_bucket;
			let predicate = &self.predicate;
			let comparator = self.comparator.as_ref();
			let mut matched = Vec::new();
			let mut bucket_file = BucketFile::new(&mut self.primary, HEADER_SIZE as u64);
			chain::scan_bucket::<()>(&self.layout, &mut bucket_file, &mut self.overflow, bucket, |_page, _slot, k, v| {
				if matches(predicate, comparator, k) {
					matched.push((DKey::from_slice(k), DValue::from_slice(v)));
				}
				Ok(ControlFlow::Continue(()))
			})?;
			self.pending.extend(matched);
			if self.next_bucket == self.last_bucket {
				self.next_bucket = self.current_size;
				break;
			}
			self.next_bucket += 1;
		}
		Ok(())
	}
}

impl DictCursor for LinearHashCursor {
	fn status(&self) -> CursorStatus {
		self.status
	}

	fn next(&mut self) -> Result<Option<(DKey, DValue)>> {
		if matches!(self.status, CursorStatus::EndOfResults | CursorStatus::Invalid) {
			return Ok(None);
		}
		if self.pending.is_empty() {
			if let Err(e) = self.fill_pending() {
				self.status = CursorStatus::Invalid;
				return Err(e);
			}
		}
		match self.pending.pop_front() {
			Some(record) => {
				self.status = CursorStatus::Active;
				Ok(Some(record))
			}
			None => {
				self.status = CursorStatus::EndOfResults;
				Ok(None)
			}
		}
	}
}
