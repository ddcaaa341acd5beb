// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Run generation: buffers up to `records_per_run` records in memory,
//! stable-sorts them by the composite key, and spills each batch to its
//! own flat temp file, bounding memory use by a caller-supplied budget.
//!
//! Each spilled record is prefixed with an 8-byte sequence number giving
//! its original arrival order. A within-run stable sort alone is not
//! enough to keep the *whole* sort stable once runs are merged — two
//! equal-keyed records from different runs would otherwise interleave
//! arbitrarily. Carrying the sequence number lets the merge phase break
//! ties by original order regardless of which run a record came from.

use crate::key::{compare_composite, KeyPart};
use crate::source::RecordSource;
use dictionary::{DictError, FileStorage, Result, StorageFile};
use log::trace;
use std::path::{Path, PathBuf};

pub const SEQ_SIZE: usize = 8;

pub struct Run {
	pub path: PathBuf,
	pub record_count: u64,
	/// On-disk record size including the 8-byte sequence prefix.
	pub stored_record_size: usize,
}

fn flush_run(
	buffer: &mut Vec<(u64, Vec<u8>)>,
	key_parts: &[KeyPart],
	record_size: usize,
	work_dir: &Path,
	run_index: usize,
) -> Result<Run> {
	// Stable sort: ties keep arrival order.
	buffer.sort_by(|a, b| compare_composite(key_parts, &a.1, &b.1));

	let stored_record_size = SEQ_SIZE + record_size;
	let path = work_dir.join(format!("run-{run_index}.tmp"));
	let mut file = FileStorage::open(&path, true)?;
	for (i, (seq, record)) in buffer.iter().enumerate() {
		let mut stored = Vec::with_capacity(stored_record_size);
		stored.extend_from_slice(&seq.to_ne_bytes());
		stored.extend_from_slice(record);
		file.write_at((i * stored_record_size) as u64, &stored).map_err(DictError::FileWriteError)?;
	}
	let record_count = buffer.len() as u64;
	buffer.clear();
	trace!("flushed run {} with {} record(s) to {}", run_index, record_count, path.display());
	Ok(Run { path, record_count, stored_record_size })
}

/// Drains `source` into a sequence of sorted runs, holding at most
/// `records_per_run` records in RAM at any time.
pub fn generate_runs(
	source: &mut dyn RecordSource,
	key_parts: &[KeyPart],
	records_per_run: usize,
	work_dir: &Path,
) -> Result<Vec<Run>> {
	let record_size = source.record_size();
	let mut runs = Vec::new();
	let mut buffer: Vec<(u64, Vec<u8>)> = Vec::with_capacity(records_per_run);
	let mut run_index = 0usize;
	let mut next_seq = 0u64;

	source.for_each(&mut |record: &[u8]| {
		buffer.push((next_seq, record.to_vec()));
		next_seq += 1;
		if buffer.len() >= records_per_run {
			runs.push(flush_run(&mut buffer, key_parts, record_size, work_dir, run_index)?);
			run_index += 1;
		}
		Ok(())
	})?;
	if !buffer.is_empty() {
		runs.push(flush_run(&mut buffer, key_parts, record_size, work_dir, run_index)?);
	}
	Ok(runs)
}
