// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! K-way merge of sorted runs into one flat, stably-ordered output file.

use crate::key::{compare_composite, KeyPart};
use crate::run::Run;
use dictionary::{DictError, FileStorage, Result, StorageFile};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;

/// One run's read cursor during the merge: its file handle, how many
/// records remain, and the next un-consumed record (pre-fetched so the
/// heap can compare without re-reading).
struct RunReader {
	file: FileStorage,
	stored_record_size: usize,
	remaining: u64,
	next_offset: u64,
}

impl RunReader {
	fn open(run: &Run) -> Result<Self> {
		Ok(RunReader { file: FileStorage::open(&run.path, false)?, stored_record_size: run.stored_record_size, remaining: run.record_count, next_offset: 0 })
	}

	fn read_at(&mut self, index: u64, buf: &mut [u8]) -> Result<()> {
		self.file.read_at(index * self.stored_record_size as u64, buf).map_err(DictError::FileReadError)
	}
}

/// A heap entry: the run it came from, its stored record bytes (seq
/// prefix + record), ordered by composite key then sequence number so
/// the heap pops records in stable sorted order.
struct HeapEntry<'a> {
	run_index: usize,
	seq: u64,
	record: Vec<u8>,
	key_parts: &'a [KeyPart],
}

impl PartialEq for HeapEntry<'_> {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}
impl Eq for HeapEntry<'_> {}

impl PartialOrd for HeapEntry<'_> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for HeapEntry<'_> {
	fn cmp(&self, other: &Self) -> Ordering {
		// `BinaryHeap` is a max-heap; reverse so the smallest key pops first.
		// Records are stored with their sequence-number prefix, so the
		// comparator is applied past it.
		compare_composite(self.key_parts, &self.record[crate::run::SEQ_SIZE..], &other.record[crate::run::SEQ_SIZE..])
			.then(self.seq.cmp(&other.seq))
			.reverse()
	}
}

/// Merges `runs` (each individually sorted and stable, per [`crate::run::generate_runs`])
/// into a single flat file at `output_path` containing only the
/// original record bytes (the sequence prefix is stripped — the file is
/// already in final stable order, so nothing downstream needs it).
pub fn merge_runs(runs: &[Run], key_parts: &[KeyPart], record_size: usize, output_path: &Path) -> Result<u64> {
	let mut readers: Vec<RunReader> = runs.iter().map(RunReader::open).collect::<Result<_>>()?;
	let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::new();

	for (run_index, reader) in readers.iter_mut().enumerate() {
		if let Some(entry) = pull_next(reader, run_index, key_parts)? {
			heap.push(entry);
		}
	}

	let mut output = FileStorage::open(output_path, true)?;
	let mut written = 0u64;
	while let Some(top) = heap.pop() {
		let record = &top.record[crate::run::SEQ_SIZE..];
		output.write_at(written * record_size as u64, record).map_err(DictError::FileWriteError)?;
		written += 1;

		let reader = &mut readers[top.run_index];
		if let Some(entry) = pull_next(reader, top.run_index, key_parts)? {
			heap.push(entry);
		}
	}
	Ok(written)
}

fn pull_next<'a>(reader: &mut RunReader, run_index: usize, key_parts: &'a [KeyPart]) -> Result<Option<HeapEntry<'a>>> {
	if reader.remaining == 0 {
		return Ok(None);
	}
	let mut buf = vec![0u8; reader.stored_record_size];
	reader.read_at(reader.next_offset, &mut buf)?;
	reader.next_offset += 1;
	reader.remaining -= 1;
	let seq = u64::from_ne_bytes(buf[..crate::run::SEQ_SIZE].try_into().unwrap());
	Ok(Some(HeapEntry { run_index, seq, record: buf, key_parts }))
}
