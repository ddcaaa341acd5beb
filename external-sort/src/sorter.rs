// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Top-level entry point tying run generation and merging together.

use crate::cursor::SortedCursor;
use crate::key::KeyPart;
use crate::merge::merge_runs;
use crate::run::generate_runs;
use crate::source::RecordSource;
use dictionary::{remove_file, DictCursor, FileStorage, Result};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Page-bounded, out-of-core sort. `page_size` bounds a
/// single record's declared size (`record_size_too_large` is the
/// caller's concern, not this crate's — callers that spool page-padded
/// rows are expected to have already enforced it); `records_per_run`
/// bounds how many records are held in RAM at once while generating a
/// run, which is this module's memory budget.
pub struct ExternalSorter {
	key_parts: Arc<Vec<KeyPart>>,
	record_size: usize,
	records_per_run: usize,
}

impl ExternalSorter {
	pub fn new(key_parts: Vec<KeyPart>, record_size: usize, records_per_run: usize) -> Self {
		ExternalSorter { key_parts: Arc::new(key_parts), record_size, records_per_run: records_per_run.max(1) }
	}

	/// Sorts every record `source` yields and returns a cursor over the
	/// result in non-decreasing composite-key order. `work_dir` holds the
	/// intermediate run files and the merged output; they are the
	/// caller's to clean up (a `tempfile::TempDir` in practice).
	pub fn sort(&self, source: &mut dyn RecordSource, work_dir: &Path) -> Result<Box<dyn DictCursor>> {
		let runs = generate_runs(source, &self.key_parts, self.records_per_run, work_dir)?;
		debug!("generated {} run(s) of up to {} records each", runs.len(), self.records_per_run);
		let output_path = work_dir.join("merged.tmp");
		let record_count = merge_runs(&runs, &self.key_parts, self.record_size, &output_path)?;
		debug!("merged {} run(s) into {} record(s)", runs.len(), record_count);
		for run in &runs {
			remove_file(&run.path)?;
		}
		let output = FileStorage::open(&output_path, false)?;
		Ok(Box::new(SortedCursor::new(output, Arc::clone(&self.key_parts), self.record_size, record_count)))
	}
}
