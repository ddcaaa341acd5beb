// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The cursor/predicate iterator protocol every dictionary implementation
//! exposes.
//!
//! The source API returns a pointer with a `destroy` function; here a
//! cursor is a plain value that owns its position state and whatever file
//! handle or buffer backs it, released by its `Drop` impl. There is no
//! separate `destroy` method to call — dropping the cursor destroys it,
//! which also makes double-destroy unrepresentable.

use crate::error::Result;
use crate::key::{DKey, DValue};

/// Cursor lifecycle state.
///
/// ```text
/// uninitialized -> initialized -> active <-> active -> end_of_results
///                      |              |
///                   invalid        invalid
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
	/// Constructed but not yet handed back from `find`. Never observed by
	/// callers — `find` always returns a cursor that has already moved to
	/// `Initialized` or `EndOfResults`.
	Uninitialized,
	/// At least one match exists; `next` has not yet been called.
	Initialized,
	/// `next` has yielded at least one record and more may follow.
	Active,
	/// All matching records have been yielded. Terminal: the cursor never
	/// leaves this state.
	EndOfResults,
	/// An I/O failure occurred. Terminal: every subsequent `next` returns
	/// this status again without touching the backing file.
	Invalid,
}

/// A stateful iterator over records matching a predicate.
pub trait DictCursor {
	/// Current lifecycle state.
	fn status(&self) -> CursorStatus;

	/// Advance and yield the next matching record, or `None` once
	/// `status()` has settled on `EndOfResults`. Returns `Err` (and
	/// transitions to `Invalid`) on I/O failure.
	fn next(&mut self) -> Result<Option<(DKey, DValue)>>;
}

/// Drains a cursor into a `Vec`, for tests and small scans. Stops as soon
/// as `status()` is `EndOfResults` or `next()` fails.
pub fn collect_all(cursor: &mut dyn DictCursor) -> Result<Vec<(DKey, DValue)>> {
	let mut out = Vec::new();
	while let Some(record) = cursor.next()? {
		out.push(record);
	}
	Ok(out)
}
