// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared tests for dictionary functionality, to be executed against
//! actual implementations.

use dictionary::{collect_all, CursorStatus, Dictionary, DictError, Predicate, Result};

/// Round-trip: `insert(k,v); get(k) -> v`.
pub fn test_insert_and_get(dict: &mut dyn Dictionary, key: &[u8], value: &[u8]) -> Result<()> {
	dict.insert(key, value)?;
	assert_eq!(dict.get(key)?.as_slice(), value);
	Ok(())
}

/// Delete law: `insert(k,v); delete(k); get(k) -> item_not_found`.
pub fn test_delete_then_get_not_found(dict: &mut dyn Dictionary, key: &[u8], value: &[u8]) -> Result<()> {
	dict.insert(key, value)?;
	dict.delete(key)?;
	match dict.get(key) {
		Err(DictError::ItemNotFound) => Ok(()),
		Err(other) => panic!("expected item_not_found, got {:?}", other),
		Ok(_) => panic!("expected item_not_found, got a value"),
	}
}

/// Update law: `insert(k,v1); update(k,v2); get(k) -> v2`.
pub fn test_update_overwrites(dict: &mut dyn Dictionary, key: &[u8], v1: &[u8], v2: &[u8]) -> Result<()> {
	dict.insert(key, v1)?;
	dict.update(key, v2)?;
	assert_eq!(dict.get(key)?.as_slice(), v2);
	Ok(())
}

/// Update-as-upsert: `update` on a missing key behaves as `insert` and
/// reports one record affected.
pub fn test_update_upserts_missing_key(dict: &mut dyn Dictionary, key: &[u8], value: &[u8]) -> Result<()> {
	let status = dict.update(key, value)?;
	assert_eq!(status.count, 1);
	assert_eq!(dict.get(key)?.as_slice(), value);
	Ok(())
}

/// Duplicate key under `WriteConcern::Unique` is rejected.
pub fn test_unique_write_concern_rejects_duplicate(dict: &mut dyn Dictionary, key: &[u8], value: &[u8]) -> Result<()> {
	dict.insert(key, value)?;
	match dict.insert(key, value) {
		Err(DictError::DuplicateKey) => Ok(()),
		Err(other) => panic!("expected duplicate_key, got {:?}", other),
		Ok(_) => panic!("expected duplicate_key, insert succeeded"),
	}
}

/// All-records cardinality: after `n` distinct-key inserts, a full-scan
/// cursor yields exactly `n` records.
pub fn test_all_records_cardinality(dict: &mut dyn Dictionary, keys: &[Vec<u8>], value: &[u8]) -> Result<()> {
	for key in keys {
		dict.insert(key, value)?;
	}
	let mut cursor = dict.find(Predicate::AllRecords)?;
	let records = collect_all(&mut *cursor)?;
	assert_eq!(records.len(), keys.len());
	Ok(())
}

/// Equality cursor completeness: a key inserted `m` times under
/// `WriteConcern::Duplicate` yields exactly `m` records from an equality
/// cursor.
pub fn test_equality_cursor_yields_all_duplicates(dict: &mut dyn Dictionary, key: &[u8], m: usize) -> Result<()> {
	for i in 0..m {
		dict.insert(key, &[i as u8])?;
	}
	let mut cursor = dict.find(Predicate::equality(key))?;
	let records = collect_all(&mut *cursor)?;
	assert_eq!(records.len(), m);
	Ok(())
}

/// An equality cursor on a key with zero matches starts in
/// `end_of_results` and never yields.
pub fn test_equality_cursor_on_missing_key_starts_exhausted(dict: &mut dyn Dictionary, missing_key: &[u8]) -> Result<()> {
	let mut cursor = dict.find(Predicate::equality(missing_key))?;
	assert_eq!(cursor.status(), CursorStatus::EndOfResults);
	assert!(cursor.next()?.is_none());
	Ok(())
}

/// Cursor state monotonicity: once `end_of_results`, a cursor never
/// transitions to anything else.
pub fn test_cursor_never_leaves_end_of_results(dict: &mut dyn Dictionary) -> Result<()> {
	let mut cursor = dict.find(Predicate::AllRecords)?;
	while cursor.next()?.is_some() {}
	assert_eq!(cursor.status(), CursorStatus::EndOfResults);
	assert!(cursor.next()?.is_none());
	assert_eq!(cursor.status(), CursorStatus::EndOfResults);
	Ok(())
}

/// Helper: build `n` unique keys from a host-endian counter.
pub fn counter_keys(n: u32) -> Vec<Vec<u8>> {
	(0..n).map(|i| i.to_ne_bytes().to_vec()).collect()
}
