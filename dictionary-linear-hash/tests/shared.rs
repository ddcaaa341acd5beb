// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use dictionary::{Dictionary, DictionaryLifecycle, LexicographicComparator, WriteConcern};
use dictionary_linear_hash::{Config, LinearHashDict};
use dictionary_shared_tests as shared;
use tempfile::tempdir;

fn open(dir: &tempfile::TempDir, write_concern: WriteConcern) -> LinearHashDict {
	let config = Config {
		primary_path: dir.path().join("dict.lhs"),
		overflow_path: dir.path().join("dict.lhd"),
		key_size: 4,
		value_size: 8,
		write_concern,
		initial_size: 4,
		split_threshold: 80,
		records_per_bucket: 4,
	};
	LinearHashDict::create(&config, Box::new(LexicographicComparator)).unwrap()
}

fn open_byte_values(dir: &tempfile::TempDir, write_concern: WriteConcern) -> LinearHashDict {
	let config = Config {
		primary_path: dir.path().join("dict.lhs"),
		overflow_path: dir.path().join("dict.lhd"),
		key_size: 4,
		value_size: 1,
		write_concern,
		initial_size: 4,
		split_threshold: 80,
		records_per_bucket: 4,
	};
	LinearHashDict::create(&config, Box::new(LexicographicComparator)).unwrap()
}

#[test]
fn insert_and_get() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	shared::test_insert_and_get(&mut dict, b"key1", b"12345678").unwrap();
}

#[test]
fn delete_then_get_not_found() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	shared::test_delete_then_get_not_found(&mut dict, b"key1", b"12345678").unwrap();
}

#[test]
fn update_overwrites() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	shared::test_update_overwrites(&mut dict, b"key1", b"aaaaaaaa", b"bbbbbbbb").unwrap();
}

#[test]
fn update_upserts_missing_key() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	shared::test_update_upserts_missing_key(&mut dict, b"key1", b"aaaaaaaa").unwrap();
}

#[test]
fn unique_write_concern_rejects_duplicate() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	shared::test_unique_write_concern_rejects_duplicate(&mut dict, b"key1", b"aaaaaaaa").unwrap();
}

#[test]
fn all_records_cardinality() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	let keys = shared::counter_keys(50);
	shared::test_all_records_cardinality(&mut dict, &keys, b"aaaaaaaa").unwrap();
}

#[test]
fn equality_cursor_yields_all_duplicates() {
	let dir = tempdir().unwrap();
	let mut dict = open_byte_values(&dir, WriteConcern::Duplicate);
	shared::test_equality_cursor_yields_all_duplicates(&mut dict, b"key1", 7).unwrap();
}

#[test]
fn equality_cursor_on_missing_key_starts_exhausted() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	shared::test_equality_cursor_on_missing_key_starts_exhausted(&mut dict, b"nope").unwrap();
}

#[test]
fn cursor_never_leaves_end_of_results() {
	let dir = tempdir().unwrap();
	let mut dict = open(&dir, WriteConcern::Unique);
	dict.insert(b"key1", b"aaaaaaaa").unwrap();
	dict.insert(b"key2", b"bbbbbbbb").unwrap();
	shared::test_cursor_never_leaves_end_of_results(&mut dict).unwrap();
}
