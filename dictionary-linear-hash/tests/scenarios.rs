// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end scenarios covering large-scale inserts and split correctness
//! over a linear-hash dictionary.

use dictionary::{collect_all, DictError, Dictionary, DictionaryLifecycle, Predicate, UnsignedIntComparator, WriteConcern};
use dictionary_linear_hash::{Config, LinearHashDict};
use tempfile::tempdir;

fn fixed_value(s: &str) -> [u8; 10] {
	let mut buf = [0u8; 10];
	buf[..s.len()].copy_from_slice(s.as_bytes());
	buf
}

fn value_for(i: u32) -> [u8; 10] {
	fixed_value(&format!("value:{:02}", i))
}

#[test]
fn linear_hash_basic() {
	let dir = tempdir().unwrap();
	let config = Config {
		primary_path: dir.path().join("dict.lhs"),
		overflow_path: dir.path().join("dict.lhd"),
		key_size: 4,
		value_size: 10,
		write_concern: WriteConcern::Unique,
		initial_size: 4,
		split_threshold: 85,
		records_per_bucket: 4,
	};
	let mut dict = LinearHashDict::create(&config, Box::new(UnsignedIntComparator)).unwrap();
	for i in 0..9999u32 {
		dict.insert(&i.to_ne_bytes(), &value_for(i)).unwrap();
	}

	assert_eq!(&dict.get(&1234u32.to_ne_bytes()).unwrap()[..], &value_for(1234)[..]);

	dict.delete(&7u32.to_ne_bytes()).unwrap();
	assert!(matches!(dict.get(&7u32.to_ne_bytes()), Err(DictError::ItemNotFound)));

	dict.update(&1u32.to_ne_bytes(), &fixed_value("-12")).unwrap();
	assert_eq!(&dict.get(&1u32.to_ne_bytes()).unwrap()[..], &fixed_value("-12")[..]);

	let mut cursor = dict.find(Predicate::AllRecords).unwrap();
	let records = collect_all(&mut *cursor).unwrap();
	assert_eq!(records.len(), 9998);
}

#[test]
fn linear_hash_split_correctness() {
	let dir = tempdir().unwrap();
	let config = Config {
		primary_path: dir.path().join("dict.lhs"),
		overflow_path: dir.path().join("dict.lhd"),
		key_size: 4,
		value_size: 4,
		write_concern: WriteConcern::Unique,
		initial_size: 2,
		split_threshold: 50,
		records_per_bucket: 2,
	};
	let mut dict = LinearHashDict::create(&config, Box::new(UnsignedIntComparator)).unwrap();

	// initial_size=2, records_per_bucket=2, split_threshold=50 forces a
	// split roughly every other insert well before 40 keys, exercising
	// several rounds of the addressing scheme doubling.
	let mut inserted = Vec::new();
	for i in 0..40u32 {
		dict.insert(&i.to_ne_bytes(), &i.to_ne_bytes()).unwrap();
		inserted.push(i);

		for &key in &inserted {
			let value = dict.get(&key.to_ne_bytes()).unwrap();
			assert_eq!(u32::from_ne_bytes(value.as_slice().try_into().unwrap()), key);
		}

		let mut cursor = dict.find(Predicate::AllRecords).unwrap();
		let records = collect_all(&mut *cursor).unwrap();
		assert_eq!(records.len(), inserted.len(), "cardinality mismatch after inserting {} keys", inserted.len());
	}
}
