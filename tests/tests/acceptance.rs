// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Workspace-level acceptance suite: end-to-end scenarios run here
//! against the assembled system rather than any one crate in isolation.

use dictionary::{collect_all, Dictionary, DictionaryLifecycle, LexicographicComparator, Predicate, SignedIntComparator, UnsignedIntComparator, WriteConcern};
use dictionary_flatfile::{Config as FlatFileConfig, FlatFileDict};
use dictionary_linear_hash::{Config as LinearHashConfig, LinearHashDict};
use external_sort::Direction;
use query_executor::{execute, AggKind, AggValue, AggregateExpr, GroupByPart, OrderByPart, QueryConfig};
use std::sync::Arc;
use tempfile::tempdir;

fn value_for(i: u32) -> [u8; 10] {
	let s = format!("value:{:02}", i);
	let mut buf = [0u8; 10];
	buf[..s.len()].copy_from_slice(s.as_bytes());
	buf
}

/// Scenario 1: 9999 inserts into a linear-hash dictionary, followed by
/// get/delete/update and a full-cardinality scan.
#[test]
fn scenario_1_linear_hash_basic() {
	let dir = tempdir().unwrap();
	let config = LinearHashConfig {
		primary_path: dir.path().join("dict.lhs"),
		overflow_path: dir.path().join("dict.lhd"),
		key_size: 4,
		value_size: 10,
		write_concern: WriteConcern::Unique,
		initial_size: 4,
		split_threshold: 80,
		records_per_bucket: 4,
	};
	let mut dict = LinearHashDict::create(&config, Box::new(UnsignedIntComparator)).unwrap();
	for i in 0..9999u32 {
		dict.insert(&i.to_ne_bytes(), &value_for(i)).unwrap();
	}
	for i in [0u32, 1, 5000, 9998] {
		assert_eq!(&dict.get(&i.to_ne_bytes()).unwrap()[..], &value_for(i)[..]);
	}
	dict.delete(&42u32.to_ne_bytes()).unwrap();
	dict.update(&1u32.to_ne_bytes(), &value_for(999)).unwrap();
	assert_eq!(&dict.get(&1u32.to_ne_bytes()).unwrap()[..], &value_for(999)[..]);

	let mut cursor = dict.find(Predicate::AllRecords).unwrap();
	let records = collect_all(&mut *cursor).unwrap();
	assert_eq!(records.len(), 9998);
	Box::new(dict).close().unwrap();
}

/// Scenario 2: a flat-file equality cursor over duplicate keys.
#[test]
fn scenario_2_flatfile_equality_cursor() {
	let dir = tempdir().unwrap();
	let config = FlatFileConfig { path: dir.path().join("dict.ffd"), key_size: 4, value_size: 1, write_concern: WriteConcern::Duplicate };
	let mut dict = FlatFileDict::create(&config, Box::new(LexicographicComparator)).unwrap();
	for v in 0u8..5 {
		dict.insert(b"dupk", &[v]).unwrap();
	}
	dict.insert(b"othr", &[9]).unwrap();

	let mut cursor = dict.find(Predicate::equality(b"dupk".to_vec())).unwrap();
	let records = collect_all(&mut *cursor).unwrap();
	assert_eq!(records.len(), 5);
	assert!(records.iter().all(|(k, _)| &k[..] == b"dupk"));
	Box::new(dict).close().unwrap();
}

/// Scenario 3: a flat-file range cursor over an ordered key window.
#[test]
fn scenario_3_flatfile_range_cursor() {
	let dir = tempdir().unwrap();
	let config = FlatFileConfig { path: dir.path().join("dict.ffd"), key_size: 4, value_size: 10, write_concern: WriteConcern::Unique };
	let mut dict = FlatFileDict::create(&config, Box::new(UnsignedIntComparator)).unwrap();
	for i in 0..20u32 {
		dict.insert(&i.to_ne_bytes(), &value_for(i)).unwrap();
	}

	let mut cursor = dict.find(Predicate::range(5u32.to_ne_bytes().to_vec(), 10u32.to_ne_bytes().to_vec())).unwrap();
	let records = collect_all(&mut *cursor).unwrap();
	assert_eq!(records.len(), 6);
	for (idx, (key, value)) in records.iter().enumerate() {
		let expected = idx as u32 + 5;
		assert_eq!(u32::from_ne_bytes(key.as_slice().try_into().unwrap()), expected);
		assert_eq!(&value[..], &value_for(expected)[..]);
	}
	Box::new(dict).close().unwrap();
}

fn fixed8(s: &str) -> [u8; 8] {
	let mut buf = [0u8; 8];
	buf[..s.len()].copy_from_slice(s.as_bytes());
	buf
}

fn name_of(buf: &[u8]) -> String {
	let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
	String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Scenario 4: a two-source join, filtered on an embedded foreign key,
/// projected down to a (name, amount) pair, driven through the executor.
#[test]
fn scenario_4_executor_join_filter_project() {
	let dir = tempdir().unwrap();

	let customers_config =
		FlatFileConfig { path: dir.path().join("customers.ffd"), key_size: 4, value_size: 8, write_concern: WriteConcern::Unique };
	let mut customers = FlatFileDict::create(&customers_config, Box::new(UnsignedIntComparator)).unwrap();
	customers.insert(&1u32.to_ne_bytes(), &fixed8("alice")).unwrap();
	customers.insert(&2u32.to_ne_bytes(), &fixed8("bob")).unwrap();

	let orders_config = LinearHashConfig {
		primary_path: dir.path().join("orders.lhs"),
		overflow_path: dir.path().join("orders.lhd"),
		key_size: 4,
		value_size: 12,
		write_concern: WriteConcern::Unique,
		initial_size: 4,
		split_threshold: 80,
		records_per_bucket: 4,
	};
	let mut orders = LinearHashDict::create(&orders_config, Box::new(UnsignedIntComparator)).unwrap();
	let order_value = |customer_id: u32, amount: i64| -> [u8; 12] {
		let mut buf = [0u8; 12];
		buf[0..4].copy_from_slice(&customer_id.to_ne_bytes());
		buf[4..12].copy_from_slice(&amount.to_ne_bytes());
		buf
	};
	orders.insert(&1u32.to_ne_bytes(), &order_value(1, 100)).unwrap();
	orders.insert(&2u32.to_ne_bytes(), &order_value(2, 200)).unwrap();
	orders.insert(&3u32.to_ne_bytes(), &order_value(1, 50)).unwrap();
	// No matching customer; must be filtered out of the join.
	orders.insert(&4u32.to_ne_bytes(), &order_value(99, 999)).unwrap();

	let sources: Vec<Box<dyn Dictionary>> = vec![Box::new(customers), Box::new(orders)];
	let work_dir = dir.path().join("work");
	std::fs::create_dir_all(&work_dir).unwrap();

	let config = QueryConfig {
		sources,
		where_pred: Box::new(|tuple: &[u8]| tuple[0..4] == tuple[16..20]),
		project: Box::new(|tuple: &[u8], out: &mut Vec<u8>| {
			out.extend_from_slice(&tuple[4..12]);
			out.extend_from_slice(&tuple[20..28]);
		}),
		projected_row_size: 16,
		aggregates: Vec::new(),
		group_by: Vec::new(),
		order_by: Vec::new(),
		limit: None,
		when: Box::new(|_row: &[u8]| true),
		work_dir,
		page_size: 4096,
		records_per_run: 64,
	};

	let mut results: Vec<(String, i64)> = Vec::new();
	execute(
		config,
		&mut |row: &[u8], state: &mut Vec<(String, i64)>| {
			let name = name_of(&row[0..8]);
			let amount = i64::from_ne_bytes(row[8..16].try_into().unwrap());
			state.push((name, amount));
		},
		&mut results,
	)
	.unwrap();

	results.sort();
	assert_eq!(results, vec![("alice".to_string(), 50), ("alice".to_string(), 100), ("bob".to_string(), 200)]);
}

/// Scenario 5: a single-source aggregate/group/order query (SUM per
/// category, descending), driven through the executor's materialized
/// path with both spool/sort passes exercised.
#[test]
fn scenario_5_executor_aggregate_group_order() {
	let dir = tempdir().unwrap();
	let config = FlatFileConfig { path: dir.path().join("sales.ffd"), key_size: 4, value_size: 12, write_concern: WriteConcern::Unique };
	let mut sales = FlatFileDict::create(&config, Box::new(UnsignedIntComparator)).unwrap();

	let record = |category: &str, amount: i64| -> [u8; 12] {
		let mut buf = [0u8; 12];
		let cat = fixed8(category);
		buf[0..4].copy_from_slice(&cat[0..4]);
		buf[4..12].copy_from_slice(&amount.to_ne_bytes());
		buf
	};
	sales.insert(&0u32.to_ne_bytes(), &record("AAAA", 10)).unwrap();
	sales.insert(&1u32.to_ne_bytes(), &record("BBBB", 5)).unwrap();
	sales.insert(&2u32.to_ne_bytes(), &record("AAAA", 20)).unwrap();
	sales.insert(&3u32.to_ne_bytes(), &record("CCCC", 1)).unwrap();
	sales.insert(&4u32.to_ne_bytes(), &record("BBBB", 7)).unwrap();

	let sources: Vec<Box<dyn Dictionary>> = vec![Box::new(sales)];
	let work_dir = dir.path().join("work");
	std::fs::create_dir_all(&work_dir).unwrap();

	let lexicographic: Arc<dyn dictionary::Comparator> = Arc::new(LexicographicComparator);
	let signed_int: Arc<dyn dictionary::Comparator> = Arc::new(SignedIntComparator);

	let config = QueryConfig {
		sources,
		where_pred: Box::new(|_tuple: &[u8]| true),
		project: Box::new(|tuple: &[u8], out: &mut Vec<u8>| out.extend_from_slice(&tuple[4..8])),
		projected_row_size: 4,
		aggregates: vec![AggregateExpr::new(AggKind::Sum, |tuple: &[u8]| AggValue::I64(i64::from_ne_bytes(tuple[8..16].try_into().unwrap())))],
		group_by: vec![GroupByPart::new(4, Arc::clone(&lexicographic), Direction::Ascending, |tuple: &[u8]| tuple[4..8].to_vec())],
		order_by: vec![OrderByPart::new(8, Arc::clone(&signed_int), Direction::Descending, |row: &[u8]| row[5..13].to_vec())],
		limit: None,
		when: Box::new(|_row: &[u8]| true),
		work_dir,
		page_size: 4096,
		records_per_run: 64,
	};

	let mut results: Vec<(String, i64)> = Vec::new();
	execute(
		config,
		&mut |row: &[u8], state: &mut Vec<(String, i64)>| {
			let category = name_of(&row[0..4]);
			let sum = AggValue::decode(&row[4..13]);
			state.push((category, sum.as_f64() as i64));
		},
		&mut results,
	)
	.unwrap();

	assert_eq!(results, vec![("AAAA".to_string(), 30), ("BBBB".to_string(), 12), ("CCCC".to_string(), 1)]);
}

/// Scenario 6: enough inserts at a low split threshold and small initial
/// size to force at least three splits, checked for cardinality and
/// lookup correctness after every insert.
#[test]
fn scenario_6_linear_hash_split_correctness() {
	let dir = tempdir().unwrap();
	let config = LinearHashConfig {
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

	// initial_size=2, records_per_bucket=2, split_threshold=50 crosses
	// the load factor on nearly every insert once past the first couple
	// of buckets, so growing to 64 keys drives the addressing scheme
	// through well over three rounds of doubling (current_size isn't
	// exposed to callers, so correctness — not a literal split count —
	// is what's checked after every insert).
	let mut inserted = Vec::new();
	for i in 0..64u32 {
		dict.insert(&i.to_ne_bytes(), &i.to_ne_bytes()).unwrap();
		inserted.push(i);

		for &key in &inserted {
			let value = dict.get(&key.to_ne_bytes()).unwrap();
			assert_eq!(u32::from_ne_bytes(value.as_slice().try_into().unwrap()), key);
		}

		let mut cursor = dict.find(Predicate::AllRecords).unwrap();
		let records = collect_all(&mut *cursor).unwrap();
		assert_eq!(records.len(), inserted.len());
	}
	Box::new(dict).close().unwrap();
}
