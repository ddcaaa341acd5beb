// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end scenarios covering a cross-source join/filter/project
//! query, and a single-source aggregate/group/order query, both driven
//! through the data-driven [`query_executor::execute`] entry point
//! against real `dictionary-flatfile` / `dictionary-linear-hash`
//! instances.

use dictionary::{Dictionary, DictionaryLifecycle, LexicographicComparator, SignedIntComparator, UnsignedIntComparator, WriteConcern};
use dictionary_flatfile::{Config as FlatFileConfig, FlatFileDict};
use dictionary_linear_hash::{Config as LinearHashConfig, LinearHashDict};
use external_sort::Direction;
use query_executor::{execute, AggKind, AggValue, AggregateExpr, GroupByPart, OrderByPart, QueryConfig};
use std::sync::Arc;
use tempfile::tempdir;

fn fixed8(s: &str) -> [u8; 8] {
	let mut buf = [0u8; 8];
	buf[..s.len()].copy_from_slice(s.as_bytes());
	buf
}

fn name_of(buf: &[u8]) -> String {
	let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
	String::from_utf8_lossy(&buf[..end]).into_owned()
}

#[test]
fn join_filters_on_embedded_foreign_key_and_projects_name_and_amount() {
	let dir = tempdir().unwrap();

	let customers_config =
		FlatFileConfig { path: dir.path().join("customers.ffd"), key_size: 4, value_size: 8, write_concern: WriteConcern::Unique };
	let mut customers = FlatFileDict::create(&customers_config, Box::new(UnsignedIntComparator)).unwrap();
	customers.insert(&1u32.to_ne_bytes(), &fixed8("alice")).unwrap();
	customers.insert(&2u32.to_ne_bytes(), &fixed8("bob")).unwrap();
	customers.insert(&3u32.to_ne_bytes(), &fixed8("carol")).unwrap();

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
	let mut order_value = |customer_id: u32, amount: i64| -> [u8; 12] {
		let mut buf = [0u8; 12];
		buf[0..4].copy_from_slice(&customer_id.to_ne_bytes());
		buf[4..12].copy_from_slice(&amount.to_ne_bytes());
		buf
	};
	orders.insert(&1u32.to_ne_bytes(), &order_value(1, 100)).unwrap();
	orders.insert(&2u32.to_ne_bytes(), &order_value(2, 200)).unwrap();
	orders.insert(&3u32.to_ne_bytes(), &order_value(1, 50)).unwrap();
	orders.insert(&4u32.to_ne_bytes(), &order_value(3, 10)).unwrap();
	// No customer 4 exists; this order must be filtered out of the join.
	orders.insert(&5u32.to_ne_bytes(), &order_value(4, 999)).unwrap();

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
	execute(config, &mut |row: &[u8], state: &mut Vec<(String, i64)>| {
		let name = name_of(&row[0..8]);
		let amount = i64::from_ne_bytes(row[8..16].try_into().unwrap());
		state.push((name, amount));
	}, &mut results)
	.unwrap();

	results.sort();
	assert_eq!(
		results,
		vec![
			("alice".to_string(), 50),
			("alice".to_string(), 100),
			("bob".to_string(), 200),
			("carol".to_string(), 10),
		]
	);
}

#[test]
fn group_by_category_sums_amount_and_orders_by_sum_descending() {
	let dir = tempdir().unwrap();
	let config = FlatFileConfig { path: dir.path().join("sales.ffd"), key_size: 4, value_size: 12, write_concern: WriteConcern::Unique };
	let mut sales = FlatFileDict::create(&config, Box::new(UnsignedIntComparator)).unwrap();

	let mut record = |category: &str, amount: i64| -> [u8; 12] {
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
	execute(config, &mut |row: &[u8], state: &mut Vec<(String, i64)>| {
		let category = name_of(&row[0..4]);
		let sum = AggValue::decode(&row[4..13]);
		state.push((category, sum.as_f64() as i64));
	}, &mut results)
	.unwrap();

	assert_eq!(results, vec![("AAAA".to_string(), 30), ("BBBB".to_string(), 12), ("CCCC".to_string(), 1)]);
}

