// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The query executor: join × filter × project × group × aggregate ×
//! order × limit, driven by a single data-driven `execute` routine
//! rather than per-query generated control flow. A query is a value —
//! [`QueryConfig`] — interpreted once by `execute`.

use crate::aggregate::{AggAccumulator, AggregateExpr};
use crate::join::NestedLoopJoin;
use crate::keypart::{group_key_size, group_keys_equal, group_sort_parts, order_key_size, order_sort_parts, GroupByPart, OrderByPart};
use crate::spool::SpoolWriter;
use dictionary::{remove_file, DictError, Dictionary, FileStorage, Result};
use external_sort::{ExternalSorter, PagedRecordFile};
use std::path::PathBuf;

/// Which of the three phase shapes a query takes: plain `SELECT`,
/// `SELECT ... GROUP BY`, or `SELECT ... ORDER BY`, funneled into the
/// same cursor-advance primitives rather than three separate code
/// paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPlan {
	/// No aggregates, no GROUP BY, no ORDER BY: rows stream straight
	/// from the join through WHERE/project/WHEN into the sink.
	Stream,
	/// Aggregates and/or GROUP BY are declared. Declaring aggregates
	/// without GROUP BY produces a single global group over all rows.
	/// May be followed by an ORDER BY pass.
	Grouped,
	/// No aggregates or GROUP BY, but ORDER BY is declared.
	Ordered,
}

/// A complete query, as a value, interpreted by a single executor
/// routine.
pub struct QueryConfig<'a> {
	/// Sources in join declaration order; source 0 is outermost.
	pub sources: Vec<Box<dyn Dictionary>>,
	/// Evaluated against the raw join tuple before projection.
	pub where_pred: Box<dyn Fn(&[u8]) -> bool + 'a>,
	/// Emits the projected row's bytes from a join tuple.
	pub project: Box<dyn Fn(&[u8], &mut Vec<u8>) + 'a>,
	/// Exact byte length `project` always emits.
	pub projected_row_size: usize,
	pub aggregates: Vec<AggregateExpr<'a>>,
	pub group_by: Vec<GroupByPart<'a>>,
	pub order_by: Vec<OrderByPart<'a>>,
	pub limit: Option<usize>,
	/// Evaluated after projection (and after any GROUP BY finalization),
	/// gating emission.
	pub when: Box<dyn Fn(&[u8]) -> bool + 'a>,
	/// Scratch directory for spool/run/merge files.
	pub work_dir: PathBuf,
	/// Page size bounding the materialized path's spool files.
	pub page_size: usize,
	/// Memory budget (in records) for the external sort's runs.
	pub records_per_run: usize,
}

fn plan_for(config: &QueryConfig) -> Result<ExecutionPlan> {
	let has_group = !config.group_by.is_empty();
	let has_agg = !config.aggregates.is_empty();
	let has_order = !config.order_by.is_empty();
	if has_group && !has_agg {
		return Err(DictError::IllegalState("GROUP BY declared without an aggregate".to_string()));
	}
	if has_group || has_agg {
		Ok(ExecutionPlan::Grouped)
	} else if has_order {
		Ok(ExecutionPlan::Ordered)
	} else {
		Ok(ExecutionPlan::Stream)
	}
}

/// Runs `config` to completion, calling `sink` once per emitted row.
/// Every source dictionary is closed on every exit path, including the
/// error path.
pub fn execute<S>(mut config: QueryConfig, sink: &mut dyn FnMut(&[u8], &mut S), state: &mut S) -> Result<()> {
	let plan = plan_for(&config)?;
	let sources = std::mem::take(&mut config.sources);
	let mut join = NestedLoopJoin::new(sources)?;

	log::debug!("executing query as {:?}", plan);
	let result = match plan {
		ExecutionPlan::Stream => run_stream(&mut join, &config, sink, state),
		ExecutionPlan::Grouped => run_grouped(&mut join, &config, sink, state),
		ExecutionPlan::Ordered => run_ordered(&mut join, &config, sink, state),
	};

	let close_result = join.close_all();
	match result {
		Ok(()) => close_result,
		Err(e) => {
			if let Err(close_err) = close_result {
				log::warn!("query failed ({}), and cleanup also failed: {}", e, close_err);
			}
			Err(e)
		}
	}
}

fn run_stream<S>(join: &mut NestedLoopJoin, config: &QueryConfig, sink: &mut dyn FnMut(&[u8], &mut S), state: &mut S) -> Result<()> {
	let mut remaining = config.limit;
	let mut projected = Vec::with_capacity(config.projected_row_size);
	while let Some(tuple) = join.next_tuple()? {
		if !(config.where_pred)(&tuple) {
			continue;
		}
		projected.clear();
		(config.project)(&tuple, &mut projected);
		if !(config.when)(&projected) {
			continue;
		}
		if remaining == Some(0) {
			break;
		}
		sink(&projected, state);
		if let Some(r) = remaining.as_mut() {
			*r -= 1;
		}
	}
	Ok(())
}

fn run_ordered<S>(join: &mut NestedLoopJoin, config: &QueryConfig, sink: &mut dyn FnMut(&[u8], &mut S), state: &mut S) -> Result<()> {
	let order_size = order_key_size(&config.order_by);
	let spooled_record_size = order_size + config.projected_row_size;
	let spool_path = config.work_dir.join("order-spool.tmp");

	let mut writer = SpoolWriter::create(&spool_path, config.page_size, spooled_record_size)?;
	let mut scratch = Vec::with_capacity(spooled_record_size);
	let mut projected = Vec::with_capacity(config.projected_row_size);
	while let Some(tuple) = join.next_tuple()? {
		if !(config.where_pred)(&tuple) {
			continue;
		}
		projected.clear();
		(config.project)(&tuple, &mut projected);

		scratch.clear();
		for part in &config.order_by {
			scratch.extend_from_slice(&(part.extract)(&projected));
		}
		scratch.extend_from_slice(&projected);
		writer.write(&scratch)?;
	}
	let spool = writer.finish();
	if spool.record_count == 0 {
		remove_file(&spool_path)?;
		return Ok(());
	}

	let key_parts = order_sort_parts(&config.order_by, 0);
	let sorter = ExternalSorter::new(key_parts, spooled_record_size, config.records_per_run);
	let mut spool_file = FileStorage::open(spool.path(), false)?;
	let mut source = PagedRecordFile::new(&mut spool_file, 0, spool.page_size, spool.record_size, spool.record_count);
	let sort_dir = config.work_dir.join("order-sort");
	std::fs::create_dir_all(&sort_dir).map_err(DictError::FileOpenError)?;
	let mut cursor = sorter.sort(&mut source, &sort_dir)?;
	drop(spool_file);
	remove_file(&spool_path)?;

	let mut remaining = config.limit;
	while let Some((_key, value)) = cursor.next()? {
		let row = &value[order_size..];
		if !(config.when)(row) {
			continue;
		}
		if remaining == Some(0) {
			break;
		}
		sink(row, state);
		if let Some(r) = remaining.as_mut() {
			*r -= 1;
		}
	}
	Ok(())
}

fn run_grouped<S>(join: &mut NestedLoopJoin, config: &QueryConfig, sink: &mut dyn FnMut(&[u8], &mut S), state: &mut S) -> Result<()> {
	let group_size = group_key_size(&config.group_by);
	let agg_bytes_size = crate::aggregate::AggValue::ENCODED_SIZE * config.aggregates.len();
	let spooled_record_size = group_size + agg_bytes_size + config.projected_row_size;
	let spool_path = config.work_dir.join("group-spool.tmp");

	let mut writer = SpoolWriter::create(&spool_path, config.page_size, spooled_record_size)?;
	let mut scratch = Vec::with_capacity(spooled_record_size);
	let mut projected = Vec::with_capacity(config.projected_row_size);
	while let Some(tuple) = join.next_tuple()? {
		if !(config.where_pred)(&tuple) {
			continue;
		}
		projected.clear();
		(config.project)(&tuple, &mut projected);

		scratch.clear();
		for part in &config.group_by {
			scratch.extend_from_slice(&(part.extract)(&tuple));
		}
		for agg in &config.aggregates {
			scratch.extend_from_slice(&(agg.extract)(&tuple).encode());
		}
		scratch.extend_from_slice(&projected);
		writer.write(&scratch)?;
	}
	let spool = writer.finish();
	if spool.record_count == 0 {
		remove_file(&spool_path)?;
		return Ok(());
	}

	let key_parts = group_sort_parts(&config.group_by, 0);
	let sorter = ExternalSorter::new(key_parts, spooled_record_size, config.records_per_run);
	let mut spool_file = FileStorage::open(spool.path(), false)?;
	let mut source = PagedRecordFile::new(&mut spool_file, 0, spool.page_size, spool.record_size, spool.record_count);
	// A distinct subdirectory keeps this pass's run/merge files from
	// colliding with the second sort pass below, should ORDER BY follow.
	let group_sort_dir = config.work_dir.join("group-sort");
	std::fs::create_dir_all(&group_sort_dir).map_err(DictError::FileOpenError)?;
	let mut cursor = sorter.sort(&mut source, &group_sort_dir)?;
	drop(spool_file);
	remove_file(&spool_path)?;

	let output_row_size = config.projected_row_size + agg_bytes_size;
	let order_size = order_key_size(&config.order_by);

	// If there's a following ORDER BY, finalized group rows are spooled
	// again, keyed by the order-by composite. Otherwise they're sunk
	// directly in group-sorted order.
	let mut order_writer = if config.order_by.is_empty() {
		None
	} else {
		Some(SpoolWriter::create(config.work_dir.join("order-spool.tmp"), config.page_size, order_size + output_row_size)?)
	};

	let mut accumulators: Vec<AggAccumulator> = config.aggregates.iter().map(|a| AggAccumulator::new(a.kind)).collect();
	let mut current_key: Option<Vec<u8>> = None;
	let mut representative_projected: Vec<u8> = Vec::new();
	let mut any_group = false;

	let mut emit_group = |accumulators: &mut Vec<AggAccumulator>,
	                       representative_projected: &[u8],
	                       order_writer: &mut Option<SpoolWriter>,
	                       sink: &mut dyn FnMut(&[u8], &mut S),
	                       state: &mut S,
	                       remaining: &mut Option<usize>|
	 -> Result<()> {
		let mut out = Vec::with_capacity(output_row_size);
		out.extend_from_slice(representative_projected);
		for acc in accumulators.iter() {
			out.extend_from_slice(&acc.finish().encode());
		}
		match order_writer {
			Some(writer) => {
				let mut record = Vec::with_capacity(order_size + output_row_size);
				for part in &config.order_by {
					record.extend_from_slice(&(part.extract)(&out));
				}
				record.extend_from_slice(&out);
				writer.write(&record)?;
			}
			None => {
				if !(config.when)(&out) {
					return Ok(());
				}
				if *remaining == Some(0) {
					return Ok(());
				}
				sink(&out, state);
				if let Some(r) = remaining.as_mut() {
					*r -= 1;
				}
			}
		}
		Ok(())
	};

	let mut remaining = config.limit;
	while let Some((_key, value)) = cursor.next()? {
		let row_group_key = &value[0..group_size];
		let row_agg_bytes = &value[group_size..group_size + agg_bytes_size];
		let row_projected = &value[group_size + agg_bytes_size..];

		let starts_new_group = match &current_key {
			None => true,
			Some(prev) => !group_keys_equal(&config.group_by, prev, row_group_key),
		};
		if starts_new_group {
			if any_group {
				if remaining == Some(0) && config.order_by.is_empty() {
					break;
				}
				emit_group(&mut accumulators, &representative_projected, &mut order_writer, sink, state, &mut remaining)?;
			}
			for (acc, agg) in accumulators.iter_mut().zip(config.aggregates.iter()) {
				*acc = AggAccumulator::new(agg.kind);
			}
			representative_projected = row_projected.to_vec();
			current_key = Some(row_group_key.to_vec());
			any_group = true;
		}
		for (i, acc) in accumulators.iter_mut().enumerate() {
			let bytes = &row_agg_bytes[i * crate::aggregate::AggValue::ENCODED_SIZE..(i + 1) * crate::aggregate::AggValue::ENCODED_SIZE];
			acc.fold(crate::aggregate::AggValue::decode(bytes));
		}
	}
	if any_group && !(remaining == Some(0) && config.order_by.is_empty()) {
		emit_group(&mut accumulators, &representative_projected, &mut order_writer, sink, state, &mut remaining)?;
	}

	let Some(writer) = order_writer else {
		return Ok(());
	};
	let order_spool = writer.finish();
	let order_spool_path = order_spool.path().to_path_buf();
	if order_spool.record_count == 0 {
		remove_file(&order_spool_path)?;
		return Ok(());
	}
	let order_key_parts = order_sort_parts(&config.order_by, 0);
	let order_record_size = order_size + output_row_size;
	let order_sorter = ExternalSorter::new(order_key_parts, order_record_size, config.records_per_run);
	let mut order_spool_file = FileStorage::open(&order_spool_path, false)?;
	let mut order_source = PagedRecordFile::new(&mut order_spool_file, 0, order_spool.page_size, order_spool.record_size, order_spool.record_count);
	let order_sort_dir = config.work_dir.join("order-sort");
	std::fs::create_dir_all(&order_sort_dir).map_err(DictError::FileOpenError)?;
	let mut order_cursor = order_sorter.sort(&mut order_source, &order_sort_dir)?;
	drop(order_spool_file);
	remove_file(&order_spool_path)?;

	while let Some((_key, value)) = order_cursor.next()? {
		let row = &value[order_size..];
		if !(config.when)(row) {
			continue;
		}
		if remaining == Some(0) {
			break;
		}
		sink(row, state);
		if let Some(r) = remaining.as_mut() {
			*r -= 1;
		}
	}
	Ok(())
}
