// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Cross-product nested-loop join over N dictionary cursors. Source 0
//! is outermost. Cursor advancement policy: advance
//! the innermost cursor; on exhaustion, re-initialize it (destroy and
//! re-issue `find`) and advance the next-outer cursor; repeat.
//! Termination: the outermost cursor exhausts and cannot be advanced.

use crate::row::RowLayout;
use dictionary::{DKey, DValue, DictCursor, Dictionary, Predicate, Result};

struct SourceState {
	dict: Box<dyn Dictionary>,
	cursor: Box<dyn DictCursor>,
	current: Option<(DKey, DValue)>,
}

/// Drives `N >= 1` dictionary sources as nested loops and owns their
/// cursors and dictionaries for the query's lifetime. Dropping (or
/// calling [`NestedLoopJoin::close_all`]) closes every source dictionary
/// in reverse of creation order.
pub struct NestedLoopJoin {
	sources: Vec<SourceState>,
	layout: RowLayout,
	started: bool,
	exhausted: bool,
}

impl NestedLoopJoin {
	/// Opens an all-records cursor on every source and seeds each one's
	/// current record. If any source is empty, the whole cross product
	/// is empty and the join starts already exhausted.
	pub fn new(dicts: Vec<Box<dyn Dictionary>>) -> Result<Self> {
		let sizes: Vec<(usize, usize)> = dicts.iter().map(|d| (d.key_size(), d.value_size())).collect();
		let layout = RowLayout::new(&sizes);
		let mut sources = Vec::with_capacity(dicts.len());
		let mut exhausted = dicts.is_empty();
		for dict in dicts {
			let mut cursor = dict.find(Predicate::AllRecords)?;
			let current = cursor.next()?;
			if current.is_none() {
				exhausted = true;
			}
			sources.push(SourceState { dict, cursor, current });
		}
		Ok(NestedLoopJoin { sources, layout, started: false, exhausted })
	}

	pub fn layout(&self) -> &RowLayout {
		&self.layout
	}

	/// Yields the next cross-product tuple's bytes, or `None` once every
	/// combination has been produced.
	pub fn next_tuple(&mut self) -> Result<Option<Vec<u8>>> {
		if self.exhausted {
			return Ok(None);
		}
		if !self.started {
			self.started = true;
			return Ok(Some(self.current_row()));
		}
		if self.advance()? {
			Ok(Some(self.current_row()))
		} else {
			Ok(None)
		}
	}

	fn advance(&mut self) -> Result<bool> {
		let mut i = self.sources.len() - 1;
		loop {
			if let Some(record) = self.sources[i].cursor.next()? {
				self.sources[i].current = Some(record);
				return Ok(true);
			}
			if i == 0 {
				self.exhausted = true;
				return Ok(false);
			}
			self.sources[i].cursor = self.sources[i].dict.find(Predicate::AllRecords)?;
			match self.sources[i].cursor.next()? {
				Some(record) => self.sources[i].current = Some(record),
				None => {
					// This source is genuinely empty; the whole cross
					// product is too.
					self.exhausted = true;
					return Ok(false);
				}
			}
			i -= 1;
		}
	}

	fn current_row(&self) -> Vec<u8> {
		let mut row = vec![0u8; self.layout.total_len];
		for (slot, source) in self.layout.slots.iter().zip(&self.sources) {
			if let Some((key, value)) = &source.current {
				row[slot.key_offset..slot.key_offset + slot.key_size].copy_from_slice(key);
				row[slot.value_offset..slot.value_offset + slot.value_size].copy_from_slice(value);
			}
		}
		row
	}

	/// Closes every source dictionary, innermost first (reverse of
	/// creation order). Safe to call more than once — a second call is a
	/// no-op since the source list is drained on the first.
	pub fn close_all(&mut self) -> Result<()> {
		let mut first_err = None;
		while let Some(source) = self.sources.pop() {
			if let Err(e) = source.dict.close() {
				log::warn!("error closing dictionary during query cleanup: {}", e);
				if first_err.is_none() {
					first_err = Some(e);
				}
			}
		}
		match first_err {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}

impl Drop for NestedLoopJoin {
	fn drop(&mut self) {
		// Backstop for panics and early returns that skip the explicit
		// `close_all` call in `execute` — `close_all` itself is a no-op
		// here if cleanup already ran.
		let _ = self.close_all();
	}
}
