// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bucket-chain walking, slot placement and overflow-page allocation.
//!
//! Free functions rather than methods on the dictionary type: both the
//! mutating operations (which hold the dictionary's own file handles)
//! and the read-only cursor (which opens independent handles so `get`
//! and `find` can take `&self`) walk the exact same chain logic.

use crate::page::{Layout, PageHeader, SlotStatus, STATUS_SIZE};
use dictionary::{Comparator, DKey, DValue, DictError, Result, StorageFile};
use std::ops::ControlFlow;

/// One page in a bucket's chain: the primary page itself, or the
/// `n`-th overflow page reached by following `link` fields.
#[derive(Debug, Clone, Copy)]
pub enum PageRef {
	Primary(u64),
	Overflow(u64),
}

impl PageRef {
	pub fn index(&self) -> u64 {
		match self {
			PageRef::Primary(i) | PageRef::Overflow(i) => *i,
		}
	}
}

fn file_for<'a>(page: PageRef, primary: &'a mut dyn StorageFile, overflow: &'a mut dyn StorageFile) -> &'a mut dyn StorageFile {
	match page {
		PageRef::Primary(_) => primary,
		PageRef::Overflow(_) => overflow,
	}
}

/// Lists every page in `bucket`'s chain, primary first, then overflow
/// pages in link order (the order records were tail-appended in).
pub fn list_chain(
	layout: &Layout,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	bucket: u64,
) -> Result<Vec<PageRef>> {
	let mut pages = vec![PageRef::Primary(bucket)];
	let mut link = layout.read_page_header(primary, bucket)?.link;
	while link != PageHeader::NULL {
		let idx = link as u64;
		pages.push(PageRef::Overflow(idx));
		link = layout.read_page_header(overflow, idx)?.link;
	}
	Ok(pages)
}

fn find_empty_slot(layout: &Layout, file: &mut dyn StorageFile, page: u64) -> Result<Option<usize>> {
	let mut status = [0u8; STATUS_SIZE];
	for slot in 0..layout.records_per_bucket {
		layout.read_slot(file, page, slot, &mut status)?;
		if status[0] == SlotStatus::Empty as u8 {
			return Ok(Some(slot));
		}
	}
	Ok(None)
}

/// Visits every in-use slot of `bucket`'s chain in chain order, stopping
/// early if `visit` returns `ControlFlow::Break`.
pub fn scan_bucket<B>(
	layout: &Layout,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	bucket: u64,
	mut visit: impl FnMut(PageRef, usize, &[u8], &[u8]) -> Result<ControlFlow<B>>,
) -> Result<Option<B>> {
	let pages = list_chain(layout, primary, overflow, bucket)?;
	let mut buf = vec![0u8; layout.slot_size()];
	for page in pages {
		for slot in 0..layout.records_per_bucket {
			layout.read_slot(file_for(page, primary, overflow), page.index(), slot, &mut buf)?;
			if buf[0] != SlotStatus::InUse as u8 {
				continue;
			}
			let key = &buf[STATUS_SIZE..STATUS_SIZE + layout.key_size];
			let value = &buf[STATUS_SIZE + layout.key_size..layout.slot_size()];
			if let ControlFlow::Break(b) = visit(page, slot, key, value)? {
				return Ok(Some(b));
			}
		}
	}
	Ok(None)
}

/// Returns the value of the first slot in `bucket`'s chain whose key
/// compares equal to `key`.
pub fn find_first(
	layout: &Layout,
	comparator: &dyn Comparator,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	bucket: u64,
	key: &[u8],
) -> Result<Option<DValue>> {
	scan_bucket(layout, primary, overflow, bucket, |_page, _slot, k, v| {
		if comparator.equal(k, key) {
			Ok(ControlFlow::Break(DValue::from_slice(v)))
		} else {
			Ok(ControlFlow::Continue(()))
		}
	})
}

/// Sets every slot in `bucket`'s chain matching `key` to `new_value`.
/// Returns how many slots were updated.
pub fn update_all(
	layout: &Layout,
	comparator: &dyn Comparator,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	bucket: u64,
	key: &[u8],
	new_value: &[u8],
) -> Result<usize> {
	let pages = list_chain(layout, primary, overflow, bucket)?;
	let mut updated = 0usize;
	let mut buf = vec![0u8; layout.slot_size()];
	for page in &pages {
		for slot in 0..layout.records_per_bucket {
			layout.read_slot(file_for(*page, primary, overflow), page.index(), slot, &mut buf)?;
			if buf[0] != SlotStatus::InUse as u8 {
				continue;
			}
			let slot_key = &buf[STATUS_SIZE..STATUS_SIZE + layout.key_size];
			if comparator.equal(slot_key, key) {
				let mut rec = buf.clone();
				rec[STATUS_SIZE + layout.key_size..layout.slot_size()].copy_from_slice(new_value);
				layout.write_slot(file_for(*page, primary, overflow), page.index(), slot, &rec)?;
				updated += 1;
			}
		}
	}
	Ok(updated)
}

/// Sets every slot in `bucket`'s chain matching `key` to `Empty`. Does
/// not compact or free overflow pages.
pub fn delete_all(
	layout: &Layout,
	comparator: &dyn Comparator,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	bucket: u64,
	key: &[u8],
) -> Result<usize> {
	let pages = list_chain(layout, primary, overflow, bucket)?;
	let mut removed = 0usize;
	let mut buf = vec![0u8; layout.slot_size()];
	for page in &pages {
		for slot in 0..layout.records_per_bucket {
			layout.read_slot(file_for(*page, primary, overflow), page.index(), slot, &mut buf)?;
			if buf[0] != SlotStatus::InUse as u8 {
				continue;
			}
			let slot_key = &buf[STATUS_SIZE..STATUS_SIZE + layout.key_size];
			if comparator.equal(slot_key, key) {
				layout.write_slot(file_for(*page, primary, overflow), page.index(), slot, &[SlotStatus::Empty as u8])?;
				removed += 1;
			}
		}
	}
	Ok(removed)
}

/// Allocates an overflow page: pops the free list if non-empty, else
/// appends one at EOF of the overflow file.
pub fn alloc_overflow_page(
	layout: &Layout,
	overflow: &mut dyn StorageFile,
	overflow_free_head: &mut i64,
	owning_bucket: u32,
) -> Result<u64> {
	let index = if *overflow_free_head != PageHeader::NULL {
		let idx = *overflow_free_head as u64;
		let freed_header = layout.read_page_header(overflow, idx)?;
		*overflow_free_head = freed_header.link;
		idx
	} else {
		let end = overflow.len().map_err(DictError::FileReadError)?;
		end / layout.page_size() as u64
	};
	layout.write_blank_page(overflow, index, owning_bucket)?;
	Ok(index)
}

/// Inserts `(key, value)` into the first free slot found walking
/// `bucket`'s chain, allocating and tail-appending a new overflow page
/// if every existing page is full. Tail-appending preserves insertion
/// order.
pub fn insert_physical(
	layout: &Layout,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	overflow_free_head: &mut i64,
	bucket: u64,
	key: &[u8],
	value: &[u8],
) -> Result<()> {
	let mut record = Vec::with_capacity(layout.slot_size());
	record.push(SlotStatus::InUse as u8);
	record.extend_from_slice(key);
	record.extend_from_slice(value);

	let pages = list_chain(layout, primary, overflow, bucket)?;
	for page in &pages {
		let mut header = layout.read_page_header(file_for(*page, primary, overflow), page.index())?;
		if (header.occupied_count as usize) < layout.records_per_bucket {
			let slot = find_empty_slot(layout, file_for(*page, primary, overflow), page.index())?
				.expect("occupied_count under capacity implies a free slot");
			layout.write_slot(file_for(*page, primary, overflow), page.index(), slot, &record)?;
			header.occupied_count += 1;
			layout.write_page_header(file_for(*page, primary, overflow), page.index(), &header)?;
			return Ok(());
		}
	}

	// Every existing page is full: allocate a fresh overflow page and
	// tail-append it.
	let new_index = alloc_overflow_page(layout, overflow, overflow_free_head, bucket as u32)?;
	layout.write_slot(overflow, new_index, 0, &record)?;
	let mut new_header = layout.read_page_header(overflow, new_index)?;
	new_header.occupied_count = 1;
	layout.write_page_header(overflow, new_index, &new_header)?;

	let tail = *pages.last().expect("list_chain always includes the primary page");
	let mut tail_header = layout.read_page_header(file_for(*tail, primary, overflow), tail.index())?;
	tail_header.link = new_index as i64;
	layout.write_page_header(file_for(*tail, primary, overflow), tail.index(), &tail_header)?;
	Ok(())
}

/// Reads every in-use record out of `bucket`'s chain, frees its overflow
/// pages onto the free list, and resets the primary page to blank — used
/// by split to empty the bucket being rehashed.
pub fn drain_bucket(
	layout: &Layout,
	primary: &mut dyn StorageFile,
	overflow: &mut dyn StorageFile,
	overflow_free_head: &mut i64,
	bucket: u64,
) -> Result<Vec<(DKey, DValue)>> {
	let mut records = Vec::new();
	scan_bucket::<()>(layout, primary, overflow, bucket, |_page, _slot, k, v| {
		records.push((DKey::from_slice(k), DValue::from_slice(v)));
		Ok(ControlFlow::Continue(()))
	})?;

	// Free the overflow chain: thread each page onto the front of the
	// global free list.
	let mut link = layout.read_page_header(primary, bucket)?.link;
	while link != PageHeader::NULL {
		let idx = link as u64;
		let mut page_header = layout.read_page_header(overflow, idx)?;
		let next = page_header.link;
		page_header.link = *overflow_free_head;
		layout.write_page_header(overflow, idx, &page_header)?;
		*overflow_free_head = idx as i64;
		link = next;
	}

	layout.write_blank_page(primary, bucket, bucket as u32)?;
	Ok(records)
}
