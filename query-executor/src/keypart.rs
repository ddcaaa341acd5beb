// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Composite-key descriptors for GROUP BY / ORDER BY, each pairing a
//! byte-extraction closure with the comparator and direction the
//! spooled rows are sorted by.
//!
//! `GroupByPart::extract` reads the raw join tuple — grouping commonly
//! needs a source column that never makes it into the projection.
//! `OrderByPart::extract` reads whatever row shape is current at the
//! point ordering is applied: the projected row when there is no GROUP
//! BY, or the finalized `[projected_row | aggregate results]` row when
//! ordering follows grouping.

use dictionary::Comparator;
use external_sort::{Direction, KeyPart};
use std::sync::Arc;

/// Adapts a shared `Arc<dyn Comparator>` to the `Box<dyn Comparator>`
/// external-sort's `KeyPart` owns, so the same comparator can both drive
/// the out-of-core sort and be consulted directly while walking the
/// sorted stream for group-key changes.
struct ArcComparator(Arc<dyn Comparator>);

impl Comparator for ArcComparator {
	fn compare(&self, a: &[u8], b: &[u8]) -> std::cmp::Ordering {
		self.0.compare(a, b)
	}
}

pub struct GroupByPart<'a> {
	pub size: usize,
	pub comparator: Arc<dyn Comparator>,
	pub direction: Direction,
	pub extract: Box<dyn Fn(&[u8]) -> Vec<u8> + 'a>,
}

impl<'a> GroupByPart<'a> {
	pub fn new(size: usize, comparator: Arc<dyn Comparator>, direction: Direction, extract: impl Fn(&[u8]) -> Vec<u8> + 'a) -> Self {
		GroupByPart { size, comparator, direction, extract: Box::new(extract) }
	}
}

pub struct OrderByPart<'a> {
	pub size: usize,
	pub comparator: Arc<dyn Comparator>,
	pub direction: Direction,
	pub extract: Box<dyn Fn(&[u8]) -> Vec<u8> + 'a>,
}

impl<'a> OrderByPart<'a> {
	pub fn new(size: usize, comparator: Arc<dyn Comparator>, direction: Direction, extract: impl Fn(&[u8]) -> Vec<u8> + 'a) -> Self {
		OrderByPart { size, comparator, direction, extract: Box::new(extract) }
	}
}

/// Builds the `external_sort::KeyPart` list for a sequence of
/// GROUP/ORDER BY parts whose extracted bytes are laid out consecutively
/// (in declaration order) starting at `base_offset` within a spooled row.
pub fn group_sort_parts(parts: &[GroupByPart], base_offset: usize) -> Vec<KeyPart> {
	let mut offset = base_offset;
	parts
		.iter()
		.map(|p| {
			let kp = KeyPart { offset, size: p.size, comparator: Box::new(ArcComparator(Arc::clone(&p.comparator))), direction: p.direction };
			offset += p.size;
			kp
		})
		.collect()
}

pub fn order_sort_parts(parts: &[OrderByPart], base_offset: usize) -> Vec<KeyPart> {
	let mut offset = base_offset;
	parts
		.iter()
		.map(|p| {
			let kp = KeyPart { offset, size: p.size, comparator: Box::new(ArcComparator(Arc::clone(&p.comparator))), direction: p.direction };
			offset += p.size;
			kp
		})
		.collect()
}

/// Total byte width of a sequence of GROUP BY parts' extracted keys.
pub fn group_key_size(parts: &[GroupByPart]) -> usize {
	parts.iter().map(|p| p.size).sum()
}

pub fn order_key_size(parts: &[OrderByPart]) -> usize {
	parts.iter().map(|p| p.size).sum()
}

/// True if two equal-length group-key byte strings (each the
/// concatenation of every part's extracted bytes, in declaration order)
/// compare equal part-by-part. Used while walking the group-sorted
/// stream to detect a group boundary.
pub fn group_keys_equal(parts: &[GroupByPart], a: &[u8], b: &[u8]) -> bool {
	let mut offset = 0;
	for p in parts {
		let sa = &a[offset..offset + p.size];
		let sb = &b[offset..offset + p.size];
		if !p.comparator.equal(sa, sb) {
			return false;
		}
		offset += p.size;
	}
	true
}
