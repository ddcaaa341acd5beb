// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Composite sort-key descriptor: offset, size and direction per part,
//! possibly multiple parts chained for a tie-break order.

use dictionary::Comparator;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Ascending,
	Descending,
}

/// One part of a composite sort key: a byte range within the record,
/// compared with `comparator`, in `direction`.
pub struct KeyPart {
	pub offset: usize,
	pub size: usize,
	pub comparator: Box<dyn Comparator>,
	pub direction: Direction,
}

impl KeyPart {
	pub fn ascending(offset: usize, size: usize, comparator: Box<dyn Comparator>) -> Self {
		KeyPart { offset, size, comparator, direction: Direction::Ascending }
	}

	pub fn descending(offset: usize, size: usize, comparator: Box<dyn Comparator>) -> Self {
		KeyPart { offset, size, comparator, direction: Direction::Descending }
	}

	fn slice<'a>(&self, record: &'a [u8]) -> &'a [u8] {
		&record[self.offset..self.offset + self.size]
	}
}

/// Compares two records part-by-part, short-circuiting on the first
/// part that differs. Empty `parts` means every record compares equal
/// (used by the query executor's "no GROUP BY/ORDER BY" global-group
/// case).
pub fn compare_composite(parts: &[KeyPart], a: &[u8], b: &[u8]) -> Ordering {
	for part in parts {
		let ord = part.comparator.compare(part.slice(a), part.slice(b));
		let ord = match part.direction {
			Direction::Ascending => ord,
			Direction::Descending => ord.reverse(),
		};
		if ord != Ordering::Equal {
			return ord;
		}
	}
	Ordering::Equal
}

/// Extracts the concatenated raw bytes of every key part, in
/// declaration order, ignoring direction (used only to surface the key
/// to callers — comparisons always go through [`compare_composite`]).
pub fn extract_key_bytes(parts: &[KeyPart], record: &[u8]) -> Vec<u8> {
	let mut out = Vec::new();
	for part in parts {
		out.extend_from_slice(part.slice(record));
	}
	out
}
