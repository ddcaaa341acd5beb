// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key/value byte representation and the comparator that imposes a total
//! order over keys.

use smallvec::SmallVec;
use std::cmp::Ordering;

/// A record key. Small keys (the common case: 4/8-byte integers, short
/// byte strings) stay inline; anything larger spills to the heap.
pub type DKey = SmallVec<[u8; 16]>;

/// A record value. Slightly larger inline capacity than `DKey` since
/// values typically carry more payload.
pub type DValue = SmallVec<[u8; 32]>;

/// Declared key kind for a dictionary. Purely descriptive — it documents
/// which `Comparator` a dictionary was created with, so `open` can assert
/// the reopened comparator matches what `create` wrote to the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
	/// Signed two's-complement integer, host-endian, of the given width
	/// in bytes (1, 2, 4 or 8).
	SignedInt(u8),
	/// Unsigned integer, host-endian, of the given width in bytes.
	UnsignedInt(u8),
	/// Opaque byte string compared under a caller-supplied comparator.
	ByteString,
}

/// Total order over keys. Implementations must be consistent: if
/// `compare(a, b) == Equal` then `a` and `b` are the same key for every
/// dictionary operation (get/update/delete/equality cursors).
pub trait Comparator: Send + Sync {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

	fn equal(&self, a: &[u8], b: &[u8]) -> bool {
		self.compare(a, b) == Ordering::Equal
	}
}

/// Compares fixed-width host-endian signed integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignedIntComparator;

impl Comparator for SignedIntComparator {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		debug_assert_eq!(a.len(), b.len(), "signed-int comparator called with mismatched widths");
		match a.len() {
			1 => (a[0] as i8).cmp(&(b[0] as i8)),
			2 => i16::from_ne_bytes(a.try_into().unwrap()).cmp(&i16::from_ne_bytes(b.try_into().unwrap())),
			4 => i32::from_ne_bytes(a.try_into().unwrap()).cmp(&i32::from_ne_bytes(b.try_into().unwrap())),
			8 => i64::from_ne_bytes(a.try_into().unwrap()).cmp(&i64::from_ne_bytes(b.try_into().unwrap())),
			other => panic!("unsupported signed key width: {}", other),
		}
	}
}

/// Compares fixed-width host-endian unsigned integers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsignedIntComparator;

impl Comparator for UnsignedIntComparator {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		debug_assert_eq!(a.len(), b.len(), "unsigned-int comparator called with mismatched widths");
		match a.len() {
			1 => a[0].cmp(&b[0]),
			2 => u16::from_ne_bytes(a.try_into().unwrap()).cmp(&u16::from_ne_bytes(b.try_into().unwrap())),
			4 => u32::from_ne_bytes(a.try_into().unwrap()).cmp(&u32::from_ne_bytes(b.try_into().unwrap())),
			8 => u64::from_ne_bytes(a.try_into().unwrap()).cmp(&u64::from_ne_bytes(b.try_into().unwrap())),
			other => panic!("unsupported unsigned key width: {}", other),
		}
	}
}

/// Byte-wise lexicographic order, for `KeyType::ByteString` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicographicComparator;

impl Comparator for LexicographicComparator {
	fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
		a.cmp(b)
	}
}

/// Picks the default comparator for a declared key type. Byte-string keys
/// still default to lexicographic order; callers with a custom collation
/// supply their own `Comparator` instead of calling this.
pub fn default_comparator(key_type: KeyType) -> Box<dyn Comparator> {
	match key_type {
		KeyType::SignedInt(_) => Box::new(SignedIntComparator),
		KeyType::UnsignedInt(_) => Box::new(UnsignedIntComparator),
		KeyType::ByteString => Box::new(LexicographicComparator),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn signed_int_orders_negative_below_positive() {
		let cmp = SignedIntComparator;
		let neg = (-1i32).to_ne_bytes();
		let pos = 1i32.to_ne_bytes();
		assert_eq!(cmp.compare(&neg, &pos), Ordering::Less);
		assert_eq!(cmp.compare(&pos, &neg), Ordering::Greater);
		assert_eq!(cmp.compare(&pos, &pos), Ordering::Equal);
	}

	#[test]
	fn lexicographic_orders_bytes() {
		let cmp = LexicographicComparator;
		assert_eq!(cmp.compare(b"abc", b"abd"), Ordering::Less);
		assert!(cmp.equal(b"same", b"same"));
	}
}
