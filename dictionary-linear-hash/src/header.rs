// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Persistent linear-hash state. Written on `create`, refreshed in RAM
//! by every mutation, and flushed back to disk at the end of a split
//! and on `close` — the split's header write is deliberately the last
//! write of that operation.

use dictionary::{DictError, Result, WriteConcern};

const MAGIC: u32 = 0x4c48_4153; // "LHAS"
const VERSION: u16 = 1;

pub const HEADER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy)]
pub struct Header {
	pub key_size: u32,
	pub value_size: u32,
	pub write_concern: WriteConcern,
	pub initial_size: u64,
	pub current_size: u64,
	pub next_split: u64,
	pub split_threshold: u32,
	pub records_per_bucket: u32,
	pub num_records: u64,
	/// Head of the free list of reclaimed overflow pages, threaded
	/// through each freed page's link field. `-1` means empty.
	pub overflow_free_head: i64,
}

impl Header {
	pub fn encode(&self) -> [u8; HEADER_SIZE] {
		let mut buf = [0u8; HEADER_SIZE];
		buf[0..4].copy_from_slice(&MAGIC.to_ne_bytes());
		buf[4..6].copy_from_slice(&VERSION.to_ne_bytes());
		buf[6..10].copy_from_slice(&self.key_size.to_ne_bytes());
		buf[10..14].copy_from_slice(&self.value_size.to_ne_bytes());
		buf[14] = match self.write_concern {
			WriteConcern::Unique => 0,
			WriteConcern::Duplicate => 1,
		};
		buf[16..24].copy_from_slice(&self.initial_size.to_ne_bytes());
		buf[24..32].copy_from_slice(&self.current_size.to_ne_bytes());
		buf[32..40].copy_from_slice(&self.next_split.to_ne_bytes());
		buf[40..44].copy_from_slice(&self.split_threshold.to_ne_bytes());
		buf[44..48].copy_from_slice(&self.records_per_bucket.to_ne_bytes());
		buf[48..56].copy_from_slice(&self.num_records.to_ne_bytes());
		buf[56..64].copy_from_slice(&self.overflow_free_head.to_ne_bytes());
		buf
	}

	pub fn decode(buf: &[u8; HEADER_SIZE]) -> Result<Header> {
		let magic = u32::from_ne_bytes(buf[0..4].try_into().unwrap());
		let version = u16::from_ne_bytes(buf[4..6].try_into().unwrap());
		if magic != MAGIC {
			return Err(DictError::Corrupted(format!("bad linear-hash magic: {:#x}", magic)));
		}
		if version != VERSION {
			return Err(DictError::Corrupted(format!("unsupported linear-hash version: {}", version)));
		}
		let write_concern = match buf[14] {
			0 => WriteConcern::Unique,
			1 => WriteConcern::Duplicate,
			other => return Err(DictError::Corrupted(format!("bad write concern tag: {}", other))),
		};
		Ok(Header {
			key_size: u32::from_ne_bytes(buf[6..10].try_into().unwrap()),
			value_size: u32::from_ne_bytes(buf[10..14].try_into().unwrap()),
			write_concern,
			initial_size: u64::from_ne_bytes(buf[16..24].try_into().unwrap()),
			current_size: u64::from_ne_bytes(buf[24..32].try_into().unwrap()),
			next_split: u64::from_ne_bytes(buf[32..40].try_into().unwrap()),
			split_threshold: u32::from_ne_bytes(buf[40..44].try_into().unwrap()),
			records_per_bucket: u32::from_ne_bytes(buf[44..48].try_into().unwrap()),
			num_records: u64::from_ne_bytes(buf[48..56].try_into().unwrap()),
			overflow_free_head: i64::from_ne_bytes(buf[56..64].try_into().unwrap()),
		})
	}
}
