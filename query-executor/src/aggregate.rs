// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Aggregate values and accumulators: min, max, count, sum, avg over a
//! 64-bit signed/unsigned/double domain, represented as a tagged sum
//! rather than a union with a separate tag byte.

/// A single aggregate's current or final value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggValue {
	I64(i64),
	U64(u64),
	F64(f64),
}

impl AggValue {
	fn tag(&self) -> u8 {
		match self {
			AggValue::I64(_) => 0,
			AggValue::U64(_) => 1,
			AggValue::F64(_) => 2,
		}
	}

	pub fn as_f64(&self) -> f64 {
		match *self {
			AggValue::I64(v) => v as f64,
			AggValue::U64(v) => v as f64,
			AggValue::F64(v) => v,
		}
	}

	/// Encodes as a 9-byte `[tag, 8-byte payload]`: 8 bytes per aggregate
	/// for the spooled row, plus a tag byte so `Sum`/`Avg` (which may
	/// change numeric domain) round-trip exactly across a spill.
	pub fn encode(&self) -> [u8; 9] {
		let mut buf = [0u8; 9];
		buf[0] = self.tag();
		let payload = match *self {
			AggValue::I64(v) => v.to_ne_bytes(),
			AggValue::U64(v) => v.to_ne_bytes(),
			AggValue::F64(v) => v.to_bits().to_ne_bytes(),
		};
		buf[1..9].copy_from_slice(&payload);
		buf
	}

	pub const ENCODED_SIZE: usize = 9;

	pub fn decode(buf: &[u8]) -> AggValue {
		debug_assert_eq!(buf.len(), Self::ENCODED_SIZE);
		let payload: [u8; 8] = buf[1..9].try_into().unwrap();
		match buf[0] {
			0 => AggValue::I64(i64::from_ne_bytes(payload)),
			1 => AggValue::U64(u64::from_ne_bytes(payload)),
			_ => AggValue::F64(f64::from_bits(u64::from_ne_bytes(payload))),
		}
	}
}

/// Which reduction an [`AggregateExpr`] folds its per-row values with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggKind {
	Min,
	Max,
	Count,
	Sum,
	Avg,
}

/// One declared aggregate: how to pull its raw per-row value out of a
/// join tuple, and which reduction folds those values together.
pub struct AggregateExpr<'a> {
	pub kind: AggKind,
	pub extract: Box<dyn Fn(&[u8]) -> AggValue + 'a>,
}

impl<'a> AggregateExpr<'a> {
	pub fn new(kind: AggKind, extract: impl Fn(&[u8]) -> AggValue + 'a) -> Self {
		AggregateExpr { kind, extract: Box::new(extract) }
	}
}

/// A per-group running accumulator. `fold` is called once per row in
/// arrival order within the group (arrival order is preserved by the
/// external sort's stability); `finish` produces the group's final
/// aggregate value.
#[derive(Debug, Clone, Copy)]
pub struct AggAccumulator {
	kind: AggKind,
	extremum: AggValue,
	initialized: bool,
	count: u64,
	sum: f64,
}

impl AggAccumulator {
	pub fn new(kind: AggKind) -> Self {
		AggAccumulator { kind, extremum: AggValue::I64(0), initialized: false, count: 0, sum: 0.0 }
	}

	pub fn fold(&mut self, input: AggValue) {
		self.count += 1;
		self.sum += input.as_f64();
		if !self.initialized {
			self.extremum = input;
			self.initialized = true;
			return;
		}
		match self.kind {
			AggKind::Min if input.as_f64() < self.extremum.as_f64() => self.extremum = input,
			AggKind::Max if input.as_f64() > self.extremum.as_f64() => self.extremum = input,
			_ => {}
		}
	}

	pub fn finish(&self) -> AggValue {
		match self.kind {
			AggKind::Min | AggKind::Max => self.extremum,
			AggKind::Count => AggValue::U64(self.count),
			AggKind::Avg => AggValue::F64(if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }),
			AggKind::Sum => match self.extremum {
				AggValue::F64(_) => AggValue::F64(self.sum),
				AggValue::U64(_) => AggValue::U64(self.sum as u64),
				AggValue::I64(_) => AggValue::I64(self.sum as i64),
			},
		}
	}
}
