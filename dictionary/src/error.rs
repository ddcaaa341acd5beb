// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error kinds shared by every dictionary implementation.
//!
//! Follows the hand-written `enum Error` / `impl fmt::Display` idiom used
//! elsewhere in this codebase rather than a derive-macro crate, so the
//! three error classes of the contract (programmer, exhaustion, storage)
//! stay visible at the match site.

use std::{error, fmt, io, result};

/// Every error a dictionary operation can return.
#[derive(Debug)]
pub enum DictError {
	/// `get`/`delete` found no record for the given key.
	ItemNotFound,
	/// `insert` under a unique write concern found the key already present.
	DuplicateKey,
	/// An allocation or RAM-side structure grew past what was available.
	OutOfMemory,
	/// A record (or a row assembled from several records) would not fit
	/// the declared slot/page size.
	RecordSizeTooLarge,
	/// The dictionary was asked to do something its current state forbids
	/// (e.g. operate on a closed instance, or `GROUP BY` without an
	/// aggregate).
	IllegalState(String),
	/// The operation is not supported by this implementation.
	NotImplemented,
	/// On-disk header failed to validate (bad magic/version) or another
	/// on-disk invariant was violated.
	Corrupted(String),
	FileOpenError(io::Error),
	FileReadError(io::Error),
	FileWriteError(io::Error),
	FileCloseError(io::Error),
	FileDeleteError(io::Error),
	FileRenameError(io::Error),
}

/// Crate-local result alias, mirrored by each implementation crate.
pub type Result<T> = result::Result<T, DictError>;

impl fmt::Display for DictError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DictError::ItemNotFound => write!(f, "item not found"),
			DictError::DuplicateKey => write!(f, "duplicate key"),
			DictError::OutOfMemory => write!(f, "out of memory"),
			DictError::RecordSizeTooLarge => write!(f, "record size too large"),
			DictError::IllegalState(msg) => write!(f, "illegal state: {}", msg),
			DictError::NotImplemented => write!(f, "not implemented"),
			DictError::Corrupted(msg) => write!(f, "corrupted: {}", msg),
			DictError::FileOpenError(e) => write!(f, "file open error: {}", e),
			DictError::FileReadError(e) => write!(f, "file read error: {}", e),
			DictError::FileWriteError(e) => write!(f, "file write error: {}", e),
			DictError::FileCloseError(e) => write!(f, "file close error: {}", e),
			DictError::FileDeleteError(e) => write!(f, "file delete error: {}", e),
			DictError::FileRenameError(e) => write!(f, "file rename error: {}", e),
		}
	}
}

impl error::Error for DictError {}

/// Maps a raw I/O failure from the storage substrate onto an `io::Error`.
/// Callers pick the variant that matches the operation they were
/// attempting; this is an `other_io_err`-style helper, specialized per
/// failure site.
pub fn other_io_err<E>(e: E) -> io::Error
where
	E: Into<Box<dyn error::Error + Send + Sync>>,
{
	io::Error::new(io::ErrorKind::Other, e)
}
