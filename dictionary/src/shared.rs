// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A lock-guarded handle sharing one live dictionary across threads.
//! A host embedding the engine in a multi-threaded process wants to read
//! concurrently and to be able to close the dictionary out from under any
//! in-flight reader, so `close` swaps the lock's contents to `None`
//! rather than consuming `self`.

use crate::contract::{Dictionary, OpStatus};
use crate::cursor::DictCursor;
use crate::error::{DictError, Result};
use crate::key::DValue;
use crate::predicate::Predicate;
use log::{debug, warn};
use parking_lot::RwLock;

fn closed() -> DictError {
	DictError::IllegalState("dictionary is closed".to_string())
}

/// Shares one boxed `Dictionary` behind a `parking_lot::RwLock`. Readers
/// (`get`/`find`) take a shared lock; writers (`insert`/`update`/`delete`)
/// and `close` take an exclusive one.
pub struct SharedDictionary {
	inner: RwLock<Option<Box<dyn Dictionary>>>,
}

impl SharedDictionary {
	pub fn new(dict: Box<dyn Dictionary>) -> Self {
		SharedDictionary { inner: RwLock::new(Some(dict)) }
	}

	pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<OpStatus> {
		match self.inner.write().as_deref_mut() {
			Some(dict) => dict.insert(key, value),
			None => Err(closed()),
		}
	}

	pub fn get(&self, key: &[u8]) -> Result<DValue> {
		match self.inner.read().as_deref() {
			Some(dict) => dict.get(key),
			None => Err(closed()),
		}
	}

	pub fn update(&self, key: &[u8], value: &[u8]) -> Result<OpStatus> {
		match self.inner.write().as_deref_mut() {
			Some(dict) => dict.update(key, value),
			None => Err(closed()),
		}
	}

	pub fn delete(&self, key: &[u8]) -> Result<OpStatus> {
		match self.inner.write().as_deref_mut() {
			Some(dict) => dict.delete(key),
			None => Err(closed()),
		}
	}

	pub fn find(&self, predicate: Predicate) -> Result<Box<dyn DictCursor>> {
		match self.inner.read().as_deref() {
			Some(dict) => dict.find(predicate),
			None => Err(closed()),
		}
	}

	/// Closes the wrapped dictionary. Idempotent — a second call finds
	/// `None` already in place and is a no-op rather than a panic.
	pub fn close(&self) -> Result<()> {
		match self.inner.write().take() {
			Some(dict) => {
				debug!("closing shared dictionary");
				dict.close()
			}
			None => {
				warn!("close called on an already-closed shared dictionary");
				Ok(())
			}
		}
	}
}
