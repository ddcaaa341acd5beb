// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Generic dictionary contract: the predicate/cursor protocol, the
//! key/value/comparator types, and the storage substrate every dictionary
//! implementation is built on. Concrete implementations live in
//! `dictionary-linear-hash` and `dictionary-flatfile`.

mod contract;
mod cursor;
mod error;
mod key;
mod predicate;
mod shared;
mod substrate;

pub use contract::{Dictionary, DictionaryLifecycle, OpStatus, WriteConcern};
pub use cursor::{collect_all, CursorStatus, DictCursor};
pub use error::{other_io_err, DictError, Result};
pub use key::{default_comparator, Comparator, DKey, DValue, KeyType, LexicographicComparator, SignedIntComparator, UnsignedIntComparator};
pub use predicate::Predicate;
pub use shared::SharedDictionary;
pub use substrate::{remove_file, rename_file, FileStorage, StorageFile};
