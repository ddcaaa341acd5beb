// Copyright 2024 Embedded Data Systems
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Linear-hash dictionary: split-on-load, bucket-chained hashing over a
//! primary and an overflow file.

mod addressing;
mod chain;
mod cursor;
mod dict;
mod header;
mod page;

pub use addressing::{address_of, hash_key, level};
pub use cursor::LinearHashCursor;
pub use dict::{Config, LinearHashDict};
