//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the serialization format used throughout BitTorrent for storing
//! and transmitting structured data, including `.torrent` files and tracker
//! responses.
//!
//! # Data Types
//!
//! Bencode supports four data types:
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! # Examples
//!
//! ```
//! use seedling::bencode::{decode, decode_prefix, encode, Value};
//!
//! // Decode a complete document
//! let value = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
//! assert_eq!(value.get(b"cow").and_then(|v| v.as_str()), Some("moo"));
//!
//! // Decode a value embedded in a larger buffer
//! let (value, consumed) = decode_prefix(b"i-42eXYZ").unwrap();
//! assert_eq!(value, Value::Integer(-42));
//! assert_eq!(consumed, 5);
//!
//! // Re-encoding reproduces the source bytes exactly
//! assert_eq!(encode(&decode(b"l4:spam4:eggse").unwrap()).unwrap(), b"l4:spam4:eggse");
//! ```
//!
//! # Error Handling
//!
//! Decoding can fail for various reasons:
//!
//! - [`BencodeError::Malformed`] - Syntax violation (bad tag, missing `:` or `e`, leading zeros)
//! - [`BencodeError::Truncated`] - A string declares more bytes than remain
//! - [`BencodeError::NestingTooDeep`] - Recursion limit exceeded (max 64 levels)
//! - [`BencodeError::TrailingData`] - Extra data after the value
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod json;
mod value;

pub use decode::{decode, decode_at, decode_prefix};
pub use encode::{encode, encode_to};
pub use error::BencodeError;
pub use json::{to_json, Json};
pub use value::{Dict, Value};
