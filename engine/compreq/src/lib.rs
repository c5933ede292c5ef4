/* Copyright (c) 2026 Olle Mårtensson. This Source Code Form is subject to the terms of the Eclipse Public License, v. 2.0. */
//! compreq: decoding and validation of reactive component update requests.
//!
//! A browser-side component posts its current field values, a queue of
//! requested actions, and a checksum over the values. This crate turns that
//! body, whether JSON or multipart form data, into a [`ComponentRequest`]
//! whose data has passed the checksum and whose actions are classified into
//! [`Action`] variants.
//!
//! # Examples
//! ```
//! use compreq::{ChecksumDigest, ComponentRequest, InboundRequest, KeyedChecksum, Value};
//!
//! let digest = KeyedChecksum::sha256("secret");
//! let data = compreq::from_json_str(r#"{"name": "World"}"#).expect("data");
//! let body = format!(
//!     r#"{{"id": "c1", "epoch": "1700000000", "checksum": "{}", "data": {{"name": "World"}},
//!         "actionQueue": [{{"type": "callMethod", "payload": {{"name": "$toggle('open')"}}}}]}}"#,
//!     digest.digest(&data)
//! );
//!
//! let request = InboundRequest::json("/message/hello", body);
//! let component = ComponentRequest::new(&request, "hello", &digest).expect("valid request");
//! assert_eq!(component.data().get("name"), Some(&Value::from("World")));
//! assert_eq!(component.actions()[0].kind().as_str(), "toggle");
//! ```

mod error;
pub mod value;

pub mod action;
pub mod body;
pub mod call_method;
pub mod checksum;
pub mod hash;
pub mod path;
pub mod request;
pub mod serde_support;

pub use action::{classify, classify_queue, Action, ActionKind, RawAction};
pub use body::{decode, decode_with_options, DecodeOptions, InboundRequest, LogicalDocument};
pub use call_method::{parse_call_method_name, CallParseError, MethodCall};
pub use checksum::{to_canonical_json, validate_checksum, ChecksumDigest, KeyedChecksum};
pub use error::{ErrorKind, RequestError, RequestResult};
pub use hash::HashAlgorithm;
pub use path::PathTreeBuilder;
pub use request::ComponentRequest;
pub use serde_support::{from_json_slice, from_json_str, to_json_string};
pub use value::{Mapping, UploadedFile, Value};
