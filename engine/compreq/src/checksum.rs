use std::fmt::{self, Write as _};

use subtle::ConstantTimeEq;

use crate::error::{RequestError, RequestResult};
use crate::hash::HashAlgorithm;
use crate::value::{UploadedFile, Value};

/// Computes the integrity checksum that clients echo back with their data.
///
/// Implementations must be pure: equal values (mapping key order aside) must
/// always produce the same checksum. They are shared across concurrent
/// requests.
pub trait ChecksumDigest: Send + Sync {
    fn digest(&self, data: &Value) -> String;
}

/// Keyed digest over the canonical JSON rendering of the data, hex encoded.
#[derive(Clone)]
pub struct KeyedChecksum {
    algorithm: HashAlgorithm,
    secret: Vec<u8>,
}

impl KeyedChecksum {
    pub fn new(algorithm: HashAlgorithm, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            secret: secret.into(),
        }
    }

    pub fn sha256(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(HashAlgorithm::Sha256, secret)
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for KeyedChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedChecksum")
            .field("algorithm", &self.algorithm)
            .field("secret_len", &self.secret.len())
            .finish()
    }
}

impl ChecksumDigest for KeyedChecksum {
    fn digest(&self, data: &Value) -> String {
        let canonical = to_canonical_json(data);
        match self.algorithm.keyed(&self.secret, canonical.as_bytes()) {
            Ok(mac) => hex::encode(mac),
            // An empty digest never matches a supplied checksum.
            Err(err) => {
                tracing::warn!(algorithm = self.algorithm.as_str(), %err, "checksum key rejected");
                String::new()
            }
        }
    }
}

/// Reject `data` unless `supplied` is present and equals its digest.
pub fn validate_checksum(
    data: &Value,
    supplied: Option<&str>,
    digest: &dyn ChecksumDigest,
) -> RequestResult<()> {
    let supplied = match supplied {
        Some(checksum) if !checksum.is_empty() => checksum,
        _ => return Err(RequestError::ChecksumMismatch("Missing checksum".into())),
    };
    let expected = digest.digest(data);
    let matches: bool = expected.as_bytes().ct_eq(supplied.as_bytes()).into();
    if expected.is_empty() || !matches {
        tracing::warn!(
            supplied_len = supplied.len(),
            expected_len = expected.len(),
            "rejecting request with mismatched checksum"
        );
        return Err(RequestError::ChecksumMismatch(
            "Checksum does not match".into(),
        ));
    }
    Ok(())
}

/// Canonical JSON: object keys sorted bytewise, no whitespace, shortest
/// number forms, files as a `$file` object.
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_canonical_value(value, &mut out);
    out
}

fn write_canonical_value(value: &Value, out: &mut String) -> fmt::Result {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(v) => write!(out, "{}", v)?,
        Value::UInt(v) => write!(out, "{}", v)?,
        Value::Float(v) => out.push_str(&format_float(v.0)),
        Value::String(s) => write_canonical_string(s, out)?,
        Value::Sequence(items) => {
            out.push('[');
            let mut first = true;
            for item in items {
                if !first {
                    out.push(',');
                }
                first = false;
                write_canonical_value(item, out)?;
            }
            out.push(']');
        }
        Value::Mapping(entries) => {
            let mut ordered: Vec<(&str, &Value)> = entries.iter().collect();
            ordered.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            let mut first = true;
            for (key, val) in ordered {
                if !first {
                    out.push(',');
                }
                first = false;
                write_canonical_string(key, out)?;
                out.push(':');
                write_canonical_value(val, out)?;
            }
            out.push('}');
        }
        Value::File(file) => write_canonical_file(file, out)?,
    }
    Ok(())
}

fn write_canonical_file(file: &UploadedFile, out: &mut String) -> fmt::Result {
    out.push_str("{\"$file\":{\"content_type\":");
    match &file.content_type {
        Some(content_type) => write_canonical_string(content_type, out)?,
        None => out.push_str("null"),
    }
    out.push_str(",\"name\":");
    write_canonical_string(&file.name, out)?;
    write!(out, ",\"size\":{}}}}}", file.size)
}

fn write_canonical_string(s: &str, out: &mut String) -> fmt::Result {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ch if (ch as u32) < 0x20 => write!(out, "\\u{:04x}", ch as u32)?,
            ch => out.push(ch),
        }
    }
    out.push('"');
    Ok(())
}

/// Shortest JSON rendering of a float; non-finite values become `null`.
pub(crate) fn format_float(v: f64) -> String {
    match serde_json::Number::from_f64(v) {
        Some(number) => number.to_string(),
        None => "null".to_string(),
    }
}
