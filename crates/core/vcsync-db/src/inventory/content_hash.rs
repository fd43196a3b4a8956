//! Stable content hashing for inventory payloads
//!
//! The hash must not depend on the key order of the serialized payload, so
//! objects are written with their keys sorted before hashing. The digest is
//! stored alongside the payload for change-detection consumers.

use sha2::{Digest, Sha256};
use sqlx::types::JsonValue;

/// Compute the stable SHA-256 hash of a JSON payload.
///
/// Object keys are sorted recursively before serialization, so two payloads
/// that differ only in key order produce the same digest. Returns the digest
/// as a lowercase hex string.
pub fn content_hash(payload: &JsonValue) -> String {
    let mut canonical = Vec::new();
    write_canonical(payload, &mut canonical);

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    hex_string(&hasher.finalize())
}

/// Serialize a JSON value with recursively sorted object keys.
fn write_canonical(value: &JsonValue, out: &mut Vec<u8>) {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push(b'{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                // Serializing a string key is infallible.
                serde_json::to_writer(&mut *out, key).expect("failed to serialize object key");
                out.push(b':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push(b'}');
        }
        JsonValue::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out);
            }
            out.push(b']');
        }
        scalar => {
            // Serializing a scalar is infallible.
            serde_json::to_writer(&mut *out, scalar).expect("failed to serialize scalar");
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        // Writing to a String is infallible.
        write!(out, "{byte:02x}").expect("failed to format hex digit");
    }
    out
}
