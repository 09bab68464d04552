use serde_json::json;
use sha2::{Digest, Sha256};

use crate::envelope::Envelope;

/// Recursively sorts object keys so that hashing never depends on the
/// serializer's insertion order.
pub fn canonicalize_json(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys = map.keys().cloned().collect::<Vec<_>>();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                if let Some(item) = map.get(&key) {
                    sorted.insert(key, canonicalize_json(item));
                }
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(canonicalize_json).collect())
        }
        primitive => primitive.clone(),
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of the canonical request shape sent to the reducer. Field set and
/// order are fixed here; two envelopes with the same stable fields produce
/// the same request hash regardless of when they were built.
pub fn request_hash(envelope: &Envelope) -> String {
    let canonical = canonicalize_json(&json!({
        "envelope_id": envelope.envelope_id,
        "sanitized_text": envelope.sanitized_text,
        "model_id": envelope.model_id,
        "prompt_digest": envelope.prompt_digest,
    }));
    sha256_hex(canonical.to_string().as_bytes())
}

/// Hash of a reducer output payload. The payload kind is tagged before
/// hashing so an absent output and an empty-string output never collide.
pub fn output_hash(output_text: Option<&str>) -> String {
    let tagged = match output_text {
        Some(text) => json!({ "text": text }),
        None => json!({ "missing": true }),
    };
    sha256_hex(canonicalize_json(&tagged).to_string().as_bytes())
}
