use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::provenance::{canonicalize_json, sha256_hex};

pub type EnvelopeId = String;

/// Minimal provenance attached to a piece of raw model output before it is
/// submitted for reduction. Everything here is opaque to the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvelopeMeta {
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub prompt_digest: Option<String>,
}

/// Canonical, content-addressed representation of one piece of model output.
/// Immutable once built; the id is derived from the sanitized text and the
/// stable metadata fields, never from the creation timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub envelope_id: EnvelopeId,
    pub sanitized_text: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub prompt_digest: Option<String>,
    pub created_at_ms: u64,
}

impl Envelope {
    /// Builds an envelope from raw model output. Pure and total: sanitization
    /// only strips control characters, no semantic content is rewritten here.
    pub fn build(raw_text: &str, meta: EnvelopeMeta) -> Self {
        let sanitized_text = sanitize_text(raw_text);
        let envelope_id = derive_envelope_id(&sanitized_text, &meta);
        Self {
            envelope_id,
            sanitized_text,
            model_id: meta.model_id,
            prompt_digest: meta.prompt_digest,
            created_at_ms: unix_millis(),
        }
    }
}

/// Normalizes CRLF to LF and drops the remaining control characters. Tabs and
/// newlines survive; goal-like substrings are the reducer's business.
fn sanitize_text(raw_text: &str) -> String {
    raw_text
        .replace("\r\n", "\n")
        .chars()
        .filter(|ch| !ch.is_control() || *ch == '\n' || *ch == '\t')
        .collect()
}

fn derive_envelope_id(sanitized_text: &str, meta: &EnvelopeMeta) -> EnvelopeId {
    let canonical = canonicalize_json(&json!({
        "sanitized_text": sanitized_text,
        "model_id": meta.model_id,
        "prompt_digest": meta.prompt_digest,
    }));
    let hex = sha256_hex(canonical.to_string().as_bytes());
    format!("env:{}", &hex[..24])
}

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
