use serde::{Deserialize, Serialize};

pub type CapabilityId = String;

/// Immutable description of a registered capability: where it came from and
/// the specification that cleared the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub capability_id: CapabilityId,
    pub task_id: String,
    pub summary: String,
    pub specification: serde_json::Value,
    pub registered_at_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRegistration {
    pub descriptor: CapabilityDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CapabilityCatalog {
    pub version: u64,
    pub entries: Vec<CapabilityDescriptor>,
}
