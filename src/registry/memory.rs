use std::{
    collections::BTreeMap,
    sync::RwLock,
};

use crate::registry::{
    CapabilityRegistryPort,
    error::{RegistryError, capability_conflict, registration_invalid},
    types::{CapabilityCatalog, CapabilityDescriptor, CapabilityId, CapabilityRegistration},
};

#[derive(Default)]
struct RegistryState {
    version: u64,
    by_id: BTreeMap<CapabilityId, CapabilityDescriptor>,
}

#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.state.read().expect("lock poisoned").version
    }
}

impl CapabilityRegistryPort for InMemoryCapabilityRegistry {
    fn register(&self, registration: CapabilityRegistration) -> Result<(), RegistryError> {
        let descriptor = registration.descriptor;
        if descriptor.capability_id.trim().is_empty() {
            return Err(registration_invalid("capability_id cannot be empty"));
        }
        if descriptor.task_id.trim().is_empty() {
            return Err(registration_invalid("task_id cannot be empty"));
        }

        let mut guard = self.state.write().expect("lock poisoned");
        if guard.by_id.contains_key(&descriptor.capability_id) {
            return Err(capability_conflict(format!(
                "capability already registered: {}",
                descriptor.capability_id
            )));
        }

        guard
            .by_id
            .insert(descriptor.capability_id.clone(), descriptor);
        guard.version = guard.version.saturating_add(1);
        Ok(())
    }

    fn unregister(&self, capability_id: &str) -> Option<CapabilityRegistration> {
        let mut guard = self.state.write().expect("lock poisoned");
        let removed = guard.by_id.remove(capability_id);
        if removed.is_some() {
            guard.version = guard.version.saturating_add(1);
        }
        removed.map(|descriptor| CapabilityRegistration { descriptor })
    }

    fn resolve(&self, capability_id: &str) -> Option<CapabilityDescriptor> {
        self.state
            .read()
            .expect("lock poisoned")
            .by_id
            .get(capability_id)
            .cloned()
    }

    fn catalog_snapshot(&self) -> CapabilityCatalog {
        let guard = self.state.read().expect("lock poisoned");
        CapabilityCatalog {
            version: guard.version,
            entries: guard.by_id.values().cloned().collect(),
        }
    }
}
