pub mod error;
pub mod memory;
pub mod types;

pub use error::{RegistryError, RegistryErrorKind};
pub use memory::InMemoryCapabilityRegistry;
pub use types::{CapabilityCatalog, CapabilityDescriptor, CapabilityRegistration};

use std::sync::Arc;

/// Registration surface for gate-approved capabilities. Execution of a
/// registered capability happens elsewhere; the registry stops at the
/// catalog.
pub trait CapabilityRegistryPort: Send + Sync {
    fn register(&self, registration: CapabilityRegistration) -> Result<(), RegistryError>;
    fn unregister(&self, capability_id: &str) -> Option<CapabilityRegistration>;
    fn resolve(&self, capability_id: &str) -> Option<CapabilityDescriptor>;
    fn catalog_snapshot(&self) -> CapabilityCatalog;
}

pub type SharedCapabilityRegistry = Arc<dyn CapabilityRegistryPort>;
