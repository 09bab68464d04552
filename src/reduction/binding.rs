use std::sync::{Arc, RwLock};

use crate::reduction::client::ReductionClient;

/// Late-bindable reference to the reduction client. Absence of a binding is a
/// first-class state: consumers must degrade to skip or advisory behavior,
/// never guess. The binding is carried explicitly by whoever owns the flow;
/// there is no process-global instance.
#[derive(Clone, Default)]
pub struct ReducerBinding {
    inner: Arc<RwLock<Option<Arc<ReductionClient>>>>,
}

impl ReducerBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bound(client: Arc<ReductionClient>) -> Self {
        let binding = Self::new();
        binding.set(client);
        binding
    }

    /// Hot-swaps the client. Safe at runtime; in-flight reductions keep the
    /// client they already cloned.
    pub fn set(&self, client: Arc<ReductionClient>) {
        let mut guard = self.inner.write().expect("lock poisoned");
        *guard = Some(client);
        tracing::info!(target: "reduction", "reducer_binding_set");
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write().expect("lock poisoned");
        *guard = None;
        tracing::info!(target: "reduction", "reducer_binding_cleared");
    }

    pub fn current(&self) -> Option<Arc<ReductionClient>> {
        self.inner.read().expect("lock poisoned").clone()
    }

    pub fn is_bound(&self) -> bool {
        self.inner.read().expect("lock poisoned").is_some()
    }
}
