use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::RegistryError;
use crate::persistence::Registry;
use crate::types::AgentEndpoint;

/// Process-local registry. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryRegistry {
    endpoints: Arc<Mutex<Vec<AgentEndpoint>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Registry for MemoryRegistry {
    fn store(&self, endpoints: &[AgentEndpoint]) -> Result<(), RegistryError> {
        let mut current = self.endpoints.lock().unwrap_or_else(PoisonError::into_inner);
        current.clear();
        current.extend_from_slice(endpoints);
        Ok(())
    }

    fn load(&self) -> Result<Vec<AgentEndpoint>, RegistryError> {
        Ok(self
            .endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<(), RegistryError> {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
