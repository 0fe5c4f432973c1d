use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::TrackerBackend;

/// Named registry of tracker backends.
///
/// Backends are wrapped in `Mutex` because `TrackerBackend::track` takes
/// `&mut self`. The pipeline is single-threaded; the lock exists for the
/// trait-object sharing, not for cross-thread contention.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn TrackerBackend>>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: TrackerBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set the default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn TrackerBackend>>> {
        self.backends.get(name).cloned()
    }

    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn TrackerBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Resolve a backend by name, with a clear error listing what exists.
    pub fn select(&self, name: &str) -> Result<Arc<Mutex<dyn TrackerBackend>>> {
        self.get(name).ok_or_else(|| {
            anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;

    #[test]
    fn first_registered_backend_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new(640, 480));
        let backend = registry.default_backend().expect("default backend");
        assert_eq!(backend.lock().unwrap().name(), "stub");
    }

    #[test]
    fn select_unknown_backend_lists_available() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new(640, 480));
        let err = registry.select("tract").err().unwrap();
        assert!(err.to_string().contains("stub"));
    }

    #[test]
    fn set_default_requires_registration() {
        let mut registry = BackendRegistry::new();
        assert!(registry.set_default("stub").is_err());
        registry.register(StubBackend::new(640, 480));
        assert!(registry.set_default("stub").is_ok());
    }
}
