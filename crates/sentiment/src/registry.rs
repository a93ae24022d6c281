//! Backend registry for managing multiple sentiment backends.
//!
//! The registry is built once from configuration and hands out shared
//! handles to the scorer. Names are kept in a sorted map so every run
//! visits backends in the same order.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedspeak_core::{BackendKind, BackendSpec, PipelineError, SentimentBackend};
use tracing::info;

use crate::backend::{HttpClassifierBackend, LexiconBackend};

#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: BTreeMap<String, Arc<dyn SentimentBackend>>,
}

impl BackendRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configured backend specs.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if a spec cannot be turned into a backend.
    pub fn from_specs(specs: &[BackendSpec]) -> Result<Self, PipelineError> {
        let mut registry = Self::new();
        for spec in specs {
            let backend: Arc<dyn SentimentBackend> = match spec.kind {
                BackendKind::Lexicon => Arc::new(LexiconBackend::new(spec.name.clone())),
                BackendKind::HttpClassifier => Arc::new(
                    HttpClassifierBackend::from_spec(spec)
                        .map_err(|e| PipelineError::InvalidConfig(format!("{}: {e}", spec.name)))?,
                ),
            };
            info!(backend = %spec.name, kind = ?spec.kind, "Registered sentiment backend");
            registry.register(backend);
        }
        Ok(registry)
    }

    /// Registers a backend under its own name.
    ///
    /// If a backend with the same name already exists, it will be replaced.
    pub fn register(&mut self, backend: Arc<dyn SentimentBackend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SentimentBackend>> {
        self.backends.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Returns the names of all registered backends, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.backends.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn SentimentBackend>)> {
        self.backends.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
