//! In-process backend registry.
//!
//! Librarians and vectorizers are both selected by a stable id taken from
//! configuration; one generic registry serves both.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Anything selectable by id from a [`BackendRegistry`].
pub trait Backend {
    /// Stable lowercase id, e.g. `catalog` or `bow`.
    fn backend_id(&self) -> &str;
}

/// Backend registration/selection errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidBackendId(String),
    DuplicateBackendId(String),
    BackendNotFound(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBackendId(value) => write!(f, "backend id is invalid: {value}"),
            Self::DuplicateBackendId(value) => write!(f, "backend id already registered: {value}"),
            Self::BackendNotFound(value) => write!(f, "backend not found: {value}"),
        }
    }
}

impl Error for RegistryError {}

/// Runtime registry of shared backends keyed by id.
pub struct BackendRegistry<B: ?Sized + Backend> {
    backends: BTreeMap<String, Arc<B>>,
}

impl<B: ?Sized + Backend> Default for BackendRegistry<B> {
    fn default() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }
}

impl<B: ?Sized + Backend> BackendRegistry<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one backend.
    pub fn register(&mut self, backend: Arc<B>) -> Result<(), RegistryError> {
        let backend_id = backend.backend_id().trim().to_string();
        if !is_valid_backend_id(&backend_id) {
            return Err(RegistryError::InvalidBackendId(backend_id));
        }
        if self.backends.contains_key(backend_id.as_str()) {
            return Err(RegistryError::DuplicateBackendId(backend_id));
        }

        self.backends.insert(backend_id, backend);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Returns one backend by id.
    pub fn get(&self, backend_id: &str) -> Option<Arc<B>> {
        self.backends.get(backend_id.trim()).cloned()
    }

    /// Returns one backend by id or a `BackendNotFound` error.
    pub fn require(&self, backend_id: &str) -> Result<Arc<B>, RegistryError> {
        self.get(backend_id)
            .ok_or_else(|| RegistryError::BackendNotFound(backend_id.trim().to_string()))
    }
}

fn is_valid_backend_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{Backend, BackendRegistry, RegistryError};
    use std::sync::Arc;

    struct Named(&'static str);

    impl Backend for Named {
        fn backend_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn registers_and_requires_backend() {
        let mut registry: BackendRegistry<Named> = BackendRegistry::new();
        registry
            .register(Arc::new(Named("catalog")))
            .expect("backend should register");
        assert_eq!(registry.len(), 1);

        let backend = registry
            .require("  catalog ")
            .expect("trimmed id should resolve");
        assert_eq!(backend.backend_id(), "catalog");
    }

    #[test]
    fn rejects_invalid_or_duplicate_backend_id() {
        let mut registry: BackendRegistry<Named> = BackendRegistry::new();
        assert!(matches!(
            registry.register(Arc::new(Named("Semantic Scholar"))),
            Err(RegistryError::InvalidBackendId(_))
        ));
        registry
            .register(Arc::new(Named("s2")))
            .expect("first backend should register");
        assert!(matches!(
            registry.register(Arc::new(Named("s2"))),
            Err(RegistryError::DuplicateBackendId(_))
        ));
    }

    #[test]
    fn require_reports_missing_backend() {
        let registry: BackendRegistry<Named> = BackendRegistry::new();
        assert!(matches!(
            registry.require("bow"),
            Err(RegistryError::BackendNotFound(id)) if id == "bow"
        ));
    }
}
