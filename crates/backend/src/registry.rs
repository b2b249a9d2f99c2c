//! Backend lookup by name.

use std::collections::HashMap;

use harvest_core::{BackendArgs, BackendError, JobError};

use crate::backend::{Backend, BackendInstance, Capabilities};

type BuildFn = fn(&BackendArgs) -> Result<BackendInstance, BackendError>;

/// A resolved backend type.
///
/// Cheap to copy; carries the backend's constants and its constructor.
#[derive(Clone, Copy)]
pub struct BackendHandle {
    name: &'static str,
    version: &'static str,
    categories: &'static [&'static str],
    capabilities: Capabilities,
    build: BuildFn,
}

impl BackendHandle {
    pub fn of<B: Backend>() -> Self {
        Self {
            name: B::NAME,
            version: B::VERSION,
            categories: B::CATEGORIES,
            capabilities: B::CAPABILITIES,
            build: B::build,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn version(&self) -> &'static str {
        self.version
    }

    pub fn categories(&self) -> &'static [&'static str] {
        self.categories
    }

    pub fn supports_category(&self, category: &str) -> bool {
        self.categories.contains(&category)
    }

    pub fn supports_archiving(&self) -> bool {
        self.capabilities.archiving
    }

    pub fn supports_resuming(&self) -> bool {
        self.capabilities.resuming
    }

    /// Build a backend instance for `args`.
    pub fn build(&self, args: &BackendArgs) -> Result<BackendInstance, BackendError> {
        (self.build)(args)
    }
}

impl core::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("categories", &self.categories)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Registry of the backends a worker can run.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<&'static str, BackendHandle>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend type under its `NAME`.
    ///
    /// Registering the same name twice keeps the latest registration.
    pub fn register<B: Backend>(&mut self) -> &mut Self {
        self.backends.insert(B::NAME, BackendHandle::of::<B>());
        self
    }

    pub fn with<B: Backend>(mut self) -> Self {
        self.register::<B>();
        self
    }

    /// Resolve a backend by name.
    pub fn resolve(&self, name: &str) -> Result<BackendHandle, JobError> {
        self.backends
            .get(name)
            .copied()
            .ok_or_else(|| JobError::not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Registered backend names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.backends.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
