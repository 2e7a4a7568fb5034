//! Service container for dependency injection
//!
//! Wires up services with their dependencies.

use std::sync::Arc;

use crate::application::services::DocumentService;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};
use crate::infrastructure::XmlWriter;

/// Container holding application services and shared dependencies.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            settings: Arc::new(settings),
            fs,
        }
    }

    pub fn document_service(&self) -> DocumentService {
        DocumentService::new(Arc::clone(&self.fs), Arc::clone(&self.settings))
    }

    /// Writer configured from the `[output]` settings.
    pub fn xml_writer(&self) -> XmlWriter {
        XmlWriter::new(self.settings.output.indent, self.settings.output.declaration)
    }
}
