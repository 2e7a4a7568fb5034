//! Document building service
//!
//! Loads recipes through the filesystem boundary and runs them against a
//! fresh [`DocumentBuilder`].

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt, Recipe};
use crate::config::Settings;
use crate::domain::{DocumentBuilder, Variant};
use crate::infrastructure::traits::FileSystem;

/// Result of running a recipe.
#[derive(Debug)]
pub struct BuildReport {
    pub builder: DocumentBuilder,
    /// Number of steps applied
    pub steps: usize,
}

/// Service for building documents from recipes.
pub struct DocumentService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl DocumentService {
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Read and parse a recipe file.
    pub fn load_recipe(&self, path: &Path) -> ApplicationResult<Recipe> {
        debug!("load_recipe: {}", path.display());
        if !self.fs.exists(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("recipe not found: {}", path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read recipe", path)?;
        Recipe::parse(&content).map_err(|e| match e {
            ApplicationError::Recipe { message } => ApplicationError::Recipe {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Create a builder for `recipe` and apply its steps.
    #[instrument(level = "debug", skip(self, recipe))]
    pub fn build(&self, recipe: &Recipe, variant: Option<Variant>) -> ApplicationResult<BuildReport> {
        let config = recipe.document_config(&self.settings, variant);
        let mut builder = DocumentBuilder::new(&config);
        recipe.apply(&mut builder)?;
        info!(
            "built {} {} with {} steps",
            config.variant,
            config.guid,
            recipe.steps.len()
        );
        Ok(BuildReport {
            builder,
            steps: recipe.steps.len(),
        })
    }

    /// [`load_recipe`](Self::load_recipe) followed by [`build`](Self::build).
    pub fn build_file(&self, path: &Path, variant: Option<Variant>) -> ApplicationResult<BuildReport> {
        let recipe = self.load_recipe(path)?;
        self.build(&recipe, variant)
    }

    /// Write rendered output, creating parent directories as needed.
    pub fn write_output(&self, path: &Path, content: &str) -> ApplicationResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs
                .create_dir_all(parent)
                .with_path_context("create directory", parent)?;
        }
        self.fs
            .write(path, content)
            .with_path_context("write output", path)
    }
}
