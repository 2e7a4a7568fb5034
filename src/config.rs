//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/g2tree/g2tree.toml`
//! 3. Local config: `<dir>/.g2tree.toml` (usually the working directory)
//! 4. Environment variables: `G2TREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ApplicationError;
use crate::domain::builder::{DEFAULT_CONFORMANCE, DEFAULT_STANDARD_VERSION};
use crate::domain::Variant;

/// Name of the local config file.
pub const LOCAL_CONFIG_FILE: &str = ".g2tree.toml";

/// Rendering options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Spaces per nesting level, 0 for compact output
    pub indent: usize,
    /// Emit the `<?xml ...?>` declaration
    pub declaration: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: true,
        }
    }
}

/// Raw output config for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub indent: Option<usize>,
    pub declaration: Option<bool>,
}

impl OutputConfig {
    fn merge(&self, overlay: &RawOutputConfig) -> Self {
        Self {
            indent: overlay.indent.unwrap_or(self.indent),
            declaration: overlay.declaration.unwrap_or(self.declaration),
        }
    }
}

/// Raw settings for intermediate parsing (arrays are Option to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub variant: Option<Variant>,
    pub standard_version: Option<String>,
    pub conformance: Option<String>,
    pub guid_prefix: Option<String>,
    pub catalogs: Option<Vec<String>>,
    pub output: RawOutputConfig,
}

/// Unified configuration for g2tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Variant used when a recipe does not name one
    pub variant: Variant,
    /// Value of the root `standardversion` attribute
    pub standard_version: String,
    /// Value of the root `conformance` attribute
    pub conformance: String,
    /// Prefix of generated guids
    pub guid_prefix: String,
    /// Catalog references added to every document, in document order
    pub catalogs: Vec<String>,
    pub output: OutputConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            variant: Variant::NewsItem,
            standard_version: DEFAULT_STANDARD_VERSION.to_string(),
            conformance: DEFAULT_CONFORMANCE.to_string(),
            guid_prefix: "urn:uuid:".to_string(),
            catalogs: Vec::new(),
            output: OutputConfig::default(),
        }
    }
}

/// Get the XDG config directory for g2tree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "g2tree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("g2tree.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(LOCAL_CONFIG_FILE)
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are appended to base, keeping first-seen order
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::with_capacity(base.len() + overlay.len());
        for item in base {
            if !result.contains(item) {
                result.push(item.clone());
            }
        }
        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.retain(|item| item != negated);
            } else if !result.contains(pattern) {
                result.push(pattern.clone());
            }
        }
        result
    }

    /// New guid from `guid_prefix` and a random UUID.
    pub fn generate_guid(&self) -> String {
        format!("{}{}", self.guid_prefix, Uuid::new_v4())
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Arrays (catalogs): union merge with negation support
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            variant: overlay.variant.unwrap_or(self.variant),
            standard_version: overlay
                .standard_version
                .clone()
                .unwrap_or_else(|| self.standard_version.clone()),
            conformance: overlay
                .conformance
                .clone()
                .unwrap_or_else(|| self.conformance.clone()),
            guid_prefix: overlay
                .guid_prefix
                .clone()
                .unwrap_or_else(|| self.guid_prefix.clone()),
            catalogs: overlay
                .catalogs
                .as_ref()
                .map(|o| Self::merge_array(&self.catalogs, o))
                .unwrap_or_else(|| self.catalogs.clone()),
            output: self.output.merge(&overlay.output),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    ///
    /// Unlike `merge_with()` which uses union semantics, this method replaces
    /// arrays entirely if the global config specifies them.
    pub fn apply_global(&self, global: &RawSettings) -> Self {
        let mut merged = self.merge_with(global);
        if let Some(catalogs) = &global.catalogs {
            merged.catalogs = catalogs.clone();
        }
        merged
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.g2tree.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_from(global_config_path().as_deref(), local_dir)
    }

    /// [`load`](Self::load) with an explicit global config path.
    pub fn load_from(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config (REPLACES defaults)
        if let Some(global_path) = global_path {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // 3. Local config (UNION with global)
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables (replace)
        Self::apply_env_overrides(current)
    }

    /// Apply G2TREE_* environment variables as explicit overrides.
    ///
    /// Nested keys use `__`, e.g. `G2TREE_OUTPUT__INDENT=4`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("G2TREE")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("catalogs")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("variant") {
            settings.variant = val.parse().map_err(|e| ApplicationError::Config {
                message: format!("G2TREE_VARIANT: {e}"),
            })?;
        }
        if let Ok(val) = config.get_string("standard_version") {
            settings.standard_version = val;
        }
        if let Ok(val) = config.get_string("conformance") {
            settings.conformance = val;
        }
        if let Ok(val) = config.get_string("guid_prefix") {
            settings.guid_prefix = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("catalogs") {
            settings.catalogs = val;
        }
        if let Ok(val) = config.get::<usize>("output.indent") {
            settings.output.indent = val;
        }
        if let Ok(val) = config.get_bool("output.declaration") {
            settings.output.declaration = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# g2tree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/g2tree/g2tree.toml  (defines your baseline)
#   Local:  ./.g2tree.toml                (project-specific additions)
#   Env:    G2TREE_* environment variables (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     catalogs = ["!http://example.com/old-catalog.xml"]

# Variant used when a recipe does not name one
# variant = "newsItem"

# Root attributes
# standard_version = "2.29"
# conformance = "power"

# Prefix of generated guids
# guid_prefix = "urn:uuid:"

# Catalog references added to every document
# catalogs = ["http://www.iptc.org/std/catalog/catalog.IPTC-G2-Standards_38.xml"]

[output]
# Spaces per nesting level, 0 for compact output
# indent = 2

# Emit the XML declaration
# declaration = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
