//! Category and constraint seed loading from config.toml
//!
//! The registry is built once at startup from a TOML seed file. When the file
//! does not exist the built-in immunization programme catalog is used instead.
//! A seed without `[[constraints]]` tables gets its constraints derived from
//! each category's `max_percentage`/`min_percentage` and `is_hard_constraint`.

use crate::{
    core::registry::ConstraintRegistry,
    entities::{BudgetCategory, BudgetConstraint},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default seed file location
pub const DEFAULT_REGISTRY_PATH: &str = "config.toml";

/// Structure of the seed file
#[derive(Debug, Deserialize)]
pub struct RegistryConfig {
    /// Budget categories, in display order
    pub categories: Vec<BudgetCategory>,
    /// Explicit constraints; derived from the categories when absent
    #[serde(default)]
    pub constraints: Vec<BudgetConstraint>,
}

impl RegistryConfig {
    /// Validates the seed and builds the registry.
    pub fn into_registry(self) -> Result<ConstraintRegistry> {
        if self.constraints.is_empty() {
            debug!("No explicit constraints, deriving them from categories");
            ConstraintRegistry::from_categories(self.categories)
        } else {
            ConstraintRegistry::new(self.categories, self.constraints)
        }
    }
}

/// Parses seed TOML.
///
/// # Errors
/// Returns [`Error::Config`] when the TOML is invalid or required fields are missing.
pub fn parse_registry_config(contents: &str) -> Result<RegistryConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse registry seed: {e}"),
    })
}

/// Loads and validates the registry from a seed file.
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - The seed fails registry validation (duplicate ids, unknown categories,
///   percentages outside 0..=100)
pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<ConstraintRegistry> {
    let path = path.as_ref();
    debug!("Loading registry seed from {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read registry seed {}: {e}", path.display()),
    })?;
    parse_registry_config(&contents)?.into_registry()
}

/// Loads the registry from `path`, or the built-in catalog if the file is missing.
pub fn load_registry_or_default<P: AsRef<Path>>(path: P) -> Result<ConstraintRegistry> {
    let path = path.as_ref();
    if path.exists() {
        load_registry(path)
    } else {
        info!(
            "Registry seed {} not found, using built-in categories",
            path.display()
        );
        Ok(ConstraintRegistry::default())
    }
}
