//! Runtime settings from environment variables.
//!
//! `main` loads `.env` with `dotenvy` before reading these, so either source works.
//! Every variable is optional:
//!
//! | Variable | Default |
//! |---|---|
//! | `BUDGET_CONFIG_PATH` | `config.toml` |
//! | `LARGE_EXPENSE_THRESHOLD` | `50000` |
//! | `PERCENTAGE_DRIFT_TOLERANCE` | `0.1` |
//! | `ALLOCATION_RECONCILIATION` | `warn` (`off`, `warn` or `enforce`) |

use crate::{
    config::registry::DEFAULT_REGISTRY_PATH,
    core::{
        allocation::ReconciliationPolicy, compliance::DEFAULT_DRIFT_TOLERANCE,
        expense::DEFAULT_LARGE_EXPENSE_THRESHOLD,
    },
    errors::{Error, Result},
};
use rust_decimal::Decimal;
use std::{
    env::{self, VarError},
    path::PathBuf,
    str::FromStr,
};

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Registry seed file
    pub registry_path: PathBuf,
    /// Expenses above this need additional approval
    pub large_expense_threshold: Decimal,
    /// Allowed gap between stored and recomputed allocation percentages
    pub drift_tolerance: Decimal,
    /// How allocation totals and duplicate categories are reconciled
    pub reconciliation: ReconciliationPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            large_expense_threshold: DEFAULT_LARGE_EXPENSE_THRESHOLD,
            drift_tolerance: DEFAULT_DRIFT_TOLERANCE,
            reconciliation: ReconciliationPolicy::default(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::EnvVar`] when a variable is set but not valid Unicode.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.into()),
        })
    }

    /// Reads settings through `lookup`, falling back to defaults for unset keys.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when a set value does not parse or is negative,
    /// or whatever `lookup` itself fails with.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        let defaults = Self::default();

        let registry_path = lookup("BUDGET_CONFIG_PATH")?
            .filter(|p| !p.trim().is_empty())
            .map_or(defaults.registry_path, PathBuf::from);

        let large_expense_threshold = match lookup("LARGE_EXPENSE_THRESHOLD")? {
            Some(raw) => parse_non_negative("LARGE_EXPENSE_THRESHOLD", &raw)?,
            None => defaults.large_expense_threshold,
        };

        let drift_tolerance = match lookup("PERCENTAGE_DRIFT_TOLERANCE")? {
            Some(raw) => parse_non_negative("PERCENTAGE_DRIFT_TOLERANCE", &raw)?,
            None => defaults.drift_tolerance,
        };

        let reconciliation = match lookup("ALLOCATION_RECONCILIATION")? {
            Some(raw) => ReconciliationPolicy::parse(&raw).ok_or_else(|| Error::Config {
                message: format!(
                    "ALLOCATION_RECONCILIATION must be off, warn or enforce, got '{raw}'"
                ),
            })?,
            None => defaults.reconciliation,
        };

        Ok(Self {
            registry_path,
            large_expense_threshold,
            drift_tolerance,
            reconciliation,
        })
    }
}

fn parse_non_negative(key: &str, raw: &str) -> Result<Decimal> {
    let value = Decimal::from_str(raw.trim()).map_err(|e| Error::Config {
        message: format!("{key} is not a number ('{raw}'): {e}"),
    })?;
    if value.is_sign_negative() {
        return Err(Error::Config {
            message: format!("{key} must not be negative, got {value}"),
        });
    }
    Ok(value)
}
