//! Budget file loading for the `report` command.
//!
//! A budget file holds one `[budget]` table with its `[[budget.allocations]]`
//! and, optionally, the budget's `[[expenses]]`. Dates are quoted `YYYY-MM-DD`
//! strings.

use crate::{
    entities::{Budget, Expense},
    errors::{Error, Result},
};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Structure of a budget file
#[derive(Debug, Deserialize)]
pub struct BudgetFile {
    /// The budget and its allocations
    pub budget: Budget,
    /// Expenses recorded against the budget
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

/// Parses budget file TOML and checks that every record belongs to the budget.
pub fn parse_budget_file(contents: &str) -> Result<BudgetFile> {
    let file: BudgetFile = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse budget file: {e}"),
    })?;

    if file.budget.total_amount <= rust_decimal::Decimal::ZERO {
        return Err(Error::InvalidTotalBudget {
            total: file.budget.total_amount,
        });
    }
    if let Some(stray) = file
        .budget
        .allocations
        .iter()
        .find(|a| a.budget_id != file.budget.id)
    {
        return Err(Error::Config {
            message: format!(
                "Allocation '{}' belongs to budget '{}', not '{}'",
                stray.id, stray.budget_id, file.budget.id
            ),
        });
    }
    if let Some(stray) = file.expenses.iter().find(|e| e.budget_id != file.budget.id) {
        return Err(Error::Config {
            message: format!(
                "Expense '{}' belongs to budget '{}', not '{}'",
                stray.id, stray.budget_id, file.budget.id
            ),
        });
    }

    Ok(file)
}

/// Loads a budget file from disk.
pub fn load_budget_file<P: AsRef<Path>>(path: P) -> Result<BudgetFile> {
    let path = path.as_ref();
    debug!("Loading budget file {:?}", path);
    let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("Failed to read budget file {}: {e}", path.display()),
    })?;
    parse_budget_file(&contents)
}
