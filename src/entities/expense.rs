//! Expense entity - money spent against a budget category.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Approval state of an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Awaiting review
    Pending,
    /// Approved and counted against its allocation
    Approved,
    /// Rejected
    Rejected,
}

impl ExpenseStatus {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense id (e.g. `EXP001`)
    pub id: String,
    /// Budget charged
    pub budget_id: String,
    /// Category charged
    pub category_id: String,
    /// Amount spent
    pub amount: Decimal,
    /// Date of the expense
    pub date: NaiveDate,
    /// What the money was for
    #[serde(default)]
    pub description: String,
    /// Bank transfer, purchase order, cash...
    #[serde(default)]
    pub payment_method: String,
    /// Attached document names
    #[serde(default)]
    pub supporting_documents: Vec<String>,
    /// Who approved it
    #[serde(default)]
    pub approved_by: Option<String>,
    /// Approval state
    pub status: ExpenseStatus,
    /// Compliance verdict stamped when the expense was recorded
    pub is_compliant: bool,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl Expense {
    /// Marks a pending expense approved by `approver`.
    pub fn approve(&mut self, approver: impl Into<String>) -> Result<()> {
        self.ensure_pending(ExpenseStatus::Approved)?;
        self.status = ExpenseStatus::Approved;
        self.approved_by = Some(approver.into());
        Ok(())
    }

    /// Marks a pending expense rejected.
    pub fn reject(&mut self) -> Result<()> {
        self.ensure_pending(ExpenseStatus::Rejected)?;
        self.status = ExpenseStatus::Rejected;
        Ok(())
    }

    /// Puts an approved expense back to pending, clearing the approver.
    ///
    /// Used when the spending that should follow an approval cannot be recorded.
    pub(crate) fn revert_approval(&mut self) -> Result<()> {
        if self.status != ExpenseStatus::Approved {
            return Err(Error::InvalidStatusTransition {
                entity: "expense",
                from: self.status.to_string(),
                to: ExpenseStatus::Pending.to_string(),
            });
        }
        self.status = ExpenseStatus::Pending;
        self.approved_by = None;
        Ok(())
    }

    /// Picks an expense id not used in `existing` (`EXP001`, `EXP002`, ...).
    #[must_use]
    pub fn next_id(existing: &[Self]) -> String {
        let mut n = existing.len() + 1;
        loop {
            let candidate = format!("EXP{n:03}");
            if !existing.iter().any(|e| e.id == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn ensure_pending(&self, target: ExpenseStatus) -> Result<()> {
        if self.status == ExpenseStatus::Pending {
            Ok(())
        } else {
            Err(Error::InvalidStatusTransition {
                entity: "expense",
                from: self.status.to_string(),
                to: target.to_string(),
            })
        }
    }
}
