//! Budget categories and the percentage constraints attached to them.
//!
//! Categories are static reference data seeded once at startup. A category may
//! carry a max constraint, a min constraint, both, or neither.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A spending category such as "Personnel" or "Cold Chain & Logistics".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    /// Unique key (e.g. `cold-chain`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Upper bound as a percentage of the budget total
    #[serde(default)]
    pub max_percentage: Option<Decimal>,
    /// Lower bound as a percentage of the budget total
    #[serde(default)]
    pub min_percentage: Option<Decimal>,
    /// Whether the category's bounds block (hard) or only warn (soft)
    #[serde(default)]
    pub is_hard_constraint: bool,
}

/// Direction of a percentage constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintType {
    /// Percentage must not exceed the threshold
    Max,
    /// Percentage must not fall below the threshold
    Min,
}

impl ConstraintType {
    /// Lowercase wire name (`max` / `min`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
        }
    }

    /// Label used in tables (`Maximum` / `Minimum`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Max => "Maximum",
            Self::Min => "Minimum",
        }
    }
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enforcement level of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory: the action proceeds with a warning
    Soft,
    /// Blocking: the action must not proceed
    Hard,
}

impl Severity {
    /// Maps the seed data's `is_hard` flag to a severity.
    #[must_use]
    pub const fn from_hard_flag(is_hard: bool) -> Self {
        if is_hard { Self::Hard } else { Self::Soft }
    }

    /// Display label (`Hard` / `Soft`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "Soft",
            Self::Hard => "Hard",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single percentage-of-total rule on a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetConstraint {
    /// Category the rule applies to
    pub category_id: String,
    /// Max or min
    #[serde(rename = "type")]
    pub constraint_type: ConstraintType,
    /// Threshold percentage of the budget total
    pub percentage: Decimal,
    /// Whether a violation blocks
    pub is_hard: bool,
}

impl BudgetConstraint {
    /// Creates a constraint.
    #[must_use]
    pub fn new(
        category_id: impl Into<String>,
        constraint_type: ConstraintType,
        percentage: Decimal,
        is_hard: bool,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            constraint_type,
            percentage,
            is_hard,
        }
    }

    /// Severity of a violation of this constraint.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        Severity::from_hard_flag(self.is_hard)
    }

    /// Whether `percentage` violates this constraint.
    ///
    /// Comparisons are strict: a percentage exactly on the threshold complies.
    #[must_use]
    pub fn is_violated_by(&self, percentage: Decimal) -> bool {
        match self.constraint_type {
            ConstraintType::Max => percentage > self.percentage,
            ConstraintType::Min => percentage < self.percentage,
        }
    }
}

impl BudgetCategory {
    /// Constraints implied by this category's own `max_percentage` / `min_percentage`.
    #[must_use]
    pub fn implied_constraints(&self) -> Vec<BudgetConstraint> {
        let mut constraints = Vec::new();
        if let Some(max) = self.max_percentage {
            constraints.push(BudgetConstraint::new(
                self.id.clone(),
                ConstraintType::Max,
                max,
                self.is_hard_constraint,
            ));
        }
        if let Some(min) = self.min_percentage {
            constraints.push(BudgetConstraint::new(
                self.id.clone(),
                ConstraintType::Min,
                min,
                self.is_hard_constraint,
            ));
        }
        constraints
    }

    /// The percentage this category declares for the given direction, if any.
    #[must_use]
    pub const fn declared_percentage(&self, constraint_type: ConstraintType) -> Option<Decimal> {
        match constraint_type {
            ConstraintType::Max => self.max_percentage,
            ConstraintType::Min => self.min_percentage,
        }
    }
}

impl std::fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
