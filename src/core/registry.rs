//! Constraint registry - the authoritative list of budget categories and the
//! percentage constraints attached to them.
//!
//! The registry is read-only reference data built once at startup, either from
//! a TOML seed file (see [`crate::config::registry`]) or from the built-in
//! immunization programme defaults. Lookups are linear scans over a handful of
//! entries and keep declaration order so evaluation and rendering are
//! deterministic.

use crate::{
    entities::{BudgetCategory, BudgetConstraint, ConstraintType},
    errors::{Error, Result},
    money::HUNDRED,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Label shown in place of a category name that is not in the registry.
pub const UNKNOWN_CATEGORY_LABEL: &str = "—";

/// Read access to category and constraint reference data.
///
/// The evaluator depends on this trait rather than on [`ConstraintRegistry`]
/// directly so other sources can stand in for the seeded list.
pub trait CategoryRepository {
    /// Finds a category by id. `None` is a legitimate outcome.
    fn get_category(&self, category_id: &str) -> Option<&BudgetCategory>;

    /// Finds the constraint of the given type for a category. `None` means unconstrained.
    fn get_constraint(
        &self,
        category_id: &str,
        constraint_type: ConstraintType,
    ) -> Option<&BudgetConstraint>;

    /// All constraints in declaration order.
    fn list_constraints(&self) -> &[BudgetConstraint];

    /// Display name for a category, or [`UNKNOWN_CATEGORY_LABEL`].
    fn category_name(&self, category_id: &str) -> &str {
        self.get_category(category_id)
            .map_or(UNKNOWN_CATEGORY_LABEL, |c| c.name.as_str())
    }
}

/// Validated categories and constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRegistry {
    categories: Vec<BudgetCategory>,
    constraints: Vec<BudgetConstraint>,
}

impl ConstraintRegistry {
    /// Builds a registry from explicit categories and constraints.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when:
    /// - two categories share an id
    /// - a constraint references an undeclared category
    /// - a category has more than one constraint of the same type
    /// - a percentage lies outside 0..=100
    pub fn new(
        categories: Vec<BudgetCategory>,
        constraints: Vec<BudgetConstraint>,
    ) -> Result<Self> {
        let mut ids = HashSet::new();
        for category in &categories {
            if category.id.trim().is_empty() {
                return Err(config_error("Category id cannot be empty".to_string()));
            }
            if !ids.insert(category.id.as_str()) {
                return Err(config_error(format!(
                    "Duplicate category id '{}'",
                    category.id
                )));
            }
            for declared in [category.max_percentage, category.min_percentage]
                .into_iter()
                .flatten()
            {
                check_percentage_range(&category.id, declared)?;
            }
        }

        let mut seen = HashSet::new();
        for constraint in &constraints {
            let Some(category) = categories.iter().find(|c| c.id == constraint.category_id)
            else {
                return Err(config_error(format!(
                    "Constraint references unknown category '{}'",
                    constraint.category_id
                )));
            };
            if !seen.insert((constraint.category_id.as_str(), constraint.constraint_type)) {
                return Err(config_error(format!(
                    "Category '{}' has more than one {} constraint",
                    constraint.category_id, constraint.constraint_type
                )));
            }
            check_percentage_range(&constraint.category_id, constraint.percentage)?;

            if let Some(declared) = category.declared_percentage(constraint.constraint_type) {
                if declared != constraint.percentage {
                    warn!(
                        "Category '{}' declares {} {}% but its constraint says {}%; \
                         using the constraint",
                        category.id, constraint.constraint_type, declared, constraint.percentage
                    );
                }
            }
        }

        debug!(
            "Constraint registry built with {} categories and {} constraints",
            categories.len(),
            constraints.len()
        );

        Ok(Self {
            categories,
            constraints,
        })
    }

    /// Builds a registry whose constraints are derived from each category's
    /// `max_percentage` / `min_percentage` and `is_hard_constraint` fields.
    pub fn from_categories(categories: Vec<BudgetCategory>) -> Result<Self> {
        let constraints = categories
            .iter()
            .flat_map(BudgetCategory::implied_constraints)
            .collect();
        Self::new(categories, constraints)
    }

    /// All categories in declaration order.
    #[must_use]
    pub fn list_categories(&self) -> &[BudgetCategory] {
        &self.categories
    }

    /// Constraints attached to one category, in declaration order.
    pub fn constraints_for<'a>(
        &'a self,
        category_id: &'a str,
    ) -> impl Iterator<Item = &'a BudgetConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| c.category_id == category_id)
    }
}

impl CategoryRepository for ConstraintRegistry {
    fn get_category(&self, category_id: &str) -> Option<&BudgetCategory> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    fn get_constraint(
        &self,
        category_id: &str,
        constraint_type: ConstraintType,
    ) -> Option<&BudgetConstraint> {
        self.constraints
            .iter()
            .find(|c| c.category_id == category_id && c.constraint_type == constraint_type)
    }

    fn list_constraints(&self) -> &[BudgetConstraint] {
        &self.constraints
    }
}

impl Default for ConstraintRegistry {
    /// The immunization programme's seeded categories and constraints.
    fn default() -> Self {
        Self {
            categories: default_categories(),
            constraints: default_constraints(),
        }
    }
}

fn config_error(message: String) -> Error {
    Error::Config { message }
}

fn check_percentage_range(category_id: &str, percentage: Decimal) -> Result<()> {
    if percentage < Decimal::ZERO || percentage > HUNDRED {
        return Err(config_error(format!(
            "Category '{category_id}' has percentage {percentage} outside 0..=100"
        )));
    }
    Ok(())
}

fn category(
    id: &str,
    name: &str,
    description: &str,
    max_percentage: Option<Decimal>,
    min_percentage: Option<Decimal>,
    is_hard_constraint: bool,
) -> BudgetCategory {
    BudgetCategory {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        max_percentage,
        min_percentage,
        is_hard_constraint,
    }
}

fn default_categories() -> Vec<BudgetCategory> {
    vec![
        category(
            "personnel",
            "Personnel",
            "Salaries, allowances, and benefits for health workers",
            Some(dec!(30)),
            None,
            true,
        ),
        category(
            "vaccines",
            "Vaccines",
            "Procurement and distribution of vaccines",
            None,
            None,
            false,
        ),
        category(
            "cold-chain",
            "Cold Chain & Logistics",
            "Refrigeration, storage, and transport equipment",
            None,
            Some(dec!(15)),
            false,
        ),
        category(
            "monitoring-evaluation",
            "M&E",
            "Monitoring and Evaluation activities",
            None,
            Some(dec!(5)),
            true,
        ),
        category(
            "advocacy-training",
            "Advocacy & Training",
            "Community advocacy, health education, and staff training",
            None,
            Some(dec!(10)),
            false,
        ),
        category(
            "community-outreach",
            "Community Outreach",
            "Outreach activities and community engagement",
            None,
            Some(dec!(20)),
            false,
        ),
        category(
            "administration",
            "Administration",
            "Administrative costs and governance",
            Some(dec!(10)),
            None,
            true,
        ),
    ]
}

fn default_constraints() -> Vec<BudgetConstraint> {
    vec![
        BudgetConstraint::new("administration", ConstraintType::Max, dec!(10), true),
        BudgetConstraint::new("monitoring-evaluation", ConstraintType::Min, dec!(5), true),
        BudgetConstraint::new("personnel", ConstraintType::Max, dec!(30), true),
        BudgetConstraint::new("cold-chain", ConstraintType::Min, dec!(15), false),
        BudgetConstraint::new("advocacy-training", ConstraintType::Min, dec!(10), false),
        BudgetConstraint::new("community-outreach", ConstraintType::Min, dec!(20), false),
    ]
}
