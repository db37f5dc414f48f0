//! Compliance evaluator - classifies an amount against its category's
//! percentage-of-total constraints.
//!
//! Evaluation is a pure function of the registry and its inputs. Precondition
//! failures (non-positive amount or total) are errors; constraint violations
//! are data on the returned [`ComplianceResult`], so every caller (allocation
//! form, expense form, overview pages) can render something and decide its own
//! enforcement policy.

use crate::{
    core::registry::CategoryRepository,
    entities::{Budget, BudgetConstraint, ConstraintType, Severity},
    errors::{Error, Result},
    money::{format_percentage, format_threshold, percentage_of},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

/// Default tolerance, in percentage points, before a stored percentage is
/// reported as drifting from the one computed from amounts.
pub const DEFAULT_DRIFT_TOLERANCE: Decimal = dec!(0.1);

/// Which side of a constraint was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// Percentage above a max constraint
    ExceedsMax,
    /// Percentage below a min constraint
    BelowMin,
}

impl ViolationKind {
    const fn for_constraint(constraint_type: ConstraintType) -> Self {
        match constraint_type {
            ConstraintType::Max => Self::ExceedsMax,
            ConstraintType::Min => Self::BelowMin,
        }
    }
}

/// One broken constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which side was crossed
    pub kind: ViolationKind,
    /// Hard blocks, soft warns
    pub severity: Severity,
    /// Category evaluated
    pub category_id: String,
    /// Percentage of total that was evaluated
    pub percentage: Decimal,
    /// Constraint threshold
    pub threshold: Decimal,
    /// Human-readable explanation
    pub message: String,
}

/// Overall verdict of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplianceStatus {
    /// No constraint broken
    Compliant,
    /// Only soft constraints broken
    SoftViolation,
    /// At least one hard constraint broken
    HardViolation,
}

impl ComplianceStatus {
    /// Badge text for tables.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Compliant => "Compliant",
            Self::SoftViolation => "Warning",
            Self::HardViolation => "Violation",
        }
    }
}

/// A data-integrity problem noticed during evaluation. Not a compliance problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataWarning {
    /// The category id is not in the registry, so no constraints were applied
    UnknownCategory {
        /// The unrecognised id
        category_id: String,
    },
    /// A stored percentage disagrees with the one computed from amounts
    PercentageDrift {
        /// Allocation with the stale value
        allocation_id: String,
        /// Stored `percentage_of_total`
        stored: Decimal,
        /// Allocated / total × 100
        computed: Decimal,
    },
}

impl std::fmt::Display for DataWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCategory { category_id } => {
                write!(f, "Unknown category '{category_id}': no constraints applied")
            }
            Self::PercentageDrift {
                allocation_id,
                stored,
                computed,
            } => write!(
                f,
                "Allocation {allocation_id} stores {}% of total but its amount is {}%",
                format_percentage(*stored),
                format_percentage(*computed)
            ),
        }
    }
}

/// Structured outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceResult {
    /// Category evaluated
    pub category_id: String,
    /// Percentage of total the amount represents
    pub percentage: Decimal,
    /// Aggregated verdict
    pub status: ComplianceStatus,
    /// Broken constraints, max before min
    pub violations: Vec<Violation>,
    /// Data problems to flag separately from compliance
    pub warnings: Vec<DataWarning>,
}

impl ComplianceResult {
    /// True when no constraint is broken.
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.status == ComplianceStatus::Compliant
    }

    /// True when a hard constraint is broken and the action must be blocked.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.status == ComplianceStatus::HardViolation
    }

    /// Violation messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }

    /// True when the category was not found in the registry.
    #[must_use]
    pub fn has_unknown_category(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DataWarning::UnknownCategory { .. }))
    }

    /// Whether a violation of the given kind is present.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }
}

/// Evaluates `amount` of `category_id` against a budget of `total_budget`.
///
/// # Errors
/// - [`Error::InvalidAmount`] if `amount` is zero or negative
/// - [`Error::InvalidTotalBudget`] if `total_budget` is zero or negative
pub fn evaluate<R>(
    registry: &R,
    amount: Decimal,
    category_id: &str,
    total_budget: Decimal,
) -> Result<ComplianceResult>
where
    R: CategoryRepository + ?Sized,
{
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount { amount });
    }
    let percentage = percentage_of(amount, total_budget)?;
    let result = classify(registry, category_id, percentage);

    debug!(
        "Evaluated {} for '{}' against {}: {}% -> {:?}",
        amount,
        category_id,
        total_budget,
        format_percentage(percentage),
        result.status
    );

    Ok(result)
}

/// Classifies an already-computed percentage of total for a category.
#[must_use]
pub fn classify<R>(registry: &R, category_id: &str, percentage: Decimal) -> ComplianceResult
where
    R: CategoryRepository + ?Sized,
{
    let mut warnings = Vec::new();
    if registry.get_category(category_id).is_none() {
        warnings.push(DataWarning::UnknownCategory {
            category_id: category_id.to_string(),
        });
    }

    let category_name = registry.category_name(category_id);
    let violations: Vec<Violation> = [ConstraintType::Max, ConstraintType::Min]
        .into_iter()
        .filter_map(|constraint_type| registry.get_constraint(category_id, constraint_type))
        .filter(|constraint| constraint.is_violated_by(percentage))
        .map(|constraint| violation(category_name, constraint, percentage))
        .collect();

    let status = aggregate_status(&violations);

    ComplianceResult {
        category_id: category_id.to_string(),
        percentage,
        status,
        violations,
        warnings,
    }
}

fn violation(category_name: &str, constraint: &BudgetConstraint, percentage: Decimal) -> Violation {
    let kind = ViolationKind::for_constraint(constraint.constraint_type);
    let pct = format_percentage(percentage);
    let threshold = format_threshold(constraint.percentage);
    let message = match kind {
        ViolationKind::ExceedsMax => {
            format!("{category_name} allocation ({pct}%) exceeds maximum limit of {threshold}%")
        }
        ViolationKind::BelowMin => {
            format!(
                "{category_name} allocation ({pct}%) is below minimum \
                 requirement of {threshold}%"
            )
        }
    };

    Violation {
        kind,
        severity: constraint.severity(),
        category_id: constraint.category_id.clone(),
        percentage,
        threshold: constraint.percentage,
        message,
    }
}

fn aggregate_status(violations: &[Violation]) -> ComplianceStatus {
    match violations.iter().map(|v| v.severity).max() {
        None => ComplianceStatus::Compliant,
        Some(Severity::Soft) => ComplianceStatus::SoftViolation,
        Some(Severity::Hard) => ComplianceStatus::HardViolation,
    }
}

/// Compliance of one existing allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationCompliance {
    /// Allocation evaluated
    pub allocation_id: String,
    /// Percentage recomputed from the allocated amount
    pub computed_percentage: Decimal,
    /// Verdict based on the stored percentage
    pub result: ComplianceResult,
}

/// Re-evaluates every allocation of `budget` against current constraints.
///
/// Each verdict uses the allocation's stored `percentage_of_total`, matching
/// what the overview pages display. The percentage is also recomputed from the
/// allocated amount; a disagreement larger than `drift_tolerance` percentage
/// points is attached as a [`DataWarning::PercentageDrift`].
///
/// # Errors
/// [`Error::InvalidTotalBudget`] if the budget total is not positive.
pub fn evaluate_budget_snapshot<R>(
    registry: &R,
    budget: &Budget,
    drift_tolerance: Decimal,
) -> Result<Vec<AllocationCompliance>>
where
    R: CategoryRepository + ?Sized,
{
    let mut snapshot = Vec::with_capacity(budget.allocations.len());

    for allocation in &budget.allocations {
        let stored = allocation.percentage_of_total();
        let computed = percentage_of(allocation.allocated_amount(), budget.total_amount)?;
        let mut result = classify(registry, &allocation.category_id, stored);

        if (stored - computed).abs() > drift_tolerance {
            warn!(
                "Budget {} allocation {} stores {}% but amounts give {}%",
                budget.id, allocation.id, stored, computed
            );
            result.warnings.push(DataWarning::PercentageDrift {
                allocation_id: allocation.id.clone(),
                stored,
                computed,
            });
        }

        snapshot.push(AllocationCompliance {
            allocation_id: allocation.id.clone(),
            computed_percentage: computed,
            result,
        });
    }

    let violating = snapshot.iter().filter(|s| !s.result.is_compliant()).count();
    debug!(
        "Snapshot of budget {}: {} allocations, {} in violation",
        budget.id,
        snapshot.len(),
        violating
    );

    Ok(snapshot)
}
