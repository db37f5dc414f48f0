//! Report generation business logic.
//!
//! Pure roll-ups over a budget's allocations and a list of expenses, consumed
//! by the dashboard and overview pages: totals, utilization, per-category
//! breakdowns, the constraint overview table and expense statistics. Every
//! division is guarded so an empty denominator yields zero, never NaN.

use crate::{
    core::{
        compliance::{ComplianceStatus, ViolationKind, classify},
        registry::CategoryRepository,
    },
    entities::{Budget, ConstraintType, Expense, ExpenseStatus, Severity},
    money::{HUNDRED, format_percentage, percentage_or_zero},
};
use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Budget-wide totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetTotals {
    /// Sum of allocated amounts
    pub total_allocated: Decimal,
    /// Sum of spent amounts
    pub total_spent: Decimal,
    /// Sum of remaining amounts
    pub total_remaining: Decimal,
    /// Spent as a percentage of allocated (0 when nothing allocated)
    pub utilization_percentage: Decimal,
    /// Allocated as a percentage of the budget total (0 when the total is not positive)
    pub allocation_percentage: Decimal,
}

/// Sums allocated, spent and remaining across a budget's allocations.
#[must_use]
pub fn calculate_totals(budget: &Budget) -> BudgetTotals {
    let total_allocated: Decimal = budget
        .allocations
        .iter()
        .map(|a| a.allocated_amount())
        .sum();
    let total_spent: Decimal = budget.allocations.iter().map(|a| a.spent_amount()).sum();
    let total_remaining: Decimal = budget
        .allocations
        .iter()
        .map(|a| a.remaining_amount())
        .sum();

    BudgetTotals {
        total_allocated,
        total_spent,
        total_remaining,
        utilization_percentage: calculate_utilization(total_spent, total_allocated),
        allocation_percentage: percentage_or_zero(total_allocated, budget.total_amount),
    }
}

/// Spent as a percentage of allocated.
///
/// Defined as zero when nothing is allocated. Values above 100 mean overspending.
#[must_use]
pub fn calculate_utilization(spent: Decimal, allocated: Decimal) -> Decimal {
    percentage_or_zero(spent, allocated)
}

/// One row of the per-category breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryBreakdown {
    /// Category id
    pub category_id: String,
    /// Display name, or "—" for unknown ids
    pub category_name: String,
    /// Allocated amount
    pub allocated: Decimal,
    /// Spent amount
    pub spent: Decimal,
    /// Remaining amount
    pub remaining: Decimal,
    /// Stored percentage of the budget total
    pub percentage: Decimal,
    /// Spent as a percentage of allocated
    pub utilization: Decimal,
    /// Above a max constraint
    pub is_over_limit: bool,
    /// Verdict for the stored percentage
    pub status: ComplianceStatus,
}

/// Dashboard summary of a budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetSummary {
    /// Budget total
    pub total_budget: Decimal,
    /// Budget-wide totals
    pub totals: BudgetTotals,
    /// One row per allocation, in allocation order
    pub category_breakdown: Vec<CategoryBreakdown>,
}

impl BudgetSummary {
    /// Rows whose stored percentage breaks a constraint.
    pub fn violations(&self) -> impl Iterator<Item = &CategoryBreakdown> {
        self.category_breakdown
            .iter()
            .filter(|row| row.status != ComplianceStatus::Compliant)
    }
}

/// Builds the dashboard summary of `budget`.
#[must_use]
pub fn summarize_budget<R>(registry: &R, budget: &Budget) -> BudgetSummary
where
    R: CategoryRepository + ?Sized,
{
    let category_breakdown = budget
        .allocations
        .iter()
        .map(|allocation| {
            let verdict = classify(
                registry,
                &allocation.category_id,
                allocation.percentage_of_total(),
            );
            CategoryBreakdown {
                category_id: allocation.category_id.clone(),
                category_name: registry.category_name(&allocation.category_id).to_string(),
                allocated: allocation.allocated_amount(),
                spent: allocation.spent_amount(),
                remaining: allocation.remaining_amount(),
                percentage: allocation.percentage_of_total(),
                utilization: allocation.utilization_percentage(),
                is_over_limit: verdict.has_violation(ViolationKind::ExceedsMax),
                status: verdict.status,
            }
        })
        .collect();

    BudgetSummary {
        total_budget: budget.total_amount,
        totals: calculate_totals(budget),
        category_breakdown,
    }
}

/// One row of the constraint overview table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintStatus {
    /// Category id
    pub category_id: String,
    /// Display name
    pub category_name: String,
    /// Max or min
    pub constraint_type: ConstraintType,
    /// Threshold percentage
    pub limit: Decimal,
    /// Current stored percentage for the category (0 when it has no allocation)
    pub current_percentage: Decimal,
    /// Hard or soft
    pub enforcement: Severity,
    /// Whether the current percentage satisfies the constraint
    pub is_compliant: bool,
}

/// Lists every registry constraint with the budget's current standing against it.
///
/// When a category has several allocations their stored percentages are summed.
#[must_use]
pub fn constraint_overview<R>(registry: &R, budget: &Budget) -> Vec<ConstraintStatus>
where
    R: CategoryRepository + ?Sized,
{
    registry
        .list_constraints()
        .iter()
        .map(|constraint| {
            let current_percentage: Decimal = budget
                .allocations_for_category(&constraint.category_id)
                .map(|a| a.percentage_of_total())
                .sum();
            ConstraintStatus {
                category_id: constraint.category_id.clone(),
                category_name: registry.category_name(&constraint.category_id).to_string(),
                constraint_type: constraint.constraint_type,
                limit: constraint.percentage,
                current_percentage,
                enforcement: constraint.severity(),
                is_compliant: !constraint.is_violated_by(current_percentage),
            }
        })
        .collect()
}

/// Counts shown above the expense list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpenseStats {
    /// Number of expenses
    pub total: usize,
    /// Sum of amounts
    pub total_amount: Decimal,
    /// Pending count
    pub pending: usize,
    /// Approved count
    pub approved: usize,
    /// Rejected count
    pub rejected: usize,
    /// Expenses stamped non-compliant
    pub non_compliant: usize,
    /// Expenses dated in the same month as `today`
    pub this_month: usize,
}

/// Aggregates expense counts relative to `today`.
#[must_use]
pub fn expense_stats(expenses: &[Expense], today: NaiveDate) -> ExpenseStats {
    expenses.iter().fold(ExpenseStats::default(), |mut stats, expense| {
        stats.total += 1;
        stats.total_amount += expense.amount;
        match expense.status {
            ExpenseStatus::Pending => stats.pending += 1,
            ExpenseStatus::Approved => stats.approved += 1,
            ExpenseStatus::Rejected => stats.rejected += 1,
        }
        if !expense.is_compliant {
            stats.non_compliant += 1;
        }
        if expense.date.year() == today.year() && expense.date.month() == today.month() {
            stats.this_month += 1;
        }
        stats
    })
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`. The bar is
/// clamped to 0..=100 while the label shows the real value.
#[must_use]
pub fn format_progress_bar(percentage: Decimal, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = percentage.clamp(Decimal::ZERO, HUNDRED);

    let filled = (clamped / HUNDRED * Decimal::from(length))
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(length);
    let empty = length - filled;

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {}%", format_percentage(percentage))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::registry::ConstraintRegistry;
    use crate::entities::BudgetAllocation;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_calculate_totals_for_seed_budget() {
        let totals = calculate_totals(&sample_budget());
        assert_eq!(totals.total_allocated, dec!(1500000));
        assert_eq!(totals.total_spent, dec!(1178500));
        assert_eq!(totals.total_remaining, dec!(321500));
        assert_eq!(totals.allocation_percentage, dec!(100));
        assert_eq!(
            format_percentage(totals.utilization_percentage),
            "78.6"
        );
    }

    #[test]
    fn test_totals_reconcile() {
        let totals = calculate_totals(&sample_budget());
        assert_eq!(
            totals.total_remaining,
            totals.total_allocated - totals.total_spent
        );
    }

    #[test]
    fn test_utilization_zero_when_nothing_allocated() {
        assert_eq!(calculate_utilization(dec!(10), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(calculate_utilization(dec!(50), dec!(200)), dec!(25));
        assert_eq!(calculate_utilization(dec!(300), dec!(200)), dec!(150));
    }

    #[test]
    fn test_totals_of_empty_budget() -> crate::errors::Result<()> {
        let budget = Budget::new("EMPTY", 2025, dec!(1000), test_date())?;
        let totals = calculate_totals(&budget);
        assert_eq!(totals.total_allocated, Decimal::ZERO);
        assert_eq!(totals.utilization_percentage, Decimal::ZERO);
        assert_eq!(totals.allocation_percentage, Decimal::ZERO);
        Ok(())
    }

    #[test]
    fn test_summary_breakdown() {
        let registry = ConstraintRegistry::default();
        let summary = summarize_budget(&registry, &sample_budget());

        assert_eq!(summary.total_budget, dec!(1500000));
        assert_eq!(summary.category_breakdown.len(), 6);
        assert_eq!(summary.violations().count(), 0);

        let personnel = &summary.category_breakdown[0];
        assert_eq!(personnel.category_name, "Personnel");
        assert_eq!(personnel.remaining, dec!(62500));
        assert_eq!(format_percentage(personnel.utilization), "86.1");
        assert!(!personnel.is_over_limit);
    }

    #[test]
    fn test_summary_flags_over_limit() {
        let registry = ConstraintRegistry::default();
        let mut budget = sample_budget();
        budget.upsert_allocation(BudgetAllocation::restore(
            "BA006",
            budget.id.clone(),
            "administration",
            dec!(180000),
            Decimal::ZERO,
            dec!(12),
        ));

        let summary = summarize_budget(&registry, &budget);
        let admin = summary
            .category_breakdown
            .iter()
            .find(|row| row.category_id == "administration")
            .unwrap();
        assert!(admin.is_over_limit);
        assert_eq!(admin.status, ComplianceStatus::HardViolation);
        assert_eq!(summary.violations().count(), 1);
    }

    #[test]
    fn test_constraint_overview_rows() {
        let registry = ConstraintRegistry::default();
        let overview = constraint_overview(&registry, &sample_budget());

        assert_eq!(overview.len(), 6);
        let advocacy = overview
            .iter()
            .find(|row| row.category_id == "advocacy-training")
            .unwrap();
        // No allocation for advocacy: current is 0 and the 10% minimum is missed.
        assert_eq!(advocacy.current_percentage, Decimal::ZERO);
        assert!(!advocacy.is_compliant);
        assert_eq!(advocacy.enforcement, Severity::Soft);

        let admin = &overview[0];
        assert_eq!(admin.category_name, "Administration");
        assert_eq!(admin.current_percentage, dec!(10));
        assert!(admin.is_compliant);
        assert_eq!(admin.enforcement, Severity::Hard);
    }

    #[test]
    fn test_expense_stats() {
        let stats = expense_stats(&sample_expenses(), test_date());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.total_amount, dec!(60500));
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 3);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.non_compliant, 1);
        assert_eq!(stats.this_month, 4);

        let later = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        assert_eq!(expense_stats(&sample_expenses(), later).this_month, 0);
    }

    #[test]
    fn test_format_progress_bar_full() {
        let bar = format_progress_bar(dec!(100), Some(10));
        assert_eq!(bar, "[██████████] 100.0%");
    }

    #[test]
    fn test_format_progress_bar_half() {
        let bar = format_progress_bar(dec!(50), Some(10));
        assert_eq!(bar, "[█████░░░░░] 50.0%");
    }

    #[test]
    fn test_format_progress_bar_overspent() {
        // Overspending fills the bar but keeps the real label
        let bar = format_progress_bar(dec!(125), Some(10));
        assert_eq!(bar, "[██████████] 125.0%");
    }

    #[test]
    fn test_format_progress_bar_zero() {
        let bar = format_progress_bar(Decimal::ZERO, None);
        assert_eq!(bar, "[░░░░░░░░░░] 0.0%");
    }
}
