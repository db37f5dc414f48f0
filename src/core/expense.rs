//! Expense business logic - the compliance gate in front of recorded expenses.
//!
//! Expenses are never blocked, even on a hard violation: the verdict is stamped
//! on the expense as `is_compliant` and the form shows the messages as
//! warnings. Only allocations can be hard-blocked (see [`crate::core::allocation`]).
//! Approving an expense adds its amount to the matching allocation's spent total.

use crate::{
    core::{
        allocation::load_budget,
        compliance::{ComplianceResult, evaluate},
        registry::CategoryRepository,
    },
    entities::{Budget, ConstraintType, Expense, ExpenseStatus},
    errors::{Error, Result},
    money::format_threshold,
    store::{BudgetRepository, ExpenseRepository},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, instrument, warn};

/// Amount above which an expense needs additional approval.
pub const DEFAULT_LARGE_EXPENSE_THRESHOLD: Decimal = dec!(50000);

/// Advisory shown for expenses above the large-expense threshold.
pub const LARGE_EXPENSE_WARNING: &str = "Large expense amount - requires additional approval";

/// What the expense form submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRequest {
    /// Budget charged
    pub budget_id: String,
    /// Category charged
    pub category_id: String,
    /// Amount spent
    pub amount: Decimal,
    /// Date of the expense
    pub date: NaiveDate,
    /// What the money was for
    pub description: String,
    /// How it was paid
    pub payment_method: String,
    /// Attached document names
    pub supporting_documents: Vec<String>,
    /// Free-text notes
    pub notes: Option<String>,
}

impl ExpenseRequest {
    /// Creates a request with empty description, payment method and documents.
    #[must_use]
    pub fn new(
        budget_id: impl Into<String>,
        category_id: impl Into<String>,
        amount: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            budget_id: budget_id.into(),
            category_id: category_id.into(),
            amount,
            date,
            description: String::new(),
            payment_method: String::new(),
            supporting_documents: Vec::new(),
            notes: None,
        }
    }
}

/// Evaluator verdict plus the form's advisory notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseReview {
    /// Evaluator verdict against the budget total
    pub compliance: ComplianceResult,
    /// Amount is above the large-expense threshold
    pub requires_additional_approval: bool,
    /// Notes that do not affect compliance
    pub advisories: Vec<String>,
}

impl ExpenseReview {
    /// The value stamped on the expense.
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.compliance.is_compliant()
    }

    /// Violation messages followed by advisories.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.compliance
            .violations
            .iter()
            .map(|v| v.message.clone())
            .chain(self.advisories.iter().cloned())
            .collect()
    }
}

/// Reviews `amount` of `category_id` against a budget of `total_budget`.
pub fn review_expense<R>(
    registry: &R,
    total_budget: Decimal,
    category_id: &str,
    amount: Decimal,
    large_expense_threshold: Decimal,
) -> Result<ExpenseReview>
where
    R: CategoryRepository + ?Sized,
{
    let compliance = evaluate(registry, amount, category_id, total_budget)?;

    let requires_additional_approval = amount > large_expense_threshold;
    let mut advisories = Vec::new();
    if requires_additional_approval {
        advisories.push(LARGE_EXPENSE_WARNING.to_string());
    }
    if let Some(max) = registry.get_constraint(category_id, ConstraintType::Max) {
        if max.is_hard {
            advisories.push(format!(
                "This category has strict spending limits ({}% max)",
                format_threshold(max.percentage)
            ));
        }
    }

    Ok(ExpenseReview {
        compliance,
        requires_additional_approval,
        advisories,
    })
}

/// Builds a pending expense for `budget`, stamped with its compliance verdict.
///
/// The id is left empty; the store assigns one on insert.
pub fn create_expense<R>(
    registry: &R,
    budget: &Budget,
    request: ExpenseRequest,
    large_expense_threshold: Decimal,
) -> Result<(Expense, ExpenseReview)>
where
    R: CategoryRepository + ?Sized,
{
    let review = review_expense(
        registry,
        budget.total_amount,
        &request.category_id,
        request.amount,
        large_expense_threshold,
    )?;

    let expense = Expense {
        id: String::new(),
        budget_id: budget.id.clone(),
        category_id: request.category_id,
        amount: request.amount,
        date: request.date,
        description: request.description,
        payment_method: request.payment_method,
        supporting_documents: request.supporting_documents,
        approved_by: None,
        status: ExpenseStatus::Pending,
        is_compliant: review.is_compliant(),
        notes: request.notes,
    };

    Ok((expense, review))
}

/// Criteria for the expense list. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// Case-insensitive text matched against description, id and category name
    pub search: Option<String>,
    /// Exact category id
    pub category_id: Option<String>,
    /// Exact status
    pub status: Option<ExpenseStatus>,
    /// Stamped compliance
    pub compliant: Option<bool>,
}

impl ExpenseFilter {
    /// Whether `expense` passes every set criterion.
    pub fn matches<R>(&self, expense: &Expense, registry: &R) -> bool
    where
        R: CategoryRepository + ?Sized,
    {
        let matches_search = self.search.as_deref().is_none_or(|term| {
            let term = term.to_lowercase();
            expense.description.to_lowercase().contains(&term)
                || expense.id.to_lowercase().contains(&term)
                || registry
                    .get_category(&expense.category_id)
                    .is_some_and(|c| c.name.to_lowercase().contains(&term))
        });

        matches_search
            && self
                .category_id
                .as_deref()
                .is_none_or(|id| expense.category_id == id)
            && self.status.is_none_or(|status| expense.status == status)
            && self
                .compliant
                .is_none_or(|compliant| expense.is_compliant == compliant)
    }

    /// The expenses that match, in order.
    pub fn apply<'a, R>(&self, expenses: &'a [Expense], registry: &R) -> Vec<&'a Expense>
    where
        R: CategoryRepository + ?Sized,
    {
        expenses
            .iter()
            .filter(|e| self.matches(e, registry))
            .collect()
    }
}

/// An expense whose stamped verdict no longer matches a fresh evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleExpense {
    /// Expense id
    pub expense_id: String,
    /// Value stamped when recorded
    pub stamped_compliant: bool,
    /// Fresh verdict
    pub current: ComplianceResult,
}

/// Re-evaluates `budget`'s expenses and reports those whose stamp is out of date.
///
/// Expenses of other budgets are ignored. Nothing is modified.
pub fn find_stale_expenses<R>(
    registry: &R,
    budget: &Budget,
    expenses: &[Expense],
) -> Result<Vec<StaleExpense>>
where
    R: CategoryRepository + ?Sized,
{
    let mut stale = Vec::new();
    for expense in expenses.iter().filter(|e| e.budget_id == budget.id) {
        let current = evaluate(
            registry,
            expense.amount,
            &expense.category_id,
            budget.total_amount,
        )?;
        if current.is_compliant() != expense.is_compliant {
            stale.push(StaleExpense {
                expense_id: expense.id.clone(),
                stamped_compliant: expense.is_compliant,
                current,
            });
        }
    }
    Ok(stale)
}

/// A stored expense and the review shown to the submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseSubmission {
    /// The stored expense
    pub expense: Expense,
    /// Verdict and advisories
    pub review: ExpenseReview,
}

/// Reviews and stores a new pending expense. Never blocks on violations.
///
/// # Errors
/// [`crate::errors::Error::BudgetNotFound`] if the budget does not exist, plus
/// evaluator precondition errors.
#[instrument(
    skip(store, registry, request),
    fields(budget = %request.budget_id, category = %request.category_id)
)]
pub async fn submit_expense<S, R>(
    store: &S,
    registry: &R,
    request: ExpenseRequest,
    large_expense_threshold: Decimal,
) -> Result<ExpenseSubmission>
where
    S: BudgetRepository + ExpenseRepository,
    R: CategoryRepository + ?Sized,
{
    let budget = load_budget(store, &request.budget_id).await?;
    let (expense, review) = create_expense(registry, &budget, request, large_expense_threshold)?;
    let expense = store.insert_new_expense(expense).await?;

    if review.is_compliant() {
        info!("Recorded expense {} of {}", expense.id, expense.amount);
    } else {
        warn!(
            "Recorded non-compliant expense {} of {}: {:?}",
            expense.id,
            expense.amount,
            review.compliance.messages()
        );
    }

    Ok(ExpenseSubmission { expense, review })
}

/// Approves a pending expense and adds its amount to the matching allocation.
///
/// The budget is resolved before anything changes. When the budget has no
/// allocation for the expense's category the approval still stands and nothing
/// is charged. If the charge fails the approval is reverted and the error returned.
#[instrument(skip(store))]
pub async fn approve_expense<S>(store: &S, expense_id: &str, approver: &str) -> Result<Expense>
where
    S: BudgetRepository + ExpenseRepository,
{
    let pending = store
        .get_expense(expense_id)
        .await?
        .ok_or_else(|| Error::ExpenseNotFound {
            id: expense_id.to_string(),
        })?;
    let budget = load_budget(store, &pending.budget_id).await?;
    let allocation_id = budget
        .allocations_for_category(&pending.category_id)
        .next()
        .map(|a| a.id.clone());

    let approver = approver.to_string();
    let expense = store
        .update_expense(expense_id, move |e| e.approve(approver))
        .await?;

    let Some(allocation_id) = allocation_id else {
        warn!(
            "Approved expense {} but budget {} has no allocation for '{}'",
            expense.id, budget.id, expense.category_id
        );
        return Ok(expense);
    };

    match store
        .record_spending(&budget.id, &allocation_id, expense.amount)
        .await
    {
        Ok(updated) => {
            info!(
                "Approved expense {}; allocation {} now has {} remaining",
                expense.id,
                updated.id,
                updated.remaining_amount()
            );
            Ok(expense)
        }
        Err(err) => {
            warn!(
                "Charging expense {} to allocation {} failed, reverting approval: {}",
                expense.id, allocation_id, err
            );
            store
                .update_expense(expense_id, Expense::revert_approval)
                .await?;
            Err(err)
        }
    }
}

/// Rejects a pending expense.
#[instrument(skip(store))]
pub async fn reject_expense<S>(store: &S, expense_id: &str) -> Result<Expense>
where
    S: ExpenseRepository,
{
    let expense = store.update_expense(expense_id, Expense::reject).await?;
    info!("Rejected expense {}", expense.id);
    Ok(expense)
}

/// Re-evaluates a budget's stored expenses and re-stamps the stale ones.
///
/// Returns what changed. Re-evaluation only happens when this is called.
#[instrument(skip(store, registry))]
pub async fn refresh_expense_compliance<S, R>(
    store: &S,
    registry: &R,
    budget_id: &str,
) -> Result<Vec<StaleExpense>>
where
    S: BudgetRepository + ExpenseRepository,
    R: CategoryRepository + ?Sized,
{
    let budget = load_budget(store, budget_id).await?;
    let expenses = store.list_expenses(Some(budget_id)).await?;
    let stale = find_stale_expenses(registry, &budget, &expenses)?;

    for entry in &stale {
        let compliant = entry.current.is_compliant();
        store
            .update_expense(&entry.expense_id, move |e| {
                e.is_compliant = compliant;
                Ok(())
            })
            .await?;
    }
    if !stale.is_empty() {
        info!("Re-stamped {} expenses in budget {}", stale.len(), budget_id);
    }

    Ok(stale)
}
