//! Shared test utilities for the compliance engine.
//!
//! Provides the sample immunization budget (`BUD2024001`) with its six
//! allocations and four recorded expenses, plus helpers for building
//! individual records with sensible defaults.

use crate::{
    entities::{Budget, BudgetAllocation, BudgetStatus, Expense, ExpenseStatus},
    errors::Result,
    store::{BudgetRepository, ExpenseRepository, InMemoryStore},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Id of the sample budget
pub const SAMPLE_BUDGET_ID: &str = "BUD2024001";

/// Fixed "today" used by tests (inside the month of the sample expenses).
pub fn test_date() -> NaiveDate {
    date(2024, 6, 25)
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn allocation(
    id: &str,
    category_id: &str,
    allocated: Decimal,
    spent: Decimal,
    percentage: Decimal,
) -> BudgetAllocation {
    BudgetAllocation::restore(id, SAMPLE_BUDGET_ID, category_id, allocated, spent, percentage)
}

/// The active 2024 budget of 1,500,000.
///
/// Advocacy & Training has no allocation, so its minimum is unmet.
pub fn sample_budget() -> Budget {
    Budget {
        id: SAMPLE_BUDGET_ID.to_string(),
        year: 2024,
        total_amount: dec!(1500000),
        status: BudgetStatus::Active,
        created_date: date(2024, 1, 1),
        approved_date: Some(date(2024, 1, 15)),
        allocations: vec![
            allocation("BA001", "personnel", dec!(450000), dec!(387500), dec!(30)),
            allocation("BA002", "vaccines", dec!(300000), dec!(245000), dec!(20)),
            allocation("BA003", "cold-chain", dec!(225000), dec!(189000), dec!(15)),
            allocation("BA004", "community-outreach", dec!(300000), dec!(198000), dec!(20)),
            allocation("BA005", "monitoring-evaluation", dec!(75000), dec!(67500), dec!(5)),
            allocation("BA006", "administration", dec!(150000), dec!(91500), dec!(10)),
        ],
    }
}

/// Creates a pending, compliant expense against the sample budget.
///
/// # Defaults
/// * `date`: [`test_date`]
/// * `description`: `"Test expense"`
/// * `payment_method`: `"Bank Transfer"`
pub fn test_expense(id: &str, category_id: &str, amount: Decimal) -> Expense {
    Expense {
        id: id.to_string(),
        budget_id: SAMPLE_BUDGET_ID.to_string(),
        category_id: category_id.to_string(),
        amount,
        date: test_date(),
        description: "Test expense".to_string(),
        payment_method: "Bank Transfer".to_string(),
        supporting_documents: Vec::new(),
        approved_by: None,
        status: ExpenseStatus::Pending,
        is_compliant: true,
        notes: None,
    }
}

/// The four expenses recorded against the sample budget in June 2024.
pub fn sample_expenses() -> Vec<Expense> {
    let mut salaries = test_expense("EXP001", "personnel", dec!(25000));
    salaries.date = date(2024, 6, 15);
    salaries.description = "Monthly salaries for health workers".to_string();
    salaries.supporting_documents = vec!["payroll_june_2024.pdf".to_string()];
    salaries.approved_by = Some("Finance Manager".to_string());
    salaries.status = ExpenseStatus::Approved;

    let mut vaccines = test_expense("EXP002", "vaccines", dec!(8500));
    vaccines.date = date(2024, 6, 20);
    vaccines.description = "BCG vaccine procurement".to_string();
    vaccines.payment_method = "Purchase Order".to_string();
    vaccines.supporting_documents = vec![
        "po_bcg_2024.pdf".to_string(),
        "supplier_quote.pdf".to_string(),
    ];
    vaccines.notes = Some("Urgent procurement for upcoming campaign".to_string());

    let mut office = test_expense("EXP003", "administration", dec!(15000));
    office.date = date(2024, 6, 18);
    office.description = "Office supplies and equipment".to_string();
    office.approved_by = Some("Admin Manager".to_string());
    office.status = ExpenseStatus::Approved;
    office.is_compliant = false;
    office.notes = Some("Exceeds monthly admin allowance".to_string());

    let mut outreach = test_expense("EXP004", "community-outreach", dec!(12000));
    outreach.date = date(2024, 6, 22);
    outreach.description = "Community health worker transport".to_string();
    outreach.payment_method = "Cash".to_string();
    outreach.approved_by = Some("Program Manager".to_string());
    outreach.status = ExpenseStatus::Approved;

    vec![salaries, vaccines, office, outreach]
}

/// Creates a store holding the sample budget and expenses.
/// This is the standard setup for workflow tests.
#[allow(clippy::unused_async)]
pub async fn setup_test_store() -> Result<InMemoryStore> {
    Ok(InMemoryStore::with_data(
        vec![sample_budget()],
        sample_expenses(),
    ))
}

/// Store that yields to the scheduler before every call.
///
/// Lets concurrent tasks interleave between one store call and the next, the
/// way a remote store would.
pub struct YieldingStore(pub InMemoryStore);

impl BudgetRepository for YieldingStore {
    async fn get_budget(&self, budget_id: &str) -> Result<Option<Budget>> {
        tokio::task::yield_now().await;
        self.0.get_budget(budget_id).await
    }

    async fn list_budgets(&self) -> Result<Vec<Budget>> {
        tokio::task::yield_now().await;
        self.0.list_budgets().await
    }

    async fn save_budget(&self, budget: Budget) -> Result<()> {
        tokio::task::yield_now().await;
        self.0.save_budget(budget).await
    }

    async fn insert_allocation(&self, budget_id: &str, allocation: BudgetAllocation) -> Result<()> {
        tokio::task::yield_now().await;
        self.0.insert_allocation(budget_id, allocation).await
    }

    async fn update_budget<F, T>(&self, budget_id: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Budget) -> Result<T> + Send,
        T: Send,
    {
        tokio::task::yield_now().await;
        self.0.update_budget(budget_id, apply).await
    }

    async fn record_spending(
        &self,
        budget_id: &str,
        allocation_id: &str,
        amount: Decimal,
    ) -> Result<BudgetAllocation> {
        tokio::task::yield_now().await;
        self.0.record_spending(budget_id, allocation_id, amount).await
    }
}

impl ExpenseRepository for YieldingStore {
    async fn insert_expense(&self, expense: Expense) -> Result<()> {
        tokio::task::yield_now().await;
        self.0.insert_expense(expense).await
    }

    async fn insert_new_expense(&self, expense: Expense) -> Result<Expense> {
        tokio::task::yield_now().await;
        self.0.insert_new_expense(expense).await
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>> {
        tokio::task::yield_now().await;
        self.0.get_expense(expense_id).await
    }

    async fn list_expenses(&self, budget_id: Option<&str>) -> Result<Vec<Expense>> {
        tokio::task::yield_now().await;
        self.0.list_expenses(budget_id).await
    }

    async fn update_expense<F>(&self, expense_id: &str, apply: F) -> Result<Expense>
    where
        F: FnOnce(&mut Expense) -> Result<()> + Send,
    {
        tokio::task::yield_now().await;
        self.0.update_expense(expense_id, apply).await
    }
}
