//! Process-wide in-memory store.
//!
//! Budgets and expenses live in two `tokio::sync::RwLock`ed vectors for the
//! lifetime of the process. Each mutating call holds the write lock for its
//! whole read-modify-write, id assignment included.

use crate::{
    entities::{Budget, BudgetAllocation, Expense},
    errors::{Error, Result},
    store::{BudgetRepository, ExpenseRepository},
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Budgets and expenses held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    budgets: RwLock<Vec<Budget>>,
    expenses: RwLock<Vec<Expense>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with budgets and expenses.
    #[must_use]
    pub fn with_data(budgets: Vec<Budget>, expenses: Vec<Expense>) -> Self {
        debug!(
            "Seeding in-memory store with {} budgets and {} expenses",
            budgets.len(),
            expenses.len()
        );
        Self {
            budgets: RwLock::new(budgets),
            expenses: RwLock::new(expenses),
        }
    }
}

fn find_budget<'a>(budgets: &'a mut [Budget], budget_id: &str) -> Result<&'a mut Budget> {
    budgets
        .iter_mut()
        .find(|b| b.id == budget_id)
        .ok_or_else(|| Error::BudgetNotFound {
            id: budget_id.to_string(),
        })
}

fn find_allocation<'a>(
    budgets: &'a mut [Budget],
    budget_id: &str,
    allocation_id: &str,
) -> Result<&'a mut BudgetAllocation> {
    find_budget(budgets, budget_id)?
        .allocation_mut(allocation_id)
        .ok_or_else(|| Error::AllocationNotFound {
            budget_id: budget_id.to_string(),
            id: allocation_id.to_string(),
        })
}

impl BudgetRepository for InMemoryStore {
    async fn get_budget(&self, budget_id: &str) -> Result<Option<Budget>> {
        let budgets = self.budgets.read().await;
        Ok(budgets.iter().find(|b| b.id == budget_id).cloned())
    }

    async fn list_budgets(&self) -> Result<Vec<Budget>> {
        Ok(self.budgets.read().await.clone())
    }

    async fn save_budget(&self, budget: Budget) -> Result<()> {
        let mut budgets = self.budgets.write().await;
        match budgets.iter_mut().find(|b| b.id == budget.id) {
            Some(existing) => *existing = budget,
            None => budgets.push(budget),
        }
        Ok(())
    }

    async fn insert_allocation(&self, budget_id: &str, allocation: BudgetAllocation) -> Result<()> {
        let mut budgets = self.budgets.write().await;
        let budget = find_budget(&mut budgets, budget_id)?;
        trace!("Inserting allocation {} into budget {}", allocation.id, budget_id);
        budget.insert_allocation(allocation)
    }

    async fn update_budget<F, T>(&self, budget_id: &str, apply: F) -> Result<T>
    where
        F: FnOnce(&mut Budget) -> Result<T> + Send,
        T: Send,
    {
        let mut budgets = self.budgets.write().await;
        let stored = find_budget(&mut budgets, budget_id)?;

        let mut updated = stored.clone();
        let output = apply(&mut updated)?;
        *stored = updated;
        Ok(output)
    }

    async fn record_spending(
        &self,
        budget_id: &str,
        allocation_id: &str,
        amount: Decimal,
    ) -> Result<BudgetAllocation> {
        let mut budgets = self.budgets.write().await;
        let allocation = find_allocation(&mut budgets, budget_id, allocation_id)?;
        allocation.record_spend(amount)?;
        trace!(
            "Allocation {} spent {} of {}",
            allocation_id,
            allocation.spent_amount(),
            allocation.allocated_amount()
        );
        Ok(allocation.clone())
    }
}

impl ExpenseRepository for InMemoryStore {
    async fn insert_expense(&self, expense: Expense) -> Result<()> {
        let mut expenses = self.expenses.write().await;
        if expenses.iter().any(|e| e.id == expense.id) {
            return Err(Error::DuplicateId {
                entity: "expense",
                id: expense.id,
            });
        }
        expenses.push(expense);
        Ok(())
    }

    async fn insert_new_expense(&self, mut expense: Expense) -> Result<Expense> {
        let mut expenses = self.expenses.write().await;
        expense.id = Expense::next_id(&expenses);
        trace!("Assigned id {} to new expense", expense.id);
        expenses.push(expense.clone());
        Ok(expense)
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>> {
        let expenses = self.expenses.read().await;
        Ok(expenses.iter().find(|e| e.id == expense_id).cloned())
    }

    async fn list_expenses(&self, budget_id: Option<&str>) -> Result<Vec<Expense>> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .iter()
            .filter(|e| budget_id.is_none_or(|id| e.budget_id == id))
            .cloned()
            .collect())
    }

    async fn update_expense<F>(&self, expense_id: &str, apply: F) -> Result<Expense>
    where
        F: FnOnce(&mut Expense) -> Result<()> + Send,
    {
        let mut expenses = self.expenses.write().await;
        let stored = expenses
            .iter_mut()
            .find(|e| e.id == expense_id)
            .ok_or_else(|| Error::ExpenseNotFound {
                id: expense_id.to_string(),
            })?;

        let mut updated = stored.clone();
        apply(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }
}
