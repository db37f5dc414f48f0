//! Store layer - repository traits over budgets and expenses.
//!
//! The gates in [`crate::core`] talk to these traits, not to a concrete store.
//! [`InMemoryStore`] keeps process-wide state with no persistence; any
//! implementation must run each read-modify-write, id assignment included,
//! under one exclusive hold of the data so `remaining = allocated - spent` and
//! id uniqueness survive concurrent updates.

use crate::{
    entities::{Budget, BudgetAllocation, Expense},
    errors::Result,
};
use rust_decimal::Decimal;
use std::future::Future;

/// In-memory store backed by `tokio` read-write locks
pub mod memory;

pub use memory::InMemoryStore;

/// Storage for budgets and their allocations.
pub trait BudgetRepository {
    /// Fetches a budget by id.
    fn get_budget(&self, budget_id: &str) -> impl Future<Output = Result<Option<Budget>>> + Send;

    /// All budgets in insertion order.
    fn list_budgets(&self) -> impl Future<Output = Result<Vec<Budget>>> + Send;

    /// Inserts a budget or replaces the one with the same id.
    fn save_budget(&self, budget: Budget) -> impl Future<Output = Result<()>> + Send;

    /// Adds a new allocation to a budget. Fails if the id is already used.
    fn insert_allocation(
        &self,
        budget_id: &str,
        allocation: BudgetAllocation,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Atomically applies `apply` to a stored budget and returns its output.
    ///
    /// Whatever `apply` reads and decides holds when its changes are written.
    /// Nothing is written if `apply` fails.
    fn update_budget<F, T>(
        &self,
        budget_id: &str,
        apply: F,
    ) -> impl Future<Output = Result<T>> + Send
    where
        F: FnOnce(&mut Budget) -> Result<T> + Send,
        T: Send;

    /// Atomically adds `amount` to an allocation's spent total.
    fn record_spending(
        &self,
        budget_id: &str,
        allocation_id: &str,
        amount: Decimal,
    ) -> impl Future<Output = Result<BudgetAllocation>> + Send;
}

/// Storage for expenses.
pub trait ExpenseRepository {
    /// Stores an expense under its own id. Fails if the id is already used.
    fn insert_expense(&self, expense: Expense) -> impl Future<Output = Result<()>> + Send;

    /// Stores an expense under the next free id and returns it as stored.
    fn insert_new_expense(&self, expense: Expense)
    -> impl Future<Output = Result<Expense>> + Send;

    /// Fetches an expense by id.
    fn get_expense(&self, expense_id: &str) -> impl Future<Output = Result<Option<Expense>>> + Send;

    /// Expenses in insertion order, optionally only those of one budget.
    fn list_expenses(
        &self,
        budget_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Expense>>> + Send;

    /// Atomically applies `apply` to a stored expense and returns the result.
    ///
    /// Nothing is written if `apply` fails.
    fn update_expense<F>(
        &self,
        expense_id: &str,
        apply: F,
    ) -> impl Future<Output = Result<Expense>> + Send
    where
        F: FnOnce(&mut Expense) -> Result<()> + Send;
}
