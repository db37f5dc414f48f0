//! Entity module - domain records shared by the registry, evaluator and store.
//! Plain serde structs: they are loaded from TOML seed and budget files and
//! held in memory, never mapped to a database.

pub mod budget;
pub mod category;
pub mod expense;

pub use budget::{Budget, BudgetAllocation, BudgetStatus};
pub use category::{BudgetCategory, BudgetConstraint, ConstraintType, Severity};
pub use expense::{Expense, ExpenseStatus};
