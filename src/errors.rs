//! Unified error types for the compliance engine.
//!
//! Only precondition failures and lookup misses are errors. Constraint
//! violations are returned as data on a `ComplianceResult` so callers can
//! always render something.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by the registry, evaluator, gates and store.
#[derive(Debug, Error)]
pub enum Error {
    /// Seed data or runtime settings could not be loaded or are inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Amount was zero or negative
    #[error("Invalid amount: {amount} (must be greater than zero)")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Budget total was zero or negative, so no percentage can be computed
    #[error("Invalid total budget: {total} (must be greater than zero)")]
    InvalidTotalBudget {
        /// The rejected total
        total: Decimal,
    },

    /// A percentage computation overflowed the decimal range
    #[error("Arithmetic overflow computing {amount} of {total}")]
    ArithmeticOverflow {
        /// Numerator
        amount: Decimal,
        /// Denominator
        total: Decimal,
    },

    /// No budget with the given id
    #[error("Budget '{id}' not found")]
    BudgetNotFound {
        /// Budget id
        id: String,
    },

    /// No allocation with the given id in the budget
    #[error("Allocation '{id}' not found in budget '{budget_id}'")]
    AllocationNotFound {
        /// Budget id
        budget_id: String,
        /// Allocation id
        id: String,
    },

    /// No expense with the given id
    #[error("Expense '{id}' not found")]
    ExpenseNotFound {
        /// Expense id
        id: String,
    },

    /// A status change that the lifecycle does not allow
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidStatusTransition {
        /// Kind of record ("budget", "expense")
        entity: &'static str,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// A record with this id already exists
    #[error("{entity} '{id}' already exists")]
    DuplicateId {
        /// Kind of record ("allocation", "expense")
        entity: &'static str,
        /// The clashing id
        id: String,
    },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
