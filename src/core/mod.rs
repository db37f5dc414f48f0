/// Allocation gate - proposals, revisions and budget reconciliation
pub mod allocation;
/// Compliance evaluator - percentage of total against category constraints
pub mod compliance;
/// Expense gate - review, approval and stale verdict checks
pub mod expense;
/// Constraint registry - the category and constraint catalog
pub mod registry;
/// Budget reporting - totals, breakdowns, constraint overview and expense stats
pub mod report;
