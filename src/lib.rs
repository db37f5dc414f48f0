//! `budget-compliance` - percentage-of-total compliance for programme budgets
//!
//! This crate validates how a fiscal-year budget is split across spending
//! categories. A catalog of max/min percentage constraints (hard or soft) is
//! checked by a single evaluator that sits in front of two gates: budget
//! allocations, where hard violations block, and expenses, where violations are
//! recorded on the expense but never block. Reporting helpers summarize
//! totals, per-category breakdowns and constraint status.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    // Documentation - missing docs should be added gradually
    missing_docs,

    // Clippy categories for overall code quality
    clippy::all,
    clippy::pedantic,
    clippy::nursery,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_types_passed_by_value,
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,

    // Correctness
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Complexity and readability
    clippy::cognitive_complexity,
    clippy::large_enum_variant,
    clippy::match_same_arms,
    clippy::too_many_lines,

    // Style consistency
    clippy::enum_glob_use,
    clippy::inconsistent_struct_constructor,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::redundant_closure_for_method_calls,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,

    // Future compatibility
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,        // Will add gradually
    clippy::missing_panics_doc,        // Will add gradually
)]

/// Configuration - registry seed, budget files and runtime settings
pub mod config;
/// Core business logic - registry, evaluator, allocation and expense gates, reporting
pub mod core;
/// Domain records: budgets, allocations, categories, constraints, expenses
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Decimal percentage arithmetic and display formatting
pub mod money;
/// Repository traits and the in-memory store
pub mod store;

#[cfg(test)]
pub mod test_utils;
