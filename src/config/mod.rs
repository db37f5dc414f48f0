/// Budget file loading for reports
pub mod budgets;

/// Category and constraint seed loading from config.toml
pub mod registry;

/// Runtime settings from environment variables
pub mod settings;

pub use budgets::{BudgetFile, load_budget_file};
pub use registry::{load_registry, load_registry_or_default};
pub use settings::Settings;
