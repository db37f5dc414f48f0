use budget_compliance::{
    config::{BudgetFile, Settings, load_budget_file, load_registry_or_default},
    core::{
        compliance::{evaluate, evaluate_budget_snapshot},
        expense::{find_stale_expenses, review_expense},
        registry::{CategoryRepository, ConstraintRegistry},
        report::{constraint_overview, expense_stats, format_progress_bar, summarize_budget},
    },
    errors::{Error, Result},
    money::{format_amount, format_percentage, format_threshold},
    store::{BudgetRepository, ExpenseRepository, InMemoryStore},
};
use dotenvy::dotenv;
use rust_decimal::Decimal;
use std::{env, str::FromStr};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  budget-compliance categories
  budget-compliance check <category> <amount> <total>
  budget-compliance report <budget-file>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables can also be set externally
    dotenv().ok();

    // 3. Settings and the constraint registry
    let settings = Settings::from_env()
        .inspect_err(|e| error!("Failed to read settings: {}", e))?;
    let registry = load_registry_or_default(&settings.registry_path)
        .inspect(|r| {
            info!(
                "Registry loaded with {} categories and {} constraints",
                r.list_categories().len(),
                r.list_constraints().len()
            );
        })
        .inspect_err(|e| error!("Failed to load registry: {}", e))?;

    // 4. Dispatch
    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["categories"] => print_categories(&registry),
        ["check", category, amount, total] => {
            run_check(&registry, &settings, category, amount, total)?;
        }
        ["report", path] => run_report(&registry, &settings, path).await?,
        _ => {
            eprintln!("{USAGE}");
            return Err(Error::Config {
                message: "Unrecognized command".to_string(),
            });
        }
    }

    Ok(())
}

fn parse_decimal(name: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| Error::Config {
        message: format!("{name} '{raw}' is not a number: {e}"),
    })
}

fn print_categories(registry: &ConstraintRegistry) {
    for category in registry.list_categories() {
        println!("{} ({})", category.name, category.id);
        if !category.description.is_empty() {
            println!("    {}", category.description);
        }
        for constraint in registry.constraints_for(&category.id) {
            println!(
                "    {} {}% ({})",
                constraint.constraint_type.label(),
                format_threshold(constraint.percentage),
                constraint.severity()
            );
        }
    }
}

fn run_check(
    registry: &ConstraintRegistry,
    settings: &Settings,
    category: &str,
    amount: &str,
    total: &str,
) -> Result<()> {
    let amount = parse_decimal("amount", amount)?;
    let total = parse_decimal("total", total)?;

    let result = evaluate(registry, amount, category, total)?;
    println!(
        "{}: {} ({}% of {})",
        registry.category_name(category),
        result.status.label(),
        format_percentage(result.percentage),
        format_amount(total)
    );
    for message in result.messages() {
        println!("  - {message}");
    }
    for warning in &result.warnings {
        println!("  ! {warning}");
    }
    println!(
        "  As an allocation: {}",
        if result.is_blocking() { "blocked" } else { "accepted" }
    );

    let review = review_expense(
        registry,
        total,
        category,
        amount,
        settings.large_expense_threshold,
    )?;
    for advisory in &review.advisories {
        println!("  As an expense: {advisory}");
    }

    Ok(())
}

async fn run_report(registry: &ConstraintRegistry, settings: &Settings, path: &str) -> Result<()> {
    let BudgetFile { budget, expenses } = load_budget_file(path)?;
    let budget_id = budget.id.clone();
    let store = InMemoryStore::with_data(vec![budget], expenses);

    let budget = store
        .get_budget(&budget_id)
        .await?
        .ok_or_else(|| Error::BudgetNotFound {
            id: budget_id.clone(),
        })?;
    let expenses = store.list_expenses(Some(&budget_id)).await?;

    println!(
        "Budget {} ({}, {}) total {}",
        budget.id,
        budget.year,
        budget.status,
        format_amount(budget.total_amount)
    );

    let summary = summarize_budget(registry, &budget);
    println!(
        "Allocated {}  Spent {}  Remaining {}",
        format_amount(summary.totals.total_allocated),
        format_amount(summary.totals.total_spent),
        format_amount(summary.totals.total_remaining)
    );
    println!(
        "Utilization {}",
        format_progress_bar(summary.totals.utilization_percentage, None)
    );

    println!("\nCategories:");
    for row in &summary.category_breakdown {
        println!(
            "  {:<24} {:>6}%  {:>14} left  {}  {}",
            row.category_name,
            format_percentage(row.percentage),
            format_amount(row.remaining),
            format_progress_bar(row.utilization, None),
            row.status.label()
        );
    }

    println!("\nFindings:");
    let snapshot = evaluate_budget_snapshot(registry, &budget, settings.drift_tolerance)?;
    let mut clean = true;
    for entry in &snapshot {
        for message in entry.result.messages() {
            println!("  {}: {message}", entry.allocation_id);
            clean = false;
        }
        for warning in &entry.result.warnings {
            println!("  {}: {warning}", entry.allocation_id);
            clean = false;
        }
    }
    if clean {
        println!("  none");
    }

    println!("\nConstraints:");
    for row in constraint_overview(registry, &budget) {
        println!(
            "  {:<24} {} {:>5}%  current {:>6}%  {:<4}  {}",
            row.category_name,
            row.constraint_type.label(),
            format_threshold(row.limit),
            format_percentage(row.current_percentage),
            row.enforcement,
            if row.is_compliant { "ok" } else { "NOT MET" }
        );
    }

    let today = chrono::Local::now().date_naive();
    let stats = expense_stats(&expenses, today);
    println!(
        "\nExpenses: {} totalling {}",
        stats.total,
        format_amount(stats.total_amount)
    );
    println!(
        "  {} pending, {} approved, {} rejected, {} non-compliant, {} this month",
        stats.pending,
        stats.approved,
        stats.rejected,
        stats.non_compliant,
        stats.this_month
    );

    for stale in find_stale_expenses(registry, &budget, &expenses)? {
        println!(
            "  {} was recorded as {} but is now {}",
            stale.expense_id,
            if stale.stamped_compliant { "compliant" } else { "non-compliant" },
            stale.current.status.label()
        );
    }

    Ok(())
}
