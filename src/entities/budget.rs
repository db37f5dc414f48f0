//! Budgets and their per-category allocations.
//!
//! An allocation's remaining amount is always derived from allocated minus
//! spent. Its percentage of the budget total is stored (so loaded data can be
//! checked for drift) but only written by constructors and recompute methods.

use crate::{
    errors::{Error, Result},
    money::{percentage_of, percentage_or_zero},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// Being prepared
    Draft,
    /// Signed off, not yet in force
    Approved,
    /// In force for the fiscal year
    Active,
    /// Fiscal year ended
    Closed,
}

impl BudgetStatus {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// The only status this one may advance to.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Draft => Some(Self::Approved),
            Self::Approved => Some(Self::Active),
            Self::Active => Some(Self::Closed),
            Self::Closed => None,
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The portion of a budget assigned to one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    /// Allocation id
    pub id: String,
    /// Owning budget
    pub budget_id: String,
    /// Category the money is assigned to
    pub category_id: String,
    allocated_amount: Decimal,
    #[serde(default)]
    spent_amount: Decimal,
    percentage_of_total: Decimal,
}

impl BudgetAllocation {
    /// Creates a fresh allocation with nothing spent.
    ///
    /// Fails when the amount is not positive or the budget total is not positive.
    pub fn new(
        id: impl Into<String>,
        budget_id: impl Into<String>,
        category_id: impl Into<String>,
        allocated_amount: Decimal,
        budget_total: Decimal,
    ) -> Result<Self> {
        if allocated_amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount {
                amount: allocated_amount,
            });
        }
        let percentage_of_total = percentage_of(allocated_amount, budget_total)?;

        Ok(Self {
            id: id.into(),
            budget_id: budget_id.into(),
            category_id: category_id.into(),
            allocated_amount,
            spent_amount: Decimal::ZERO,
            percentage_of_total,
        })
    }

    /// Rebuilds an allocation from previously stored values, stored percentage included.
    ///
    /// No consistency check is made between the amounts and `percentage_of_total`;
    /// that is what the budget snapshot's drift check is for.
    #[must_use]
    pub fn restore(
        id: impl Into<String>,
        budget_id: impl Into<String>,
        category_id: impl Into<String>,
        allocated_amount: Decimal,
        spent_amount: Decimal,
        percentage_of_total: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            budget_id: budget_id.into(),
            category_id: category_id.into(),
            allocated_amount,
            spent_amount,
            percentage_of_total,
        }
    }

    /// Amount assigned to the category.
    #[must_use]
    pub const fn allocated_amount(&self) -> Decimal {
        self.allocated_amount
    }

    /// Amount spent so far.
    #[must_use]
    pub const fn spent_amount(&self) -> Decimal {
        self.spent_amount
    }

    /// Allocated minus spent. Negative when overspent.
    #[must_use]
    pub fn remaining_amount(&self) -> Decimal {
        self.allocated_amount - self.spent_amount
    }

    /// Stored percentage of the budget total.
    #[must_use]
    pub const fn percentage_of_total(&self) -> Decimal {
        self.percentage_of_total
    }

    /// Spent as a percentage of allocated, zero when nothing is allocated.
    #[must_use]
    pub fn utilization_percentage(&self) -> Decimal {
        percentage_or_zero(self.spent_amount, self.allocated_amount)
    }

    /// Adds `amount` to the spent total.
    pub fn record_spend(&mut self, amount: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount { amount });
        }
        self.spent_amount = self
            .spent_amount
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow {
                amount,
                total: self.spent_amount,
            })?;
        if self.spent_amount > self.allocated_amount {
            tracing::warn!(
                "Allocation {} overspent: spent {} of {}",
                self.id,
                self.spent_amount,
                self.allocated_amount
            );
        }
        Ok(())
    }

    /// Changes the allocated amount and recomputes the stored percentage.
    pub fn set_allocated_amount(&mut self, amount: Decimal, budget_total: Decimal) -> Result<()> {
        if amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount { amount });
        }
        self.percentage_of_total = percentage_of(amount, budget_total)?;
        self.allocated_amount = amount;
        Ok(())
    }

    /// Recomputes the stored percentage against `budget_total` and returns it.
    pub fn recompute_percentage(&mut self, budget_total: Decimal) -> Result<Decimal> {
        self.percentage_of_total = percentage_of(self.allocated_amount, budget_total)?;
        Ok(self.percentage_of_total)
    }
}

/// A fiscal-year budget and its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Budget id (e.g. `BUD2024001`)
    pub id: String,
    /// Fiscal year
    pub year: i32,
    /// Total money available
    pub total_amount: Decimal,
    /// Lifecycle status
    pub status: BudgetStatus,
    /// When the budget was created
    pub created_date: NaiveDate,
    /// When the budget was approved
    #[serde(default)]
    pub approved_date: Option<NaiveDate>,
    /// Allocations in insertion order
    #[serde(default)]
    pub allocations: Vec<BudgetAllocation>,
}

impl Budget {
    /// Creates an empty draft budget.
    pub fn new(
        id: impl Into<String>,
        year: i32,
        total_amount: Decimal,
        created_date: NaiveDate,
    ) -> Result<Self> {
        if total_amount <= Decimal::ZERO {
            return Err(Error::InvalidTotalBudget {
                total: total_amount,
            });
        }
        Ok(Self {
            id: id.into(),
            year,
            total_amount,
            status: BudgetStatus::Draft,
            created_date,
            approved_date: None,
            allocations: Vec::new(),
        })
    }

    /// Looks up an allocation by id.
    #[must_use]
    pub fn allocation(&self, allocation_id: &str) -> Option<&BudgetAllocation> {
        self.allocations.iter().find(|a| a.id == allocation_id)
    }

    /// Mutable lookup by allocation id.
    pub fn allocation_mut(&mut self, allocation_id: &str) -> Option<&mut BudgetAllocation> {
        self.allocations.iter_mut().find(|a| a.id == allocation_id)
    }

    /// All allocations for a category, in order.
    pub fn allocations_for_category<'a>(
        &'a self,
        category_id: &'a str,
    ) -> impl Iterator<Item = &'a BudgetAllocation> + 'a {
        self.allocations
            .iter()
            .filter(move |a| a.category_id == category_id)
    }

    /// Adds a new allocation. Fails if its id is already used in this budget.
    pub fn insert_allocation(&mut self, allocation: BudgetAllocation) -> Result<()> {
        if self.allocation(&allocation.id).is_some() {
            return Err(Error::DuplicateId {
                entity: "allocation",
                id: allocation.id,
            });
        }
        self.allocations.push(allocation);
        Ok(())
    }

    /// Inserts the allocation, or replaces the one with the same id.
    pub fn upsert_allocation(&mut self, allocation: BudgetAllocation) {
        match self.allocation_mut(&allocation.id) {
            Some(existing) => *existing = allocation,
            None => self.allocations.push(allocation),
        }
    }

    /// Picks an allocation id not yet used in this budget (`BA001`, `BA002`, ...).
    #[must_use]
    pub fn next_allocation_id(&self) -> String {
        let mut n = self.allocations.len() + 1;
        loop {
            let candidate = format!("BA{n:03}");
            if self.allocation(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Changes the total and recomputes every allocation's stored percentage.
    pub fn revise_total(&mut self, total_amount: Decimal) -> Result<()> {
        if total_amount <= Decimal::ZERO {
            return Err(Error::InvalidTotalBudget {
                total: total_amount,
            });
        }
        for allocation in &mut self.allocations {
            allocation.recompute_percentage(total_amount)?;
        }
        self.total_amount = total_amount;
        Ok(())
    }

    /// Moves the budget to `target`, which must be the next lifecycle status.
    ///
    /// Approving stamps `approved_date` with `on`.
    pub fn transition(&mut self, target: BudgetStatus, on: NaiveDate) -> Result<()> {
        if self.status.next() != Some(target) {
            return Err(Error::InvalidStatusTransition {
                entity: "budget",
                from: self.status.to_string(),
                to: target.to_string(),
            });
        }
        if target == BudgetStatus::Approved {
            self.approved_date = Some(on);
        }
        self.status = target;
        Ok(())
    }
}
