//! Allocation business logic - the validation gate in front of budget allocations.
//!
//! Every new or edited allocation passes through the compliance evaluator. Hard
//! violations block; soft violations are accepted with their messages attached.
//! A reconciliation check (one allocation per category, allocations summing to
//! at most the budget total) runs according to a [`ReconciliationPolicy`].

use crate::{
    core::{
        compliance::{ComplianceResult, evaluate},
        registry::CategoryRepository,
    },
    entities::{Budget, BudgetAllocation},
    errors::{Error, Result},
    money::{HUNDRED, format_percentage, percentage_of},
    store::BudgetRepository,
};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

/// How the reconciliation check treats its findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconciliationPolicy {
    /// Do not run the check
    Off,
    /// Report issues but accept the allocation
    #[default]
    Warn,
    /// Block allocations with issues
    Enforce,
}

impl ReconciliationPolicy {
    /// Parses `off`, `warn` or `enforce`, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "warn" => Some(Self::Warn),
            "enforce" => Some(Self::Enforce),
            _ => None,
        }
    }
}

/// A budget-level consistency problem found by the reconciliation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationIssue {
    /// The budget already has an allocation for this category
    DuplicateCategory {
        /// Category allocated twice
        category_id: String,
        /// The allocation already present
        existing_allocation_id: String,
    },
    /// Allocations would add up to more than the budget total
    OverAllocated {
        /// Sum of allocations as a percentage of the total
        total_percentage: Decimal,
    },
}

impl std::fmt::Display for ReconciliationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateCategory {
                category_id,
                existing_allocation_id,
            } => write!(
                f,
                "Category '{category_id}' is already allocated in {existing_allocation_id}"
            ),
            Self::OverAllocated { total_percentage } => write!(
                f,
                "Allocations would total {}% of the budget",
                format_percentage(*total_percentage)
            ),
        }
    }
}

/// What the allocation form submits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Category to allocate to
    pub category_id: String,
    /// Amount to allocate
    pub allocated_amount: Decimal,
}

impl AllocationRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(category_id: impl Into<String>, allocated_amount: Decimal) -> Self {
        Self {
            category_id: category_id.into(),
            allocated_amount,
        }
    }
}

/// Outcome of passing an allocation through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationDecision {
    /// The allocation may be saved. `compliance` may still carry soft violations.
    Accepted {
        /// The allocation to save
        allocation: BudgetAllocation,
        /// Evaluator verdict
        compliance: ComplianceResult,
        /// Reconciliation findings that did not block
        issues: Vec<ReconciliationIssue>,
    },
    /// The allocation must not be saved.
    Blocked {
        /// Evaluator verdict
        compliance: ComplianceResult,
        /// Reconciliation findings
        issues: Vec<ReconciliationIssue>,
    },
}

impl AllocationDecision {
    /// True when the allocation may be saved.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The evaluator verdict.
    #[must_use]
    pub const fn compliance(&self) -> &ComplianceResult {
        match self {
            Self::Accepted { compliance, .. } | Self::Blocked { compliance, .. } => compliance,
        }
    }

    /// Reconciliation findings.
    #[must_use]
    pub fn issues(&self) -> &[ReconciliationIssue] {
        match self {
            Self::Accepted { issues, .. } | Self::Blocked { issues, .. } => issues,
        }
    }

    /// Every message the form should show: violations first, then reconciliation issues.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.compliance()
            .violations
            .iter()
            .map(|v| v.message.clone())
            .chain(self.issues().iter().map(ToString::to_string))
            .collect()
    }
}

/// Passes a new allocation for `budget` through the gate.
///
/// Pure: nothing is saved. The accepted allocation gets the next free id in
/// the budget and zero spent.
pub fn propose_allocation<R>(
    registry: &R,
    budget: &Budget,
    request: &AllocationRequest,
    policy: ReconciliationPolicy,
) -> Result<AllocationDecision>
where
    R: CategoryRepository + ?Sized,
{
    let compliance = evaluate(
        registry,
        request.allocated_amount,
        &request.category_id,
        budget.total_amount,
    )?;
    let issues = reconcile(
        budget,
        &request.category_id,
        request.allocated_amount,
        None,
        policy,
    )?;

    if is_blocked(&compliance, &issues, policy) {
        return Ok(AllocationDecision::Blocked { compliance, issues });
    }

    let allocation = BudgetAllocation::new(
        budget.next_allocation_id(),
        budget.id.clone(),
        request.category_id.clone(),
        request.allocated_amount,
        budget.total_amount,
    )?;

    Ok(AllocationDecision::Accepted {
        allocation,
        compliance,
        issues,
    })
}

/// Passes an edit of an existing allocation's amount through the gate.
///
/// The accepted allocation keeps its id, category and spent amount; its stored
/// percentage is recomputed.
pub fn revise_allocation<R>(
    registry: &R,
    budget: &Budget,
    allocation_id: &str,
    allocated_amount: Decimal,
    policy: ReconciliationPolicy,
) -> Result<AllocationDecision>
where
    R: CategoryRepository + ?Sized,
{
    let existing = budget
        .allocation(allocation_id)
        .ok_or_else(|| Error::AllocationNotFound {
            budget_id: budget.id.clone(),
            id: allocation_id.to_string(),
        })?;

    let compliance = evaluate(
        registry,
        allocated_amount,
        &existing.category_id,
        budget.total_amount,
    )?;
    let issues = reconcile(
        budget,
        &existing.category_id,
        allocated_amount,
        Some(allocation_id),
        policy,
    )?;

    if is_blocked(&compliance, &issues, policy) {
        return Ok(AllocationDecision::Blocked { compliance, issues });
    }

    let mut allocation = existing.clone();
    allocation.set_allocated_amount(allocated_amount, budget.total_amount)?;

    Ok(AllocationDecision::Accepted {
        allocation,
        compliance,
        issues,
    })
}

fn is_blocked(
    compliance: &ComplianceResult,
    issues: &[ReconciliationIssue],
    policy: ReconciliationPolicy,
) -> bool {
    compliance.is_blocking() || (policy == ReconciliationPolicy::Enforce && !issues.is_empty())
}

/// Runs the reconciliation check for `amount` of `category_id`.
///
/// `replacing` names an allocation whose current amount is left out of the
/// sums because the new amount takes its place.
fn reconcile(
    budget: &Budget,
    category_id: &str,
    amount: Decimal,
    replacing: Option<&str>,
    policy: ReconciliationPolicy,
) -> Result<Vec<ReconciliationIssue>> {
    if policy == ReconciliationPolicy::Off {
        return Ok(Vec::new());
    }

    let mut issues = Vec::new();
    let others: Vec<&BudgetAllocation> = budget
        .allocations
        .iter()
        .filter(|a| Some(a.id.as_str()) != replacing)
        .collect();

    if let Some(existing) = others.iter().find(|a| a.category_id == category_id) {
        issues.push(ReconciliationIssue::DuplicateCategory {
            category_id: category_id.to_string(),
            existing_allocation_id: existing.id.clone(),
        });
    }

    let allocated = others
        .iter()
        .map(|a| a.allocated_amount())
        .sum::<Decimal>()
        + amount;
    let total_percentage = percentage_of(allocated, budget.total_amount)?;
    if total_percentage > HUNDRED {
        issues.push(ReconciliationIssue::OverAllocated { total_percentage });
    }

    Ok(issues)
}

/// Gates a new allocation and saves it to the store when accepted.
///
/// The id is assigned and the gate runs while the store holds the budget, so
/// concurrent submissions see each other's allocations.
///
/// # Errors
/// [`Error::BudgetNotFound`] if the budget does not exist, plus any evaluator
/// precondition error. A blocked allocation is `Ok(AllocationDecision::Blocked)`.
#[instrument(skip(store, registry, request), fields(category = %request.category_id))]
pub async fn submit_allocation<S, R>(
    store: &S,
    registry: &R,
    budget_id: &str,
    request: &AllocationRequest,
    policy: ReconciliationPolicy,
) -> Result<AllocationDecision>
where
    S: BudgetRepository,
    R: CategoryRepository + Sync + ?Sized,
{
    let decision = store
        .update_budget(budget_id, |budget| {
            let decision = propose_allocation(registry, budget, request, policy)?;
            if let AllocationDecision::Accepted { allocation, .. } = &decision {
                budget.insert_allocation(allocation.clone())?;
            }
            Ok(decision)
        })
        .await?;

    match &decision {
        AllocationDecision::Accepted { allocation, .. } => {
            info!(
                "Allocated {} to '{}' in budget {} as {}",
                allocation.allocated_amount(),
                allocation.category_id,
                budget_id,
                allocation.id
            );
        }
        AllocationDecision::Blocked { .. } => {
            warn!(
                "Blocked allocation to '{}' in budget {}: {:?}",
                request.category_id,
                budget_id,
                decision.messages()
            );
        }
    }

    Ok(decision)
}

/// Gates an edit of an allocation's amount and applies it when accepted.
///
/// The gate runs against the stored budget and the change is applied in the
/// same step, so spending recorded concurrently is not lost.
#[instrument(skip(store, registry))]
pub async fn submit_revision<S, R>(
    store: &S,
    registry: &R,
    budget_id: &str,
    allocation_id: &str,
    allocated_amount: Decimal,
    policy: ReconciliationPolicy,
) -> Result<AllocationDecision>
where
    S: BudgetRepository,
    R: CategoryRepository + Sync + ?Sized,
{
    let decision = store
        .update_budget(budget_id, |budget| {
            let decision =
                revise_allocation(registry, budget, allocation_id, allocated_amount, policy)?;
            if let AllocationDecision::Accepted { allocation, .. } = &decision {
                budget.upsert_allocation(allocation.clone());
            }
            Ok(decision)
        })
        .await?;

    if decision.is_accepted() {
        info!(
            "Revised allocation {} in budget {} to {}",
            allocation_id, budget_id, allocated_amount
        );
    } else {
        warn!(
            "Blocked revision of allocation {} in budget {}: {:?}",
            allocation_id,
            budget_id,
            decision.messages()
        );
    }

    Ok(decision)
}

pub(crate) async fn load_budget<S: BudgetRepository>(store: &S, budget_id: &str) -> Result<Budget> {
    store
        .get_budget(budget_id)
        .await?
        .ok_or_else(|| Error::BudgetNotFound {
            id: budget_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{compliance::ComplianceStatus, registry::ConstraintRegistry};
    use crate::store::InMemoryStore;
    use crate::test_utils::*;
    use rust_decimal_macros::dec;

    fn budget_without_admin() -> Budget {
        let mut budget = sample_budget();
        budget.allocations.retain(|a| a.category_id != "administration");
        budget
    }

    #[test]
    fn test_hard_violation_blocks() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let request = AllocationRequest::new("administration", dec!(200000));
        let decision = propose_allocation(
            &registry,
            &budget_without_admin(),
            &request,
            ReconciliationPolicy::Off,
        )?;

        assert!(!decision.is_accepted());
        assert_eq!(decision.compliance().status, ComplianceStatus::HardViolation);
        assert_eq!(
            decision.messages(),
            vec!["Administration allocation (13.3%) exceeds maximum limit of 10%".to_string()]
        );
        Ok(())
    }

    #[test]
    fn test_soft_violation_is_accepted_with_warning() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let request = AllocationRequest::new("advocacy-training", dec!(100000));
        let decision = propose_allocation(
            &registry,
            &budget_without_admin(),
            &request,
            ReconciliationPolicy::Warn,
        )?;

        let AllocationDecision::Accepted {
            allocation,
            compliance,
            issues,
        } = decision
        else {
            panic!("soft violation should not block");
        };
        assert_eq!(compliance.status, ComplianceStatus::SoftViolation);
        assert!(issues.is_empty());
        assert_eq!(allocation.id, "BA006");
        assert_eq!(allocation.remaining_amount(), dec!(100000));
        assert_eq!(format_percentage(allocation.percentage_of_total()), "6.7");
        Ok(())
    }

    #[test]
    fn test_boundary_allocation_is_accepted() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let budget = Budget::new("B1", 2024, dec!(1500000), test_date())?;
        let request = AllocationRequest::new("personnel", dec!(450000));
        let decision =
            propose_allocation(&registry, &budget, &request, ReconciliationPolicy::Enforce)?;
        assert!(decision.is_accepted());
        assert!(decision.compliance().is_compliant());
        Ok(())
    }

    #[test]
    fn test_invalid_amount_is_an_error() {
        let registry = ConstraintRegistry::default();
        let request = AllocationRequest::new("personnel", Decimal::ZERO);
        let result = propose_allocation(
            &registry,
            &sample_budget(),
            &request,
            ReconciliationPolicy::Warn,
        );
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
    }

    #[test]
    fn test_duplicate_category_warns_or_blocks() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let mut budget = Budget::new("B1", 2024, dec!(1000000), test_date())?;
        budget.insert_allocation(BudgetAllocation::new(
            "BA001",
            "B1",
            "vaccines",
            dec!(100000),
            dec!(1000000),
        )?)?;
        let request = AllocationRequest::new("vaccines", dec!(50000));

        let warned = propose_allocation(&registry, &budget, &request, ReconciliationPolicy::Warn)?;
        assert!(warned.is_accepted());
        assert_eq!(
            warned.issues(),
            &[ReconciliationIssue::DuplicateCategory {
                category_id: "vaccines".to_string(),
                existing_allocation_id: "BA001".to_string(),
            }]
        );

        let enforced =
            propose_allocation(&registry, &budget, &request, ReconciliationPolicy::Enforce)?;
        assert!(!enforced.is_accepted());

        let off = propose_allocation(&registry, &budget, &request, ReconciliationPolicy::Off)?;
        assert!(off.issues().is_empty());
        Ok(())
    }

    #[test]
    fn test_over_allocation_detected() -> Result<()> {
        let registry = ConstraintRegistry::default();
        // Seed budget is already fully allocated.
        let request = AllocationRequest::new("advocacy-training", dec!(150000));
        let decision = propose_allocation(
            &registry,
            &sample_budget(),
            &request,
            ReconciliationPolicy::Enforce,
        )?;

        assert!(!decision.is_accepted());
        assert_eq!(
            decision.issues(),
            &[ReconciliationIssue::OverAllocated {
                total_percentage: dec!(110)
            }]
        );
        assert_eq!(
            decision.messages(),
            vec!["Allocations would total 110.0% of the budget".to_string()]
        );
        Ok(())
    }

    #[test]
    fn test_revision_preserves_spent_and_recomputes_percentage() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let budget = sample_budget();
        let decision = revise_allocation(
            &registry,
            &budget,
            "BA002",
            dec!(280000),
            ReconciliationPolicy::Enforce,
        )?;

        let AllocationDecision::Accepted { allocation, .. } = decision else {
            panic!("shrinking an allocation should be accepted");
        };
        assert_eq!(allocation.id, "BA002");
        assert_eq!(allocation.spent_amount(), dec!(245000));
        assert_eq!(allocation.remaining_amount(), dec!(35000));
        assert_eq!(format_percentage(allocation.percentage_of_total()), "18.7");
        Ok(())
    }

    #[test]
    fn test_revision_ignores_its_own_old_amount() -> Result<()> {
        let registry = ConstraintRegistry::default();
        // Same amount again: no duplicate, still exactly 100% allocated.
        let decision = revise_allocation(
            &registry,
            &sample_budget(),
            "BA001",
            dec!(450000),
            ReconciliationPolicy::Enforce,
        )?;
        assert!(decision.is_accepted());
        assert!(decision.issues().is_empty());
        Ok(())
    }

    #[test]
    fn test_revision_over_hard_max_blocks() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let decision = revise_allocation(
            &registry,
            &sample_budget(),
            "BA001",
            dec!(460000),
            ReconciliationPolicy::Off,
        )?;
        assert!(!decision.is_accepted());
        assert!(decision.compliance().is_blocking());
        Ok(())
    }

    #[test]
    fn test_revision_of_unknown_allocation() {
        let registry = ConstraintRegistry::default();
        let result = revise_allocation(
            &registry,
            &sample_budget(),
            "BA999",
            dec!(1),
            ReconciliationPolicy::Off,
        );
        assert!(matches!(result, Err(Error::AllocationNotFound { .. })));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            ReconciliationPolicy::parse("ENFORCE"),
            Some(ReconciliationPolicy::Enforce)
        );
        assert_eq!(ReconciliationPolicy::parse("off"), Some(ReconciliationPolicy::Off));
        assert_eq!(ReconciliationPolicy::parse("sometimes"), None);
        assert_eq!(ReconciliationPolicy::default(), ReconciliationPolicy::Warn);
    }

    #[tokio::test]
    async fn test_submit_allocation_saves_accepted() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let store = setup_test_store().await?;
        let request = AllocationRequest::new("advocacy-training", dec!(150000));

        let decision = submit_allocation(
            &store,
            &registry,
            SAMPLE_BUDGET_ID,
            &request,
            ReconciliationPolicy::Warn,
        )
        .await?;
        assert!(decision.is_accepted());
        assert_eq!(decision.issues().len(), 1);

        let budget = store.get_budget(SAMPLE_BUDGET_ID).await?.unwrap();
        assert_eq!(budget.allocations.len(), 7);
        assert_eq!(
            budget.allocation("BA007").unwrap().category_id,
            "advocacy-training"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_allocation_does_not_save_blocked() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let store = setup_test_store().await?;
        let request = AllocationRequest::new("administration", dec!(200000));

        let decision = submit_allocation(
            &store,
            &registry,
            SAMPLE_BUDGET_ID,
            &request,
            ReconciliationPolicy::Off,
        )
        .await?;
        assert!(!decision.is_accepted());

        let budget = store.get_budget(SAMPLE_BUDGET_ID).await?.unwrap();
        assert_eq!(budget.allocations.len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_allocation_unknown_budget() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let store = setup_test_store().await?;
        let request = AllocationRequest::new("vaccines", dec!(1));
        let result =
            submit_allocation(&store, &registry, "NOPE", &request, ReconciliationPolicy::Off).await;
        assert!(matches!(result, Err(Error::BudgetNotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_submissions_keep_both_allocations() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let store = YieldingStore(setup_test_store().await?);
        let advocacy = AllocationRequest::new("advocacy-training", dec!(150000));
        let vaccines = AllocationRequest::new("vaccines", dec!(20000));

        let (first, second) = tokio::join!(
            submit_allocation(
                &store,
                &registry,
                SAMPLE_BUDGET_ID,
                &advocacy,
                ReconciliationPolicy::Warn,
            ),
            submit_allocation(
                &store,
                &registry,
                SAMPLE_BUDGET_ID,
                &vaccines,
                ReconciliationPolicy::Warn,
            ),
        );
        assert!(first?.is_accepted());
        assert!(second?.is_accepted());

        let budget = store.get_budget(SAMPLE_BUDGET_ID).await?.unwrap();
        assert_eq!(budget.allocations.len(), 8);
        let mut added: Vec<&str> = budget.allocations[6..]
            .iter()
            .map(|a| a.category_id.as_str())
            .collect();
        added.sort_unstable();
        assert_eq!(added, vec!["advocacy-training", "vaccines"]);
        assert!(budget.allocation("BA007").is_some());
        assert!(budget.allocation("BA008").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_submissions_cannot_bypass_enforce() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let empty = Budget::new("B1", 2024, dec!(1000), test_date())?;
        let store = YieldingStore(InMemoryStore::with_data(vec![empty], Vec::new()));
        let request = AllocationRequest::new("vaccines", dec!(700));

        let (first, second) = tokio::join!(
            submit_allocation(&store, &registry, "B1", &request, ReconciliationPolicy::Enforce),
            submit_allocation(&store, &registry, "B1", &request, ReconciliationPolicy::Enforce),
        );
        let accepted = [first?, second?]
            .iter()
            .filter(|d| d.is_accepted())
            .count();
        assert_eq!(accepted, 1);

        let budget = store.get_budget("B1").await?.unwrap();
        assert_eq!(budget.allocations.len(), 1);
        assert_eq!(budget.allocations[0].allocated_amount(), dec!(700));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_revision_keeps_concurrent_spending() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let store = setup_test_store().await?;

        store
            .record_spending(SAMPLE_BUDGET_ID, "BA002", dec!(5000))
            .await?;
        let decision = submit_revision(
            &store,
            &registry,
            SAMPLE_BUDGET_ID,
            "BA002",
            dec!(290000),
            ReconciliationPolicy::Enforce,
        )
        .await?;
        assert!(decision.is_accepted());

        let budget = store.get_budget(SAMPLE_BUDGET_ID).await?.unwrap();
        let vaccines = budget.allocation("BA002").unwrap();
        assert_eq!(vaccines.allocated_amount(), dec!(290000));
        assert_eq!(vaccines.spent_amount(), dec!(250000));
        assert_eq!(vaccines.remaining_amount(), dec!(40000));
        Ok(())
    }

    #[tokio::test]
    async fn test_blocked_revision_leaves_store_untouched() -> Result<()> {
        let registry = ConstraintRegistry::default();
        let store = setup_test_store().await?;

        let decision = submit_revision(
            &store,
            &registry,
            SAMPLE_BUDGET_ID,
            "BA006",
            dec!(200000),
            ReconciliationPolicy::Off,
        )
        .await?;
        assert!(!decision.is_accepted());

        let budget = store.get_budget(SAMPLE_BUDGET_ID).await?.unwrap();
        assert_eq!(budget, sample_budget());
        Ok(())
    }
}
