// crates/scoring/src/handoff.rs
use common::{AllocationConfig, Error, FundingCandidate, ProjectScore, Result, RewardAllocation};

/// Budget-constrained allocator fed by the scoring output.
///
/// Implementations receive candidates whose scores sum to 1.0 and must honour
/// the budget, the per-project minimum and the per-project share ceiling.
pub trait RewardAllocator {
    fn allocate(
        &self,
        candidates: &[FundingCandidate],
        config: &AllocationConfig,
    ) -> Result<Vec<RewardAllocation>>;
}

/// Projects with a positive share, renormalized to sum to 1.0
pub fn funding_candidates(results: &[ProjectScore]) -> Result<Vec<FundingCandidate>> {
    let positive: Vec<&ProjectScore> = results.iter().filter(|r| r.weighted_score > 0.0).collect();
    if positive.is_empty() {
        return Err(Error::NoFundedProjects);
    }

    let total: f64 = positive.iter().map(|r| r.weighted_score).sum();
    Ok(positive
        .into_iter()
        .map(|r| FundingCandidate {
            project: r.project.clone(),
            score: r.weighted_score / total,
        })
        .collect())
}

/// Hand the scoring output to an allocator and keep the funded projects.
pub fn allocate_rewards(
    allocator: &dyn RewardAllocator,
    results: &[ProjectScore],
    config: &AllocationConfig,
) -> Result<Vec<RewardAllocation>> {
    config.validate()?;
    let candidates = funding_candidates(results)?;
    tracing::info!(candidates = candidates.len(), budget = config.budget, "Allocating rewards");

    let funded: Vec<RewardAllocation> = allocator
        .allocate(&candidates, config)?
        .into_iter()
        .filter(|a| a.reward_amount > 0.0)
        .collect();
    if funded.is_empty() {
        return Err(Error::NoFundedProjects);
    }

    let total: f64 = funded.iter().map(|a| a.reward_amount).sum();
    tracing::info!(projects = funded.len(), total, "Rewards allocated");
    Ok(funded)
}
