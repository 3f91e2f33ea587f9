use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::domain::{StakeAccountStatus, StakeAction, StakeActionPlan, StakeOperationRequest};

use crate::{config::SessionConfig, error::PlanningError};

/// Decision table from a requested operation and the known registration state
/// to the ledger actions of a single transaction.
pub fn plan_actions(
    request: &StakeOperationRequest,
    is_registered: bool,
) -> Result<StakeActionPlan, PlanningError> {
    let actions = match (request, is_registered) {
        (StakeOperationRequest::RegisterStake, false) => vec![StakeAction::Register],
        (StakeOperationRequest::RegisterStake, true) => {
            return Err(PlanningError::AlreadyRegistered)
        }
        (StakeOperationRequest::DeregisterStake, true) => vec![StakeAction::Deregister],
        (StakeOperationRequest::DeregisterStake, false) => {
            return Err(PlanningError::NotRegistered)
        }
        (StakeOperationRequest::DelegateStake { pool_id }, registered) => {
            if pool_id.as_str().trim().is_empty() {
                return Err(PlanningError::EmptyPoolId);
            }
            let delegate = StakeAction::Delegate {
                pool_id: pool_id.clone(),
            };
            if registered {
                vec![delegate]
            } else {
                vec![StakeAction::Register, delegate]
            }
        }
    };

    Ok(StakeActionPlan::new(actions)?)
}

#[derive(Debug, Clone)]
pub struct StakePlanner {
    max_status_age: Duration,
}

impl StakePlanner {
    pub fn new(max_status_age: Duration) -> Self {
        Self { max_status_age }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.status_max_age)
    }

    pub fn plan(
        &self,
        request: &StakeOperationRequest,
        status: Option<&StakeAccountStatus>,
        now: DateTime<Utc>,
    ) -> Result<StakeActionPlan, PlanningError> {
        if let StakeOperationRequest::DelegateStake { pool_id } = request {
            if pool_id.as_str().trim().is_empty() {
                return Err(PlanningError::EmptyPoolId);
            }
        }

        let status = status.ok_or(PlanningError::StatusUnknown)?;
        if self.is_stale(status, now) {
            return Err(PlanningError::StatusUnknown);
        }

        plan_actions(request, status.is_registered)
    }

    fn is_stale(&self, status: &StakeAccountStatus, now: DateTime<Utc>) -> bool {
        // Negative ages (clock skew) count as fresh.
        let age = now
            .signed_duration_since(status.fetched_at)
            .to_std()
            .unwrap_or_default();
        age > self.max_status_age
    }
}

impl Default for StakePlanner {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

#[cfg(test)]
#[path = "tests/planner_tests.rs"]
mod tests;
