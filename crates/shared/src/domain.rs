use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlanShapeError;

macro_rules! text_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

text_newtype!(WalletName);
text_newtype!(RewardAddress);
text_newtype!(PoolId);
text_newtype!(TransactionId);
text_newtype!(UnsignedTransaction);
text_newtype!(SignedTransaction);

/// Logical version of a status snapshot. Strictly increases per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatusVersion(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub name: WalletName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub wallet_name: WalletName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_address: Option<RewardAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Chain,
    Optimistic,
}

/// Cached belief about the on-chain registration of one reward address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeAccountStatus {
    pub reward_address: RewardAddress,
    pub is_registered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_pool: Option<PoolId>,
    pub as_of: StatusVersion,
    pub fetched_at: DateTime<Utc>,
    pub source: StatusSource,
}

impl StakeAccountStatus {
    /// Derives the status expected once `plan` lands on chain.
    pub fn with_plan_applied(
        &self,
        plan: &StakeActionPlan,
        as_of: StatusVersion,
        now: DateTime<Utc>,
    ) -> Self {
        let is_registered = plan.net_registration().unwrap_or(self.is_registered);
        let delegated_pool = if !is_registered {
            None
        } else {
            plan.delegated_pool()
                .cloned()
                .or_else(|| self.delegated_pool.clone())
        };
        Self {
            reward_address: self.reward_address.clone(),
            is_registered,
            delegated_pool,
            as_of,
            fetched_at: now,
            source: StatusSource::Optimistic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakeOperationKind {
    Register,
    Deregister,
    Delegate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StakeOperationRequest {
    RegisterStake,
    DeregisterStake,
    DelegateStake { pool_id: PoolId },
}

impl StakeOperationRequest {
    pub fn kind(&self) -> StakeOperationKind {
        match self {
            Self::RegisterStake => StakeOperationKind::Register,
            Self::DeregisterStake => StakeOperationKind::Deregister,
            Self::DelegateStake { .. } => StakeOperationKind::Delegate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StakeAction {
    Register,
    Deregister,
    Delegate { pool_id: PoolId },
}

/// Ordered ledger actions carried by a single transaction.
///
/// Construction enforces the plan shape: at least one action, no repeats,
/// `Deregister` never alongside `Delegate`, and `Register` ahead of `Delegate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StakeActionPlan {
    actions: Vec<StakeAction>,
}

impl StakeActionPlan {
    pub fn new(actions: Vec<StakeAction>) -> Result<Self, PlanShapeError> {
        if actions.is_empty() {
            return Err(PlanShapeError::Empty);
        }

        let mut register_at = None;
        let mut deregister_at = None;
        let mut delegate_at = None;
        for (index, action) in actions.iter().enumerate() {
            let slot = match action {
                StakeAction::Register => &mut register_at,
                StakeAction::Deregister => &mut deregister_at,
                StakeAction::Delegate { .. } => &mut delegate_at,
            };
            if slot.replace(index).is_some() {
                return Err(PlanShapeError::DuplicateAction);
            }
        }

        if deregister_at.is_some() && delegate_at.is_some() {
            return Err(PlanShapeError::DeregisterWithDelegate);
        }
        if register_at.is_some() && deregister_at.is_some() {
            return Err(PlanShapeError::RegisterWithDeregister);
        }
        if let (Some(register), Some(delegate)) = (register_at, delegate_at) {
            if register > delegate {
                return Err(PlanShapeError::DelegateBeforeRegister);
            }
        }

        Ok(Self { actions })
    }

    pub fn actions(&self) -> &[StakeAction] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<StakeAction> {
        self.actions
    }

    /// Registration state after this plan lands, `None` when it leaves it alone.
    pub fn net_registration(&self) -> Option<bool> {
        self.actions.iter().fold(None, |acc, action| match action {
            StakeAction::Register => Some(true),
            StakeAction::Deregister => Some(false),
            StakeAction::Delegate { .. } => acc,
        })
    }

    pub fn delegated_pool(&self) -> Option<&PoolId> {
        self.actions.iter().find_map(|action| match action {
            StakeAction::Delegate { pool_id } => Some(pool_id),
            _ => None,
        })
    }
}

impl<'de> Deserialize<'de> for StakeActionPlan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawPlan {
            actions: Vec<StakeAction>,
        }

        let raw = RawPlan::deserialize(deserializer)?;
        StakeActionPlan::new(raw.actions).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Build,
    Sign,
    Submit,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Build => "build",
            Self::Sign => "sign",
            Self::Submit => "submit",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    UserRejected,
    Diagnostic(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRejected => f.write_str("user declined to sign the transaction"),
            Self::Diagnostic(message) => f.write_str(message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TransactionOutcome {
    Success {
        transaction_id: TransactionId,
    },
    Failure {
        stage: PipelineStage,
        reason: FailureReason,
    },
}

impl TransactionOutcome {
    pub fn failure(stage: PipelineStage, reason: impl Into<String>) -> Self {
        Self::Failure {
            stage,
            reason: FailureReason::Diagnostic(reason.into()),
        }
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            Self::Success { transaction_id } => Some(transaction_id),
            Self::Failure { .. } => None,
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(
            self,
            Self::Failure {
                reason: FailureReason::UserRejected,
                ..
            }
        )
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
