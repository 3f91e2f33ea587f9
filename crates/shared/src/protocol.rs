use serde::{Deserialize, Serialize};

use crate::domain::{PoolId, RewardAddress, StakeAction};

/// Account record served by the chain-data service for a reward address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub stake_address: RewardAddress,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_epoch: Option<u64>,
    #[serde(default)]
    pub controlled_amount: String,
    #[serde(default)]
    pub rewards_sum: String,
    #[serde(default)]
    pub withdrawals_sum: String,
    #[serde(default)]
    pub withdrawable_amount: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<PoolId>,
}

impl AccountInfo {
    /// Record for an address the chain has never seen.
    pub fn unseen(stake_address: RewardAddress) -> Self {
        Self {
            stake_address,
            active: false,
            active_epoch: None,
            controlled_amount: "0".to_string(),
            rewards_sum: "0".to_string(),
            withdrawals_sum: "0".to_string(),
            withdrawable_amount: "0".to_string(),
            pool_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTransactionRequest {
    pub reward_address: RewardAddress,
    pub actions: Vec<StakeAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildTransactionResponse {
    pub unsigned_tx_cbor_hex: String,
}
