use shared::{
    domain::{RewardAddress, WalletName},
    error::PlanShapeError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("account lookup failed for {reward_address}: {source}")]
    Provider {
        reward_address: RewardAddress,
        source: anyhow::Error,
    },
    #[error("chain data provider answered for {returned} when asked about {requested}")]
    AddressMismatch {
        requested: RewardAddress,
        returned: RewardAddress,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error("Stake address is already registered")]
    AlreadyRegistered,
    #[error("Stake address is not registered")]
    NotRegistered,
    #[error("Stake address status is unknown; refresh and retry")]
    StatusUnknown,
    #[error("Stake pool id must not be empty")]
    EmptyPoolId,
    #[error("invalid stake plan: {0}")]
    InvalidShape(#[from] PlanShapeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignError {
    #[error("user declined to sign the transaction")]
    UserRejected,
    #[error("wallet signer failed: {0}")]
    Signer(String),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Connect your wallet first")]
    NotConnected,
    #[error("a stake operation is already in flight for this session")]
    OperationInFlight,
    #[error("failed to list available wallets: {0}")]
    WalletDiscovery(anyhow::Error),
    #[error("failed to enable wallet {wallet_name}: {source}")]
    WalletEnable {
        wallet_name: WalletName,
        source: anyhow::Error,
    },
    #[error("wallet {wallet_name} did not expose a reward address")]
    NoRewardAddress { wallet_name: WalletName },
    #[error("wallet session changed while connecting {wallet_name}")]
    SessionReplaced { wallet_name: WalletName },
    #[error("status lookup for {reward_address} was superseded by a newer one")]
    StatusSuperseded { reward_address: RewardAddress },
    #[error("stake operation task failed: {0}")]
    OperationTask(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
