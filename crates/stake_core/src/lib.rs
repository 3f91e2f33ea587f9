//! Stake session core: tracks a wallet's reward address registration, plans
//! the ledger actions for a requested stake operation and drives them through
//! build, sign and submit.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{RewardAddress, SignedTransaction, TransactionId, UnsignedTransaction, WalletInfo},
    protocol::{AccountInfo, BuildTransactionRequest},
};

pub mod blockfrost;
pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod pipeline;
pub mod planner;
pub mod resolver;

pub use blockfrost::{BlockfrostNetwork, BlockfrostProvider};
pub use builder::HttpTransactionBuilder;
pub use config::SessionConfig;
pub use controller::{
    OperationOutcome, SessionEvent, SessionPhase, SessionSnapshot, SettledOperation,
    StakeSessionController,
};
pub use error::{ControllerError, PlanningError, ResolutionError, SignError};
pub use pipeline::TransactionPipeline;
pub use planner::{plan_actions, StakePlanner};
pub use resolver::AccountStatusResolver;

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn list_available(&self) -> Result<Vec<WalletInfo>>;
    async fn enable(&self, wallet_name: &str) -> Result<Arc<dyn WalletHandle>>;
}

#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign_transaction(
        &self,
        unsigned: &UnsignedTransaction,
    ) -> std::result::Result<SignedTransaction, SignError>;
}

#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn submit_transaction(&self, signed: &SignedTransaction) -> Result<TransactionId>;
}

/// An enabled wallet: exposes its reward addresses and signs/submits on the user's behalf.
#[async_trait]
pub trait WalletHandle: TransactionSigner + TransactionSubmitter {
    async fn reward_addresses(&self) -> Result<Vec<RewardAddress>>;
}

#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn account_info(&self, reward_address: &RewardAddress) -> Result<AccountInfo>;
}

#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    async fn build(&self, request: &BuildTransactionRequest) -> Result<UnsignedTransaction>;
}

pub struct MissingWalletProvider;

#[async_trait]
impl WalletProvider for MissingWalletProvider {
    async fn list_available(&self) -> Result<Vec<WalletInfo>> {
        Ok(Vec::new())
    }

    async fn enable(&self, wallet_name: &str) -> Result<Arc<dyn WalletHandle>> {
        Err(anyhow!("no wallet provider available to enable {wallet_name}"))
    }
}

pub struct MissingChainDataProvider;

#[async_trait]
impl ChainDataProvider for MissingChainDataProvider {
    async fn account_info(&self, reward_address: &RewardAddress) -> Result<AccountInfo> {
        Err(anyhow!(
            "chain data provider is unavailable for {reward_address}"
        ))
    }
}

pub struct MissingTransactionBuilder;

#[async_trait]
impl TransactionBuilder for MissingTransactionBuilder {
    async fn build(&self, _request: &BuildTransactionRequest) -> Result<UnsignedTransaction> {
        Err(anyhow!("transaction builder is unavailable"))
    }
}
