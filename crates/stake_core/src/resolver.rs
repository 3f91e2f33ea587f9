use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::Utc;
use shared::domain::{RewardAddress, StakeAccountStatus, StatusSource, StatusVersion};
use tracing::{debug, warn};

use crate::{error::ResolutionError, ChainDataProvider};

/// Answers "is this reward address registered" from the chain-data provider.
pub struct AccountStatusResolver {
    provider: Arc<dyn ChainDataProvider>,
    versions: AtomicU64,
}

impl AccountStatusResolver {
    pub fn new(provider: Arc<dyn ChainDataProvider>) -> Self {
        Self {
            provider,
            versions: AtomicU64::new(0),
        }
    }

    /// Hands out the next status version; shared with optimistic updates so
    /// every snapshot of a session is totally ordered.
    pub fn next_version(&self) -> StatusVersion {
        StatusVersion(self.versions.fetch_add(1, Ordering::Relaxed) + 1)
    }

    pub async fn resolve(
        &self,
        reward_address: &RewardAddress,
    ) -> Result<StakeAccountStatus, ResolutionError> {
        let info = self
            .provider
            .account_info(reward_address)
            .await
            .map_err(|source| {
                warn!(%reward_address, error = %source, "stake: account lookup failed");
                ResolutionError::Provider {
                    reward_address: reward_address.clone(),
                    source,
                }
            })?;

        if &info.stake_address != reward_address {
            return Err(ResolutionError::AddressMismatch {
                requested: reward_address.clone(),
                returned: info.stake_address,
            });
        }

        let status = StakeAccountStatus {
            reward_address: info.stake_address,
            is_registered: info.active,
            delegated_pool: info.pool_id.filter(|_| info.active),
            as_of: self.next_version(),
            fetched_at: Utc::now(),
            source: StatusSource::Chain,
        };
        debug!(
            %reward_address,
            is_registered = status.is_registered,
            as_of = status.as_of.0,
            "stake: account status resolved"
        );
        Ok(status)
    }
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
