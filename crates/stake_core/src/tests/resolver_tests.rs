use super::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{domain::PoolId, protocol::AccountInfo};

struct FixedChain {
    answer: std::result::Result<AccountInfo, String>,
}

#[async_trait]
impl ChainDataProvider for FixedChain {
    async fn account_info(&self, _reward_address: &RewardAddress) -> Result<AccountInfo> {
        self.answer.clone().map_err(|err| anyhow!(err))
    }
}

fn account(address: &str, active: bool, pool: Option<&str>) -> AccountInfo {
    let mut info = AccountInfo::unseen(RewardAddress::new(address));
    info.active = active;
    info.pool_id = pool.map(PoolId::new);
    info
}

#[tokio::test]
async fn maps_active_flag_to_registration() {
    let address = RewardAddress::new("stake_test1uqactive");
    let resolver = AccountStatusResolver::new(Arc::new(FixedChain {
        answer: Ok(account("stake_test1uqactive", true, Some("pool1abc"))),
    }));

    let status = resolver.resolve(&address).await.expect("status");
    assert!(status.is_registered);
    assert_eq!(status.delegated_pool, Some(PoolId::new("pool1abc")));
    assert_eq!(status.source, StatusSource::Chain);
}

#[tokio::test]
async fn inactive_account_reports_no_delegation() {
    let address = RewardAddress::new("stake_test1uqidle");
    let resolver = AccountStatusResolver::new(Arc::new(FixedChain {
        answer: Ok(account("stake_test1uqidle", false, Some("pool1old"))),
    }));

    let status = resolver.resolve(&address).await.expect("status");
    assert!(!status.is_registered);
    assert_eq!(status.delegated_pool, None);
}

#[tokio::test]
async fn every_resolution_gets_a_newer_version() {
    let address = RewardAddress::new("stake_test1uqactive");
    let resolver = AccountStatusResolver::new(Arc::new(FixedChain {
        answer: Ok(account("stake_test1uqactive", true, None)),
    }));

    let first = resolver.resolve(&address).await.expect("first");
    let reserved = resolver.next_version();
    let second = resolver.resolve(&address).await.expect("second");
    assert!(first.as_of < reserved);
    assert!(reserved < second.as_of);
}

#[tokio::test]
async fn provider_failure_becomes_resolution_error() {
    let address = RewardAddress::new("stake_test1uqdown");
    let resolver = AccountStatusResolver::new(Arc::new(FixedChain {
        answer: Err("connection refused".to_string()),
    }));

    let err = resolver.resolve(&address).await.expect_err("must fail");
    assert!(matches!(err, ResolutionError::Provider { .. }));
    assert!(err.to_string().contains("connection refused"));
}

#[tokio::test]
async fn answer_for_another_address_is_rejected() {
    let address = RewardAddress::new("stake_test1uqmine");
    let resolver = AccountStatusResolver::new(Arc::new(FixedChain {
        answer: Ok(account("stake_test1uqother", true, None)),
    }));

    let err = resolver.resolve(&address).await.expect_err("must fail");
    assert!(matches!(err, ResolutionError::AddressMismatch { .. }));
}
