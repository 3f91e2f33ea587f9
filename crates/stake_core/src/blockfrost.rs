use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::RewardAddress,
    error::{ProviderErrorBody, ProviderException},
    protocol::AccountInfo,
};
use url::Url;

use crate::ChainDataProvider;

const PROJECT_ID_HEADER: &str = "project_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockfrostNetwork {
    Mainnet,
    Preprod,
    Preview,
}

impl BlockfrostNetwork {
    /// Project ids carry their network as a prefix, e.g. `preprodAbC…`.
    pub fn from_project_id(project_id: &str) -> Option<Self> {
        if project_id.starts_with("mainnet") {
            Some(Self::Mainnet)
        } else if project_id.starts_with("preprod") {
            Some(Self::Preprod)
        } else if project_id.starts_with("preview") {
            Some(Self::Preview)
        } else {
            None
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://cardano-mainnet.blockfrost.io/api/v0",
            Self::Preprod => "https://cardano-preprod.blockfrost.io/api/v0",
            Self::Preview => "https://cardano-preview.blockfrost.io/api/v0",
        }
    }
}

pub struct BlockfrostProvider {
    http: Client,
    base_url: String,
    project_id: String,
}

impl BlockfrostProvider {
    pub fn new(project_id: impl Into<String>) -> Result<Self> {
        let project_id = project_id.into();
        let network = BlockfrostNetwork::from_project_id(&project_id)
            .ok_or_else(|| anyhow!("cannot infer Cardano network from blockfrost project id"))?;
        Self::with_base_url(project_id, network.base_url())
    }

    pub fn with_base_url(project_id: impl Into<String>, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("invalid blockfrost base url '{base_url}'"))?;
        Ok(Self {
            http: Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChainDataProvider for BlockfrostProvider {
    async fn account_info(&self, reward_address: &RewardAddress) -> Result<AccountInfo> {
        let response = self
            .http
            .get(format!("{}/accounts/{}", self.base_url, reward_address))
            .header(PROJECT_ID_HEADER, &self.project_id)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            // Never seen on chain, so it cannot be registered.
            return Ok(AccountInfo::unseen(reward_address.clone()));
        }
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let exception = match response.json::<ProviderErrorBody>().await {
            Ok(body) => ProviderException::from(body),
            Err(_) => ProviderException::new(status.as_u16(), "unexpected chain data response"),
        };
        Err(exception.into())
    }
}

#[cfg(test)]
#[path = "tests/blockfrost_tests.rs"]
mod tests;
