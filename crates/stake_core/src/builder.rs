use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::UnsignedTransaction,
    protocol::{BuildTransactionRequest, BuildTransactionResponse},
};
use url::Url;

use crate::TransactionBuilder;

/// Delegates transaction construction to a builder service over HTTP.
pub struct HttpTransactionBuilder {
    http: Client,
    builder_url: String,
}

impl HttpTransactionBuilder {
    pub fn new(builder_url: &str) -> Result<Self> {
        let parsed = Url::parse(builder_url)
            .with_context(|| format!("invalid transaction builder url '{builder_url}'"))?;
        Ok(Self {
            http: Client::new(),
            builder_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TransactionBuilder for HttpTransactionBuilder {
    async fn build(&self, request: &BuildTransactionRequest) -> Result<UnsignedTransaction> {
        let response: BuildTransactionResponse = self
            .http
            .post(format!("{}/build", self.builder_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.unsigned_tx_cbor_hex.is_empty() {
            return Err(anyhow!("transaction builder returned an empty transaction"));
        }
        Ok(UnsignedTransaction(response.unsigned_tx_cbor_hex))
    }
}

#[cfg(test)]
#[path = "tests/builder_tests.rs"]
mod tests;
