use std::sync::Arc;

use shared::{
    domain::{FailureReason, PipelineStage, RewardAddress, StakeActionPlan, TransactionOutcome},
    protocol::BuildTransactionRequest,
};
use tracing::{info, warn};

use crate::{error::SignError, TransactionBuilder, TransactionSigner, TransactionSubmitter};

/// Runs build, sign and submit for one plan. Each stage only starts after the
/// previous one succeeded, and at most one submission happens per call.
pub struct TransactionPipeline {
    builder: Arc<dyn TransactionBuilder>,
}

impl TransactionPipeline {
    pub fn new(builder: Arc<dyn TransactionBuilder>) -> Self {
        Self { builder }
    }

    pub async fn execute<S, U>(
        &self,
        plan: &StakeActionPlan,
        signer: &S,
        submitter: &U,
        reward_address: &RewardAddress,
    ) -> TransactionOutcome
    where
        S: TransactionSigner + ?Sized,
        U: TransactionSubmitter + ?Sized,
    {
        let request = BuildTransactionRequest {
            reward_address: reward_address.clone(),
            actions: plan.actions().to_vec(),
        };

        let unsigned = match self.builder.build(&request).await {
            Ok(unsigned) => unsigned,
            Err(err) => {
                warn!(%reward_address, error = %err, "stake: transaction build failed");
                return TransactionOutcome::failure(PipelineStage::Build, err.to_string());
            }
        };

        let signed = match signer.sign_transaction(&unsigned).await {
            Ok(signed) => signed,
            Err(SignError::UserRejected) => {
                info!(%reward_address, "stake: user declined to sign");
                return TransactionOutcome::Failure {
                    stage: PipelineStage::Sign,
                    reason: FailureReason::UserRejected,
                };
            }
            Err(SignError::Signer(message)) => {
                warn!(%reward_address, error = %message, "stake: wallet signer failed");
                return TransactionOutcome::failure(PipelineStage::Sign, message);
            }
        };

        match submitter.submit_transaction(&signed).await {
            Ok(transaction_id) if transaction_id.as_str().is_empty() => {
                warn!(%reward_address, "stake: submitter returned an empty transaction id");
                TransactionOutcome::failure(
                    PipelineStage::Submit,
                    "wallet returned an empty transaction id",
                )
            }
            Ok(transaction_id) => {
                info!(
                    %reward_address,
                    %transaction_id,
                    actions = plan.actions().len(),
                    "stake: transaction submitted"
                );
                TransactionOutcome::Success { transaction_id }
            }
            Err(err) => {
                warn!(%reward_address, error = %err, "stake: transaction submission failed");
                TransactionOutcome::failure(PipelineStage::Submit, err.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
