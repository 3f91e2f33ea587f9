mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shared::{
    domain::{PoolId, RewardAddress, StakeAccountStatus, StakeAction, StakeOperationRequest},
    protocol::BuildTransactionRequest,
};
use stake_core::{AccountStatusResolver, StakePlanner, TransactionBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Settings file; `stake.toml` in the working directory is read when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    blockfrost_project_id: Option<String>,
    #[arg(long)]
    blockfrost_url: Option<String>,
    #[arg(long)]
    builder_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the on-chain registration status of a reward address.
    Status {
        #[arg(long)]
        reward_address: String,
    },
    /// Show the ledger actions a stake operation would need right now.
    Plan {
        #[arg(long)]
        reward_address: String,
        #[arg(long, value_enum)]
        operation: Operation,
        /// Defaults to the configured pool.
        #[arg(long)]
        pool_id: Option<String>,
        /// Also ask the transaction builder for the unsigned transaction.
        #[arg(long)]
        build: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Operation {
    Register,
    Deregister,
    Delegate,
}

#[derive(Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
enum PlanReport {
    Planned {
        status: StakeAccountStatus,
        actions: Vec<StakeAction>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unsigned_tx_cbor_hex: Option<String>,
    },
    NotPlanned {
        status: StakeAccountStatus,
        error: String,
    },
}

fn operation_request(
    operation: Operation,
    pool_id: Option<String>,
    default_pool_id: &PoolId,
) -> StakeOperationRequest {
    match operation {
        Operation::Register => StakeOperationRequest::RegisterStake,
        Operation::Deregister => StakeOperationRequest::DeregisterStake,
        Operation::Delegate => StakeOperationRequest::DelegateStake {
            pool_id: pool_id
                .map(PoolId::new)
                .unwrap_or_else(|| default_pool_id.clone()),
        },
    }
}

fn plan_report(
    planner: &StakePlanner,
    request: &StakeOperationRequest,
    status: StakeAccountStatus,
    now: DateTime<Utc>,
) -> PlanReport {
    match planner.plan(request, Some(&status), now) {
        Ok(plan) => PlanReport::Planned {
            status,
            actions: plan.into_actions(),
            unsigned_tx_cbor_hex: None,
        },
        Err(err) => PlanReport::NotPlanned {
            status,
            error: err.to_string(),
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut settings = config::load_settings(cli.config.as_deref())?;
    if let Some(v) = cli.blockfrost_project_id {
        settings.blockfrost_project_id = Some(v);
    }
    if let Some(v) = cli.blockfrost_url {
        settings.blockfrost_url = Some(v);
    }
    if let Some(v) = cli.builder_url {
        settings.builder_url = Some(v);
    }

    let resolver = AccountStatusResolver::new(Arc::new(settings.chain_provider()?));

    match cli.command {
        Command::Status { reward_address } => {
            let status = resolver.resolve(&RewardAddress::new(reward_address)).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Plan {
            reward_address,
            operation,
            pool_id,
            build,
        } => {
            let session = settings.session_config();
            let request = operation_request(operation, pool_id, &session.default_pool_id);
            let reward_address = RewardAddress::new(reward_address);
            let status = resolver.resolve(&reward_address).await?;
            let planner = StakePlanner::from_config(&session);

            let mut report = plan_report(&planner, &request, status, Utc::now());
            if let PlanReport::Planned {
                actions,
                unsigned_tx_cbor_hex,
                ..
            } = &mut report
            {
                if build {
                    let builder = settings.transaction_builder()?;
                    let unsigned = builder
                        .build(&BuildTransactionRequest {
                            reward_address: reward_address.clone(),
                            actions: actions.clone(),
                        })
                        .await?;
                    info!(%reward_address, "stake: built unsigned transaction");
                    *unsigned_tx_cbor_hex = Some(unsigned.as_str().to_string());
                }
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
