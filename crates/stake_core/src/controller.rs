//! Session state machine for one connected wallet.
//!
//! Phases: `Disconnected -> Connecting -> Connected -> OperationInFlight ->
//! OperationSettled -> Connected`. The controller is the only writer of the
//! session; collaborators are awaited with the state lock released.

use std::sync::Arc;

use chrono::Utc;
use shared::domain::{
    PoolId, RewardAddress, StakeAccountStatus, StakeActionPlan, StakeOperationKind,
    StakeOperationRequest, TransactionId, TransactionOutcome, WalletInfo, WalletName,
    WalletSession,
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::SessionConfig,
    error::{ControllerError, PlanningError, ResolutionError},
    pipeline::TransactionPipeline,
    planner::StakePlanner,
    resolver::AccountStatusResolver,
    ChainDataProvider, TransactionBuilder, WalletHandle, WalletProvider,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    Connecting { wallet_name: WalletName },
    Connected,
    OperationInFlight { request: StakeOperationRequest },
    OperationSettled { outcome: OperationOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Executed {
        plan: StakeActionPlan,
        outcome: TransactionOutcome,
    },
    NotPlanned(PlanningError),
}

impl OperationOutcome {
    pub fn transaction_id(&self) -> Option<&TransactionId> {
        match self {
            Self::Executed { outcome, .. } => outcome.transaction_id(),
            Self::NotPlanned(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.transaction_id().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledOperation {
    pub request: StakeOperationRequest,
    pub outcome: OperationOutcome,
}

impl SettledOperation {
    /// One-line summary suitable for showing to the user.
    pub fn message(&self) -> String {
        let kind = self.request.kind();
        match &self.outcome {
            OperationOutcome::Executed {
                outcome: TransactionOutcome::Success { .. },
                ..
            } => success_message(kind).to_string(),
            OperationOutcome::Executed {
                outcome: TransactionOutcome::Failure { stage, reason },
                ..
            } => format!("{}: {stage} failed: {reason}", error_prefix(kind)),
            OperationOutcome::NotPlanned(err) => format!("{}: {err}", error_prefix(kind)),
        }
    }
}

fn success_message(kind: StakeOperationKind) -> &'static str {
    match kind {
        StakeOperationKind::Register => "Registered stake address successfully",
        StakeOperationKind::Deregister => "De-registered stake address successfully",
        StakeOperationKind::Delegate => "Staked to pool successfully",
    }
}

fn error_prefix(kind: StakeOperationKind) -> &'static str {
    match kind {
        StakeOperationKind::Register => "Error registering stake address",
        StakeOperationKind::Deregister => "Error de-registering stake address",
        StakeOperationKind::Delegate => "Error staking to pool",
    }
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub wallet: Option<WalletSession>,
    pub status: Option<StakeAccountStatus>,
    pub last_operation: Option<SettledOperation>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    WalletConnected(WalletSession),
    ConnectionFailed {
        wallet_name: WalletName,
        reason: String,
    },
    StatusResolved(StakeAccountStatus),
    StatusResolutionFailed {
        reward_address: RewardAddress,
        reason: String,
    },
    OperationSettled(SettledOperation),
    Delegated {
        pool_id: PoolId,
        transaction_id: TransactionId,
    },
    Disconnected,
}

#[derive(Debug, Clone, Copy)]
struct ResolutionTicket {
    generation: u64,
    sequence: u64,
}

struct SessionState {
    /// Bumped whenever the wallet session is replaced or dropped.
    generation: u64,
    phase: SessionPhase,
    wallet: Option<WalletSession>,
    handle: Option<Arc<dyn WalletHandle>>,
    status: Option<StakeAccountStatus>,
    last_operation: Option<SettledOperation>,
    issued_tickets: u64,
    applied_ticket: u64,
    /// Lookups issued before the latest optimistic update are ignored.
    reconcile_floor: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            generation: 0,
            phase: SessionPhase::Disconnected,
            wallet: None,
            handle: None,
            status: None,
            last_operation: None,
            issued_tickets: 0,
            applied_ticket: 0,
            reconcile_floor: 0,
        }
    }

    fn reset(&mut self, phase: SessionPhase) {
        self.generation += 1;
        self.phase = phase;
        self.wallet = None;
        self.handle = None;
        self.status = None;
        self.last_operation = None;
    }

    fn issue_ticket(&mut self) -> ResolutionTicket {
        self.issued_tickets += 1;
        ResolutionTicket {
            generation: self.generation,
            sequence: self.issued_tickets,
        }
    }

    fn accepts(&self, ticket: ResolutionTicket) -> bool {
        ticket.generation == self.generation
            && ticket.sequence >= self.reconcile_floor
            && ticket.sequence > self.applied_ticket
    }

    fn connected_address(&self) -> Option<RewardAddress> {
        match self.phase {
            SessionPhase::Disconnected | SessionPhase::Connecting { .. } => None,
            _ => self
                .wallet
                .as_ref()
                .and_then(|wallet| wallet.reward_address.clone()),
        }
    }

    fn leave_settled(&mut self) {
        if matches!(self.phase, SessionPhase::OperationSettled { .. }) {
            self.phase = SessionPhase::Connected;
        }
    }
}

pub struct StakeSessionController {
    wallets: Arc<dyn WalletProvider>,
    resolver: AccountStatusResolver,
    planner: StakePlanner,
    pipeline: TransactionPipeline,
    config: SessionConfig,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl StakeSessionController {
    pub fn new(
        wallets: Arc<dyn WalletProvider>,
        chain: Arc<dyn ChainDataProvider>,
        builder: Arc<dyn TransactionBuilder>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            wallets,
            resolver: AccountStatusResolver::new(chain),
            planner: StakePlanner::from_config(&config),
            pipeline: TransactionPipeline::new(builder),
            config,
            inner: Mutex::new(SessionState::new()),
            events,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            phase: guard.phase.clone(),
            wallet: guard.wallet.clone(),
            status: guard.status.clone(),
            last_operation: guard.last_operation.clone(),
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.phase.clone()
    }

    pub async fn status(&self) -> Option<StakeAccountStatus> {
        self.inner.lock().await.status.clone()
    }

    pub async fn list_available_wallets(&self) -> Result<Vec<WalletInfo>, ControllerError> {
        self.wallets
            .list_available()
            .await
            .map_err(ControllerError::WalletDiscovery)
    }

    /// Enables `wallet_name`, replacing any current session, and starts a
    /// background status lookup for its first reward address.
    pub async fn select_wallet(
        self: &Arc<Self>,
        wallet_name: WalletName,
    ) -> Result<WalletSession, ControllerError> {
        let generation = {
            let mut guard = self.inner.lock().await;
            guard.reset(SessionPhase::Connecting {
                wallet_name: wallet_name.clone(),
            });
            guard.wallet = Some(WalletSession {
                wallet_name: wallet_name.clone(),
                reward_address: None,
            });
            guard.generation
        };
        info!(%wallet_name, "stake: enabling wallet");

        let (handle, reward_address) = match self.enable_wallet(&wallet_name).await {
            Ok(enabled) => enabled,
            Err(err) => {
                {
                    let mut guard = self.inner.lock().await;
                    if guard.generation == generation {
                        guard.reset(SessionPhase::Disconnected);
                    }
                }
                warn!(%wallet_name, error = %err, "stake: wallet enabling failed");
                let _ = self.events.send(SessionEvent::ConnectionFailed {
                    wallet_name,
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        let (session, ticket) = {
            let mut guard = self.inner.lock().await;
            if guard.generation != generation {
                return Err(ControllerError::SessionReplaced { wallet_name });
            }
            let session = WalletSession {
                wallet_name,
                reward_address: Some(reward_address.clone()),
            };
            guard.wallet = Some(session.clone());
            guard.handle = Some(handle);
            guard.phase = SessionPhase::Connected;
            (session, guard.issue_ticket())
        };

        info!(
            wallet_name = %session.wallet_name,
            %reward_address,
            "stake: wallet connected"
        );
        let _ = self.events.send(SessionEvent::WalletConnected(session.clone()));
        self.spawn_status_resolution(ticket, reward_address);
        Ok(session)
    }

    pub async fn disconnect(&self) {
        {
            let mut guard = self.inner.lock().await;
            guard.reset(SessionPhase::Disconnected);
        }
        info!("stake: wallet disconnected");
        let _ = self.events.send(SessionEvent::Disconnected);
    }

    /// Re-reads the registration status now and folds it into the session.
    ///
    /// Returns the status the session holds afterwards. When a newer update
    /// (an optimistic one, say) already superseded this lookup, that newer
    /// status is returned instead of the lookup's own result.
    pub async fn refresh_status(&self) -> Result<StakeAccountStatus, ControllerError> {
        let (ticket, reward_address) = {
            let mut guard = self.inner.lock().await;
            let reward_address = guard
                .connected_address()
                .ok_or(ControllerError::NotConnected)?;
            (guard.issue_ticket(), reward_address)
        };

        let result = self.resolver.resolve(&reward_address).await;
        let applied = self.apply_resolution(ticket, &reward_address, &result).await;
        let status = result?;
        if applied {
            return Ok(status);
        }

        let current = {
            let guard = self.inner.lock().await;
            guard
                .status
                .clone()
                .filter(|_| guard.generation == ticket.generation)
        };
        match current {
            Some(current) if current.reward_address == reward_address => Ok(current),
            _ => Err(ControllerError::StatusSuperseded { reward_address }),
        }
    }

    pub async fn register_stake(self: &Arc<Self>) -> Result<OperationOutcome, ControllerError> {
        self.request_operation(StakeOperationRequest::RegisterStake).await
    }

    pub async fn deregister_stake(self: &Arc<Self>) -> Result<OperationOutcome, ControllerError> {
        self.request_operation(StakeOperationRequest::DeregisterStake).await
    }

    pub async fn delegate_stake(
        self: &Arc<Self>,
        pool_id: PoolId,
    ) -> Result<OperationOutcome, ControllerError> {
        self.request_operation(StakeOperationRequest::DelegateStake { pool_id }).await
    }

    pub async fn delegate_to_default_pool(
        self: &Arc<Self>,
    ) -> Result<OperationOutcome, ControllerError> {
        self.delegate_stake(self.config.default_pool_id.clone()).await
    }

    /// Plans and executes one stake operation.
    ///
    /// Guard failures (`NotConnected`, `OperationInFlight`) are returned as
    /// errors without touching the planner or the pipeline; every other
    /// result is an `OperationOutcome` that has been folded into the session.
    ///
    /// The work runs on its own task: dropping this future (for example when
    /// racing it against a timeout) does not abandon the operation, and its
    /// outcome is still settled into the session.
    pub async fn request_operation(
        self: &Arc<Self>,
        request: StakeOperationRequest,
    ) -> Result<OperationOutcome, ControllerError> {
        let (generation, handle, reward_address, status) = {
            let mut guard = self.inner.lock().await;
            match &guard.phase {
                SessionPhase::OperationInFlight { request: active } => {
                    info!(
                        requested = ?request.kind(),
                        active = ?active.kind(),
                        "stake: rejecting operation while another is in flight"
                    );
                    return Err(ControllerError::OperationInFlight);
                }
                SessionPhase::Disconnected | SessionPhase::Connecting { .. } => {
                    return Err(ControllerError::NotConnected);
                }
                SessionPhase::Connected | SessionPhase::OperationSettled { .. } => {}
            }
            let (Some(handle), Some(reward_address)) =
                (guard.handle.clone(), guard.connected_address())
            else {
                return Err(ControllerError::NotConnected);
            };
            let status = guard
                .status
                .clone()
                .filter(|status| status.reward_address == reward_address);
            guard.phase = SessionPhase::OperationInFlight {
                request: request.clone(),
            };
            (guard.generation, handle, reward_address, status)
        };

        let controller = Arc::clone(self);
        let task = tokio::spawn(async move {
            controller
                .run_operation(generation, request, handle, reward_address, status)
                .await
        });

        match task.await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(error = %err, "stake: operation task failed");
                let mut guard = self.inner.lock().await;
                if guard.generation == generation
                    && matches!(guard.phase, SessionPhase::OperationInFlight { .. })
                {
                    guard.phase = SessionPhase::Connected;
                }
                Err(ControllerError::OperationTask(err))
            }
        }
    }

    async fn run_operation(
        self: Arc<Self>,
        generation: u64,
        request: StakeOperationRequest,
        handle: Arc<dyn WalletHandle>,
        reward_address: RewardAddress,
        status: Option<StakeAccountStatus>,
    ) -> OperationOutcome {
        let plan = match self.planner.plan(&request, status.as_ref(), Utc::now()) {
            Ok(plan) => plan,
            Err(err) => {
                info!(
                    %reward_address,
                    requested = ?request.kind(),
                    error = %err,
                    "stake: operation not planned"
                );
                let outcome = OperationOutcome::NotPlanned(err.clone());
                let refresh = {
                    let mut guard = self.inner.lock().await;
                    if guard.generation != generation {
                        return outcome;
                    }
                    guard.phase = SessionPhase::OperationSettled {
                        outcome: outcome.clone(),
                    };
                    guard.last_operation = Some(SettledOperation {
                        request: request.clone(),
                        outcome: outcome.clone(),
                    });
                    (err == PlanningError::StatusUnknown).then(|| guard.issue_ticket())
                };
                let _ = self.events.send(SessionEvent::OperationSettled(SettledOperation {
                    request,
                    outcome: outcome.clone(),
                }));
                if let Some(ticket) = refresh {
                    self.spawn_status_resolution(ticket, reward_address);
                }
                return outcome;
            }
        };

        info!(
            %reward_address,
            requested = ?request.kind(),
            actions = plan.actions().len(),
            "stake: executing plan"
        );
        let result = self
            .pipeline
            .execute(&plan, &*handle, &*handle, &reward_address)
            .await;

        let outcome = OperationOutcome::Executed {
            plan: plan.clone(),
            outcome: result.clone(),
        };
        let reconcile = {
            let mut guard = self.inner.lock().await;
            if guard.generation != generation {
                info!(
                    %reward_address,
                    "stake: session changed while operation was in flight; outcome not applied"
                );
                return outcome;
            }

            let mut reconcile = None;
            if result.transaction_id().is_some() {
                if let Some(current) = guard.status.clone().or(status) {
                    let optimistic =
                        current.with_plan_applied(&plan, self.resolver.next_version(), Utc::now());
                    debug!(
                        %reward_address,
                        is_registered = optimistic.is_registered,
                        "stake: applied optimistic status"
                    );
                    guard.status = Some(optimistic);
                }
                guard.reconcile_floor = guard.issued_tickets + 1;
                reconcile = Some(guard.issue_ticket());
            }
            guard.phase = SessionPhase::OperationSettled {
                outcome: outcome.clone(),
            };
            guard.last_operation = Some(SettledOperation {
                request: request.clone(),
                outcome: outcome.clone(),
            });
            reconcile
        };

        let _ = self.events.send(SessionEvent::OperationSettled(SettledOperation {
            request,
            outcome: outcome.clone(),
        }));
        if let (Some(pool_id), Some(transaction_id)) =
            (plan.delegated_pool(), result.transaction_id())
        {
            let _ = self.events.send(SessionEvent::Delegated {
                pool_id: pool_id.clone(),
                transaction_id: transaction_id.clone(),
            });
        }
        if let Some(ticket) = reconcile {
            self.spawn_status_resolution(ticket, reward_address);
        }

        outcome
    }

    async fn enable_wallet(
        &self,
        wallet_name: &WalletName,
    ) -> Result<(Arc<dyn WalletHandle>, RewardAddress), ControllerError> {
        let handle = self
            .wallets
            .enable(wallet_name.as_str())
            .await
            .map_err(|source| ControllerError::WalletEnable {
                wallet_name: wallet_name.clone(),
                source,
            })?;
        let addresses = handle
            .reward_addresses()
            .await
            .map_err(|source| ControllerError::WalletEnable {
                wallet_name: wallet_name.clone(),
                source,
            })?;
        let reward_address =
            addresses
                .into_iter()
                .next()
                .ok_or_else(|| ControllerError::NoRewardAddress {
                    wallet_name: wallet_name.clone(),
                })?;
        Ok((handle, reward_address))
    }

    fn spawn_status_resolution(
        self: &Arc<Self>,
        ticket: ResolutionTicket,
        reward_address: RewardAddress,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let result = controller.resolver.resolve(&reward_address).await;
            controller
                .apply_resolution(ticket, &reward_address, &result)
                .await;
        })
    }

    async fn apply_resolution(
        &self,
        ticket: ResolutionTicket,
        reward_address: &RewardAddress,
        result: &Result<StakeAccountStatus, ResolutionError>,
    ) -> bool {
        let event = {
            let mut guard = self.inner.lock().await;
            if !guard.accepts(ticket) {
                debug!(
                    %reward_address,
                    sequence = ticket.sequence,
                    "stake: discarding superseded status lookup"
                );
                return false;
            }
            guard.leave_settled();
            match result {
                Ok(status) => {
                    if let Some(previous) = guard.status.as_ref() {
                        if previous.is_registered != status.is_registered {
                            info!(
                                %reward_address,
                                previous = previous.is_registered,
                                resolved = status.is_registered,
                                "stake: chain status overrides cached status"
                            );
                        }
                    }
                    guard.applied_ticket = ticket.sequence;
                    guard.status = Some(status.clone());
                    SessionEvent::StatusResolved(status.clone())
                }
                Err(err) => SessionEvent::StatusResolutionFailed {
                    reward_address: reward_address.clone(),
                    reason: err.to_string(),
                },
            }
        };
        let _ = self.events.send(event);
        true
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
