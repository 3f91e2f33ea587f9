use super::*;

fn pool() -> PoolId {
    PoolId::new("pool1abc")
}

fn status(is_registered: bool) -> StakeAccountStatus {
    StakeAccountStatus {
        reward_address: RewardAddress::new("stake_test1uq"),
        is_registered,
        delegated_pool: None,
        as_of: StatusVersion(1),
        fetched_at: Utc::now(),
        source: StatusSource::Chain,
    }
}

#[test]
fn plan_rejects_deregister_alongside_delegate() {
    let err = StakeActionPlan::new(vec![
        StakeAction::Deregister,
        StakeAction::Delegate { pool_id: pool() },
    ])
    .expect_err("must reject");
    assert_eq!(err, PlanShapeError::DeregisterWithDelegate);
}

#[test]
fn plan_requires_register_ahead_of_delegate() {
    let err = StakeActionPlan::new(vec![
        StakeAction::Delegate { pool_id: pool() },
        StakeAction::Register,
    ])
    .expect_err("must reject");
    assert_eq!(err, PlanShapeError::DelegateBeforeRegister);

    let plan = StakeActionPlan::new(vec![
        StakeAction::Register,
        StakeAction::Delegate { pool_id: pool() },
    ])
    .expect("valid plan");
    assert_eq!(plan.net_registration(), Some(true));
    assert_eq!(plan.delegated_pool(), Some(&pool()));
}

#[test]
fn plan_rejects_empty_and_duplicates() {
    assert_eq!(StakeActionPlan::new(Vec::new()), Err(PlanShapeError::Empty));
    assert_eq!(
        StakeActionPlan::new(vec![StakeAction::Register, StakeAction::Register]),
        Err(PlanShapeError::DuplicateAction)
    );
}

#[test]
fn delegate_only_plan_leaves_registration_alone() {
    let plan = StakeActionPlan::new(vec![StakeAction::Delegate { pool_id: pool() }])
        .expect("valid plan");
    assert_eq!(plan.net_registration(), None);

    let applied = status(true).with_plan_applied(&plan, StatusVersion(2), Utc::now());
    assert!(applied.is_registered);
    assert_eq!(applied.delegated_pool, Some(pool()));
    assert_eq!(applied.source, StatusSource::Optimistic);
    assert_eq!(applied.as_of, StatusVersion(2));
}

#[test]
fn deregister_plan_clears_delegation() {
    let mut registered = status(true);
    registered.delegated_pool = Some(pool());
    let plan = StakeActionPlan::new(vec![StakeAction::Deregister]).expect("valid plan");

    let applied = registered.with_plan_applied(&plan, StatusVersion(2), Utc::now());
    assert!(!applied.is_registered);
    assert_eq!(applied.delegated_pool, None);
}

#[test]
fn plan_wire_format_is_validated_on_decode() {
    let raw = r#"{"actions":[{"type":"deregister"},{"type":"delegate","payload":{"pool_id":"pool1abc"}}]}"#;
    assert!(serde_json::from_str::<StakeActionPlan>(raw).is_err());

    let raw = r#"{"actions":[{"type":"register"},{"type":"delegate","payload":{"pool_id":"pool1abc"}}]}"#;
    let plan: StakeActionPlan = serde_json::from_str(raw).expect("decode");
    assert_eq!(plan.actions().len(), 2);
}

#[test]
fn user_rejection_is_distinguished_from_signer_faults() {
    let rejected = TransactionOutcome::Failure {
        stage: PipelineStage::Sign,
        reason: FailureReason::UserRejected,
    };
    assert!(rejected.is_user_rejection());
    assert!(!TransactionOutcome::failure(PipelineStage::Sign, "device locked").is_user_rejection());
}
