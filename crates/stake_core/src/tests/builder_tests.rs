use super::*;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use shared::domain::{PoolId, RewardAddress, StakeAction};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Clone)]
struct BuilderState {
    tx: Arc<Mutex<Option<oneshot::Sender<BuildTransactionRequest>>>>,
    cbor_hex: &'static str,
}

async fn handle_build(
    State(state): State<BuilderState>,
    Json(request): Json<BuildTransactionRequest>,
) -> Result<Json<BuildTransactionResponse>, StatusCode> {
    if request.actions.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(request);
    }
    Ok(Json(BuildTransactionResponse {
        unsigned_tx_cbor_hex: state.cbor_hex.to_string(),
    }))
}

async fn spawn_builder_server(
    cbor_hex: &'static str,
) -> anyhow::Result<(String, oneshot::Receiver<BuildTransactionRequest>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (tx, rx) = oneshot::channel();
    let state = BuilderState {
        tx: Arc::new(Mutex::new(Some(tx))),
        cbor_hex,
    };
    let app = Router::new()
        .route("/build", post(handle_build))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/"), rx))
}

fn request(actions: Vec<StakeAction>) -> BuildTransactionRequest {
    BuildTransactionRequest {
        reward_address: RewardAddress::new("stake_test1uqbuilder"),
        actions,
    }
}

#[tokio::test]
async fn posts_ordered_actions_and_returns_unsigned_payload() {
    let (builder_url, request_rx) = spawn_builder_server("84a500deadbeef")
        .await
        .expect("spawn server");
    let builder = HttpTransactionBuilder::new(&builder_url).expect("builder");

    let unsigned = builder
        .build(&request(vec![
            StakeAction::Register,
            StakeAction::Delegate {
                pool_id: PoolId::new("pool1abc"),
            },
        ]))
        .await
        .expect("build");
    assert_eq!(unsigned, UnsignedTransaction::new("84a500deadbeef"));

    let received = request_rx.await.expect("request");
    assert_eq!(received.reward_address, RewardAddress::new("stake_test1uqbuilder"));
    assert_eq!(received.actions.len(), 2);
    assert_eq!(received.actions[0], StakeAction::Register);
}

#[tokio::test]
async fn rejected_build_surfaces_status() {
    let (builder_url, _request_rx) = spawn_builder_server("84a500deadbeef")
        .await
        .expect("spawn server");
    let builder = HttpTransactionBuilder::new(&builder_url).expect("builder");

    let err = builder
        .build(&request(Vec::new()))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("422"), "unexpected error: {err}");
}

#[tokio::test]
async fn empty_payload_is_an_error() {
    let (builder_url, _request_rx) = spawn_builder_server("").await.expect("spawn server");
    let builder = HttpTransactionBuilder::new(&builder_url).expect("builder");

    let err = builder
        .build(&request(vec![StakeAction::Register]))
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("empty transaction"));
}

#[test]
fn invalid_url_is_rejected() {
    assert!(HttpTransactionBuilder::new("not a url").is_err());
}
