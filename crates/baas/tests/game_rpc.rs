//! Integration tests for the typed game RPC wrappers.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use gemrush_baas::{BaasClient, BaasError};
use gemrush_core::boost::BoostKind;
use serde_json::json;

use common::spawn_fake_backend;

#[tokio::test]
async fn rpcs_use_session_bearer() {
    let fake = spawn_fake_backend().await;
    let client = BaasClient::new(&fake.base_url, "anon-key").with_bearer("player-jwt");

    client.start_mining().await.unwrap();

    let seen = fake.seen();
    assert_eq!(seen[0].path, "/rest/v1/rpc/start_mining");
    assert_eq!(seen[0].apikey.as_deref(), Some("anon-key"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer player-jwt"));
}

#[tokio::test]
async fn mining_status_takes_first_row() {
    let fake = spawn_fake_backend().await;
    fake.set_rpc_result(
        "get_mining_status",
        json!([{
            "is_mining": true,
            "time_remaining": "05:00:00",
            "current_rate": 0.2,
            "balance": "12.5",
            "total_referrals": 2
        }]),
    );
    let client = BaasClient::new(&fake.base_url, "anon-key");

    let status = client.get_mining_status().await.unwrap().unwrap();
    assert!(status.is_mining);
    assert_eq!(status.time_remaining, Some(5 * 3600));
    assert_eq!(status.current_rate, Some(0.2));
    assert_eq!(status.total_referrals, 2);
}

#[tokio::test]
async fn mining_status_accepts_single_object_and_empty() {
    let fake = spawn_fake_backend().await;
    let client = BaasClient::new(&fake.base_url, "anon-key");

    fake.set_rpc_result("get_mining_status", json!({"is_mining": false, "balance": 3}));
    let status = client.get_mining_status().await.unwrap().unwrap();
    assert!(!status.is_mining);
    assert_eq!(status.balance, 3.0);

    fake.set_rpc_result("get_mining_status", json!([]));
    assert!(client.get_mining_status().await.unwrap().is_none());
}

#[tokio::test]
async fn add_boost_sends_tier_name() {
    let fake = spawn_fake_backend().await;
    let client = BaasClient::new(&fake.base_url, "anon-key");

    client.add_boost(BoostKind::ThreeDays).await.unwrap();

    let calls = fake.rpc_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "add_boost");
    assert_eq!(calls[0].1, json!({"boost_type": "3d"}));
}

#[tokio::test]
async fn remaining_spins_is_lenient() {
    let fake = spawn_fake_backend().await;
    let client = BaasClient::new(&fake.base_url, "anon-key");

    fake.set_rpc_result("get_remaining_spins", json!(2));
    assert_eq!(client.get_remaining_spins().await.unwrap(), 2);

    fake.set_rpc_result("get_remaining_spins", json!("3"));
    assert_eq!(client.get_remaining_spins().await.unwrap(), 3);

    fake.set_rpc_result("get_remaining_spins", json!(null));
    assert_eq!(client.get_remaining_spins().await.unwrap(), 0);
}

#[tokio::test]
async fn backend_errors_surface_code_and_message() {
    let fake = spawn_fake_backend().await;
    fake.fail_rpcs(
        StatusCode::BAD_REQUEST,
        json!({"code": "P0001", "message": "Mining already in progress", "details": null}),
    );
    let client = BaasClient::new(&fake.base_url, "anon-key");

    let err = client.start_mining().await.unwrap_err();
    assert_matches!(
        err,
        BaasError::Api { status: 400, code: Some(ref c), ref message }
            if c == "P0001" && message == "Mining already in progress"
    );
}
