//! Deposit/withdrawal request flows, referral commission, and wallet reads.

mod common;

use axum::http::StatusCode;
use common::{funded_user, get, post_admin, post_json, setup_test_app};
use serde_json::json;

#[tokio::test]
async fn test_deposit_credits_only_after_approval() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 0).await;

    let (status, body) = post_json(
        &test.app,
        "/v1/wallet/deposits",
        json!({"userId": "alice", "amount": 1000}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    let request_id = body["requestId"].as_str().unwrap().to_string();

    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 0);

    let (status, _) = post_admin(
        &test.app,
        &format!("/v1/admin/deposits/{}/approve", request_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 1000);
    assert_eq!(wallet["ledgerTotal"], 1000);

    // Duplicate approval is a stale precondition, not a second credit.
    let (status, body) = post_admin(
        &test.app,
        &format!("/v1/admin/deposits/{}/approve", request_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "failed-precondition");
    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 1000);
}

#[tokio::test]
async fn test_duplicate_deposit_requests_collapse_on_external_ref() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 0).await;

    let (_, first) = post_json(
        &test.app,
        "/v1/wallet/deposits",
        json!({"userId": "alice", "amount": 1000, "externalRef": "PAY-42"}),
    )
    .await;
    let (_, second) = post_json(
        &test.app,
        "/v1/wallet/deposits",
        json!({"userId": "alice", "amount": 1000, "externalRef": " pay-42 "}),
    )
    .await;
    assert_eq!(first["requestId"], second["requestId"]);
}

#[tokio::test]
async fn test_rejected_deposit_never_credits() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 0).await;

    let (_, body) = post_json(
        &test.app,
        "/v1/wallet/deposits",
        json!({"userId": "alice", "amount": 1000}),
    )
    .await;
    let request_id = body["requestId"].as_str().unwrap().to_string();

    let (status, _) = post_admin(
        &test.app,
        &format!("/v1/admin/deposits/{}/reject", request_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 0);
    assert!(wallet["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_referral_commission_paid_once_on_first_deposit() {
    let test = setup_test_app().await;
    funded_user(&test.app, "referrer", 0).await;

    let (status, _) = post_json(
        &test.app,
        "/v1/accounts",
        json!({"userId": "newbie", "displayName": "Newbie", "referredBy": "referrer"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for reference in ["pay-n1", "pay-n2"] {
        let (_, body) = post_json(
            &test.app,
            "/v1/wallet/deposits",
            json!({"userId": "newbie", "amount": 1000, "externalRef": reference}),
        )
        .await;
        let request_id = body["requestId"].as_str().unwrap().to_string();
        post_admin(
            &test.app,
            &format!("/v1/admin/deposits/{}/approve", request_id),
            json!({}),
        )
        .await;
    }

    // 5% of the first 1000, exactly once.
    let (_, wallet) = get(&test.app, "/v1/wallet/referrer").await;
    assert_eq!(wallet["balance"], 50);
    let bonuses: Vec<_> = wallet["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["kind"] == "referral-bonus")
        .collect();
    assert_eq!(bonuses.len(), 1);

    let (_, wallet) = get(&test.app, "/v1/wallet/newbie").await;
    assert_eq!(wallet["balance"], 2000);
}

#[tokio::test]
async fn test_withdrawal_holds_then_refunds_on_rejection() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 1000).await;

    let (status, body) = post_json(
        &test.app,
        "/v1/wallet/withdrawals",
        json!({"userId": "alice", "amount": 400}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let request_id = body["requestId"].as_str().unwrap().to_string();

    // Funds held immediately.
    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 600);

    let (status, _) = post_admin(
        &test.app,
        &format!("/v1/admin/withdrawals/{}/reject", request_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 1000);
    assert_eq!(wallet["ledgerTotal"], 1000);

    let kinds: Vec<_> = wallet["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"withdrawal".to_string()));
    assert!(kinds.contains(&"refund".to_string()));
}

#[tokio::test]
async fn test_withdrawal_approval_keeps_hold() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 1000).await;

    let (_, body) = post_json(
        &test.app,
        "/v1/wallet/withdrawals",
        json!({"userId": "alice", "amount": 400}),
    )
    .await;
    let request_id = body["requestId"].as_str().unwrap().to_string();

    let (status, _) = post_admin(
        &test.app,
        &format!("/v1/admin/withdrawals/{}/approve", request_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 600);
    assert_eq!(wallet["ledgerTotal"], 600);
}

#[tokio::test]
async fn test_unaffordable_withdrawal_fails_and_keeps_evidence() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 100).await;

    let (status, body) = post_json(
        &test.app,
        "/v1/wallet/withdrawals",
        json!({"userId": "alice", "amount": 400}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "insufficient-funds");

    // Balance unchanged; the rejected debit is preserved as a failed entry.
    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 100);
    let failed: Vec<_> = wallet["entries"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["status"] == "failed")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["kind"], "withdrawal");
}

#[tokio::test]
async fn test_wallet_of_unknown_user_is_not_found() {
    let test = setup_test_app().await;
    let (status, body) = get(&test.app, "/v1/wallet/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not-found");
}
