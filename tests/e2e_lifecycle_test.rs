//! Full lifecycle: signup, deposit approval, pairing, result reconciliation,
//! payout, leaderboard. The ledger conservation invariant is checked for
//! every account at the end.

mod common;

use axum::http::StatusCode;
use common::{funded_user, get, paired_match, post_admin, post_json, setup_test_app};
use serde_json::json;
use stakearena::domain::UserId;

async fn assert_conserved(test: &common::TestApp, user: &str) {
    let user_id = UserId::new(user.to_string());
    let balance = test
        .repo
        .get_balance(&user_id)
        .await
        .unwrap()
        .expect("account missing");
    let total = test.repo.sum_completed_for_user(&user_id).await.unwrap();
    assert_eq!(
        balance, total,
        "balance diverged from completed ledger sum for {}",
        user
    );
}

#[tokio::test]
async fn test_full_match_lifecycle_preserves_the_ledger() {
    let test = setup_test_app().await;

    // Referrer brings in alice; both players funded through admin-approved
    // deposits.
    funded_user(&test.app, "referrer", 0).await;
    let (status, _) = post_json(
        &test.app,
        "/v1/accounts",
        json!({"userId": "alice", "displayName": "Alice", "referredBy": "referrer"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = post_json(
        &test.app,
        "/v1/wallet/deposits",
        json!({"userId": "alice", "amount": 1000, "externalRef": "pay-alice-1"}),
    )
    .await;
    let request_id = body["requestId"].as_str().unwrap().to_string();
    let (status, _) = post_admin(
        &test.app,
        &format!("/v1/admin/deposits/{}/approve", request_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    funded_user(&test.app, "bob", 1000).await;

    // Referral commission hit the referrer exactly once.
    let (_, wallet) = get(&test.app, "/v1/wallet/referrer").await;
    assert_eq!(wallet["balance"], 50);

    // Pair, play, report.
    let match_id = paired_match(&test.app, "alice", "bob", 100).await;

    post_json(
        &test.app,
        &format!("/v1/matches/{}/results", match_id),
        json!({
            "userId": "alice",
            "claimedPosition": 1,
            "claimedStatus": "win",
            "screenshotRef": "shots/alice.png"
        }),
    )
    .await;
    let (_, body) = post_json(
        &test.app,
        &format!("/v1/matches/{}/results", match_id),
        json!({
            "userId": "bob",
            "claimedPosition": 2,
            "claimedStatus": "loss",
            "screenshotRef": "shots/bob.png"
        }),
    )
    .await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["winnerId"], "alice");

    // Winner withdraws part of the prize; admin approves.
    let (_, body) = post_json(
        &test.app,
        "/v1/wallet/withdrawals",
        json!({"userId": "alice", "amount": 500}),
    )
    .await;
    let withdrawal_id = body["requestId"].as_str().unwrap().to_string();
    let (status, _) = post_admin(
        &test.app,
        &format!("/v1/admin/withdrawals/{}/approve", withdrawal_id),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // alice: 1000 - 100 + 180 - 500 = 580
    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 580);
    // bob: 1000 - 100 = 900
    let (_, wallet) = get(&test.app, "/v1/wallet/bob").await;
    assert_eq!(wallet["balance"], 900);

    // Leaderboard reflects the decided match.
    let (status, board) = get(&test.app, "/v1/leaderboard").await;
    assert_eq!(status, StatusCode::OK);
    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries[0]["userId"], "alice");
    assert_eq!(entries[0]["rating"], 10);
    assert_eq!(entries[0]["totalWinnings"], 180);

    // The primary invariant holds for every account.
    for user in ["alice", "bob", "referrer"] {
        assert_conserved(&test, user).await;
    }
}

#[tokio::test]
async fn test_disputed_then_overridden_lifecycle_conserves() {
    let test = setup_test_app().await;
    funded_user(&test.app, "alice", 300).await;
    funded_user(&test.app, "bob", 300).await;
    let match_id = paired_match(&test.app, "alice", "bob", 100).await;

    // Both claim victory with the same screenshot: disputed.
    for user in ["alice", "bob"] {
        post_json(
            &test.app,
            &format!("/v1/matches/{}/results", match_id),
            json!({
                "userId": user,
                "claimedPosition": 1,
                "claimedStatus": "win",
                "screenshotRef": "shots/same.png"
            }),
        )
        .await;
    }
    let (_, body) = get(&test.app, &format!("/v1/matches/{}", match_id)).await;
    assert_eq!(body["status"], "disputed");
    assert_eq!(body["disputeReason"], "multiple players claimed victory");

    // Operator reviews the evidence and rules for bob.
    let (status, body) = post_admin(
        &test.app,
        &format!("/v1/admin/matches/{}/winner", match_id),
        json!({"winnerId": "bob"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prizeDistributed"], true);

    let (_, wallet) = get(&test.app, "/v1/wallet/bob").await;
    assert_eq!(wallet["balance"], 380);
    let (_, wallet) = get(&test.app, "/v1/wallet/alice").await;
    assert_eq!(wallet["balance"], 200);

    for user in ["alice", "bob"] {
        assert_conserved(&test, user).await;
    }
}
