//! Client tests against a mock augur server.

use augur_client::{
    ActionId, ActionRecord, ActionStatus, AugurClient, ClientError, ClientOptions, Currency,
    EntryKind, FundingMode, UserId,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWT: &str = "user-jwt";

#[tokio::test]
async fn submit_action_sends_bearer_token() {
    let server = MockServer::start().await;
    let action_id = ActionId::generate();

    Mock::given(method("POST"))
        .and(path("/v1/actions"))
        .and(header("authorization", "Bearer user-jwt"))
        .and(body_json(json!({ "action_type": "fortune" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action_id": action_id.to_string(),
            "funding_mode": "paid",
            "cost": 50
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AugurClient::new(server.uri()).unwrap();
    let submission = client.submit_action(JWT, "fortune").await.unwrap();

    assert_eq!(submission.action_id, action_id);
    assert_eq!(submission.funding_mode, FundingMode::Paid);
    assert_eq!(submission.cost, 50);
}

#[tokio::test]
async fn denial_maps_to_insufficient_credits() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/actions"))
        .respond_with(ResponseTemplate::new(402).set_body_json(json!({
            "error": {
                "code": "insufficient_credits",
                "message": "insufficient credits: balance=10, required=50",
                "details": { "balance": 10, "required": 50 }
            }
        })))
        .mount(&server)
        .await;

    let client = AugurClient::new(server.uri()).unwrap();
    let err = client.submit_action(JWT, "fortune").await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::InsufficientCredits {
            balance: 10,
            required: 50
        }
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unavailable_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/wallet/balance"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "error": {
                "code": "unavailable",
                "message": "The service is temporarily unavailable, please retry",
                "details": { "retryable": true }
            }
        })))
        .mount(&server)
        .await;

    let client = AugurClient::new(server.uri()).unwrap();
    let err = client.get_balance(JWT).await.unwrap_err();

    assert!(matches!(err, ClientError::Unavailable { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn non_json_error_is_reported_with_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = AugurClient::new(server.uri()).unwrap();
    let err = client.health().await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 502, .. }));
}

#[tokio::test]
async fn transactions_are_paged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/wallet/transactions"))
        .and(query_param("limit", "1"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "transactions": [{
                "id": "01J0000000000000000000000A",
                "amount": -50,
                "currency": "credits",
                "kind": "debit",
                "balance_after": 50,
                "action_id": "01J0000000000000000000000B",
                "description": "fortune",
                "created_at": "2024-06-01T09:30:00+00:00"
            }],
            "has_more": true
        })))
        .mount(&server)
        .await;

    let client = AugurClient::new(server.uri()).unwrap();
    let page = client.list_transactions(JWT, 1, 0).await.unwrap();

    assert!(page.has_more);
    assert_eq!(page.transactions[0].kind, EntryKind::Debit);
    assert_eq!(page.transactions[0].currency, Currency::Credits);
    assert_eq!(page.transactions[0].balance_after, 50);
}

#[tokio::test]
async fn daily_claim_reports_repeat_as_not_granted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rewards/daily"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "granted": false,
            "amount": 0,
            "currency": "credits",
            "balance": { "credits": 120, "diamonds": 0 }
        })))
        .mount(&server)
        .await;

    let client = AugurClient::new(server.uri()).unwrap();
    let claim = client.claim_daily_reward(JWT).await.unwrap();

    assert!(!claim.granted);
    assert_eq!(claim.balance.credits, 120);
}

#[tokio::test]
async fn report_outcome_uses_service_key() {
    let server = MockServer::start().await;
    let action_id = ActionId::generate();

    Mock::given(method("POST"))
        .and(path(format!("/v1/actions/{action_id}/status")))
        .and(header("x-api-key", "svc-key"))
        .and(header("x-service-name", "fortune-worker"))
        .and(body_json(json!({ "status": "failed", "reason": "model timeout" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "action_id": action_id.to_string(),
            "status": "failed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = AugurClient::with_options(
        server.uri(),
        ClientOptions::for_service("fortune-worker", "svc-key"),
    )
    .unwrap();
    let ack = client
        .report_outcome(&action_id, ActionStatus::Failed, Some("model timeout".into()))
        .await
        .unwrap();

    assert_eq!(ack.status, ActionStatus::Failed);
}

#[tokio::test]
async fn report_outcome_without_key_fails_locally() {
    let client = AugurClient::new("http://127.0.0.1:9").unwrap();
    let err = client
        .report_outcome(&ActionId::generate(), ActionStatus::Completed, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Configuration(_)));
}

#[tokio::test]
async fn list_pending_actions_uses_service_key() {
    let server = MockServer::start().await;
    let record = ActionRecord::pending(
        ActionId::generate(),
        UserId::generate(),
        "fortune".parse().unwrap(),
        FundingMode::Paid,
        50,
    );

    Mock::given(method("GET"))
        .and(path("/v1/actions"))
        .and(query_param("status", "pending"))
        .and(query_param("limit", "20"))
        .and(header("x-api-key", "svc-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "actions": [record.clone()] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = AugurClient::with_options(
        server.uri(),
        ClientOptions::for_service("fortune-worker", "svc-key"),
    )
    .unwrap();
    let pending = client.list_pending_actions(20).await.unwrap();

    assert_eq!(pending.actions, vec![record]);
}
