use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::{Engine, NewUser, SIGNATURE_HEADER, WebhookVerifier};
use server::{ServerState, router};

const SECRET: &str = "sk_test_secret";

struct TestApp {
    router: Router,
    ids: Vec<i64>,
}

async fn app() -> TestApp {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .webhook_secret(SECRET)
        .build()
        .await
        .unwrap();

    let mut ids = Vec::new();
    for name in ["alice", "bob", "carol"] {
        let id = engine
            .create_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                first_name: name.to_string(),
                password: format!("{name}-pw"),
            })
            .await
            .unwrap();
        ids.push(id);
    }

    let state = ServerState {
        engine: Arc::new(engine),
        db,
        provider: None,
    };
    TestApp {
        router: router(state),
        ids,
    }
}

fn basic(user: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{user}-pw")))
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    user: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let res = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn webhook(router: &Router, body: &[u8], signature: &str) -> (StatusCode, String) {
    let res = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/payments")
                .header(SIGNATURE_HEADER, signature)
                .body(Body::from(body.to_vec()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn charge(reference: &str, amount: i64, user_id: i64) -> Vec<u8> {
    json!({
        "event": "charge.success",
        "data": {
            "reference": reference,
            "amount": amount,
            "status": "success",
            "metadata": {
                "user_id": user_id,
                "transaction_type": "credit",
                "category": "fund",
                "description": "wallet top up",
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// alice's group with bob and carol, and one 100.00 expense paid by alice.
async fn group_with_expense(router: &Router) -> (i64, Value) {
    let (status, created) = call(
        router,
        "POST",
        "/groups",
        "alice",
        Some(json!({ "name": "Trip" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = created["id"].as_i64().unwrap();

    for member in ["bob", "carol"] {
        let (status, _) = call(
            router,
            "POST",
            &format!("/groups/{group_id}/members"),
            "alice",
            Some(json!({ "username": member })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, detail) = call(
        router,
        "POST",
        &format!("/groups/{group_id}/expenses"),
        "alice",
        Some(json!({ "description": "hotel", "amount_minor": 10000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (group_id, detail)
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let TestApp { router, .. } = app().await;
    let res = router
        .oneshot(
            Request::builder()
                .uri("/wallet")
                .header(
                    header::AUTHORIZATION,
                    format!("Basic {}", STANDARD.encode("alice:nope")),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expense_split_fund_and_settle() {
    let TestApp { router, ids } = app().await;
    let bob = ids[1];
    let (group_id, detail) = group_with_expense(&router).await;

    assert_eq!(detail["payer_share_minor"], 3334);
    let splits = detail["splits"].as_array().unwrap();
    assert_eq!(splits.len(), 2);
    assert!(splits.iter().all(|s| s["amount_owed_minor"] == 3333));
    let bob_split = splits
        .iter()
        .find(|s| s["owed_by"] == bob)
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    // No money yet.
    let (status, _) = call(
        &router,
        "POST",
        &format!("/splits/{bob_split}/settle"),
        "bob",
        Some(json!({ "amount_minor": 3333 })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let body = charge("ref-1", 500_000, bob);
    let signature = WebhookVerifier::new(SECRET).unwrap().sign(&body);
    assert_eq!(
        webhook(&router, &body, &signature).await,
        (StatusCode::OK, "OK".to_string())
    );
    assert_eq!(
        webhook(&router, &body, &signature).await,
        (StatusCode::OK, "OK".to_string())
    );
    let (_, wallet) = call(&router, "GET", "/wallet", "bob", None).await;
    assert_eq!(wallet["balance_minor"], 500_000);

    let (status, _) = call(
        &router,
        "POST",
        &format!("/splits/{bob_split}/settle"),
        "bob",
        Some(json!({ "amount_minor": 5000 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &router,
        "POST",
        &format!("/splits/{bob_split}/settle"),
        "carol",
        Some(json!({ "amount_minor": 3333 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, settled) = call(
        &router,
        "POST",
        &format!("/splits/{bob_split}/settle"),
        "bob",
        Some(json!({ "amount_minor": 3333 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settled["is_fully_settled"], true);
    assert_eq!(settled["remaining_owed_minor"], 0);

    let (_, owed) = call(&router, "GET", "/balances/owed", "bob", None).await;
    assert!(owed["balances"].as_array().unwrap().is_empty());
    let (_, owed_to_me) = call(&router, "GET", "/balances/owed-to-me", "alice", None).await;
    let owed_to_me = owed_to_me["balances"].as_array().unwrap();
    assert_eq!(owed_to_me.len(), 1);
    assert_eq!(owed_to_me[0]["username"], "carol");

    let (_, summary) = call(
        &router,
        "GET",
        &format!("/groups/{group_id}/summary"),
        "carol",
        None,
    )
    .await;
    assert_eq!(summary["group_name"], "Trip");

    let (_, ledger) = call(&router, "GET", "/wallet/transactions?limit=10", "bob", None).await;
    let rows = ledger["transactions"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|r| r["direction"] == "debit").count(), 1);

    // Paid-down expenses can no longer change amount.
    let expense_id = detail["expense"]["id"].as_i64().unwrap();
    let (status, _) = call(
        &router,
        "PATCH",
        &format!("/expenses/{expense_id}"),
        "alice",
        Some(json!({ "amount_minor": 20000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn webhook_rejects_bad_signature_and_payload() {
    let TestApp { router, ids } = app().await;
    let body = charge("ref-2", 1000, ids[0]);

    let (status, _) = webhook(&router, &body, "deadbeef").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let garbage = b"not json".to_vec();
    let signature = WebhookVerifier::new(SECRET).unwrap().sign(&garbage);
    let (status, _) = webhook(&router, &garbage, &signature).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let ignored = json!({ "event": "charge.failed", "data": { "status": "failed" } })
        .to_string()
        .into_bytes();
    let signature = WebhookVerifier::new(SECRET).unwrap().sign(&ignored);
    assert_eq!(
        webhook(&router, &ignored, &signature).await,
        (StatusCode::OK, "ignored".to_string())
    );
}

#[tokio::test]
async fn invitations_round_trip() {
    let TestApp { router, .. } = app().await;
    let (status, created) = call(
        &router,
        "POST",
        "/groups",
        "alice",
        Some(json!({ "name": "Book club", "description": "monthly" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = created["id"].as_i64().unwrap();

    let (status, issued) = call(
        &router,
        "POST",
        &format!("/groups/{group_id}/invitations"),
        "alice",
        Some(json!({ "email": "bob@example.com", "ttl_hours": 48 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(issued["invitation"]["status"], "pending");
    let token = issued["token"].as_str().unwrap().to_string();

    let (_, pending) = call(
        &router,
        "GET",
        &format!("/groups/{group_id}/invitations"),
        "alice",
        None,
    )
    .await;
    assert_eq!(pending["invitations"].as_array().unwrap().len(), 1);

    let (status, accepted) = call(
        &router,
        "POST",
        &format!("/invitations/{token}/accept"),
        "bob",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (status, _) = call(
        &router,
        "POST",
        &format!("/invitations/{token}/accept"),
        "bob",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &router,
        "GET",
        &format!("/groups/{group_id}/expenses"),
        "bob",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &router,
        "GET",
        &format!("/groups/{group_id}/expenses"),
        "carol",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn funding_without_provider_is_rejected() {
    let TestApp { router, .. } = app().await;
    let (status, body) = call(
        &router,
        "POST",
        "/wallet/fund",
        "alice",
        Some(json!({ "amount_minor": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "payments are not configured");
}
