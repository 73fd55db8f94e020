use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tollgate::config::GatewayConfig;
use tollgate::server::create_app;

/// Spins up the full Axum app on an ephemeral port, the way
/// `throttler`'s own integration tests do, and returns its base URL.
async fn spawn_app() -> String {
    let config = GatewayConfig::default();
    let app = create_app(config).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

async fn user_token(client: &Client, base_url: &str, user_id: &str) -> String {
    let response = client
        .post(format!("{}/auth/token", base_url))
        .json(&json!({ "user_id": user_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

async fn admin_token(client: &Client, base_url: &str) -> String {
    let config = GatewayConfig::default();
    let response = client
        .post(format!("{}/admin/login", base_url))
        .json(&json!({
            "username": config.admin_username,
            "password": config.admin_password,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check_is_always_reachable() {
    let base_url = spawn_app().await;
    let response = Client::new().get(format!("{}/health", base_url)).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn ready_check_reports_store_mode() {
    let base_url = spawn_app().await;
    let response = Client::new().get(format!("{}/ready", base_url)).send().await.unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["store"], "in-memory");
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let base_url = spawn_app().await;
    let response = Client::new().get(format!("{}/api/users", base_url)).send().await.unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn default_burst_admits_ten_then_rejects_the_eleventh() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let token = user_token(&client, &base_url, "u1").await;

    for _ in 0..10 {
        let response = client
            .get(format!("{}/api/users", base_url))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = client
        .get(format!("{}/api/users", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("Retry-After"));
}

#[tokio::test]
async fn bucket_refills_after_waiting() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let token = admin_token(&client, &base_url).await;

    client
        .post(format!("{}/admin/config", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "default_requests_per_minute": 60,
            "default_burst_size": 1,
            "endpoints": {},
            "user_overrides": {},
        }))
        .send()
        .await
        .unwrap();

    let user = user_token(&client, &base_url, "refill_user").await;

    let response = client
        .get(format!("{}/api/data", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/api/data", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);

    sleep(Duration::from_millis(1100)).await;

    let response = client
        .get(format!("{}/api/data", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn admin_config_round_trips_and_takes_effect() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let token = admin_token(&client, &base_url).await;

    let response = client
        .post(format!("{}/admin/config", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "default_requests_per_minute": 60,
            "default_burst_size": 10,
            "endpoints": {
                "/api/users": { "POST": { "requests_per_minute": 30, "burst_size": 5 } }
            },
            "user_overrides": {},
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/admin/config", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let config: Value = response.json().await.unwrap();
    assert_eq!(config["endpoints"]["/api/users"]["POST"]["requests_per_minute"], 30);

    let user = user_token(&client, &base_url, "u2").await;
    for _ in 0..5 {
        let response = client
            .post(format!("{}/api/users", base_url))
            .bearer_auth(&user)
            .json(&json!({ "name": "x", "email": "x@example.com" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }
    let response = client
        .post(format!("{}/api/users", base_url))
        .bearer_auth(&user)
        .json(&json!({ "name": "x", "email": "x@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn config_update_rejects_missing_required_fields() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let token = admin_token(&client, &base_url).await;

    let response = client
        .post(format!("{}/admin/config", base_url))
        .bearer_auth(&token)
        .json(&json!({ "default_burst_size": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admin_routes_reject_a_plain_user_token() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let user = user_token(&client, &base_url, "u1").await;

    let response = client
        .get(format!("{}/admin/stats", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn admin_stats_reflect_allowed_and_blocked_counts() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let admin = admin_token(&client, &base_url).await;
    let user = user_token(&client, &base_url, "stats_user").await;

    client
        .post(format!("{}/admin/config", base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "default_requests_per_minute": 60,
            "default_burst_size": 2,
            "endpoints": {},
            "user_overrides": {},
        }))
        .send()
        .await
        .unwrap();

    for _ in 0..3 {
        client
            .get(format!("{}/api/data", base_url))
            .bearer_auth(&user)
            .send()
            .await
            .unwrap();
    }

    let response = client
        .get(format!("{}/admin/user/stats_user/stats", base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let current = &body["user_stats"][0];
    assert_eq!(current["total"], 3);
    assert_eq!(current["allowed"], 2);
    assert_eq!(current["blocked"], 1);
}

#[tokio::test]
async fn reset_user_restores_the_initial_burst() {
    let base_url = spawn_app().await;
    let client = Client::new();
    let admin = admin_token(&client, &base_url).await;
    let user = user_token(&client, &base_url, "reset_user_id").await;

    client
        .post(format!("{}/admin/config", base_url))
        .bearer_auth(&admin)
        .json(&json!({
            "default_requests_per_minute": 60,
            "default_burst_size": 1,
            "endpoints": {},
            "user_overrides": {},
        }))
        .send()
        .await
        .unwrap();

    let response = client
        .get(format!("{}/api/data", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/api/data", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);

    let response = client
        .post(format!("{}/admin/user/reset_user_id/reset", base_url))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/api/data", base_url))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}
