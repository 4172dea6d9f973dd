//! HTTP API tests. The router is driven in-process with `tower::ServiceExt`
//! against the in-memory store and a recording push sender.

mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};
use firewatch::alerts::AlertPolicy;
use serde_json::json;
use uuid::Uuid;

async fn register(app: &TestApp, body: serde_json::Value) {
    let response = app.post_json("/register-token", body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_post_data_stores_reading() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/data",
            json!({"deviceId": "D1", "temperature": 20.0, "smoke": 15.0}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Data stored and sent to WebSocket clients"
    );

    let readings = body_json(app.get("/data/D1").await).await;
    let readings = readings.as_array().unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0]["deviceId"], "D1");
    assert_eq!(readings[0]["smoke"], 15.0);
    assert!(readings[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_post_data_rejects_malformed_body() {
    let app = TestApp::new();

    let missing_smoke = app
        .post_json("/data", json!({"deviceId": "D1", "temperature": 20.0}))
        .await;
    assert_eq!(missing_smoke.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(missing_smoke).await["message"]
        .as_str()
        .unwrap()
        .contains("smoke"));

    let missing_device = app
        .post_json("/data", json!({"temperature": 20.0, "smoke": 1.0}))
        .await;
    assert_eq!(missing_device.status(), StatusCode::BAD_REQUEST);

    let not_json = app.post_raw("/data", "{oops".to_string()).await;
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);

    let readings = body_json(app.get("/data").await).await;
    assert!(readings.as_array().unwrap().is_empty());
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_get_data_filters_by_device() {
    let app = TestApp::new();
    for (device, smoke) in [("D1", 1.0), ("D2", 2.0), ("D1", 3.0)] {
        let response = app
            .post_json(
                "/data",
                json!({"deviceId": device, "temperature": 20.0, "smoke": smoke}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let all = body_json(app.get("/data").await).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let d1 = body_json(app.get("/data?deviceId=D1").await).await;
    let d1 = d1.as_array().unwrap();
    assert_eq!(d1.len(), 2);
    assert!(d1.iter().all(|r| r["deviceId"] == "D1"));

    let d2 = body_json(app.get("/data/D2").await).await;
    assert_eq!(d2.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_smoke_alert_example() {
    let app = TestApp::new();
    register(
        &app,
        json!({
            "deviceId": "D1",
            "token": "T1",
            "smokeThreshold": 10,
            "tempThreshold": 50,
            "notificationsEnabled": true
        }),
    )
    .await;

    let response = app
        .post_json(
            "/data",
            json!({"deviceId": "D1", "temperature": 20, "smoke": 15}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "T1");
    assert_eq!(sent[0].body, "Smoke level at D1: 15 ppm");
}

#[tokio::test]
async fn test_both_alerts_fire_independently() {
    let app = TestApp::new();
    register(
        &app,
        json!({"deviceId": "D1", "token": "T1", "smokeThreshold": 10, "tempThreshold": 19}),
    )
    .await;

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 20, "smoke": 15}),
    )
    .await;
    assert_eq!(app.push.sent().len(), 2);

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 10, "smoke": 10}),
    )
    .await;
    assert_eq!(app.push.sent().len(), 2);
}

#[tokio::test]
async fn test_disabled_notifications_send_nothing() {
    let app = TestApp::new();
    register(
        &app,
        json!({
            "deviceId": "D1",
            "token": "T1",
            "smokeThreshold": 1,
            "tempThreshold": 1,
            "notificationsEnabled": false
        }),
    )
    .await;

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 90, "smoke": 90}),
    )
    .await;
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_threshold_never_alerts() {
    let app = TestApp::new();
    register(
        &app,
        json!({"deviceId": "D1", "token": "T1", "smokeThreshold": "lots", "tempThreshold": null}),
    )
    .await;

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 500, "smoke": 500}),
    )
    .await;
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_garbled_opt_out_sends_nothing() {
    let app = TestApp::new();
    register(
        &app,
        json!({"deviceId": "D1", "token": "T1", "smokeThreshold": 10, "notificationsEnabled": "no"}),
    )
    .await;

    let settings = body_json(app.get("/settings/D1").await).await;
    assert_eq!(settings["notificationsEnabled"], false);

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 20, "smoke": 15}),
    )
    .await;
    assert!(app.push.sent().is_empty());
}

#[tokio::test]
async fn test_exclude_sender_policy() {
    let app = TestApp::with_policy(AlertPolicy {
        exclude_sender: true,
    });
    register(&app, json!({"deviceId": "D1", "token": "T1", "smokeThreshold": 10})).await;
    register(&app, json!({"deviceId": "D2", "token": "T2", "smokeThreshold": 10})).await;

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 20, "smoke": 15}),
    )
    .await;

    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "T2");
}

#[tokio::test]
async fn test_push_failure_does_not_fail_request() {
    let app = TestApp::new();
    register(&app, json!({"deviceId": "D1", "token": "T1", "smokeThreshold": 10})).await;
    register(&app, json!({"deviceId": "D2", "token": "T2", "smokeThreshold": 10})).await;
    app.push.fail_for("T1");

    let response = app
        .post_json(
            "/data",
            json!({"deviceId": "D1", "temperature": 20, "smoke": 15}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "T2");
}

#[tokio::test]
async fn test_register_then_read_settings() {
    let app = TestApp::new();
    register(&app, json!({"deviceId": "D1", "token": "T1", "room": "kitchen"})).await;

    let response = app.get("/settings/D1").await;
    assert_eq!(response.status(), StatusCode::OK);

    let settings = body_json(response).await;
    assert_eq!(settings["deviceId"], "D1");
    assert_eq!(settings["token"], "T1");
    assert_eq!(settings["notificationsEnabled"], true);
    assert_eq!(settings["room"], "kitchen");
}

#[tokio::test]
async fn test_register_requires_device_and_token() {
    let app = TestApp::new();

    let response = app
        .post_json("/register-token", json!({"deviceId": "D1"}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.post_json("/register-token", json!({"token": "T1"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.get("/settings/D1").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_unknown_device_is_404() {
    let app = TestApp::new();
    let response = app.get("/settings/nope").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Device not found");
}

#[tokio::test]
async fn test_token_reassignment() {
    let app = TestApp::new();
    register(&app, json!({"deviceId": "A", "token": "T1", "smokeThreshold": 10})).await;
    register(&app, json!({"deviceId": "B", "token": "T1", "smokeThreshold": 10})).await;

    let a = body_json(app.get("/settings/A").await).await;
    let b = body_json(app.get("/settings/B").await).await;
    assert!(a["token"].is_null());
    assert_eq!(b["token"], "T1");

    app.post_json(
        "/data",
        json!({"deviceId": "A", "temperature": 20, "smoke": 15}),
    )
    .await;
    assert_eq!(app.push.sent().len(), 1);
}

#[tokio::test]
async fn test_ingest_reaches_only_matching_viewers() {
    let app = TestApp::new();
    let subscriptions = &app.state.subscriptions;

    let watcher = Uuid::new_v4();
    let bystander = Uuid::new_v4();
    let mut watcher_rx = subscriptions.register(watcher).await;
    let mut bystander_rx = subscriptions.register(bystander).await;
    subscriptions.subscribe(watcher, "D1").await;
    subscriptions.subscribe(bystander, "D2").await;

    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 20, "smoke": 3}),
    )
    .await;

    let pushed: serde_json::Value = serde_json::from_str(&watcher_rx.recv().await.unwrap()).unwrap();
    assert_eq!(pushed["deviceId"], "D1");
    assert_eq!(pushed["smoke"], 3.0);
    assert!(bystander_rx.try_recv().is_err());

    subscriptions.unsubscribe_all(watcher).await;
    app.post_json(
        "/data",
        json!({"deviceId": "D1", "temperature": 20, "smoke": 4}),
    )
    .await;
    assert!(watcher_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
