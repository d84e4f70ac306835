mod common;

use common::{TestApp, TestUser, delivery_order, id_of};
use http::StatusCode;
use serde_json::json;

async fn go_online_at(app: &TestApp, rider: &TestUser, latitude: f64, longitude: f64) -> i64 {
    let (status, profile) = app
        .put("/api/rider/status", rider, json!({ "status": "online" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{profile}");
    let (status, profile) = app
        .put(
            "/api/rider/location",
            rider,
            json!({ "latitude": latitude, "longitude": longitude }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{profile}");
    id_of(&profile)
}

#[tokio::test]
async fn nearest_rider_gets_the_order() {
    let app = TestApp::new().await;
    let staff = app.user("sam", "staff").await;
    let far = app.user("far", "rider").await;
    let near = app.user("near", "rider").await;

    // ~5 km and ~2 km from the drop-off
    let far_profile = go_online_at(&app, &far, 40.045, -3.0).await;
    let near_profile = go_online_at(&app, &near, 40.018, -3.0).await;

    let (_, order) = app
        .post("/api/orders", &staff, delivery_order(40.0, -3.0))
        .await;
    let order_id = id_of(&order);

    let (status, assigned) = app
        .post(&format!("/api/orders/{order_id}/assign"), &staff, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "{assigned}");
    assert_eq!(assigned["rider_id"], near_profile);
    assert_ne!(assigned["rider_id"], far_profile);

    let (_, board) = app.get("/api/rider/dashboard", &near).await;
    assert_eq!(board["profile"]["status"], "busy");

    // The busy rider can't go offline mid-delivery
    let (status, body) = app
        .put("/api/rider/status", &near, json!({ "status": "offline" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["from"], "busy");

    let (status, _) = app
        .post(&format!("/api/orders/{order_id}/assign"), &staff, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn delivery_run_frees_the_rider() {
    let app = TestApp::new().await;
    let staff = app.user("sam", "staff").await;
    let rider = app.user("rita", "rider").await;
    go_online_at(&app, &rider, 40.01, -3.0).await;

    let (_, order) = app
        .post("/api/orders", &staff, delivery_order(40.0, -3.0))
        .await;
    let order_uri = format!("/api/orders/{}", id_of(&order));
    app.post(&format!("{order_uri}/assign"), &staff, json!({})).await;

    for next in ["confirmed", "preparing", "ready", "out_for_delivery"] {
        let (status, body) = app.put(&order_uri, &staff, json!({ "status": next })).await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
    }

    let (_, board) = app.get("/api/rider/dashboard", &rider).await;
    assert_eq!(board["active_orders"].as_array().unwrap().len(), 1);

    // The rider can read the order they carry
    let (status, _) = app.get(&order_uri, &rider).await;
    assert_eq!(status, StatusCode::OK);

    app.put(&order_uri, &staff, json!({ "status": "delivered" })).await;
    let (_, board) = app.get("/api/rider/dashboard", &rider).await;
    assert_eq!(board["profile"]["status"], "online");
    assert!(board["active_orders"].as_array().unwrap().is_empty());

    let (_, history) = app.get("/api/rider/orders", &rider).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn no_rider_means_conflict() {
    let app = TestApp::new().await;
    let staff = app.user("sam", "staff").await;
    let (_, order) = app
        .post("/api/orders", &staff, delivery_order(40.0, -3.0))
        .await;

    let (status, body) = app
        .post(&format!("/api/orders/{}/assign", id_of(&order)), &staff, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "No rider available");
}

#[tokio::test]
async fn managers_set_rider_status() {
    let app = TestApp::new().await;
    let manager = app.user("mia", "manager").await;
    let staff = app.user("sam", "staff").await;
    let rider = app.user("rita", "rider").await;

    let uri = format!("/api/riders/{}/status", rider.id);
    let (status, body) = app.put(&uri, &staff, json!({ "status": "online" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["details"]["capability"], "can_manage_delivery");

    let (status, profile) = app.put(&uri, &manager, json!({ "status": "online" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["status"], "online");
    assert_eq!(profile["user_id"], rider.id);
}

#[tokio::test]
async fn location_must_be_on_the_globe() {
    let app = TestApp::new().await;
    let rider = app.user("rita", "rider").await;

    let (status, body) = app
        .put(
            "/api/rider/location",
            &rider,
            json!({ "latitude": 120.0, "longitude": 0.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["field"], "latitude");
}
