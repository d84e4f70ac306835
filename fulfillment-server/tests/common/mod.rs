//! Integration test harness: the full router over an in-memory database
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use fulfillment_server::db::repository::user;
use fulfillment_server::{ServerState, core::build_app};
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub state: ServerState,
    app: Router,
}

/// A seeded user and a bearer token for it
pub struct TestUser {
    pub id: i64,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = ServerState::in_memory().await.expect("in-memory state");
        let app = build_app(state.clone());
        Self { state, app }
    }

    pub async fn user(&self, username: &str, role: &str) -> TestUser {
        let created = user::create(&self.state.pool, username, username, Some(role))
            .await
            .expect("seed user");
        let token = self
            .state
            .jwt_service
            .generate_token(created.id, username, role)
            .expect("token");
        TestUser {
            id: created.id,
            token,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).expect("json body")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json response")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(&user.token), Some(body))
            .await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(&user.token), None)
            .await
    }
}

/// Delivery order worth 25.00 dropped off at (lat, lon)
pub fn delivery_order(latitude: f64, longitude: f64) -> Value {
    serde_json::json!({
        "order_type": "delivery",
        "items": [
            { "menu_item_id": 1, "item_name": "Pizza", "unit_price": 8.0, "quantity": 2 },
            { "menu_item_id": 2, "item_name": "Soda", "unit_price": 4.0, "quantity": 1 }
        ],
        "subtotal": 20.0,
        "tax_amount": 2.0,
        "delivery_charge": 3.0,
        "total_amount": 25.0,
        "payment_method": "card",
        "delivery_address": {
            "street": "Main St 1",
            "city": "Springfield",
            "latitude": latitude,
            "longitude": longitude
        }
    })
}

/// Single-item takeaway order paid with `payment_method`
pub fn takeaway_order(payment_method: &str, total: f64) -> Value {
    serde_json::json!({
        "order_type": "takeaway",
        "items": [
            { "menu_item_id": 1, "item_name": "Menu", "unit_price": total, "quantity": 1 }
        ],
        "subtotal": total,
        "total_amount": total,
        "paid_amount": total,
        "payment_method": payment_method
    })
}

pub fn id_of(body: &Value) -> i64 {
    body["id"].as_i64().expect("id")
}
