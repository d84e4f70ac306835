//! Fixtures shared by the unit tests

use shared::models::{DeliveryAddress, OrderCreate, OrderItemInput, OrderType};

use crate::auth::CurrentUser;
use crate::auth::permissions::default_capabilities;
use crate::core::ServerState;
use crate::db::repository::user;

pub async fn test_state() -> ServerState {
    ServerState::in_memory().await.expect("in-memory state")
}

/// Seed a user with one of the system roles and return its principal
pub async fn principal(state: &ServerState, username: &str, role: &str) -> CurrentUser {
    let user = user::create(&state.pool, username, username, Some(role))
        .await
        .expect("seed user");
    CurrentUser {
        id: user.id,
        username: user.username,
        role: Some(role.to_string()),
        capabilities: default_capabilities(role).to_vec(),
    }
}

/// 2 × 8.00 + 1 × 4.00, tax 2.00, delivery 3.00 → total 25.00
pub fn delivery_order(latitude: f64, longitude: f64) -> OrderCreate {
    OrderCreate {
        order_type: OrderType::Delivery,
        items: vec![
            OrderItemInput {
                menu_item_id: 1,
                item_name: "Pizza".into(),
                unit_price: 8.0,
                quantity: 2,
                special_instructions: None,
            },
            OrderItemInput {
                menu_item_id: 2,
                item_name: "Soda".into(),
                unit_price: 4.0,
                quantity: 1,
                special_instructions: None,
            },
        ],
        subtotal: 20.0,
        tax_amount: 2.0,
        discount_amount: 0.0,
        delivery_charge: 3.0,
        total_amount: Some(25.0),
        paid_amount: 0.0,
        payment_method: Some("card".into()),
        table_id: None,
        staff_id: None,
        customer_id: None,
        delivery_address: Some(DeliveryAddress {
            street: "Main St 1".into(),
            city: "Springfield".into(),
            postal_code: None,
            notes: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }),
        coupon_code: None,
        notes: None,
        status: None,
        payment_status: None,
    }
}

/// Single-line counter order whose total is `total`
pub fn counter_order(order_type: OrderType, payment_method: &str, total: f64) -> OrderCreate {
    OrderCreate {
        order_type,
        items: vec![OrderItemInput {
            menu_item_id: 1,
            item_name: "Menu".into(),
            unit_price: total,
            quantity: 1,
            special_instructions: None,
        }],
        subtotal: total,
        tax_amount: 0.0,
        discount_amount: 0.0,
        delivery_charge: 0.0,
        total_amount: Some(total),
        paid_amount: total,
        payment_method: Some(payment_method.into()),
        table_id: None,
        staff_id: None,
        customer_id: None,
        delivery_address: None,
        coupon_code: None,
        notes: None,
        status: None,
        payment_status: None,
    }
}
