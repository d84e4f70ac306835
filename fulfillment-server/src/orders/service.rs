//! Order Service
//!
//! 订单的创建、修改、查询与删除。所有写操作都带 principal，权限判定在这里完成。
//!
//! # 金额
//!
//! `total = subtotal + tax + delivery_charge - discount`，subtotal 必须等于
//! 明细之和 (容差 0.01)。所有计算走 `utils::money`。
//!
//! # 并发
//!
//! 每次写入都以 `version` 做乐观锁；输掉竞争的请求得到
//! `OrderVersionConflict`，不会覆盖别人的修改。

use serde::Deserialize;
use shared::event::DomainEvent;
use shared::models::{
    Capability, DeliveryAddress, Order, OrderCreate, OrderItem, OrderStatus, OrderType,
    OrderUpdate, PaymentStatus, RiderStatus,
};

use crate::auth::CurrentUser;
use crate::auth::permissions::{
    authenticated, authorize, authorize_any, can_cancel_own_order, can_deliver_own_order,
    can_read_order,
};
use crate::core::ServerState;
use crate::db::repository::order::{self, OrderFilter, OrderVisibility};
use crate::db::repository::{RepoError, rider};
use crate::orders::{number, transitions};
use crate::riders;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, page_bounds, validate_optional_text,
    validate_required_text,
};
use crate::utils::{AppError, AppResult, ErrorCode, money};

/// Query params for order lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Place an order
///
/// Staff (`can_edit_orders`) may set status, payment status and the handling
/// staff member; everyone else places a pending, unpaid order for themself.
pub async fn create(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    payload: OrderCreate,
) -> AppResult<Order> {
    create_with_numbers(state, principal, payload, number::generate).await
}

/// [`create`] with a caller-supplied order number source
pub async fn create_with_numbers<F>(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    payload: OrderCreate,
    mut next_number: F,
) -> AppResult<Order>
where
    F: FnMut() -> String + Send,
{
    let user = authorize_any(principal, &[Capability::PlaceOrders, Capability::EditOrders])?;
    let mut order = build_order(user, payload, shared::util::now_millis())?;

    let attempts = state.config.order_number_max_retries.max(1);
    for attempt in 1..=attempts {
        order.order_number = next_number();
        match order::insert(&state.pool, &order).await {
            Ok(()) => {
                tracing::info!(
                    order_id = order.id,
                    order_number = %order.order_number,
                    order_type = %order.order_type,
                    total = order.total_amount,
                    actor = user.id,
                    "Order created"
                );
                state.events.emit(
                    user.id,
                    DomainEvent::OrderCreated {
                        order_id: order.id,
                        order_number: order.order_number.clone(),
                        customer_id: order.customer_id,
                    },
                );
                return Ok(order);
            }
            Err(RepoError::Duplicate(_)) => {
                tracing::warn!(
                    attempt,
                    order_number = %order.order_number,
                    "Order number collision, retrying"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::with_message(
        ErrorCode::OrderNumberExhausted,
        format!("No unique order number after {attempts} attempts"),
    ))
}

/// Validate a create payload and materialize the order (number left empty)
fn build_order(user: &CurrentUser, payload: OrderCreate, now: i64) -> AppResult<Order> {
    let is_staff = user.has(Capability::EditOrders);
    if !is_staff
        && (payload.status.is_some()
            || payload.payment_status.is_some()
            || payload.staff_id.is_some()
            || payload.customer_id.is_some_and(|id| id != user.id))
    {
        authorize(Some(user), Capability::EditOrders)?;
    }

    let status = payload.status.unwrap_or(OrderStatus::Pending);
    if matches!(status, OrderStatus::Cancelled | OrderStatus::OutForDelivery) {
        return Err(AppError::invalid_field(
            "status",
            format!("an order cannot be created as {status}"),
        ));
    }
    if status == OrderStatus::Delivered && payload.order_type == OrderType::Delivery {
        return Err(AppError::invalid_field(
            "status",
            "a delivery order cannot be created as delivered",
        ));
    }

    if payload.items.is_empty() {
        return Err(AppError::field_error(
            ErrorCode::OrderEmpty,
            "items",
            "must contain at least one item",
        ));
    }

    let id = shared::util::snowflake_id();
    let mut items = Vec::with_capacity(payload.items.len());
    for (i, input) in payload.items.into_iter().enumerate() {
        validate_required_text(&input.item_name, &format!("items[{i}].item_name"), MAX_NAME_LEN)?;
        if input.quantity < 1 {
            return Err(AppError::invalid_field(
                format!("items[{i}].quantity"),
                "must be at least 1",
            ));
        }
        money::validate_amount(input.unit_price, &format!("items[{i}].unit_price"))?;
        validate_optional_text(
            &input.special_instructions,
            &format!("items[{i}].special_instructions"),
            MAX_NOTE_LEN,
        )?;

        let unit_price = money::round(input.unit_price);
        items.push(OrderItem {
            id: shared::util::snowflake_id(),
            order_id: id,
            menu_item_id: input.menu_item_id,
            item_name: input.item_name.trim().to_string(),
            unit_price,
            quantity: input.quantity,
            total_price: money::line_total(unit_price, input.quantity),
            special_instructions: input.special_instructions,
        });
    }

    for (value, field) in [
        (payload.subtotal, "subtotal"),
        (payload.tax_amount, "tax_amount"),
        (payload.discount_amount, "discount_amount"),
        (payload.delivery_charge, "delivery_charge"),
        (payload.paid_amount, "paid_amount"),
    ] {
        money::validate_amount(value, field)?;
    }

    let items_total = money::sum(items.iter().map(|item| item.total_price));
    if !money::matches(items_total, payload.subtotal) {
        return Err(AppError::field_error(
            ErrorCode::OrderTotalMismatch,
            "subtotal",
            format!(
                "expected {items_total:.2} from items, got {:.2}",
                payload.subtotal
            ),
        ));
    }

    let total = money::order_total(
        payload.subtotal,
        payload.tax_amount,
        payload.discount_amount,
        payload.delivery_charge,
    )?;
    if let Some(submitted) = payload.total_amount
        && !money::matches(submitted, total)
    {
        return Err(AppError::field_error(
            ErrorCode::OrderTotalMismatch,
            "total_amount",
            format!("expected {total:.2}, got {submitted:.2}"),
        ));
    }

    if payload.order_type == OrderType::Delivery {
        let address = payload.delivery_address.as_ref().ok_or_else(|| {
            AppError::field_error(
                ErrorCode::DeliveryAddressRequired,
                "delivery_address",
                "is required for delivery orders",
            )
        })?;
        validate_address(address)?;
    } else if let Some(address) = &payload.delivery_address {
        validate_address(address)?;
    }

    let payment_method = normalize_payment_method(payload.payment_method.as_deref())?;
    validate_optional_text(&payload.coupon_code, "coupon_code", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.notes, "notes", MAX_NOTE_LEN)?;

    let (staff_id, customer_id) = if is_staff {
        (payload.staff_id.or(Some(user.id)), payload.customer_id)
    } else {
        (None, Some(user.id))
    };

    Ok(Order {
        id,
        order_number: String::new(),
        status,
        order_type: payload.order_type,
        payment_status: payload.payment_status.unwrap_or(PaymentStatus::Unpaid),
        payment_method,
        subtotal: money::round(payload.subtotal),
        tax_amount: money::round(payload.tax_amount),
        discount_amount: money::round(payload.discount_amount),
        delivery_charge: money::round(payload.delivery_charge),
        total_amount: total,
        paid_amount: money::round(payload.paid_amount),
        table_id: payload.table_id,
        rider_id: None,
        staff_id,
        customer_id,
        delivery_address: payload.delivery_address,
        coupon_code: payload.coupon_code,
        notes: payload.notes,
        created_by: user.id,
        updated_by: user.id,
        created_at: now,
        updated_at: now,
        version: 0,
        items,
    })
}

fn validate_address(address: &DeliveryAddress) -> AppResult<()> {
    validate_required_text(&address.street, "delivery_address.street", MAX_NAME_LEN)?;
    validate_required_text(&address.city, "delivery_address.city", MAX_NAME_LEN)?;
    validate_optional_text(
        &address.postal_code,
        "delivery_address.postal_code",
        MAX_SHORT_TEXT_LEN,
    )?;
    validate_optional_text(&address.notes, "delivery_address.notes", MAX_NOTE_LEN)?;
    match (address.latitude, address.longitude) {
        (Some(lat), Some(lon)) => riders::geo::validate_coordinates(lat, lon),
        (None, None) => Ok(()),
        _ => Err(AppError::field_error(
            ErrorCode::InvalidCoordinates,
            "delivery_address",
            "latitude and longitude must be given together",
        )),
    }
}

/// Payment methods are stored lower-case so that `"Cash"` counts as cash
fn normalize_payment_method(method: Option<&str>) -> AppResult<Option<String>> {
    match method {
        Some(m) => {
            validate_required_text(m, "payment_method", MAX_SHORT_TEXT_LEN)?;
            Ok(Some(m.trim().to_lowercase()))
        }
        None => Ok(None),
    }
}

/// Outcome of applying a patch to an order, before anything is written
#[derive(Debug)]
struct UpdatePlan {
    order: Order,
    events: Vec<DomainEvent>,
    /// Rider to flip online → busy
    claim_rider: Option<i64>,
    /// Riders to put back online if nothing else is in flight
    release_riders: Vec<i64>,
}

/// Apply `patch` to `current` (pure)
fn plan_update(current: &Order, patch: &OrderUpdate, actor: i64, now: i64) -> AppResult<UpdatePlan> {
    let mut next = current.clone();
    let mut events = Vec::new();

    if let Some(to) = patch.status {
        transitions::check_status(current.order_type, current.status, to)?;
        if to != current.status {
            next.status = to;
            events.push(DomainEvent::OrderStatusChanged {
                order_id: current.id,
                from: current.status,
                to,
            });
        }
    }

    if let Some(to) = patch.payment_status {
        transitions::check_payment(current.payment_status, to)?;
        if to != current.payment_status {
            next.payment_status = to;
            events.push(DomainEvent::PaymentStatusChanged {
                order_id: current.id,
                from: current.payment_status,
                to,
            });
        }
    }

    if patch.payment_method.is_some() {
        next.payment_method = normalize_payment_method(patch.payment_method.as_deref())?;
    }
    if let Some(paid) = patch.paid_amount {
        money::validate_amount(paid, "paid_amount")?;
        next.paid_amount = money::round(paid);
    }

    if patch.touches_money() {
        for (value, field) in [
            (patch.subtotal, "subtotal"),
            (patch.tax_amount, "tax_amount"),
            (patch.discount_amount, "discount_amount"),
            (patch.delivery_charge, "delivery_charge"),
        ] {
            if let Some(v) = value {
                money::validate_amount(v, field)?;
            }
        }
        next.subtotal = patch.subtotal.map(money::round).unwrap_or(current.subtotal);
        next.tax_amount = patch.tax_amount.map(money::round).unwrap_or(current.tax_amount);
        next.discount_amount = patch
            .discount_amount
            .map(money::round)
            .unwrap_or(current.discount_amount);
        next.delivery_charge = patch
            .delivery_charge
            .map(money::round)
            .unwrap_or(current.delivery_charge);
        next.total_amount = money::order_total(
            next.subtotal,
            next.tax_amount,
            next.discount_amount,
            next.delivery_charge,
        )?;
    }

    if let Some(staff_id) = patch.staff_id {
        next.staff_id = Some(staff_id);
    }
    if let Some(table_id) = patch.table_id {
        next.table_id = Some(table_id);
    }
    if patch.notes.is_some() {
        validate_optional_text(&patch.notes, "notes", MAX_NOTE_LEN)?;
        next.notes = patch.notes.clone();
    }

    let mut claim_rider = None;
    let mut release_riders = Vec::new();
    if let Some(rider_id) = patch.rider_id
        && current.rider_id != Some(rider_id)
    {
        if current.order_type != OrderType::Delivery {
            return Err(AppError::invalid_field(
                "rider_id",
                "only delivery orders can be assigned a rider",
            ));
        }
        if next.status.is_terminal() {
            return Err(AppError::conflict(format!(
                "Order {} is {} and can no longer be assigned",
                current.order_number, next.status
            )));
        }
        claim_rider = Some(rider_id);
        release_riders.extend(current.rider_id);
        next.rider_id = Some(rider_id);
        events.push(DomainEvent::RiderAssigned {
            order_id: current.id,
            rider_id,
        });
    }

    if next.status == OrderStatus::OutForDelivery
        && current.status != OrderStatus::OutForDelivery
        && next.rider_id.is_none()
    {
        return Err(AppError::invalid_field(
            "rider_id",
            "must be assigned before the order goes out for delivery",
        ));
    }

    if next.status.is_terminal()
        && !current.status.is_terminal()
        && let Some(rider_id) = next.rider_id
    {
        release_riders.push(rider_id);
    }

    next.updated_by = actor;
    next.updated_at = now;

    Ok(UpdatePlan {
        order: next,
        events,
        claim_rider,
        release_riders,
    })
}

/// Partially update an order
///
/// Customers may only cancel their own order while it is pending or
/// confirmed, and the carrying rider may mark it delivered; anything else
/// needs `can_edit_orders`.
pub async fn update(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    order_id: i64,
    patch: OrderUpdate,
) -> AppResult<Order> {
    let user = authenticated(principal)?;
    let current = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

    if !user.has(Capability::EditOrders) {
        let allowed = if patch.is_cancel_only() {
            can_cancel_own_order(user, &current)
        } else if patch.is_status_only(OrderStatus::Delivered) {
            let rider_profile = rider_profile_id(state, user).await?;
            can_deliver_own_order(user, &current, rider_profile)
        } else {
            false
        };
        if !allowed {
            authorize(Some(user), Capability::EditOrders)?;
        }
    }

    let plan = plan_update(&current, &patch, user.id, shared::util::now_millis())?;
    let mut rider_events = Vec::new();

    let mut tx = state.pool.begin().await?;
    if !order::update_guarded(&mut *tx, &plan.order, current.version).await? {
        return Err(version_conflict(&current));
    }
    if let Some(rider_id) = plan.claim_rider {
        riders::service::claim(&mut tx, rider_id, order_id).await?;
        rider_events.push(DomainEvent::RiderStatusChanged {
            rider_id,
            from: RiderStatus::Online,
            to: RiderStatus::Busy,
        });
    }
    for &rider_id in &plan.release_riders {
        if riders::service::release(&mut tx, rider_id).await? {
            rider_events.push(DomainEvent::RiderStatusChanged {
                rider_id,
                from: RiderStatus::Busy,
                to: RiderStatus::Online,
            });
        }
    }
    tx.commit().await?;

    let mut updated = plan.order;
    updated.version = current.version + 1;

    tracing::info!(
        order_id,
        order_number = %updated.order_number,
        status = %updated.status,
        version = updated.version,
        actor = user.id,
        "Order updated"
    );
    for event in plan.events.into_iter().chain(rider_events) {
        state.events.emit(user.id, event);
    }
    Ok(updated)
}

/// Read one order (customer, handling staff, assigned rider, report viewers)
pub async fn show(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    order_id: i64,
) -> AppResult<Order> {
    let user = authenticated(principal)?;
    let order = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

    let rider_profile_id = rider_profile_id(state, user).await?;
    if !can_read_order(user, &order, rider_profile_id) {
        authorize(Some(user), Capability::ViewReports)?;
    }
    Ok(order)
}

/// List orders, newest first
///
/// Report viewers see everything; others see orders they placed, handle or
/// deliver.
pub async fn index(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    query: &ListOrdersQuery,
) -> AppResult<Vec<Order>> {
    let user = authenticated(principal)?;
    let (limit, offset) = page_bounds(query.limit, query.offset)?;

    let visible_to = if user.has(Capability::ViewReports) {
        None
    } else {
        Some(OrderVisibility {
            user_id: user.id,
            rider_id: rider_profile_id(state, user).await?,
        })
    };

    let orders = order::list(
        &state.pool,
        &OrderFilter {
            status: query.status,
            order_type: query.order_type,
            rider_id: None,
            visible_to,
            limit,
            offset,
        },
    )
    .await?;
    Ok(orders)
}

/// Delete a pending or cancelled order
pub async fn destroy(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    order_id: i64,
) -> AppResult<()> {
    let user = authorize(principal, Capability::DeleteOrders)?;
    let order = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

    let mut tx = state.pool.begin().await?;
    if !order::delete_if_deletable(&mut *tx, order_id).await? {
        return Err(AppError::with_message(
            ErrorCode::OrderNotDeletable,
            format!(
                "Order {} is {}, only pending or cancelled orders can be deleted",
                order.order_number, order.status
            ),
        )
        .with_detail("status", order.status.as_str()));
    }
    let mut released = None;
    if let Some(rider_id) = order.rider_id
        && riders::service::release(&mut tx, rider_id).await?
    {
        released = Some(rider_id);
    }
    tx.commit().await?;

    tracing::info!(
        order_id,
        order_number = %order.order_number,
        actor = user.id,
        "Order deleted"
    );
    if let Some(rider_id) = released {
        state.events.emit(
            user.id,
            DomainEvent::RiderStatusChanged {
                rider_id,
                from: RiderStatus::Busy,
                to: RiderStatus::Online,
            },
        );
    }
    Ok(())
}

/// The principal's rider profile id, looked up only for delivering roles
async fn rider_profile_id(state: &ServerState, user: &CurrentUser) -> AppResult<Option<i64>> {
    if !user.has(Capability::PerformDelivery) {
        return Ok(None);
    }
    let profile = rider::find_by_user(&state.pool, user.id).await?;
    Ok(profile.map(|p| p.id))
}

pub(crate) fn order_not_found(order_id: i64) -> AppError {
    AppError::entity_not_found(ErrorCode::OrderNotFound, "Order", order_id)
}

pub(crate) fn version_conflict(order: &Order) -> AppError {
    AppError::with_message(
        ErrorCode::OrderVersionConflict,
        format!("Order {} was modified concurrently", order.order_number),
    )
    .with_detail("version", order.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{counter_order, delivery_order, principal, test_state};
    use shared::models::OrderItemInput;

    fn status(to: OrderStatus) -> OrderUpdate {
        OrderUpdate {
            status: Some(to),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_staff_creates_order_with_computed_total() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;

        let order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        assert!(number::is_well_formed(&order.order_number));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(order.total_amount, 25.0);
        assert_eq!(order.staff_id, Some(staff.id));
        assert_eq!(order.created_by, staff.id);
        assert_eq!(order.version, 0);

        let stored = show(&state, Some(&staff), order.id).await.unwrap();
        assert_eq!(stored.items.len(), 2);
        assert_eq!(stored.total_amount, 25.0);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_payloads() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;

        let mut empty = delivery_order(40.0, -3.0);
        empty.items.clear();
        let err = create(&state, Some(&staff), empty).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderEmpty);

        let mut zero_qty = delivery_order(40.0, -3.0);
        zero_qty.items[0].quantity = 0;
        let err = create(&state, Some(&staff), zero_qty).await.unwrap_err();
        assert_eq!(err.detail_str("field"), Some("items[0].quantity"));

        let mut negative = delivery_order(40.0, -3.0);
        negative.tax_amount = -1.0;
        let err = create(&state, Some(&staff), negative).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentInvalidAmount);

        let mut no_address = delivery_order(40.0, -3.0);
        no_address.delivery_address = None;
        let err = create(&state, Some(&staff), no_address).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DeliveryAddressRequired);

        let mut wrong_subtotal = delivery_order(40.0, -3.0);
        wrong_subtotal.subtotal = 19.0;
        let err = create(&state, Some(&staff), wrong_subtotal).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderTotalMismatch);
        assert_eq!(err.detail_str("field"), Some("subtotal"));

        let mut wrong_total = delivery_order(40.0, -3.0);
        wrong_total.total_amount = Some(30.0);
        let err = create(&state, Some(&staff), wrong_total).await.unwrap_err();
        assert_eq!(err.detail_str("field"), Some("total_amount"));

        let mut big_discount = delivery_order(40.0, -3.0);
        big_discount.discount_amount = 100.0;
        big_discount.total_amount = None;
        let err = create(&state, Some(&staff), big_discount).await.unwrap_err();
        assert_eq!(err.detail_str("field"), Some("discount_amount"));

        let mut bad_coords = delivery_order(95.0, -3.0);
        bad_coords.total_amount = None;
        let err = create(&state, Some(&staff), bad_coords).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCoordinates);
    }

    #[tokio::test]
    async fn test_total_within_tolerance_is_accepted() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;

        let mut payload = counter_order(OrderType::Takeaway, "cash", 10.0);
        payload.items = vec![OrderItemInput {
            menu_item_id: 1,
            item_name: "Tea".into(),
            unit_price: 3.33,
            quantity: 3,
            special_instructions: None,
        }];
        payload.subtotal = 9.99;
        payload.total_amount = Some(9.995);

        let order = create(&state, Some(&staff), payload).await.unwrap();
        assert_eq!(order.total_amount, 9.99);
    }

    #[tokio::test]
    async fn test_customer_gets_pending_order_for_themself() {
        let state = test_state().await;
        let customer = principal(&state, "cal", "customer").await;

        let order = create(&state, Some(&customer), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        assert_eq!(order.customer_id, Some(customer.id));
        assert_eq!(order.staff_id, None);

        let mut sneaky = delivery_order(40.0, -3.0);
        sneaky.status = Some(OrderStatus::Confirmed);
        let err = create(&state, Some(&customer), sneaky).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.detail_str("capability"), Some("can_edit_orders"));

        let rider = principal(&state, "rita", "rider").await;
        let err = create(&state, Some(&rider), delivery_order(40.0, -3.0))
            .await
            .unwrap_err();
        assert_eq!(err.detail_str("capability"), Some("can_place_orders"));

        let err = create(&state, None, delivery_order(40.0, -3.0))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }

    #[tokio::test]
    async fn test_order_number_collisions_retry_then_give_up() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;

        let first = create_with_numbers(&state, Some(&staff), delivery_order(40.0, -3.0), || {
            "ORD-AAAAAAAAAA".to_string()
        })
        .await
        .unwrap();
        assert_eq!(first.order_number, "ORD-AAAAAAAAAA");

        // Collides once, then gets a fresh number
        let mut numbers = vec!["ORD-BBBBBBBBBB", "ORD-AAAAAAAAAA"];
        let second = create_with_numbers(&state, Some(&staff), delivery_order(40.0, -3.0), || {
            numbers.pop().unwrap_or("ORD-CCCCCCCCCC").to_string()
        })
        .await
        .unwrap();
        assert_eq!(second.order_number, "ORD-BBBBBBBBBB");

        let err = create_with_numbers(&state, Some(&staff), delivery_order(40.0, -3.0), || {
            "ORD-AAAAAAAAAA".to_string()
        })
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNumberExhausted);
    }

    #[tokio::test]
    async fn test_status_walk_and_terminal_lock() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let order = create(&state, Some(&staff), counter_order(OrderType::Takeaway, "card", 10.0))
            .await
            .unwrap();

        let mut current = order;
        for to in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            current = update(&state, Some(&staff), current.id, status(to)).await.unwrap();
            assert_eq!(current.status, to);
        }
        assert_eq!(current.version, 4);

        let err = update(&state, Some(&staff), current.id, status(OrderStatus::Confirmed))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);

        // Same status is a no-op rather than an error
        let same = update(&state, Some(&staff), current.id, status(OrderStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(same.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn test_money_update_recomputes_total() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();

        let updated = update(
            &state,
            Some(&staff),
            order.id,
            OrderUpdate {
                discount_amount: Some(5.0),
                payment_status: Some(PaymentStatus::Paid),
                paid_amount: Some(20.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.total_amount, 20.0);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
        assert_eq!(updated.updated_by, staff.id);

        let err = update(
            &state,
            Some(&staff),
            order.id,
            OrderUpdate {
                payment_status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransition);
    }

    #[tokio::test]
    async fn test_customer_cancellation_rules() {
        let state = test_state().await;
        let alice = principal(&state, "alice", "customer").await;
        let bob = principal(&state, "bob", "customer").await;
        let staff = principal(&state, "sam", "staff").await;

        let order = create(&state, Some(&alice), delivery_order(40.0, -3.0))
            .await
            .unwrap();

        let err = update(&state, Some(&bob), order.id, status(OrderStatus::Cancelled))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        assert_eq!(err.detail_str("capability"), Some("can_edit_orders"));

        let err = update(&state, Some(&alice), order.id, status(OrderStatus::Confirmed))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let cancelled = update(&state, Some(&alice), order.id, status(OrderStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.updated_by, alice.id);

        // Too late once the kitchen has started
        let late = create(&state, Some(&alice), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        update(&state, Some(&staff), late.id, status(OrderStatus::Confirmed))
            .await
            .unwrap();
        update(&state, Some(&staff), late.id, status(OrderStatus::Preparing))
            .await
            .unwrap();
        let err = update(&state, Some(&alice), late.id, status(OrderStatus::Cancelled))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn test_stale_version_loses() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();

        // Someone else writes between our read and our write
        let mut racer = order.clone();
        racer.notes = Some("racer".into());
        assert!(order::update_guarded(&state.pool, &racer, 0).await.unwrap());

        let plan = plan_update(&order, &status(OrderStatus::Confirmed), staff.id, 1).unwrap();
        assert!(!order::update_guarded(&state.pool, &plan.order, order.version)
            .await
            .unwrap());

        let stored = order::find_by_id(&state.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.notes.as_deref(), Some("racer"));
    }

    #[tokio::test]
    async fn test_out_for_delivery_needs_rider_and_terminal_releases_rider() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let rider_user = principal(&state, "rita", "rider").await;
        riders::service::update_status(&state, Some(&rider_user), rider_user.id, RiderStatus::Online)
            .await
            .unwrap();
        let profile = rider::find_by_user(&state.pool, rider_user.id).await.unwrap().unwrap();

        let mut order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        for to in [OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::Ready] {
            order = update(&state, Some(&staff), order.id, status(to)).await.unwrap();
        }

        let err = update(&state, Some(&staff), order.id, status(OrderStatus::OutForDelivery))
            .await
            .unwrap_err();
        assert_eq!(err.detail_str("field"), Some("rider_id"));

        order = update(
            &state,
            Some(&staff),
            order.id,
            OrderUpdate {
                status: Some(OrderStatus::OutForDelivery),
                rider_id: Some(profile.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let busy = rider::find_by_id(&state.pool, profile.id).await.unwrap().unwrap();
        assert_eq!(busy.status, RiderStatus::Busy);

        // The rider reads the order they carry
        let seen = show(&state, Some(&rider_user), order.id).await.unwrap();
        assert_eq!(seen.id, order.id);

        update(&state, Some(&staff), order.id, status(OrderStatus::Delivered))
            .await
            .unwrap();
        let free = rider::find_by_id(&state.pool, profile.id).await.unwrap().unwrap();
        assert_eq!(free.status, RiderStatus::Online);
    }

    #[tokio::test]
    async fn test_carrying_rider_marks_order_delivered() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let rider_user = principal(&state, "rita", "rider").await;
        let stranger = principal(&state, "rob", "rider").await;
        riders::service::update_status(&state, Some(&rider_user), rider_user.id, RiderStatus::Online)
            .await
            .unwrap();
        let profile = rider::find_by_user(&state.pool, rider_user.id).await.unwrap().unwrap();

        let mut order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        for to in [OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::Ready] {
            order = update(&state, Some(&staff), order.id, status(to)).await.unwrap();
        }

        update(
            &state,
            Some(&staff),
            order.id,
            OrderUpdate {
                rider_id: Some(profile.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Assigned but not on the road yet
        let err = update(&state, Some(&rider_user), order.id, status(OrderStatus::Delivered))
            .await
            .unwrap_err();
        assert_eq!(err.detail_str("capability"), Some("can_edit_orders"));

        update(&state, Some(&staff), order.id, status(OrderStatus::OutForDelivery))
            .await
            .unwrap();

        let err = update(&state, Some(&stranger), order.id, status(OrderStatus::Delivered))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        let err = update(&state, Some(&rider_user), order.id, status(OrderStatus::Cancelled))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);

        let delivered = update(&state, Some(&rider_user), order.id, status(OrderStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.updated_by, rider_user.id);
        let free = rider::find_by_id(&state.pool, profile.id).await.unwrap().unwrap();
        assert_eq!(free.status, RiderStatus::Online);
    }

    #[tokio::test]
    async fn test_assigning_offline_rider_rolls_back() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let rider_user = principal(&state, "rita", "rider").await;
        let profile = rider::ensure_for_user(&state.pool, rider_user.id).await.unwrap();

        let order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        let err = update(
            &state,
            Some(&staff),
            order.id,
            OrderUpdate {
                rider_id: Some(profile.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::RiderNotAvailable);

        let stored = order::find_by_id(&state.pool, order.id).await.unwrap().unwrap();
        assert_eq!(stored.rider_id, None);
        assert_eq!(stored.version, 0);

        let takeaway = create(&state, Some(&staff), counter_order(OrderType::Takeaway, "cash", 10.0))
            .await
            .unwrap();
        let err = update(
            &state,
            Some(&staff),
            takeaway.id,
            OrderUpdate {
                rider_id: Some(profile.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.detail_str("field"), Some("rider_id"));
    }

    #[tokio::test]
    async fn test_visibility_of_show_and_index() {
        let state = test_state().await;
        let alice = principal(&state, "alice", "customer").await;
        let bob = principal(&state, "bob", "customer").await;
        let manager = principal(&state, "mia", "manager").await;

        let order = create(&state, Some(&alice), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        create(&state, Some(&bob), delivery_order(40.0, -3.0))
            .await
            .unwrap();

        show(&state, Some(&alice), order.id).await.unwrap();
        show(&state, Some(&manager), order.id).await.unwrap();
        let err = show(&state, Some(&bob), order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::PermissionDenied);
        let err = show(&state, Some(&bob), 999).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);

        let mine = index(&state, Some(&alice), &ListOrdersQuery::default())
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, order.id);

        let all = index(&state, Some(&manager), &ListOrdersQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let none = index(
            &state,
            Some(&manager),
            &ListOrdersQuery {
                status: Some(OrderStatus::Delivered),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_destroy_only_pending_or_cancelled() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let manager = principal(&state, "mia", "manager").await;

        let order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        let err = destroy(&state, Some(&staff), order.id).await.unwrap_err();
        assert_eq!(err.detail_str("capability"), Some("can_delete_orders"));

        update(&state, Some(&staff), order.id, status(OrderStatus::Confirmed))
            .await
            .unwrap();
        let err = destroy(&state, Some(&manager), order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotDeletable);

        update(&state, Some(&staff), order.id, status(OrderStatus::Cancelled))
            .await
            .unwrap();
        destroy(&state, Some(&manager), order.id).await.unwrap();

        let err = destroy(&state, Some(&manager), order.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }

    #[tokio::test]
    async fn test_events_follow_writes() {
        let state = test_state().await;
        let staff = principal(&state, "sam", "staff").await;
        let mut events = state.events.subscribe();

        let order = create(&state, Some(&staff), delivery_order(40.0, -3.0))
            .await
            .unwrap();
        update(&state, Some(&staff), order.id, status(OrderStatus::Confirmed))
            .await
            .unwrap();

        let created = events.recv().await.unwrap();
        assert_eq!(created.event.name(), "order_created");
        assert_eq!(created.actor_id, staff.id);
        let changed = events.recv().await.unwrap();
        assert_eq!(
            changed.event,
            DomainEvent::OrderStatusChanged {
                order_id: order.id,
                from: OrderStatus::Pending,
                to: OrderStatus::Confirmed,
            }
        );
        assert!(changed.seq > created.seq);
    }
}
