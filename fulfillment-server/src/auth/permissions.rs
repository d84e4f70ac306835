//! Permission Evaluator
//!
//! Coarse per-action checks over the closed [`Capability`] set, plus pure
//! per-resource predicates that call sites compose with them.
//!
//! ## 设计原则
//! - principal 总是显式传入，从不读取全局状态
//! - 无角色的用户没有任何权限
//! - 资源级判断 (自己的订单、自己的班次) 是纯函数，不查库

use shared::models::{Capability, Order, OrderStatus, StaffShift};

use crate::auth::CurrentUser;
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// 管理员与经理：全部权限
pub const DEFAULT_ADMIN_CAPABILITIES: &[Capability] = &Capability::ALL;

/// 前台员工：下单、改单、班次
pub const DEFAULT_STAFF_CAPABILITIES: &[Capability] = &[
    Capability::PlaceOrders,
    Capability::EditOrders,
    Capability::PerformShifts,
];

/// 骑手：配送
pub const DEFAULT_RIDER_CAPABILITIES: &[Capability] = &[Capability::PerformDelivery];

/// 顾客：下单
pub const DEFAULT_CUSTOMER_CAPABILITIES: &[Capability] = &[Capability::PlaceOrders];

/// Capabilities of a seeded system role
pub fn default_capabilities(role_name: &str) -> &'static [Capability] {
    match role_name {
        "admin" | "manager" => DEFAULT_ADMIN_CAPABILITIES,
        "staff" => DEFAULT_STAFF_CAPABILITIES,
        "rider" => DEFAULT_RIDER_CAPABILITIES,
        "customer" => DEFAULT_CUSTOMER_CAPABILITIES,
        _ => &[],
    }
}

/// Authorize `principal` for `capability`
///
/// - no principal → `Unauthenticated`
/// - no role, or the role lacks the flag → `PermissionDenied(capability)`
///
/// Returns the authorized principal so call sites can keep using it.
pub fn authorize(principal: Option<&CurrentUser>, capability: Capability) -> AppResult<&CurrentUser> {
    let user = principal.ok_or_else(AppError::unauthenticated)?;
    if user.has(capability) {
        return Ok(user);
    }

    security_log!(
        "WARN",
        "permission_denied",
        user_id = user.id,
        username = user.username.clone(),
        required_capability = capability.as_str()
    );
    Err(AppError::permission_denied(capability))
}

/// Authorize for any of `capabilities`; the denial names the first one
pub fn authorize_any<'a>(
    principal: Option<&'a CurrentUser>,
    capabilities: &[Capability],
) -> AppResult<&'a CurrentUser> {
    let user = principal.ok_or_else(AppError::unauthenticated)?;
    if user.has_any(capabilities) {
        return Ok(user);
    }
    match capabilities.first() {
        Some(first) => authorize(Some(user), *first),
        None => Err(AppError::internal("authorize_any called without capabilities")),
    }
}

/// Just require a principal
pub fn authenticated(principal: Option<&CurrentUser>) -> AppResult<&CurrentUser> {
    principal.ok_or_else(AppError::unauthenticated)
}

/// Customer, handling staff member, assigned rider, or report viewers.
///
/// `rider_profile_id` is the principal's rider profile, if it has one.
pub fn can_read_order(user: &CurrentUser, order: &Order, rider_profile_id: Option<i64>) -> bool {
    user.has(Capability::ViewReports)
        || order.customer_id == Some(user.id)
        || order.staff_id == Some(user.id)
        || (rider_profile_id.is_some() && order.rider_id == rider_profile_id)
}

/// A customer may cancel their own order until the kitchen starts on it
pub fn can_cancel_own_order(user: &CurrentUser, order: &Order) -> bool {
    order.customer_id == Some(user.id)
        && matches!(order.status, OrderStatus::Pending | OrderStatus::Confirmed)
}

/// The assigned rider may hand over the order they are carrying
pub fn can_deliver_own_order(
    user: &CurrentUser,
    order: &Order,
    rider_profile_id: Option<i64>,
) -> bool {
    user.has(Capability::PerformDelivery)
        && rider_profile_id.is_some()
        && order.rider_id == rider_profile_id
        && order.status == OrderStatus::OutForDelivery
}

/// Shift owner or report viewers
pub fn can_read_shift(user: &CurrentUser, shift: &StaffShift) -> bool {
    shift.user_id == user.id || user.has(Capability::ViewReports)
}

/// The rider themself (with delivery capability) or a delivery manager
pub fn can_act_for_rider(user: &CurrentUser, rider_user_id: i64) -> bool {
    (user.id == rider_user_id && user.has(Capability::PerformDelivery))
        || user.has(Capability::ManageDelivery)
}
