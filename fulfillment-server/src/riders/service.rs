//! Rider availability, location and assignment
//!
//! 状态图:
//!
//! ```text
//! offline ⇄ online ⇄ busy
//! ```
//!
//! `busy → offline` is rejected: a rider carrying an order must finish or be
//! released first. Assignment flips `online → busy`; the order reaching a
//! terminal status flips the rider back once nothing else is in flight.

use shared::event::DomainEvent;
use shared::models::{
    Capability, Order, OrderStatus, OrderType, RiderDashboard, RiderProfile, RiderStatus,
};
use sqlx::SqliteConnection;

use crate::auth::CurrentUser;
use crate::auth::permissions::{authenticated, authorize, authorize_any, can_act_for_rider};
use crate::core::ServerState;
use crate::db::repository::order::{self, MAX_PAGE_SIZE, OrderFilter};
use crate::db::repository::{rider, user};
use crate::orders::ListOrdersQuery;
use crate::orders::service::{order_not_found, version_conflict};
use crate::riders::geo;
use crate::utils::validation::page_bounds;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Check a rider status change (same status is a no-op)
pub fn check_status(from: RiderStatus, to: RiderStatus) -> AppResult<()> {
    use RiderStatus::*;
    let allowed = from == to
        || matches!(
            (from, to),
            (Offline, Online) | (Online, Offline) | (Online, Busy) | (Busy, Online)
        );
    if allowed {
        Ok(())
    } else {
        Err(AppError::invalid_transition("rider", from, to))
    }
}

/// Change a rider's availability
///
/// The rider may change their own status; delivery managers may change
/// anyone's. The profile is created (offline) on first use.
pub async fn update_status(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    rider_user_id: i64,
    status: RiderStatus,
) -> AppResult<RiderProfile> {
    let user = authenticated(principal)?;
    if !can_act_for_rider(user, rider_user_id) {
        let needed = if user.id == rider_user_id {
            Capability::PerformDelivery
        } else {
            Capability::ManageDelivery
        };
        authorize(Some(user), needed)?;
    }
    if user.id != rider_user_id {
        ensure_rider_user(state, rider_user_id).await?;
    }

    let profile = rider::ensure_for_user(&state.pool, rider_user_id).await?;
    check_status(profile.status, status)?;
    if profile.status == status {
        return Ok(profile);
    }

    if profile.status == RiderStatus::Busy {
        let active = order::count_active_for_rider(&state.pool, profile.id).await?;
        if active > 0 {
            return Err(AppError::conflict(format!(
                "Rider {} still has {active} active order(s)",
                profile.id
            ))
            .with_detail("active_orders", active));
        }
    }

    if !rider::transition_status(&state.pool, profile.id, profile.status, status).await? {
        return Err(AppError::conflict(format!(
            "Rider {} changed status concurrently",
            profile.id
        )));
    }

    tracing::info!(
        rider_id = profile.id,
        from = %profile.status,
        to = %status,
        actor = user.id,
        "Rider status changed"
    );
    state.events.emit(
        user.id,
        DomainEvent::RiderStatusChanged {
            rider_id: profile.id,
            from: profile.status,
            to: status,
        },
    );

    find_profile(state, profile.id).await
}

/// Record the rider's current position; last write wins
pub async fn update_location(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    rider_user_id: i64,
    latitude: f64,
    longitude: f64,
) -> AppResult<RiderProfile> {
    let user = authorize(principal, Capability::PerformDelivery)?;
    if user.id != rider_user_id {
        return Err(AppError::permission_denied(Capability::PerformDelivery));
    }
    geo::validate_coordinates(latitude, longitude)?;

    let profile = rider::ensure_for_user(&state.pool, rider_user_id).await?;
    let now = shared::util::now_millis();
    rider::update_location(&state.pool, profile.id, latitude, longitude, now).await?;

    tracing::debug!(rider_id = profile.id, latitude, longitude, "Rider location updated");
    find_profile(state, profile.id).await
}

/// Give an unassigned delivery order to the nearest online rider
///
/// Candidates are tried nearest first. Each attempt flips the rider
/// `online → busy` and writes the order in one transaction, so a rider
/// taken by a concurrent assignment is skipped and the next one tried.
pub async fn assign(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    order_id: i64,
) -> AppResult<Order> {
    let user = authorize_any(principal, &[Capability::EditOrders, Capability::ManageDelivery])?;
    let current = order::find_by_id(&state.pool, order_id)
        .await?
        .ok_or_else(|| order_not_found(order_id))?;

    if current.order_type != OrderType::Delivery {
        return Err(AppError::invalid_field(
            "order_type",
            "only delivery orders can be assigned a rider",
        ));
    }
    if current.status.is_terminal() {
        return Err(AppError::conflict(format!(
            "Order {} is {} and can no longer be assigned",
            current.order_number, current.status
        )));
    }
    if let Some(rider_id) = current.rider_id {
        return Err(AppError::with_message(
            ErrorCode::RiderAlreadyAssigned,
            format!("Order {} already has rider {rider_id}", current.order_number),
        )
        .with_detail("rider_id", rider_id));
    }
    let target = current
        .delivery_address
        .as_ref()
        .and_then(|address| address.coordinates())
        .ok_or_else(|| {
            AppError::field_error(
                ErrorCode::DeliveryCoordinatesMissing,
                "delivery_address",
                "has no coordinates",
            )
        })?;

    let candidates = geo::rank_by_distance(rider::find_available(&state.pool).await?, target);
    for (candidate, distance_km) in candidates {
        let mut tx = state.pool.begin().await?;
        if !rider::claim_idle(&mut *tx, candidate.id, order_id).await? {
            tracing::debug!(rider_id = candidate.id, "Rider taken concurrently, trying next");
            continue;
        }

        let mut assigned = current.clone();
        assigned.rider_id = Some(candidate.id);
        assigned.updated_by = user.id;
        assigned.updated_at = shared::util::now_millis();
        if !order::update_guarded(&mut *tx, &assigned, current.version).await? {
            return Err(version_conflict(&current));
        }
        tx.commit().await?;
        assigned.version = current.version + 1;

        tracing::info!(
            order_id,
            rider_id = candidate.id,
            distance_km,
            actor = user.id,
            "Rider assigned"
        );
        state.events.emit(
            user.id,
            DomainEvent::RiderStatusChanged {
                rider_id: candidate.id,
                from: RiderStatus::Online,
                to: RiderStatus::Busy,
            },
        );
        state.events.emit(
            user.id,
            DomainEvent::RiderAssigned {
                order_id,
                rider_id: candidate.id,
            },
        );
        return Ok(assigned);
    }

    tracing::warn!(order_id, "No rider available for assignment");
    Err(AppError::no_rider_available())
}

/// The rider's profile and the orders they are delivering right now
pub async fn dashboard(
    state: &ServerState,
    principal: Option<&CurrentUser>,
) -> AppResult<RiderDashboard> {
    let user = authorize(principal, Capability::PerformDelivery)?;
    let profile = rider::ensure_for_user(&state.pool, user.id).await?;
    let active_orders = order::list(
        &state.pool,
        &OrderFilter {
            status: Some(OrderStatus::OutForDelivery),
            rider_id: Some(profile.id),
            limit: MAX_PAGE_SIZE,
            ..Default::default()
        },
    )
    .await?;
    Ok(RiderDashboard {
        profile,
        active_orders,
    })
}

/// Orders ever assigned to the rider, newest first
pub async fn orders(
    state: &ServerState,
    principal: Option<&CurrentUser>,
    query: &ListOrdersQuery,
) -> AppResult<Vec<Order>> {
    let user = authorize(principal, Capability::PerformDelivery)?;
    let (limit, offset) = page_bounds(query.limit, query.offset)?;
    let profile = rider::ensure_for_user(&state.pool, user.id).await?;
    let orders = order::list(
        &state.pool,
        &OrderFilter {
            status: query.status,
            order_type: query.order_type,
            rider_id: Some(profile.id),
            limit,
            offset,
            ..Default::default()
        },
    )
    .await?;
    Ok(orders)
}

// ── Helpers used inside order transactions ──────────────────────────

/// Flip a specific rider `online → busy` for `order_id` inside the caller's
/// transaction. A rider still carrying another active order is refused.
pub(crate) async fn claim(
    conn: &mut SqliteConnection,
    rider_id: i64,
    order_id: i64,
) -> AppResult<RiderProfile> {
    let profile = rider::find_by_id(&mut *conn, rider_id)
        .await?
        .ok_or_else(|| AppError::entity_not_found(ErrorCode::RiderNotFound, "Rider", rider_id))?;

    if !rider::claim_idle(&mut *conn, rider_id, order_id).await? {
        let reason = if profile.status == RiderStatus::Online {
            "still has an active delivery".to_string()
        } else {
            format!("is {}, not online", profile.status)
        };
        return Err(AppError::with_message(
            ErrorCode::RiderNotAvailable,
            format!("Rider {rider_id} {reason}"),
        )
        .with_detail("status", profile.status.as_str()));
    }
    Ok(profile)
}

/// Put a busy rider back online once none of their orders is in flight.
///
/// Returns true when the rider was flipped.
pub(crate) async fn release(conn: &mut SqliteConnection, rider_id: i64) -> AppResult<bool> {
    if order::count_active_for_rider(&mut *conn, rider_id).await? > 0 {
        return Ok(false);
    }
    let flipped =
        rider::transition_status(&mut *conn, rider_id, RiderStatus::Busy, RiderStatus::Online)
            .await?;
    Ok(flipped)
}

async fn find_profile(state: &ServerState, id: i64) -> AppResult<RiderProfile> {
    rider::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::entity_not_found(ErrorCode::RiderNotFound, "Rider", id))
}

/// A manager may only manage users whose role delivers
async fn ensure_rider_user(state: &ServerState, user_id: i64) -> AppResult<()> {
    let (_, role) = user::find_with_role(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::entity_not_found(ErrorCode::NotFound, "User", user_id))?;
    if role.is_some_and(|r| r.grants(Capability::PerformDelivery)) {
        Ok(())
    } else {
        Err(AppError::invalid_field("user_id", "is not a rider"))
    }
}
