//! Order Repository
//!
//! Orders are always returned with their items. List queries load the items
//! of every returned order in one extra statement.

use std::collections::HashMap;

use super::{RepoError, RepoResult};
use shared::models::{DeliveryAddress, Order, OrderItem, OrderStatus, OrderType, PaymentStatus};
use sqlx::{Acquire, QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

const ORDER_COLUMNS: &str = "id, order_number, status, order_type, payment_status, payment_method, subtotal, tax_amount, discount_amount, delivery_charge, total_amount, paid_amount, table_id, rider_id, staff_id, customer_id, delivery_address, coupon_code, notes, created_by, updated_by, created_at, updated_at, version";

const ITEM_COLUMNS: &str = "id, order_id, menu_item_id, item_name, unit_price, quantity, total_price, special_instructions";

/// Statuses an order is never moved out of
pub(crate) const TERMINAL_STATUSES: &str = "('delivered', 'cancelled')";

/// Maximum page size for list queries
pub const MAX_PAGE_SIZE: i64 = 200;

/// Who may see which rows when the caller lacks report access
#[derive(Debug, Clone, Copy)]
pub struct OrderVisibility {
    /// Matches customer_id or staff_id
    pub user_id: i64,
    /// Matches rider_id
    pub rider_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub order_type: Option<OrderType>,
    pub rider_id: Option<i64>,
    pub visible_to: Option<OrderVisibility>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    order_number: String,
    status: OrderStatus,
    order_type: OrderType,
    payment_status: PaymentStatus,
    payment_method: Option<String>,
    subtotal: f64,
    tax_amount: f64,
    discount_amount: f64,
    delivery_charge: f64,
    total_amount: f64,
    paid_amount: f64,
    table_id: Option<i64>,
    rider_id: Option<i64>,
    staff_id: Option<i64>,
    customer_id: Option<i64>,
    delivery_address: Option<String>,
    coupon_code: Option<String>,
    notes: Option<String>,
    created_by: i64,
    updated_by: i64,
    created_at: i64,
    updated_at: i64,
    version: i64,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> RepoResult<Order> {
        let delivery_address = self
            .delivery_address
            .as_deref()
            .map(serde_json::from_str::<DeliveryAddress>)
            .transpose()
            .map_err(|e| {
                RepoError::Database(format!(
                    "Corrupt delivery_address on order {}: {e}",
                    self.id
                ))
            })?;

        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            status: self.status,
            order_type: self.order_type,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            delivery_charge: self.delivery_charge,
            total_amount: self.total_amount,
            paid_amount: self.paid_amount,
            table_id: self.table_id,
            rider_id: self.rider_id,
            staff_id: self.staff_id,
            customer_id: self.customer_id,
            delivery_address,
            coupon_code: self.coupon_code,
            notes: self.notes,
            created_by: self.created_by,
            updated_by: self.updated_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
            items,
        })
    }
}

fn encode_address(address: Option<&DeliveryAddress>) -> RepoResult<Option<String>> {
    address
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| RepoError::Validation(format!("Invalid delivery_address: {e}")))
}

/// Insert an order and its items atomically
///
/// A clash on `order_number` surfaces as [`RepoError::Duplicate`].
pub async fn insert<'a>(conn: impl Acquire<'a, Database = Sqlite>, order: &Order) -> RepoResult<()> {
    let mut tx = conn.begin().await?;
    let address = encode_address(order.delivery_address.as_ref())?;

    let sql = format!(
        "INSERT INTO orders ({ORDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
    );
    sqlx::query(&sql)
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.status)
        .bind(order.order_type)
        .bind(order.payment_status)
        .bind(&order.payment_method)
        .bind(order.subtotal)
        .bind(order.tax_amount)
        .bind(order.discount_amount)
        .bind(order.delivery_charge)
        .bind(order.total_amount)
        .bind(order.paid_amount)
        .bind(order.table_id)
        .bind(order.rider_id)
        .bind(order.staff_id)
        .bind(order.customer_id)
        .bind(address)
        .bind(&order.coupon_code)
        .bind(&order.notes)
        .bind(order.created_by)
        .bind(order.updated_by)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.version)
        .execute(&mut *tx)
        .await?;

    for (position, item) in order.items.iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_item (id, order_id, sort_order, menu_item_id, item_name, unit_price, quantity, total_price, special_instructions) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(item.id)
        .bind(order.id)
        .bind(position as i64)
        .bind(item.menu_item_id)
        .bind(&item.item_name)
        .bind(item.unit_price)
        .bind(item.quantity)
        .bind(item.total_price)
        .bind(&item.special_instructions)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn find_by_id<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    id: i64,
) -> RepoResult<Option<Order>> {
    let mut conn = conn.acquire().await?;
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    let Some(row) = sqlx::query_as::<Sqlite, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let mut items = load_items(&mut *conn, &[id]).await?;
    let order = row.into_order(items.remove(&id).unwrap_or_default())?;
    Ok(Some(order))
}

/// Filtered page, newest first
pub async fn list<'a>(
    conn: impl Acquire<'a, Database = Sqlite>,
    filter: &OrderFilter,
) -> RepoResult<Vec<Order>> {
    let mut conn = conn.acquire().await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(order_type) = filter.order_type {
        qb.push(" AND order_type = ").push_bind(order_type);
    }
    if let Some(rider_id) = filter.rider_id {
        qb.push(" AND rider_id = ").push_bind(rider_id);
    }
    if let Some(visibility) = filter.visible_to {
        qb.push(" AND (customer_id = ")
            .push_bind(visibility.user_id)
            .push(" OR staff_id = ")
            .push_bind(visibility.user_id);
        if let Some(rider_id) = visibility.rider_id {
            qb.push(" OR rider_id = ").push_bind(rider_id);
        }
        qb.push(")");
    }
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(filter.limit.clamp(1, MAX_PAGE_SIZE))
        .push(" OFFSET ")
        .push_bind(filter.offset.max(0));

    let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut items = load_items(&mut *conn, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let order_items = items.remove(&row.id).unwrap_or_default();
            row.into_order(order_items)
        })
        .collect()
}

async fn load_items(
    conn: &mut SqliteConnection,
    order_ids: &[i64],
) -> RepoResult<HashMap<i64, Vec<OrderItem>>> {
    let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id IN ("
    ));
    let mut separated = qb.separated(", ");
    for id in order_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY order_id, sort_order");

    let items: Vec<OrderItem> = qb.build_query_as().fetch_all(conn).await?;
    for item in items {
        grouped.entry(item.order_id).or_default().push(item);
    }
    Ok(grouped)
}

/// Write every mutable column if the row still has `expected_version`.
///
/// Returns false when another writer got there first. The stored version
/// becomes `expected_version + 1`.
pub async fn update_guarded<'e>(
    executor: impl SqliteExecutor<'e>,
    order: &Order,
    expected_version: i64,
) -> RepoResult<bool> {
    let address = encode_address(order.delivery_address.as_ref())?;
    let rows = sqlx::query(
        "UPDATE orders SET status = ?1, payment_status = ?2, payment_method = ?3, subtotal = ?4, tax_amount = ?5, discount_amount = ?6, delivery_charge = ?7, total_amount = ?8, paid_amount = ?9, table_id = ?10, rider_id = ?11, staff_id = ?12, delivery_address = ?13, notes = ?14, updated_by = ?15, updated_at = ?16, version = version + 1 WHERE id = ?17 AND version = ?18",
    )
    .bind(order.status)
    .bind(order.payment_status)
    .bind(&order.payment_method)
    .bind(order.subtotal)
    .bind(order.tax_amount)
    .bind(order.discount_amount)
    .bind(order.delivery_charge)
    .bind(order.total_amount)
    .bind(order.paid_amount)
    .bind(order.table_id)
    .bind(order.rider_id)
    .bind(order.staff_id)
    .bind(address)
    .bind(&order.notes)
    .bind(order.updated_by)
    .bind(order.updated_at)
    .bind(order.id)
    .bind(expected_version)
    .execute(executor)
    .await?;
    Ok(rows.rows_affected() == 1)
}

/// Delete an order (items cascade) while it is pending or cancelled.
///
/// Returns false when the row is missing or in any other status.
pub async fn delete_if_deletable<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM orders WHERE id = ? AND status IN ('pending', 'cancelled')")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(rows.rows_affected() == 1)
}

/// Non-terminal orders currently carried by a rider
pub async fn count_active_for_rider<'e>(
    executor: impl SqliteExecutor<'e>,
    rider_id: i64,
) -> RepoResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM orders WHERE rider_id = ? AND status NOT IN {TERMINAL_STATUSES}"
    );
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(rider_id)
        .fetch_one(executor)
        .await?;
    Ok(count)
}

/// Totals of non-cancelled cash orders a staff member took in `[from, to)`
pub async fn cash_totals_for_staff<'e>(
    executor: impl SqliteExecutor<'e>,
    staff_id: i64,
    from: i64,
    to: i64,
) -> RepoResult<Vec<f64>> {
    let totals: Vec<f64> = sqlx::query_scalar(
        "SELECT total_amount FROM orders WHERE staff_id = ?1 AND payment_method = ?2 AND status != 'cancelled' AND created_at >= ?3 AND created_at < ?4",
    )
    .bind(staff_id)
    .bind(shared::models::CASH_PAYMENT_METHOD)
    .bind(from)
    .bind(to)
    .fetch_all(executor)
    .await?;
    Ok(totals)
}
