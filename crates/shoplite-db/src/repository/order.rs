//! # Order Repository
//!
//! Database operations for orders and their line items.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE (inside the coordinator's transaction)                      │
//! │     └── insert_order() → order row + all line rows, one unit           │
//! │                                                                         │
//! │  2. STATUS CHANGES (the only post-creation mutation)                   │
//! │     └── update_status(): Placed → Cancelled | Fulfilled                │
//! │                                                                         │
//! │  Orders are never hard-deleted: cancellation is a status change,       │
//! │  preserving audit history. Line items live and die with their order.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This repository never touches product stock; reserving and releasing
//! stock is the coordinator's job.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::repository::account;
use shoplite_core::{NewLine, Order, OrderLine, OrderStatus, OrderWithLines};

// =============================================================================
// Transactional Primitives
// =============================================================================

/// Inserts an order row and all of its line-item rows as one unit, on the
/// caller's connection/transaction.
///
/// Does not touch the catalog: the caller must already have validated and
/// reserved stock. Lines are expected pre-merged (one line per product);
/// the composite primary key rejects duplicates as a backstop.
///
/// ## Errors
/// * `InvalidUser` - `user_id` is unknown
/// * `EmptyOrder` - `lines` is empty
/// * `InvalidLineItem` - any quantity ≤ 0
pub async fn insert_order(
    conn: &mut SqliteConnection,
    user_id: &str,
    lines: &[NewLine],
) -> StoreResult<OrderWithLines> {
    if lines.is_empty() {
        return Err(StoreError::EmptyOrder);
    }
    for line in lines {
        if line.quantity <= 0 {
            return Err(StoreError::InvalidLineItem {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            });
        }
    }
    if account::fetch(&mut *conn, user_id).await?.is_none() {
        return Err(StoreError::InvalidUser(user_id.to_string()));
    }

    let now = Utc::now();
    let order = Order {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        status: OrderStatus::Placed,
        created_at: now,
        updated_at: now,
    };

    debug!(id = %order.id, user_id = %user_id, lines = lines.len(), "Creating order");

    sqlx::query(
        r#"
        INSERT INTO orders (id, user_id, status, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(&order.id)
    .bind(&order.user_id)
    .bind(order.status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    let mut inserted = Vec::with_capacity(lines.len());
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, product_id, quantity, unit_price_cents)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&order.id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .execute(&mut *conn)
        .await?;

        inserted.push(OrderLine {
            order_id: order.id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
        });
    }

    Ok(OrderWithLines {
        order,
        lines: inserted,
    })
}

/// Fetches an order row (without lines) on an existing connection.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        SELECT id, user_id, status, created_at, updated_at
        FROM orders
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(order)
}

/// Fetches all line items for an order, in product id order.
pub async fn fetch_lines(conn: &mut SqliteConnection, order_id: &str) -> StoreResult<Vec<OrderLine>> {
    let lines = sqlx::query_as::<_, OrderLine>(
        r#"
        SELECT order_id, product_id, quantity, unit_price_cents
        FROM order_lines
        WHERE order_id = ?1
        ORDER BY product_id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    Ok(lines)
}

/// Applies a status transition, enforcing the state machine.
///
/// ## Errors
/// * `NotFound` - no such order
/// * `InvalidTransition` - the current status does not permit the change
pub async fn update_status(
    conn: &mut SqliteConnection,
    order_id: &str,
    new_status: OrderStatus,
) -> StoreResult<()> {
    let order = fetch(&mut *conn, order_id)
        .await?
        .ok_or_else(|| StoreError::not_found("Order", order_id))?;

    if !order.status.can_transition_to(new_status) {
        return Err(StoreError::InvalidTransition {
            order_id: order_id.to_string(),
            from: order.status,
            to: new_status,
        });
    }

    let now = Utc::now();

    // Guard on the status we just read; inside a transaction this is
    // belt-and-braces, standalone it closes the check-then-set window.
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = ?2, updated_at = ?3
        WHERE id = ?1 AND status = ?4
        "#,
    )
    .bind(order_id)
    .bind(new_status)
    .bind(now)
    .bind(order.status)
    .execute(conn)
    .await?;

    // Another writer moved the status between the read above and this
    // write; the guard missed, so nothing was applied.
    if result.rows_affected() == 0 {
        return Err(StoreError::Conflict);
    }

    debug!(order_id = %order_id, from = %order.status, to = %new_status, "Order status changed");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order ledger operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates an order with its line items in a transaction of its own.
    ///
    /// This is the ledger write only: the caller must already have
    /// reserved stock. Order placement normally goes through the
    /// coordinator, which does both in one transaction.
    pub async fn create(&self, user_id: &str, lines: &[NewLine]) -> StoreResult<OrderWithLines> {
        let mut tx = self.pool.begin().await?;
        let order = insert_order(&mut tx, user_id, lines).await?;
        tx.commit().await?;
        Ok(order)
    }

    /// Gets an order together with its line items.
    pub async fn get_with_lines(&self, id: &str) -> StoreResult<Option<OrderWithLines>> {
        let mut conn = self.pool.acquire().await?;

        let Some(order) = fetch(&mut conn, id).await? else {
            return Ok(None);
        };
        let lines = fetch_lines(&mut conn, id).await?;

        Ok(Some(OrderWithLines { order, lines }))
    }

    /// Applies a status transition, enforcing the state machine.
    pub async fn set_status(&self, order_id: &str, new_status: OrderStatus) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        update_status(&mut tx, order_id, new_status).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Lists a user's orders in creation order.
    pub async fn list_by_user(&self, user_id: &str) -> StoreResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, created_at, updated_at
            FROM orders
            WHERE user_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Lists all orders in a given status, in creation order.
    ///
    /// Typical use: all placed orders awaiting fulfilment.
    pub async fn list_by_status(&self, status: OrderStatus) -> StoreResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, created_at, updated_at
            FROM orders
            WHERE status = ?1
            ORDER BY created_at
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Counts all orders ever placed by a user (any status).
    pub async fn count_by_user(&self, user_id: &str) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use shoplite_core::Money;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_user(db: &Database) -> String {
        db.accounts()
            .insert("Alice", "alice@example.com")
            .await
            .unwrap()
            .id
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
        db.catalog()
            .insert(name, Money::from_cents(price_cents), stock)
            .await
            .unwrap()
            .id
    }

    fn new_line(product_id: &str, quantity: i64, unit_price_cents: i64) -> NewLine {
        NewLine {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_with_lines() {
        let db = setup().await;
        let user_id = seed_user(&db).await;
        let p1 = seed_product(&db, "Laptop", 100_000, 10).await;
        let p2 = seed_product(&db, "Headphones", 15_000, 10).await;

        let order = db
            .orders()
            .create(
                &user_id,
                &[new_line(&p1, 1, 100_000), new_line(&p2, 2, 15_000)],
            )
            .await
            .unwrap();

        assert_eq!(order.order.status, OrderStatus::Placed);
        assert_eq!(order.total().cents(), 130_000);

        let found = db
            .orders()
            .get_with_lines(&order.order.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.lines.len(), 2);
        assert_eq!(found.total().cents(), 130_000);

        assert!(db.orders().get_with_lines("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let db = setup().await;
        let user_id = seed_user(&db).await;
        let p1 = seed_product(&db, "Laptop", 100_000, 10).await;

        let err = db.orders().create(&user_id, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::EmptyOrder));

        let err = db
            .orders()
            .create(&user_id, &[new_line(&p1, 0, 100_000)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidLineItem { .. }));

        let err = db
            .orders()
            .create("ghost", &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUser(_)));
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = setup().await;
        let user_id = seed_user(&db).await;
        let p1 = seed_product(&db, "Laptop", 100_000, 10).await;

        let order = db
            .orders()
            .create(&user_id, &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap();
        let id = order.order.id;

        db.orders()
            .set_status(&id, OrderStatus::Cancelled)
            .await
            .unwrap();

        // Cancelling twice is rejected
        let err = db
            .orders()
            .set_status(&id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Cancelled,
                ..
            }
        ));

        // Terminal state accepts nothing else either
        let err = db
            .orders()
            .set_status(&id, OrderStatus::Fulfilled)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        let err = db
            .orders()
            .set_status("missing", OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_status_writers_one_wins() {
        let db = setup().await;
        let user_id = seed_user(&db).await;
        let p1 = seed_product(&db, "Laptop", 100_000, 10).await;

        let order = db
            .orders()
            .create(&user_id, &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap();
        let id = order.order.id;

        // Racing cancel against fulfil on the same Placed order: one
        // writer lands its transition, the other loses the race.
        let repo = db.orders();
        let (a, b) = tokio::join!(
            repo.set_status(&id, OrderStatus::Cancelled),
            repo.set_status(&id, OrderStatus::Fulfilled),
        );

        let succeeded = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(succeeded, 1, "exactly one status writer must win");

        let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(
            loser,
            StoreError::InvalidTransition { .. } | StoreError::Conflict
        ));

        let status = db
            .orders()
            .get_with_lines(&id)
            .await
            .unwrap()
            .unwrap()
            .order
            .status;
        assert!(status.is_terminal());
    }

    #[tokio::test]
    async fn test_list_by_user_in_creation_order() {
        let db = setup().await;
        let user_id = seed_user(&db).await;
        let other = db
            .accounts()
            .insert("Bob", "bob@example.com")
            .await
            .unwrap()
            .id;
        let p1 = seed_product(&db, "Laptop", 100_000, 10).await;

        let first = db
            .orders()
            .create(&user_id, &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap();
        let second = db
            .orders()
            .create(&user_id, &[new_line(&p1, 2, 100_000)])
            .await
            .unwrap();
        db.orders()
            .create(&other, &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap();

        let orders = db.orders().list_by_user(&user_id).await.unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec![first.order.id.as_str(), second.order.id.as_str()]);

        assert_eq!(db.orders().count_by_user(&user_id).await.unwrap(), 2);
        assert_eq!(db.orders().count_by_user(&other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let db = setup().await;
        let user_id = seed_user(&db).await;
        let p1 = seed_product(&db, "Laptop", 100_000, 10).await;

        let placed = db
            .orders()
            .create(&user_id, &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap();
        let fulfilled = db
            .orders()
            .create(&user_id, &[new_line(&p1, 1, 100_000)])
            .await
            .unwrap();
        db.orders()
            .set_status(&fulfilled.order.id, OrderStatus::Fulfilled)
            .await
            .unwrap();

        let pending = db.orders().list_by_status(OrderStatus::Placed).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, placed.order.id);

        let done = db
            .orders()
            .list_by_status(OrderStatus::Fulfilled)
            .await
            .unwrap();
        assert_eq!(done.len(), 1);
    }
}
