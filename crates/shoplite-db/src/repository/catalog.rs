//! # Catalog Repository
//!
//! Database operations for products, including the stock reservation
//! primitives the order path is built on.
//!
//! ## The Reservation Race
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A naive read-then-write stock check admits a race:                     │
//! │                                                                         │
//! │    Caller A: read stock = 10  ✓ (wants 6)                               │
//! │    Caller B: read stock = 10  ✓ (wants 6)                               │
//! │    Caller A: write stock = 4                                            │
//! │    Caller B: write stock = 4   ← 12 units sold from 10!                │
//! │                                                                         │
//! │  Here the check and the decrement are ONE guarded statement:           │
//! │                                                                         │
//! │    UPDATE products SET stock = stock - ?                                │
//! │    WHERE id = ? AND stock >= ?                                          │
//! │                                                                         │
//! │  SQLite serializes writers, so exactly one of two overlapping          │
//! │  reservations wins; the loser observes rows_affected = 0 and the       │
//! │  caller's transaction rolls back.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use shoplite_core::validation::{validate_name, validate_price, validate_stock};
use shoplite_core::{Money, Product};

// =============================================================================
// Transactional Primitives
// =============================================================================
// These take `&mut SqliteConnection` so the coordinator can run them
// inside one transaction together with the order ledger writes.

/// Fetches a product on an existing connection/transaction.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, price_cents, stock, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Atomically checks `stock >= quantity` and decrements.
///
/// The guard makes the read-check-write a single statement, so two
/// overlapping placements can never both succeed on the last units.
///
/// ## Returns
/// * `Ok(())` - the quantity was reserved
/// * `Err(InsufficientStock)` - product exists but cannot cover the request
/// * `Err(NotFound)` - no such product
///
/// No retries happen here; failure is reported for the coordinator to
/// roll back and surface.
pub async fn reserve_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> StoreResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2, updated_at = ?3
        WHERE id = ?1 AND stock >= ?2
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        // Distinguish "missing product" from "not enough stock"
        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        return match available {
            None => Err(StoreError::not_found("Product", id)),
            Some(available) => Err(StoreError::InsufficientStock {
                product_id: id.to_string(),
                available,
                requested: quantity,
            }),
        };
    }

    debug!(product_id = %id, quantity, "Reserved stock");
    Ok(())
}

/// Atomically increments stock, used on cancellation.
///
/// There is no upper bound check; products have no max-stock invariant.
pub async fn release_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
) -> StoreResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found("Product", id));
    }

    debug!(product_id = %id, quantity, "Released stock");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// Plain CRUD lives here for the API layer; stock is only ever mutated
/// through the coordinator's reserve/release path (or the explicit
/// `set_stock` inventory adjustment).
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Arguments
    /// * `name` - display name (1..=200 chars)
    /// * `price` - unit price, non-negative
    /// * `stock` - initial stock level, non-negative
    pub async fn insert(&self, name: &str, price: Money, stock: i64) -> StoreResult<Product> {
        validate_name(name)?;
        validate_price(price)?;
        validate_stock(stock)?;

        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            price_cents: price.cents(),
            stock,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price_cents, stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get(&self, id: &str) -> StoreResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists all products sorted by name.
    pub async fn list(&self) -> StoreResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, price_cents, stock, created_at, updated_at
            FROM products
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's unit price.
    ///
    /// Existing order lines are unaffected: they carry their own price
    /// snapshot from placement time.
    pub async fn update_price(&self, id: &str, price: Money) -> StoreResult<()> {
        validate_price(price)?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET price_cents = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(price.cents())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        debug!(product_id = %id, price = %price, "Updated product price");
        Ok(())
    }

    /// Sets a product's absolute stock level (inventory intake or manual
    /// correction). Not part of the order path.
    pub async fn set_stock(&self, id: &str, stock: i64) -> StoreResult<()> {
        validate_stock(stock)?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> Database {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = db.catalog();

        let product = repo
            .insert("Laptop", Money::from_cents(100_000), 10)
            .await
            .unwrap();

        let found = repo.get(&product.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Laptop");
        assert_eq!(found.price_cents, 100_000);
        assert_eq!(found.stock, 10);

        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_input() {
        let db = setup().await;
        let repo = db.catalog();

        assert!(repo.insert("", Money::from_cents(100), 1).await.is_err());
        assert!(repo
            .insert("Laptop", Money::from_cents(-1), 1)
            .await
            .is_err());
        assert!(repo
            .insert("Laptop", Money::from_cents(100), -1)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = setup().await;
        let repo = db.catalog();

        repo.insert("Smartphone", Money::from_cents(50_000), 5)
            .await
            .unwrap();
        repo.insert("Headphones", Money::from_cents(15_000), 5)
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Headphones", "Smartphone"]);
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = setup().await;
        let repo = db.catalog();

        let product = repo
            .insert("Laptop", Money::from_cents(100_000), 1)
            .await
            .unwrap();

        repo.update_price(&product.id, Money::from_cents(120_000))
            .await
            .unwrap();
        assert_eq!(
            repo.get(&product.id).await.unwrap().unwrap().price_cents,
            120_000
        );

        assert!(matches!(
            repo.update_price("missing", Money::from_cents(1)).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reserve_and_release_stock() {
        let db = setup().await;
        let repo = db.catalog();

        let product = repo
            .insert("Coke", Money::from_cents(150), 10)
            .await
            .unwrap();

        // The in-memory pool has a single connection; while we hold it,
        // all reads must go through it too.
        let mut conn = db.pool().acquire().await.unwrap();

        reserve_stock(&mut conn, &product.id, 6).await.unwrap();
        let stock = fetch(&mut conn, &product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 4);

        // Second reservation of 6 must fail and leave stock unchanged
        let err = reserve_stock(&mut conn, &product.id, 6).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock {
                available: 4,
                requested: 6,
                ..
            }
        ));
        let stock = fetch(&mut conn, &product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 4);

        release_stock(&mut conn, &product.id, 6).await.unwrap();
        let stock = fetch(&mut conn, &product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, 10);
        drop(conn);

        assert_eq!(repo.get(&product.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_reserve_unknown_product() {
        let db = setup().await;

        let mut conn = db.pool().acquire().await.unwrap();

        assert!(matches!(
            reserve_stock(&mut conn, "missing", 1).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            release_stock(&mut conn, "missing", 1).await,
            Err(StoreError::NotFound { .. })
        ));
    }
}
