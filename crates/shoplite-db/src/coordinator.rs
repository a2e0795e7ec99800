//! # Consistency Coordinator
//!
//! The transactional boundary that sequences a multi-line order placement
//! or cancellation as a single atomic unit spanning the catalog and the
//! order ledger.
//!
//! ## Placement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      place_order(user, lines)                           │
//! │                                                                         │
//! │  BEGIN ──► validate user ──► merge + sort lines                        │
//! │                                             │                           │
//! │        for each product (ascending id):     │                           │
//! │          fetch product (price snapshot)     │                           │
//! │          reserve_stock (guarded UPDATE)     │                           │
//! │                                             │                           │
//! │        insert order + line rows             │                           │
//! │                                             │                           │
//! │        COMMIT ◄─── all succeeded            │                           │
//! │        ROLLBACK ◄─ any failure (insufficient stock, missing            │
//! │                    product, storage error, timeout)                    │
//! │                                                                         │
//! │  Partial state is never observable: no reserved-but-no-order, no       │
//! │  order-without-reservation.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Ascending Product Id?
//! All concurrent placements reserve products in the same deterministic
//! order, so two orders over overlapping product sets can never deadlock
//! in a circular wait.
//!
//! ## Failure Semantics
//! All operations are all-or-nothing and perform no internal retries:
//! retrying a stock reservation is a caller/business decision, since
//! availability may not improve. Errors are typed and returned, never
//! swallowed.

use std::future::Future;
use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::repository::{account, catalog, order};
use shoplite_core::{
    merge_line_requests, LineRequest, NewLine, OrderStatus, OrderWithLines,
};

/// The only component permitted to perform a cross-store write.
///
/// Holds the shared pool and a per-transaction time budget; it keeps no
/// other state, and never caches stock values across calls. The store is
/// the sole arbiter of mutual exclusion.
#[derive(Debug, Clone)]
pub struct Coordinator {
    pool: SqlitePool,
    transaction_timeout: Duration,
}

impl Coordinator {
    /// Creates a new Coordinator.
    ///
    /// Usually obtained via `Database::coordinator()`, which supplies the
    /// configured timeout.
    pub fn new(pool: SqlitePool, transaction_timeout: Duration) -> Self {
        Coordinator {
            pool,
            transaction_timeout,
        }
    }

    /// Places an order: validates the user and lines, reserves stock for
    /// every line, and writes the order, all in one atomic transaction.
    ///
    /// ## Arguments
    /// * `user_id` - the ordering user; must exist
    /// * `requested` - (product id, quantity) pairs; duplicates are merged
    ///   by summing quantities
    ///
    /// ## Returns
    /// The created order with status `Placed`. Its computed total equals
    /// the sum of line totals, priced at the moment of placement.
    ///
    /// ## Errors
    /// `InvalidUser`, `EmptyOrder`, `InvalidLineItem`, `NotFound`,
    /// `InsufficientStock`, `Conflict`, `Timeout`, or a storage failure.
    /// On any error the transaction rolls back entirely; partial
    /// reservation is never observable.
    pub async fn place_order(
        &self,
        user_id: &str,
        requested: &[LineRequest],
    ) -> StoreResult<OrderWithLines> {
        let placed = self
            .with_timeout(self.place_order_tx(user_id, requested))
            .await?;

        info!(
            order_id = %placed.order.id,
            user_id = %user_id,
            total = %placed.total(),
            "Order placed"
        );
        Ok(placed)
    }

    async fn place_order_tx(
        &self,
        user_id: &str,
        requested: &[LineRequest],
    ) -> StoreResult<OrderWithLines> {
        let mut tx = self.pool.begin().await?;

        // An unknown user is reported before any line validation
        if account::fetch(&mut tx, user_id).await?.is_none() {
            return Err(StoreError::InvalidUser(user_id.to_string()));
        }

        // Merge duplicates, reject empty/non-positive quantities, sort
        // ascending by product id for deterministic reservation order.
        let lines = merge_line_requests(requested)?;

        let mut priced = Vec::with_capacity(lines.len());
        for line in &lines {
            // Fetch for the price snapshot, then the guarded decrement.
            // Both happen inside the transaction; a failure on any line
            // rolls back every earlier reservation in this call.
            let product = catalog::fetch(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| StoreError::not_found("Product", &line.product_id))?;

            catalog::reserve_stock(&mut tx, &line.product_id, line.quantity).await?;

            priced.push(NewLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
            });
        }

        let placed = order::insert_order(&mut tx, user_id, &priced).await?;

        tx.commit().await?;
        Ok(placed)
    }

    /// Cancels a placed order and returns its reserved quantities to
    /// stock, in one atomic transaction. This is the only path that
    /// increases stock.
    ///
    /// ## Errors
    /// `NotFound` if the order doesn't exist; `InvalidTransition` if it
    /// is not `Placed` (cancelling twice fails the second time).
    pub async fn cancel_order(&self, order_id: &str) -> StoreResult<()> {
        self.with_timeout(self.cancel_order_tx(order_id)).await?;

        info!(order_id = %order_id, "Order cancelled");
        Ok(())
    }

    async fn cancel_order_tx(&self, order_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Enforces Placed → Cancelled; anything else is InvalidTransition
        order::update_status(&mut tx, order_id, OrderStatus::Cancelled).await?;

        let lines = order::fetch_lines(&mut tx, order_id).await?;
        for line in &lines {
            catalog::release_stock(&mut tx, &line.product_id, line.quantity).await?;
        }

        tx.commit().await?;
        debug!(order_id = %order_id, lines = lines.len(), "Stock returned");
        Ok(())
    }

    /// Fulfils a placed order (`Placed → Fulfilled`). No stock effect:
    /// stock was consumed at placement and is not returned.
    pub async fn fulfill_order(&self, order_id: &str) -> StoreResult<()> {
        self.with_timeout(self.fulfill_order_tx(order_id)).await?;

        info!(order_id = %order_id, "Order fulfilled");
        Ok(())
    }

    async fn fulfill_order_tx(&self, order_id: &str) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        order::update_status(&mut tx, order_id, OrderStatus::Fulfilled).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Runs a transaction body under the configured time budget.
    ///
    /// On elapse the future is dropped, which drops the open transaction
    /// and rolls it back; no partial effects persist.
    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        match tokio::time::timeout(self.transaction_timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => Err(StoreError::Timeout),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
