//! # Domain Types
//!
//! Core domain types used throughout Shoplite.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     User        │   │    Product      │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  name           │   │  name           │   │  user_id (FK)   │       │
//! │  │  email (unique) │   │  price_cents    │   │  status         │       │
//! │  └─────────────────┘   │  stock          │   └────────┬────────┘       │
//! │                        └────────┬────────┘            │                │
//! │                                 │      ┌──────────────┘                │
//! │                                 ▼      ▼                               │
//! │                        ┌─────────────────────┐                         │
//! │                        │     OrderLine       │  many-to-many bridge    │
//! │                        │  ─────────────────  │  with payload           │
//! │                        │  (order, product)   │                         │
//! │                        │  quantity           │                         │
//! │                        │  unit_price_cents   │ ← snapshot, immutable   │
//! │                        └─────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An `OrderLine` freezes the product's unit price at placement time.
//! Later catalog price changes never alter historical order totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// User
// =============================================================================

/// A registered user who can place orders.
///
/// Users are created by the host application (registration lives outside
/// the core); the order path only ever reads them. The core never mutates
/// or deletes a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Contact email, unique across users.
    pub email: String,

    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Unit price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Available-to-sell quantity. Never negative, including under
    /// concurrent placements.
    pub stock: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated (price or stock change).
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the current unit price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the requested quantity could be filled from stock.
    ///
    /// This is a convenience read; the authoritative check-and-decrement
    /// happens atomically in the store.
    #[inline]
    pub fn can_fill(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
///
/// ## State Machine
/// ```text
/// Placed ──► Cancelled   (any time before fulfilment; returns stock)
/// Placed ──► Fulfilled   (once; stock stays consumed)
/// ```
/// `Cancelled` and `Fulfilled` are terminal. Every other transition is
/// rejected with an invalid-transition error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order has been placed and stock reserved.
    Placed,
    /// Order was cancelled; reserved stock has been returned.
    Cancelled,
    /// Order was shipped; stock stays consumed.
    Fulfilled,
}

impl OrderStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    pub const fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Placed, OrderStatus::Cancelled)
                | (OrderStatus::Placed, OrderStatus::Fulfilled)
        )
    }

    /// Terminal states accept no further transitions.
    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Fulfilled)
    }

    /// Lowercase name, matching the stored representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Fulfilled => "fulfilled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Placed
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order placed by a user.
///
/// The total is **derived** from the line items, never stored on the order
/// row. That makes "total equals the sum of line totals" true by
/// construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order Line
// =============================================================================

/// A line item in an order.
///
/// Identity is the `(order_id, product_id)` pair; an order never carries
/// two lines for the same product (duplicate requests are merged before
/// insertion). Uses the snapshot pattern to freeze the unit price at
/// placement time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub order_id: String,
    pub product_id: String,
    /// Quantity ordered. Always positive.
    pub quantity: i64,
    /// Unit price in cents at placement time (frozen).
    pub unit_price_cents: i64,
}

impl OrderLine {
    /// Returns the unit price snapshot as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns quantity × unit price snapshot.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Order With Lines
// =============================================================================

/// An order together with its line items, as returned by lookups and by
/// order placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderWithLines {
    /// The computed order total: Σ quantity × unit price snapshot.
    pub fn total(&self) -> Money {
        self.lines.iter().map(OrderLine::line_total).sum()
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// A caller's requested line: "this product, this many units".
///
/// Validated and merged by [`crate::validation::merge_line_requests`]
/// before any stock is touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    pub product_id: String,
    pub quantity: i64,
}

impl LineRequest {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        LineRequest {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A validated, priced line ready for insertion: the shape the Order
/// Ledger accepts once stock has been reserved.
#[derive(Debug, Clone)]
pub struct NewLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
