//! # shoplite-db: Database Layer for Shoplite
//!
//! This crate provides storage and the transactional order path for the
//! Shoplite commerce record-keeper. It uses SQLite with sqlx for async
//! operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shoplite Data Flow                               │
//! │                                                                         │
//! │  API layer call (place_order, cancel_order, ...)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shoplite-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌──────────────┐   │   │
//! │  │   │   Database    │   │  Repositories  │   │ Coordinator  │   │   │
//! │  │   │   (pool.rs)   │   │ catalog/account│   │(coordinator) │   │   │
//! │  │   │               │   │ /order         │   │              │   │   │
//! │  │   │ SqlitePool    │◄──│ row access     │◄──│ one tx per   │   │   │
//! │  │   │ Migrations    │   │ per table      │   │ operation    │   │   │
//! │  │   └───────────────┘   └────────────────┘   └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (users, products, orders, order_lines)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Store error types (the full order-path taxonomy)
//! - [`repository`] - Per-table repositories (catalog, account, order)
//! - [`coordinator`] - The only component that performs cross-store writes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shoplite_core::LineRequest;
//! use shoplite_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/shop.db")).await?;
//!
//! let order = db
//!     .coordinator()
//!     .place_order(&user.id, &[LineRequest::new(&product.id, 3)])
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coordinator;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use coordinator::Coordinator;
pub use error::{StoreError, StoreResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::AccountRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::order::OrderRepository;
