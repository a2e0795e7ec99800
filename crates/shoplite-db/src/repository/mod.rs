//! # Repository Module
//!
//! Per-table database repositories for Shoplite.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Each table gets one repository that isolates its SQL behind a         │
//! │  clean API.                                                             │
//! │                                                                         │
//! │  API layer call                                                        │
//! │       │                                                                 │
//! │       │  db.catalog().get(&id)                                          │
//! │       ▼                                                                 │
//! │  CatalogRepository ──► SQL query ──► SQLite                             │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place per table                              │
//! │  • Easy to test against an in-memory database                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Call Shapes
//!
//! Each module exposes two shapes:
//! - **Pool-based methods** on the repository struct, for standalone
//!   reads and plain CRUD
//! - **Connection-based free functions** taking `&mut SqliteConnection`,
//!   so the coordinator can compose them into a single transaction
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Products: CRUD plus stock
//!   reservation/release primitives
//! - [`account::AccountRepository`] - Users: read-mostly, CRUD for the
//!   API layer
//! - [`order::OrderRepository`] - Orders and their line items

pub mod account;
pub mod catalog;
pub mod order;
