//! # Account Repository
//!
//! Database operations for users.
//!
//! The order path only ever **reads** users: registration and profile
//! management belong to the host application, which goes through the
//! plain CRUD here. The core never mutates or deletes a user, and orders
//! keep a foreign reference to their owner forever (audit history).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use shoplite_core::validation::{validate_email, validate_name};
use shoplite_core::User;

// =============================================================================
// Transactional Primitives
// =============================================================================

/// Fetches a user on an existing connection/transaction.
///
/// Used by the coordinator to validate the ordering user inside the
/// placement transaction.
pub async fn fetch(conn: &mut SqliteConnection, id: &str) -> StoreResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, created_at
        FROM users
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(user)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for user database operations. Read-mostly.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    /// Creates a new AccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Inserts a new user.
    ///
    /// ## Errors
    /// * `Validation` - empty name or malformed email
    /// * `UniqueViolation` - the email is already registered
    pub async fn insert(&self, name: &str, email: &str) -> StoreResult<User> {
        validate_name(name)?;
        validate_email(email)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %user.id, email = %user.email, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get(&self, id: &str) -> StoreResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists all users sorted by name.
    pub async fn list(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, created_at
            FROM users
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let repo = db.accounts();

        let user = repo
            .insert("Alice Johnson", "alice@example.com")
            .await
            .unwrap();

        let found = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Alice Johnson");
        assert_eq!(found.email, "alice@example.com");

        assert!(repo.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = setup().await;
        let repo = db.accounts();

        repo.insert("Alice", "alice@example.com").await.unwrap();
        let err = repo.insert("Alice 2", "alice@example.com").await;

        assert!(matches!(err, Err(StoreError::UniqueViolation { .. })));
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_input() {
        let db = setup().await;
        let repo = db.accounts();

        assert!(repo.insert("", "alice@example.com").await.is_err());
        assert!(repo.insert("Alice", "not-an-email").await.is_err());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let db = setup().await;
        let repo = db.accounts();

        repo.insert("Bob Smith", "bob@example.com").await.unwrap();
        repo.insert("Alice Johnson", "alice@example.com")
            .await
            .unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Alice Johnson", "Bob Smith"]);
    }
}
