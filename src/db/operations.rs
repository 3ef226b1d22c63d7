use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};
use uuid::Uuid;

use crate::db::models::{Account, AccountRow, NewAccount};
use crate::db::store::CredentialStore;
use crate::error::DatabaseError;

const SELECT_ACCOUNT_BY_USERNAME: &str = r#"
    SELECT u.id, u.username, u.password, u.created_at,
           COALESCE(array_agg(r.role ORDER BY r.role) FILTER (WHERE r.role IS NOT NULL), '{}') AS roles
    FROM users u
    LEFT JOIN user_roles r ON r.user_id = u.id
    WHERE u.username = $1
    GROUP BY u.id
"#;

/// PostgreSQL-backed [`CredentialStore`] over the `users` and `user_roles`
/// tables. Uniqueness is enforced by the `UNIQUE` constraint on
/// `users.username`.
pub struct PgCredentialStore {
    pool: Arc<PgPool>,
}

impl PgCredentialStore {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn pool(&self) -> &Arc<PgPool> {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))
    }

    async fn insert_account(
        account: &NewAccount,
        id: Uuid,
        transaction: &mut Transaction<'_, Postgres>,
    ) -> Result<Account, DatabaseError> {
        let created_at: chrono::DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO users (id, username, password, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(Utc::now())
        .fetch_one(&mut **transaction)
        .await?;

        for role in &account.roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, $2)")
                .bind(id)
                .bind(role)
                .execute(&mut **transaction)
                .await?;
        }

        Ok(account.clone().into_account(id, created_at))
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(SELECT_ACCOUNT_BY_USERNAME)
            .bind(username)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.map(Account::from))
    }

    async fn save(&self, account: NewAccount) -> Result<Account, DatabaseError> {
        let mut transaction = self.pool.as_ref().begin().await?;
        let id = Uuid::new_v4();

        match Self::insert_account(&account, id, &mut transaction).await {
            Ok(saved) => {
                transaction.commit().await?;
                debug!(user_id = %saved.id, "account row committed");
                Ok(saved)
            }
            Err(e) => Err(rollback_after(transaction.rollback(), e).await),
        }
    }
}

/// Rolls back after a failed insert. The insert error is always the one
/// returned; a rollback failure is only logged.
async fn rollback_after<F>(rollback: F, cause: DatabaseError) -> DatabaseError
where
    F: Future<Output = Result<(), sqlx::Error>>,
{
    if let Err(rollback_err) = rollback.await {
        error!(%cause, "Rollback after failed insert also failed: {}", rollback_err);
    }
    cause
}
