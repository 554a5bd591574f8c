/*
 * Responsibility
 * - "user" テーブル向け SQLx 操作
 * - refresh_token カラムが「現在有効な refresh token」の唯一の真実
 * - DB エラーは RepoError に分類して返す (NotFound / Conflict / Timeout / Db)
 */
use std::{future::Future, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::repos::error::{RepoError, RepoResult};

#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i32,
    pub user_name: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    // Empty string means "no live session".
    pub refresh_token: String,
    pub roles: Vec<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence contract for user records.
///
/// Implementations must be safe to share across request tasks.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user with an empty refresh token. Returns the new id.
    async fn insert(&self, user_name: &str, password_hash: &str, roles: &[i32])
    -> RepoResult<i32>;

    async fn find_by_name(&self, user_name: &str) -> RepoResult<UserRow>;

    /// Exact match on the stored refresh token. An empty argument never matches.
    async fn find_by_refresh(&self, refresh_token: &str) -> RepoResult<UserRow>;

    /// Overwrite the stored refresh token. Passing `""` revokes the live session.
    async fn set_refresh(&self, user_id: i32, refresh_token: &str) -> RepoResult<i32>;
}

const SCHEMA_STATEMENTS: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS public."user" (
        id SERIAL PRIMARY KEY,
        user_name VARCHAR(255) NOT NULL UNIQUE,
        password VARCHAR(255) NOT NULL,
        refresh_token TEXT,
        roles INTEGER[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    ALTER TABLE public."user"
    ADD COLUMN IF NOT EXISTS roles INTEGER[] NOT NULL DEFAULT '{2,1,3,4}'
    "#,
    r#"
    ALTER TABLE public."user"
    ALTER COLUMN refresh_token TYPE TEXT
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS user_user_name_key
    ON public."user" (user_name)
    "#,
];

#[derive(Clone, Debug)]
pub struct PgUserStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Create the table when missing and bring tables from the earlier schema up to date:
    /// - `roles` is added, defaulting to the role set those rows were always minted with
    /// - `refresh_token` is widened to TEXT (tokens outgrew VARCHAR(255))
    /// - `user_name` gets the unique index the earlier schema lacked
    ///
    /// Fails if an existing table already holds duplicate user names.
    pub async fn init_schema(&self) -> RepoResult<()> {
        for stmt in SCHEMA_STATEMENTS {
            self.with_deadline(sqlx::query(stmt).execute(&self.pool))
                .await?;
        }

        debug!("user schema is up to date");
        Ok(())
    }

    // Every statement gets the same bounded deadline; dropping the future cancels the query.
    async fn with_deadline<T, F>(&self, fut: F) -> RepoResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(RepoError::from_sqlx),
            Err(_) => Err(RepoError::Timeout),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(
        &self,
        user_name: &str,
        password_hash: &str,
        roles: &[i32],
    ) -> RepoResult<i32> {
        let now = Utc::now();
        self.with_deadline(
            sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO public."user" (user_name, password, roles, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                RETURNING id
                "#,
            )
            .bind(user_name)
            .bind(password_hash)
            .bind(roles)
            .bind(now)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn find_by_name(&self, user_name: &str) -> RepoResult<UserRow> {
        self.with_deadline(
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT
                    id, user_name, password,
                    COALESCE(refresh_token, '') AS refresh_token,
                    roles, created_at, updated_at
                FROM public."user"
                WHERE user_name = $1
                "#,
            )
            .bind(user_name)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn find_by_refresh(&self, refresh_token: &str) -> RepoResult<UserRow> {
        if refresh_token.is_empty() {
            debug!("empty refresh token never matches a user");
            return Err(RepoError::NotFound);
        }

        self.with_deadline(
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT
                    id, user_name, password,
                    COALESCE(refresh_token, '') AS refresh_token,
                    roles, created_at, updated_at
                FROM public."user"
                WHERE refresh_token = $1
                LIMIT 1
                "#,
            )
            .bind(refresh_token)
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn set_refresh(&self, user_id: i32, refresh_token: &str) -> RepoResult<i32> {
        self.with_deadline(
            sqlx::query_scalar::<_, i32>(
                r#"
                UPDATE public."user"
                SET
                    refresh_token = $2,
                    updated_at = $3
                WHERE id = $1
                RETURNING id
                "#,
            )
            .bind(user_id)
            .bind(refresh_token)
            .bind(Utc::now())
            .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(RepoError::NotFound)
    }
}
