//! Postgres-backed stores. Schema lives in db/schema.sql; queries are plain
//! runtime queries so the crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{IdentityStore, Report, ReportStore, Role, StoreError, User};

pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let role_str: String = row.get("role");
    let role: Role = role_str
        .parse()
        .map_err(|e: String| StoreError::Corrupt(e))?;

    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        name: row.get("name"),
        role,
        password_hash: row.get("password_hash"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        deleted_at: row.get::<Option<DateTime<Utc>>, _>("deleted_at"),
    })
}

const USER_COLUMNS: &str = "id, username, name, role, password_hash, created_at, deleted_at";

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&query).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at"
        );
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        if self.find_by_username(&user.username).await?.is_some() {
            return Err(StoreError::DuplicateUsername);
        }
        sqlx::query(
            "INSERT INTO users (id, username, name, role, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<User, StoreError> {
        let query = format!(
            "UPDATE users SET role = $2 WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        user_from_row(&row)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn report_from_row(row: &PgRow) -> Report {
    Report {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        body: row.get("body"),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn list(&self, author: Option<Uuid>) -> Result<Vec<Report>, StoreError> {
        let rows = match author {
            Some(author_id) => {
                sqlx::query(
                    "SELECT id, author_id, title, body, created_at FROM reports \
                     WHERE author_id = $1 ORDER BY created_at DESC",
                )
                .bind(author_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, author_id, title, body, created_at FROM reports \
                     ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.iter().map(report_from_row).collect())
    }

    async fn create(&self, report: Report) -> Result<Report, StoreError> {
        sqlx::query(
            "INSERT INTO reports (id, author_id, title, body, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(report.id)
        .bind(report.author_id)
        .bind(&report.title)
        .bind(&report.body)
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;
        Ok(report)
    }
}
