/*
 * Responsibility
 * - users テーブル向け SQLx 実装 (PgUserRepository)
 * - CrudRepository<User> の汎用 CRUD のみ、独自クエリは持たない
 * - unique 違反は RepoError::Conflict に変換して返す
 * - insert は既存キーを上書きしない (ON CONFLICT DO NOTHING → Conflict)
 */
use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};

use crate::repos::crud::{CrudRepository, Entity};
use crate::repos::error::{RepoError, RepoResult};

pub const USER_KEY_CONSTRAINT: &str = "users_pkey";
pub const USER_NAME_CONSTRAINT: &str = "users_user_name_key";
pub const USER_EMAIL_CONSTRAINT: &str = "users_email_key";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    // None until the store assigns a key
    #[sqlx(rename = "userId")]
    pub id: Option<i32>,
    #[sqlx(rename = "userName")]
    pub user_name: String,
    pub email: String,
    #[sqlx(rename = "fullName")]
    pub full_name: Option<String>,
}

impl User {
    pub fn new(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            user_name: user_name.into(),
            email: email.into(),
            full_name: None,
        }
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }
}

impl Entity for User {
    type Id = i32;

    fn id(&self) -> Option<i32> {
        self.id
    }
}

/// User keys are positive; both stores refuse anything else up front.
pub fn ensure_positive_key(id: i32) -> RepoResult<i32> {
    if id > 0 {
        Ok(id)
    } else {
        Err(RepoError::InvalidKey(i64::from(id)))
    }
}

/// The user store accessor: generic CRUD keyed by `i32`, nothing more.
pub trait UserRepository: CrudRepository<User> {}

impl<R: CrudRepository<User>> UserRepository for R {}

#[derive(Debug, Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COLUMNS: &str = r#""userId", "userName", email, "fullName""#;

/// What a write does when the explicit key already has a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnTakenKey {
    Replace,
    Refuse,
}

async fn write_on(conn: &mut PgConnection, user: &User, on_taken: OnTakenKey) -> RepoResult<User> {
    let Some(id) = user.id else {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ("userName", email, "fullName")
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.full_name)
        .fetch_one(&mut *conn)
        .await
        .map_err(RepoError::from_sqlx)?;

        return Ok(row);
    };
    ensure_positive_key(id)?;

    let row = match on_taken {
        OnTakenKey::Replace => sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ("userId", "userName", email, "fullName")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ("userId") DO UPDATE
            SET
                "userName" = EXCLUDED."userName",
                email = EXCLUDED.email,
                "fullName" = EXCLUDED."fullName",
                "updatedAt" = now()
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.full_name)
        .fetch_one(&mut *conn)
        .await
        .map_err(RepoError::from_sqlx)?,
        OnTakenKey::Refuse => sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ("userId", "userName", email, "fullName")
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ("userId") DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.full_name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(RepoError::from_sqlx)?
        .ok_or_else(|| RepoError::conflict(USER_KEY_CONSTRAINT))?,
    };

    // Explicit ids bypass the identity sequence; move it past `id` so
    // generated keys never collide. nextval - 1 keeps it where it was otherwise.
    sqlx::query(
        r#"
        SELECT setval(
            pg_get_serial_sequence('users', 'userId'),
            GREATEST($1::bigint, nextval(pg_get_serial_sequence('users', 'userId')) - 1)
        )
        "#,
    )
    .bind(i64::from(id))
    .execute(&mut *conn)
    .await?;

    Ok(row)
}

#[async_trait]
impl CrudRepository<User> for PgUserRepository {
    async fn find_by_id(&self, id: i32) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {COLUMNS} FROM users WHERE "userId" = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn exists_by_id(&self, id: i32) -> RepoResult<bool> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM users WHERE "userId" = $1)"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn find_all(&self) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {COLUMNS} FROM users ORDER BY "userId""#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_page(&self, limit: i64, offset: i64) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {COLUMNS}
            FROM users
            ORDER BY "userId"
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_all_by_id(&self, ids: &[i32]) -> RepoResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {COLUMNS} FROM users WHERE "userId" = ANY($1) ORDER BY "userId""#
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn save(&self, entity: User) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;
        let saved = write_on(&mut tx, &entity, OnTakenKey::Replace).await?;
        tx.commit().await?;

        Ok(saved)
    }

    async fn insert(&self, entity: User) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;
        let saved = write_on(&mut tx, &entity, OnTakenKey::Refuse).await?;
        tx.commit().await?;

        Ok(saved)
    }

    async fn save_all(&self, entities: Vec<User>) -> RepoResult<Vec<User>> {
        // all or nothing
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(entities.len());
        for entity in &entities {
            saved.push(write_on(&mut tx, entity, OnTakenKey::Replace).await?);
        }
        tx.commit().await?;

        Ok(saved)
    }

    async fn delete_by_id(&self, id: i32) -> RepoResult<bool> {
        let result = sqlx::query(r#"DELETE FROM users WHERE "userId" = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self) -> RepoResult<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
