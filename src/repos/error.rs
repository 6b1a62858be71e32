/*
 * Responsibility
 * - repo が上位に伝える意味の定義
 * - unique 制約違反は Conflict、それ以外の DB エラーはそのまま Db
 * - キーは正の整数のみ (InvalidKey)、採番の上限到達は KeysExhausted
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error")]
    Db(#[from] sqlx::Error),
    #[error("conflict on {constraint}")]
    Conflict { constraint: String },
    #[error("key {0} is not a positive integer")]
    InvalidKey(i64),
    #[error("no keys left to generate")]
    KeysExhausted,
}

pub type RepoResult<T> = Result<T, RepoError>;

impl RepoError {
    pub fn conflict(constraint: impl Into<String>) -> Self {
        Self::Conflict {
            constraint: constraint.into(),
        }
    }

    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e {
            match dbe.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    return RepoError::conflict(dbe.constraint().unwrap_or("unique"));
                }
                // sequence_generator_limit_exceeded
                Some("2200H") => return RepoError::KeysExhausted,
                _ => {}
            }
        }
        RepoError::Db(e)
    }
}
