/**
 * Responsibility
 * - repo が上位に伝える意味の定義
 * - not found / conflict / deadline を DB エラーと区別する
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("store deadline exceeded")]
    Timeout,
    #[error("db error")]
    Db(#[source] sqlx::Error),
}

impl RepoError {
    pub fn from_sqlx(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(dbe) = &e
            && dbe.code().as_deref() == Some("23505")
        {
            return RepoError::Conflict;
        }
        if matches!(e, sqlx::Error::RowNotFound) {
            return RepoError::NotFound;
        }
        RepoError::Db(e)
    }
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        RepoError::from_sqlx(e)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
