use thiserror::Error;

use crate::models::AccountId;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Store is closed")]
    Closed,

    #[error("Tenant scope for account {active} is still active")]
    ScopeStillActive { active: AccountId },

    #[error("Tenant scope for account {account_id} is not the active scope")]
    ScopeMismatch { account_id: AccountId },

    #[error("Account {account_id} matched {rows} rows in the account table")]
    AmbiguousAccount { account_id: AccountId, rows: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;
