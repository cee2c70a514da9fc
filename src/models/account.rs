use std::fmt;

use serde::{Deserialize, Serialize};

/// Externally assigned tenant identifier.
///
/// Stored as `bigint` in the roster table. The value is opaque to the
/// pipeline: it is only bound as a query parameter and printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A roster entry resolved against the account table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: String,
}

impl Account {
    pub fn new(id: i64, display_name: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            display_name: display_name.into(),
        }
    }
}
