use crate::{
    db::error::{DbError, DbResult},
    models::AccountId,
};

/// Proof that the store is currently scoped to one tenant.
///
/// Only [`ScopeTracker::open`] creates scopes. A scope is not `Clone`:
/// it is handed back to `leave_tenant` exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct TenantScope {
    account_id: AccountId,
    seq: u64,
}

impl TenantScope {
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
}

/// Book-keeping for the single active tenant scope of a store.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    next_seq: u64,
    active: Option<(AccountId, u64)>,
}

impl ScopeTracker {
    pub fn active(&self) -> Option<AccountId> {
        self.active.map(|(id, _)| id)
    }

    pub fn open(&mut self, account_id: AccountId) -> DbResult<TenantScope> {
        if let Some((active, _)) = self.active {
            return Err(DbError::ScopeStillActive { active });
        }
        self.next_seq += 1;
        self.active = Some((account_id, self.next_seq));
        Ok(TenantScope {
            account_id,
            seq: self.next_seq,
        })
    }

    /// Fails unless `scope` is the active scope.
    pub fn check(&self, scope: &TenantScope) -> DbResult<()> {
        match self.active {
            Some((id, seq)) if id == scope.account_id && seq == scope.seq => Ok(()),
            _ => Err(DbError::ScopeMismatch {
                account_id: scope.account_id,
            }),
        }
    }

    pub fn close(&mut self, scope: TenantScope) -> DbResult<()> {
        self.check(&scope)?;
        self.active = None;
        Ok(())
    }

    /// Forget the active scope without a handle, after the store failed to
    /// establish it.
    pub fn abandon(&mut self) {
        self.active = None;
    }
}
