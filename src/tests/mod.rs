//! Shared test doubles.
//!
//! [`FakeStore`] implements the metric store contract in memory and records
//! every call, so pipeline tests can assert on the exact scope sequence.

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    db::{DbError, DbResult, MetricsStore, ScopeTracker, TenantScope},
    delivery::{ChatNotifier, DeliveryError, SheetAppender},
    metrics::{MetricQuery, MetricRow},
    models::{Account, AccountId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Enter(AccountId),
    Lookup(AccountId),
    Fetch(AccountId, &'static str),
    Leave(AccountId),
    Close,
}

#[derive(Default)]
pub struct FakeStore {
    accounts: HashMap<AccountId, String>,
    rows: HashMap<(AccountId, &'static str), Vec<MetricRow>>,
    failing_queries: HashSet<(AccountId, &'static str)>,
    failing_enter: HashSet<AccountId>,
    failing_leave: HashSet<AccountId>,
    scopes: ScopeTracker,
    events: Vec<StoreEvent>,
    closed: bool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, id: i64, display_name: &str) -> Self {
        self.accounts
            .insert(AccountId::new(id), display_name.to_string());
        self
    }

    pub fn with_rows(mut self, id: i64, query: &'static str, rows: Vec<MetricRow>) -> Self {
        self.rows.insert((AccountId::new(id), query), rows);
        self
    }

    pub fn failing_query(mut self, id: i64, query: &'static str) -> Self {
        self.failing_queries.insert((AccountId::new(id), query));
        self
    }

    pub fn failing_enter(mut self, id: i64) -> Self {
        self.failing_enter.insert(AccountId::new(id));
        self
    }

    pub fn failing_leave(mut self, id: i64) -> Self {
        self.failing_leave.insert(AccountId::new(id));
        self
    }

    pub fn events(&self) -> &[StoreEvent] {
        &self.events
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.closed {
            Err(DbError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetricsStore for FakeStore {
    async fn enter_tenant(&mut self, account_id: AccountId) -> DbResult<TenantScope> {
        self.ensure_open()?;
        self.events.push(StoreEvent::Enter(account_id));
        if self.failing_enter.contains(&account_id) {
            return Err(DbError::Internal("set_account failed".into()));
        }
        self.scopes.open(account_id)
    }

    async fn lookup_account(&mut self, scope: &TenantScope) -> DbResult<Option<Account>> {
        self.ensure_open()?;
        self.scopes.check(scope)?;
        let id = scope.account_id();
        self.events.push(StoreEvent::Lookup(id));
        Ok(self
            .accounts
            .get(&id)
            .map(|name| Account::new(id.get(), name.clone())))
    }

    async fn fetch(
        &mut self,
        scope: &TenantScope,
        query: &MetricQuery,
    ) -> DbResult<Vec<MetricRow>> {
        self.ensure_open()?;
        self.scopes.check(scope)?;
        let id = scope.account_id();
        self.events.push(StoreEvent::Fetch(id, query.name));
        if self.failing_queries.contains(&(id, query.name)) {
            return Err(DbError::Internal(format!("{} failed", query.name)));
        }
        Ok(self.rows.get(&(id, query.name)).cloned().unwrap_or_default())
    }

    async fn leave_tenant(&mut self, scope: TenantScope) -> DbResult<()> {
        self.ensure_open()?;
        let id = scope.account_id();
        self.scopes.close(scope)?;
        self.events.push(StoreEvent::Leave(id));
        if self.failing_leave.contains(&id) {
            return Err(DbError::Internal("savepoint release failed".into()));
        }
        Ok(())
    }

    async fn close(&mut self) -> DbResult<()> {
        if !self.closed {
            self.closed = true;
            self.events.push(StoreEvent::Close);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingChat {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingChat {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatNotifier for RecordingChat {
    async fn post_message(&self, text: &str) -> Result<(), DeliveryError> {
        self.messages.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(DeliveryError::Rejected {
                sink: "chat",
                status: 200,
                body: r#"{"ok":false,"error":"channel_not_found"}"#.into(),
            });
        }
        Ok(())
    }
}

pub struct RecordingSheet {
    url: String,
    batches: Mutex<Vec<Vec<Vec<String>>>>,
    fail: bool,
}

impl RecordingSheet {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            batches: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("https://sheet.invalid")
        }
    }

    pub fn batches(&self) -> Vec<Vec<Vec<String>>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl SheetAppender for RecordingSheet {
    async fn append_rows(&self, rows: &[Vec<String>]) -> Result<String, DeliveryError> {
        self.batches.lock().unwrap().push(rows.to_vec());
        if self.fail {
            return Err(DeliveryError::Rejected {
                sink: "spreadsheet",
                status: 429,
                body: "quota exceeded".into(),
            });
        }
        Ok(self.url.clone())
    }
}
