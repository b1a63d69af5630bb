//! # tessera-testing
//!
//! An in-memory fake driver and context builders for the tessera test
//! suites. Dev-only; never published.
//!
//! The [`FakeDb`] records every command it executes and serves scripted
//! responses matched by SQL substring, so suites can assert both the SQL
//! a layer synthesises and how it reacts to driver outcomes (unique
//! violations, empty results, generated keys).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_core::context::{DatabaseContext, DatabaseContextConfiguration, shared_type_registry};
use tessera_core::driver::{
    ConnectionFactory, DriverCommand, DriverConnection, DriverError, RowSet,
};
use tessera_core::error::Result;
use tessera_core::mode::{DbMode, ReadWriteMode};
use tessera_types::{DbValue, Parameter};

/// A scripted driver outcome.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    /// `execute` reports this affected-row count.
    Affected(u64),
    /// `query` returns these rows (and `execute` their count).
    Rows(RowSet),
    /// `query`/`scalar` return a single cell.
    Scalar(DbValue),
    /// The command fails.
    Error(DriverError),
}

/// One command the fake observed.
#[derive(Debug, Clone)]
pub struct ExecutedCommand {
    /// Connection that ran it.
    pub connection_id: u64,
    /// Command text.
    pub sql: String,
    /// Bound parameters.
    pub parameters: Vec<Parameter>,
}

#[derive(Debug)]
struct Script {
    pattern: String,
    once: bool,
    responses: VecDeque<FakeResponse>,
}

#[derive(Default)]
struct FakeState {
    scripts: Mutex<Vec<Script>>,
    log: Mutex<Vec<ExecutedCommand>>,
    opened: AtomicU64,
    open_now: AtomicU64,
}

impl FakeState {
    fn respond(&self, sql: &str) -> Option<FakeResponse> {
        let mut scripts = self.scripts.lock();
        let idx = scripts.iter().position(|s| sql.contains(&s.pattern))?;
        let script = &mut scripts[idx];
        let response = if script.once {
            script.responses.pop_front()
        } else {
            script
                .responses
                .front()
                .cloned()
                .or_else(|| script.responses.pop_front())
        };
        if script.responses.is_empty() && script.once {
            scripts.remove(idx);
        }
        response
    }
}

/// The fake database: a [`ConnectionFactory`] plus scripting and
/// inspection handles.
#[derive(Clone)]
pub struct FakeDb {
    provider: String,
    state: Arc<FakeState>,
}

impl FakeDb {
    /// Create a fake serving the given provider name.
    #[must_use]
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            state: Arc::new(FakeState::default()),
        }
    }

    /// Script a standing response for every command containing `pattern`.
    pub fn when(&self, pattern: impl Into<String>, response: FakeResponse) {
        self.state.scripts.lock().push(Script {
            pattern: pattern.into(),
            once: false,
            responses: VecDeque::from([response]),
        });
    }

    /// Script a one-shot response; consumed by the first matching command.
    pub fn when_once(&self, pattern: impl Into<String>, response: FakeResponse) {
        self.state.scripts.lock().push(Script {
            pattern: pattern.into(),
            once: true,
            responses: VecDeque::from([response]),
        });
    }

    /// Every command executed so far, in order.
    #[must_use]
    pub fn executed(&self) -> Vec<ExecutedCommand> {
        self.state.log.lock().clone()
    }

    /// Commands whose text contains `pattern`.
    #[must_use]
    pub fn executed_matching(&self, pattern: &str) -> Vec<ExecutedCommand> {
        self.executed()
            .into_iter()
            .filter(|c| c.sql.contains(pattern))
            .collect()
    }

    /// Total connections ever opened.
    #[must_use]
    pub fn connections_opened(&self) -> u64 {
        self.state.opened.load(Ordering::Relaxed)
    }

    /// Connections currently open.
    #[must_use]
    pub fn connections_open_now(&self) -> u64 {
        self.state.open_now.load(Ordering::Relaxed)
    }

    /// Build a context over this fake.
    ///
    /// # Errors
    ///
    /// Propagates context construction failures.
    pub fn context(
        &self,
        db_mode: DbMode,
        read_write_mode: ReadWriteMode,
    ) -> Result<Arc<DatabaseContext>> {
        let config = DatabaseContextConfiguration::new()
            .connection_string("Host=fake;Database=fake")
            .provider_name(self.provider.clone())
            .db_mode(db_mode)
            .read_write_mode(read_write_mode);
        DatabaseContext::new(config, Arc::new(self.clone()), shared_type_registry())
    }

    /// Build a standard read-write context over this fake.
    ///
    /// # Errors
    ///
    /// Propagates context construction failures.
    pub fn standard_context(&self) -> Result<Arc<DatabaseContext>> {
        self.context(DbMode::Standard, ReadWriteMode::ReadWrite)
    }
}

#[async_trait]
impl ConnectionFactory for FakeDb {
    async fn open(
        &self,
        _connection_string: &str,
    ) -> std::result::Result<Box<dyn DriverConnection>, DriverError> {
        let id = self.state.opened.fetch_add(1, Ordering::Relaxed) + 1;
        self.state.open_now.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(FakeConnection {
            id,
            state: Arc::clone(&self.state),
            open: AtomicU64::new(1),
        }))
    }

    fn provider_name(&self) -> &str {
        &self.provider
    }
}

struct FakeConnection {
    id: u64,
    state: Arc<FakeState>,
    open: AtomicU64,
}

impl FakeConnection {
    fn record(&self, command: &DriverCommand) {
        self.state.log.lock().push(ExecutedCommand {
            connection_id: self.id,
            sql: command.text.clone(),
            parameters: command.parameters.clone(),
        });
    }
}

#[async_trait]
impl DriverConnection for FakeConnection {
    async fn execute(&self, command: &DriverCommand) -> std::result::Result<u64, DriverError> {
        self.record(command);
        match self.state.respond(&command.text) {
            Some(FakeResponse::Affected(n)) => Ok(n),
            Some(FakeResponse::Rows(rows)) => Ok(rows.len() as u64),
            Some(FakeResponse::Scalar(_)) => Ok(1),
            Some(FakeResponse::Error(e)) => Err(e),
            None => Ok(1),
        }
    }

    async fn query(&self, command: &DriverCommand) -> std::result::Result<RowSet, DriverError> {
        self.record(command);
        match self.state.respond(&command.text) {
            Some(FakeResponse::Rows(rows)) => Ok(rows),
            Some(FakeResponse::Scalar(value)) => Ok(RowSet {
                columns: vec!["value".into()],
                rows: vec![vec![value]],
            }),
            Some(FakeResponse::Affected(_)) | None => Ok(RowSet::default()),
            Some(FakeResponse::Error(e)) => Err(e),
        }
    }

    async fn close(&self) -> std::result::Result<(), DriverError> {
        if self.open.swap(0, Ordering::AcqRel) == 1 {
            self.state.open_now.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) == 1
    }
}

/// Build a one-column, one-row [`RowSet`].
#[must_use]
pub fn single_cell(column: &str, value: DbValue) -> RowSet {
    RowSet {
        columns: vec![column.to_owned()],
        rows: vec![vec![value]],
    }
}

/// Build a [`RowSet`] from column names and rows.
#[must_use]
pub fn rows(columns: &[&str], data: Vec<Vec<DbValue>>) -> RowSet {
    RowSet {
        columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        rows: data,
    }
}
