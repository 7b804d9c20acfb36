//! In-process [`Backend`] for tests that need to see the emitted SQL
//!
//! Replies are scripted in call order; when the script runs out, fetches
//! return no rows and batches report one affected row per statement.

use crate::backend::Backend;
use crate::dialect::Dialect;
use crate::params::Statement;
use async_trait::async_trait;
use sqlh_core::{Error, Result, Row};
use std::collections::VecDeque;
use std::sync::Mutex;

/// What a recorded call asked the engine to do
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Fetch(Statement),
    Execute(Vec<Statement>),
}

enum Reply {
    Rows(Vec<Row>),
    Affected(u64),
    Fail(String),
}

#[derive(Default)]
struct State {
    replies: VecDeque<Reply>,
    calls: Vec<RecordedCall>,
    closed: bool,
}

/// Records every call and answers from a script
pub struct RecordingBackend {
    dialect: Dialect,
    state: Mutex<State>,
}

impl RecordingBackend {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Mutex::new(State::default()),
        }
    }

    /// Queue rows for the next call
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.lock().replies.push_back(Reply::Rows(rows));
        self
    }

    /// Queue an affected-row count for the next call
    pub fn push_affected(&self, rows: u64) -> &Self {
        self.lock().replies.push_back(Reply::Affected(rows));
        self
    }

    /// Make the next call fail as if the engine rejected it
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.lock().replies.push_back(Reply::Fail(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// Every statement sent so far, batches flattened
    pub fn statements(&self) -> Vec<Statement> {
        self.lock()
            .calls
            .iter()
            .flat_map(|call| match call {
                RecordedCall::Fetch(statement) => vec![statement.clone()],
                RecordedCall::Execute(statements) => statements.clone(),
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(&self, call: RecordedCall, sql: &str) -> Result<Option<Reply>> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Connection(sqlx::Error::PoolClosed));
        }
        state.calls.push(call);
        match state.replies.pop_front() {
            Some(Reply::Fail(message)) => {
                Err(Error::execution(sql, sqlx::Error::Protocol(message)))
            }
            other => Ok(other),
        }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>> {
        match self.next_reply(RecordedCall::Fetch(statement.clone()), &statement.sql)? {
            Some(Reply::Rows(rows)) => Ok(rows),
            _ => Ok(Vec::new()),
        }
    }

    async fn execute_all(&self, statements: &[Statement]) -> Result<u64> {
        let first = statements.first().map(|s| s.sql.as_str()).unwrap_or_default();
        match self.next_reply(RecordedCall::Execute(statements.to_vec()), first)? {
            Some(Reply::Affected(rows)) => Ok(rows),
            _ => Ok(statements.len() as u64),
        }
    }

    async fn close(&self) {
        self.lock().closed = true;
    }
}
