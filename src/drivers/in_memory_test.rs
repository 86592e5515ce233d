use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::ConnectOptions;
use crate::error::{PluginError, Result};
use crate::traits::{BoxedConnection, ConnectionFactory, DatabaseConnection};
use crate::types::{RawQueryResult, SqlValue};

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Default)]
struct State {
    responses: VecDeque<Result<RawQueryResult>>,
    default_response: RawQueryResult,
    connect_error: Option<String>,
    close_error: Option<String>,
    opened: Vec<ConnectOptions>,
    closed: usize,
    recorded_queries: Vec<RecordedQuery>,
}

/// An in-memory connection factory for testing.
///
/// Every connection it opens shares one script of responses and one record of
/// what happened, so a test can verify queries and the open/close balance.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use mysql_plugin::drivers::{InMemoryTestFactory, InMemoryTestResponseBuilder};
///
/// let factory = Arc::new(
///     InMemoryTestFactory::new().with_response(
///         InMemoryTestResponseBuilder::new()
///             .columns(&["id", "name"])
///             .row(&["1", "Alice"])
///             .build(),
///     ),
/// );
/// ```
#[derive(Clone, Default)]
pub struct InMemoryTestFactory {
    state: Arc<Mutex<State>>,
}

impl InMemoryTestFactory {
    /// Create a new factory with no pre-configured responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response to be returned by the next query.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: RawQueryResult) -> Self {
        self.state.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    /// Make the next query fail with the given driver message.
    pub fn with_query_error(self, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Err(PluginError::Driver(message.to_string())));
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(self, response: RawQueryResult) -> Self {
        self.state.lock().unwrap().default_response = response;
        self
    }

    /// Make every connection attempt fail with the given driver message.
    pub fn with_connect_error(self, message: &str) -> Self {
        self.state.lock().unwrap().connect_error = Some(message.to_string());
        self
    }

    /// Make every close fail with the given driver message.
    pub fn with_close_error(self, message: &str) -> Self {
        self.state.lock().unwrap().close_error = Some(message.to_string());
        self
    }

    /// Options of every successfully opened connection.
    pub fn opened_connections(&self) -> Vec<ConnectOptions> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        self.state.lock().unwrap().recorded_queries.clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        self.state.lock().unwrap().recorded_queries.last().cloned()
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let last = self.last_query().expect("No queries were recorded");
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = self.state.lock().unwrap().recorded_queries.len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    /// Assert that n connections were opened and every one was closed once.
    pub fn assert_balanced(&self, expected_opens: usize) {
        let state = self.state.lock().unwrap();
        assert_eq!(
            state.opened.len(),
            expected_opens,
            "Open count mismatch. Expected: {}, Actual: {}",
            expected_opens,
            state.opened.len()
        );
        assert_eq!(
            state.closed,
            state.opened.len(),
            "Connections leaked or double-closed. Opened: {}, Closed: {}",
            state.opened.len(),
            state.closed
        );
    }
}

#[async_trait]
impl ConnectionFactory for InMemoryTestFactory {
    async fn create(&self, options: &ConnectOptions) -> Result<BoxedConnection> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.connect_error {
            return Err(PluginError::Driver(message.clone()));
        }
        state.opened.push(options.clone());
        Ok(Box::new(InMemoryTestConnection {
            state: Arc::clone(&self.state),
            closed: false,
        }))
    }
}

struct InMemoryTestConnection {
    state: Arc<Mutex<State>>,
    closed: bool,
}

#[async_trait]
impl DatabaseConnection for InMemoryTestConnection {
    async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        let mut state = self.state.lock().unwrap();
        state.recorded_queries.push(RecordedQuery {
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        // Return next queued response or default
        match state.responses.pop_front() {
            Some(response) => response,
            None => Ok(state.default_response.clone()),
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !self.closed {
            self.closed = true;
            state.closed += 1;
        }
        match &state.close_error {
            Some(message) => Err(PluginError::Driver(message.clone())),
            None => Ok(()),
        }
    }
}

/// Builder for creating test responses easily.
///
/// Cells that parse as JSON keep their type (`"1"` becomes a number); anything
/// else is a string.
#[derive(Default)]
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of cell literals.
    pub fn row(mut self, values: &[&str]) -> Self {
        self.rows.push(
            values
                .iter()
                .map(|s| serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string())))
                .collect(),
        );
        self
    }

    /// Add a row of JSON values.
    pub fn json_row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        RawQueryResult::new(self.columns, self.rows)
    }
}
