//! Query service contract and scoped query sessions.
//!
//! The store answers a query incrementally: a query is opened, solutions are
//! pulled one by one, and the query must be finished to release the server
//! side cursor.  [`QuerySession`] owns that last step so that a query is
//! released on every exit path, including `?` returns.

use std::collections::BTreeMap;
use std::fmt;

use refills_types::RefillsError;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// Error type
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can arise while talking to the knowledge store.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Query '{query}' failed: {reason}")]
    QueryFailed { query: String, reason: String },
    #[error("Unknown query id '{0}'")]
    UnknownQuery(String),
    #[error("Query '{0}' returned no solution")]
    NoSolution(String),
    #[error("Unexpected binding for '{variable}' in '{query}': {reason}")]
    Binding {
        query: String,
        variable: String,
        reason: String,
    },
    #[error("Frame lookup failed: {0}")]
    Frame(#[from] RefillsError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<KnowledgeError> for RefillsError {
    fn from(err: KnowledgeError) -> Self {
        match err {
            KnowledgeError::Frame(inner) => inner,
            other => RefillsError::Knowledge(other.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// QueryService
// ─────────────────────────────────────────────────────────────────────────────

/// Variable bindings of one solution, keyed by Prolog variable name.
///
/// An empty map is a solution of a query without variables ("true").
pub type Solution = BTreeMap<String, Value>;

/// Server-side handle of an open query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The incremental query interface of the store.
pub trait QueryService: Send {
    /// Submit `query` and return a handle for pulling solutions.
    fn open(&mut self, query: &str) -> Result<QueryId, KnowledgeError>;

    /// Next solution of an open query, `None` when exhausted.
    fn next_solution(&mut self, id: &QueryId) -> Result<Option<Solution>, KnowledgeError>;

    /// Release an open query.
    fn finish(&mut self, id: &QueryId) -> Result<(), KnowledgeError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// QuerySession
// ─────────────────────────────────────────────────────────────────────────────

/// An open query that is finished when dropped.
pub struct QuerySession<'a> {
    service: &'a mut dyn QueryService,
    id: QueryId,
    query: String,
}

impl<'a> QuerySession<'a> {
    pub fn open(service: &'a mut dyn QueryService, query: &str) -> Result<Self, KnowledgeError> {
        let id = service.open(query)?;
        Ok(Self {
            service,
            id,
            query: query.to_string(),
        })
    }

    pub fn id(&self) -> &QueryId {
        &self.id
    }

    pub fn next_solution(&mut self) -> Result<Option<Solution>, KnowledgeError> {
        self.service.next_solution(&self.id)
    }

    /// Pull every remaining solution.  The query is finished afterwards.
    pub fn collect_all(mut self) -> Result<Vec<Solution>, KnowledgeError> {
        let mut solutions = Vec::new();
        while let Some(solution) = self.next_solution()? {
            solutions.push(solution);
        }
        Ok(solutions)
    }
}

impl Drop for QuerySession<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.service.finish(&self.id) {
            warn!(query = %self.query, id = %self.id, error = %e, "failed to finish query");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimStore;
    use serde_json::json;

    fn solution(var: &str, value: Value) -> Solution {
        Solution::from([(var.to_string(), value)])
    }

    #[test]
    fn collect_all_returns_every_solution_and_finishes() {
        let store = SimStore::new().on("member(X", vec![
            solution("X", json!(1)),
            solution("X", json!(2)),
        ]);
        let mut service = store.clone();
        let solutions = QuerySession::open(&mut service, "member(X, [1,2])")
            .unwrap()
            .collect_all()
            .unwrap();
        assert_eq!(solutions.len(), 2);
        assert_eq!(store.open_queries(), 0);
        assert_eq!(store.finished_count(), 1);
    }

    #[test]
    fn session_finishes_on_early_drop() {
        let store = SimStore::new().on("member(X", vec![
            solution("X", json!(1)),
            solution("X", json!(2)),
        ]);
        let mut service = store.clone();
        {
            let mut session = QuerySession::open(&mut service, "member(X, [1,2])").unwrap();
            assert!(session.next_solution().unwrap().is_some());
        }
        assert_eq!(store.open_queries(), 0);
    }

    #[test]
    fn session_finishes_when_pulling_fails() {
        let store = SimStore::new().fail_next_solution("broken(");
        let mut service = store.clone();
        let result = QuerySession::open(&mut service, "broken(X)")
            .unwrap()
            .collect_all();
        assert!(result.is_err());
        assert_eq!(store.open_queries(), 0);
    }

    #[test]
    fn failed_open_leaves_nothing_open() {
        let store = SimStore::new().fail_open("nope(");
        let mut service = store.clone();
        assert!(QuerySession::open(&mut service, "nope(X)").is_err());
        assert_eq!(store.open_queries(), 0);
        assert_eq!(store.finished_count(), 0);
    }

    #[test]
    fn knowledge_error_converts_to_refills_error() {
        let err: RefillsError = KnowledgeError::NoSolution("q".to_string()).into();
        assert!(matches!(err, RefillsError::Knowledge(_)));

        let frame = RefillsError::Hardware {
            component: "tf".to_string(),
            details: "missing".to_string(),
        };
        let err: RefillsError = KnowledgeError::Frame(frame.clone()).into();
        assert_eq!(err, frame);
    }
}
