//! In-process knowledge store for headless runs and tests.
//!
//! [`SimStore`] answers each query from canned solutions chosen by substring
//! match, records every query text, and tracks which queries are still open so
//! tests can assert that nothing leaks.
//!
//! # Example
//!
//! ```rust
//! use refills_knowledge::sim::SimStore;
//! use refills_knowledge::{QueryService, QuerySession, Solution};
//! use serde_json::json;
//!
//! let store = SimStore::new().on(
//!     "belief_new_object",
//!     vec![Solution::from([("R".to_string(), json!("'shelf_system_1'"))])],
//! );
//! let mut service = store.clone();
//! let solutions = QuerySession::open(&mut service, "belief_new_object(x, R)")
//!     .unwrap()
//!     .collect_all()
//!     .unwrap();
//! assert_eq!(solutions.len(), 1);
//! assert_eq!(store.open_queries(), 0);
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::service::{KnowledgeError, QueryId, QueryService, Solution};

enum Response {
    Solutions(Vec<Solution>),
    FailOpen,
    FailNextSolution,
}

struct Rule {
    pattern: String,
    response: Response,
}

struct OpenQuery {
    query: String,
    solutions: VecDeque<Solution>,
    fail: bool,
}

#[derive(Default)]
struct StoreState {
    rules: Vec<Rule>,
    queries: Vec<String>,
    open: HashMap<QueryId, OpenQuery>,
    next_id: u64,
    finished: usize,
}

/// A canned-answer query service.  Clones share state.
///
/// Rules are tried in registration order; the first rule whose pattern is a
/// substring of the query wins.  Queries matching no rule have no solutions.
#[derive(Clone, Default)]
pub struct SimStore {
    state: Arc<Mutex<StoreState>>,
}

impl SimStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_rule(self, pattern: &str, response: Response) -> Self {
        self.lock().rules.push(Rule {
            pattern: pattern.to_string(),
            response,
        });
        self
    }

    /// Answer queries containing `pattern` with `solutions`.
    pub fn on(self, pattern: &str, solutions: Vec<Solution>) -> Self {
        self.push_rule(pattern, Response::Solutions(solutions))
    }

    /// Answer queries containing `pattern` with a single empty solution.
    pub fn on_true(self, pattern: &str) -> Self {
        self.on(pattern, vec![Solution::new()])
    }

    /// Reject queries containing `pattern` at open time.
    pub fn fail_open(self, pattern: &str) -> Self {
        self.push_rule(pattern, Response::FailOpen)
    }

    /// Accept queries containing `pattern` but fail when pulling solutions.
    pub fn fail_next_solution(self, pattern: &str) -> Self {
        self.push_rule(pattern, Response::FailNextSolution)
    }

    /// Every query text received so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    /// Received queries containing `pattern`.
    pub fn queries_matching(&self, pattern: &str) -> Vec<String> {
        self.lock()
            .queries
            .iter()
            .filter(|q| q.contains(pattern))
            .cloned()
            .collect()
    }

    /// Queries opened but not finished.
    pub fn open_queries(&self) -> usize {
        self.lock().open.len()
    }

    pub fn finished_count(&self) -> usize {
        self.lock().finished
    }
}

impl QueryService for SimStore {
    fn open(&mut self, query: &str) -> Result<QueryId, KnowledgeError> {
        let mut state = self.lock();
        state.queries.push(query.to_string());

        let (solutions, fail) = match state.rules.iter().find(|r| query.contains(&r.pattern)) {
            Some(Rule {
                response: Response::FailOpen,
                ..
            }) => {
                return Err(KnowledgeError::QueryFailed {
                    query: query.to_string(),
                    reason: "simulated open failure".to_string(),
                });
            }
            Some(Rule {
                response: Response::FailNextSolution,
                ..
            }) => (VecDeque::new(), true),
            Some(Rule {
                response: Response::Solutions(solutions),
                ..
            }) => (solutions.iter().cloned().collect(), false),
            None => (VecDeque::new(), false),
        };

        state.next_id += 1;
        let id = QueryId::new(format!("sim-{}", state.next_id));
        state.open.insert(
            id.clone(),
            OpenQuery {
                query: query.to_string(),
                solutions,
                fail,
            },
        );
        Ok(id)
    }

    fn next_solution(&mut self, id: &QueryId) -> Result<Option<Solution>, KnowledgeError> {
        let mut state = self.lock();
        let open = state
            .open
            .get_mut(id)
            .ok_or_else(|| KnowledgeError::UnknownQuery(id.to_string()))?;
        if open.fail {
            return Err(KnowledgeError::QueryFailed {
                query: open.query.clone(),
                reason: "simulated solution failure".to_string(),
            });
        }
        Ok(open.solutions.pop_front())
    }

    fn finish(&mut self, id: &QueryId) -> Result<(), KnowledgeError> {
        let mut state = self.lock();
        state
            .open
            .remove(id)
            .ok_or_else(|| KnowledgeError::UnknownQuery(id.to_string()))?;
        state.finished += 1;
        Ok(())
    }
}
