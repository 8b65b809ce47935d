//! The knowledge store's [`QueryService`] over the `json_prolog` ROS services.
//!
//! | Operation | Service | Request | Response |
//! |---|---|---|---|
//! | open | `/json_prolog/simple_query` | `{mode, id, query}` | `{ok, message}` |
//! | next | `/json_prolog/next_solution` | `{id}` | `{status, solution}` |
//! | finish | `/json_prolog/finish` | `{id}` | `{}` |
//!
//! `solution` is itself a JSON-encoded object of variable bindings.
//!
//! The sequencer is synchronous, so [`JsonPrologService`] owns a
//! current-thread Tokio runtime and blocks on each service call.

use std::time::Duration;

use refills_knowledge::{KnowledgeError, QueryId, QueryService, Solution};
use serde_json::{Value, json};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;
use uuid::Uuid;

use crate::rosbridge::{BridgeError, RosbridgeClient, ServiceTransport};

pub const SIMPLE_QUERY_SERVICE: &str = "/json_prolog/simple_query";
pub const NEXT_SOLUTION_SERVICE: &str = "/json_prolog/next_solution";
pub const FINISH_SERVICE: &str = "/json_prolog/finish";

/// `next_solution` status codes.
const STATUS_NO_SOLUTION: i64 = 0;
const STATUS_WRONG_ID: i64 = 1;
const STATUS_QUERY_FAILED: i64 = 2;
const STATUS_OK: i64 = 3;

pub struct JsonPrologService<T: ServiceTransport> {
    runtime: Runtime,
    transport: T,
}

impl JsonPrologService<RosbridgeClient> {
    /// Connect to a rosbridge server and use it for every query.
    pub fn connect(url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        let transport = runtime.block_on(RosbridgeClient::connect(url, timeout))?;
        Ok(Self { runtime, transport })
    }
}

impl<T: ServiceTransport> JsonPrologService<T> {
    pub fn with_transport(transport: T) -> Result<Self, BridgeError> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime, transport })
    }

    fn call(&mut self, service: &str, args: Value) -> Result<Value, KnowledgeError> {
        self.runtime
            .block_on(self.transport.call_service(service, args))
            .map_err(|e| KnowledgeError::Transport(e.to_string()))
    }
}

impl<T: ServiceTransport> QueryService for JsonPrologService<T> {
    fn open(&mut self, query: &str) -> Result<QueryId, KnowledgeError> {
        let id = Uuid::new_v4().to_string();
        let response = self.call(
            SIMPLE_QUERY_SERVICE,
            json!({"mode": 0, "id": id, "query": query}),
        )?;
        if response.get("ok").and_then(Value::as_bool) != Some(true) {
            let reason = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("query rejected")
                .to_string();
            return Err(KnowledgeError::QueryFailed {
                query: query.to_string(),
                reason,
            });
        }
        debug!(%id, "query opened");
        Ok(QueryId::new(id))
    }

    fn next_solution(&mut self, id: &QueryId) -> Result<Option<Solution>, KnowledgeError> {
        let response = self.call(NEXT_SOLUTION_SERVICE, json!({"id": id.as_str()}))?;
        let status = response.get("status").and_then(Value::as_i64);
        let solution = response
            .get("solution")
            .and_then(Value::as_str)
            .unwrap_or_default();
        match status {
            Some(STATUS_OK) => Ok(Some(serde_json::from_str(solution)?)),
            Some(STATUS_NO_SOLUTION) => Ok(None),
            Some(STATUS_WRONG_ID) => Err(KnowledgeError::UnknownQuery(id.to_string())),
            Some(STATUS_QUERY_FAILED) => Err(KnowledgeError::QueryFailed {
                query: id.to_string(),
                reason: solution.to_string(),
            }),
            other => Err(KnowledgeError::Transport(format!(
                "unexpected next_solution status {other:?}"
            ))),
        }
    }

    fn finish(&mut self, id: &QueryId) -> Result<(), KnowledgeError> {
        self.call(FINISH_SERVICE, json!({"id": id.as_str()}))?;
        debug!(%id, "query finished");
        Ok(())
    }
}
