//! Hierarchical record of what the robot did.
//!
//! The log is an arena of nodes addressed by [`ActionHandle`].  Each node is
//! mirrored into the store's logging graph: starting a node opens a CRAM
//! action (chained to the previous sibling), links it under its parent, and
//! finishing it closes the action.
//!
//! The local tree is authoritative.  Store failures while logging are
//! reported with `warn!` and never change the control flow of the run; a
//! node the store refused keeps no remote id and is simply not mirrored.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use refills_hal::sim::SimFrames;
//! use refills_knowledge::sim::SimStore;
//! use refills_knowledge::{ActionKind, ActionLog, KnowRob};
//!
//! let mut kb = KnowRob::new(Box::new(SimStore::new()), Arc::new(SimFrames::default()));
//! let mut log = ActionLog::new();
//!
//! let run = log.start(&mut kb, ActionKind::Experiment, None).unwrap();
//! let step = log.start(&mut kb, ActionKind::ShelfFrameMapping, Some(run)).unwrap();
//! assert_eq!(log.finish(&mut kb, step).unwrap(), Some(run));
//! assert_eq!(log.finish(&mut kb, run).unwrap(), None);
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::KnowRob;
use crate::query::Query;

// ─────────────────────────────────────────────────────────────────────────────
// Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// How a child node hangs under its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    SubAction,
    SubMotion,
}

impl Relation {
    pub fn predicate(self) -> &'static str {
        match self {
            Relation::SubAction => "knowrob:subAction",
            Relation::SubMotion => "knowrob:subMotion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Experiment,
    ShelfSystemMapping,
    ShelfFrameMapping,
    ShelfLayerMapping,
    FindingShelfLayer,
    FindingShelfLayerParts,
    ShelfLayerPerception,
    Counting,
    MoveToShelfFrame,
    MoveToShelfLayer,
    LookingAtLocation,
    BaseMovement,
}

impl ActionKind {
    /// Class IRI of the action in the store.
    pub fn iri(self) -> &'static str {
        match self {
            ActionKind::Experiment => "muh#experiment",
            ActionKind::ShelfSystemMapping => "http://knowrob.org/kb/shop.owl#ShelfSystemMapping",
            ActionKind::ShelfFrameMapping => "http://knowrob.org/kb/shop.owl#ShelfFrameMapping",
            ActionKind::ShelfLayerMapping => "http://knowrob.org/kb/shop.owl#ShelfLayerMapping",
            ActionKind::FindingShelfLayer => "http://knowrob.org/kb/shop.owl#FindingShelfLayer",
            ActionKind::FindingShelfLayerParts => {
                "http://knowrob.org/kb/shop.owl#FindingShelfLayerParts"
            }
            ActionKind::ShelfLayerPerception => {
                "http://knowrob.org/kb/shop.owl#ShelfLayerPerception"
            }
            ActionKind::Counting => "muh#Counting",
            ActionKind::MoveToShelfFrame => "http://knowrob.org/kb/shop.owl#MoveToShelfFrame",
            ActionKind::MoveToShelfLayer => "http://knowrob.org/kb/shop.owl#MoveToShelfLayer",
            ActionKind::LookingAtLocation => "http://knowrob.org/kb/knowrob.owl#LookingAtLocation",
            ActionKind::BaseMovement => "http://knowrob.org/kb/motions.owl#BaseMovement",
        }
    }

    /// Relation to the parent node.
    pub fn relation(self) -> Relation {
        match self {
            ActionKind::BaseMovement => Relation::SubMotion,
            _ => Relation::SubAction,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Misuse of the log tree.  Store failures are never reported here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionLogError {
    #[error("Unknown action handle {0:?}")]
    UnknownHandle(ActionHandle),
    #[error("Action {0:?} is already finished")]
    AlreadyFinished(ActionHandle),
    #[error("Cannot start a child under finished action {0:?}")]
    ParentFinished(ActionHandle),
}

// ─────────────────────────────────────────────────────────────────────────────
// Arena
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionHandle(usize);

#[derive(Debug)]
struct ActionNode {
    kind: ActionKind,
    remote_id: Option<String>,
    parent: Option<ActionHandle>,
    previous: Option<ActionHandle>,
    last_child: Option<ActionHandle>,
    finished: bool,
}

#[derive(Debug, Default)]
pub struct ActionLog {
    nodes: Vec<ActionNode>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a node of `kind` under `parent` (or as a root), linked with the
    /// kind's [`Relation`].
    pub fn start(
        &mut self,
        kb: &mut KnowRob,
        kind: ActionKind,
        parent: Option<ActionHandle>,
    ) -> Result<ActionHandle, ActionLogError> {
        let previous = match parent {
            Some(p) => {
                let node = self.node(p)?;
                if node.finished {
                    return Err(ActionLogError::ParentFinished(p));
                }
                node.last_child
            }
            None => None,
        };

        let remote_previous = previous.and_then(|h| self.nodes[h.0].remote_id.clone());
        let remote_id = open_remote(kb, kind, remote_previous);

        let parent_remote = parent.and_then(|p| self.nodes[p.0].remote_id.clone());
        if let (Some(parent_remote), Some(child)) = (parent_remote, remote_id.as_ref()) {
            let link = Query::LinkAction {
                parent: parent_remote,
                relation: kind.relation().predicate(),
                child: child.clone(),
            };
            if let Err(e) = kb.query_all(&link) {
                warn!(error = %e, "failed to link action into logging graph");
            }
        }

        let handle = ActionHandle(self.nodes.len());
        self.nodes.push(ActionNode {
            kind,
            remote_id,
            parent,
            previous,
            last_child: None,
            finished: false,
        });
        if let Some(p) = parent {
            self.nodes[p.0].last_child = Some(handle);
        }
        debug!(?kind, ?handle, ?parent, "action started");
        Ok(handle)
    }

    /// Close `handle` and return its parent.
    pub fn finish(
        &mut self,
        kb: &mut KnowRob,
        handle: ActionHandle,
    ) -> Result<Option<ActionHandle>, ActionLogError> {
        let node = self.node(handle)?;
        if node.finished {
            return Err(ActionLogError::AlreadyFinished(handle));
        }
        if let Some(remote) = node.remote_id.clone() {
            let query = Query::FinishAction {
                action: remote,
                time: ros_time(Utc::now()),
            };
            if let Err(e) = kb.query_all(&query) {
                warn!(error = %e, "failed to finish action in logging graph");
            }
        }
        let node = &mut self.nodes[handle.0];
        node.finished = true;
        debug!(kind = ?node.kind, ?handle, "action finished");
        Ok(node.parent)
    }

    pub fn kind(&self, handle: ActionHandle) -> Option<ActionKind> {
        self.nodes.get(handle.0).map(|n| n.kind)
    }

    pub fn parent(&self, handle: ActionHandle) -> Option<ActionHandle> {
        self.nodes.get(handle.0).and_then(|n| n.parent)
    }

    /// The sibling started immediately before `handle`.
    pub fn previous(&self, handle: ActionHandle) -> Option<ActionHandle> {
        self.nodes.get(handle.0).and_then(|n| n.previous)
    }

    pub fn remote_id(&self, handle: ActionHandle) -> Option<&str> {
        self.nodes.get(handle.0).and_then(|n| n.remote_id.as_deref())
    }

    pub fn is_finished(&self, handle: ActionHandle) -> bool {
        self.nodes.get(handle.0).is_some_and(|n| n.finished)
    }

    /// Every handle issued so far, in start order.
    pub fn handles(&self) -> impl Iterator<Item = ActionHandle> + '_ {
        (0..self.nodes.len()).map(ActionHandle)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, handle: ActionHandle) -> Result<&ActionNode, ActionLogError> {
        self.nodes
            .get(handle.0)
            .ok_or(ActionLogError::UnknownHandle(handle))
    }
}

fn open_remote(kb: &mut KnowRob, kind: ActionKind, previous: Option<String>) -> Option<String> {
    let query = Query::StartAction {
        iri: kind.iri(),
        time: ros_time(Utc::now()),
        previous,
    };
    match kb.query_one(&query) {
        Ok(Some(solution)) => match solution.get("R").and_then(|v| v.as_str()) {
            Some(id) => Some(id.to_string()),
            None => {
                warn!(?kind, "store returned no action id");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(?kind, error = %e, "failed to start action in logging graph");
            None
        }
    }
}

/// Timestamp in the `secs.nanos` form the store expects.
fn ros_time(now: DateTime<Utc>) -> String {
    format!("{}.{:09}", now.timestamp(), now.timestamp_subsec_nanos())
}
