//! Entities flowing through the network.

use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::json;

use crate::node::NodeId;
use crate::snapshot::Snapshot;

/// Identity of an item: the factory which created it and a per-factory sequence number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ItemId {
    /// Factory node which created the item.
    pub source: NodeId,
    /// Sequence number within the factory.
    pub seq: u64,
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.source, self.seq)
    }
}

/// Kind of a history record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Item entered a node.
    In,
    /// Item left a node.
    Out,
}

/// Single entry of the item history.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionRecord {
    /// Node where the action happened.
    pub node: NodeId,
    /// Whether the item entered or left the node.
    pub action: ActionType,
    /// Simulation time of the action.
    pub time: f64,
}

/// Entity flowing through the network.
///
/// Identity and history are owned by the engine, while `payload` holds domain-specific fields
/// which may be changed by the node currently holding the item.
#[derive(Clone, Debug)]
pub struct Item<P = ()> {
    id: ItemId,
    created_time: f64,
    processed: bool,
    history: Vec<ActionRecord>,
    /// Domain-specific data.
    pub payload: P,
}

impl<P> Item<P> {
    pub(crate) fn new(id: ItemId, created_time: f64, payload: P) -> Self {
        Self {
            id,
            created_time,
            processed: false,
            history: Vec::new(),
            payload,
        }
    }

    /// Returns the item identity.
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Returns the time when the item was created by its factory.
    pub fn created_time(&self) -> f64 {
        self.created_time
    }

    /// Returns `true` if the item has left the network.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// Returns the ordered history of visited nodes.
    pub fn history(&self) -> &[ActionRecord] {
        &self.history
    }

    /// Returns the time of the last history record.
    pub fn last_time(&self) -> f64 {
        self.history.last().map_or(self.created_time, |r| r.time)
    }

    /// Returns the time of leaving the network, if the item was processed.
    pub fn released_time(&self) -> Option<f64> {
        self.processed.then(|| self.last_time())
    }

    /// Returns the time spent in the network so far.
    pub fn time_in_system(&self) -> f64 {
        self.last_time() - self.created_time
    }

    pub(crate) fn record(&mut self, node: NodeId, action: ActionType, time: f64) {
        self.history.push(ActionRecord { node, action, time });
    }

    pub(crate) fn mark_processed(&mut self) {
        self.processed = true;
    }
}

impl<P> Snapshot for Item<P> {
    fn snapshot(&self) -> serde_json::Value {
        json!({
            "id": self.id.to_string(),
            "created_time": self.created_time,
            "processed": self.processed,
            "time_in_system": self.time_in_system(),
        })
    }
}
