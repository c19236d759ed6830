//! Network stages.

pub mod factory;
pub mod queueing;
pub mod transition;

use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::json;

use crate::delay::{Delay, SimRng};
use crate::error::{Error, RuntimeInvariantError};
use crate::item::{ActionType, Item};
use crate::metrics::NodeMetrics;
use crate::network::Network;
use crate::snapshot::Snapshot;

pub use factory::FactoryNode;
pub use queueing::{NoHooks, QueueingHooks, QueueingNode};
pub use transition::{CustomRouter, ProbabilisticRouter, Router, TransitionNode};

/// Time of an idle node.
pub const INF_TIME: f64 = f64::INFINITY;

/// Non-owning handle of a node in the network table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the index in the network table.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an item goes after leaving a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
    /// Another node of the network.
    Node(NodeId),
    /// Leave the network, the item becomes processed.
    Exit,
}

impl From<NodeId> for Target {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

impl From<Option<NodeId>> for Target {
    fn from(node: Option<NodeId>) -> Self {
        node.map_or(Target::Exit, Target::Node)
    }
}

/// Outcome of delivering an item to a node.
pub(crate) enum Arrival<P> {
    Accepted,
    /// Item was lost because the node had no room for it.
    Rejected(Item<P>),
}

/// Item released by a node together with its destination.
pub(crate) struct Departure<P> {
    pub item: Item<P>,
    pub target: Target,
}

/// State shared by all node kinds: identity, clock, topology links and counters.
pub struct NodeCore {
    id: NodeId,
    name: String,
    current_time: f64,
    next_time: f64,
    next_node: Option<NodeId>,
    prev_node: Option<NodeId>,
    metrics: NodeMetrics,
}

impl NodeCore {
    fn new(id: NodeId, name: String) -> Self {
        Self {
            id,
            name,
            current_time: 0.,
            next_time: INF_TIME,
            next_node: None,
            prev_node: None,
            metrics: NodeMetrics::new(),
        }
    }

    /// Returns the node handle.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the local clock.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Returns the time of the next pending action, [`INF_TIME`] if idle.
    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    /// Returns the node receiving released items, `None` means exit.
    pub fn next_node(&self) -> Option<NodeId> {
        self.next_node
    }

    /// Returns the node which releases items into this one.
    pub fn prev_node(&self) -> Option<NodeId> {
        self.prev_node
    }

    /// Returns node counters.
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub(crate) fn set_next_time(&mut self, time: f64) {
        self.next_time = time;
    }

    pub(crate) fn set_next_node(&mut self, node: Option<NodeId>) {
        self.next_node = node;
    }

    pub(crate) fn set_prev_node(&mut self, node: Option<NodeId>) {
        self.prev_node = node;
    }

    pub(crate) fn record_in<P>(&mut self, item: &mut Item<P>) {
        self.metrics.num_in += 1;
        self.metrics.start_action_time = self.current_time;
        item.record(self.id, ActionType::In, self.current_time);
    }

    pub(crate) fn record_out<P>(&mut self, item: &mut Item<P>) {
        self.metrics.num_out += 1;
        self.metrics.end_action_time = self.current_time;
        item.record(self.id, ActionType::Out, self.current_time);
    }

    /// Samples the delay and returns the absolute time of the corresponding action.
    pub(crate) fn predict_time<P>(
        &self,
        delay: &mut Delay<P>,
        item: Option<&Item<P>>,
        rng: &mut SimRng,
    ) -> Result<f64, RuntimeInvariantError> {
        let value = delay
            .sample(item, rng)
            .ok_or_else(|| RuntimeInvariantError::MissingItem(self.name.clone()))?;
        if value < 0. || value.is_nan() {
            return Err(RuntimeInvariantError::NegativeDelay {
                node: self.name.clone(),
                delay: value,
            });
        }
        Ok(self.current_time + value)
    }

    fn advance(&mut self, time: f64) {
        self.metrics.passed_time += time - self.current_time;
        self.current_time = time;
    }

    fn reset(&mut self) {
        self.current_time = 0.;
        self.next_time = INF_TIME;
        self.metrics.reset();
    }
}

/// Behavior-specific part of a node.
pub enum NodeKind<P> {
    /// Source of items.
    Factory(FactoryNode<P>),
    /// Service stage with a waiting line and parallel channels.
    Queueing(QueueingNode<P>),
    /// Routing stage.
    Transition(TransitionNode<P>),
}

impl<P> NodeKind<P> {
    /// Returns the kind name used for auto-naming and snapshots.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Factory(_) => "Factory",
            NodeKind::Queueing(_) => "Queueing",
            NodeKind::Transition(_) => "Transition",
        }
    }
}

impl<P> From<FactoryNode<P>> for NodeKind<P> {
    fn from(node: FactoryNode<P>) -> Self {
        NodeKind::Factory(node)
    }
}

impl<P> From<QueueingNode<P>> for NodeKind<P> {
    fn from(node: QueueingNode<P>) -> Self {
        NodeKind::Queueing(node)
    }
}

impl<P> From<TransitionNode<P>> for NodeKind<P> {
    fn from(node: TransitionNode<P>) -> Self {
        NodeKind::Transition(node)
    }
}

/// Stage of the network, exclusively owned by the network table.
pub struct Node<P> {
    core: NodeCore,
    kind: NodeKind<P>,
}

impl<P: 'static> Node<P> {
    pub(crate) fn new(id: NodeId, name: String, kind: NodeKind<P>) -> Self {
        Self {
            core: NodeCore::new(id, name),
            kind,
        }
    }

    /// Returns the node handle.
    pub fn id(&self) -> NodeId {
        self.core.id
    }

    /// Returns the node name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Returns the local clock.
    pub fn time(&self) -> f64 {
        self.core.current_time
    }

    /// Returns the time of the next pending action, [`INF_TIME`] if idle.
    pub fn next_time(&self) -> f64 {
        self.core.next_time
    }

    /// Returns the shared node state.
    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    /// Returns node counters.
    pub fn metrics(&self) -> &NodeMetrics {
        &self.core.metrics
    }

    /// Returns the behavior-specific part.
    pub fn kind(&self) -> &NodeKind<P> {
        &self.kind
    }

    /// Returns the factory part if this is a factory node.
    pub fn as_factory(&self) -> Option<&FactoryNode<P>> {
        match &self.kind {
            NodeKind::Factory(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the queueing part if this is a queueing node.
    pub fn as_queueing(&self) -> Option<&QueueingNode<P>> {
        match &self.kind {
            NodeKind::Queueing(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the transition part if this is a transition node.
    pub fn as_transition(&self) -> Option<&TransitionNode<P>> {
        match &self.kind {
            NodeKind::Transition(node) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind<P> {
        &mut self.kind
    }

    /// Returns neighbours used for graph discovery: previous node, next node and route targets.
    pub fn connected_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.core.prev_node.into_iter().chain(self.core.next_node).collect();
        if let NodeKind::Transition(node) = &self.kind {
            nodes.extend(node.router().targets());
        }
        nodes
    }

    /// Chooses the destination of the held item, `None` for nodes which always release to their next node.
    pub(crate) fn choose_route(&self, network: &Network<P>, rng: &mut SimRng) -> Result<Option<Target>, Error> {
        match &self.kind {
            NodeKind::Transition(node) => node.choose_route(&self.core, network, rng).map(Some),
            _ => Ok(None),
        }
    }

    /// Returns `true` if completions of this node are counted as model events.
    pub(crate) fn counts_as_event(&self) -> bool {
        !matches!(self.kind, NodeKind::Transition(_))
    }

    /// Accepts an item arriving from upstream.
    pub(crate) fn start_action(&mut self, mut item: Item<P>, rng: &mut SimRng) -> Result<Arrival<P>, Error> {
        match &mut self.kind {
            NodeKind::Factory(_) => Err(RuntimeInvariantError::StartOnFactory(self.core.name.clone()).into()),
            NodeKind::Queueing(node) => {
                self.core.record_in(&mut item);
                node.start_action(&mut self.core, item, rng)
            }
            NodeKind::Transition(node) => {
                self.core.record_in(&mut item);
                node.start_action(&mut self.core, item, rng)?;
                Ok(Arrival::Accepted)
            }
        }
    }

    /// Completes the pending action and releases an item.
    ///
    /// `route` is the destination chosen for transition nodes; other kinds release to their next node.
    pub(crate) fn end_action(&mut self, route: Option<Target>, rng: &mut SimRng) -> Result<Departure<P>, Error> {
        let (mut item, target): (Item<P>, Target) = match &mut self.kind {
            NodeKind::Factory(node) => (node.end_action(&mut self.core, rng)?, self.core.next_node.into()),
            NodeKind::Queueing(node) => (node.end_action(&mut self.core, rng)?, self.core.next_node.into()),
            NodeKind::Transition(node) => {
                let target = route.ok_or_else(|| RuntimeInvariantError::NoPendingTask(self.core.name.clone()))?;
                (node.end_action(&mut self.core, target)?, target)
            }
        };
        self.core.record_out(&mut item);
        if let NodeKind::Queueing(node) = &mut self.kind {
            node.after_out(&self.core, &mut item);
        }
        Ok(Departure { item, target })
    }

    /// Advances the local clock, integrating time-weighted statistics over the elapsed interval first.
    pub(crate) fn update_time(&mut self, time: f64) {
        if let NodeKind::Queueing(node) = &mut self.kind {
            node.before_time_update(&self.core, time);
        }
        self.core.advance(time);
    }

    /// Restores the initial state and schedules the first action.
    pub(crate) fn reset(&mut self, rng: &mut SimRng) -> Result<(), Error> {
        self.core.reset();
        match &mut self.kind {
            NodeKind::Factory(node) => node.reset(&mut self.core, rng)?,
            NodeKind::Queueing(node) => node.reset(),
            NodeKind::Transition(node) => node.reset(),
        }
        Ok(())
    }

    pub(crate) fn reset_metrics(&mut self) {
        self.core.metrics.reset();
        if let NodeKind::Queueing(node) = &mut self.kind {
            node.reset_metrics();
        }
    }

    /// Returns node metrics including kind-specific statistics.
    pub fn metrics_snapshot(&self) -> serde_json::Value {
        let mut value = self.core.metrics.snapshot();
        value["node"] = json!(self.core.name);
        if let (NodeKind::Queueing(node), Some(map)) = (&self.kind, value.as_object_mut()) {
            if let serde_json::Value::Object(extra) = node.metrics().snapshot_with(&self.core.metrics) {
                map.extend(extra);
            }
        }
        value
    }
}

impl<P: 'static> Snapshot for Node<P> {
    fn snapshot(&self) -> serde_json::Value {
        let state = match &self.kind {
            NodeKind::Factory(node) => node.state_snapshot(),
            NodeKind::Queueing(node) => node.state_snapshot(),
            NodeKind::Transition(node) => node.state_snapshot(),
        };
        json!({
            "name": self.core.name,
            "kind": self.kind.kind_name(),
            "next_time": self.core.next_time,
            "state": state,
        })
    }
}
