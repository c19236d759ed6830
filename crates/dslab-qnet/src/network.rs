//! Node table and topology builder.

use std::collections::HashMap;

use crate::error::ConfigurationError;
use crate::log::log_config_error;
use crate::node::{Node, NodeId, NodeKind, Router, Target};

/// Owns all nodes of a queueing network and the links between them.
///
/// Nodes are referenced by [`NodeId`] handles, so cyclic topologies need no shared ownership.
///
/// # Examples
///
/// ```rust
/// use dslab_qnet::{ChannelPool, Delay, FactoryNode, FifoQueue, Network, QueueingNode, Target, TransitionNode};
///
/// let mut network = Network::<()>::new();
/// let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
/// let server = network.add(
///     "server",
///     QueueingNode::new(FifoQueue::new(), ChannelPool::new(Some(2)).unwrap(), Delay::constant(1.5)),
/// );
/// let router = network.add_auto(TransitionNode::probabilistic());
/// network.connect(source, server).unwrap();
/// network.connect(server, router).unwrap();
/// network.add_route(router, server, 0.3).unwrap();
/// assert!(network.add_route(router, Target::Exit, 0.8).is_err());
/// assert_eq!(network.node(router).unwrap().name(), "Transition1");
/// ```
pub struct Network<P> {
    nodes: Vec<Node<P>>,
    counters: HashMap<&'static str, usize>,
}

impl<P: 'static> Network<P> {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            counters: HashMap::new(),
        }
    }

    /// Adds a node with the given name and returns its handle.
    ///
    /// Names must be unique among the nodes of a model, this is checked when the model is built.
    pub fn add<S, K>(&mut self, name: S, node: K) -> NodeId
    where
        S: Into<String>,
        K: Into<NodeKind<P>>,
    {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, name.into(), node.into()));
        id
    }

    /// Adds a node named after its kind and a per-network counter, e.g. `Queueing3`.
    pub fn add_auto<K>(&mut self, node: K) -> NodeId
    where
        K: Into<NodeKind<P>>,
    {
        let kind = node.into();
        let counter = self.counters.entry(kind.kind_name()).or_insert(0);
        *counter += 1;
        let name = format!("{}{}", kind.kind_name(), counter);
        self.add(name, kind)
    }

    /// Sends items released by `from` to `to`.
    ///
    /// Transition nodes are linked with [`add_route`](Self::add_route) instead.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), ConfigurationError> {
        self.check(to)?;
        let source = self.node_or_err(from)?;
        if let NodeKind::Transition(_) = source.kind() {
            return Err(report(ConfigurationError::WrongNodeKind {
                node: source.name().to_owned(),
                expected: "factory or queueing",
            }));
        }
        self.nodes[from.0].core_mut().set_next_node(Some(to));
        self.nodes[to.0].core_mut().set_prev_node(Some(from));
        Ok(())
    }

    /// Adds a weighted route to a probabilistic transition node.
    ///
    /// Fails if the total weight of the node would exceed 1.
    pub fn add_route<T>(&mut self, transition: NodeId, target: T, weight: f64) -> Result<(), ConfigurationError>
    where
        T: Into<Target>,
    {
        let target = target.into();
        if let Target::Node(id) = target {
            self.check(id)?;
        }
        let node = self.node_mut_or_err(transition)?;
        let name = node.name().to_owned();
        match node.kind_mut() {
            NodeKind::Transition(transition_node) => match transition_node.router_mut() {
                Router::Probabilistic(router) => router.add_route(&name, target, weight).map_err(report)?,
                Router::Custom(_) => {
                    return Err(report(ConfigurationError::WrongNodeKind {
                        node: name,
                        expected: "probabilistic transition",
                    }))
                }
            },
            _ => {
                return Err(report(ConfigurationError::WrongNodeKind {
                    node: name,
                    expected: "transition",
                }))
            }
        }
        if let Target::Node(id) = target {
            let core = self.nodes[id.0].core_mut();
            if core.prev_node().is_none() {
                core.set_prev_node(Some(transition));
            }
        }
        Ok(())
    }

    /// Returns the node with the given handle.
    pub fn node(&self, id: NodeId) -> Option<&Node<P>> {
        self.nodes.get(id.0)
    }

    /// Returns the first node with the given name.
    pub fn find(&self, name: &str) -> Option<&Node<P>> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the network has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Node<P>> + '_ {
        self.nodes.iter()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<P> {
        &mut self.nodes[id.0]
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> &Node<P> {
        &self.nodes[id.0]
    }

    pub(crate) fn check(&self, id: NodeId) -> Result<(), ConfigurationError> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(report(ConfigurationError::UnknownNode(id.0)))
        }
    }

    fn node_or_err(&self, id: NodeId) -> Result<&Node<P>, ConfigurationError> {
        self.check(id)?;
        Ok(&self.nodes[id.0])
    }

    fn node_mut_or_err(&mut self, id: NodeId) -> Result<&mut Node<P>, ConfigurationError> {
        self.check(id)?;
        Ok(&mut self.nodes[id.0])
    }
}

impl<P: 'static> Default for Network<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn report(err: ConfigurationError) -> ConfigurationError {
    log_config_error(&err);
    err
}
