//! Next-event scheduler driving a queueing network.

use std::collections::HashSet;

use rand::SeedableRng;

use crate::delay::SimRng;
use crate::error::{ConfigurationError, Error, RuntimeInvariantError};
use crate::item::Item;
use crate::log::log_config_error;
use crate::metrics::{ModelMetrics, TIME_EPSILON};
use crate::network::Network;
use crate::node::{Arrival, Departure, Node, NodeId, NodeKind, Router, Target, INF_TIME};
use crate::snapshot::{EvaluationReport, ModelSnapshot, Reporter, Snapshot};
use crate::{log_debug, log_info, log_trace};

/// Named function computing a result from the model state, e.g. the mean number of items in the system.
pub struct Evaluation<P> {
    name: String,
    evaluate: Box<dyn Fn(&Model<P>) -> f64>,
}

impl<P> Evaluation<P> {
    /// Creates an evaluation.
    pub fn new<S, F>(name: S, evaluate: F) -> Self
    where
        S: Into<String>,
        F: Fn(&Model<P>) -> f64 + 'static,
    {
        Self {
            name: name.into(),
            evaluate: Box::new(evaluate),
        }
    }

    /// Returns the evaluation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Computes the result for the given model.
    pub fn evaluate(&self, model: &Model<P>) -> EvaluationReport {
        EvaluationReport {
            name: self.name.clone(),
            result: (self.evaluate)(model),
        }
    }
}

/// Queueing network simulation.
///
/// Owns the network, advances a single logical clock from one node action to the next
/// and collects aggregate statistics.
///
/// # Examples
///
/// ```rust
/// use dslab_qnet::{ChannelPool, Delay, FactoryNode, FifoQueue, Model, Network, QueueingNode};
///
/// let mut network = Network::<()>::new();
/// let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
/// let server = network.add(
///     "server",
///     QueueingNode::new(FifoQueue::new(), ChannelPool::new(Some(1)).unwrap(), Delay::constant(1.)),
/// );
/// network.connect(source, server).unwrap();
///
/// let mut model = Model::new(network, source, 123).unwrap();
/// model.simulate(5.).unwrap();
/// assert_eq!(model.time(), 5.);
/// assert_eq!(model.node(server).unwrap().metrics().num_in, 5);
/// assert_eq!(model.node(server).unwrap().metrics().num_out, 4);
/// ```
pub struct Model<P> {
    name: String,
    network: Network<P>,
    order: Vec<NodeId>,
    current_time: f64,
    metrics: ModelMetrics,
    seed: u64,
    rng: SimRng,
    processed: Vec<Item<P>>,
    lost: Vec<Item<P>>,
    evaluations: Vec<Evaluation<P>>,
    updated_nodes: Vec<NodeId>,
}

impl<P: 'static> Model<P> {
    /// Builds a model from the nodes reachable from `root`.
    ///
    /// Nodes are discovered by following previous nodes, next nodes and route targets.
    /// The discovery order is used to fire nodes scheduled at the same time.
    pub fn new(mut network: Network<P>, root: NodeId, seed: u64) -> Result<Self, Error> {
        network.check(root)?;
        let order = discover(&network, root)?;
        for &id in &order {
            let node = network.node_mut(id);
            let name = node.name().to_owned();
            if let NodeKind::Transition(transition) = node.kind_mut() {
                if let Router::Probabilistic(router) = transition.router_mut() {
                    router.seal(&name).map_err(|e| {
                        log_config_error(&e);
                        e
                    })?;
                }
            }
        }
        let mut model = Self {
            name: "model".to_string(),
            network,
            order,
            current_time: 0.,
            metrics: ModelMetrics::default(),
            seed,
            rng: SimRng::seed_from_u64(seed),
            processed: Vec::new(),
            lost: Vec::new(),
            evaluations: Vec::new(),
            updated_nodes: Vec::new(),
        };
        model.reset()?;
        log_debug!(model, "discovered {} nodes from `{}`", model.order.len(), model.network.node_ref(root).name());
        Ok(model)
    }

    /// Sets the model name used in logs and snapshots.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers an evaluation reported at the end of [`simulate_with`](Self::simulate_with).
    pub fn add_evaluation(&mut self, evaluation: Evaluation<P>) {
        self.evaluations.push(evaluation);
    }

    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the model clock.
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Returns the seed of the random number generator.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the underlying network.
    pub fn network(&self) -> &Network<P> {
        &self.network
    }

    #[cfg(test)]
    pub(crate) fn network_mut(&mut self) -> &mut Network<P> {
        &mut self.network
    }

    /// Iterates over model nodes in firing order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node<P>> + '_ {
        self.order.iter().map(|&id| self.network.node_ref(id))
    }

    /// Returns handles of model nodes in firing order.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Returns the node with the given handle.
    pub fn node(&self, id: NodeId) -> Option<&Node<P>> {
        self.network.node(id)
    }

    /// Returns the model node with the given name.
    pub fn find(&self, name: &str) -> Option<&Node<P>> {
        self.nodes().find(|node| node.name() == name)
    }

    /// Returns nodes fired during the last step.
    pub fn updated_nodes(&self) -> &[NodeId] {
        &self.updated_nodes
    }

    /// Returns aggregate statistics.
    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    /// Returns items which left the network.
    pub fn processed_items(&self) -> &[Item<P>] {
        &self.processed
    }

    /// Returns items rejected by full queueing nodes.
    pub fn lost_items(&self) -> &[Item<P>] {
        &self.lost
    }

    /// Mean time spent in the network by processed items.
    pub fn mean_time_in_system(&self) -> f64 {
        self.metrics.mean_time_in_system()
    }

    /// Returns the earliest scheduled action time, [`INF_TIME`] if nothing is scheduled.
    pub fn next_time(&self) -> f64 {
        self.nodes().map(|node| node.next_time()).fold(INF_TIME, f64::min)
    }

    /// Advances the model to the next scheduled action, but not past `horizon`.
    ///
    /// Returns `false` once there is nothing left to do before the horizon.
    pub fn step(&mut self, horizon: f64) -> Result<bool, Error> {
        let next_time = self.next_time();
        if next_time == INF_TIME && horizon == INF_TIME {
            return Ok(false);
        }
        self.goto(next_time, horizon)?;
        Ok(next_time <= horizon)
    }

    /// Moves the clock to `min(time, horizon)` and fires all nodes scheduled at that time.
    ///
    /// The clock never passes the earliest scheduled action, so a `time` beyond it stops there
    /// and no action is skipped.
    pub fn goto(&mut self, time: f64, horizon: f64) -> Result<(), Error> {
        self.check_schedule()?;
        let new_time = time.min(self.next_time()).min(horizon).max(self.current_time);
        if new_time == INF_TIME {
            return Ok(());
        }
        self.metrics.passed_time += new_time - self.current_time;
        for &id in &self.order {
            self.network.node_mut(id).update_time(new_time);
        }
        self.current_time = new_time;

        self.updated_nodes.clear();
        let due: Vec<NodeId> = self.order.iter().copied().filter(|&id| self.is_due(id)).collect();
        for id in due {
            self.fire(id)?;
        }
        Ok(())
    }

    /// Runs the simulation until `horizon`.
    pub fn simulate(&mut self, horizon: f64) -> Result<(), Error> {
        while self.step(horizon)? {}
        log_info!(
            self,
            "finished: {} events, {} processed, {} lost",
            self.metrics.num_events,
            self.metrics.num_processed,
            self.metrics.num_lost
        );
        Ok(())
    }

    /// Runs the simulation until `horizon`, passing snapshots to `reporter`.
    ///
    /// Step snapshots are built only for steps which fired at least one node.
    /// The final snapshot includes evaluation results.
    pub fn simulate_with<R: Reporter>(&mut self, horizon: f64, reporter: &mut R) -> Result<(), Error> {
        while self.step(horizon)? {
            if !self.updated_nodes.is_empty() {
                reporter.on_step(&self.snapshot());
            }
        }
        reporter.on_finish(&self.final_snapshot());
        Ok(())
    }

    /// Rewinds the model to time 0: clears all nodes, statistics and retained items and re-seeds the generator.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.current_time = 0.;
        self.metrics.reset();
        self.rng = SimRng::seed_from_u64(self.seed);
        self.processed.clear();
        self.lost.clear();
        self.updated_nodes.clear();
        for &id in &self.order {
            self.network.node_mut(id).reset(&mut self.rng)?;
        }
        Ok(())
    }

    /// Discards statistics collected so far (e.g. during warm-up) while keeping the current state.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
        self.processed.clear();
        self.lost.clear();
        for &id in &self.order {
            self.network.node_mut(id).reset_metrics();
        }
    }

    /// Computes all registered evaluations.
    pub fn evaluation_reports(&self) -> Vec<EvaluationReport> {
        self.evaluations
            .iter()
            .map(|evaluation| evaluation.evaluate(self))
            .collect()
    }

    /// Returns a snapshot of the current state without evaluation results.
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            name: self.name.clone(),
            time: self.current_time,
            nodes: self.nodes().map(|node| node.snapshot()).collect(),
            updated_nodes: self
                .updated_nodes
                .iter()
                .map(|&id| self.network.node_ref(id).name().to_owned())
                .collect(),
            model_metrics: self.metrics.snapshot(),
            node_metrics: self.nodes().map(|node| node.metrics_snapshot()).collect(),
            evaluations: Vec::new(),
        }
    }

    /// Returns a snapshot of the current state with evaluation results.
    pub fn final_snapshot(&self) -> ModelSnapshot {
        let mut snapshot = self.snapshot();
        snapshot.evaluations = self.evaluation_reports();
        snapshot
    }

    fn check_schedule(&self) -> Result<(), RuntimeInvariantError> {
        match self
            .nodes()
            .find(|node| node.next_time() < self.current_time - TIME_EPSILON)
        {
            Some(node) => Err(RuntimeInvariantError::MissedAction {
                node: node.name().to_owned(),
                next_time: node.next_time(),
                time: self.current_time,
            }),
            None => Ok(()),
        }
    }

    fn is_due(&self, id: NodeId) -> bool {
        (self.network.node_ref(id).next_time() - self.current_time).abs() <= TIME_EPSILON
    }

    /// Fires the node and, depth-first, every node which becomes due at the current time
    /// because of the released item.
    fn fire(&mut self, id: NodeId) -> Result<(), Error> {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            if !self.is_due(id) {
                continue;
            }
            let node = self.network.node_ref(id);
            let route = node.choose_route(&self.network, &mut self.rng)?;
            let node = self.network.node_mut(id);
            let counts_as_event = node.counts_as_event();
            let Departure { mut item, target } = node.end_action(route, &mut self.rng)?;
            if counts_as_event {
                self.metrics.num_events += 1;
            }
            self.updated_nodes.push(id);
            log_trace!(self, "`{}` released item {}", self.network.node_ref(id).name(), item.id());

            match target {
                Target::Exit => {
                    item.mark_processed();
                    self.metrics.num_processed += 1;
                    self.metrics.total_time_in_system += item.time_in_system();
                    self.processed.push(item);
                }
                Target::Node(next) => match self.network.node_mut(next).start_action(item, &mut self.rng)? {
                    Arrival::Accepted => {
                        if self.is_due(next) {
                            pending.push(next);
                        }
                    }
                    Arrival::Rejected(item) => {
                        self.metrics.num_lost += 1;
                        self.lost.push(item);
                    }
                },
            }
        }
        Ok(())
    }
}

/// Collects nodes reachable from `root` in depth-first order, rejecting duplicate names.
fn discover<P: 'static>(network: &Network<P>, root: NodeId) -> Result<Vec<NodeId>, ConfigurationError> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut names = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        network.check(id)?;
        let node = network.node_ref(id);
        if !names.insert(node.name()) {
            let err = ConfigurationError::DuplicateNodeName(node.name().to_owned());
            log_config_error(&err);
            return Err(err);
        }
        order.push(id);
        for next in node.connected_nodes().into_iter().rev() {
            if !visited.contains(&next) {
                stack.push(next);
            }
        }
    }
    Ok(order)
}
