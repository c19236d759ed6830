//! Routing stage.

use rand::distributions::{Distribution, WeightedIndex};
use serde_json::json;
use sugars::boxed;

use crate::delay::{Delay, SimRng};
use crate::error::{ConfigurationError, Error, RuntimeInvariantError};
use crate::item::Item;
use crate::log_trace;
use crate::network::Network;
use crate::node::{NodeCore, NodeId, Target, INF_TIME};

/// Tolerance used when comparing the total routing weight with 1.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Weighted random choice among targets.
///
/// If the registered weights sum to less than 1, the remainder becomes an implicit exit route.
/// The remainder is resolved once when the model is built, after that the routes are sealed.
pub struct ProbabilisticRouter {
    routes: Vec<(Target, f64)>,
    total: f64,
    sampler: Option<(Vec<Target>, WeightedIndex<f64>)>,
}

impl ProbabilisticRouter {
    fn new() -> Self {
        Self {
            routes: Vec::new(),
            total: 0.,
            sampler: None,
        }
    }

    /// Registers a route, failing if the total weight would exceed 1.
    pub(crate) fn add_route(&mut self, node: &str, target: Target, weight: f64) -> Result<(), ConfigurationError> {
        if self.sampler.is_some() {
            return Err(ConfigurationError::RoutesSealed(node.to_owned()));
        }
        if !weight.is_finite() || weight < 0. {
            return Err(ConfigurationError::InvalidWeight {
                node: node.to_owned(),
                weight,
            });
        }
        let total = self.total + weight;
        if total > 1. + WEIGHT_EPSILON {
            return Err(ConfigurationError::WeightsExceeded {
                node: node.to_owned(),
                total,
            });
        }
        self.total = total;
        self.routes.push((target, weight));
        Ok(())
    }

    /// Returns the explicitly registered routes.
    pub fn routes(&self) -> &[(Target, f64)] {
        &self.routes
    }

    /// Returns the sum of registered weights.
    pub fn total_weight(&self) -> f64 {
        self.total
    }

    /// Returns the weight of the implicit exit route, zero if the weights sum to 1.
    pub fn exit_weight(&self) -> f64 {
        let rest = 1. - self.total;
        if rest > WEIGHT_EPSILON {
            rest
        } else {
            0.
        }
    }

    /// Returns `true` once the implicit exit weight was resolved.
    pub fn is_sealed(&self) -> bool {
        self.sampler.is_some()
    }

    pub(crate) fn seal(&mut self, node: &str) -> Result<(), ConfigurationError> {
        if self.sampler.is_some() {
            return Ok(());
        }
        let mut targets: Vec<Target> = self.routes.iter().map(|(target, _)| *target).collect();
        let mut weights: Vec<f64> = self.routes.iter().map(|(_, weight)| *weight).collect();
        let exit_weight = self.exit_weight();
        if exit_weight > 0. {
            targets.push(Target::Exit);
            weights.push(exit_weight);
        }
        let dist = WeightedIndex::new(&weights)
            .map_err(|e| ConfigurationError::InvalidValue(format!("routes of `{}`: {}", node, e)))?;
        self.sampler = Some((targets, dist));
        Ok(())
    }

    pub(crate) fn choose(&self, rng: &mut SimRng) -> Option<Target> {
        self.sampler
            .as_ref()
            .map(|(targets, dist)| targets[dist.sample(rng)])
    }
}

/// Routing decision made by a user function.
pub struct CustomRouter<P> {
    targets: Vec<NodeId>,
    decide: Box<dyn Fn(&Item<P>, &Network<P>) -> Target>,
}

impl<P> CustomRouter<P> {
    /// Returns the nodes the decision function may choose.
    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }
}

/// Routing policy of a transition node.
pub enum Router<P> {
    /// Weighted random choice.
    Probabilistic(ProbabilisticRouter),
    /// Deterministic choice computed from the item and the network state.
    Custom(CustomRouter<P>),
}

impl<P> Router<P> {
    /// Returns all nodes this router can send items to.
    pub fn targets(&self) -> Vec<NodeId> {
        match self {
            Router::Probabilistic(router) => router
                .routes
                .iter()
                .filter_map(|(target, _)| match target {
                    Target::Node(id) => Some(*id),
                    Target::Exit => None,
                })
                .collect(),
            Router::Custom(router) => router.targets.clone(),
        }
    }
}

/// Node holding a single item for its delay (zero by default) and forwarding it along a chosen route.
pub struct TransitionNode<P> {
    delay: Delay<P>,
    item: Option<Item<P>>,
    router: Router<P>,
    post_process: Option<Box<dyn FnMut(&mut Item<P>, Target)>>,
}

impl<P: 'static> TransitionNode<P> {
    fn with_router(router: Router<P>) -> Self {
        Self {
            delay: Delay::zero(),
            item: None,
            router,
            post_process: None,
        }
    }

    /// Creates a node with weighted random routing, routes are added via
    /// [`Network::add_route`](crate::Network::add_route).
    pub fn probabilistic() -> Self {
        Self::with_router(Router::Probabilistic(ProbabilisticRouter::new()))
    }

    /// Creates a node which routes items with `decide`.
    ///
    /// `targets` must list every node `decide` may return, they are used for graph discovery.
    pub fn custom<F>(targets: Vec<NodeId>, decide: F) -> Self
    where
        F: Fn(&Item<P>, &Network<P>) -> Target + 'static,
    {
        Self::with_router(Router::Custom(CustomRouter {
            targets,
            decide: boxed!(decide),
        }))
    }

    /// Sets the time items spend inside the node.
    pub fn with_delay(mut self, delay: Delay<P>) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the hook invoked after the route is chosen and before the item is forwarded.
    pub fn with_post_process<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut Item<P>, Target) + 'static,
    {
        self.post_process = Some(boxed!(f));
        self
    }

    /// Returns the item currently held.
    pub fn item(&self) -> Option<&Item<P>> {
        self.item.as_ref()
    }

    /// Returns the routing policy.
    pub fn router(&self) -> &Router<P> {
        &self.router
    }

    pub(crate) fn router_mut(&mut self) -> &mut Router<P> {
        &mut self.router
    }

    pub(crate) fn start_action(&mut self, core: &mut NodeCore, item: Item<P>, rng: &mut SimRng) -> Result<(), Error> {
        if self.item.is_some() {
            return Err(RuntimeInvariantError::TransitionBusy(core.name().to_owned()).into());
        }
        let next_time = core.predict_time(&mut self.delay, Some(&item), rng)?;
        self.item = Some(item);
        core.set_next_time(next_time);
        Ok(())
    }

    pub(crate) fn choose_route(&self, core: &NodeCore, network: &Network<P>, rng: &mut SimRng) -> Result<Target, Error> {
        let item = self
            .item
            .as_ref()
            .ok_or_else(|| RuntimeInvariantError::NoPendingTask(core.name().to_owned()))?;
        match &self.router {
            Router::Probabilistic(router) => match router.choose(rng) {
                Some(target) => Ok(target),
                // routes are sealed when the model is built
                None => Err(RuntimeInvariantError::NoPendingTask(core.name().to_owned()).into()),
            },
            Router::Custom(router) => {
                let target = (router.decide)(item, network);
                if let Target::Node(id) = target {
                    if !router.targets.contains(&id) {
                        return Err(RuntimeInvariantError::UndeclaredTarget {
                            node: core.name().to_owned(),
                            target: id.index(),
                        }
                        .into());
                    }
                }
                Ok(target)
            }
        }
    }

    pub(crate) fn end_action(&mut self, core: &mut NodeCore, target: Target) -> Result<Item<P>, RuntimeInvariantError> {
        let mut item = self
            .item
            .take()
            .ok_or_else(|| RuntimeInvariantError::NoPendingTask(core.name().to_owned()))?;
        if let Some(post_process) = self.post_process.as_mut() {
            post_process(&mut item, target);
        }
        core.set_next_time(INF_TIME);
        log_trace!(core, "routing item {} to {:?}", item.id(), target);
        Ok(item)
    }

    pub(crate) fn reset(&mut self) {
        self.item = None;
    }

    pub(crate) fn state_snapshot(&self) -> serde_json::Value {
        let routes = match &self.router {
            Router::Probabilistic(router) => json!({
                "routes": router.routes.iter().map(|(target, weight)| json!({
                    "to": target,
                    "weight": weight,
                })).collect::<Vec<_>>(),
                "exit_weight": router.exit_weight(),
            }),
            Router::Custom(router) => json!({"targets": router.targets}),
        };
        json!({
            "item": self.item.as_ref().map(|item| item.id().to_string()),
            "router": routes,
        })
    }
}
