//! YAML description of a queueing network.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use rand::distributions::Distribution;
use rand_distr::{Exp, Gamma, Normal, Uniform};
use serde::{Deserialize, Serialize};

use crate::delay::Delay;
use crate::error::{ConfigurationError, Error};
use crate::log::log_config_error;
use crate::model::Model;
use crate::network::Network;
use crate::node::{FactoryNode, NodeId, QueueingNode, Target, TransitionNode};
use crate::pool::ChannelPool;
use crate::queue::{FifoQueue, LifoQueue};

/// Distribution of a delay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayConfig {
    /// Fixed value.
    Constant(f64),
    /// Exponential distribution with the given mean.
    Exponential {
        /// Mean value.
        mean: f64,
    },
    /// Uniform distribution in `[min, max)`.
    Uniform {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Erlang distribution of order `k` with the given mean.
    Erlang {
        /// Mean value.
        mean: f64,
        /// Order.
        k: u32,
    },
    /// Normal distribution, negative samples are replaced with 0.
    Normal {
        /// Mean value.
        mean: f64,
        /// Standard deviation.
        std_dev: f64,
    },
}

fn invalid(msg: String) -> ConfigurationError {
    ConfigurationError::InvalidValue(msg)
}

impl DelayConfig {
    /// Creates the corresponding delay.
    pub fn build<P>(&self) -> Result<Delay<P>, ConfigurationError> {
        let delay = match *self {
            DelayConfig::Constant(value) => {
                if value.is_nan() || value < 0. {
                    return Err(invalid(format!("negative constant delay {}", value)));
                }
                Delay::constant(value)
            }
            DelayConfig::Exponential { mean } => {
                if mean.is_nan() || mean <= 0. {
                    return Err(invalid(format!("exponential delay mean must be positive, got {}", mean)));
                }
                let dist = Exp::new(1. / mean).map_err(|e| invalid(format!("exponential delay: {}", e)))?;
                Delay::from_distribution(dist)
            }
            DelayConfig::Uniform { min, max } => {
                if min.is_nan() || max.is_nan() || min < 0. || min >= max {
                    return Err(invalid(format!("uniform delay needs 0 <= min < max, got [{}, {})", min, max)));
                }
                Delay::from_distribution(Uniform::new(min, max))
            }
            DelayConfig::Erlang { mean, k } => {
                if k == 0 || mean.is_nan() || mean <= 0. {
                    return Err(invalid(format!("erlang delay needs k > 0 and mean > 0, got k={} mean={}", k, mean)));
                }
                let dist = Gamma::new(k as f64, mean / k as f64).map_err(|e| invalid(format!("erlang delay: {}", e)))?;
                Delay::from_distribution(dist)
            }
            DelayConfig::Normal { mean, std_dev } => {
                let dist = Normal::new(mean, std_dev).map_err(|e| invalid(format!("normal delay: {}", e)))?;
                Delay::from_fn(move |rng| dist.sample(rng).max(0.))
            }
        };
        Ok(delay)
    }
}

/// Order in which waiting items are served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// First in, first out.
    #[default]
    Fifo,
    /// Last in, first out.
    Lifo,
}

/// Waiting line of a queueing node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Service order.
    #[serde(default)]
    pub discipline: Discipline,
    /// Maximum number of waiting items, unbounded if absent.
    #[serde(default)]
    pub max_len: Option<usize>,
}

/// Weighted route of a transition node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Target node name or `exit`.
    pub to: String,
    /// Routing probability.
    pub weight: f64,
}

/// Description of a single node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeConfig {
    /// Source of items.
    Factory {
        /// Unique node name.
        name: String,
        /// Inter-arrival time.
        delay: DelayConfig,
        /// Time of the first arrival, sampled from `delay` if absent.
        #[serde(default)]
        first_arrival: Option<f64>,
        /// Receiving node, items leave the network if absent.
        #[serde(default)]
        next: Option<String>,
    },
    /// Service stage.
    Queueing {
        /// Unique node name.
        name: String,
        /// Service time.
        delay: DelayConfig,
        /// Number of channels, unbounded if absent.
        #[serde(default)]
        channels: Option<usize>,
        /// Waiting line.
        #[serde(default)]
        queue: QueueConfig,
        /// Receiving node, items leave the network if absent.
        #[serde(default)]
        next: Option<String>,
    },
    /// Probabilistic routing stage.
    Transition {
        /// Unique node name.
        name: String,
        /// Time spent in the node, zero if absent.
        #[serde(default)]
        delay: Option<DelayConfig>,
        /// Weighted routes, the remaining probability leads out of the network.
        #[serde(default)]
        routes: Vec<RouteConfig>,
    },
}

impl NodeConfig {
    /// Returns the node name.
    pub fn name(&self) -> &str {
        match self {
            NodeConfig::Factory { name, .. } => name,
            NodeConfig::Queueing { name, .. } => name,
            NodeConfig::Transition { name, .. } => name,
        }
    }
}

/// YAML-serializable model description.
///
/// # Examples
///
/// ```rust
/// use dslab_qnet::ModelConfig;
///
/// let config: ModelConfig = r#"
/// seed: 42
/// root: source
/// nodes:
///   - kind: factory
///     name: source
///     delay: { exponential: { mean: 2.0 } }
///     next: server
///   - kind: queueing
///     name: server
///     delay: { constant: 1.5 }
///     channels: 2
///     queue: { max_len: 5 }
/// "#
/// .parse()
/// .unwrap();
/// let mut model = config.build::<()>().unwrap();
/// model.simulate(100.).unwrap();
/// assert_eq!(model.nodes().count(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Seed of the random number generator.
    #[serde(default)]
    pub seed: u64,
    /// Name of the node the graph discovery starts from.
    pub root: String,
    /// Nodes of the network.
    pub nodes: Vec<NodeConfig>,
}

fn default_name() -> String {
    "model".to_string()
}

impl ModelConfig {
    /// Reads the config from a YAML file.
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// Builds the network and the model.
    pub fn build<P: Default + 'static>(&self) -> Result<Model<P>, Error> {
        let mut network = Network::new();
        let mut ids = HashMap::new();
        for node in &self.nodes {
            let id = match node {
                NodeConfig::Factory {
                    name,
                    delay,
                    first_arrival,
                    ..
                } => {
                    let mut factory = FactoryNode::new(delay.build()?)?;
                    if let Some(time) = first_arrival {
                        factory = factory.with_first_arrival(*time)?;
                    }
                    network.add(name.clone(), factory)
                }
                NodeConfig::Queueing {
                    name,
                    delay,
                    channels,
                    queue,
                    ..
                } => {
                    let pool = ChannelPool::new(*channels)?;
                    let node = match (queue.discipline, queue.max_len) {
                        (Discipline::Fifo, None) => QueueingNode::new(FifoQueue::new(), pool, delay.build()?),
                        (Discipline::Fifo, Some(len)) => QueueingNode::new(FifoQueue::bounded(len), pool, delay.build()?),
                        (Discipline::Lifo, None) => QueueingNode::new(LifoQueue::new(), pool, delay.build()?),
                        (Discipline::Lifo, Some(len)) => QueueingNode::new(LifoQueue::bounded(len), pool, delay.build()?),
                    };
                    network.add(name.clone(), node)
                }
                NodeConfig::Transition { name, delay, .. } => {
                    let mut node = TransitionNode::probabilistic();
                    if let Some(delay) = delay {
                        node = node.with_delay(delay.build()?);
                    }
                    network.add(name.clone(), node)
                }
            };
            if ids.insert(node.name().to_owned(), id).is_some() {
                let err = ConfigurationError::DuplicateNodeName(node.name().to_owned());
                log_config_error(&err);
                return Err(err.into());
            }
        }

        let lookup = |name: &str| -> Result<NodeId, ConfigurationError> {
            ids.get(name)
                .copied()
                .ok_or_else(|| ConfigurationError::UnknownNodeName(name.to_owned()))
        };
        for node in &self.nodes {
            let id = lookup(node.name())?;
            match node {
                NodeConfig::Factory { next: Some(next), .. } | NodeConfig::Queueing { next: Some(next), .. } => {
                    network.connect(id, lookup(next)?)?;
                }
                NodeConfig::Transition { routes, .. } => {
                    for route in routes {
                        let target = match route.to.as_str() {
                            "exit" => Target::Exit,
                            name => Target::Node(lookup(name)?),
                        };
                        network.add_route(id, target, route.weight)?;
                    }
                }
                _ => {}
            }
        }

        let root = lookup(&self.root)?;
        Ok(Model::new(network, root, self.seed)?.with_name(self.name.clone()))
    }
}

impl FromStr for ModelConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_yaml::from_str(s)?)
    }
}
