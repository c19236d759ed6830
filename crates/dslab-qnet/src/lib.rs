#![warn(missing_docs)]
#![doc = include_str!("../readme.md")]

pub mod config;
pub mod delay;
pub mod error;
pub mod item;
pub mod log;
pub mod metrics;
pub mod model;
pub mod network;
pub mod node;
pub mod pool;
pub mod queue;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use colored;
pub use config::{DelayConfig, Discipline, ModelConfig, NodeConfig, QueueConfig, RouteConfig};
pub use delay::{Delay, SimRng};
pub use error::{ConfigurationError, Error, RuntimeInvariantError};
pub use item::{ActionRecord, ActionType, Item, ItemId};
pub use metrics::{ModelMetrics, NodeMetrics, QueueingMetrics, TIME_EPSILON};
pub use model::{Evaluation, Model};
pub use network::Network;
pub use node::{
    CustomRouter, FactoryNode, NoHooks, Node, NodeCore, NodeId, NodeKind, ProbabilisticRouter, QueueingHooks,
    QueueingNode, Router, Target, TransitionNode, INF_TIME,
};
pub use pool::{ChannelPool, Task};
pub use queue::{FifoQueue, LifoQueue, PriorityQueue, TieBreak, WaitingLine};
pub use snapshot::{EvaluationReport, LogReporter, ModelSnapshot, NoReporter, Reporter, Snapshot};
