//! Error types.

use thiserror::Error;

/// Fatal problems detected while building a network or a model.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// Two reachable nodes share the same name.
    #[error("node name `{0}` is used by more than one node")]
    DuplicateNodeName(String),
    /// Node handle does not belong to the network.
    #[error("unknown node handle {0}")]
    UnknownNode(usize),
    /// Node name referenced from a config does not exist.
    #[error("unknown node name `{0}`")]
    UnknownNodeName(String),
    /// Registering a route would push the total routing weight above 1.
    #[error("total routing weight of `{node}` must be <= 1, got {total}")]
    WeightsExceeded {
        /// Name of the transition node.
        node: String,
        /// Total weight after the rejected registration.
        total: f64,
    },
    /// Routing weight is negative or not a number.
    #[error("invalid routing weight {weight} for `{node}`")]
    InvalidWeight {
        /// Name of the transition node.
        node: String,
        /// Rejected weight.
        weight: f64,
    },
    /// Routes can not be added once the router was sealed by the model.
    #[error("routes of `{0}` are sealed, the model is already built")]
    RoutesSealed(String),
    /// Operation expects a node of another kind.
    #[error("node `{node}` is not a {expected} node")]
    WrongNodeKind {
        /// Name of the node.
        node: String,
        /// Expected kind.
        expected: &'static str,
    },
    /// Queue or channel capacity makes no sense.
    #[error("invalid capacity: {0}")]
    InvalidCapacity(String),
    /// Factories have no item to pass into an item-parameterized delay.
    #[error("factory delay can not depend on an item")]
    ItemDelayOnFactory,
    /// Other invalid config value.
    #[error("invalid config: {0}")]
    InvalidValue(String),
}

/// Fatal problems indicating incorrect usage of the engine at run time.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeInvariantError {
    /// Factories only emit items.
    #[error("factory `{0}` can not receive items")]
    StartOnFactory(String),
    /// `end_action` was invoked while the node has nothing to complete.
    #[error("node `{0}` has no registered task to complete")]
    NoPendingTask(String),
    /// Transition already holds an item.
    #[error("transition `{0}` already holds an item")]
    TransitionBusy(String),
    /// Delay function produced a negative value.
    #[error("node `{node}` produced negative delay {delay}")]
    NegativeDelay {
        /// Name of the node.
        node: String,
        /// Produced delay.
        delay: f64,
    },
    /// Custom router chose a node which is not among its declared targets.
    #[error("transition `{node}` routed to undeclared node {target}")]
    UndeclaredTarget {
        /// Name of the transition node.
        node: String,
        /// Index of the chosen node.
        target: usize,
    },
    /// Node has an action scheduled before the model clock.
    #[error("node `{node}` has an action at {next_time} before the model time {time}")]
    MissedAction {
        /// Name of the node.
        node: String,
        /// Scheduled action time.
        next_time: f64,
        /// Model time.
        time: f64,
    },
    /// Item-parameterized delay was sampled without an item.
    #[error("node `{0}` has an item-parameterized delay but no item")]
    MissingItem(String),
}

/// Any error produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`ConfigurationError`].
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// See [`RuntimeInvariantError`].
    #[error(transparent)]
    RuntimeInvariant(#[from] RuntimeInvariantError),
    /// Config file can not be parsed.
    #[error("can not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Config file can not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
