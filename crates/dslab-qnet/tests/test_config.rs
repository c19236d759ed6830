mod common;
use common::assert_float_eq;

use dslab_qnet::{ConfigurationError, DelayConfig, Error, ModelConfig, NodeConfig, Target};

const CLINIC: &str = r#"
name: clinic
seed: 7
root: arrivals
nodes:
  - kind: factory
    name: arrivals
    delay: { exponential: { mean: 1.0 } }
    first_arrival: 0.0
    next: reception
  - kind: queueing
    name: reception
    delay: { uniform: { min: 0.5, max: 1.5 } }
    channels: 2
    queue: { discipline: fifo, max_len: 10 }
    next: triage
  - kind: transition
    name: triage
    routes:
      - { to: doctor, weight: 0.6 }
      - { to: lab, weight: 0.3 }
  - kind: queueing
    name: doctor
    delay: { erlang: { mean: 2.0, k: 3 } }
    channels: 3
    queue: { discipline: lifo }
  - kind: queueing
    name: lab
    delay: { normal: { mean: 1.0, std_dev: 0.5 } }
    next: reception
"#;

#[test]
fn parse_and_build() {
    let config: ModelConfig = CLINIC.parse().unwrap();
    assert_eq!(config.seed, 7);
    assert_eq!(config.nodes.len(), 5);
    assert!(matches!(
        &config.nodes[3],
        NodeConfig::Queueing { delay: DelayConfig::Erlang { k: 3, .. }, channels: Some(3), .. }
    ));

    let mut model = config.build::<()>().unwrap();
    assert_eq!(model.name(), "clinic");
    assert_eq!(model.nodes().count(), 5);

    let triage = model.find("triage").unwrap().as_transition().unwrap();
    let targets = triage.router().targets();
    assert_eq!(targets.len(), 2);
    match triage.router() {
        dslab_qnet::Router::Probabilistic(router) => {
            assert_float_eq(router.exit_weight(), 0.1, 1e-9);
            assert!(router.is_sealed());
            assert!(router.routes().iter().all(|(target, _)| *target != Target::Exit));
        }
        dslab_qnet::Router::Custom(_) => panic!("expected probabilistic router"),
    }

    model.simulate(200.).unwrap();
    assert_eq!(model.time(), 200.);
    let reception = model.find("reception").unwrap();
    assert!(reception.metrics().num_in > 0);
    assert!(model.metrics().num_processed > 0);

    let second: ModelConfig = CLINIC.parse().unwrap();
    let mut other = second.build::<()>().unwrap();
    other.simulate(200.).unwrap();
    assert_eq!(other.metrics().num_events, model.metrics().num_events);
}

#[test]
fn unknown_names_are_reported() {
    let config: ModelConfig = r#"
root: source
nodes:
  - kind: factory
    name: source
    delay: { constant: 1.0 }
    next: nowhere
"#
    .parse()
    .unwrap();
    let err = config.build::<()>().err().unwrap();
    assert!(matches!(
        err,
        Error::Configuration(ConfigurationError::UnknownNodeName(ref name)) if name == "nowhere"
    ));
}

#[test]
fn invalid_values_are_reported() {
    let config: ModelConfig = r#"
root: source
nodes:
  - kind: factory
    name: source
    delay: { uniform: { min: 2.0, max: 1.0 } }
"#
    .parse()
    .unwrap();
    assert!(matches!(
        config.build::<()>(),
        Err(Error::Configuration(ConfigurationError::InvalidValue(_)))
    ));

    let config: ModelConfig = r#"
root: server
nodes:
  - kind: queueing
    name: server
    delay: { constant: 1.0 }
    channels: 0
"#
    .parse()
    .unwrap();
    assert!(matches!(
        config.build::<()>(),
        Err(Error::Configuration(ConfigurationError::InvalidCapacity(_)))
    ));

    let config: ModelConfig = r#"
root: router
nodes:
  - kind: transition
    name: router
    routes:
      - { to: exit, weight: 0.7 }
      - { to: exit, weight: 0.7 }
"#
    .parse()
    .unwrap();
    assert!(matches!(
        config.build::<()>(),
        Err(Error::Configuration(ConfigurationError::WeightsExceeded { .. }))
    ));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let result: Result<ModelConfig, _> = "root: [".parse();
    assert!(matches!(result, Err(Error::Parse(_))));
    let result: Result<ModelConfig, _> = "root: x\nnodes:\n  - kind: sink\n    name: x\n".parse();
    assert!(matches!(result, Err(Error::Parse(_))));
}

#[test]
fn read_from_file() {
    let path = std::env::temp_dir().join(format!("dslab-qnet-clinic-{}.yaml", std::process::id()));
    std::fs::write(&path, CLINIC).unwrap();
    let config = ModelConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config, CLINIC.parse::<ModelConfig>().unwrap());

    assert!(matches!(
        ModelConfig::from_file(std::env::temp_dir().join("dslab-qnet-missing.yaml")),
        Err(Error::Io(_))
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    let config: ModelConfig = r#"
root: source
nodes:
  - kind: factory
    name: source
    delay: { constant: 1.0 }
    next: server
  - kind: queueing
    name: server
    delay: { constant: 1.0 }
  - kind: queueing
    name: server
    delay: { constant: 2.0 }
"#
    .parse()
    .unwrap();
    assert!(matches!(
        config.build::<()>(),
        Err(Error::Configuration(ConfigurationError::DuplicateNodeName(ref name))) if name == "server"
    ));
}

#[test]
fn negative_first_arrival_is_rejected() {
    let config: ModelConfig = r#"
root: source
nodes:
  - kind: factory
    name: source
    delay: { constant: 1.0 }
    first_arrival: -1.0
"#
    .parse()
    .unwrap();
    assert!(matches!(
        config.build::<()>(),
        Err(Error::Configuration(ConfigurationError::InvalidValue(_)))
    ));
}
