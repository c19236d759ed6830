use crate::delay::Delay;
use crate::error::{Error, RuntimeInvariantError};
use crate::model::Model;
use crate::network::Network;
use crate::node::FactoryNode;

#[test]
fn action_before_clock_is_an_error() {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
    let mut model = Model::new(network, source, 1).unwrap();
    model.simulate(2.5).unwrap();
    assert_eq!(model.next_time(), 3.);

    model.network_mut().node_mut(source).core_mut().set_next_time(1.);
    let err = model.step(5.).unwrap_err();
    assert!(matches!(
        err,
        Error::RuntimeInvariant(RuntimeInvariantError::MissedAction { ref node, next_time, time })
            if node == "source" && next_time == 1. && time == 2.5
    ));
    assert_eq!(model.time(), 2.5);
}

#[test]
fn action_within_epsilon_is_still_due() {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
    let mut model = Model::new(network, source, 1).unwrap();
    model.simulate(2.).unwrap();

    model.network_mut().node_mut(source).core_mut().set_next_time(2. - 1e-9);
    assert!(model.step(5.).unwrap());
    assert_eq!(model.updated_nodes(), &[source]);
}
