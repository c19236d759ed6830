mod common;
use common::{assert_float_eq, fifo_node, init_logger};

use dslab_qnet::{
    ChannelPool, ConfigurationError, Delay, FactoryNode, FifoQueue, Model, Network, NodeId, QueueingNode, Target,
    TransitionNode,
};

fn instant_sink<P: 'static>() -> QueueingNode<P> {
    QueueingNode::new(FifoQueue::new(), ChannelPool::unbounded(), Delay::zero())
}

fn route_counts(seed: u64) -> (u64, u64, u64) {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
    let router = network.add("router", TransitionNode::probabilistic());
    let a = network.add("a", instant_sink());
    let b = network.add("b", instant_sink());
    network.connect(source, router).unwrap();
    network.add_route(router, a, 0.3).unwrap();
    network.add_route(router, b, 0.5).unwrap();

    let mut model = Model::new(network, source, seed).unwrap();
    model.simulate(100000.).unwrap();
    let num_a = model.node(a).unwrap().metrics().num_in;
    let num_b = model.node(b).unwrap().metrics().num_in;
    assert_eq!(model.metrics().num_processed, 100000);
    (num_a, num_b, 100000 - num_a - num_b)
}

#[test]
fn probabilistic_routing_is_reproducible() {
    init_logger();
    let counts = route_counts(123);
    assert_eq!(route_counts(123), counts);

    let (a, b, exit) = counts;
    assert_float_eq(a as f64 / 100000., 0.3, 0.01);
    assert_float_eq(b as f64 / 100000., 0.5, 0.01);
    assert_float_eq(exit as f64 / 100000., 0.2, 0.01);
}

#[test]
fn different_seeds_give_different_routes() {
    assert_ne!(route_counts(1), route_counts(2));
}

#[test]
fn weights_above_one_fail_eagerly() {
    let mut network = Network::<()>::new();
    let router = network.add("router", TransitionNode::probabilistic());
    let a = network.add("a", instant_sink());
    let b = network.add("b", instant_sink());
    network.add_route(router, a, 0.85).unwrap();
    let err = network.add_route(router, b, 0.2).unwrap_err();
    assert!(matches!(err, ConfigurationError::WeightsExceeded { ref node, .. } if node == "router"));
    let err = network.add_route(router, Target::Exit, 0.2).unwrap_err();
    assert!(matches!(err, ConfigurationError::WeightsExceeded { .. }));
}

#[test]
fn full_weights_leave_no_exit() {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
    let router = network.add("router", TransitionNode::probabilistic());
    let a = network.add("a", instant_sink());
    let b = network.add("b", instant_sink());
    network.connect(source, router).unwrap();
    network.add_route(router, a, 0.6).unwrap();
    network.add_route(router, b, 0.4).unwrap();

    let mut model = Model::new(network, source, 5).unwrap();
    model.simulate(1000.).unwrap();
    let num_a = model.node(a).unwrap().metrics().num_in;
    let num_b = model.node(b).unwrap().metrics().num_in;
    assert_eq!(num_a + num_b, 1000);
    for item in model.processed_items() {
        assert_eq!(item.history().len(), 6);
    }
}

#[test]
fn custom_router_balances_queues() {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
    let left = network.add("left", fifo_node(1, None, Delay::constant(3.)));
    let right = network.add("right", fifo_node(1, None, Delay::constant(3.)));
    let router = network.add(
        "router",
        TransitionNode::custom(vec![left, right], move |_, network| {
            let len = |id: NodeId| network.node(id).unwrap().as_queueing().unwrap().num_items();
            if len(left) <= len(right) {
                Target::Node(left)
            } else {
                Target::Node(right)
            }
        }),
    );
    network.connect(source, router).unwrap();

    let mut model = Model::new(network, source, 1).unwrap();
    let names: Vec<_> = model.nodes().map(|node| node.name().to_owned()).collect();
    assert_eq!(names, vec!["source", "router", "left", "right"]);
    model.simulate(100.).unwrap();

    let num_left = model.node(left).unwrap().metrics().num_in;
    let num_right = model.node(right).unwrap().metrics().num_in;
    assert_eq!(num_left + num_right, 100);
    assert!(num_left.abs_diff(num_right) <= 2);
}

#[test]
fn zero_delay_chain_resolves_in_one_instant() {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(2.)).unwrap());
    let t1 = network.add_auto(TransitionNode::probabilistic());
    let t2 = network.add_auto(TransitionNode::probabilistic());
    let t3 = network.add_auto(TransitionNode::probabilistic());
    let server = network.add("server", fifo_node(1, None, Delay::constant(1.)));
    network.connect(source, t1).unwrap();
    network.add_route(t1, t2, 1.).unwrap();
    network.add_route(t2, t3, 1.).unwrap();
    network.add_route(t3, server, 1.).unwrap();

    let mut model = Model::new(network, source, 1).unwrap();
    assert!(model.step(10.).unwrap());
    assert_eq!(model.time(), 2.);
    assert_eq!(model.updated_nodes(), &[source, t1, t2, t3]);
    let server_node = model.node(server).unwrap();
    assert_eq!(server_node.metrics().num_in, 1);
    assert_eq!(server_node.next_time(), 3.);
    // transitions are not counted as events
    assert_eq!(model.metrics().num_events, 1);

    model.simulate(10.).unwrap();
    assert_eq!(model.node(t3).unwrap().name(), "Transition3");
    for item in model.processed_items() {
        assert_eq!(item.history().len(), 10);
        assert_float_eq(item.time_in_system(), 1., 1e-12);
    }
}

#[derive(Clone, Debug, Default)]
struct Patient {
    returning: bool,
    visits: u32,
}

#[test]
fn post_process_marks_returning_items() {
    let mut network = Network::<Patient>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(1.)).unwrap());
    let server = network.add("server", instant_sink());
    let router = network.add(
        "router",
        TransitionNode::probabilistic().with_post_process(move |item: &mut dslab_qnet::Item<Patient>, target| {
            item.payload.visits += 1;
            if target == Target::Node(server) {
                item.payload.returning = true;
            }
        }),
    );
    network.connect(source, server).unwrap();
    network.connect(server, router).unwrap();
    network.add_route(router, server, 0.4).unwrap();

    let mut model = Model::new(network, source, 77).unwrap();
    model.simulate(500.).unwrap();

    let mut returned = 0;
    for item in model.processed_items() {
        let server_visits = item.history().iter().filter(|r| r.node == server).count() / 2;
        assert_eq!(item.payload.visits as usize, server_visits);
        assert_eq!(item.payload.returning, server_visits > 1);
        if item.payload.returning {
            returned += 1;
        }
    }
    assert!(returned > 0);
}
