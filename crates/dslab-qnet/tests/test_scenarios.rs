mod common;
use common::{assert_float_eq, fifo_node, init_logger};

use dslab_qnet::{ActionType, Delay, FactoryNode, Model, Network, NodeId, QueueingNode};

fn single_server(arrival: f64, service: f64, max_len: Option<usize>) -> (Network<()>, NodeId, NodeId) {
    let mut network = Network::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(arrival)).unwrap());
    let server = network.add("server", fifo_node(1, max_len, Delay::constant(service)));
    network.connect(source, server).unwrap();
    (network, source, server)
}

fn queueing(model: &Model<()>, id: NodeId) -> &QueueingNode<()> {
    model.node(id).unwrap().as_queueing().unwrap()
}

#[test]
fn saturated_single_server() {
    init_logger();
    let (network, source, server) = single_server(1., 1., None);
    let mut model = Model::new(network, source, 123).unwrap();
    model.simulate(5.).unwrap();

    assert_eq!(model.time(), 5.);
    let node = model.node(server).unwrap();
    let stats = queueing(&model, server).metrics();
    assert_eq!(node.metrics().num_in, 5);
    assert_eq!(node.metrics().num_out, 4);
    assert_eq!(queueing(&model, server).num_busy(), 1);
    assert_eq!(stats.num_failures, 0);
    assert_float_eq(stats.mean_queue_len(node.metrics()), 0., 1e-12);
    // busy for the whole interval after the first arrival
    assert_float_eq(stats.busy_time, 4., 1e-9);
    assert_float_eq(stats.mean_busy_channels(node.metrics()), 0.8, 1e-9);
    let first_arrival = model.processed_items()[0].created_time();
    assert_eq!(first_arrival, 1.);
    assert_float_eq(stats.busy_time / (model.time() - first_arrival), 1., 1e-9);
    assert_float_eq(stats.mean_in_interval(node.metrics()), 1., 1e-9);
    assert_float_eq(stats.mean_service_time(node.metrics()), 1., 1e-9);

    assert_eq!(model.processed_items().len(), 4);
    assert_eq!(model.metrics().num_events, 5 + 4);
    assert_float_eq(model.mean_time_in_system(), 1., 1e-9);
}

#[test]
fn loss_system_with_factory_first() {
    init_logger();
    let (network, source, server) = single_server(0.5, 1., Some(0));
    let mut model = Model::new(network, source, 123).unwrap();
    model.simulate(10.).unwrap();

    let node = model.node(server).unwrap();
    let stats = queueing(&model, server).metrics();
    // the arrival tied with a completion comes first and is lost
    assert_eq!(node.metrics().num_in, 20);
    assert_eq!(node.metrics().num_out, 6);
    assert_eq!(stats.num_failures, 13);
    assert_eq!(queueing(&model, server).num_busy(), 1);
    assert_eq!(model.lost_items().len(), 13);
    assert_float_eq(stats.failure_probability(node.metrics()), 13. / 20., 1e-12);
}

#[test]
fn loss_system_with_server_first() {
    init_logger();
    let (network, _, server) = single_server(0.5, 1., Some(0));
    let mut model = Model::new(network, server, 123).unwrap();
    assert_eq!(model.nodes().next().unwrap().name(), "server");
    model.simulate(10.).unwrap();

    let node = model.node(server).unwrap();
    let stats = queueing(&model, server).metrics();
    // the completion tied with an arrival frees the channel first
    assert_eq!(node.metrics().num_in, 20);
    assert_eq!(node.metrics().num_out, 9);
    assert_eq!(stats.num_failures, 10);
    assert_eq!(queueing(&model, server).num_busy(), 1);
}

#[test]
fn lost_items_keep_only_arrival() {
    let (network, source, server) = single_server(0.5, 1., Some(0));
    let mut model = Model::new(network, source, 123).unwrap();
    model.simulate(3.).unwrap();

    assert!(!model.lost_items().is_empty());
    for item in model.lost_items() {
        assert!(!item.is_processed());
        let last = item.history().last().unwrap();
        assert_eq!(last.node, server);
        assert_eq!(last.action, ActionType::In);
    }
}

#[test]
fn processed_items_history_alternates() {
    let (network, source, server) = single_server(1., 0.5, None);
    let mut model = Model::new(network, source, 123).unwrap();
    model.simulate(10.).unwrap();

    for item in model.processed_items() {
        assert!(item.is_processed());
        let nodes: Vec<_> = item.history().iter().map(|r| (r.node, r.action)).collect();
        assert_eq!(
            nodes,
            vec![
                (source, ActionType::In),
                (source, ActionType::Out),
                (server, ActionType::In),
                (server, ActionType::Out),
            ]
        );
        assert_float_eq(item.time_in_system(), 0.5, 1e-9);
        assert_eq!(item.released_time(), Some(item.history()[3].time));
    }
}

#[test]
fn conservation_holds_at_every_step() {
    let mut network = Network::<()>::new();
    let source = network.add(
        "source",
        FactoryNode::new(Delay::from_fn(|rng| {
            use rand::Rng;
            rng.gen_range(0.1..1.)
        }))
        .unwrap(),
    );
    let server = network.add("server", fifo_node(2, Some(3), Delay::constant(1.3)));
    network.connect(source, server).unwrap();
    let mut model = Model::new(network, source, 42).unwrap();

    while model.step(200.).unwrap() {
        assert!(model.time() <= 200.);
        let node = model.node(server).unwrap();
        let queueing = node.as_queueing().unwrap();
        assert!(queueing.num_busy() <= 2);
        assert!(queueing.queue_len() <= 3);
        assert_eq!(
            node.metrics().num_in,
            node.metrics().num_out + queueing.metrics().num_failures + queueing.num_items() as u64
        );
    }
    assert_eq!(model.time(), 200.);
}

#[test]
fn clock_stops_at_horizon_without_events() {
    let mut network = Network::<()>::new();
    let source = network.add("source", FactoryNode::new(Delay::constant(10.)).unwrap());
    let mut model = Model::new(network, source, 1).unwrap();
    model.simulate(3.5).unwrap();
    assert_eq!(model.time(), 3.5);
    assert_eq!(model.metrics().num_events, 0);
    assert_float_eq(model.metrics().passed_time, 3.5, 1e-12);
}

#[test]
fn goto_stops_at_next_action() {
    let (network, source, server) = single_server(1., 1., None);
    let mut model = Model::new(network, source, 123).unwrap();
    model.goto(10., 10.).unwrap();
    assert_eq!(model.time(), 1.);
    assert_eq!(model.updated_nodes(), &[source]);
    assert_eq!(model.node(server).unwrap().metrics().num_in, 1);

    model.simulate(5.).unwrap();
    let node = model.node(server).unwrap();
    assert_eq!(node.metrics().num_in, 5);
    assert_eq!(node.metrics().num_out, 4);
    assert_eq!(model.metrics().num_events, 9);
}

#[test]
fn reset_reproduces_run() {
    let build = || {
        let mut network = Network::<()>::new();
        let source = network.add(
            "source",
            FactoryNode::new(Delay::from_distribution(rand_distr::Exp::new(1.).unwrap())).unwrap(),
        );
        let service = Delay::from_distribution(rand_distr::Exp::new(1.2).unwrap());
        let server = network.add("server", fifo_node(1, Some(5), service));
        network.connect(source, server).unwrap();
        (Model::new(network, source, 2024).unwrap(), server)
    };
    let summary = |model: &Model<()>, server: NodeId| {
        let node = model.node(server).unwrap();
        let stats = node.as_queueing().unwrap().metrics();
        (
            model.metrics().num_events,
            node.metrics().num_in,
            node.metrics().num_out,
            stats.num_failures,
            stats.wait_time,
            stats.busy_time,
        )
    };

    let (mut model, server) = build();
    model.simulate(500.).unwrap();
    let first = summary(&model, server);

    model.reset().unwrap();
    assert_eq!(model.time(), 0.);
    assert!(model.processed_items().is_empty());
    model.simulate(500.).unwrap();
    assert_eq!(summary(&model, server), first);

    let (mut other, server) = build();
    other.simulate(500.).unwrap();
    assert_eq!(summary(&other, server), first);
}

#[test]
fn reset_metrics_discards_warm_up() {
    let (network, source, server) = single_server(1., 1., None);
    let mut model = Model::new(network, source, 123).unwrap();
    model.simulate(3.).unwrap();
    model.reset_metrics();
    assert_eq!(model.metrics().num_events, 0);
    assert_eq!(model.node(server).unwrap().metrics().num_in, 0);
    // the item in service is kept
    assert_eq!(queueing(&model, server).num_busy(), 1);

    model.simulate(6.).unwrap();
    let node = model.node(server).unwrap();
    assert_eq!(node.metrics().num_in, 3);
    assert_eq!(node.metrics().num_out, 3);
    assert_float_eq(node.metrics().passed_time, 3., 1e-9);
    assert_float_eq(queueing(&model, server).metrics().busy_time, 3., 1e-9);
}
