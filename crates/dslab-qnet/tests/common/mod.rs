#![allow(dead_code)]

use dslab_qnet::{ChannelPool, Delay, FifoQueue, QueueingNode};

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "{} != {}", x, y);
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fifo_node<P: 'static>(channels: usize, max_len: Option<usize>, delay: Delay<P>) -> QueueingNode<P> {
    let pool = ChannelPool::new(Some(channels)).unwrap();
    match max_len {
        Some(len) => QueueingNode::new(FifoQueue::bounded(len), pool, delay),
        None => QueueingNode::new(FifoQueue::new(), pool, delay),
    }
}
