use crate::error::ConfigurationError;
use crate::pool::ChannelPool;

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(
        ChannelPool::<u32>::new(Some(0)),
        Err(ConfigurationError::InvalidCapacity(_))
    ));
}

#[test]
fn tasks_pop_in_finish_time_order() {
    let mut pool = ChannelPool::new(Some(3)).unwrap();
    assert_eq!(pool.add_task('a', 5.), 0);
    assert_eq!(pool.add_task('b', 2.), 1);
    assert_eq!(pool.add_task('c', 3.), 2);
    assert!(pool.is_full());
    assert_eq!(pool.next_finish_time(), Some(2.));

    let order: Vec<_> = std::iter::from_fn(|| pool.pop_finished_task())
        .map(|task| (task.item, task.finish_time, task.channel))
        .collect();
    assert_eq!(order, vec![('b', 2., 1), ('c', 3., 2), ('a', 5., 0)]);
    assert!(pool.is_empty());
    assert_eq!(pool.next_finish_time(), None);
}

#[test]
fn ties_resolve_by_insertion_order() {
    let mut pool = ChannelPool::unbounded();
    for item in 0..5 {
        pool.add_task(item, 1.);
    }
    let order: Vec<_> = std::iter::from_fn(|| pool.pop_finished_task()).map(|task| task.item).collect();
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
}

#[test]
fn released_channel_is_reused_before_minting() {
    let mut pool = ChannelPool::new(Some(3)).unwrap();
    pool.add_task(0, 1.);
    pool.add_task(1, 4.);
    pool.add_task(2, 2.);
    assert_eq!(pool.pop_finished_task().unwrap().channel, 0);
    assert_eq!(pool.pop_finished_task().unwrap().channel, 2);
    assert_eq!(pool.free().collect::<Vec<_>>(), vec![0, 2]);

    assert_eq!(pool.add_task(3, 5.), 0);
    assert_eq!(pool.add_task(4, 5.), 2);
    assert_eq!(pool.num_channels(), 3);
    assert_eq!(pool.occupied().collect::<Vec<_>>(), vec![0, 1, 2]);
}

#[test]
fn occupied_never_exceeds_capacity() {
    let mut pool = ChannelPool::new(Some(2)).unwrap();
    let mut time = 0.;
    for item in 0..100 {
        if pool.is_full() {
            let task = pool.pop_finished_task().unwrap();
            time = task.finish_time;
        }
        pool.add_task(item, time + (item % 7) as f64);
        assert!(pool.num_busy() <= 2);
        assert_eq!(pool.num_busy() + pool.free().count(), pool.num_channels());
    }
    assert_eq!(pool.num_channels(), 2);
}

#[test]
#[should_panic(expected = "Channel pool is full!")]
fn add_to_full_pool_panics() {
    let mut pool = ChannelPool::new(Some(1)).unwrap();
    pool.add_task(0, 1.);
    pool.add_task(1, 1.);
}

#[test]
fn clear_forgets_channels() {
    let mut pool = ChannelPool::new(Some(2)).unwrap();
    pool.add_task(0, 1.);
    pool.add_task(1, 1.);
    pool.clear();
    assert_eq!(pool.num_channels(), 0);
    assert_eq!(pool.add_task(2, 3.), 0);
}
