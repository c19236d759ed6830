//! Service stage with a bounded waiting line and a pool of channels.

use serde_json::json;

use crate::delay::{Delay, SimRng};
use crate::error::Error;
use crate::error::RuntimeInvariantError;
use crate::item::Item;
use crate::log_debug;
use crate::metrics::QueueingMetrics;
use crate::node::{Arrival, NodeCore, INF_TIME};
use crate::pool::ChannelPool;
use crate::queue::WaitingLine;

/// Extension points of a queueing node.
///
/// Specialized stages override these hooks to update item payloads or collect extra statistics
/// without touching the scheduling logic. All hooks are no-ops by default.
pub trait QueueingHooks<P> {
    /// Called for every arriving item, including the ones which will be rejected.
    fn item_in(&mut self, _item: &mut Item<P>, _time: f64) {}

    /// Called right before the item occupies a channel.
    fn before_task_added(&mut self, _item: &mut Item<P>, _time: f64) {}

    /// Called for every released item.
    fn item_out(&mut self, _item: &mut Item<P>, _time: f64) {}

    /// Called when an arrival is rejected because channels and queue are full.
    fn on_failure(&mut self, _item: &Item<P>, _time: f64) {}
}

/// Hooks which do nothing.
pub struct NoHooks;

impl<P> QueueingHooks<P> for NoHooks {}

/// Node serving items on parallel channels, with a waiting line for items finding all channels busy.
pub struct QueueingNode<P> {
    queue: Box<dyn WaitingLine<Item<P>>>,
    pool: ChannelPool<Item<P>>,
    delay: Delay<P>,
    hooks: Box<dyn QueueingHooks<P>>,
    metrics: QueueingMetrics,
}

impl<P: 'static> QueueingNode<P> {
    /// Creates a node with the given waiting line, channel pool and service time.
    pub fn new<Q>(queue: Q, pool: ChannelPool<Item<P>>, delay: Delay<P>) -> Self
    where
        Q: WaitingLine<Item<P>> + 'static,
    {
        Self {
            queue: Box::new(queue),
            pool,
            delay,
            hooks: Box::new(NoHooks),
            metrics: QueueingMetrics::default(),
        }
    }

    /// Replaces the default no-op hooks.
    pub fn with_hooks<H>(mut self, hooks: H) -> Self
    where
        H: QueueingHooks<P> + 'static,
    {
        self.hooks = Box::new(hooks);
        self
    }

    /// Returns the waiting line.
    pub fn queue(&self) -> &dyn WaitingLine<Item<P>> {
        self.queue.as_ref()
    }

    /// Returns the channel pool.
    pub fn pool(&self) -> &ChannelPool<Item<P>> {
        &self.pool
    }

    /// Returns the number of waiting items.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Returns the number of busy channels.
    pub fn num_busy(&self) -> usize {
        self.pool.num_busy()
    }

    /// Returns the number of items waiting or in service.
    pub fn num_items(&self) -> usize {
        self.queue.len() + self.pool.num_busy()
    }

    /// Returns the time-weighted statistics.
    pub fn metrics(&self) -> &QueueingMetrics {
        &self.metrics
    }

    pub(crate) fn start_action(
        &mut self,
        core: &mut NodeCore,
        mut item: Item<P>,
        rng: &mut SimRng,
    ) -> Result<Arrival<P>, Error> {
        let time = core.time();
        self.metrics.record_arrival(core.metrics().num_in, time);
        self.hooks.item_in(&mut item, time);
        if self.pool.is_full() {
            if self.queue.is_full() {
                self.metrics.num_failures += 1;
                self.hooks.on_failure(&item, time);
                log_debug!(core, "rejected item {}: channels and queue are full", item.id());
                return Ok(Arrival::Rejected(item));
            }
            self.queue.push(item);
        } else {
            self.add_task(core, item, rng)?;
        }
        Ok(Arrival::Accepted)
    }

    pub(crate) fn end_action(&mut self, core: &mut NodeCore, rng: &mut SimRng) -> Result<Item<P>, Error> {
        let task = self
            .pool
            .pop_finished_task()
            .ok_or_else(|| RuntimeInvariantError::NoPendingTask(core.name().to_owned()))?;
        match self.queue.pop() {
            Some(next_item) => self.add_task(core, next_item, rng)?,
            None => core.set_next_time(self.pool.next_finish_time().unwrap_or(INF_TIME)),
        }
        Ok(task.item)
    }

    pub(crate) fn after_out(&mut self, core: &NodeCore, item: &mut Item<P>) {
        self.metrics.record_departure(core.metrics().num_out, core.time());
        self.hooks.item_out(item, core.time());
    }

    fn add_task(&mut self, core: &mut NodeCore, mut item: Item<P>, rng: &mut SimRng) -> Result<(), Error> {
        let finish_time = core.predict_time(&mut self.delay, Some(&item), rng)?;
        self.hooks.before_task_added(&mut item, core.time());
        let channel = self.pool.add_task(item, finish_time);
        self.metrics.record_task(channel);
        core.set_next_time(self.pool.next_finish_time().unwrap_or(INF_TIME));
        Ok(())
    }

    pub(crate) fn before_time_update(&mut self, core: &NodeCore, time: f64) {
        let dt = time - core.time();
        self.metrics.integrate(self.queue.len(), self.pool.occupied(), dt);
    }

    pub(crate) fn reset(&mut self) {
        self.queue.clear();
        self.pool.clear();
        self.metrics.reset();
    }

    pub(crate) fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    pub(crate) fn state_snapshot(&self) -> serde_json::Value {
        let mut tasks: Vec<_> = self.pool.tasks().collect();
        tasks.sort_by_key(|task| task.channel);
        json!({
            "queue": self.queue.iter().map(|item| item.id().to_string()).collect::<Vec<_>>(),
            "max_queue_len": self.queue.max_len(),
            "max_channels": self.pool.max_channels(),
            "channels": tasks
                .iter()
                .map(|task| json!({
                    "channel": task.channel,
                    "item": task.item.id().to_string(),
                    "finish_time": task.finish_time,
                }))
                .collect::<Vec<_>>(),
        })
    }
}
