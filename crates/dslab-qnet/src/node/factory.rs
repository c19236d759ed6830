//! Source of items.

use serde_json::json;

use crate::delay::{Delay, SimRng};
use crate::error::{ConfigurationError, RuntimeInvariantError};
use crate::item::{Item, ItemId};
use crate::log_trace;
use crate::node::NodeCore;

/// Node creating a new item each time its delay elapses.
///
/// Has no queue and no capacity limit, exactly one creation is pending at any time.
pub struct FactoryNode<P> {
    delay: Delay<P>,
    payload_fn: Box<dyn FnMut(&mut SimRng) -> P>,
    first_arrival: Option<f64>,
    counter: u64,
    last_item: Option<ItemId>,
}

impl<P: Default + 'static> FactoryNode<P> {
    /// Creates a factory with inter-arrival times produced by `delay` and default payloads.
    pub fn new(delay: Delay<P>) -> Result<Self, ConfigurationError> {
        Self::with_payload(delay, |_| P::default())
    }
}

impl<P: 'static> FactoryNode<P> {
    /// Creates a factory which builds item payloads with `payload_fn`.
    pub fn with_payload<F>(delay: Delay<P>, payload_fn: F) -> Result<Self, ConfigurationError>
    where
        F: FnMut(&mut SimRng) -> P + 'static,
    {
        if delay.is_item_dependent() {
            return Err(ConfigurationError::ItemDelayOnFactory);
        }
        Ok(Self {
            delay,
            payload_fn: Box::new(payload_fn),
            first_arrival: None,
            counter: 0,
            last_item: None,
        })
    }

    /// Schedules the first item at `time` instead of sampling the delay.
    ///
    /// The model clock starts at 0, so `time` must be a non-negative number.
    pub fn with_first_arrival(mut self, time: f64) -> Result<Self, ConfigurationError> {
        if time.is_nan() || time < 0. {
            return Err(ConfigurationError::InvalidValue(format!(
                "first arrival time must be non-negative, got {}",
                time
            )));
        }
        self.first_arrival = Some(time);
        Ok(self)
    }

    /// Returns the number of items created since the last reset.
    pub fn num_created(&self) -> u64 {
        self.counter
    }

    /// Returns the id of the last created item.
    pub fn last_item(&self) -> Option<ItemId> {
        self.last_item
    }

    pub(crate) fn reset(&mut self, core: &mut NodeCore, rng: &mut SimRng) -> Result<(), RuntimeInvariantError> {
        self.counter = 0;
        self.last_item = None;
        let next_time = match self.first_arrival {
            Some(time) => time,
            None => core.predict_time(&mut self.delay, None, rng)?,
        };
        core.set_next_time(next_time);
        Ok(())
    }

    pub(crate) fn end_action(&mut self, core: &mut NodeCore, rng: &mut SimRng) -> Result<Item<P>, RuntimeInvariantError> {
        let id = ItemId {
            source: core.id(),
            seq: self.counter,
        };
        self.counter += 1;
        self.last_item = Some(id);
        let mut item = Item::new(id, core.time(), (self.payload_fn)(rng));
        core.record_in(&mut item);
        let next_time = core.predict_time(&mut self.delay, None, rng)?;
        core.set_next_time(next_time);
        log_trace!(core, "created item {}, next at {:.3}", id, next_time);
        Ok(item)
    }

    pub(crate) fn state_snapshot(&self) -> serde_json::Value {
        json!({
            "num_created": self.counter,
            "last_item": self.last_item.map(|id| id.to_string()),
        })
    }
}
