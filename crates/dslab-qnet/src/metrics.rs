//! Statistics accumulated by nodes and by the model.

use serde::Serialize;
use serde_json::json;

use crate::snapshot::Snapshot;

/// Floor for denominators of time-weighted statistics.
pub const TIME_EPSILON: f64 = 1e-6;

/// Counters shared by all node kinds.
#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeMetrics {
    /// Number of received items.
    pub num_in: u64,
    /// Number of released items.
    pub num_out: u64,
    /// Time of the last arrival, -1 if there was none.
    pub start_action_time: f64,
    /// Time of the last departure, -1 if there was none.
    pub end_action_time: f64,
    /// Simulation time covered by the statistics.
    pub passed_time: f64,
}

impl NodeMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self {
            start_action_time: -1.,
            end_action_time: -1.,
            ..Default::default()
        }
    }

    /// Restores initial values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Snapshot for NodeMetrics {
    fn snapshot(&self) -> serde_json::Value {
        json!({"num_in": self.num_in, "num_out": self.num_out, "passed_time": self.passed_time})
    }
}

/// Time-weighted statistics of a queueing node.
///
/// Arrival and departure counts live in [`NodeMetrics`], so the derived statistics take them as arguments.
#[derive(Clone, Debug, Default, Serialize)]
pub struct QueueingMetrics {
    /// Integral of the queue length over time.
    pub wait_time: f64,
    /// Integral of the number of busy channels over time.
    pub busy_time: f64,
    /// Time of the last arrival.
    pub in_time: f64,
    /// Time of the last departure.
    pub out_time: f64,
    /// Sum of intervals between consecutive arrivals.
    pub in_interval: f64,
    /// Sum of intervals between consecutive departures.
    pub out_interval: f64,
    /// Number of arrivals rejected because both channels and queue were full.
    pub num_failures: u64,
    /// Busy time of each channel, indexed by channel id.
    pub channel_busy_time: Vec<f64>,
    /// Number of tasks started on each channel, indexed by channel id.
    pub channel_tasks: Vec<u64>,
}

impl QueueingMetrics {
    /// Restores initial values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn record_arrival(&mut self, num_in: u64, time: f64) {
        if num_in > 1 {
            self.in_interval += time - self.in_time;
        }
        self.in_time = time;
    }

    pub(crate) fn record_departure(&mut self, num_out: u64, time: f64) {
        if num_out > 1 {
            self.out_interval += time - self.out_time;
        }
        self.out_time = time;
    }

    fn ensure_channel(&mut self, channel: usize) {
        if self.channel_tasks.len() <= channel {
            self.channel_tasks.resize(channel + 1, 0);
            self.channel_busy_time.resize(channel + 1, 0.);
        }
    }

    pub(crate) fn record_task(&mut self, channel: usize) {
        self.ensure_channel(channel);
        self.channel_tasks[channel] += 1;
    }

    pub(crate) fn integrate(&mut self, queue_len: usize, busy_channels: impl Iterator<Item = usize>, dt: f64) {
        self.wait_time += queue_len as f64 * dt;
        for channel in busy_channels {
            self.ensure_channel(channel);
            self.channel_busy_time[channel] += dt;
            self.busy_time += dt;
        }
    }

    /// Mean interval between arrivals.
    pub fn mean_in_interval(&self, base: &NodeMetrics) -> f64 {
        self.in_interval / (base.num_in.max(2) - 1) as f64
    }

    /// Mean interval between departures.
    pub fn mean_out_interval(&self, base: &NodeMetrics) -> f64 {
        self.out_interval / (base.num_out.max(2) - 1) as f64
    }

    /// Time-averaged queue length.
    pub fn mean_queue_len(&self, base: &NodeMetrics) -> f64 {
        self.wait_time / base.passed_time.max(TIME_EPSILON)
    }

    /// Time-averaged number of busy channels.
    pub fn mean_busy_channels(&self, base: &NodeMetrics) -> f64 {
        self.busy_time / base.passed_time.max(TIME_EPSILON)
    }

    /// Fraction of time the given channel was busy.
    pub fn channel_utilization(&self, channel: usize, base: &NodeMetrics) -> f64 {
        self.channel_busy_time.get(channel).copied().unwrap_or(0.) / base.passed_time.max(TIME_EPSILON)
    }

    /// Fraction of arrivals which were rejected.
    pub fn failure_probability(&self, base: &NodeMetrics) -> f64 {
        self.num_failures as f64 / base.num_in.max(1) as f64
    }

    /// Mean time spent in the queue per departure.
    pub fn mean_wait_time(&self, base: &NodeMetrics) -> f64 {
        self.wait_time / base.num_out.max(1) as f64
    }

    /// Mean time spent in service per departure.
    pub fn mean_service_time(&self, base: &NodeMetrics) -> f64 {
        self.busy_time / base.num_out.max(1) as f64
    }

    pub(crate) fn snapshot_with(&self, base: &NodeMetrics) -> serde_json::Value {
        json!({
            "num_failures": self.num_failures,
            "mean_queue_len": self.mean_queue_len(base),
            "mean_busy_channels": self.mean_busy_channels(base),
            "channel_utilization": (0..self.channel_busy_time.len())
                .map(|c| self.channel_utilization(c, base))
                .collect::<Vec<_>>(),
            "mean_in_interval": self.mean_in_interval(base),
            "mean_out_interval": self.mean_out_interval(base),
            "failure_probability": self.failure_probability(base),
            "mean_wait_time": self.mean_wait_time(base),
            "mean_service_time": self.mean_service_time(base),
        })
    }
}

/// Aggregate statistics of a model run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ModelMetrics {
    /// Number of factory and queueing completions.
    pub num_events: u64,
    /// Simulated time covered by the statistics.
    pub passed_time: f64,
    /// Number of items which left the network.
    pub num_processed: u64,
    /// Number of items lost on full queueing nodes.
    pub num_lost: u64,
    /// Total time spent in the network by processed items.
    pub total_time_in_system: f64,
}

impl ModelMetrics {
    /// Restores initial values.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of counted events per unit of simulated time.
    pub fn mean_event_intensity(&self) -> f64 {
        self.num_events as f64 / self.passed_time.max(TIME_EPSILON)
    }

    /// Mean time spent in the network by processed items.
    pub fn mean_time_in_system(&self) -> f64 {
        self.total_time_in_system / self.num_processed.max(1) as f64
    }
}

impl Snapshot for ModelMetrics {
    fn snapshot(&self) -> serde_json::Value {
        json!({
            "num_events": self.num_events,
            "passed_time": self.passed_time,
            "mean_event_intensity": self.mean_event_intensity(),
            "num_processed": self.num_processed,
            "num_lost": self.num_lost,
            "mean_time_in_system": self.mean_time_in_system(),
        })
    }
}
