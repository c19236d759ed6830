//! Pool of parallel service channels.

use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

use crate::error::ConfigurationError;

/// Item in service together with its channel and finish time.
pub struct Task<T> {
    /// Served item.
    pub item: T,
    /// Time when the service finishes.
    pub finish_time: f64,
    /// Id of the channel serving the item.
    pub channel: usize,
    seq: u64,
}

impl<T> PartialOrd for Task<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Task<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .finish_time
            .total_cmp(&self.finish_time)
            .then(other.seq.cmp(&self.seq))
    }
}

impl<T> PartialEq for Task<T> {
    fn eq(&self, other: &Self) -> bool {
        self.finish_time == other.finish_time && self.seq == other.seq
    }
}

impl<T> Eq for Task<T> {}

/// Bounded set of channels serving items in parallel.
///
/// Channel ids are minted lazily starting from 0 and reused after release (smallest free id first),
/// so per-channel statistics stay attached to a stable id. Tasks are kept in a min-heap ordered by
/// finish time, ties are resolved by insertion order.
pub struct ChannelPool<T> {
    max_channels: Option<usize>,
    free: BTreeSet<usize>,
    occupied: BTreeSet<usize>,
    tasks: BinaryHeap<Task<T>>,
    next_seq: u64,
}

impl<T> ChannelPool<T> {
    /// Creates a pool with at most `max_channels` channels, `None` means unbounded.
    pub fn new(max_channels: Option<usize>) -> Result<Self, ConfigurationError> {
        if max_channels == Some(0) {
            return Err(ConfigurationError::InvalidCapacity(
                "channel pool must have at least one channel".to_string(),
            ));
        }
        Ok(Self {
            max_channels,
            free: BTreeSet::new(),
            occupied: BTreeSet::new(),
            tasks: BinaryHeap::new(),
            next_seq: 0,
        })
    }

    /// Creates a pool without channel limit.
    pub fn unbounded() -> Self {
        Self {
            max_channels: None,
            free: BTreeSet::new(),
            occupied: BTreeSet::new(),
            tasks: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Returns the channel limit.
    pub fn max_channels(&self) -> Option<usize> {
        self.max_channels
    }

    /// Returns the number of busy channels.
    pub fn num_busy(&self) -> usize {
        self.occupied.len()
    }

    /// Returns the number of channel ids minted so far.
    pub fn num_channels(&self) -> usize {
        self.occupied.len() + self.free.len()
    }

    /// Returns `true` if no channel is busy.
    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Returns `true` if all channels are busy.
    pub fn is_full(&self) -> bool {
        self.max_channels.map_or(false, |max| self.occupied.len() >= max)
    }

    /// Iterates over busy channel ids in increasing order.
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.occupied.iter().copied()
    }

    /// Iterates over free channel ids in increasing order.
    pub fn free(&self) -> impl Iterator<Item = usize> + '_ {
        self.free.iter().copied()
    }

    /// Iterates over tasks in service in no particular order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task<T>> + '_ {
        self.tasks.iter()
    }

    /// Returns the earliest finish time among tasks in service.
    pub fn next_finish_time(&self) -> Option<f64> {
        self.tasks.peek().map(|task| task.finish_time)
    }

    /// Starts serving the item and returns the assigned channel id.
    ///
    /// The caller must check [`is_full`](Self::is_full) first, adding a task to a full pool panics.
    pub fn add_task(&mut self, item: T, finish_time: f64) -> usize {
        assert!(!self.is_full(), "Channel pool is full!");
        let channel = match self.free.pop_first() {
            Some(channel) => channel,
            None => self.num_channels(),
        };
        self.occupied.insert(channel);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tasks.push(Task {
            item,
            finish_time,
            channel,
            seq,
        });
        channel
    }

    /// Removes the task with the smallest finish time and frees its channel.
    pub fn pop_finished_task(&mut self) -> Option<Task<T>> {
        let task = self.tasks.pop()?;
        self.occupied.remove(&task.channel);
        self.free.insert(task.channel);
        Some(task)
    }

    /// Drops all tasks and forgets minted channel ids.
    pub fn clear(&mut self) {
        self.free.clear();
        self.occupied.clear();
        self.tasks.clear();
        self.next_seq = 0;
    }
}
