//! Bounded waiting lines.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Waiting line with optional maximum length.
///
/// `push` must only be called when the line is not full, pushing into a full line is a caller error.
pub trait WaitingLine<T> {
    /// Returns the number of waiting elements.
    fn len(&self) -> usize;

    /// Returns the maximum length, `None` means unbounded.
    fn max_len(&self) -> Option<usize>;

    /// Adds an element.
    fn push(&mut self, item: T);

    /// Removes the next element according to the line discipline.
    fn pop(&mut self) -> Option<T>;

    /// Removes all elements.
    fn clear(&mut self);

    /// Iterates over waiting elements in no particular order.
    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;

    /// Returns `true` if nothing is waiting.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the line is bounded and reached its maximum length.
    fn is_full(&self) -> bool {
        self.max_len().map_or(false, |max_len| self.len() >= max_len)
    }
}

/// First-in first-out queue.
pub struct FifoQueue<T> {
    queue: VecDeque<T>,
    max_len: Option<usize>,
}

impl<T> FifoQueue<T> {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            max_len: None,
        }
    }

    /// Creates a queue holding at most `max_len` elements.
    pub fn bounded(max_len: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(max_len),
            max_len: Some(max_len),
        }
    }
}

impl<T> Default for FifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WaitingLine<T> for FifoQueue<T> {
    fn len(&self) -> usize {
        self.queue.len()
    }

    fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    fn push(&mut self, item: T) {
        assert!(!self.is_full(), "Push into a full queue!");
        self.queue.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.queue.pop_front()
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.queue.iter())
    }
}

/// Last-in first-out queue (stack).
pub struct LifoQueue<T> {
    queue: Vec<T>,
    max_len: Option<usize>,
}

impl<T> LifoQueue<T> {
    /// Creates an unbounded queue.
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            max_len: None,
        }
    }

    /// Creates a queue holding at most `max_len` elements.
    pub fn bounded(max_len: usize) -> Self {
        Self {
            queue: Vec::with_capacity(max_len),
            max_len: Some(max_len),
        }
    }
}

impl<T> Default for LifoQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WaitingLine<T> for LifoQueue<T> {
    fn len(&self) -> usize {
        self.queue.len()
    }

    fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    fn push(&mut self, item: T) {
        assert!(!self.is_full(), "Push into a full queue!");
        self.queue.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.queue.pop()
    }

    fn clear(&mut self) {
        self.queue.clear();
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.queue.iter())
    }
}

/// Order of elements with equal priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreak {
    /// No guarantees.
    None,
    /// Earlier arrival wins.
    Fifo,
    /// Later arrival wins.
    Lifo,
}

struct Entry<T> {
    priority: f64,
    seq: i64,
    item: T,
}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// reversed to turn BinaryHeap into a min-heap
impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then(other.seq.cmp(&self.seq))
    }
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl<T> Eq for Entry<T> {}

/// Queue popping the element with the smallest priority key first.
///
/// The key function is supplied at construction, so elements never have to be comparable.
///
/// # Examples
///
/// ```rust
/// use dslab_qnet::{PriorityQueue, TieBreak, WaitingLine};
///
/// let mut queue = PriorityQueue::new(|x: &(u32, char)| x.0 as f64, TieBreak::Fifo);
/// queue.push((1, 'a'));
/// queue.push((0, 'b'));
/// queue.push((1, 'c'));
/// assert_eq!(queue.pop(), Some((0, 'b')));
/// assert_eq!(queue.pop(), Some((1, 'a')));
/// assert_eq!(queue.pop(), Some((1, 'c')));
/// ```
pub struct PriorityQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    priority_fn: Box<dyn Fn(&T) -> f64>,
    tie_break: TieBreak,
    counter: i64,
    max_len: Option<usize>,
}

impl<T> PriorityQueue<T> {
    /// Creates an unbounded queue.
    pub fn new<F>(priority_fn: F, tie_break: TieBreak) -> Self
    where
        F: Fn(&T) -> f64 + 'static,
    {
        Self {
            heap: BinaryHeap::new(),
            priority_fn: Box::new(priority_fn),
            tie_break,
            counter: 0,
            max_len: None,
        }
    }

    /// Limits the queue length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len);
        self
    }

    /// Returns the tie-break mode.
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    fn next_seq(&mut self) -> i64 {
        let seq = match self.tie_break {
            TieBreak::None => 0,
            TieBreak::Fifo => self.counter,
            TieBreak::Lifo => -self.counter,
        };
        self.counter += 1;
        seq
    }
}

impl<T> WaitingLine<T> for PriorityQueue<T> {
    fn len(&self) -> usize {
        self.heap.len()
    }

    fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    fn push(&mut self, item: T) {
        assert!(!self.is_full(), "Push into a full queue!");
        let priority = (self.priority_fn)(&item);
        let seq = self.next_seq();
        self.heap.push(Entry { priority, seq, item });
    }

    fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|entry| entry.item)
    }

    fn clear(&mut self) {
        self.heap.clear();
        self.counter = 0;
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.heap.iter().map(|entry| &entry.item))
    }
}
