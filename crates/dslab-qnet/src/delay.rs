//! Delay-producing functions.

use rand::distributions::Distribution;
use rand_pcg::Pcg64;

use crate::item::Item;

/// Random number generator shared by all nodes of a model.
pub type SimRng = Pcg64;

enum DelayKind<P> {
    Constant(f64),
    Plain(Box<dyn FnMut(&mut SimRng) -> f64>),
    PerItem(Box<dyn FnMut(&Item<P>, &mut SimRng) -> f64>),
}

/// Produces service, inter-arrival or transition times.
///
/// Concrete distributions are supplied by the caller, either as closures or as any
/// [`Distribution<f64>`](rand::distributions::Distribution), and are always sampled
/// with the model-wide random number generator.
pub struct Delay<P> {
    kind: DelayKind<P>,
}

impl<P> Delay<P> {
    /// Delay which always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self {
            kind: DelayKind::Constant(value),
        }
    }

    /// Instantaneous delay.
    pub fn zero() -> Self {
        Self::constant(0.)
    }

    /// Delay computed by a closure which does not depend on the item.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnMut(&mut SimRng) -> f64 + 'static,
    {
        Self {
            kind: DelayKind::Plain(Box::new(f)),
        }
    }

    /// Delay computed from the item being processed.
    pub fn from_item_fn<F>(f: F) -> Self
    where
        F: FnMut(&Item<P>, &mut SimRng) -> f64 + 'static,
    {
        Self {
            kind: DelayKind::PerItem(Box::new(f)),
        }
    }

    /// Delay sampled from the given distribution.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dslab_qnet::Delay;
    /// use rand_distr::Exp;
    ///
    /// let delay = Delay::<()>::from_distribution(Exp::new(1.0 / 10.25).unwrap());
    /// assert!(!delay.is_item_dependent());
    /// ```
    pub fn from_distribution<D>(dist: D) -> Self
    where
        D: Distribution<f64> + 'static,
    {
        Self::from_fn(move |rng| dist.sample(rng))
    }

    /// Returns `true` if the delay can only be computed for a concrete item.
    pub fn is_item_dependent(&self) -> bool {
        matches!(self.kind, DelayKind::PerItem(_))
    }

    /// Samples the next delay value.
    ///
    /// Returns `None` if the delay depends on an item and no item is given.
    pub fn sample(&mut self, item: Option<&Item<P>>, rng: &mut SimRng) -> Option<f64> {
        match &mut self.kind {
            DelayKind::Constant(value) => Some(*value),
            DelayKind::Plain(f) => Some(f(rng)),
            DelayKind::PerItem(f) => item.map(|item| f(item, rng)),
        }
    }
}

impl<P> Default for Delay<P> {
    fn default() -> Self {
        Self::zero()
    }
}
