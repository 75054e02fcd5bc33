use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::sync::Mutex;

/// Draws peer indices uniformly from `[0, n - 1]`.
///
/// One selector is shared by every in-flight transaction for the lifetime of the process;
/// it is never reseeded. Rejecting indices which were already used for a transaction is
/// up to the caller.
#[derive(Debug)]
pub struct PeerSelector {
    n: usize,
    dist: Option<Uniform<usize>>,
    rng: Mutex<StdRng>,
}

impl PeerSelector {
    pub fn new(n: usize) -> Self {
        PeerSelector::with_rng(n, StdRng::from_entropy())
    }

    /// Uses the provided generator, e.g. a seeded one.
    pub fn with_rng(n: usize, rng: StdRng) -> Self {
        let dist = if n > 0 { Some(Uniform::new(0, n)) } else { None };
        PeerSelector { n, dist, rng: Mutex::new(rng) }
    }

    /// The number of peers to choose from.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Draws the next candidate, `None` if there are no peers.
    pub fn draw(&self) -> Option<usize> {
        let dist = self.dist.as_ref()?;
        // A poisoned lock only means another draw panicked, the generator itself is intact.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(dist.sample(&mut *rng))
    }
}
