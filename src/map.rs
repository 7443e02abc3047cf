// Map core: engine (viewport + tiles), country layer, selection controller
// and the shared viewport math.
pub mod engine;
pub mod layer;
pub mod select;
pub mod viewport;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Liveness token handed to background work (geometry load, dataset fetch).
/// Teardown revokes it; completions arriving afterwards check it and discard
/// their result instead of touching a disposed map handle.
#[derive(Clone, Debug)]
pub struct Alive(Arc<AtomicBool>);

impl Alive {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn check(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn revoke(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Alive {
    fn default() -> Self {
        Self::new()
    }
}
