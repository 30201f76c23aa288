use futures::future::LocalBoxFuture;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Delays and task spawning for the single-threaded runtime.
///
/// One-shot timers are `sleep` followed by work, repeating timers are a
/// sleeping loop, and cancellation is done by aborting the spawned task.
pub trait TimerFacility {
    fn sleep(&self, delay: Duration) -> LocalBoxFuture<'static, ()>;

    fn spawn_local(&self, task: LocalBoxFuture<'static, ()>);
}

/// Monotonic generation counter shared by a session and its tasks.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Rc<Cell<u64>>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; every previously issued token goes stale.
    pub fn advance(&self) -> GenerationToken {
        self.current.set(self.current.get() + 1);
        self.token()
    }

    /// Token for the current generation.
    pub fn token(&self) -> GenerationToken {
        GenerationToken { counter: self.current.clone(), id: self.current.get() }
    }

    pub fn current(&self) -> u64 {
        self.current.get()
    }
}

/// Proof of membership in one generation.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    counter: Rc<Cell<u64>>,
    id: u64,
}

impl GenerationToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.counter.get() == self.id
    }
}
