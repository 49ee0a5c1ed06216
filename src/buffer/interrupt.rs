use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Something with parked threads that can be told to re-check their condition.
pub(crate) trait WakeWaiters: Send + Sync {
    fn wake_waiters(&self);
}

/// Cancellation token for interruptible waits.
///
/// A token is shared between the thread that waits and whoever wants to
/// interrupt it. `raise` marks the token and wakes the buffer the waiter is
/// parked on; the wait then returns an `Interrupted` error. Several threads
/// may wait on clones of one token; a raise wakes all of them and the first
/// to re-check consumes it. A raise that happens while nobody waits stays
/// pending until the next interruptible call, which consumes it.
#[derive(Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptInner>,
}

#[derive(Default)]
struct InterruptInner {
    raised: AtomicBool,
    next_waiter: AtomicU64,
    parked_on: Mutex<Vec<(u64, Weak<dyn WakeWaiters>)>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.inner.raised.store(true, Ordering::SeqCst);
        // Release our own lock before touching the buffer's lock; the waiter
        // arms while holding neither.
        let targets: Vec<_> = {
            let parked = self.inner.parked_on.lock();
            parked.iter().filter_map(|(_, t)| t.upgrade()).collect()
        };
        if !targets.is_empty() {
            log::trace!("interrupt raised, waking {} parked waiter(s)", targets.len());
        }
        for target in targets {
            target.wake_waiters();
        }
    }

    pub fn is_raised(&self) -> bool {
        self.inner.raised.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.inner.raised.store(false, Ordering::SeqCst);
    }

    /// Consume a pending interrupt.
    pub(crate) fn take_pending(&self) -> bool {
        self.inner.raised.swap(false, Ordering::SeqCst)
    }

    /// Register the buffer about to be waited on. Must be called before the
    /// waiter takes the buffer lock and first checks `take_pending`.
    pub(crate) fn arm(&self, target: Weak<dyn WakeWaiters>) -> Armed<'_> {
        let id = self.inner.next_waiter.fetch_add(1, Ordering::Relaxed);
        self.inner.parked_on.lock().push((id, target));
        Armed {
            interrupt: self,
            id,
        }
    }

    #[cfg(test)]
    fn armed_count(&self) -> usize {
        self.inner.parked_on.lock().len()
    }
}

impl fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interrupt")
            .field("raised", &self.is_raised())
            .finish()
    }
}

pub(crate) struct Armed<'a> {
    interrupt: &'a Interrupt,
    id: u64,
}

impl Drop for Armed<'_> {
    fn drop(&mut self) {
        let mut parked = self.interrupt.inner.parked_on.lock();
        parked.retain(|(id, _)| *id != self.id);
    }
}
