use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use log::{debug, trace};
use parking_lot::{Condvar, Mutex, MutexGuard};

use super::interrupt::{Interrupt, WakeWaiters};
use super::slots::SlotRing;
use crate::config::BufferConfig;
use crate::error::{BufferResult, PutError, TakeError};

#[derive(Debug, Default, Clone, Copy)]
struct Counters {
    puts: u64,
    takes: u64,
    blocked_puts: u64,
    blocked_takes: u64,
    interrupts: u64,
    timeouts: u64,
}

struct State<T> {
    ring: SlotRing<T>,
    closed: bool,
    counters: Counters,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

impl<T: Send> WakeWaiters for Shared<T> {
    fn wake_waiters(&self) {
        // Taking the lock orders this wakeup after any in-progress check.
        let _guard = self.state.lock();
        self.not_full.notify_all();
        self.not_empty.notify_all();
    }
}

/// Point-in-time view of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    pub capacity: usize,
    pub len: usize,
    pub put_index: usize,
    pub take_index: usize,
    pub closed: bool,
    pub puts: u64,
    pub takes: u64,
    pub blocked_puts: u64,
    pub blocked_takes: u64,
    pub interrupts: u64,
    pub timeouts: u64,
}

#[derive(Debug, Clone, Copy)]
enum Wait {
    Never,
    Forever,
    Until(Instant),
}

impl Wait {
    fn after(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Wait::Until(deadline),
            None => Wait::Forever,
        }
    }
}

/// Fixed-capacity FIFO with blocking put/take.
///
/// One mutex guards the slot ring; producers park on `not_full`, consumers
/// on `not_empty`. Every state change wakes a single waiter. Only `close`,
/// `drain` and interrupt delivery broadcast.
///
/// Cloning yields another handle to the same buffer.
pub struct BoundedBuffer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for BoundedBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> BoundedBuffer<T> {
    pub fn new(capacity: usize) -> BufferResult<Self> {
        Self::with_config(BufferConfig { capacity })
    }

    pub fn with_config(config: BufferConfig) -> BufferResult<Self> {
        config.validate()?;
        debug!("bounded buffer created, capacity={}", config.capacity);
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    ring: SlotRing::with_capacity(config.capacity),
                    closed: false,
                    counters: Counters::default(),
                }),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        })
    }

    /// Block until a slot is free, then append `item`.
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        self.put_inner(item, Wait::Forever, None)
    }

    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutError<T>> {
        self.put_inner(item, Wait::after(timeout), None)
    }

    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        self.put_inner(item, Wait::Never, None)
    }

    /// Block until an item is available and remove it.
    pub fn take(&self) -> Result<T, TakeError> {
        self.take_inner(Wait::Forever, None)
    }

    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        self.take_inner(Wait::after(timeout), None)
    }

    pub fn try_take(&self) -> Result<T, TakeError> {
        self.take_inner(Wait::Never, None)
    }

    /// Stop accepting items and wake every waiter. Items already buffered
    /// can still be taken.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        debug!("bounded buffer closed with {} item(s) left", state.ring.len());
        self.shared.not_full.notify_all();
        self.shared.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Remove everything currently buffered, oldest first.
    pub fn drain(&self) -> Vec<T> {
        let mut state = self.shared.state.lock();
        let items = state.ring.drain();
        state.counters.takes += items.len() as u64;
        if !items.is_empty() {
            self.shared.not_full.notify_all();
        }
        items
    }

    pub fn len(&self) -> usize {
        self.shared.state.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.shared.state.lock().ring.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.shared.state.lock().ring.capacity()
    }

    pub fn remaining_capacity(&self) -> usize {
        let state = self.shared.state.lock();
        state.ring.capacity() - state.ring.len()
    }

    pub fn stats(&self) -> BufferStats {
        let state = self.shared.state.lock();
        let c = state.counters;
        BufferStats {
            capacity: state.ring.capacity(),
            len: state.ring.len(),
            put_index: state.ring.put_index(),
            take_index: state.ring.take_index(),
            closed: state.closed,
            puts: c.puts,
            takes: c.takes,
            blocked_puts: c.blocked_puts,
            blocked_takes: c.blocked_takes,
            interrupts: c.interrupts,
            timeouts: c.timeouts,
        }
    }

    fn put_inner(
        &self,
        mut item: T,
        wait: Wait,
        interrupt: Option<&Interrupt>,
    ) -> Result<(), PutError<T>> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        let mut blocked = false;
        loop {
            if state.closed {
                return Err(PutError::Closed(item));
            }
            if interrupt.is_some_and(Interrupt::take_pending) {
                state.counters.interrupts += 1;
                // raise() broadcast under this lock, so no single wakeup is
                // stranded by leaving here.
                trace!("put interrupted, len={}", state.ring.len());
                return Err(PutError::Interrupted(item));
            }
            item = match state.ring.push(item) {
                Ok(()) => break,
                Err(rejected) => rejected,
            };
            match wait {
                Wait::Never => return Err(PutError::Full(item)),
                Wait::Until(deadline) if Instant::now() >= deadline => {
                    state.counters.timeouts += 1;
                    return Err(PutError::Timeout(item));
                }
                _ => {}
            }
            if !blocked {
                blocked = true;
                state.counters.blocked_puts += 1;
            }
            Self::park(&shared.not_full, &mut state, wait);
        }
        state.counters.puts += 1;
        shared.not_empty.notify_one();
        Ok(())
    }

    fn take_inner(&self, wait: Wait, interrupt: Option<&Interrupt>) -> Result<T, TakeError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();
        let mut blocked = false;
        loop {
            if interrupt.is_some_and(Interrupt::take_pending) {
                state.counters.interrupts += 1;
                trace!("take interrupted, len={}", state.ring.len());
                return Err(TakeError::Interrupted);
            }
            if let Some(item) = state.ring.pop() {
                state.counters.takes += 1;
                shared.not_full.notify_one();
                return Ok(item);
            }
            if state.closed {
                return Err(TakeError::Closed);
            }
            match wait {
                Wait::Never => return Err(TakeError::Empty),
                Wait::Until(deadline) if Instant::now() >= deadline => {
                    state.counters.timeouts += 1;
                    return Err(TakeError::Timeout);
                }
                _ => {}
            }
            if !blocked {
                blocked = true;
                state.counters.blocked_takes += 1;
            }
            Self::park(&shared.not_empty, &mut state, wait);
        }
    }

    fn park(cond: &Condvar, state: &mut MutexGuard<'_, State<T>>, wait: Wait) {
        match wait {
            Wait::Until(deadline) => {
                // The caller re-checks both the condition and the deadline.
                let _ = cond.wait_until(state, deadline);
            }
            _ => cond.wait(state),
        }
    }
}

impl<T: Send + 'static> BoundedBuffer<T> {
    /// Like `put`, but gives up with `PutError::Interrupted` once `interrupt`
    /// is raised. The buffer is left exactly as it was.
    pub fn put_interruptible(&self, item: T, interrupt: &Interrupt) -> Result<(), PutError<T>> {
        let _armed = interrupt.arm(self.wake_target());
        self.put_inner(item, Wait::Forever, Some(interrupt))
    }

    pub fn take_interruptible(&self, interrupt: &Interrupt) -> Result<T, TakeError> {
        let _armed = interrupt.arm(self.wake_target());
        self.take_inner(Wait::Forever, Some(interrupt))
    }

    fn wake_target(&self) -> Weak<dyn WakeWaiters> {
        Arc::downgrade(&self.shared) as Weak<dyn WakeWaiters>
    }
}

impl<T> fmt::Debug for BoundedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("BoundedBuffer")
            .field("capacity", &state.ring.capacity())
            .field("len", &state.ring.len())
            .field("closed", &state.closed)
            .finish()
    }
}
