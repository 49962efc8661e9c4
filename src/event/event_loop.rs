use core::cell::RefCell;
use managed::ManagedSlice;
use std::rc::{Rc, Weak};

use super::timer_set::{TimerSet, TimerStorage};
use super::{Callback, Error, Scheduler, TimerHandle};
use crate::time::{Duration, Instant};

std::thread_local! {
    static DEFAULT_LOOP: RefCell<Weak<EventLoop<'static>>> = RefCell::new(Weak::new());
}

#[derive(Debug)]
struct Inner<'a> {
    now: Option<Instant>,
    timers: TimerSet<'a>,
    sequence: u64,
}

/// A single-threaded timer loop.
///
/// The loop does not read any clock on its own. The owner calls
/// [poll](#method.poll) with the current timestamp, and every timer whose
/// deadline has passed fires from within that call.
#[derive(Debug)]
pub struct EventLoop<'a> {
    inner: RefCell<Inner<'a>>,
}

impl<'a> EventLoop<'a> {
    /// Create a loop keeping its timers in the provided storage.
    pub fn new<TimersT>(timers: TimersT) -> EventLoop<'a>
    where
        TimersT: Into<ManagedSlice<'a, TimerStorage>>,
    {
        EventLoop {
            inner: RefCell::new(Inner {
                now: None,
                timers: TimerSet::new(timers),
                sequence: 0,
            }),
        }
    }

    /// Return the earliest time at which the loop should be polled again,
    /// or `None` when no timer is armed.
    pub fn poll_at(&self) -> Option<Instant> {
        self.inner.borrow().timers.poll_at()
    }

    /// Return how long the owner may sleep after `timestamp` before polling.
    ///
    /// A return value of `Some(Duration::ZERO)` means a timer is already due.
    pub fn poll_delay(&self, timestamp: Instant) -> Option<Duration> {
        match self.poll_at() {
            Some(at) if timestamp < at => Some(at - timestamp),
            Some(_) => Some(Duration::ZERO),
            None => None,
        }
    }

    /// Advance the clock to `timestamp` and fire every due timer.
    ///
    /// Timers armed by a callback during this call wait for the next one,
    /// even if their deadline has already passed. The clock never goes
    /// backwards: an older timestamp is ignored. Returns the number of
    /// callbacks run.
    pub fn poll(&self, timestamp: Instant) -> usize {
        let (now, armed_before) = {
            let mut inner = self.inner.borrow_mut();
            let now = match inner.now {
                Some(now) if now > timestamp => now,
                _ => timestamp,
            };
            inner.now = Some(now);
            (now, inner.sequence)
        };

        let mut fired = 0;
        while self.dispatch_one(now, armed_before) {
            fired += 1;
        }
        fired
    }

    /// Fire the single next timer due at `now`, if any.
    fn dispatch_one(&self, now: Instant, armed_before: u64) -> bool {
        // The borrow must be released before the callback runs, since the
        // callback is expected to arm or cancel timers on this loop.
        let item = {
            let mut inner = self.inner.borrow_mut();
            match inner.timers.next_due(now, armed_before) {
                Some(handle) => inner.timers.remove(handle),
                None => None,
            }
        };

        match item {
            Some(item) => {
                net_trace!(
                    "{}: firing timer {} (deadline {})",
                    now,
                    item.meta.handle,
                    item.meta.deadline
                );
                (item.callback)(now);
                true
            }
            None => false,
        }
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.inner.borrow().timers.len()
    }
}

impl EventLoop<'static> {
    /// Return the loop shared by everything on the current thread, creating it
    /// on first use. It is dropped once the last reference goes away.
    pub fn default_instance() -> Rc<EventLoop<'static>> {
        DEFAULT_LOOP.with(|slot| {
            let mut slot = slot.borrow_mut();
            match slot.upgrade() {
                Some(event_loop) => event_loop,
                None => {
                    net_debug!("creating default event loop");
                    let event_loop = Rc::new(EventLoop::new(Vec::new()));
                    *slot = Rc::downgrade(&event_loop);
                    event_loop
                }
            }
        })
    }
}

impl<'a> Scheduler for EventLoop<'a> {
    fn now(&self) -> Result<Instant, Error> {
        self.inner.borrow().now.ok_or(Error::Clock)
    }

    fn schedule_at(
        &self,
        at: Instant,
        accuracy: Duration,
        callback: Callback,
    ) -> Result<TimerHandle, Error> {
        let mut inner = self.inner.borrow_mut();
        let sequence = inner.sequence;
        inner.sequence += 1;
        inner.timers.add(at, accuracy, sequence, callback)
    }

    fn set_priority(&self, handle: TimerHandle, priority: i64) -> Result<(), Error> {
        match self.inner.borrow_mut().timers.get_mut(handle) {
            Some(item) => {
                item.meta.priority = priority;
                Ok(())
            }
            None => Err(Error::InvalidHandle),
        }
    }

    fn cancel(&self, handle: TimerHandle) {
        // Dropping the callback may release the last reference to whatever it
        // captured, so do it outside the borrow.
        let item = self.inner.borrow_mut().timers.remove(handle);
        drop(item);
    }
}
