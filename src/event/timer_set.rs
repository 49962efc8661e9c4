use core::fmt;
use managed::ManagedSlice;

use super::{Callback, Error};
use crate::time::{Duration, Instant};

/// Opaque struct with space for storing one timer.
///
/// This is public so you can use it to allocate space for storing
/// timers when creating an `EventLoop`.
#[derive(Debug, Default)]
pub struct TimerStorage {
    generation: u32,
    inner: Option<Item>,
}

impl TimerStorage {
    pub const EMPTY: Self = Self {
        generation: 0,
        inner: None,
    };
}

/// Scheduling metadata of an armed timer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Meta {
    pub(crate) handle: TimerHandle,
    pub(crate) deadline: Instant,
    pub(crate) accuracy: Duration,
    pub(crate) priority: i64,
    pub(crate) sequence: u64,
}

impl Meta {
    /// Latest instant at which the timer may fire without violating its accuracy.
    pub(crate) fn latest(&self) -> Instant {
        self.deadline + self.accuracy
    }

    fn order_key(&self) -> (Instant, i64, u64) {
        (self.deadline, self.priority, self.sequence)
    }
}

/// An item of a timer set.
pub(crate) struct Item {
    pub(crate) meta: Meta,
    pub(crate) callback: Callback,
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Item").field("meta", &self.meta).finish()
    }
}

/// A handle, identifying an armed timer.
///
/// Handles carry the generation of their slot, so a handle kept after its
/// timer fired or was cancelled never refers to a timer armed later in the
/// same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerHandle {
    index: usize,
    generation: u32,
}

impl fmt::Display for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// An extensible set of timers.
#[derive(Debug)]
pub(crate) struct TimerSet<'a> {
    timers: ManagedSlice<'a, TimerStorage>,
}

impl<'a> TimerSet<'a> {
    /// Create a timer set using the provided storage.
    pub(crate) fn new<TimersT>(timers: TimersT) -> TimerSet<'a>
    where
        TimersT: Into<ManagedSlice<'a, TimerStorage>>,
    {
        TimerSet {
            timers: timers.into(),
        }
    }

    /// Arm a timer and return its handle.
    ///
    /// Fails with `Error::Exhausted` if the storage is fixed-size and full.
    pub(crate) fn add(
        &mut self,
        deadline: Instant,
        accuracy: Duration,
        sequence: u64,
        callback: Callback,
    ) -> Result<TimerHandle, Error> {
        fn put(index: usize, slot: &mut TimerStorage, item: (Instant, Duration, u64, Callback)) -> TimerHandle {
            let (deadline, accuracy, sequence, callback) = item;
            slot.generation = slot.generation.wrapping_add(1);
            let handle = TimerHandle {
                index,
                generation: slot.generation,
            };
            net_trace!("[{}]: arming for {}", handle, deadline);
            slot.inner = Some(Item {
                meta: Meta {
                    handle,
                    deadline,
                    accuracy,
                    priority: 0,
                    sequence,
                },
                callback,
            });
            handle
        }

        let item = (deadline, accuracy, sequence, callback);

        for (index, slot) in self.timers.iter_mut().enumerate() {
            if slot.inner.is_none() {
                return Ok(put(index, slot, item));
            }
        }

        match self.timers {
            ManagedSlice::Borrowed(_) => Err(Error::Exhausted),
            ManagedSlice::Owned(ref mut timers) => {
                timers.push(TimerStorage::EMPTY);
                let index = timers.len() - 1;
                Ok(put(index, &mut timers[index], item))
            }
        }
    }

    /// Get an armed timer by its handle.
    pub(crate) fn get_mut(&mut self, handle: TimerHandle) -> Option<&mut Item> {
        match self.timers.get_mut(handle.index) {
            Some(slot) if slot.generation == handle.generation => slot.inner.as_mut(),
            _ => None,
        }
    }

    /// Disarm a timer, handing back its item.
    pub(crate) fn remove(&mut self, handle: TimerHandle) -> Option<Item> {
        match self.timers.get_mut(handle.index) {
            Some(slot) if slot.generation == handle.generation => {
                net_trace!("[{}]: removing", handle);
                slot.inner.take()
            }
            _ => None,
        }
    }

    /// The handle of the timer that should fire first among those due at `now`
    /// and armed before sequence number `armed_before`.
    ///
    /// Earlier deadlines win, then lower priority values, then arming order.
    pub(crate) fn next_due(&self, now: Instant, armed_before: u64) -> Option<TimerHandle> {
        self.items()
            .filter(|item| item.meta.deadline <= now && item.meta.sequence < armed_before)
            .min_by_key(|item| item.meta.order_key())
            .map(|item| item.meta.handle)
    }

    /// The latest instant the owner may sleep until without firing any timer late.
    pub(crate) fn poll_at(&self) -> Option<Instant> {
        self.items().map(|item| item.meta.latest()).min()
    }

    /// Number of armed timers.
    pub(crate) fn len(&self) -> usize {
        self.items().count()
    }

    /// Iterate every armed timer in this set.
    pub(crate) fn items(&self) -> impl Iterator<Item = &Item> + '_ {
        self.timers.iter().filter_map(|x| x.inner.as_ref())
    }
}
