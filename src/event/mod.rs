/*! Timer scheduling.

Protocol engines in this crate never block and never spin. Everything they
wait for is expressed as a callback armed on a [Scheduler] for an absolute
point on a monotonic clock. The scheduler is free to fire a timer anywhere
in `[deadline, deadline + accuracy]`, and fires timers that are due at the
same moment in priority order (lower value first).

[EventLoop] is a single-threaded implementation driven by the caller: time
only moves when the owner calls [EventLoop::poll] with a new timestamp,
which also makes it a convenient simulated clock.
*/

use core::fmt;

use crate::time::{Duration, Instant};

mod event_loop;
mod timer_set;

pub use self::event_loop::EventLoop;
pub use self::timer_set::{TimerHandle, TimerStorage};

/// A one-shot timer callback. It is handed the time the timer fired at.
pub type Callback = Box<dyn FnOnce(Instant)>;

/// Error returned by [Scheduler] operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The timer storage is full.
    Exhausted,
    /// The handle does not refer to an armed timer.
    InvalidHandle,
    /// The clock has not been read yet.
    Clock,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Exhausted => write!(f, "timer storage exhausted"),
            Error::InvalidHandle => write!(f, "invalid timer handle"),
            Error::Clock => write!(f, "clock unavailable"),
        }
    }
}

impl std::error::Error for Error {}

/// A source of timer callbacks on a monotonic clock.
///
/// All methods take `&self`: a scheduler is shared between every client
/// attached to it, and callbacks it fires arm and cancel timers on the very
/// same scheduler.
pub trait Scheduler {
    /// The current time of the monotonic clock, as seen by the scheduler.
    fn now(&self) -> Result<Instant, Error>;

    /// Arm a one-shot timer firing no earlier than `at`.
    fn schedule_at(
        &self,
        at: Instant,
        accuracy: Duration,
        callback: Callback,
    ) -> Result<TimerHandle, Error>;

    /// Change the dispatch priority of an armed timer.
    fn set_priority(&self, handle: TimerHandle, priority: i64) -> Result<(), Error>;

    /// Disarm a timer. Unknown or already fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}
