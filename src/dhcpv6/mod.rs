/*! DHCPv6 client engine.

The [Client] negotiates a lease for one interface. It owns no sockets and
never blocks: everything it waits for is a timer armed on a
[Scheduler](crate::event::Scheduler), and everything it has to report is
delivered to a user callback as an [Event].

```
use std::rc::Rc;
use smoldhcp::dhcpv6::{Client, Event};
use smoldhcp::event::EventLoop;
use smoldhcp::time::Instant;

let event_loop = Rc::new(EventLoop::new(vec![]));
let client = Client::new(&[0x42u8; 16]).unwrap();
client.set_index(2).unwrap();
client.attach_scheduler(Some(event_loop.clone()), 0).unwrap();
client.set_callback(|_client, event| {
    if let Event::Error(err) = event {
        eprintln!("DHCPv6 client stopped: {}", err);
    }
});
client.start().unwrap();

event_loop.poll(Instant::from_millis(0));
```
*/

use core::cell::RefCell;
use core::fmt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::rc::{Rc, Weak};

use crate::event::{self, EventLoop, Scheduler, TimerHandle};
use crate::time::{Duration, Instant};
use crate::wire::dhcpv6::{Duid, OPT_IA_NA};
use crate::wire::EthernetAddress;

mod identity;
mod retransmit;

pub use self::identity::{
    derive_duid, derive_iaid, parse_machine_id, DeviceNaming, InterfaceName, MachineIdFile,
    MachineIdSource, NamingError, Virtualization, HASH_KEY, IFNAMSIZ,
};
pub use self::retransmit::{compute_random, RetryConfig, EXPIRE_ACCURACY, RESEND_ACCURACY};

use self::retransmit::Retransmit;

/// Error returned by client operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An argument is out of range, or a precondition of the call is not met.
    InvalidArgument,
    /// The interface is not set up yet. The call may succeed later.
    NotReady,
    /// A required resource does not exist.
    NotFound,
    /// A scheduler is already attached.
    AlreadyAttached,
    /// The scheduler refused to arm a timer.
    Scheduler(event::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::NotReady => write!(f, "interface not ready"),
            Error::NotFound => write!(f, "not found"),
            Error::AlreadyAttached => write!(f, "scheduler already attached"),
            Error::Scheduler(err) => write!(f, "scheduling failed: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<event::Error> for Error {
    fn from(err: event::Error) -> Self {
        Error::Scheduler(err)
    }
}

/// Terminal events reported through the client callback.
///
/// The client is back in the stopped state by the time any of these is
/// delivered, or will be as soon as the callback returns.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The client was stopped by its owner.
    Stop,
    /// The maximum retransmission count was reached.
    RetransmitMax,
    /// The maximum retransmission duration elapsed.
    ResendExpire,
    /// Arming a timer failed.
    Error(Error),
}

impl From<event::Error> for Event {
    fn from(err: event::Error) -> Self {
        Event::Error(Error::Scheduler(err))
    }
}

impl From<Error> for Event {
    fn from(err: Error) -> Self {
        Event::Error(err)
    }
}

/// State of the client.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Stopped,
    /// Looking for a server.
    Solicitation,
    /// Soliciting routers. Nothing is retransmitted in this state.
    RouterSolicitation,
}

/// Callback invoked with terminal events.
pub type Callback = Box<dyn FnMut(&Client, Event)>;

/// Identity association for non-temporary addresses.
#[derive(Debug)]
struct IaNa {
    option_code: u16,
    /// `None` until derived; any 32-bit value, zero included, is a valid IAID.
    iaid: Option<u32>,
    timeout_t1: Option<TimerHandle>,
    timeout_t2: Option<TimerHandle>,
}

struct Inner {
    state: State,
    scheduler: Option<Rc<dyn Scheduler>>,
    priority: i64,
    ifindex: i32,
    mac: EthernetAddress,
    ia_na: IaNa,
    retransmit: Retransmit,
    retry_config: RetryConfig,
    duid: Duid,

    callback: Option<Callback>,
    /// Bumped whenever the callback is replaced, so a callback taken out
    /// for the duration of a notification is not put back over a newer one.
    callback_epoch: u64,

    naming: Option<Box<dyn DeviceNaming>>,
    virtualization: Option<Box<dyn Virtualization>>,
    rng: StdRng,
}

impl fmt::Debug for Inner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Inner")
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("ifindex", &self.ifindex)
            .field("mac", &self.mac)
            .field("ia_na", &self.ia_na)
            .field("retransmit", &self.retransmit)
            .field("retry_config", &self.retry_config)
            .field("duid", &self.duid)
            .field("scheduler", &self.scheduler.is_some())
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Inner {
    /// Drop all exchange state and disarm every timer.
    fn initialize(&mut self) {
        let timers = [self.ia_na.timeout_t1.take(), self.ia_na.timeout_t2.take()];
        let resend_timers = self.retransmit.reset();

        if let Some(scheduler) = &self.scheduler {
            for handle in timers.into_iter().chain(resend_timers).flatten() {
                scheduler.cancel(handle);
            }
        }

        self.state = State::Stopped;
    }

    fn ensure_iaid(&mut self) -> Result<(), Error> {
        if self.ia_na.iaid.is_some() {
            return Ok(());
        }

        let iaid = identity::resolve_iaid(
            self.ifindex,
            &self.mac,
            self.naming.as_deref(),
            self.virtualization.as_deref(),
        )?;
        self.ia_na.iaid = Some(iaid);
        Ok(())
    }

    fn scheduler(&self) -> Result<Rc<dyn Scheduler>, Error> {
        self.scheduler.clone().ok_or(Error::InvalidArgument)
    }

    fn arm(
        &self,
        scheduler: &dyn Scheduler,
        at: Instant,
        accuracy: Duration,
        callback: event::Callback,
    ) -> Result<TimerHandle, event::Error> {
        let handle = scheduler.schedule_at(at, accuracy, callback)?;
        if let Err(err) = scheduler.set_priority(handle, self.priority) {
            scheduler.cancel(handle);
            return Err(err);
        }
        Ok(handle)
    }

    fn start(&mut self, client: Weak<RefCell<Inner>>) -> Result<(), Error> {
        let scheduler = self.scheduler()?;

        self.state = State::Solicitation;

        match self.arm(&*scheduler, Instant::ZERO, Duration::ZERO, on_resend(client)) {
            Ok(handle) => {
                self.retransmit.resend = Some(handle);
                net_debug!("DHCPv6 client started on interface {}", self.ifindex);
                Ok(())
            }
            Err(err) => {
                self.initialize();
                Err(err.into())
            }
        }
    }

    /// Handle expiry of the resend timer. An `Err` means the client must stop
    /// and report the event.
    fn resend(&mut self, client: Weak<RefCell<Inner>>) -> Result<(), Event> {
        let config = match self.state {
            State::Solicitation => self.retry_config,
            State::Stopped | State::RouterSolicitation => return Ok(()),
        };

        if config.max_count != 0 && self.retransmit.count >= config.max_count {
            net_debug!(
                "DHCPv6 giving up after {} retransmissions",
                self.retransmit.count
            );
            return Err(Event::RetransmitMax);
        }

        let scheduler = self.scheduler()?;
        let now = scheduler.now()?;

        let time = self.retransmit.advance(&config, &mut self.rng);
        net_debug!("DHCPv6 next retransmission in {}", time);

        let handle = self.arm(&*scheduler, now + time, RESEND_ACCURACY, on_resend(client.clone()))?;
        self.retransmit.resend = Some(handle);
        self.retransmit.count = self.retransmit.count.saturating_add(1);

        if !config.max_duration.is_zero() && self.retransmit.resend_expire.is_none() {
            net_debug!(
                "DHCPv6 max retransmission duration {} secs",
                config.max_duration.secs()
            );

            let handle = self.arm(
                &*scheduler,
                now + config.max_duration,
                EXPIRE_ACCURACY,
                on_resend_expire(client),
            )?;
            self.retransmit.resend_expire = Some(handle);
        }

        Ok(())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.initialize();
        self.scheduler = None;
    }
}

fn on_resend(client: Weak<RefCell<Inner>>) -> event::Callback {
    Box::new(move |_| {
        if let Some(inner) = client.upgrade() {
            Client { inner }.timeout_resend();
        }
    })
}

fn on_resend_expire(client: Weak<RefCell<Inner>>) -> event::Callback {
    Box::new(move |_| {
        if let Some(inner) = client.upgrade() {
            Client { inner }.timeout_resend_expire();
        }
    })
}

/// A reference counted DHCPv6 client.
///
/// Cloning the handle takes another reference to the same client. When the
/// last handle is dropped, the client disarms its timers and releases its
/// scheduler. Armed timers only hold weak references, so they do not keep a
/// client alive.
#[derive(Clone)]
pub struct Client {
    inner: Rc<RefCell<Inner>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f.debug_tuple("Client").field(&*inner).finish(),
            Err(_) => f.write_str("Client(<busy>)"),
        }
    }
}

impl Client {
    /// Create a client, deriving its DUID from the machine id.
    pub fn new<M: MachineIdSource + ?Sized>(machine: &M) -> Result<Client, Error> {
        let machine_id = machine.machine_id()?;

        let inner = Inner {
            state: State::Stopped,
            scheduler: None,
            priority: 0,
            ifindex: -1,
            mac: EthernetAddress::default(),
            ia_na: IaNa {
                option_code: OPT_IA_NA,
                iaid: None,
                timeout_t1: None,
                timeout_t2: None,
            },
            retransmit: Retransmit::default(),
            retry_config: RetryConfig::default(),
            duid: identity::derive_duid(&machine_id),
            callback: None,
            callback_epoch: 0,
            naming: None,
            virtualization: None,
            rng: StdRng::from_entropy(),
        };

        Ok(Client {
            inner: Rc::new(RefCell::new(inner)),
        })
    }

    /// Set the callback receiving terminal events, replacing any previous one.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: FnMut(&Client, Event) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        inner.callback = Some(Box::new(callback));
        inner.callback_epoch += 1;
    }

    /// Remove the callback. Events are silently dropped afterwards.
    pub fn clear_callback(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.callback = None;
        inner.callback_epoch += 1;
    }

    /// Set the interface index. `-1` means unset.
    pub fn set_index(&self, ifindex: i32) -> Result<(), Error> {
        if ifindex < -1 {
            return Err(Error::InvalidArgument);
        }
        self.inner.borrow_mut().ifindex = ifindex;
        Ok(())
    }

    /// Set the MAC address, used to derive the IAID when the interface has
    /// no stable name. `None` clears it.
    pub fn set_mac(&self, mac: Option<EthernetAddress>) {
        self.inner.borrow_mut().mac = mac.unwrap_or_default();
    }

    pub fn set_retry_config(&self, config: RetryConfig) {
        self.inner.borrow_mut().retry_config = config;
    }

    pub fn set_device_naming<N: DeviceNaming + 'static>(&self, naming: N) {
        self.inner.borrow_mut().naming = Some(Box::new(naming));
    }

    pub fn set_virtualization<V: Virtualization + 'static>(&self, virtualization: V) {
        self.inner.borrow_mut().virtualization = Some(Box::new(virtualization));
    }

    /// Attach the client to a scheduler, or to the default event loop of the
    /// current thread when `None` is given. Timers are armed with `priority`.
    pub fn attach_scheduler(
        &self,
        scheduler: Option<Rc<dyn Scheduler>>,
        priority: i64,
    ) -> Result<(), Error> {
        let mut inner = self.inner.borrow_mut();
        if inner.scheduler.is_some() {
            return Err(Error::AlreadyAttached);
        }

        let scheduler: Rc<dyn Scheduler> = match scheduler {
            Some(scheduler) => scheduler,
            None => EventLoop::default_instance(),
        };
        inner.scheduler = Some(scheduler);
        inner.priority = priority;
        Ok(())
    }

    /// Release the scheduler. A running client is stopped without
    /// notification, since it cannot make progress without timers.
    pub fn detach_scheduler(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.initialize();
        inner.scheduler = None;
    }

    pub fn scheduler(&self) -> Option<Rc<dyn Scheduler>> {
        self.inner.borrow().scheduler.clone()
    }

    /// Start soliciting, abandoning any exchange in progress.
    ///
    /// Requires an attached scheduler and an interface index above zero.
    /// Fails without side effects when the IAID cannot be derived yet, so
    /// a running exchange is left alone in that case.
    pub fn start(&self) -> Result<(), Error> {
        let weak = Rc::downgrade(&self.inner);
        let mut inner = self.inner.borrow_mut();

        if inner.scheduler.is_none() || inner.ifindex <= 0 {
            return Err(Error::InvalidArgument);
        }

        inner.ensure_iaid()?;
        inner.initialize();
        inner.start(weak)
    }

    /// Same as [start](#method.start).
    pub fn restart(&self) -> Result<(), Error> {
        self.start()
    }

    /// Stop the client, reporting [Event::Stop].
    pub fn stop(&self) {
        self.stop_with(Event::Stop);
    }

    /// Return to the stopped state, disarming all timers, without notifying.
    pub fn reinitialize(&self) {
        self.inner.borrow_mut().initialize();
    }

    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    pub fn duid(&self) -> Duid {
        self.inner.borrow().duid
    }

    /// The IAID, once it has been derived by the first start.
    pub fn iaid(&self) -> Option<u32> {
        self.inner.borrow().ia_na.iaid
    }

    /// Option code of the identity association the lease is negotiated for.
    pub fn ia_option_code(&self) -> u16 {
        self.inner.borrow().ia_na.option_code
    }

    pub fn retransmit_time(&self) -> Duration {
        self.inner.borrow().retransmit.time
    }

    pub fn retransmit_count(&self) -> u8 {
        self.inner.borrow().retransmit.count
    }

    /// Number of timers the client currently holds.
    pub fn pending_timers(&self) -> usize {
        let inner = self.inner.borrow();
        [
            inner.retransmit.resend,
            inner.retransmit.resend_expire,
            inner.ia_na.timeout_t1,
            inner.ia_na.timeout_t2,
        ]
        .iter()
        .filter(|t| t.is_some())
        .count()
    }

    fn stop_with(&self, event: Event) {
        net_debug!("DHCPv6 client stopping: {:?}", event);
        self.notify(event);
        self.inner.borrow_mut().initialize();
    }

    /// Run the callback with `event`. The callback may drop every handle it
    /// can reach, so a local one is held until it returns.
    fn notify(&self, event: Event) {
        let client = self.clone();

        let (callback, epoch) = {
            let mut inner = client.inner.borrow_mut();
            (inner.callback.take(), inner.callback_epoch)
        };

        if let Some(mut callback) = callback {
            callback(&client, event);

            let mut inner = client.inner.borrow_mut();
            if inner.callback_epoch == epoch {
                inner.callback = Some(callback);
            }
        }
    }

    fn timeout_resend(&self) {
        let weak = Rc::downgrade(&self.inner);
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.retransmit.resend = None;
            inner.resend(weak)
        };

        if let Err(event) = result {
            self.stop_with(event);
        }
    }

    fn timeout_resend_expire(&self) {
        self.inner.borrow_mut().retransmit.resend_expire = None;
        self.stop_with(Event::ResendExpire);
    }
}
