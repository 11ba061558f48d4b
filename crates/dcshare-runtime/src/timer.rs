//! Periodic Timer Service
//!
//! Owns one background thread that fires a Second event every
//! `tick_interval_ms` and a Minute event every `minute_every` Seconds. Both
//! carry the millisecond tick at which they fired. Subscribers are plain
//! closures registered per channel.
//!
//! The thread waits on a shutdown gate with a timeout equal to the time left
//! until the next deadline. A timeout is the normal path; a message (or the
//! sender going away) ends the loop. `shutdown` is idempotent and joins the
//! thread.

use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use dcshare_core::{DcError, DcResult, MonotonicTicks, TickSource, TimerConfig};
use tracing::{debug, error, info, warn};

const THREAD_NAME: &str = "dcshare-timer";

// ----------------------------------------------------------------------------
// Channels and Listeners
// ----------------------------------------------------------------------------

/// The two event streams a timer publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerChannel {
    Second,
    Minute,
}

impl fmt::Display for TimerChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerChannel::Second => f.write_str("second"),
            TimerChannel::Minute => f.write_str("minute"),
        }
    }
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type Handler = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct Registry {
    second: Vec<(ListenerId, Handler)>,
    minute: Vec<(ListenerId, Handler)>,
}

impl Registry {
    fn channel_mut(&mut self, channel: TimerChannel) -> &mut Vec<(ListenerId, Handler)> {
        match channel {
            TimerChannel::Second => &mut self.second,
            TimerChannel::Minute => &mut self.minute,
        }
    }

    fn channel(&self, channel: TimerChannel) -> &[(ListenerId, Handler)] {
        match channel {
            TimerChannel::Second => &self.second,
            TimerChannel::Minute => &self.minute,
        }
    }

    fn snapshot(&self, channel: TimerChannel) -> Vec<Handler> {
        self.channel(channel)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }
}

/// State shared between the service handle and its thread
struct Shared {
    ticks: Arc<dyn TickSource>,
    listeners: Mutex<Registry>,
    next_id: AtomicU64,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        lock(&self.listeners)
    }

    /// Call every listener of `channel`, outside the registry lock
    fn dispatch(&self, channel: TimerChannel, tick: u64) {
        let handlers = self.registry().snapshot(channel);
        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(tick))).is_err() {
                error!("Timer {} listener panicked at tick {}", channel, tick);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Timer Service
// ----------------------------------------------------------------------------

/// Background timer publishing Second and Minute events
///
/// All listeners must be unsubscribed before the service is dropped; debug
/// builds assert this.
pub struct TimerService {
    shared: Arc<Shared>,
    gate: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl TimerService {
    /// Start a timer driven by the monotonic clock
    pub fn start(config: TimerConfig) -> DcResult<Self> {
        Self::with_tick_source(config, Arc::new(MonotonicTicks::new()))
    }

    /// Start a timer that reports ticks from `ticks`
    ///
    /// Firing is always paced by the monotonic clock; `ticks` only supplies
    /// the value passed to listeners.
    pub fn with_tick_source(config: TimerConfig, ticks: Arc<dyn TickSource>) -> DcResult<Self> {
        config.validate()?;

        // Pin the start of the tick source before the first deadline
        ticks.tick();

        let shared = Arc::new(Shared {
            ticks,
            listeners: Mutex::new(Registry::default()),
            next_id: AtomicU64::new(1),
        });
        let (gate_tx, gate_rx) = mpsc::channel();

        info!(
            "Starting timer service ({} ms interval, minute every {} ticks)",
            config.tick_interval_ms, config.minute_every
        );

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_loop(thread_shared, gate_rx, config))
            .map_err(|e| DcError::timer_error(format!("failed to spawn timer thread: {e}")))?;

        Ok(Self {
            shared,
            gate: Mutex::new(Some(gate_tx)),
            thread_id: handle.thread().id(),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Milliseconds since the tick source started; never decreases
    pub fn tick(&self) -> u64 {
        self.shared.ticks.tick()
    }

    /// Whether the background thread has not yet been told to stop
    pub fn is_running(&self) -> bool {
        lock(&self.gate).is_some()
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    /// Register `handler` on `channel`
    pub fn subscribe<F>(&self, channel: TimerChannel, handler: F) -> ListenerId
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        self.shared
            .registry()
            .channel_mut(channel)
            .push((id, Arc::new(handler)));
        debug!("Subscribed {} to {} events", id, channel);
        id
    }

    /// Remove a listener; returns false if it was not registered on `channel`
    pub fn unsubscribe(&self, channel: TimerChannel, id: ListenerId) -> bool {
        let mut registry = self.shared.registry();
        let listeners = registry.channel_mut(channel);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;
        if removed {
            debug!("Unsubscribed {} from {} events", id, channel);
        }
        removed
    }

    pub fn subscribe_second<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.subscribe(TimerChannel::Second, handler)
    }

    pub fn subscribe_minute<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.subscribe(TimerChannel::Minute, handler)
    }

    pub fn unsubscribe_second(&self, id: ListenerId) -> bool {
        self.unsubscribe(TimerChannel::Second, id)
    }

    pub fn unsubscribe_minute(&self, id: ListenerId) -> bool {
        self.unsubscribe(TimerChannel::Minute, id)
    }

    /// Number of listeners across both channels
    pub fn listener_count(&self) -> usize {
        let registry = self.shared.registry();
        registry.second.len() + registry.minute.len()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Stop the background thread and wait for it to finish
    ///
    /// Safe to call more than once. When called from a listener (that is, on
    /// the timer thread itself) the loop is told to stop but not joined.
    pub fn shutdown(&self) {
        if let Some(gate) = lock(&self.gate).take() {
            debug!("Timer shutdown requested");
            // The loop also exits when the sender is dropped
            let _ = gate.send(());
        }

        if thread::current().id() == self.thread_id {
            return;
        }

        let mut handle = lock(&self.handle);
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                error!("Timer thread terminated abnormally");
            }
            info!("Timer service stopped");
        }
    }
}

impl fmt::Debug for TimerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerService")
            .field("running", &self.is_running())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Drop for TimerService {
    fn drop(&mut self) {
        self.shutdown();
        if !thread::panicking() {
            debug_assert_eq!(
                self.listener_count(),
                0,
                "timer service dropped with listeners still subscribed"
            );
        }
    }
}

// ----------------------------------------------------------------------------
// Timer Loop
// ----------------------------------------------------------------------------

fn run_loop(shared: Arc<Shared>, gate: Receiver<()>, config: TimerConfig) {
    let interval = config.tick_interval();
    let mut minutes = RolloverCounter::new(config.minute_every);
    let mut deadline = Instant::now() + interval;

    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match gate.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let tick = shared.ticks.tick();
        let (next, clamped) = next_deadline(deadline, interval, Instant::now());
        if clamped {
            warn!("Timer fell behind at tick {}, skipping missed intervals", tick);
        }
        deadline = next;

        shared.dispatch(TimerChannel::Second, tick);
        if minutes.advance() {
            shared.dispatch(TimerChannel::Minute, tick);
        }
    }

    debug!("Timer loop exited");
}

/// Advance `previous` by one interval, clamping to `now` if that is already past
///
/// Returns the new deadline and whether it was clamped.
fn next_deadline(previous: Instant, interval: Duration, now: Instant) -> (Instant, bool) {
    let next = previous + interval;
    if next < now {
        (now, true)
    } else {
        (next, false)
    }
}

/// Counts Second events and reports every `every`-th one
#[derive(Debug, Clone)]
struct RolloverCounter {
    every: u32,
    count: u32,
}

impl RolloverCounter {
    fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            count: 0,
        }
    }

    /// Count one event; true when the count wraps
    fn advance(&mut self) -> bool {
        self.count += 1;
        if self.count >= self.every {
            self.count = 0;
            true
        } else {
            false
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
