//! Keeps the image stream alive.
//!
//! The supervisor thread polls the stream's liveness and, when the receive
//! thread has died, closes the channel and starts it again. It never sees the
//! errors that ended the stream; those are logged by the receive thread.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::error::{ClientError, Result};
use crate::image::ImageChannel;

/// What the supervisor needs from a stream.
pub trait StreamLink: Send + 'static {
    /// Whether the receive side is still running.
    fn is_alive(&self) -> bool;
    /// Release the dead connection.
    fn close(&mut self);
    /// Open a new connection; `false` when the device is unreachable.
    fn start(&mut self) -> bool;
}

impl StreamLink for ImageChannel {
    fn is_alive(&self) -> bool {
        self.status()
    }

    fn close(&mut self) {
        ImageChannel::close(self);
    }

    fn start(&mut self) -> bool {
        ImageChannel::start(self)
    }
}

/// Outcome of one supervision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Alive,
    Reconnected,
    Retrying { attempt: u32 },
}

/// Reconnect policy, separate from the thread so it can be driven directly.
#[derive(Debug)]
pub struct Reconnector {
    config: SupervisorConfig,
    failures: u32,
    reconnects: u64,
}

impl Reconnector {
    pub fn new(config: SupervisorConfig) -> Self {
        Self {
            config,
            failures: 0,
            reconnects: 0,
        }
    }

    /// Check the link once, reconnecting it if it is dead.
    pub fn tick<L: StreamLink + ?Sized>(&mut self, link: &mut L) -> Tick {
        if link.is_alive() {
            self.failures = 0;
            return Tick::Alive;
        }

        link.close();
        if link.start() {
            self.reconnects += 1;
            info!(
                after_failures = self.failures,
                reconnects = self.reconnects,
                "image stream reconnected"
            );
            self.failures = 0;
            return Tick::Reconnected;
        }

        self.failures = self.failures.saturating_add(1);
        if self.failures % self.config.display_interval.max(1) == 0 {
            warn!(attempt = self.failures, "camera still unreachable, retrying");
        } else {
            debug!(attempt = self.failures, "reconnect attempt failed");
        }
        Tick::Retrying {
            attempt: self.failures,
        }
    }

    /// Wait before the next tick: the poll interval, doubled for each
    /// consecutive failure and capped at `max_backoff`.
    pub fn next_delay(&self) -> Duration {
        let poll = self.config.poll_interval;
        if self.failures == 0 {
            return poll;
        }
        let factor = 1u32 << self.failures.min(16);
        poll.saturating_mul(factor)
            .min(self.config.max_backoff)
            .max(poll)
    }

    /// Consecutive failed attempts since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Successful reconnects so far.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }
}

/// Handle to a running supervisor thread.
#[derive(Debug)]
pub struct Supervisor {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Supervisor {
    /// Start supervising `link` on a background thread.
    pub fn spawn<L: StreamLink>(link: Arc<Mutex<L>>, config: SupervisorConfig) -> Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("camwire-supervisor".to_string())
            .spawn(move || supervise(&link, config, &stop_rx))
            .map_err(|source| ClientError::Spawn {
                name: "supervisor",
                source,
            })?;

        debug!("supervisor started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the thread and wait for it. Returns as soon as any in-progress
    /// tick completes. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("supervisor thread panicked");
            }
            debug!("supervisor stopped");
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn supervise<L: StreamLink>(link: &Mutex<L>, config: SupervisorConfig, stop: &Receiver<()>) {
    let mut reconnector = Reconnector::new(config);
    loop {
        match stop.recv_timeout(reconnector.next_delay()) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
        let mut link = lock(link);
        reconnector.tick(&mut *link);
    }
}

/// Lock, recovering the data if a holder panicked.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
