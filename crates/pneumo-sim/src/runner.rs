//! Real-time simulation worker and its control handle.
//!
//! The worker owns the [`Physics`] state on a dedicated thread driving a
//! current-thread tokio runtime. Commands and configuration patches are
//! recorded in shared control state and picked up at the next tick boundary,
//! so a step is never interrupted half way. Every accepted tick publishes a
//! snapshot to the [`StateBus`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::bus::StateBus;
use crate::config::{ConfigPatch, SimulationConfig};
use crate::control::{Command, LoopState};
use crate::error::{Error, Result};
use crate::physics::Physics;
use crate::snapshot::{Fault, StateSnapshot};

/// How long [`SimulationLoop::stop`] waits for the worker by default.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Wall-clock period between worker wakeups.
const FRAME_PERIOD: Duration = Duration::from_millis(5);

/// Ticks run per wakeup at most; any backlog beyond is dropped.
const MAX_TICKS_PER_FRAME: f64 = 500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Wake,
    Shutdown,
}

#[derive(Debug)]
struct ControlState {
    mode: LoopState,
    pending_reset: bool,
    pending: Option<ConfigPatch>,
    /// Configuration with every accepted patch applied
    accepted: SimulationConfig,
}

#[derive(Debug)]
struct Shared {
    control: Mutex<ControlState>,
    /// Set by `stop`; the worker checks it between ticks
    cancelled: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handle to a running simulation worker.
///
/// Dropping the handle stops the worker.
#[derive(Debug)]
pub struct SimulationLoop {
    shared: Arc<Shared>,
    bus: Arc<StateBus>,
    signal_tx: mpsc::UnboundedSender<Signal>,
    ack_rx: std_mpsc::Receiver<()>,
    worker: Option<thread::JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl SimulationLoop {
    /// Validate `config`, build the initial state and start the worker in
    /// the stopped state. The initial snapshot is published immediately.
    pub fn spawn(config: SimulationConfig) -> Result<Self> {
        let physics = Physics::new(config.clone())?;
        let bus = Arc::new(StateBus::new());
        bus.publish(physics.snapshot());

        let shared = Arc::new(Shared {
            control: Mutex::new(ControlState {
                mode: LoopState::Stopped,
                pending_reset: false,
                pending: None,
                accepted: config,
            }),
            cancelled: AtomicBool::new(false),
        });
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (ack_tx, ack_rx) = std_mpsc::channel();

        let worker = Worker {
            physics,
            shared: Arc::clone(&shared),
            bus: Arc::clone(&bus),
            budget: 0.0,
            last_frame: Instant::now(),
        };
        let handle = thread::Builder::new()
            .name("pneumo-sim".into())
            .spawn(move || run_worker(worker, signal_rx, ack_tx))
            .map_err(|e| Error::WorkerSpawn(e.to_string()))?;

        info!("simulation worker spawned");
        Ok(Self {
            shared,
            bus,
            signal_tx,
            ack_rx,
            worker: Some(handle),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// Set how long [`stop`](Self::stop) waits for the worker.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Apply a lifecycle command. Returns the new state; an invalid
    /// transition leaves the state unchanged.
    pub fn control(&self, command: Command) -> Result<LoopState> {
        self.ensure_alive()?;
        let next = {
            let mut control = self.shared.lock();
            let next = control.mode.transition(command)?;
            if next != control.mode {
                info!(from = %control.mode, to = %next, %command, "loop state changed");
            }
            control.mode = next;
            if command == Command::Reset {
                control.pending_reset = true;
            }
            next
        };
        self.wake()?;
        Ok(next)
    }

    /// Validate `patch` against the latest accepted configuration and queue
    /// it for the next tick boundary. A rejected patch changes nothing.
    pub fn configure(&self, patch: ConfigPatch) -> Result<()> {
        self.ensure_alive()?;
        if patch.is_empty() {
            return Ok(());
        }
        {
            let mut control = self.shared.lock();
            let config = patch.apply(&control.accepted)?;
            control.accepted = config;
            control.pending = Some(match control.pending.take() {
                Some(queued) => queued.merge(patch),
                None => patch,
            });
        }
        debug!("configuration patch queued");
        self.wake()
    }

    /// Latest snapshot not yet consumed, if any.
    pub fn subscribe(&self) -> Option<Arc<StateSnapshot>> {
        self.bus.subscribe()
    }

    /// Shared handle to the state bus.
    pub fn bus(&self) -> Arc<StateBus> {
        Arc::clone(&self.bus)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LoopState {
        self.shared.lock().mode
    }

    /// Configuration with every accepted patch applied.
    pub fn config(&self) -> SimulationConfig {
        self.shared.lock().accepted.clone()
    }

    /// Whether the worker thread is still owned by this handle.
    pub fn is_alive(&self) -> bool {
        self.worker.is_some()
    }

    /// Signal the worker to exit and wait for it.
    ///
    /// Returns [`Error::ShutdownTimeout`] when the worker does not
    /// acknowledge in time; the thread is then detached.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.shared.cancelled.store(true, Ordering::Release);
        // A send error means the worker already exited.
        let _ = self.signal_tx.send(Signal::Shutdown);

        match self.ack_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(std_mpsc::RecvTimeoutError::Disconnected) => {
                worker.join().map_err(|_| Error::WorkerPanicked)?;
                info!("simulation worker stopped");
                Ok(())
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.shutdown_timeout, "simulation worker did not acknowledge shutdown");
                Err(Error::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.worker.is_some() {
            Ok(())
        } else {
            Err(Error::WorkerStopped)
        }
    }

    fn wake(&self) -> Result<()> {
        self.signal_tx
            .send(Signal::Wake)
            .map_err(|_| Error::WorkerStopped)
    }
}

impl Drop for SimulationLoop {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "failed to stop simulation worker");
        }
    }
}

fn run_worker(
    worker: Worker,
    signals: mpsc::UnboundedReceiver<Signal>,
    ack_tx: std_mpsc::Sender<()>,
) {
    match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime.block_on(worker.run(signals)),
        Err(e) => error!(error = %e, "failed to build worker runtime"),
    }
    let _ = ack_tx.send(());
}

struct Worker {
    physics: Physics,
    shared: Arc<Shared>,
    bus: Arc<StateBus>,
    /// Fractional ticks owed to wall-clock time
    budget: f64,
    last_frame: Instant,
}

impl Worker {
    async fn run(mut self, mut signals: mpsc::UnboundedReceiver<Signal>) {
        let mut frames = tokio::time::interval(FRAME_PERIOD);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("simulation worker running");

        loop {
            if self.shared.is_cancelled() {
                break;
            }
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(Signal::Wake) => {
                        self.sync();
                    }
                    Some(Signal::Shutdown) | None => break,
                },
                _ = frames.tick() => self.frame(),
            }
        }

        debug!(
            t = self.physics.time(),
            steps = self.physics.step_count(),
            "simulation worker exiting"
        );
    }

    /// Run the ticks owed since the previous wakeup.
    fn frame(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;

        if !self.sync().is_running() {
            self.budget = 0.0;
            return;
        }

        let config = self.physics.config();
        self.budget += config.speed * elapsed.as_secs_f64() / config.dt;
        let owed = self.budget.floor();
        self.budget -= owed;
        if owed > MAX_TICKS_PER_FRAME {
            debug!(owed, "tick backlog dropped");
        }
        let due = owed.min(MAX_TICKS_PER_FRAME) as u32;

        for tick in 0..due {
            if self.shared.is_cancelled() {
                debug!(remaining = due - tick, "frame cut short by shutdown");
                break;
            }
            if tick > 0 && !self.sync().is_running() {
                break;
            }
            match self.physics.tick() {
                Ok(()) => self.bus.publish(self.physics.snapshot()),
                Err(fault) => {
                    self.halt(fault);
                    break;
                }
            }
        }
    }

    /// Apply queued configuration and reset; return the mode to run under.
    fn sync(&mut self) -> LoopState {
        let (patch, reset) = {
            let mut control = self.shared.lock();
            (
                control.pending.take(),
                std::mem::take(&mut control.pending_reset),
            )
        };

        if let Some(patch) = patch {
            let applied = patch
                .apply(self.physics.config())
                .and_then(|config| self.physics.apply_config(config));
            if let Err(e) = applied {
                error!(error = %e, "queued configuration could not be applied");
                let fault = Fault::from_error(&e, self.physics.time(), 0);
                self.halt(fault);
            }
        }

        if reset {
            self.budget = 0.0;
            match self.physics.reset() {
                Ok(()) => {
                    info!("simulation reset");
                    self.bus.publish(self.physics.snapshot());
                }
                Err(e) => {
                    error!(error = %e, "reset failed");
                    let fault = Fault::from_error(&e, self.physics.time(), 0);
                    self.halt(fault);
                }
            }
        }

        self.shared.lock().mode
    }

    /// Publish the faulted state and stop the loop.
    fn halt(&mut self, fault: Fault) {
        warn!(%fault, "simulation halted");
        self.physics.set_fault(fault);
        self.bus.publish(self.physics.snapshot());
        let mut control = self.shared.lock();
        control.mode = LoopState::Stopped;
        // Patches queued after this tick began still apply on top
        let base = self.physics.config();
        control.accepted = match &control.pending {
            Some(patch) => patch.apply(base).unwrap_or_else(|_| base.clone()),
            None => base.clone(),
        };
    }
}
