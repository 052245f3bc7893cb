//! The PUF challenge-response engine.
//!
//! One [`PufEngine`] drives one device. It provides:
//! 1. **Endpoints:** `open`, `write`, `read` and `close`, the character-device
//!    interface offered to a single client at a time.
//! 2. **State machine:** `WarmingUp -> Idle -> AwaitingEnrollment -> Decaying ->
//!    ResponseReady`, looping back to `Decaying` after each read.
//! 3. **Timers:** `advance` runs the decay timeout, the refresh sweep, the
//!    warm-up settle timer and the temperature poll in virtual time.
//! 4. **Teardown:** `shutdown` (also run on drop) restores refresh and frees
//!    the region if the engine allocated it.

/// Response reconstruction.
pub mod response;
/// Session state.
pub mod session;

use tracing::{debug, error, info, warn};

use crate::common::constants::{MILLIS_PER_SECOND, SENTINEL_BYTES};
use crate::common::{EccError, PhysAddr, PufError};
use crate::config::{Config, EndOfList};
use crate::ecc::MAX_PARITY;
use crate::hw::{
    DecayController, DecayRegion, PhysMemory, RefreshLatch, RegionOrigin, RegisterBus,
    ThermalMonitor, WarmUp, WarmUpContext, WarmUpProgress,
};
use crate::protocol::{Cursor, Enrollment, EnrollmentRecord, enrollment};
use crate::sched::{Scheduler, TaskHandle, TaskKind};

pub use response::ResponseReconstructor;
pub use session::{OwnerId, PufSession, PufState, SessionHandle};

/// Running totals kept across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStats {
    /// Sessions opened.
    pub sessions: u64,
    /// Decay rounds started.
    pub rounds: u64,
    /// Responses returned to clients.
    pub responses: u64,
    /// Symbols repaired by error correction.
    pub corrected_symbols: u64,
    /// Reads rejected as uncorrectable.
    pub ecc_failures: u64,
    /// Reads aborted by a memory access failure.
    pub io_failures: u64,
}

/// Operator-facing health report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    /// Current state.
    pub state: PufState,
    /// Refresh latch as last observed.
    pub latch: RefreshLatch,
    /// Failed refresh register accesses.
    pub register_faults: u64,
    /// Completed refresh sweeps.
    pub sweeps: u64,
    /// Mean bandgap reading, if polling is enabled and has sampled.
    pub temperature: Option<f64>,
    /// Session and round counters.
    pub stats: EngineStats,
}

/// A DRAM PUF device.
#[derive(Debug)]
pub struct PufEngine<R: RegisterBus, M: PhysMemory> {
    config: Config,
    regs: R,
    mem: M,
    region: DecayRegion,
    sched: Scheduler,
    decay: DecayController,
    warm_up: WarmUp,
    thermal: Option<ThermalMonitor>,
    reconstructor: ResponseReconstructor,
    state: PufState,
    session: Option<PufSession>,
    timeout: Option<TaskHandle>,
    next_owner: u64,
    stats: EngineStats,
    shut_down: bool,
}

impl<R: RegisterBus, M: PhysMemory> PufEngine<R, M> {
    /// Brings up the device.
    ///
    /// Validates `config`, allocates the region unless a physical base is
    /// configured, zeroes it, starts temperature polling and begins warm-up.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration.
    /// * `regs` - Register bus for the refresh control and bandgap registers.
    /// * `mem` - Physical DRAM.
    ///
    /// # Returns
    ///
    /// The engine in `WarmingUp`, or `Idle` if warm-up is disabled. Failing to
    /// obtain the region is fatal.
    pub fn new(config: Config, mut regs: R, mut mem: M) -> Result<Self, PufError> {
        config.validate()?;
        let size = config.region.size;
        let region = match config.region.phys_base {
            Some(base) => {
                DecayRegion::new(PhysAddr::new(base), size, RegionOrigin::CallerSupplied)
            }
            None => {
                let base = mem.allocate_contiguous(size, config.dram.row_size())?;
                if let Err(err) = config.check_placement(base) {
                    mem.free_contiguous(base, size);
                    return Err(err.into());
                }
                DecayRegion::new(base, size, RegionOrigin::Allocated)
            }
        };
        if let Err(err) = mem.zero(region.base(), region.size()) {
            if region.origin() == RegionOrigin::Allocated {
                mem.free_contiguous(region.base(), region.size());
            }
            return Err(err.into());
        }
        info!(%region, "decay region ready");

        let mut sched = Scheduler::new();
        let thermal = if config.thermal.enabled {
            let mut monitor = ThermalMonitor::new(&config.thermal);
            if let Err(err) = monitor.start(&mut regs, &mut sched) {
                warn!(%err, "temperature polling unavailable");
            }
            Some(monitor)
        } else {
            None
        };

        let mut engine = Self {
            decay: DecayController::new(config.dram.clone(), config.refresh.clone()),
            warm_up: WarmUp::new(&config.warm_up),
            config,
            regs,
            mem,
            region,
            sched,
            thermal,
            reconstructor: ResponseReconstructor::new(),
            state: PufState::WarmingUp,
            session: None,
            timeout: None,
            next_owner: 0,
            stats: EngineStats::default(),
            shut_down: false,
        };
        let progress = engine.warm_up.start(&mut WarmUpContext {
            regs: &mut engine.regs,
            mem: &mut engine.mem,
            region: &engine.region,
            decay: &mut engine.decay,
            sched: &mut engine.sched,
        });
        if progress == WarmUpProgress::Complete {
            engine.state = PufState::Idle;
        }
        Ok(engine)
    }

    /// Claims the device for a new session.
    ///
    /// Fails with [`PufError::AlreadyOwned`] while another session is open or
    /// warm-up is still running; nothing changes in that case.
    pub fn open(&mut self) -> Result<SessionHandle, PufError> {
        if self.shut_down {
            return Err(PufError::ShutDown);
        }
        if self.session.is_some() || self.state != PufState::Idle {
            warn!(state = %self.state, "open rejected");
            return Err(PufError::AlreadyOwned);
        }
        self.next_owner += 1;
        let owner = OwnerId::new(self.next_owner).ok_or(PufError::AlreadyOwned)?;
        let handle = SessionHandle::new(owner, self.stats.sessions);
        self.stats.sessions += 1;
        self.session = Some(PufSession::new(handle));
        self.state = PufState::AwaitingEnrollment;
        info!(%owner, "session opened");
        Ok(handle)
    }

    fn owned_session(&mut self, handle: SessionHandle) -> Result<&mut PufSession, PufError> {
        match self.session.as_mut() {
            Some(session) if session.handle() == handle => Ok(session),
            _ => Err(PufError::NotOwner),
        }
    }

    fn check_record(&self, record: &EnrollmentRecord) -> Result<(), PufError> {
        if record.parity.len() > MAX_PARITY {
            return Err(EccError::TooManyParity {
                count: record.parity.len(),
                max: MAX_PARITY,
            }
            .into());
        }
        for &pointer in &record.pointers {
            let _ = self.region.cell_addr(pointer)?;
        }
        Ok(())
    }

    /// Submits the enrollment and starts the first decay round.
    ///
    /// The whole submission is validated before anything is committed: on
    /// error the session stays in `AwaitingEnrollment`.
    ///
    /// # Returns
    ///
    /// The number of bytes accepted, always `bytes.len()`.
    pub fn write(&mut self, handle: SessionHandle, bytes: &[u8]) -> Result<usize, PufError> {
        let _ = self.owned_session(handle)?;
        if self.state != PufState::AwaitingEnrollment {
            warn!(state = %self.state, "enrollment rejected");
            return Err(PufError::NotAcceptingEnrollment);
        }
        if bytes.len() > self.config.session.max_enrollment_bytes {
            warn!(len = bytes.len(), "enrollment too large");
            return Err(PufError::OutOfMemory {
                requested: bytes.len(),
            });
        }

        let records =
            enrollment::validate(bytes).inspect_err(|err| warn!(%err, "malformed enrollment"))?;
        let mut cur = Cursor::new(bytes);
        for _ in 0..records {
            self.check_record(&EnrollmentRecord::decode(&mut cur)?)?;
        }
        let enrollment =
            Enrollment::with_sentinel(bytes, records).map_err(|_| PufError::OutOfMemory {
                requested: bytes.len() + SENTINEL_BYTES,
            })?;

        self.owned_session(handle)?.enrollment = Some(enrollment);
        info!(records, len = bytes.len(), "enrollment accepted");
        if let Err(err) = self.start_next_timeout() {
            if let Some(session) = self.session.as_mut() {
                session.wipe();
            }
            self.state = PufState::AwaitingEnrollment;
            return Err(err);
        }
        Ok(bytes.len())
    }

    /// Decodes the next record and starts its decay round.
    fn start_next_timeout(&mut self) -> Result<(), PufError> {
        let session = self.session.as_mut().ok_or(PufError::NotOwner)?;
        let enrollment = session
            .enrollment
            .as_mut()
            .ok_or(PufError::NotAcceptingEnrollment)?;
        let next = enrollment.next_record()?;
        if next.wrapped {
            debug!("enrollment wrapped to first record");
        }
        let decay_ms = u64::from(next.record.decay_seconds) * MILLIS_PER_SECOND;
        session.current = Some(next.record);
        session.rounds += 1;

        if let Err(err) = self.mem.zero(self.region.base(), self.region.size()) {
            warn!(%err, "region reset failed");
        }
        // Latch failures are recorded by the controller and surface through `health`.
        let _ = self.decay.begin_decay(&mut self.regs, &mut self.sched);
        self.timeout = Some(self.sched.schedule(TaskKind::DecayTimeout, decay_ms));
        self.state = PufState::Decaying;
        self.stats.rounds += 1;
        debug!(offset = next.offset, decay_ms, "decay round started");
        Ok(())
    }

    /// Ends the running decay round.
    fn stop_decay(&mut self) {
        self.timeout = None;
        let _ = self.decay.end_decay(&mut self.regs, &mut self.sched);
        self.state = PufState::ResponseReady;
        debug!("response ready");
    }

    /// Reads the response of the finished decay round.
    ///
    /// Returns `Ok(0)` without side effects unless a response is ready.
    /// Otherwise the next decay round is armed whatever the outcome of the
    /// reconstruction, so a failed read never stalls the session.
    ///
    /// # Returns
    ///
    /// `Ok(4)` with the big-endian response in `buf`, or the I/O or ECC error.
    pub fn read(&mut self, handle: SessionHandle, buf: &mut [u8; 4]) -> Result<usize, PufError> {
        let _ = self.owned_session(handle)?;
        if self.state != PufState::ResponseReady {
            return Ok(0);
        }
        let Some(record) = self.session.as_mut().and_then(|s| s.current.take()) else {
            return Ok(0);
        };
        let result = self
            .reconstructor
            .reconstruct(&mut self.mem, &self.region, &record);

        let last = self
            .session
            .as_ref()
            .and_then(PufSession::enrollment)
            .is_some_and(Enrollment::at_sentinel);
        if last && self.config.session.end_of_list == EndOfList::Release {
            info!("last record read, releasing session");
            self.release();
        } else if let Err(err) = self.start_next_timeout() {
            error!(%err, "could not start next decay round");
            self.release();
        }

        match result {
            Ok(corrected) => {
                buf.copy_from_slice(&corrected.value.to_be_bytes());
                self.stats.responses += 1;
                self.stats.corrected_symbols += corrected.errors as u64;
                Ok(buf.len())
            }
            Err(err) => {
                match err {
                    PufError::Ecc(_) => self.stats.ecc_failures += 1,
                    _ => self.stats.io_failures += 1,
                }
                warn!(%err, "response discarded");
                Err(err)
            }
        }
    }

    /// Ends the session of `handle`.
    pub fn close(&mut self, handle: SessionHandle) -> Result<(), PufError> {
        let _ = self.owned_session(handle)?;
        self.release();
        Ok(())
    }

    /// Cancels the decay timer, restores refresh and drops the session.
    fn release(&mut self) {
        if let Some(timeout) = self.timeout.take() {
            let _ = self.sched.cancel(timeout);
        }
        if self.decay.is_decaying() {
            let _ = self.decay.end_decay(&mut self.regs, &mut self.sched);
        }
        if let Some(mut session) = self.session.take() {
            session.wipe();
            info!(owner = %session.handle().owner(), rounds = session.rounds(), "session released");
        }
        self.state = PufState::Idle;
    }

    /// Runs every task due within the next `elapsed_ms` milliseconds.
    pub fn advance(&mut self, elapsed_ms: u64) {
        let target = self.sched.now().saturating_add(elapsed_ms);
        while let Some(task) = self.sched.pop_due(target) {
            self.dispatch(task);
        }
        self.sched.advance_to(target);
    }

    fn dispatch(&mut self, task: TaskHandle) {
        match task.kind() {
            TaskKind::DecayTimeout => {
                if self.timeout == Some(task) {
                    self.stop_decay();
                }
            }
            TaskKind::RefreshSweep => {
                let _ = self.decay.on_sweep(
                    &mut self.regs,
                    &mut self.mem,
                    &self.region,
                    &mut self.sched,
                );
            }
            TaskKind::WarmUpSettle => {
                let progress = self.warm_up.on_settle(&mut WarmUpContext {
                    regs: &mut self.regs,
                    mem: &mut self.mem,
                    region: &self.region,
                    decay: &mut self.decay,
                    sched: &mut self.sched,
                });
                if progress == WarmUpProgress::Complete && self.state == PufState::WarmingUp {
                    self.state = PufState::Idle;
                }
            }
            TaskKind::TemperaturePoll => {
                if let Some(thermal) = self.thermal.as_mut() {
                    thermal.poll(&mut self.regs, &mut self.sched);
                }
            }
        }
    }

    /// Virtual time of the next pending task, for drivers that sleep between events.
    pub fn next_deadline(&self) -> Option<u64> {
        self.sched.next_deadline()
    }

    /// Current virtual time in milliseconds.
    pub const fn now(&self) -> u64 {
        self.sched.now()
    }

    /// Current state.
    pub const fn state(&self) -> PufState {
        self.state
    }

    /// Reports the refresh latch, fault counters and session statistics.
    pub fn health(&self) -> Health {
        Health {
            state: self.state,
            latch: self.decay.latch(),
            register_faults: self.decay.register_faults(),
            sweeps: self.decay.sweeps(),
            temperature: self.thermal.as_ref().and_then(ThermalMonitor::average),
            stats: self.stats,
        }
    }

    /// Stops all activity and returns the region.
    ///
    /// Releases any session, abandons warm-up, restores refresh, stops
    /// temperature polling and frees the region if it was allocated here.
    /// Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.release();
        self.warm_up.cancel(&mut self.sched);
        if self.decay.latch() != RefreshLatch::Enabled || self.decay.sweep_active() {
            let _ = self.decay.end_decay(&mut self.regs, &mut self.sched);
        }
        self.decay.cancel_sweep(&mut self.sched);
        if self.decay.latch() != RefreshLatch::Enabled {
            error!(latch = ?self.decay.latch(), "shutting down with refresh not restored");
        }
        if let Some(thermal) = self.thermal.as_mut() {
            if let Err(err) = thermal.stop(&mut self.regs, &mut self.sched) {
                warn!(%err, "temperature sensor power-down failed");
            }
        }
        if self.region.origin() == RegionOrigin::Allocated {
            self.mem.free_contiguous(self.region.base(), self.region.size());
        }
        self.shut_down = true;
        info!("engine shut down");
    }

    /// The configuration the engine was built with.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The decay region.
    pub const fn region(&self) -> &DecayRegion {
        &self.region
    }

    /// The active session, if any.
    pub const fn session(&self) -> Option<&PufSession> {
        self.session.as_ref()
    }

    /// The timer queue.
    pub const fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    /// Refresh latch and sweep state.
    pub const fn decay(&self) -> &DecayController {
        &self.decay
    }

    /// Register bus.
    pub const fn registers(&self) -> &R {
        &self.regs
    }

    /// Register bus, e.g. to inject faults in a simulated backend.
    pub const fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    /// Physical memory.
    pub const fn memory(&self) -> &M {
        &self.mem
    }

    /// Physical memory, e.g. to plant decayed cells in a simulated backend.
    pub const fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }
}

impl<R: RegisterBus, M: PhysMemory> Drop for PufEngine<R, M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
