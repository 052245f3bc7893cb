//! The single client session.

use std::fmt;
use std::num::NonZeroU64;

use crate::protocol::{Enrollment, EnrollmentRecord};

/// Identity of a session owner; never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(NonZeroU64);

impl OwnerId {
    /// Wraps a raw identity; `None` for zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Raw identity.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by `open` and required by every other endpoint.
///
/// Handles of a released session stay invalid even if the same owner opens
/// the device again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    owner: OwnerId,
    generation: u64,
}

impl SessionHandle {
    pub(crate) const fn new(owner: OwnerId, generation: u64) -> Self {
        Self { owner, generation }
    }

    /// Owner of the session.
    pub const fn owner(&self) -> OwnerId {
        self.owner
    }
}

/// State of the engine as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PufState {
    /// Conditioning the region; sessions are refused.
    WarmingUp,
    /// No session.
    Idle,
    /// A session is open and waits for its enrollment.
    AwaitingEnrollment,
    /// A decay round is running.
    Decaying,
    /// A response can be read.
    ResponseReady,
}

impl fmt::Display for PufState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WarmingUp => "warming-up",
            Self::Idle => "idle",
            Self::AwaitingEnrollment => "awaiting-enrollment",
            Self::Decaying => "decaying",
            Self::ResponseReady => "response-ready",
        };
        f.write_str(name)
    }
}

/// Per-session data.
#[derive(Debug)]
pub struct PufSession {
    handle: SessionHandle,
    pub(crate) enrollment: Option<Enrollment>,
    /// Record of the running or just finished decay round.
    pub(crate) current: Option<EnrollmentRecord>,
    pub(crate) rounds: u64,
}

impl PufSession {
    pub(crate) const fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            enrollment: None,
            current: None,
            rounds: 0,
        }
    }

    /// Handle of the owner.
    pub const fn handle(&self) -> SessionHandle {
        self.handle
    }

    /// The enrollment, once written.
    pub const fn enrollment(&self) -> Option<&Enrollment> {
        self.enrollment.as_ref()
    }

    /// Decay rounds started in this session.
    pub const fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Zeroes and drops the enrollment.
    pub(crate) fn wipe(&mut self) {
        if let Some(enrollment) = self.enrollment.as_mut() {
            enrollment.wipe();
        }
        self.enrollment = None;
        self.current = None;
    }
}
