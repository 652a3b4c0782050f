use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Initialization progress of a [`DeferredInitHandler`](super::DeferredInitHandler).
///
/// Diagnostic only: the request path decides on the delegate slot, never on
/// this value, so `Failed` and `Initializing` look the same to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InitState {
    /// `setup` has not been called
    Unconfigured = 0,
    /// The delegate is being constructed and set up
    Initializing = 1,
    /// The delegate is published and serving requests
    Ready = 2,
    /// Construction or setup failed; the wrapper stays unavailable
    Failed = 3,
    /// The wrapper was shut down after (or while) initializing
    Stopped = 4,
}

impl InitState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => InitState::Unconfigured,
            1 => InitState::Initializing,
            2 => InitState::Ready,
            3 => InitState::Failed,
            _ => InitState::Stopped,
        }
    }

    /// True once initialization has produced an outcome.
    #[must_use]
    pub fn is_settled(self) -> bool {
        !matches!(self, InitState::Unconfigured | InitState::Initializing)
    }
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InitState::Unconfigured => "unconfigured",
            InitState::Initializing => "initializing",
            InitState::Ready => "ready",
            InitState::Failed => "failed",
            InitState::Stopped => "stopped",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub(crate) struct AtomicInitState(AtomicU8);

impl AtomicInitState {
    pub(crate) fn new(state: InitState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> InitState {
        InitState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: InitState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move from `from` to `to`; returns false if the current state was not `from`.
    pub(crate) fn transition(&self, from: InitState, to: InitState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
