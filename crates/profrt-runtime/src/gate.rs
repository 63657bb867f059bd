use core::sync::atomic::{AtomicU8, Ordering};

const DISARMED: u8 = 0;
const ARMED: u8 = 1;
const FIRED: u8 = 2;

/// Runs the finalize action at most once per process.
///
/// `Disarmed -> Armed -> Fired`. Registration arms the gate; the host's shutdown path fires it.
/// Firing a gate that was never armed does nothing.
#[derive(Debug)]
pub struct FinalizationGate {
    state: AtomicU8,
}

impl Default for FinalizationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl FinalizationGate {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(DISARMED),
        }
    }

    /// Schedule the finalize action. Returns `true` only for the call that armed the gate.
    pub fn arm(&self) -> bool {
        self.state
            .compare_exchange(DISARMED, ARMED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_armed(&self) -> bool {
        self.state.load(Ordering::Acquire) == ARMED
    }

    pub fn has_fired(&self) -> bool {
        self.state.load(Ordering::Acquire) == FIRED
    }

    /// Run `finalize` if the gate is armed and has not fired yet.
    pub fn fire<R>(&self, finalize: impl FnOnce() -> R) -> Option<R> {
        self.state
            .compare_exchange(ARMED, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| finalize())
    }

    pub fn reset(&mut self) {
        *self.state.get_mut() = DISARMED;
    }
}
