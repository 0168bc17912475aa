//! Fallback flag shared by the dual-backend repository wrappers.
//!
//! Each repository instance owns its own flag, so the credential and
//! conversation repositories degrade independently. Once tripped the flag
//! never resets for the life of the process (no flapping), and the
//! transition is logged exactly once.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct FallbackFlag {
    switched: AtomicBool,
}

impl FallbackFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether operations should go to the in-memory store.
    pub fn active(&self) -> bool {
        self.switched.load(Ordering::Acquire)
    }

    /// Switch to the fallback store permanently. Returns true only for the
    /// call that performed the transition, so the caller can log it once.
    pub fn trip(&self) -> bool {
        !self.switched.swap(true, Ordering::AcqRel)
    }
}

/// Run the durable-backend expression unless the wrapper's flag is tripped;
/// on an infrastructure-shaped error, note the failure (which trips the
/// flag) and rerun against the fallback expression. Other errors propagate
/// unchanged. The wrapper must expose `flag` and `note_failure`.
macro_rules! with_failover {
    ($self:ident, $durable:expr, $fallback:expr) => {{
        if !$self.flag.active() {
            match $durable {
                Ok(value) => return Ok(value),
                Err(err) if err.is_infrastructure() => $self.note_failure(&err),
                Err(err) => return Err(err),
            }
        }
        $fallback
    }};
}

pub(crate) use with_failover;
