//! Camera permission state
//!
//! The OS permission dialog itself is external; binocam only observes the
//! outcome. A denied or undetermined capability silently defers start
//! attempts instead of raising an error, and a grant is the trigger for
//! retrying both sources.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
        }
    }
}

/// Shared, thread-safe view of the current camera capability.
///
/// Controllers read it on every start attempt; the embedding application
/// updates it from the OS permission callback.
#[derive(Clone)]
pub struct PermissionGate {
    status: Arc<AtomicU8>,
}

impl PermissionGate {
    pub fn new(status: PermissionStatus) -> Self {
        Self {
            status: Arc::new(AtomicU8::new(encode(status))),
        }
    }

    pub fn status(&self) -> PermissionStatus {
        decode(self.status.load(Ordering::SeqCst))
    }

    pub fn set_status(&self, status: PermissionStatus) {
        self.status.store(encode(status), Ordering::SeqCst);
    }

    pub fn is_granted(&self) -> bool {
        self.status() == PermissionStatus::Granted
    }
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new(PermissionStatus::NotDetermined)
    }
}

fn encode(status: PermissionStatus) -> u8 {
    match status {
        PermissionStatus::Granted => 0,
        PermissionStatus::Denied => 1,
        PermissionStatus::NotDetermined => 2,
    }
}

fn decode(v: u8) -> PermissionStatus {
    match v {
        0 => PermissionStatus::Granted,
        1 => PermissionStatus::Denied,
        _ => PermissionStatus::NotDetermined,
    }
}
