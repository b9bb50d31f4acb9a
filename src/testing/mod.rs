//! Testing utilities for binocam
//!
//! Synthetic collaborators standing in for the native capture backend, the
//! privileged shell and the view-layer surface, enabling reliable offline
//! testing without hardware or root access.

pub mod synthetic;

pub use synthetic::{RecordingShell, ScriptedBackend, TestSurface};
