//! Binocam: dual-camera capture lifecycle and display transforms
//!
//! This crate drives a binocular-style live compositor built from two
//! camera sources, an always-on internal sensor and a hotpluggable USB
//! device. It owns the start/stop lifecycle of each source, serializes
//! all native capture calls on a dedicated worker thread, and computes
//! the affine display transform that places each buffer into its half
//! of the viewport.
//!
//! # Features
//! - Atomic per-source lifecycle with generation-stamped start jobs
//! - Single serialized worker thread for every native capture call
//! - Pure affine geometry (fit/fill, zoom, mirror, stretch, alignment)
//! - Privileged-shell device access preparation for raw video nodes
//! - USB hotplug coordination with a settle delay before restart
//! - Periodic health telemetry for both sources
//!
//! # Usage
//! ```rust,ignore
//! use binocam::{BinocamConfig, BinocularRig};
//!
//! let config = BinocamConfig::load_or_default();
//! let rig = BinocularRig::new(&config, internal, external, shell)?;
//! rig.on_permission_changed(binocam::PermissionStatus::Granted);
//! ```
pub mod access;
pub mod backend;
pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod geometry;
pub mod hotplug;
pub mod permissions;
pub mod rig;
pub mod surface;
pub mod telemetry;
pub mod timing;
pub mod types;
pub mod worker;

// Testing utilities - synthetic collaborators for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::BinocamConfig;
pub use controller::SourceController;
pub use errors::BinocamError;
pub use events::SourceEvent;
pub use geometry::{compute_transform, CropPolicy, Matrix, TransformSpec, VerticalAlign};
pub use permissions::PermissionStatus;
pub use rig::BinocularRig;
pub use types::{LifecycleState, NegotiatedMode, SourceId};

/// Initialize logging for the capture system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "binocam=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "binocam");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
