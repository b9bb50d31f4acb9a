//! Capture backend contract
//!
//! The native capture engine (sensor pipeline, UVC negotiation) lives behind
//! this trait; binocam only drives its lifecycle. `start`, `stop` and the
//! mode query execute exclusively on the capture worker. The accessors are
//! cheap reads and may be sampled from any thread, which is how the
//! telemetry poller uses them.

use crate::surface::SurfaceHandle;

/// One native capture engine driving frames into a surface.
///
/// Failures never cross this boundary as panics or errors; `start` reports a
/// boolean and the detail is retrieved through `last_error`.
pub trait CaptureBackend: Send + Sync {
    /// Begin continuous frame delivery into `surface`. Returns false on
    /// failure without further side effects.
    fn start(&self, surface: SurfaceHandle, desired_fps: u32) -> bool;

    /// Idempotent; safe to call even if never started.
    fn stop(&self);

    /// Timestamp of the most recent frame on the shared monotonic timebase,
    /// 0 while no frame has been observed.
    fn last_frame_timestamp_ns(&self) -> i64;

    /// Estimated delivery rate scaled by 100 for integer transport
    fn estimated_fps_x100(&self) -> i32;

    /// Most recent backend error, empty if none
    fn last_error(&self) -> String;

    /// Human-readable negotiated mode. Meaningful for the external source
    /// after a successful start; expected to contain a `WIDTHxHEIGHT` token
    /// and optionally a leading format tag.
    fn chosen_mode(&self) -> String {
        String::new()
    }
}
