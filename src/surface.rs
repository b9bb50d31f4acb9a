//! Viewport contract with the view layer
//!
//! The view layer owns the drawable surfaces for their whole lifetime; a
//! controller only holds a weak reference between the surface-available and
//! surface-destroyed callbacks.

use crate::geometry::Matrix;
use std::sync::{Arc, Weak};

/// One on-screen rendering target for a capture source.
///
/// Implemented by the embedding view layer. All calls arrive on the
/// presentation thread.
pub trait RenderSurface: Send + Sync {
    /// Current viewport size in pixels
    fn size(&self) -> (u32, u32);

    /// Request the surface's backing buffer be resized to match a newly
    /// negotiated source geometry
    fn set_buffer_size(&self, width: u32, height: u32);

    /// Apply a buffer-to-viewport transform to the rendering layer
    fn apply_transform(&self, matrix: &Matrix);
}

/// Owning handle passed in by the view layer
pub type SurfaceHandle = Arc<dyn RenderSurface>;

/// Non-owning reference a controller keeps between availability callbacks
pub type SurfaceRef = Weak<dyn RenderSurface>;
