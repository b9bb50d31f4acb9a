//! Per-source capture lifecycle controller
//!
//! One `SourceController` instance drives each video feed. It owns the
//! Idle/Starting/Running state machine, funnels every backend call through
//! the shared capture worker, and reconciles completion results back on the
//! presentation thread via [`SourceEvent`]s.
//!
//! Writer discipline: the presentation thread (or an external stop trigger)
//! moves the state into `Starting` or forces `Idle`; only a completion
//! event resolves `Starting` into `Running`. Readers observe the state
//! through atomic snapshots and never block.
//!
//! An optimistic `stop()` must beat any in-flight start: each start attempt
//! carries a generation number, `stop()` bumps the generation, and a
//! completion with a stale generation is discarded. `stop()` enqueues the
//! backend teardown itself, behind the start job it supersedes, so a stale
//! completion needs no cleanup of its own. The source can therefore never
//! resurrect into `Running` after a stop.

use crate::access::{prepare_device_access, PrivilegedShell};
use crate::backend::CaptureBackend;
use crate::config::SourceConfig;
use crate::events::{EventSink, SourceEvent};
use crate::geometry::{compute_transform, Matrix, TransformSpec};
use crate::permissions::PermissionGate;
use crate::surface::{RenderSurface, SurfaceHandle, SurfaceRef};
use crate::telemetry::SourceHealth;
use crate::types::{parse_mode, LifecycleState, SourceId};
use crate::worker::CaptureWorker;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, Weak};

struct AccessSetup {
    shell: Arc<dyn PrivilegedShell>,
    device_glob: String,
}

struct Inner {
    id: SourceId,
    backend: Arc<dyn CaptureBackend>,
    worker: CaptureWorker,
    events: EventSink,
    permission: PermissionGate,
    state: AtomicU8,
    /// Bumped by every start attempt and every stop; stale completions
    /// carry an older value and are discarded.
    generation: AtomicU64,
    display: Mutex<SourceConfig>,
    buffer: Mutex<(u32, u32)>,
    viewport: Mutex<(u32, u32)>,
    surface: Mutex<SurfaceRef>,
    last_transform: Mutex<Option<Matrix>>,
    mode: Mutex<String>,
    last_error: Mutex<String>,
    access_info: Mutex<String>,
    access: Option<AccessSetup>,
}

/// Cloneable handle to one source's lifecycle controller
#[derive(Clone)]
pub struct SourceController {
    inner: Arc<Inner>,
}

impl SourceController {
    /// Controller for the built-in sensor; no privileged preparation.
    pub fn internal(
        config: SourceConfig,
        backend: Arc<dyn CaptureBackend>,
        worker: CaptureWorker,
        events: EventSink,
        permission: PermissionGate,
    ) -> Self {
        Self::new(SourceId::Internal, config, backend, worker, events, permission, None)
    }

    /// Controller for the USB source; relaxes device-node permissions
    /// through `shell` before every start attempt.
    pub fn external(
        config: SourceConfig,
        backend: Arc<dyn CaptureBackend>,
        worker: CaptureWorker,
        events: EventSink,
        permission: PermissionGate,
        shell: Arc<dyn PrivilegedShell>,
        device_glob: String,
    ) -> Self {
        Self::new(
            SourceId::External,
            config,
            backend,
            worker,
            events,
            permission,
            Some(AccessSetup { shell, device_glob }),
        )
    }

    fn new(
        id: SourceId,
        config: SourceConfig,
        backend: Arc<dyn CaptureBackend>,
        worker: CaptureWorker,
        events: EventSink,
        permission: PermissionGate,
        access: Option<AccessSetup>,
    ) -> Self {
        let buffer = (config.buffer_size[0], config.buffer_size[1]);
        let unbound: SurfaceRef = Weak::<DeadSurface>::new();
        Self {
            inner: Arc::new(Inner {
                id,
                backend,
                worker,
                events,
                permission,
                state: AtomicU8::new(LifecycleState::Idle as u8),
                generation: AtomicU64::new(0),
                display: Mutex::new(config),
                buffer: Mutex::new(buffer),
                viewport: Mutex::new((0, 0)),
                surface: Mutex::new(unbound),
                last_transform: Mutex::new(None),
                mode: Mutex::new(String::new()),
                last_error: Mutex::new(String::new()),
                access_info: Mutex::new(String::new()),
                access,
            }),
        }
    }

    pub fn id(&self) -> SourceId {
        self.inner.id
    }

    pub(crate) fn worker(&self) -> CaptureWorker {
        self.inner.worker.clone()
    }

    /// Atomic snapshot of the lifecycle state
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    /// Begin capture if the preconditions hold; otherwise do nothing.
    ///
    /// Requires a bound surface, a granted permission capability and an
    /// `Idle` state. Concurrent calls while `Starting` or `Running` are
    /// silently ignored; exactly one backend start runs per transition.
    pub fn attempt_start(&self) {
        let surface = match self.surface() {
            Some(s) => s,
            None => {
                log::trace!("{}: start skipped, no surface bound", self.inner.id);
                return;
            }
        };
        if !self.inner.permission.is_granted() {
            log::debug!("{}: start deferred, permission not granted", self.inner.id);
            return;
        }
        if self
            .inner
            .state
            .compare_exchange(
                LifecycleState::Idle as u8,
                LifecycleState::Starting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let desired_fps = self.inner.display.lock().expect("lock poisoned").desired_fps;
        let inner = self.inner.clone();
        log::info!("{}: starting (generation {})", self.inner.id, generation);
        self.inner
            .worker
            .execute(move || run_start_job(inner, surface, desired_fps, generation));
    }

    /// Stop capture. No-op unless `Starting` or `Running`.
    ///
    /// The visible state flips to `Idle` immediately; the backend teardown
    /// completes asynchronously on the worker. Safe to call from lifecycle
    /// teardown paths without waiting.
    pub fn stop(&self) {
        loop {
            let current = self.inner.state.load(Ordering::SeqCst);
            if current == LifecycleState::Idle as u8 {
                return;
            }
            if self
                .inner
                .state
                .compare_exchange(
                    current,
                    LifecycleState::Idle as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                break;
            }
        }

        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.mode.lock().expect("lock poisoned").clear();
        let backend = self.inner.backend.clone();
        self.inner.worker.execute(move || backend.stop());
        log::info!("{}: stop requested", self.inner.id);
    }

    /// Reconcile a completion posted by the worker. Presentation thread
    /// only.
    pub fn handle_event(&self, event: &SourceEvent) {
        let SourceEvent::StartCompleted {
            id,
            generation,
            ok,
            mode,
            error,
        } = event;
        if *id != self.inner.id {
            return;
        }

        let current = self.inner.generation.load(Ordering::SeqCst);
        if *generation != current {
            // A stop superseded this attempt; the stale result must not
            // revive the source. Nothing to tear down here either: the
            // superseding stop already queued its own backend stop on the
            // worker, FIFO-ordered after the stale start job. Enqueueing
            // another stop now would land behind any fresh start that
            // followed and kill its session.
            log::debug!(
                "{}: discarding stale start completion (generation {} != {})",
                self.inner.id,
                generation,
                current
            );
            return;
        }

        if *ok {
            if self
                .inner
                .state
                .compare_exchange(
                    LifecycleState::Starting as u8,
                    LifecycleState::Running as u8,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_err()
            {
                let backend = self.inner.backend.clone();
                self.inner.worker.execute(move || backend.stop());
                return;
            }
            self.inner.last_error.lock().expect("lock poisoned").clear();
            log::info!("{}: running", self.inner.id);
            if mode.is_empty() {
                self.reapply_transform();
            } else {
                self.on_geometry_negotiated(mode);
            }
        } else {
            let _ = self.inner.state.compare_exchange(
                LifecycleState::Starting as u8,
                LifecycleState::Idle as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            *self.inner.last_error.lock().expect("lock poisoned") = error.clone();
            log::warn!("{}: start failed: {}", self.inner.id, error);
        }
    }

    /// A drawable surface became available. Replacing a live surface forces
    /// a stop-then-restart.
    pub fn on_surface_available(&self, surface: &SurfaceHandle) {
        if self.state() != LifecycleState::Idle {
            self.stop();
        }
        *self.inner.surface.lock().expect("lock poisoned") = Arc::downgrade(surface);

        let (w, h) = surface.size();
        if w > 0 && h > 0 {
            *self.inner.viewport.lock().expect("lock poisoned") = (w, h);
        }
        let (bw, bh) = *self.inner.buffer.lock().expect("lock poisoned");
        surface.set_buffer_size(bw, bh);

        self.reapply_transform();
        self.attempt_start();
    }

    /// The surface is going away; capture must not outlive it.
    pub fn on_surface_destroyed(&self) {
        self.stop();
        let unbound: SurfaceRef = Weak::<DeadSurface>::new();
        *self.inner.surface.lock().expect("lock poisoned") = unbound;
    }

    /// Viewport geometry changed; recompute and republish the transform.
    /// No-op if either dimension is not positive.
    pub fn on_viewport_changed(&self, width: i32, height: i32) {
        if width <= 0 || height <= 0 {
            return;
        }
        *self.inner.viewport.lock().expect("lock poisoned") = (width as u32, height as u32);
        self.reapply_transform();
    }

    /// Absorb a backend-reported mode descriptor.
    ///
    /// Buffer dimensions update only when the string contains a positive
    /// `WIDTHxHEIGHT` pair; a malformed descriptor keeps the previous
    /// geometry. The transform is recomputed either way, and the surface is
    /// asked to resize its buffer when the negotiated size differs.
    pub fn on_geometry_negotiated(&self, mode: &str) {
        *self.inner.mode.lock().expect("lock poisoned") = mode.to_string();

        if let Some(parsed) = parse_mode(mode) {
            let mut buffer = self.inner.buffer.lock().expect("lock poisoned");
            if *buffer != (parsed.width, parsed.height) {
                log::info!(
                    "{}: negotiated {}x{} ({}), was {}x{}",
                    self.inner.id,
                    parsed.width,
                    parsed.height,
                    if parsed.format.is_empty() { "?" } else { &parsed.format },
                    buffer.0,
                    buffer.1
                );
                *buffer = (parsed.width, parsed.height);
                drop(buffer);
                if let Some(surface) = self.surface() {
                    surface.set_buffer_size(parsed.width, parsed.height);
                }
            }
        } else if !mode.is_empty() {
            log::debug!("{}: no geometry in mode string {:?}", self.inner.id, mode);
        }

        self.reapply_transform();
    }

    /// Replace the display-transform settings and republish the transform.
    pub fn set_display_settings(&self, config: SourceConfig) {
        *self.inner.display.lock().expect("lock poisoned") = config;
        self.reapply_transform();
    }

    pub fn display_settings(&self) -> SourceConfig {
        self.inner.display.lock().expect("lock poisoned").clone()
    }

    /// Current source buffer size (negotiated for the external source)
    pub fn buffer_size(&self) -> (u32, u32) {
        *self.inner.buffer.lock().expect("lock poisoned")
    }

    /// Most recently applied transform, if any
    pub fn current_transform(&self) -> Option<Matrix> {
        *self.inner.last_transform.lock().expect("lock poisoned")
    }

    /// Health snapshot for the telemetry poller
    pub fn health(&self) -> SourceHealth {
        let buffer = self.buffer_size();
        SourceHealth {
            id: self.inner.id,
            state: self.state(),
            last_frame_timestamp_ns: self.inner.backend.last_frame_timestamp_ns(),
            estimated_fps: self.inner.backend.estimated_fps_x100() as f64 / 100.0,
            backend_error: self.inner.backend.last_error(),
            controller_error: self.inner.last_error.lock().expect("lock poisoned").clone(),
            access_info: self.inner.access_info.lock().expect("lock poisoned").clone(),
            mode: self.inner.mode.lock().expect("lock poisoned").clone(),
            buffer_width: buffer.0,
            buffer_height: buffer.1,
        }
    }

    fn surface(&self) -> Option<SurfaceHandle> {
        self.inner.surface.lock().expect("lock poisoned").upgrade()
    }

    fn transform_spec(&self) -> TransformSpec {
        let display = self.inner.display.lock().expect("lock poisoned");
        let buffer = *self.inner.buffer.lock().expect("lock poisoned");
        let viewport = *self.inner.viewport.lock().expect("lock poisoned");
        TransformSpec {
            buffer_width: buffer.0,
            buffer_height: buffer.1,
            rotation_deg: display.rotation_deg,
            crop: display.crop,
            zoom: display.zoom,
            mirror: display.mirror,
            vertical_align: display.vertical_align,
            horizontal_stretch: display.horizontal_stretch,
            viewport_width: viewport.0,
            viewport_height: viewport.1,
        }
    }

    fn reapply_transform(&self) {
        let surface = match self.surface() {
            Some(s) => s,
            None => return,
        };
        match compute_transform(&self.transform_spec()) {
            Some(matrix) => {
                *self.inner.last_transform.lock().expect("lock poisoned") = Some(matrix);
                surface.apply_transform(&matrix);
            }
            None => {
                // Degenerate input: keep the surface on the previous matrix.
                log::trace!("{}: degenerate transform input ignored", self.inner.id);
            }
        }
    }
}

fn run_start_job(inner: Arc<Inner>, surface: SurfaceHandle, desired_fps: u32, generation: u64) {
    let prepared = match &inner.access {
        Some(setup) => {
            match prepare_device_access(setup.shell.as_ref(), &setup.device_glob) {
                Ok(info) => {
                    *inner.access_info.lock().expect("lock poisoned") = info;
                    Ok(())
                }
                Err(e) => Err(e.to_string()),
            }
        }
        None => Ok(()),
    };

    let (ok, mode, error) = match prepared {
        // Preparation failed: the backend is never touched.
        Err(reason) => (false, String::new(), reason),
        Ok(()) => {
            if inner.backend.start(surface, desired_fps) {
                let mode = match inner.id {
                    SourceId::External => inner.backend.chosen_mode(),
                    SourceId::Internal => String::new(),
                };
                (true, mode, String::new())
            } else {
                (false, String::new(), inner.backend.last_error())
            }
        }
    };

    inner.events.post(SourceEvent::StartCompleted {
        id: inner.id,
        generation,
        ok,
        mode,
        error,
    });
}

/// Placeholder type for an unbound surface slot; `Weak::new` needs a sized
/// target before unsized coercion.
struct DeadSurface;

impl RenderSurface for DeadSurface {
    fn size(&self) -> (u32, u32) {
        (0, 0)
    }
    fn set_buffer_size(&self, _width: u32, _height: u32) {}
    fn apply_transform(&self, _matrix: &Matrix) {}
}
