//! Binocular rig: both controllers wired together
//!
//! Convenience layer pairing the internal and external controllers with the
//! shared worker, permission gate and event dispatcher, mirroring the
//! embedding application's lifecycle callbacks (resume, pause, permission
//! result).

use crate::access::PrivilegedShell;
use crate::backend::CaptureBackend;
use crate::config::BinocamConfig;
use crate::controller::SourceController;
use crate::errors::BinocamError;
use crate::events::Dispatcher;
use crate::permissions::{PermissionGate, PermissionStatus};
use crate::types::SourceId;
use crate::worker::CaptureWorker;
use std::sync::Arc;

/// The two paired capture sources of one binocular device
pub struct BinocularRig {
    internal: SourceController,
    external: SourceController,
    worker: CaptureWorker,
    permission: PermissionGate,
    dispatcher: Dispatcher,
}

impl BinocularRig {
    /// Wire both controllers onto one shared worker and event queue.
    pub fn new(
        config: &BinocamConfig,
        internal_backend: Arc<dyn CaptureBackend>,
        external_backend: Arc<dyn CaptureBackend>,
        shell: Arc<dyn PrivilegedShell>,
    ) -> Result<Self, BinocamError> {
        let worker = CaptureWorker::new()?;
        let dispatcher = Dispatcher::new();
        let permission = PermissionGate::default();

        let internal = SourceController::internal(
            config.internal.clone(),
            internal_backend,
            worker.clone(),
            dispatcher.sink(),
            permission.clone(),
        );
        let external = SourceController::external(
            config.external.clone(),
            external_backend,
            worker.clone(),
            dispatcher.sink(),
            permission.clone(),
            shell,
            config.access.device_glob.clone(),
        );

        Ok(Self {
            internal,
            external,
            worker,
            permission,
            dispatcher,
        })
    }

    pub fn internal(&self) -> &SourceController {
        &self.internal
    }

    pub fn external(&self) -> &SourceController {
        &self.external
    }

    pub fn worker(&self) -> &CaptureWorker {
        &self.worker
    }

    pub fn permission(&self) -> &PermissionGate {
        &self.permission
    }

    /// Route all pending worker completions to their controllers.
    /// Call from the presentation loop.
    pub fn dispatch_pending(&self) -> usize {
        let events = self.dispatcher.drain();
        let count = events.len();
        for event in events {
            match event.source() {
                SourceId::Internal => self.internal.handle_event(&event),
                SourceId::External => self.external.handle_event(&event),
            }
        }
        count
    }

    /// Permission dialog came back; a grant retries both sources.
    pub fn on_permission_changed(&self, status: PermissionStatus) {
        self.permission.set_status(status);
        if status == PermissionStatus::Granted {
            self.internal.attempt_start();
            self.external.attempt_start();
        }
    }

    /// Foreground lifecycle: retry both sources.
    pub fn on_resume(&self) {
        self.internal.attempt_start();
        self.external.attempt_start();
    }

    /// Background lifecycle: both sources must stop.
    pub fn on_pause(&self) {
        self.internal.stop();
        self.external.stop();
    }

    /// Teardown: stop everything and drain the worker queue.
    pub fn shutdown(&self) {
        self.on_pause();
        self.worker.wait_idle();
        self.worker.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceHandle;
    use crate::testing::{RecordingShell, ScriptedBackend, TestSurface};
    use crate::types::LifecycleState;

    fn rig_with(
        internal: Arc<ScriptedBackend>,
        external: Arc<ScriptedBackend>,
    ) -> BinocularRig {
        BinocularRig::new(
            &BinocamConfig::default(),
            internal,
            external,
            Arc::new(RecordingShell::new()),
        )
        .unwrap()
    }

    fn bind(controller: &SourceController) -> SurfaceHandle {
        let surface = TestSurface::new(800, 600);
        let handle: SurfaceHandle = surface;
        controller.on_surface_available(&handle);
        handle
    }

    #[test]
    fn test_permission_grant_starts_both_sources() {
        let internal = ScriptedBackend::succeeding("");
        let external = ScriptedBackend::succeeding("MJPG 1280x720");
        let rig = rig_with(internal.clone(), external.clone());
        let _internal_surface = bind(rig.internal());
        let _external_surface = bind(rig.external());
        rig.worker().wait_idle();
        assert_eq!(internal.start_calls(), 0);

        rig.on_permission_changed(PermissionStatus::Granted);
        rig.worker().wait_idle();
        rig.dispatch_pending();

        assert_eq!(rig.internal().state(), LifecycleState::Running);
        assert_eq!(rig.external().state(), LifecycleState::Running);
        assert_eq!(internal.start_calls(), 1);
        assert_eq!(external.start_calls(), 1);
    }

    #[test]
    fn test_pause_stops_and_resume_restarts() {
        let internal = ScriptedBackend::succeeding("");
        let external = ScriptedBackend::succeeding("MJPG 1280x720");
        let rig = rig_with(internal.clone(), external.clone());
        let _internal_surface = bind(rig.internal());
        let _external_surface = bind(rig.external());
        rig.on_permission_changed(PermissionStatus::Granted);
        rig.worker().wait_idle();
        rig.dispatch_pending();

        rig.on_pause();
        rig.worker().wait_idle();
        assert_eq!(rig.internal().state(), LifecycleState::Idle);
        assert_eq!(rig.external().state(), LifecycleState::Idle);

        rig.on_resume();
        rig.worker().wait_idle();
        assert_eq!(rig.dispatch_pending(), 2);
        assert_eq!(rig.internal().state(), LifecycleState::Running);
        assert_eq!(rig.external().state(), LifecycleState::Running);
    }

    #[test]
    fn test_dispatch_routes_by_source() {
        let internal = ScriptedBackend::succeeding("");
        let external = ScriptedBackend::failing("no device");
        let rig = rig_with(internal, external);
        let _internal_surface = bind(rig.internal());
        let _external_surface = bind(rig.external());
        rig.on_permission_changed(PermissionStatus::Granted);
        rig.worker().wait_idle();
        assert_eq!(rig.dispatch_pending(), 2);
        assert_eq!(rig.internal().state(), LifecycleState::Running);
        assert_eq!(rig.external().state(), LifecycleState::Idle);
        assert_eq!(rig.external().health().controller_error, "no device");
    }

    #[test]
    fn test_shutdown_is_clean_with_pending_work() {
        let rig = rig_with(
            ScriptedBackend::succeeding(""),
            ScriptedBackend::succeeding(""),
        );
        let _internal_surface = bind(rig.internal());
        let _external_surface = bind(rig.external());
        rig.on_permission_changed(PermissionStatus::Granted);
        rig.shutdown();
        assert_eq!(rig.internal().state(), LifecycleState::Idle);
        assert_eq!(rig.external().state(), LifecycleState::Idle);
    }
}
