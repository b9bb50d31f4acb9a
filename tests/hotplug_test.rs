//! Hotplug Tests for the External Source
//!
//! Exercises the attach/detach coordinator against scripted collaborators:
//! detach stops capture, attach prepares the device nodes and restarts
//! after the settle delay, and a detach racing an in-flight start leaves
//! the source stopped.
//!
//! Run with: cargo test --test hotplug_test

use std::sync::Arc;
use std::time::Duration;

use binocam::config::SourceConfig;
use binocam::controller::SourceController;
use binocam::events::Dispatcher;
use binocam::hotplug::{HotplugCoordinator, UsbEvent};
use binocam::permissions::{PermissionGate, PermissionStatus};
use binocam::surface::SurfaceHandle;
use binocam::testing::{RecordingShell, ScriptedBackend, TestSurface};
use binocam::types::LifecycleState;
use binocam::worker::CaptureWorker;

struct Harness {
    controller: SourceController,
    coordinator: HotplugCoordinator,
    backend: Arc<ScriptedBackend>,
    shell: Arc<RecordingShell>,
    worker: CaptureWorker,
    dispatcher: Dispatcher,
}

fn harness(backend: Arc<ScriptedBackend>) -> Harness {
    let worker = CaptureWorker::new().unwrap();
    let dispatcher = Dispatcher::new();
    let shell = Arc::new(RecordingShell::new());
    let controller = SourceController::external(
        SourceConfig::default(),
        backend.clone(),
        worker.clone(),
        dispatcher.sink(),
        PermissionGate::new(PermissionStatus::Granted),
        shell.clone(),
        "/dev/video*".to_string(),
    );
    let coordinator = HotplugCoordinator::new(
        controller.clone(),
        shell.clone(),
        "/dev/video*".to_string(),
        Duration::from_millis(10),
    );
    Harness {
        controller,
        coordinator,
        backend,
        shell,
        worker,
        dispatcher,
    }
}

impl Harness {
    fn bind_surface(&self) -> Arc<TestSurface> {
        let surface = TestSurface::new(800, 600);
        let handle: SurfaceHandle = surface.clone();
        self.controller.on_surface_available(&handle);
        surface
    }

    fn settle(&self) {
        self.worker.wait_idle();
        for event in self.dispatcher.drain() {
            self.controller.handle_event(&event);
        }
        self.worker.wait_idle();
    }
}

#[tokio::test]
async fn test_detach_stops_external_capture() {
    let h = harness(ScriptedBackend::succeeding("MJPG 1280x720"));
    h.bind_surface();
    h.settle();
    assert_eq!(h.controller.state(), LifecycleState::Running);

    h.coordinator.handle_event(UsbEvent::Detached).await;
    h.worker.wait_idle();
    assert_eq!(h.controller.state(), LifecycleState::Idle);
    assert_eq!(h.backend.stop_calls(), 1);
}

#[tokio::test]
async fn test_attach_prepares_then_restarts() {
    let h = harness(ScriptedBackend::succeeding("MJPG 1280x720"));
    let _surface = h.bind_surface();
    h.settle();
    h.coordinator.handle_event(UsbEvent::Detached).await;
    h.worker.wait_idle();
    let calls_before = h.shell.calls().len();

    h.coordinator.handle_event(UsbEvent::Attached).await;
    h.settle();

    assert_eq!(h.controller.state(), LifecycleState::Running);
    assert_eq!(h.backend.start_calls(), 2);
    // Preemptive preparation plus the one inside the new start attempt.
    let calls = h.shell.calls();
    assert!(calls.len() >= calls_before + 4);
    assert_eq!(calls[calls_before], "id");
}

#[tokio::test]
async fn test_attach_while_stopped_starts_capture() {
    let h = harness(ScriptedBackend::succeeding("MJPG 1280x720"));
    let _surface = h.bind_surface();
    h.settle();
    h.controller.stop();
    h.worker.wait_idle();
    assert_eq!(h.controller.state(), LifecycleState::Idle);

    h.coordinator.handle_event(UsbEvent::Attached).await;
    h.settle();
    assert_eq!(h.controller.state(), LifecycleState::Running);
}

#[tokio::test]
async fn test_detach_during_start_leaves_source_idle() {
    let h = harness(ScriptedBackend::succeeding("MJPG 1280x720"));
    h.bind_surface();

    // The start job completes on the worker, but before its result is
    // reconciled the device goes away.
    h.worker.wait_idle();
    h.coordinator.handle_event(UsbEvent::Detached).await;

    for event in h.dispatcher.drain() {
        h.controller.handle_event(&event);
    }
    h.worker.wait_idle();

    assert_eq!(h.controller.state(), LifecycleState::Idle);
    // The detach teardown is the only stop; the discarded stale success
    // must not queue another.
    assert_eq!(h.backend.call_log(), vec!["start", "stop"]);
}

#[tokio::test]
async fn test_monitoring_loop_consumes_signals() {
    let h = harness(ScriptedBackend::succeeding("MJPG 1280x720"));
    h.bind_surface();
    h.settle();
    assert_eq!(h.controller.state(), LifecycleState::Running);

    h.coordinator.start_monitoring().await.unwrap();
    h.coordinator.signal(UsbEvent::Detached);

    // The spawned loop owns delivery; poll until it lands.
    for _ in 0..50 {
        if h.controller.state() == LifecycleState::Idle {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.controller.state(), LifecycleState::Idle);
    h.coordinator.stop_monitoring().await;
}
