//! Synthetic capture collaborators
//!
//! Scripted stand-ins for the three external contracts: a backend whose
//! start result and mode string are set by the test, a shell whose exit
//! codes are scripted per command, and a surface that records everything
//! applied to it.

use crate::access::PrivilegedShell;
use crate::backend::CaptureBackend;
use crate::geometry::Matrix;
use crate::surface::{RenderSurface, SurfaceHandle};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Capture backend with scripted behavior and recorded call counts
#[derive(Default)]
pub struct ScriptedBackend {
    start_ok: Mutex<bool>,
    mode: Mutex<String>,
    error: Mutex<String>,
    timestamp_ns: AtomicI64,
    fps_x100: AtomicI32,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    call_log: Mutex<Vec<&'static str>>,
}

impl ScriptedBackend {
    /// Backend whose next start succeeds, reporting `mode`
    pub fn succeeding(mode: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.start_ok.lock().unwrap() = true;
        *backend.mode.lock().unwrap() = mode.to_string();
        Arc::new(backend)
    }

    /// Backend whose next start fails with `error`
    pub fn failing(error: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.error.lock().unwrap() = error.to_string();
        Arc::new(backend)
    }

    pub fn set_start_result(&self, ok: bool) {
        *self.start_ok.lock().unwrap() = ok;
    }

    pub fn set_mode(&self, mode: &str) {
        *self.mode.lock().unwrap() = mode.to_string();
    }

    pub fn set_error(&self, error: &str) {
        *self.error.lock().unwrap() = error.to_string();
    }

    pub fn set_frame(&self, timestamp_ns: i64, fps_x100: i32) {
        self.timestamp_ns.store(timestamp_ns, Ordering::SeqCst);
        self.fps_x100.store(fps_x100, Ordering::SeqCst);
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Every start/stop invocation in worker execution order
    pub fn call_log(&self) -> Vec<&'static str> {
        self.call_log.lock().unwrap().clone()
    }
}

impl CaptureBackend for ScriptedBackend {
    fn start(&self, _surface: SurfaceHandle, _desired_fps: u32) -> bool {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.call_log.lock().unwrap().push("start");
        *self.start_ok.lock().unwrap()
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.call_log.lock().unwrap().push("stop");
    }

    fn last_frame_timestamp_ns(&self) -> i64 {
        self.timestamp_ns.load(Ordering::SeqCst)
    }

    fn estimated_fps_x100(&self) -> i32 {
        self.fps_x100.load(Ordering::SeqCst)
    }

    fn last_error(&self) -> String {
        self.error.lock().unwrap().clone()
    }

    fn chosen_mode(&self) -> String {
        self.mode.lock().unwrap().clone()
    }
}

/// Privileged shell with scripted exit codes and a call log
pub struct RecordingShell {
    probe: Mutex<(i32, String)>,
    setenforce: Mutex<i32>,
    chmod: Mutex<(i32, String)>,
    calls: Mutex<Vec<String>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self {
            probe: Mutex::new((0, "uid=0(root) gid=0(root)".to_string())),
            setenforce: Mutex::new(0),
            chmod: Mutex::new((0, String::new())),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_probe(&self, code: i32, output: &str) {
        *self.probe.lock().unwrap() = (code, output.to_string());
    }

    pub fn set_probe_output(&self, output: String) {
        *self.probe.lock().unwrap() = (0, output);
    }

    pub fn fail_setenforce(&self, code: i32) {
        *self.setenforce.lock().unwrap() = code;
    }

    pub fn fail_chmod(&self, code: i32, output: &str) {
        *self.chmod.lock().unwrap() = (code, output.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for RecordingShell {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivilegedShell for RecordingShell {
    fn run(&self, cmd: &str) -> (i32, String) {
        self.calls.lock().unwrap().push(cmd.to_string());
        if cmd == "id" {
            self.probe.lock().unwrap().clone()
        } else if cmd.starts_with("setenforce") {
            (*self.setenforce.lock().unwrap(), String::new())
        } else if cmd.starts_with("chmod") {
            self.chmod.lock().unwrap().clone()
        } else {
            (0, String::new())
        }
    }
}

/// View-layer surface recording buffer-size requests and applied matrices
pub struct TestSurface {
    size: Mutex<(u32, u32)>,
    buffer_sizes: Mutex<Vec<(u32, u32)>>,
    transforms: Mutex<Vec<Matrix>>,
}

impl TestSurface {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            size: Mutex::new((width, height)),
            buffer_sizes: Mutex::new(Vec::new()),
            transforms: Mutex::new(Vec::new()),
        })
    }

    pub fn set_size(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = (width, height);
    }

    /// Every buffer size requested, in order
    pub fn buffer_sizes(&self) -> Vec<(u32, u32)> {
        self.buffer_sizes.lock().unwrap().clone()
    }

    /// Every applied matrix, in order
    pub fn transforms(&self) -> Vec<Matrix> {
        self.transforms.lock().unwrap().clone()
    }

    pub fn apply_count(&self) -> usize {
        self.transforms.lock().unwrap().len()
    }

    pub fn last_transform(&self) -> Option<Matrix> {
        self.transforms.lock().unwrap().last().copied()
    }
}

impl RenderSurface for TestSurface {
    fn size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }

    fn set_buffer_size(&self, width: u32, height: u32) {
        self.buffer_sizes.lock().unwrap().push((width, height));
    }

    fn apply_transform(&self, matrix: &Matrix) {
        self.transforms.lock().unwrap().push(*matrix);
    }
}
