//! Liveness and health telemetry
//!
//! Samples both controllers on a fixed interval and renders a
//! human-readable status block: per-source frame age, estimated fps, the
//! external source's negotiated mode and buffer size, plus any error and
//! privileged-access diagnostics. Purely observational; the poller never
//! starts or stops capture.

use crate::controller::SourceController;
use crate::errors::BinocamError;
use crate::timing::MonotonicClock;
use crate::types::{LifecycleState, SourceId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Point-in-time health snapshot of one capture source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceHealth {
    pub id: SourceId,
    pub state: LifecycleState,
    /// 0 while no frame has been observed
    pub last_frame_timestamp_ns: i64,
    pub estimated_fps: f64,
    /// Most recent backend-reported error, empty if none
    pub backend_error: String,
    /// Most recent controller-level error (access preparation, start
    /// failures), empty if none
    pub controller_error: String,
    /// Privileged-access probe summary from the latest preparation
    pub access_info: String,
    /// Negotiated mode string, empty when not negotiated
    pub mode: String,
    pub buffer_width: u32,
    pub buffer_height: u32,
}

impl SourceHealth {
    /// Render one status line: `INT  age=12.34 ms  fps=59.80 ...`
    pub fn status_line(&self, clock: &MonotonicClock) -> String {
        let age = match clock.age_ms(self.last_frame_timestamp_ns) {
            Some(ms) => format!("{:.2} ms", ms),
            None => "n/a".to_string(),
        };
        let mut line = format!(
            "{}  state={}  age={}  fps={:.2}",
            self.id.tag(),
            self.state,
            age,
            self.estimated_fps
        );
        if !self.mode.is_empty() {
            line.push_str(&format!("  mode={}", self.mode));
        }
        if self.id == SourceId::External {
            line.push_str(&format!("  buf={}x{}", self.buffer_width, self.buffer_height));
        }
        line
    }
}

struct PollerInner {
    internal: SourceController,
    external: SourceController,
    clock: MonotonicClock,
    interval: Duration,
    latest: RwLock<String>,
    is_polling: RwLock<bool>,
}

/// Fixed-interval health poller over both capture sources
pub struct TelemetryPoller {
    inner: Arc<PollerInner>,
}

impl TelemetryPoller {
    pub fn new(
        internal: SourceController,
        external: SourceController,
        clock: MonotonicClock,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                internal,
                external,
                clock,
                interval,
                latest: RwLock::new(String::new()),
                is_polling: RwLock::new(false),
            }),
        }
    }

    /// Render the full status block from fresh snapshots
    pub fn render_status(&self) -> String {
        let internal = self.inner.internal.health();
        let external = self.inner.external.health();

        let mut out = String::new();
        out.push_str(&internal.status_line(&self.inner.clock));
        out.push('\n');
        out.push_str(&external.status_line(&self.inner.clock));

        for health in [&internal, &external] {
            if !health.backend_error.is_empty() {
                out.push_str(&format!("\n{} err={}", health.id.tag(), health.backend_error));
            }
            if !health.controller_error.is_empty() {
                out.push_str(&format!(
                    "\n{} ctrl={}",
                    health.id.tag(),
                    health.controller_error
                ));
            }
        }
        if !external.access_info.is_empty() {
            out.push_str(&format!("\nDBG: {}", external.access_info));
        }
        out
    }

    /// Most recently rendered status, empty before the first poll
    pub async fn latest_status(&self) -> String {
        self.inner.latest.read().await.clone()
    }

    /// Start the fixed-interval polling loop
    pub async fn start(&self) -> Result<(), BinocamError> {
        let mut is_polling = self.inner.is_polling.write().await;
        if *is_polling {
            return Err(BinocamError::MonitorError(
                "Telemetry poller already running".to_string(),
            ));
        }
        *is_polling = true;
        drop(is_polling);

        log::info!(
            "Starting telemetry poller (interval {} ms)",
            self.inner.interval.as_millis()
        );

        let inner = self.inner.clone();
        let poller = TelemetryPoller {
            inner: inner.clone(),
        };
        tokio::spawn(async move {
            while *inner.is_polling.read().await {
                let status = poller.render_status();
                log::trace!("telemetry:\n{}", status);
                *inner.latest.write().await = status;
                tokio::time::sleep(inner.interval).await;
            }
        });

        Ok(())
    }

    /// Stop the polling loop
    pub async fn stop(&self) {
        let mut is_polling = self.inner.is_polling.write().await;
        if *is_polling {
            log::info!("Stopping telemetry poller");
            *is_polling = false;
        }
    }
}

impl Clone for TelemetryPoller {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
