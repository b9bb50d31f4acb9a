//! USB attach/detach coordination for the external source
//!
//! Detach stops the external controller immediately. Attach prepares the
//! device nodes on the capture worker, defensively stops any stale capture,
//! then retries the start after a settle delay so the OS device node has
//! time to appear. Re-entrant attach bursts need no explicit debounce: each
//! handler independently performs stop-then-delayed-start and
//! `attempt_start` is idempotent.

use crate::access::{prepare_device_access, PrivilegedShell};
use crate::controller::SourceController;
use crate::errors::BinocamError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

/// Hotplug signals scoped to the external video-class device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbEvent {
    Attached,
    Detached,
}

struct HotplugInner {
    controller: SourceController,
    shell: Arc<dyn PrivilegedShell>,
    device_glob: String,
    settle_delay: Duration,
    event_sender: mpsc::UnboundedSender<UsbEvent>,
    event_receiver: RwLock<mpsc::UnboundedReceiver<UsbEvent>>,
    is_monitoring: RwLock<bool>,
}

/// Reacts to USB attach/detach signals for the external source
#[derive(Clone)]
pub struct HotplugCoordinator {
    inner: Arc<HotplugInner>,
}

impl HotplugCoordinator {
    pub fn new(
        controller: SourceController,
        shell: Arc<dyn PrivilegedShell>,
        device_glob: String,
        settle_delay: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(HotplugInner {
                controller,
                shell,
                device_glob,
                settle_delay,
                event_sender: tx,
                event_receiver: RwLock::new(rx),
                is_monitoring: RwLock::new(false),
            }),
        }
    }

    /// Inject a hotplug signal from the platform's USB broadcast
    pub fn signal(&self, event: UsbEvent) {
        let _ = self.inner.event_sender.send(event);
    }

    /// Start consuming hotplug signals
    pub async fn start_monitoring(&self) -> Result<(), BinocamError> {
        let mut is_monitoring = self.inner.is_monitoring.write().await;
        if *is_monitoring {
            return Ok(());
        }
        *is_monitoring = true;
        drop(is_monitoring);

        log::info!("Starting USB hotplug monitoring");

        let coordinator = self.clone();
        tokio::spawn(async move {
            loop {
                let event = {
                    let mut rx = coordinator.inner.event_receiver.write().await;
                    rx.recv().await
                };
                let Some(event) = event else { break };
                if !*coordinator.inner.is_monitoring.read().await {
                    break;
                }
                coordinator.handle_event(event).await;
            }
        });

        Ok(())
    }

    /// Stop consuming hotplug signals
    pub async fn stop_monitoring(&self) {
        let mut is_monitoring = self.inner.is_monitoring.write().await;
        if *is_monitoring {
            log::info!("Stopping USB hotplug monitoring");
            *is_monitoring = false;
        }
    }

    /// Apply one hotplug signal.
    ///
    /// Attach ordering matters: preparation is enqueued on the worker ahead
    /// of the start job the delayed `attempt_start` will submit, so the
    /// device nodes are accessible by the time the backend opens them.
    pub async fn handle_event(&self, event: UsbEvent) {
        match event {
            UsbEvent::Detached => {
                log::info!("USB device detached");
                self.inner.controller.stop();
            }
            UsbEvent::Attached => {
                log::info!(
                    "USB device attached, restarting after {} ms settle",
                    self.inner.settle_delay.as_millis()
                );
                let shell = self.inner.shell.clone();
                let glob = self.inner.device_glob.clone();
                self.inner.controller.worker().execute(move || {
                    if let Err(e) = prepare_device_access(shell.as_ref(), &glob) {
                        log::warn!("preemptive device preparation failed: {}", e);
                    }
                });

                // Defensive: a stale running state would block the restart.
                self.inner.controller.stop();

                tokio::time::sleep(self.inner.settle_delay).await;
                self.inner.controller.attempt_start();
            }
        }
    }
}
