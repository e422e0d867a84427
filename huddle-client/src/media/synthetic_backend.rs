use crate::error::MediaError;
use crate::media::{CaptureDevice, DeviceKind, MediaBackend};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tokio::sync::{Notify, broadcast};
use tracing::debug;

struct SyntheticInner {
    denied: DashSet<DeviceKind>,
    absent: DashSet<DeviceKind>,
    /// Kinds whose open waits, like a picker the user has not answered.
    stalled: DashSet<DeviceKind>,
    unstalled: Notify,
    open: DashMap<DeviceKind, CaptureDevice>,
    ended: broadcast::Sender<CaptureDevice>,
}

impl Default for SyntheticInner {
    fn default() -> Self {
        Self {
            denied: DashSet::new(),
            absent: DashSet::new(),
            stalled: DashSet::new(),
            unstalled: Notify::new(),
            open: DashMap::new(),
            ended: broadcast::channel(16).0,
        }
    }
}

/// Capture backend without real devices. Each kind can be opened once at a
/// time, which makes leaked handles visible as `DeviceInUse`.
#[derive(Clone, Default)]
pub struct SyntheticMediaBackend {
    inner: Arc<SyntheticInner>,
}

impl SyntheticMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes opening `kind` fail with `PermissionDenied` until allowed again.
    pub fn deny(&self, kind: DeviceKind) {
        self.inner.denied.insert(kind);
    }

    pub fn allow(&self, kind: DeviceKind) {
        self.inner.denied.remove(&kind);
    }

    /// Makes opening `kind` fail with `DeviceNotFound`.
    pub fn unplug(&self, kind: DeviceKind) {
        self.inner.absent.insert(kind);
    }

    /// Makes opening `kind` wait until `unstall` is called.
    pub fn stall(&self, kind: DeviceKind) {
        self.inner.stalled.insert(kind);
    }

    pub fn unstall(&self, kind: DeviceKind) {
        self.inner.stalled.remove(&kind);
        self.inner.unstalled.notify_waiters();
    }

    /// Stops the open `kind` as the platform would, e.g. from its own
    /// stop-sharing control. Returns false if it was not open.
    pub fn end(&self, kind: DeviceKind) -> bool {
        let Some((_, device)) = self.inner.open.remove(&kind) else {
            return false;
        };
        debug!("Synthetic {} ended", kind);
        let _ = self.inner.ended.send(device);
        true
    }

    pub fn is_open(&self, kind: DeviceKind) -> bool {
        self.inner.open.contains_key(&kind)
    }
}

#[async_trait]
impl MediaBackend for SyntheticMediaBackend {
    async fn open(&self, kind: DeviceKind) -> Result<CaptureDevice, MediaError> {
        loop {
            let unstalled = self.inner.unstalled.notified();
            if !self.inner.stalled.contains(&kind) {
                break;
            }
            unstalled.await;
        }

        if self.inner.absent.contains(&kind) {
            return Err(MediaError::DeviceNotFound(kind));
        }
        if self.inner.denied.contains(&kind) {
            return Err(MediaError::PermissionDenied(kind));
        }

        match self.inner.open.entry(kind) {
            Entry::Occupied(_) => Err(MediaError::DeviceInUse(kind)),
            Entry::Vacant(slot) => {
                let device = CaptureDevice {
                    id: format!("synthetic-{}-{}", kind, uuid::Uuid::new_v4()),
                    kind,
                    label: format!("Synthetic {}", kind),
                };
                slot.insert(device.clone());
                debug!("Opened synthetic {}", kind);
                Ok(device)
            }
        }
    }

    async fn stop(&self, device: &CaptureDevice) {
        self.inner
            .open
            .remove_if(&device.kind, |_, open| open.id == device.id);
        debug!("Stopped synthetic {}", device.kind);
    }

    fn ended(&self) -> broadcast::Receiver<CaptureDevice> {
        self.inner.ended.subscribe()
    }
}
