use crate::media::CaptureDevice;
use huddle_core::TrackKind;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outgoing track backed by a capture device. Supervisors hold it through an
/// `Arc` and only read it; the enabled flag is flipped by the media controller.
#[derive(Debug)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    device: CaptureDevice,
    enabled: AtomicBool,
}

impl LocalTrack {
    pub(crate) fn new(device: CaptureDevice, enabled: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: device.kind.track_kind(),
            device,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn device(&self) -> &CaptureDevice {
        &self.device
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}
