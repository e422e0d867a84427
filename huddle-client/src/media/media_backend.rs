use crate::error::MediaError;
use crate::media::{CaptureDevice, DeviceKind};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Platform capture access. Only `LocalMediaController` talks to it.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn open(&self, kind: DeviceKind) -> Result<CaptureDevice, MediaError>;

    async fn stop(&self, device: &CaptureDevice);

    /// Devices that stopped without being asked to, such as a screen capture
    /// ended from the platform's own controls. Backends whose devices never
    /// end on their own keep the default, which yields nothing.
    fn ended(&self) -> broadcast::Receiver<CaptureDevice> {
        broadcast::channel(1).1
    }
}
