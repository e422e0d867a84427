use crate::error::MediaError;
use crate::media::{CaptureDevice, DeviceKind, LocalTrack, MediaBackend};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// What the local participant currently sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalMediaState {
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
}

/// Sole owner of the local capture devices. Peers receive `Arc<LocalTrack>`
/// references; opening, stopping and switching devices happens only here.
///
/// Camera and screen are alternative video sources: while a screen is held
/// it is the outgoing video and the camera is released.
pub struct LocalMediaController {
    backend: Arc<dyn MediaBackend>,
    tracks: BTreeMap<DeviceKind, Arc<LocalTrack>>,
    audio_enabled: bool,
    video_enabled: bool,
}

impl LocalMediaController {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            tracks: BTreeMap::new(),
            audio_enabled: true,
            video_enabled: true,
        }
    }

    /// Returns the held track for `kind`, opening the device if needed.
    pub async fn acquire(&mut self, kind: DeviceKind) -> Result<Arc<LocalTrack>, MediaError> {
        if let Some(track) = self.tracks.get(&kind) {
            return Ok(track.clone());
        }

        let device = self.backend.open(kind).await?;
        Ok(self.adopt(device))
    }

    fn adopt(&mut self, device: CaptureDevice) -> Arc<LocalTrack> {
        let kind = device.kind;
        let enabled = match kind {
            DeviceKind::Microphone => self.audio_enabled,
            DeviceKind::Camera | DeviceKind::Screen => self.video_enabled,
        };

        info!("Acquired {} ({})", kind, device.label);
        let track = Arc::new(LocalTrack::new(device, enabled));
        if let Some(previous) = self.tracks.insert(kind, track.clone()) {
            warn!("Replaced held {} {}", kind, previous.device().id);
        }
        track
    }

    /// Stops the device for `kind`. Returns false if it was not held.
    pub async fn release(&mut self, kind: DeviceKind) -> bool {
        let Some(track) = self.tracks.remove(&kind) else {
            return false;
        };
        self.backend.stop(track.device()).await;
        info!("Released {}", kind);
        true
    }

    pub async fn release_all(&mut self) {
        let held: Vec<DeviceKind> = self.tracks.keys().copied().collect();
        for kind in held {
            self.release(kind).await;
        }
    }

    pub fn set_audio_enabled(&mut self, enabled: bool) {
        self.audio_enabled = enabled;
        if let Some(track) = self.tracks.get(&DeviceKind::Microphone) {
            track.set_enabled(enabled);
        }
    }

    /// Applies to whichever video source is outgoing, now or later.
    pub fn set_video_enabled(&mut self, enabled: bool) {
        self.video_enabled = enabled;
        for kind in [DeviceKind::Camera, DeviceKind::Screen] {
            if let Some(track) = self.tracks.get(&kind) {
                track.set_enabled(enabled);
            }
        }
    }

    pub fn is_screen_sharing(&self) -> bool {
        self.tracks.contains_key(&DeviceKind::Screen)
    }

    /// Opens a screen source without touching the held devices, so the
    /// picker can run while the owner carries on. The switch is completed
    /// with `adopt_screen`; a device nobody wants any more goes back through
    /// `discard`.
    pub fn open_screen(
        &self,
    ) -> impl Future<Output = Result<CaptureDevice, MediaError>> + Send + 'static {
        let backend = self.backend.clone();
        async move { backend.open(DeviceKind::Screen).await }
    }

    /// Makes an opened screen the outgoing video. The camera is stopped only
    /// now, so a failed or abandoned screen request never costs the camera.
    pub async fn adopt_screen(&mut self, device: CaptureDevice) -> Arc<LocalTrack> {
        let screen = self.adopt(device);
        self.release(DeviceKind::Camera).await;
        screen
    }

    pub async fn discard(&self, device: &CaptureDevice) {
        self.backend.stop(device).await;
        info!("Discarded unused {}", device.kind);
    }

    /// Whether `device` is the one currently held for its kind.
    pub fn holds(&self, device: &CaptureDevice) -> bool {
        self.tracks
            .get(&device.kind)
            .is_some_and(|track| track.device().id == device.id)
    }

    pub fn ended_devices(&self) -> broadcast::Receiver<CaptureDevice> {
        self.backend.ended()
    }

    /// Switches back to the camera, opening it before the screen is stopped.
    /// The screen is stopped even if the camera cannot be reopened, in which
    /// case no video is sent.
    pub async fn stop_screen_share(&mut self) -> Option<Arc<LocalTrack>> {
        if !self.is_screen_sharing() {
            return self.outgoing_video();
        }

        let camera = match self.acquire(DeviceKind::Camera).await {
            Ok(track) => Some(track),
            Err(e) => {
                warn!("Camera unavailable after screen share: {}", e);
                None
            }
        };
        self.release(DeviceKind::Screen).await;
        camera
    }

    pub fn outgoing_video(&self) -> Option<Arc<LocalTrack>> {
        self.tracks
            .get(&DeviceKind::Screen)
            .or_else(|| self.tracks.get(&DeviceKind::Camera))
            .cloned()
    }

    pub fn audio_track(&self) -> Option<Arc<LocalTrack>> {
        self.tracks.get(&DeviceKind::Microphone).cloned()
    }

    pub fn snapshot(&self) -> LocalMediaState {
        LocalMediaState {
            audio_enabled: self.audio_enabled,
            video_enabled: self.video_enabled,
            screen_sharing: self.is_screen_sharing(),
        }
    }
}
