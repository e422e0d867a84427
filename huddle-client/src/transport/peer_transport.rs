use crate::media::LocalTrack;
use crate::transport::{IceCandidate, TransportConfig, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::PeerId;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One media connection to one remote peer. The supervisor decides when to
/// call what; implementations only apply it.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Creates an offer and sets it as the local description.
    async fn create_offer(&self, ice_restart: bool) -> Result<String>;

    /// Applies a remote offer and returns the answer, set as local description.
    async fn accept_offer(&self, sdp: String) -> Result<String>;

    async fn accept_answer(&self, sdp: String) -> Result<()>;

    /// Discards a local offer that lost a glare race.
    async fn rollback(&self) -> Result<()>;

    /// Only called once a remote description is set.
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    async fn attach_track(&self, track: Arc<LocalTrack>) -> Result<()>;

    /// Swaps the outgoing video source in place; `None` stops sending video.
    async fn replace_video_track(&self, track: Option<Arc<LocalTrack>>) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        local: &PeerId,
        remote: &PeerId,
        config: TransportConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
