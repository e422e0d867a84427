use crate::media::LocalTrack;
use crate::transport::{
    IceCandidate, LinkState, PeerTransport, TransportConfig, TransportEvent, TransportFactory,
    diff_tracks, track_kinds,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use huddle_core::{PeerId, TrackKind};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8, MediaEngine};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::offer_answer_options::RTCOfferOptions;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const STREAM_ID: &str = "huddle";

/// Builds `WebRtcTransport`s.
#[derive(Debug, Clone, Default)]
pub struct WebRtcTransportFactory;

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        local: &PeerId,
        remote: &PeerId,
        config: TransportConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>> {
        debug!("Creating WebRTC transport {} -> {}", local, remote);
        let transport = WebRtcTransport::new(remote.clone(), config, events).await?;
        Ok(Arc::new(transport))
    }
}

/// `PeerTransport` over an `RTCPeerConnection`.
pub struct WebRtcTransport {
    remote: PeerId,
    peer_connection: Arc<RTCPeerConnection>,
    audio_sender: Mutex<Option<Arc<RTCRtpSender>>>,
    video_sender: Mutex<Option<Arc<RTCRtpSender>>>,
    /// Kinds announced by the last applied remote description.
    remote_tracks: Mutex<Vec<TrackKind>>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WebRtcTransport {
    pub async fn new(
        remote: PeerId,
        config: TransportConfig,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .into_iter()
                .map(|server| RTCIceServer {
                    urls: server.urls,
                    username: server.username.unwrap_or_default(),
                    credential: server.credential.unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let state_tx = events.clone();
        let state_peer = remote.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let peer = state_peer.clone();

                Box::pin(async move {
                    info!("Peer connection state with {}: {:?}", peer, s);
                    let link = match s {
                        RTCPeerConnectionState::New | RTCPeerConnectionState::Connecting => {
                            LinkState::Connecting
                        }
                        RTCPeerConnectionState::Connected => LinkState::Connected,
                        RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
                        RTCPeerConnectionState::Failed => LinkState::Failed,
                        RTCPeerConnectionState::Closed => LinkState::Closed,
                        RTCPeerConnectionState::Unspecified => return,
                    };
                    let _ = tx.send(TransportEvent::LinkStateChanged(link));
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx.send(TransportEvent::CandidateGenerated(IceCandidate {
                    candidate: init.candidate,
                    sdp_mid: init.sdp_mid,
                    sdp_m_line_index: init.sdp_mline_index,
                }));
            })
        }));

        Ok(Self {
            remote,
            peer_connection,
            audio_sender: Mutex::new(None),
            video_sender: Mutex::new(None),
            remote_tracks: Mutex::new(Vec::new()),
            events,
        })
    }

    fn local_track(track: &LocalTrack) -> Arc<dyn TrackLocal + Send + Sync> {
        let mime_type = match track.kind() {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video | TrackKind::Screen => MIME_TYPE_VP8,
        };
        Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            track.kind().as_str().to_owned(),
            STREAM_ID.to_owned(),
        ))
    }

    /// Reports tracks appearing in or vanishing from the remote description.
    async fn sync_remote_tracks(&self, sdp: &str) {
        let announced = track_kinds(sdp);
        let mut current = self.remote_tracks.lock().await;
        let diff = diff_tracks(&current, &announced);

        for kind in diff.removed {
            let _ = self.events.send(TransportEvent::RemoteTrackRemoved(kind));
        }
        for kind in diff.added {
            let _ = self.events.send(TransportEvent::RemoteTrackAdded(kind));
        }
        *current = announced;
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self, ice_restart: bool) -> Result<String> {
        let options = RTCOfferOptions {
            ice_restart,
            voice_activity_detection: false,
        };
        let offer = self.peer_connection.create_offer(Some(options)).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(offer.sdp)
    }

    async fn accept_offer(&self, sdp: String) -> Result<String> {
        let desc = RTCSessionDescription::offer(sdp.clone())?;
        self.peer_connection.set_remote_description(desc).await?;
        self.sync_remote_tracks(&sdp).await;

        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(answer.sdp)
    }

    async fn accept_answer(&self, sdp: String) -> Result<()> {
        let desc = RTCSessionDescription::answer(sdp.clone())?;
        self.peer_connection.set_remote_description(desc).await?;
        self.sync_remote_tracks(&sdp).await;
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        let mut desc = RTCSessionDescription::default();
        desc.sdp_type = RTCSdpType::Rollback;
        self.peer_connection
            .set_local_description(desc)
            .await
            .context("Failed to roll back local offer")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        self.peer_connection.add_ice_candidate(init).await?;
        Ok(())
    }

    async fn attach_track(&self, track: Arc<LocalTrack>) -> Result<()> {
        let sender = self
            .peer_connection
            .add_track(Self::local_track(&track))
            .await?;

        let slot = match track.kind() {
            TrackKind::Audio => &self.audio_sender,
            TrackKind::Video | TrackKind::Screen => &self.video_sender,
        };
        *slot.lock().await = Some(sender);
        debug!("Attached {} track for {}", track.kind(), self.remote);
        Ok(())
    }

    async fn replace_video_track(&self, track: Option<Arc<LocalTrack>>) -> Result<()> {
        let mut slot = self.video_sender.lock().await;
        match (slot.as_ref(), track) {
            (Some(sender), next) => {
                let next = next.map(|t| Self::local_track(&t));
                sender.replace_track(next).await?;
            }
            (None, Some(next)) => {
                let sender = self.peer_connection.add_track(Self::local_track(&next)).await?;
                *slot = Some(sender);
            }
            (None, None) => {}
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}
