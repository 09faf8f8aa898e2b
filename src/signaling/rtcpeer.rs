use super::message::{IceCandidate, PeerId, SdpType, SessionDescription};
use super::peer::{ConnectionState, PeerConnection, PeerConnectionFactory, PeerEvent, PeerEventSender};
use crate::sdp::MediaKind;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::{media_engine::MediaEngine, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;

impl From<RTCPeerConnectionState> for ConnectionState {
    fn from(state: RTCPeerConnectionState) -> Self {
        match state {
            RTCPeerConnectionState::New => ConnectionState::New,
            RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
            RTCPeerConnectionState::Connected => ConnectionState::Connected,
            RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
            RTCPeerConnectionState::Failed => ConnectionState::Failed,
            RTCPeerConnectionState::Closed => ConnectionState::Closed,
            RTCPeerConnectionState::Unspecified => ConnectionState::New,
        }
    }
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Rollback => return Err(anyhow!("rollback descriptions are not supported")),
    };
    Ok(rtc)
}

fn from_rtc_description(description: RTCSessionDescription) -> Result<SessionDescription> {
    let sdp_type = match description.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => return Err(anyhow!("unspecified session description type")),
    };
    Ok(SessionDescription {
        sdp_type,
        sdp: description.sdp,
    })
}

/// Builds peer connections on the `webrtc` crate.
pub struct WebrtcPeerFactory {
    ice_servers: Vec<String>,
}

impl WebrtcPeerFactory {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl PeerConnectionFactory for WebrtcPeerFactory {
    async fn create(
        &self,
        peer_id: &PeerId,
        media: MediaKind,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;
        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let pc = Arc::new(api.new_peer_connection(config).await?);

        pc.add_transceiver_from_kind(RTPCodecType::Audio, None)
            .await?;
        if media == MediaKind::Video {
            pc.add_transceiver_from_kind(RTPCodecType::Video, None)
                .await?;
        }

        let candidate_peer = peer_id.clone();
        let candidate_events = events.clone();
        pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let peer_id = candidate_peer.clone();
            let events = candidate_events.clone();
            Box::pin(async move {
                let Some(candidate) = candidate else {
                    debug!("[{}] ice gathering complete", peer_id);
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => {
                        let candidate = IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_mline_index: init.sdp_mline_index,
                            username_fragment: init.username_fragment,
                        };
                        events
                            .send(PeerEvent::IceCandidate { peer_id, candidate })
                            .ok();
                    }
                    Err(e) => warn!("[{}] failed to encode ice candidate: {}", peer_id, e),
                }
            })
        }));

        let state_peer = peer_id.clone();
        let state_events = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            info!("[{}] peer connection state changed: {}", state_peer, state);
            state_events
                .send(PeerEvent::ConnectionStateChanged {
                    peer_id: state_peer.clone(),
                    state: state.into(),
                })
                .ok();
            Box::pin(async {})
        }));

        let track_peer = peer_id.clone();
        pc.on_track(Box::new(move |track, _, _| {
            let track_id = track.id().to_string();
            debug!("[{}] got remote track: {}", track_peer, track_id);
            events
                .send(PeerEvent::TrackAdded {
                    peer_id: track_peer.clone(),
                    track_id: track_id.clone(),
                })
                .ok();
            let peer_id = track_peer.clone();
            let events = events.clone();
            Box::pin(async move {
                loop {
                    if let Err(e) = track.read_rtp().await {
                        debug!("[{}] remote track {} ended: {}", peer_id, track_id, e);
                        break;
                    }
                }
                events
                    .send(PeerEvent::TrackRemoved { peer_id, track_id })
                    .ok();
            })
        }));

        Ok(Arc::new(WebrtcPeer { pc }))
    }
}

pub struct WebrtcPeer {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl PeerConnection for WebrtcPeer {
    async fn create_offer(&self) -> Result<SessionDescription> {
        from_rtc_description(self.pc.create_offer(None).await?)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        from_rtc_description(self.pc.create_answer(None).await?)
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.pc
            .set_local_description(to_rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.pc
            .set_remote_description(to_rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let description = self.pc.local_description().await?;
        from_rtc_description(description).ok()
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.pc
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_mline_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        Ok(())
    }
}
