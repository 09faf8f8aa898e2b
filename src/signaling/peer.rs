use super::message::{IceCandidate, PeerId, SessionDescription};
use crate::sdp::MediaKind;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Negotiation lifecycle of one remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerState {
    Idle,
    Offering,
    Answering,
    Connected,
    Closed,
}

impl PeerState {
    pub fn can_transition(self, next: PeerState) -> bool {
        use PeerState::*;
        match (self, next) {
            // failed then closed arrive back to back
            (Closed, Closed) => true,
            (Closed, _) => false,
            (_, Closed) => true,
            (Idle, Offering) | (Idle, Answering) => true,
            (Offering, Connected) | (Answering, Connected) => true,
            (current, next) => current == next,
        }
    }

    pub fn transition(&mut self, next: PeerState) -> Result<()> {
        if !self.can_transition(next) {
            return Err(anyhow!("invalid peer transition {:?} -> {:?}", self, next));
        }
        *self = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Notifications raised by a peer connection outside of any request.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    IceCandidate {
        peer_id: PeerId,
        candidate: IceCandidate,
    },
    ConnectionStateChanged {
        peer_id: PeerId,
        state: ConnectionState,
    },
    TrackAdded {
        peer_id: PeerId,
        track_id: String,
    },
    TrackRemoved {
        peer_id: PeerId,
        track_id: String,
    },
}

pub type PeerEventSender = mpsc::UnboundedSender<PeerEvent>;
pub type PeerEventReceiver = mpsc::UnboundedReceiver<PeerEvent>;

/// The offer/answer capability of a peer connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;
    async fn create_answer(&self) -> Result<SessionDescription>;
    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;
    async fn local_description(&self) -> Option<SessionDescription>;
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Creates peer connections; events of each connection go to `events`.
#[async_trait]
pub trait PeerConnectionFactory: Send + Sync {
    async fn create(
        &self,
        peer_id: &PeerId,
        media: MediaKind,
        events: PeerEventSender,
    ) -> Result<Arc<dyn PeerConnection>>;
}
