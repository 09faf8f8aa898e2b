use crate::signaling::message::{PeerId, PeerInfo};
use serde::{Deserialize, Serialize};

/// SignalingEvent represents what the signaling client reports to the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalingEvent {
    /// Peer list pushed by the server
    Peers { peers: Vec<PeerInfo>, self_id: PeerId },

    /// A call started, either by our invite or by a remote offer
    NewCall { peer_id: PeerId, session_id: String },

    /// Remote media arrived
    AddStream { peer_id: PeerId, track_id: String },

    /// Remote media went away
    RemoveStream { peer_id: PeerId, track_id: String },

    /// A peer left the server
    Leave { peer_id: PeerId },

    /// The call was hung up
    CallEnd { peer_id: PeerId, session_id: String },

    /// Negotiation failed for a peer
    Error {
        peer_id: Option<PeerId>,
        error: String,
    },
}

/// Type alias for the event sender
pub type EventSender = tokio::sync::broadcast::Sender<SignalingEvent>;

/// Type alias for the event receiver
pub type EventReceiver = tokio::sync::broadcast::Receiver<SignalingEvent>;
