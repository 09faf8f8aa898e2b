//! WebSocket signaling: message envelope, per-peer negotiation and the
//! transport loop that ties them to a server connection.

pub mod client;
pub mod message;
pub mod peer;
pub mod rtcpeer;
pub mod transport;

pub use client::{SignalingChannels, SignalingClient, SignalingClientBuilder, IDLE_SESSION_ID};
pub use message::{
    ice_candidate_type, IceCandidate, IncomingMessage, OutgoingMessage, PeerId, PeerInfo, SdpType,
    SessionDescription,
};
pub use peer::{
    ConnectionState, PeerConnection, PeerConnectionFactory, PeerEvent, PeerEventReceiver,
    PeerEventSender, PeerState,
};
pub use rtcpeer::WebrtcPeerFactory;
