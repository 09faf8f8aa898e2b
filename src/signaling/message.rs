use crate::sdp::MediaKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Peer identifier. The server may send ids as JSON strings or numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }
        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => PeerId(id),
            RawId::Number(id) => PeerId(id.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn candidate_type(&self) -> Option<&str> {
        ice_candidate_type(&self.candidate)
    }
}

/// `host`, `srflx`, `relay`... taken from the eighth field of a candidate line.
pub fn ice_candidate_type(candidate: &str) -> Option<&str> {
    candidate.split(' ').nth(7)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerInfo {
    pub id: PeerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfferData {
    pub from: PeerId,
    #[serde(default)]
    pub media: MediaKind,
    pub session_id: String,
    #[serde(default)]
    pub description: Option<SessionDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerData {
    pub from: PeerId,
    #[serde(default)]
    pub description: Option<SessionDescription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateData {
    pub from: PeerId,
    #[serde(default)]
    pub candidate: Option<IceCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ByeData {
    #[serde(default)]
    pub from: Option<PeerId>,
    #[serde(default)]
    pub to: Option<PeerId>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `{ "type": ..., "data": ... }` as sent by the signaling server.
#[derive(Debug, Clone, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Invite(Value),
    Ringing(Value),
    Offer(OfferData),
    Answer(AnswerData),
    Candidate(CandidateData),
    Peers(Vec<PeerInfo>),
    Leave(PeerId),
    Bye(ByeData),
    Keepalive,
    Unknown(String, Value),
}

impl IncomingMessage {
    pub fn parse(text: &str) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_str(text).context("invalid signaling envelope")?;
        let data = envelope.data;
        let message = match envelope.kind.as_str() {
            "invite" => IncomingMessage::Invite(data),
            "ringing" => IncomingMessage::Ringing(data),
            "offer" => IncomingMessage::Offer(serde_json::from_value(data).context("offer")?),
            "answer" => IncomingMessage::Answer(serde_json::from_value(data).context("answer")?),
            "candidate" => {
                IncomingMessage::Candidate(serde_json::from_value(data).context("candidate")?)
            }
            "peers" => IncomingMessage::Peers(serde_json::from_value(data).context("peers")?),
            "leave" => IncomingMessage::Leave(serde_json::from_value(data).context("leave")?),
            "bye" => IncomingMessage::Bye(serde_json::from_value(data).context("bye")?),
            "keepalive" => IncomingMessage::Keepalive,
            _ => IncomingMessage::Unknown(envelope.kind, data),
        };
        Ok(message)
    }

    pub fn kind(&self) -> &str {
        match self {
            IncomingMessage::Invite(_) => "invite",
            IncomingMessage::Ringing(_) => "ringing",
            IncomingMessage::Offer(_) => "offer",
            IncomingMessage::Answer(_) => "answer",
            IncomingMessage::Candidate(_) => "candidate",
            IncomingMessage::Peers(_) => "peers",
            IncomingMessage::Leave(_) => "leave",
            IncomingMessage::Bye(_) => "bye",
            IncomingMessage::Keepalive => "keepalive",
            IncomingMessage::Unknown(kind, _) => kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingMessage {
    New {
        user_agent: String,
        name: String,
        id: PeerId,
    },
    Keepalive {
        data: Value,
    },
    Bye {
        session_id: String,
        from: PeerId,
    },
    Offer {
        to: PeerId,
        media: MediaKind,
        description: SessionDescription,
        session_id: String,
    },
    Answer {
        to: PeerId,
        description: SessionDescription,
        session_id: String,
    },
    Candidate {
        to: PeerId,
        candidate: IceCandidate,
        session_id: String,
    },
}

impl OutgoingMessage {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
