use super::message::{
    AnswerData, ByeData, CandidateData, IceCandidate, IncomingMessage, OfferData, OutgoingMessage,
    PeerId, SdpType, SessionDescription,
};
use super::peer::{
    ConnectionState, PeerConnection, PeerConnectionFactory, PeerEvent, PeerEventReceiver,
    PeerEventSender, PeerState,
};
use crate::event::{EventReceiver, EventSender, SignalingEvent};
use crate::sdp::{munge_local_description, munge_remote_description, MediaKind, NegotiationOptions};
use crate::version;
use anyhow::{anyhow, Result};
use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const IDLE_SESSION_ID: &str = "0-0";

struct PeerSession {
    connection: Arc<dyn PeerConnection>,
    media: MediaKind,
    state: PeerState,
    cancel_token: CancellationToken,
}

/// Receiving ends the transport drains while the client runs.
pub struct SignalingChannels {
    pub outgoing: mpsc::UnboundedReceiver<OutgoingMessage>,
    pub peer_events: PeerEventReceiver,
}

pub struct SignalingClientBuilder {
    name: String,
    user_agent: Option<String>,
    self_id: Option<PeerId>,
    options: NegotiationOptions,
    factory: Option<Arc<dyn PeerConnectionFactory>>,
    cancel_token: Option<CancellationToken>,
    event_capacity: usize,
}

impl SignalingClientBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_agent: None,
            self_id: None,
            options: NegotiationOptions::stereo_opus(),
            factory: None,
            cancel_token: None,
            event_capacity: 64,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_self_id(mut self, self_id: PeerId) -> Self {
        self.self_id = Some(self_id);
        self
    }

    pub fn with_options(mut self, options: NegotiationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn PeerConnectionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = Some(cancel_token);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Result<(SignalingClient, SignalingChannels)> {
        let factory = self
            .factory
            .ok_or_else(|| anyhow!("peer connection factory is required"))?;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (peer_events_tx, peer_events_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(self.event_capacity);

        let client = SignalingClient {
            self_id: self.self_id.unwrap_or_else(random_user_id),
            name: self.name,
            user_agent: self.user_agent.unwrap_or_else(version::get_useragent),
            options: Mutex::new(self.options),
            session_id: Mutex::new(IDLE_SESSION_ID.to_string()),
            peers: Mutex::new(HashMap::new()),
            factory,
            outgoing: outgoing_tx,
            peer_events: peer_events_tx,
            events,
            keepalive_count: AtomicU64::new(0),
            cancel_token: self.cancel_token.unwrap_or_default(),
        };
        let channels = SignalingChannels {
            outgoing: outgoing_rx,
            peer_events: peer_events_rx,
        };
        Ok((client, channels))
    }
}

/// Six random decimal digits, the id we announce ourselves with.
pub fn random_user_id() -> PeerId {
    let mut rng = rand::rng();
    let id: String = (0..6)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    PeerId::new(id)
}

async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = token.cancelled() => Err(anyhow!("negotiation cancelled")),
        result = fut => result,
    }
}

/// Dispatches signaling messages and drives offer/answer exchange for every peer.
pub struct SignalingClient {
    self_id: PeerId,
    name: String,
    user_agent: String,
    options: Mutex<NegotiationOptions>,
    session_id: Mutex<String>,
    peers: Mutex<HashMap<PeerId, PeerSession>>,
    factory: Arc<dyn PeerConnectionFactory>,
    outgoing: mpsc::UnboundedSender<OutgoingMessage>,
    peer_events: PeerEventSender,
    events: EventSender,
    keepalive_count: AtomicU64,
    pub cancel_token: CancellationToken,
}

impl SignalingClient {
    pub fn self_id(&self) -> &PeerId {
        &self.self_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub async fn session_id(&self) -> String {
        self.session_id.lock().await.clone()
    }

    pub async fn options(&self) -> NegotiationOptions {
        self.options.lock().await.clone()
    }

    pub async fn peer_state(&self, peer_id: &PeerId) -> Option<PeerState> {
        self.peers.lock().await.get(peer_id).map(|peer| peer.state)
    }

    pub async fn peer_media(&self, peer_id: &PeerId) -> Option<MediaKind> {
        self.peers.lock().await.get(peer_id).map(|peer| peer.media)
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.lock().await.len()
    }

    pub fn keepalive_count(&self) -> u64 {
        self.keepalive_count.load(Ordering::Relaxed)
    }

    fn send(&self, message: OutgoingMessage) -> Result<()> {
        self.outgoing
            .send(message)
            .map_err(|_| anyhow!("signaling channel closed"))
    }

    fn emit(&self, event: SignalingEvent) {
        // no subscribers is fine
        self.events.send(event).ok();
    }

    /// The greeting sent right after the socket opens.
    pub fn hello(&self) -> OutgoingMessage {
        OutgoingMessage::New {
            user_agent: self.user_agent.clone(),
            name: self.name.clone(),
            id: self.self_id.clone(),
        }
    }

    pub fn announce(&self) -> Result<()> {
        self.send(self.hello())
    }

    pub fn keepalive(&self) -> Result<u64> {
        self.send(OutgoingMessage::Keepalive { data: json!({}) })?;
        let count = self.keepalive_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("sent keepalive {} times", count);
        Ok(count)
    }

    pub async fn handle_text(&self, text: &str) -> Result<()> {
        let message = IncomingMessage::parse(text)?;
        info!("on message: type = {}", message.kind());
        self.dispatch(message).await
    }

    pub async fn dispatch(&self, message: IncomingMessage) -> Result<()> {
        match message {
            IncomingMessage::Offer(data) => self.on_offer(data).await,
            IncomingMessage::Answer(data) => self.on_answer(data).await,
            IncomingMessage::Candidate(data) => self.on_candidate(data).await,
            IncomingMessage::Peers(peers) => {
                debug!("peers = {:?}", peers);
                self.emit(SignalingEvent::Peers {
                    peers,
                    self_id: self.self_id.clone(),
                });
                Ok(())
            }
            IncomingMessage::Leave(peer_id) => self.on_leave(peer_id).await,
            IncomingMessage::Bye(data) => self.on_bye(data).await,
            IncomingMessage::Keepalive => {
                debug!("keepalive response");
                Ok(())
            }
            IncomingMessage::Invite(data) | IncomingMessage::Ringing(data) => {
                debug!("ignored call progress message: {}", data);
                Ok(())
            }
            IncomingMessage::Unknown(kind, data) => {
                warn!("unrecognized message: type = {}, data = {}", kind, data);
                Ok(())
            }
        }
    }

    async fn create_peer(
        &self,
        peer_id: &PeerId,
        media: MediaKind,
        state: PeerState,
    ) -> Result<(Arc<dyn PeerConnection>, CancellationToken)> {
        let connection = self
            .factory
            .create(peer_id, media, self.peer_events.clone())
            .await?;
        let mut session = PeerSession {
            connection: connection.clone(),
            media,
            state: PeerState::Idle,
            cancel_token: self.cancel_token.child_token(),
        };
        session.state.transition(state)?;
        let cancel_token = session.cancel_token.clone();

        let previous = self.peers.lock().await.insert(peer_id.clone(), session);
        if let Some(previous) = previous {
            warn!("replacing existing connection to {}", peer_id);
            previous.cancel_token.cancel();
            if let Err(e) = previous.connection.close().await {
                warn!("failed to close replaced connection to {}: {}", peer_id, e);
            }
        }
        Ok((connection, cancel_token))
    }

    async fn peer(&self, peer_id: &PeerId) -> Option<(Arc<dyn PeerConnection>, CancellationToken)> {
        self.peers
            .lock()
            .await
            .get(peer_id)
            .map(|peer| (peer.connection.clone(), peer.cancel_token.clone()))
    }

    async fn transition(&self, peer_id: &PeerId, next: PeerState) -> Result<()> {
        let mut peers = self.peers.lock().await;
        match peers.get_mut(peer_id) {
            Some(peer) => peer.state.transition(next),
            None => Err(anyhow!("unknown peer {}", peer_id)),
        }
    }

    async fn remove_peer(&self, peer_id: &PeerId) -> bool {
        let Some(mut peer) = self.peers.lock().await.remove(peer_id) else {
            return false;
        };
        peer.cancel_token.cancel();
        peer.state.transition(PeerState::Closed).ok();
        if let Err(e) = peer.connection.close().await {
            warn!("failed to close connection to {}: {}", peer_id, e);
        }
        true
    }

    async fn munge_local(&self, sdp: &str) -> String {
        let options = self.options.lock().await;
        munge_local_description(sdp, &options)
    }

    async fn munge_remote(&self, sdp: &str) -> String {
        let mut options = self.options.lock().await;
        munge_remote_description(sdp, &mut options)
    }

    /// Calls `peer_id`, creating the connection and sending our offer.
    pub async fn invite(&self, peer_id: PeerId, media: MediaKind) -> Result<()> {
        let session_id = format!("{}-{}", self.self_id, peer_id);
        *self.session_id.lock().await = session_id.clone();

        let (connection, cancel_token) =
            self.create_peer(&peer_id, media, PeerState::Offering).await?;
        self.emit(SignalingEvent::NewCall {
            peer_id: self.self_id.clone(),
            session_id: session_id.clone(),
        });

        let result = self
            .send_offer(&peer_id, media, connection, &cancel_token, session_id)
            .await;
        self.report(&peer_id, result)
    }

    async fn send_offer(
        &self,
        peer_id: &PeerId,
        media: MediaKind,
        connection: Arc<dyn PeerConnection>,
        cancel_token: &CancellationToken,
        session_id: String,
    ) -> Result<()> {
        let mut offer = cancellable(cancel_token, connection.create_offer()).await?;
        debug!("create offer (before): {}", offer.sdp);
        offer.sdp = self.munge_local(&offer.sdp).await;
        debug!("create offer (after): {}", offer.sdp);

        cancellable(cancel_token, connection.set_local_description(offer.clone())).await?;
        let description = connection.local_description().await.unwrap_or(offer);
        info!("sending offer to {}", peer_id);
        self.send(OutgoingMessage::Offer {
            to: peer_id.clone(),
            media,
            description,
            session_id,
        })
    }

    async fn on_offer(&self, data: OfferData) -> Result<()> {
        let from = data.from;
        *self.session_id.lock().await = data.session_id.clone();
        self.emit(SignalingEvent::NewCall {
            peer_id: from.clone(),
            session_id: data.session_id.clone(),
        });

        let (connection, cancel_token) = self
            .create_peer(&from, data.media, PeerState::Answering)
            .await?;
        let Some(description) = data.description else {
            debug!("offer from {} without description", from);
            return Ok(());
        };

        let result = self
            .send_answer(&from, connection, &cancel_token, description, data.session_id)
            .await;
        self.report(&from, result)
    }

    async fn send_answer(
        &self,
        peer_id: &PeerId,
        connection: Arc<dyn PeerConnection>,
        cancel_token: &CancellationToken,
        mut remote: SessionDescription,
        session_id: String,
    ) -> Result<()> {
        remote.sdp = self.munge_remote(&remote.sdp).await;
        let remote_type = remote.sdp_type;
        cancellable(cancel_token, connection.set_remote_description(remote)).await?;
        if remote_type != SdpType::Offer {
            return Ok(());
        }

        let mut answer = cancellable(cancel_token, connection.create_answer()).await?;
        debug!("create answer (before): {}", answer.sdp);
        answer.sdp = self.munge_local(&answer.sdp).await;
        debug!("create answer (after): {}", answer.sdp);

        cancellable(cancel_token, connection.set_local_description(answer.clone())).await?;
        let description = connection.local_description().await.unwrap_or(answer);
        info!("sending answer to {}", peer_id);
        self.send(OutgoingMessage::Answer {
            to: peer_id.clone(),
            description,
            session_id,
        })
    }

    async fn on_answer(&self, data: AnswerData) -> Result<()> {
        let Some((connection, cancel_token)) = self.peer(&data.from).await else {
            debug!("answer from unknown peer {}", data.from);
            return Ok(());
        };
        let Some(mut description) = data.description else {
            return Ok(());
        };
        description.sdp = self.munge_remote(&description.sdp).await;
        let result =
            cancellable(&cancel_token, connection.set_remote_description(description)).await;
        self.report(&data.from, result)
    }

    async fn on_candidate(&self, data: CandidateData) -> Result<()> {
        let Some((connection, cancel_token)) = self.peer(&data.from).await else {
            debug!("candidate from unknown peer {}", data.from);
            return Ok(());
        };
        let Some(candidate) = data.candidate else {
            return Ok(());
        };
        let result = cancellable(&cancel_token, connection.add_ice_candidate(candidate)).await;
        self.report(&data.from, result)
    }

    async fn on_leave(&self, peer_id: PeerId) -> Result<()> {
        info!("leave: {}", peer_id);
        if self.remove_peer(&peer_id).await {
            self.emit(SignalingEvent::Leave { peer_id });
        }
        Ok(())
    }

    async fn on_bye(&self, data: ByeData) -> Result<()> {
        info!("bye: {:?}", data.session_id);
        let target = {
            let peers = self.peers.lock().await;
            [data.to.as_ref(), data.from.as_ref()]
                .into_iter()
                .flatten()
                .find(|id| peers.contains_key(*id))
                .cloned()
        };
        if let Some(peer_id) = target {
            self.remove_peer(&peer_id).await;
            let session_id = self.session_id().await;
            self.emit(SignalingEvent::CallEnd {
                peer_id: data.to.unwrap_or(peer_id),
                session_id,
            });
        }
        *self.session_id.lock().await = IDLE_SESSION_ID.to_string();
        Ok(())
    }

    /// Hangs up the current session.
    pub async fn bye(&self) -> Result<()> {
        let session_id = self.session_id().await;
        self.send(OutgoingMessage::Bye {
            session_id,
            from: self.self_id.clone(),
        })
    }

    pub async fn handle_peer_event(&self, event: PeerEvent) -> Result<()> {
        match event {
            PeerEvent::IceCandidate { peer_id, candidate } => {
                self.send_candidate(peer_id, candidate).await
            }
            PeerEvent::ConnectionStateChanged { peer_id, state } => {
                info!("[{}] connection state: {:?}", peer_id, state);
                match state {
                    ConnectionState::Connected => self.transition(&peer_id, PeerState::Connected).await,
                    ConnectionState::Failed | ConnectionState::Closed => {
                        self.transition(&peer_id, PeerState::Closed).await
                    }
                    _ => Ok(()),
                }
            }
            PeerEvent::TrackAdded { peer_id, track_id } => {
                self.emit(SignalingEvent::AddStream { peer_id, track_id });
                Ok(())
            }
            PeerEvent::TrackRemoved { peer_id, track_id } => {
                self.emit(SignalingEvent::RemoveStream { peer_id, track_id });
                Ok(())
            }
        }
    }

    async fn send_candidate(&self, peer_id: PeerId, candidate: IceCandidate) -> Result<()> {
        if !self.peers.lock().await.contains_key(&peer_id) {
            debug!("dropping candidate for closed peer {}", peer_id);
            return Ok(());
        }
        debug!(
            "local candidate for {}: {}",
            peer_id,
            candidate.candidate_type().unwrap_or("unknown")
        );
        let session_id = self.session_id().await;
        self.send(OutgoingMessage::Candidate {
            to: peer_id,
            candidate,
            session_id,
        })
    }

    fn report(&self, peer_id: &PeerId, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            error!("negotiation with {} failed: {}", peer_id, e);
            self.emit(SignalingEvent::Error {
                peer_id: Some(peer_id.clone()),
                error: e.to_string(),
            });
        }
        result
    }

    /// Closes every peer connection and cancels pending negotiation.
    pub async fn close(&self) {
        let peer_ids: Vec<PeerId> = self.peers.lock().await.keys().cloned().collect();
        for peer_id in peer_ids {
            self.remove_peer(&peer_id).await;
        }
        self.cancel_token.cancel();
    }
}
