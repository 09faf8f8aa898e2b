use super::client::{SignalingChannels, SignalingClient};
use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Connects to the signaling server at `url` and runs the client over it.
pub async fn connect(
    url: &str,
    client: Arc<SignalingClient>,
    channels: SignalingChannels,
    keepalive: Duration,
) -> Result<()> {
    let (ws, _) = connect_async(url)
        .await
        .map_err(|e| anyhow!("signaling connect to {} failed: {}", url, e))?;
    info!("signaling connected: {}", url);
    serve(ws, client, channels, keepalive).await
}

/// Pumps one WebSocket: incoming frames go to the client, queued outgoing
/// messages go out, and a keepalive is sent every `keepalive`. Returns when the
/// socket closes or the client's token is cancelled; all peers are closed then.
pub async fn serve<S>(
    ws: WebSocketStream<S>,
    client: Arc<SignalingClient>,
    channels: SignalingChannels,
    keepalive: Duration,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut sender, mut receiver) = ws.split();
    let SignalingChannels {
        mut outgoing,
        mut peer_events,
    } = channels;
    let token = client.cancel_token.clone();
    let mut ticker = interval_at(Instant::now() + keepalive, keepalive);

    client.announce()?;

    let result = loop {
        select! {
            _ = token.cancelled() => {
                info!("signaling cancelled, closing socket");
                // flush whatever was queued before cancel, e.g. a final bye
                while let Ok(message) = outgoing.try_recv() {
                    if let Ok(text) = message.to_json() {
                        sender.send(Message::Text(text.into())).await.ok();
                    }
                }
                sender.send(Message::Close(None)).await.ok();
                break Ok(());
            }
            message = receiver.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = client.handle_text(text.as_str()).await {
                        error!("failed to handle signaling message: {}", e);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!("signaling socket closed by server: {:?}", frame);
                    break Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    break Err(anyhow!("signaling socket error: {}", e));
                }
                None => {
                    info!("signaling socket ended");
                    break Ok(());
                }
            },
            Some(message) = outgoing.recv() => {
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("failed to serialize signaling message: {}", e);
                        continue;
                    }
                };
                debug!("send: {}", text);
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    break Err(anyhow!("failed to send signaling message: {}", e));
                }
            }
            Some(event) = peer_events.recv() => {
                if let Err(e) = client.handle_peer_event(event).await {
                    warn!("failed to handle peer event: {}", e);
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = client.keepalive() {
                    warn!("keepalive failed: {}", e);
                }
            }
        }
    };

    client.close().await;
    result
}
