use anyhow::Result;
use clap::Parser;
use rtcsignal::config::{Cli, Config};
use rtcsignal::event::SignalingEvent;
use rtcsignal::sdp::MediaKind;
use rtcsignal::signaling::{transport, PeerId, SignalingClient, SignalingClientBuilder, WebrtcPeerFactory};
use rtcsignal::version;
use std::fs::File;
use std::sync::Arc;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, level_filters::LevelFilter, warn};

/// Logs client events and places the configured call once the callee shows
/// up in the peer list.
async fn watch_events(client: Arc<SignalingClient>, callee: Option<PeerId>, media: MediaKind) {
    let mut events = client.subscribe();
    let mut called = false;
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(n)) => {
                warn!("event watcher lagged, {} events dropped", n);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            SignalingEvent::Peers { ref peers, .. } => {
                info!("peers online: {}", peers.len());
                let Some(ref callee) = callee else {
                    continue;
                };
                if !called && peers.iter().any(|peer| &peer.id == callee) {
                    called = true;
                    if let Err(e) = client.invite(callee.clone(), media).await {
                        error!("failed to call {}: {}", callee, e);
                    }
                }
            }
            SignalingEvent::Error { peer_id, error } => {
                warn!("negotiation error with {:?}: {}", peer_id, error);
            }
            event => info!("event: {:?}", event),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let cli = Cli::parse();
    let mut config = match cli.conf {
        Some(ref conf) => Config::load(conf)?,
        None => Config::default(),
    };
    if let Some(url) = cli.url {
        config.signaling.url = url;
    }

    let mut log_fmt = tracing_subscriber::fmt();
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    let mut _guard = None;
    if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file)
            .map_err(|e| anyhow::anyhow!("{}: {}", e, log_file))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        _guard = Some(guard);
        log_fmt.with_writer(non_blocking).try_init().ok();
    } else {
        log_fmt.try_init().ok();
    }

    let url = config.signaling.validate()?;
    let factory = Arc::new(WebrtcPeerFactory::new(config.signaling.ice_servers()));
    let (client, channels) = SignalingClientBuilder::new(config.signaling.name.clone())
        .with_options(config.sdp.clone())
        .with_factory(factory)
        .build()?;
    let client = Arc::new(client);

    let media = if cli.video {
        MediaKind::Video
    } else {
        MediaKind::Audio
    };
    tokio::spawn(watch_events(
        client.clone(),
        cli.call.map(PeerId::new),
        media,
    ));

    info!(
        "Starting rtcsignal {} as {} on {}",
        version::get_short_version(),
        client.self_id(),
        url
    );
    let serve = transport::connect(
        url.as_str(),
        client.clone(),
        channels,
        config.signaling.keepalive(),
    );
    tokio::pin!(serve);

    select! {
        result = &mut serve => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received CTRL+C, shutting down");
            client.bye().await.ok();
            client.cancel_token.cancel();
            serve.await?;
        }
    }
    Ok(())
}
