use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle_client::media::SyntheticMediaBackend;
use huddle_client::signaling::WsConnector;
use huddle_client::transport::WebRtcTransportFactory;
use huddle_client::{PeerLeftReason, SessionConfig, SessionController, SessionEvent};
use huddle_core::{IceServerConfig, PeerId, RoomId};
use huddle_server::{LogPresence, RegistryConfig, SignalingService, router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Multi-party call relay and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Seconds a dropped participant keeps its place in a room.
        #[arg(long, default_value_t = 30)]
        grace_secs: u64,

        #[arg(long, env = "TURN_URL")]
        turn_url: Option<String>,

        #[arg(long, env = "TURN_USERNAME")]
        turn_username: Option<String>,

        #[arg(long, env = "TURN_CREDENTIAL")]
        turn_credential: Option<String>,
    },
    /// Join a room with synthetic media and print what happens.
    Join {
        #[arg(long, default_value = "ws://127.0.0.1:3000")]
        url: String,

        #[arg(short, long)]
        room: String,

        /// Defaults to a random id.
        #[arg(short, long)]
        peer: Option<String>,

        /// Send the screen instead of the camera once joined.
        #[arg(long)]
        share_screen: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay {
            bind,
            grace_secs,
            turn_url,
            turn_username,
            turn_credential,
        } => {
            let ice_servers = turn_url
                .map(|url| {
                    vec![IceServerConfig {
                        urls: vec![url],
                        username: turn_username,
                        credential: turn_credential,
                    }]
                })
                .unwrap_or_default();
            run_relay(bind, grace_secs, ice_servers).await
        }
        Commands::Join {
            url,
            room,
            peer,
            share_screen,
        } => {
            let peer_id = peer.map(PeerId::from).unwrap_or_default();
            run_participant(url, RoomId::from(room), peer_id, share_screen).await
        }
    }
}

async fn run_relay(bind: SocketAddr, grace_secs: u64, ice_servers: Vec<IceServerConfig>) -> Result<()> {
    let config = RegistryConfig {
        grace_window: Duration::from_secs(grace_secs),
        ..Default::default()
    };
    if ice_servers.is_empty() {
        println!("{}", "No TURN server configured; peers rely on STUN only".yellow());
    }

    let service = SignalingService::new(config, ice_servers, Arc::new(LogPresence));
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    println!("{} {}", "Relay listening on".green().bold(), bind);
    info!("Signaling relay listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Relay server failed")?;

    println!("{}", "Relay stopped".cyan());
    Ok(())
}

async fn run_participant(url: String, room_id: RoomId, peer_id: PeerId, share_screen: bool) -> Result<()> {
    let controller = SessionController::new(
        SessionConfig::new(peer_id.clone()),
        Arc::new(SyntheticMediaBackend::new()),
        Arc::new(WsConnector::new(url)),
        Arc::new(WebRtcTransportFactory),
    );

    println!("{} {} as {}", "Joining".green().bold(), room_id, peer_id);
    let (handle, mut events) = controller
        .join(room_id.clone())
        .await
        .with_context(|| format!("Failed to join {}", room_id))?;

    if share_screen {
        handle
            .set_screen_share(true)
            .await
            .context("Failed to start screen share")?;
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Leaving...".cyan());
                handle.leave().await;
            }
            event = events.next() => match event {
                Some(SessionEvent::Terminated { error }) => {
                    match error {
                        Some(e) => println!("{} {}", "Session ended:".red().bold(), e),
                        None => println!("{}", "Left the room".green()),
                    }
                    break;
                }
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PeerJoined { peer_id } => {
            println!("{} {}", "+".green().bold(), peer_id);
        }
        SessionEvent::PeerLeft { peer_id, reason } => {
            let reason = match reason {
                PeerLeftReason::Failed(e) => e.to_string().red().to_string(),
                other => format!("{:?}", other),
            };
            println!("{} {} ({})", "-".red().bold(), peer_id, reason);
        }
        SessionEvent::TrackAdded { peer_id, kind } => {
            println!("  {} {} from {}", "track".cyan(), kind, peer_id);
        }
        SessionEvent::TrackRemoved { peer_id, kind } => {
            println!("  {} {} from {}", "untrack".cyan(), kind, peer_id);
        }
        SessionEvent::StatusChanged(status) => {
            println!("{} {:?}", "status".yellow().bold(), status);
        }
        SessionEvent::SignalingInterrupted => {
            println!("{}", "Relay connection lost, reconnecting".yellow());
        }
        SessionEvent::SignalingRestored { resumed } => {
            println!("{} (resumed: {})", "Relay connection restored".green(), resumed);
        }
        other => info!("{:?}", other),
    }
}
