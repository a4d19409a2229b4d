//! # Stepline Node
//!
//! Device-side daemon. Starts the pulse engine over a zero-initialized
//! shared region, connects out to the operator console, and relays every
//! received motion command into the region behind the commit semaphore.
//!
//! The session event channel is consumed here, on the main thread, which
//! is the single-threaded owner of the relay, so update calls are
//! serialized by construction.

use std::path::PathBuf;
use std::sync::mpsc;

use clap::Parser;
use tracing::{debug, error, info, warn};

use stepline_common::{ConfigLoader, ContentKind, MotionCommand, init_tracing};
use stepline_relay::{CommandRelay, PulseEngine, RemoteprocPulseEngine, SharedMemoryRegion};
use stepline_transport::{SessionEvent, SessionTransport};

mod config;

use config::NodeConfig;

/// Reply label confirming a command reached the pulse engine.
const ACK_LABEL: &str = "pulse parameters applied";

#[derive(Debug, Parser)]
#[command(name = "stepline-node", about = "Stepline device-side daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "stepline_node.toml")]
    config: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("stepline-node: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = NodeConfig::load(&args.config)?;
    config.validate()?;
    init_tracing(config.shared.log_level);
    info!(service = %config.shared.service_name, "stepline-node starting");

    // Region and engine first: a dead region means no session at all.
    let region = SharedMemoryRegion::open(&config.relay.region_path)?;
    let engine = RemoteprocPulseEngine::new(&config.relay.engine_control_dir);
    let relay = CommandRelay::start(region, engine, &config.relay.program_image)?;

    let (events_tx, events_rx) = mpsc::channel();
    let transport = SessionTransport::connect(config.endpoint.to_addr_string(), events_tx);

    serve(relay, &transport, &events_rx);

    transport.shutdown();
    info!("stepline-node exiting");
    Ok(())
}

/// Consume session events until the session or the pulse session ends.
///
/// The engine is stopped only through the shutdown sentinel; every other
/// exit path leaves it executing the last committed parameters.
fn serve<R, E>(
    mut relay: CommandRelay<R, E>,
    transport: &SessionTransport,
    events: &mpsc::Receiver<SessionEvent>,
) where
    R: stepline_relay::CommandRegion,
    E: PulseEngine,
{
    for event in events {
        match event {
            SessionEvent::Message(cmd) => match cmd.content_kind {
                ContentKind::UserData => {
                    info!(label = %cmd.label, "command received: {}", cmd.to_display_string());
                    if let Err(e) = relay.apply(&cmd) {
                        error!(error = %e, "relay update failed, ending session");
                        return;
                    }
                    if relay.is_ended() {
                        info!("pulse session ended by operator");
                        return;
                    }
                    if let Err(e) = transport.send(&MotionCommand::user_data(ACK_LABEL)) {
                        warn!(error = %e, "ack not delivered");
                    }
                }
                ContentKind::RemoteConnect => {
                    info!("operator console connected");
                }
                ContentKind::RemoteDisconnect => {
                    info!("operator console disconnected");
                    return;
                }
                ContentKind::NoData => {
                    debug!("empty message ignored");
                }
            },
            SessionEvent::Ended { error } => {
                match error {
                    Some(e) => error!(error = %e, "session terminated"),
                    None => info!("session closed"),
                }
                return;
            }
        }
    }
}
