//! # Stepline Console
//!
//! Operator-side console, headless. Listens on the deployment endpoint for
//! the single device node, turns the configured axis-control state into one
//! motion command, sends it once the node is connected, and prints the
//! node's replies. `quit` (or stdin EOF) sends the close-down command
//! carrying the shutdown sentinel and ends the session.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use tracing::{debug, error, info, warn};

use stepline_common::{
    AxisCommand, Calibration, CommandError, ContentKind, GlobalEnable, MotionCommand,
    ConfigLoader, init_tracing,
};
use stepline_transport::{SessionEvent, SessionTransport};

mod config;

use config::{CommandSection, ConsoleConfig, SpeedUnit};

#[derive(Debug, Parser)]
#[command(name = "stepline-console", about = "Stepline operator console")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "stepline_console.toml")]
    config: PathBuf,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("stepline-console: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = ConsoleConfig::load(&args.config)?;
    config.validate()?;
    init_tracing(config.shared.log_level);
    info!(service = %config.shared.service_name, "stepline-console starting");

    // Build and vet the command before touching the network: a zero speed
    // must never produce a wire message.
    let command = build_command(&config.command, "operator command")?;
    info!("prepared {}", command.to_display_string());

    let (events_tx, events_rx) = mpsc::channel();
    let transport = Arc::new(SessionTransport::listen(
        config.endpoint.to_addr_string(),
        events_tx,
    )?);
    info!(endpoint = %config.endpoint.to_addr_string(), "waiting for the node");

    serve(&config.command, &command, &transport, &events_rx);

    transport.shutdown();
    info!("stepline-console exiting");
    Ok(())
}

/// Event loop: greet-driven send, reply printing, operator close-down.
fn serve(
    section: &CommandSection,
    command: &MotionCommand,
    transport: &Arc<SessionTransport>,
    events: &mpsc::Receiver<SessionEvent>,
) {
    let mut watcher_started = false;

    for event in events {
        match event {
            SessionEvent::Message(msg) => match msg.content_kind {
                ContentKind::RemoteConnect => {
                    info!("node connected");
                    if let Err(e) = transport.send(command) {
                        error!(error = %e, "command send failed");
                        return;
                    }
                    info!("command sent");
                    if !watcher_started {
                        spawn_quit_watcher(section, Arc::clone(transport));
                        watcher_started = true;
                    }
                }
                ContentKind::UserData => {
                    info!(label = %msg.label, "reply from node");
                }
                ContentKind::RemoteDisconnect => {
                    info!("node disconnected");
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

/// Watch stdin; on `quit` or EOF send the close-down command (shutdown
/// sentinel set) best-effort and shut the transport down.
fn spawn_quit_watcher(section: &CommandSection, transport: Arc<SessionTransport>) {
    let close_down = match build_command(section, "operator close-down") {
        Ok(mut cmd) => {
            cmd.all_axes_enable = GlobalEnable::Shutdown;
            cmd
        }
        // The live command already validated; defaults are safe here.
        Err(_) => {
            let mut cmd = MotionCommand::user_data("operator close-down");
            cmd.all_axes_enable = GlobalEnable::Shutdown;
            cmd
        }
    };

    thread::Builder::new()
        .name("console-stdin".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(l) if l.trim().eq_ignore_ascii_case("quit") => break,
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
            info!("close-down requested");
            if let Err(e) = transport.send(&close_down) {
                warn!(error = %e, "close-down command not delivered");
            }
            transport.shutdown();
        })
        .expect("spawning console-stdin thread");
}

/// Pure function from operator axis-control state to one motion command.
///
/// Rejects any zero speed (all-or-nothing) before conversion, then maps Hz
/// to cycles when the operator works in Hz.
fn build_command(section: &CommandSection, label: &str) -> Result<MotionCommand, CommandError> {
    for (i, axis) in section.axis.iter().enumerate() {
        if axis.speed == 0 {
            return Err(CommandError::InvalidSpeed { axis: i });
        }
    }

    let cal = Calibration::new(section.seconds_per_cycle);
    let mut cmd = MotionCommand::user_data(label);
    cmd.all_axes_enable = if section.all_axes_enable {
        GlobalEnable::Enabled
    } else {
        GlobalEnable::Disabled
    };
    for (slot, axis) in cmd.axes.iter_mut().zip(&section.axis) {
        *slot = AxisCommand {
            enabled: axis.enabled,
            direction: axis.direction,
            period: match section.speed_unit {
                SpeedUnit::Cycles => axis.speed,
                SpeedUnit::Hz => cal.hz_to_cycles(axis.speed),
            },
        };
    }
    cmd.validate_for_send()?;
    Ok(cmd)
}
