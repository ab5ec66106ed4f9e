//! ANCS relay trace player
//!
//! Replays a captured notification session through the full relay pipeline:
//! frames from the trace are fed in as if they came from the link, attribute
//! requests go to a loopback control point that logs them, and completed
//! notifications are printed to the terminal.

use ancs_relay::{
    hex_dump, parse_trace, ControlPoint, DisplayLoop, LinkState, NotificationRelay,
    NotificationView, Presenter, RelayConfig, TraceDirective,
};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "ancs-relay")]
#[command(about = "Replay an ANCS frame trace through the notification relay")]
struct Args {
    /// Trace file with `ns`, `ds`, `link` and `wait` directives
    #[arg(value_name = "TRACE")]
    trace: PathBuf,

    /// JSON configuration file (defaults apply to missing fields)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override how long each notification stays on screen, in milliseconds
    #[arg(long)]
    hold_ms: Option<u64>,

    /// Log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Control point that only logs what would be written to the peer
struct LoopbackControlPoint;

#[async_trait::async_trait]
impl ControlPoint for LoopbackControlPoint {
    async fn write(&self, frame: &[u8]) -> ancs_relay::Result<()> {
        info!("→ control point: {}", hex_dump(frame, 32));
        Ok(())
    }
}

/// Presenter that prints to stdout
struct TerminalPresenter {
    last_standby: Option<LinkState>,
}

impl Presenter for TerminalPresenter {
    fn show(&mut self, view: &NotificationView) {
        self.last_standby = None;
        let marker = if view.call { "📞" } else { "💬" };
        println!(
            "{} [{}] {}  {}: {}",
            marker, view.time, view.application, view.title, view.body
        );
    }

    fn standby(&mut self, state: &LinkState) {
        if self.last_standby.as_ref() != Some(state) {
            println!("   {}", state);
            self.last_standby = Some(state.clone());
        }
    }
}

async fn replay(relay: &NotificationRelay, directives: Vec<TraceDirective>) {
    for directive in directives {
        match directive {
            TraceDirective::Event(frame) => {
                debug!("← notification source: {}", hex_dump(&frame, 16));
                relay.submit_event_frame(&frame);
            }
            TraceDirective::Response(frame) => {
                debug!("← data source: {}", hex_dump(&frame, 32));
                relay.submit_response_frame(&frame);
            }
            TraceDirective::Link(state) => relay.set_link_state(state),
            TraceDirective::Wait(duration) => sleep(duration).await,
        }
        // Let the fetch worker and display observe each frame.
        tokio::task::yield_now().await;
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    let mut config = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };
    if let Some(hold_ms) = args.hold_ms {
        config.display_hold_ms = hold_ms;
    }

    let trace = tokio::fs::read_to_string(&args.trace).await?;
    let directives = parse_trace(&trace)?;
    info!(
        "Replaying {} directives from {}",
        directives.len(),
        args.trace.display()
    );

    let (relay, fetch_worker) = NotificationRelay::new(config)?;
    let fetch_handle = tokio::spawn(fetch_worker.run(Arc::new(LoopbackControlPoint)));

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let display = DisplayLoop::new(
        Arc::clone(&relay),
        TerminalPresenter { last_standby: None },
    );
    let display_handle = tokio::spawn(display.run(shutdown_rx));

    replay(&relay, directives).await;

    // Wait for the display to get through every completed notification. An
    // active call holds the screen, so nothing else would be shown.
    while relay.active_call().is_none()
        && relay
            .unpresented_records()
            .iter()
            .any(|record| record.complete)
    {
        sleep(Duration::from_millis(50)).await;
    }

    let _ = shutdown_tx.send(()).await;
    display_handle.await?;

    let records = relay.snapshot();
    let call = relay.active_call();
    info!(
        "Done: {} stored, {} completed, call {}",
        records.len(),
        relay.completed_count(),
        call.map(|c| format!("{:#010x}", c.id))
            .unwrap_or_else(|| "none".to_string())
    );

    drop(relay);
    fetch_handle.await?;

    Ok(())
}
