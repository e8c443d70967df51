//! The between-ticks loop: receive a frame, dispatch its events, run one
//! tick, emit the decision. Engine state is only ever touched from here,
//! one frame at a time.

use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::Engine;
use crate::error::WireError;
use crate::proto::{Decision, Event, EventFrame};
use crate::transport::Transport;

/// Dispatch every event of `frame`, then run the tick for its virtual time.
/// Undecodable or rejected events are logged and skipped; the decision is
/// produced regardless.
pub fn process_frame(engine: &mut Engine, frame: EventFrame) -> Decision {
    let vtime = frame.vtime;
    for raw in frame.events {
        match Event::from_value(raw) {
            Ok(event) => {
                if let Err(err) = engine.apply(event) {
                    warn!(vtime, %err, "event rejected");
                }
            }
            Err(err) => warn!(vtime, %err, "event not decodable"),
        }
    }
    engine.tick(vtime)
}

/// Connect to the event producer and serve decisions until the peer closes
/// the stream or a termination signal arrives.
pub async fn run(config: Config) -> Result<(), WireError> {
    let mut engine = Engine::new(config.cpus, config.quantum);

    info!(
        socket = %config.socket.display(),
        cpus = config.cpus,
        quantum = config.quantum,
        metadata = config.metadata,
        "connecting to event stream"
    );
    let mut transport = Transport::connect(&config.socket).await?;
    info!("connected, waiting for event frames");

    let mut sigterm = signal(SignalKind::terminate())?;
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("terminate received, shutting down");
                break;
            }
            line = transport.recv_line() => line?,
        };
        let Some(line) = line else {
            info!("event stream closed by peer");
            break;
        };
        if line.is_empty() {
            continue;
        }

        let frame: EventFrame = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(%err, "frame not decodable");
                continue;
            }
        };

        let mut decision = process_frame(&mut engine, frame);
        if !config.metadata {
            decision.meta = None;
        }
        debug!(vtime = decision.vtime, schedule = ?decision.schedule, "tick");
        transport.send_json(&decision).await?;
    }
    Ok(())
}
