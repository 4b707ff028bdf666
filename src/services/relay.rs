//! Loopback relay joining the buses of separate processes on one device.
//!
//! The host listens on a local TCP port and every display connects to it.
//! Each link carries newline-delimited JSON [`BusMessage`]s in both
//! directions and republishes what it reads into the local [`Bus`], so the
//! in-process channel stays the fan-out point inside each process.
//!
//! A link remembers which origins it has heard from its peer and never sends
//! their messages back over itself. In the host-centred star this keeps a
//! message from bouncing between processes.

use std::{collections::HashSet, io, net::SocketAddr, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::broadcast::error::RecvError,
    task::JoinHandle,
    time::sleep,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{dao::models::BusMessage, state::Bus};

const INITIAL_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Accept display links on `listener` until the task is dropped.
pub fn spawn_server(bus: Bus, listener: TcpListener) -> JoinHandle<()> {
    tokio::spawn(serve(bus, listener))
}

/// Keep a link to the host at `addr` open, reconnecting with backoff.
pub fn spawn_client(bus: Bus, addr: SocketAddr) -> JoinHandle<()> {
    tokio::spawn(connect(bus, addr))
}

async fn serve(bus: Bus, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                info!(%peer, "relay link accepted");
                let bus = bus.clone();
                tokio::spawn(async move {
                    if let Err(err) = link(bus, stream).await {
                        debug!(%peer, error = %err, "relay link failed");
                    }
                    info!(%peer, "relay link closed");
                });
            }
            Err(err) => {
                warn!(error = %err, "relay accept failed");
                sleep(INITIAL_DELAY).await;
            }
        }
    }
}

async fn connect(bus: Bus, addr: SocketAddr) {
    let mut delay = INITIAL_DELAY;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!(%addr, "relay connected to host");
                delay = INITIAL_DELAY;
                if let Err(err) = link(bus.clone(), stream).await {
                    warn!(%addr, error = %err, "relay link to host failed");
                } else {
                    info!(%addr, "relay link to host closed");
                }
            }
            Err(err) => {
                debug!(%addr, error = %err, "relay host unreachable");
            }
        }
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Pump messages both ways between `bus` and the peer behind `stream`.
///
/// Returns once the peer hangs up or the local bus closes.
async fn link(bus: Bus, stream: TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut local = bus.subscribe();
    let mut remote_origins: HashSet<Uuid> = HashSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(());
                };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<BusMessage>(&line) {
                    Ok(message) => {
                        // learned before publishing so the local echo is recognised
                        remote_origins.insert(message.origin());
                        bus.publish(message);
                    }
                    Err(err) => warn!(error = %err, "ignoring undecodable relay line"),
                }
            }
            received = local.recv() => match received {
                Ok(message) => {
                    if remote_origins.contains(&message.origin()) {
                        continue;
                    }
                    let mut line = match serde_json::to_string(&message) {
                        Ok(line) => line,
                        Err(err) => {
                            warn!(error = %err, "failed to encode bus message for relay");
                            continue;
                        }
                    };
                    line.push('\n');
                    writer.write_all(line.as_bytes()).await?;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "relay link lagged; peer waits for the next snapshot");
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}
