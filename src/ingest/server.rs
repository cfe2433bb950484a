//! Unix socket listener for producer events
//!
//! One task per connection. Each connection is a stream of newline-delimited
//! messages; a bad message is counted and skipped, a bad connection is
//! closed, and neither affects the listener.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::{IngestCounters, TransferQueue};
use crate::core::{IngestConfig, Result, ShutdownSignal, SystemClock, TidepoolError, WallClock};
use crate::event::{decode_line, DecodeError};

/// Delay before retrying after a failed accept (e.g. descriptor exhaustion)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Clone)]
struct ConnectionContext {
    queue: Arc<TransferQueue>,
    counters: Arc<IngestCounters>,
    max_message_bytes: usize,
    read_timeout: Duration,
}

pub struct IngestServer {
    listener: UnixListener,
    path: PathBuf,
    grace: Duration,
    ctx: ConnectionContext,
}

impl IngestServer {
    /// Bind the event socket, replacing a stale socket file left by a
    /// previous run
    ///
    /// Must be called from within a Tokio runtime. Failure here is fatal to
    /// the viewer.
    pub fn bind(
        config: &IngestConfig,
        queue: Arc<TransferQueue>,
        counters: Arc<IngestCounters>,
    ) -> Result<Self> {
        let path = config.socket_path.clone();
        let bind_error = |source| TidepoolError::Bind {
            path: path.clone(),
            source,
        };

        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = ?path, "Removed stale socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(bind_error(e)),
        }

        let listener = UnixListener::bind(&path).map_err(bind_error)?;
        info!(path = ?path, "Event socket bound");

        Ok(Self {
            listener,
            path: path.clone(),
            grace: Duration::from_millis(config.shutdown_grace_ms),
            ctx: ConnectionContext {
                queue,
                counters,
                max_message_bytes: config.max_message_bytes,
                read_timeout: Duration::from_millis(config.read_timeout_ms),
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until shutdown, then give in-flight connections
    /// the grace period to finish and remove the socket file
    pub async fn serve(self, shutdown: ShutdownSignal) -> Result<()> {
        let IngestServer {
            listener,
            path,
            grace,
            ctx,
        } = self;
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let id = ctx.counters.connection_opened();
                        debug!(connection = id, "Producer connected");
                        connections.spawn(handle_connection(id, stream, ctx.clone(), shutdown.clone()));
                    }
                    Err(e) => {
                        ctx.counters.connection_failed();
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!(error = %e, "Connection task failed");
                    }
                }
            }
        }

        drop(listener);
        info!(in_flight = connections.len(), "Event socket closing");

        let drained = timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                "Connections still open after grace period, aborting"
            );
            connections.abort_all();
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?path, error = %e, "Failed to remove socket file"),
        }
        info!("Event socket closed");
        Ok(())
    }
}

/// Read newline-delimited messages until EOF, an I/O error, an oversized
/// message, or a quiet read after shutdown
async fn handle_connection(
    id: u64,
    stream: UnixStream,
    ctx: ConnectionContext,
    shutdown: ShutdownSignal,
) {
    let mut reader = BufReader::new(stream);
    let mut buf: Vec<u8> = Vec::with_capacity(1024);
    let max = ctx.max_message_bytes;

    loop {
        // Allows one byte past the limit so an oversized line is detectable
        let remaining = (max + 1).saturating_sub(buf.len()) as u64;
        let read = timeout(
            ctx.read_timeout,
            (&mut reader).take(remaining).read_until(b'\n', &mut buf),
        )
        .await;

        match read {
            // Partial bytes stay in `buf`; a silent producer is not an error
            Err(_elapsed) => {
                if shutdown.is_triggered() {
                    if !buf.is_empty() {
                        debug!(connection = id, bytes = buf.len(), "Discarding partial message at shutdown");
                    }
                    break;
                }
            }
            Ok(Err(e)) => {
                ctx.counters.connection_failed();
                warn!(connection = id, error = %e, "Connection read failed");
                break;
            }
            Ok(Ok(0)) => {
                if !buf.is_empty() {
                    process_line(id, &buf, &ctx);
                }
                break;
            }
            Ok(Ok(_)) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                    process_line(id, &buf, &ctx);
                    buf.clear();
                } else if buf.len() > max {
                    ctx.counters.decode_failed();
                    let error = DecodeError::TooLarge { len: buf.len(), max };
                    warn!(connection = id, error = %error, "Closing connection after oversized message");
                    break;
                }
                // Otherwise EOF arrived mid-line; the next read returns 0
            }
        }
    }

    debug!(connection = id, "Producer disconnected");
}

fn process_line(id: u64, line: &[u8], ctx: &ConnectionContext) {
    if line.iter().all(u8::is_ascii_whitespace) {
        return;
    }
    match decode_line(line, ctx.max_message_bytes, SystemClock.unix_secs()) {
        Ok(event) => {
            debug!(connection = id, kind = %event.kind(), agent_id = event.agent_id(), "Event received");
            ctx.counters.message_accepted();
            ctx.queue.push(event);
        }
        Err(e) => {
            ctx.counters.decode_failed();
            warn!(connection = id, error = %e, "Discarding malformed message");
        }
    }
}
