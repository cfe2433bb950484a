//! Hook sender - forwards one producer hook payload to a running viewer
//!
//! Reads the hook JSON from stdin, converts it into a wire message and
//! writes it to the event socket. A missing or unresponsive viewer is not
//! an error: the producer must never be slowed down by it.

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tidepool::core::config::{DEFAULT_SOCKET_PATH, SOCKET_ENV_VAR};
use tidepool::core::{SystemClock, WallClock};
use tidepool::event::{encode_line, hook::event_from_hook};

const SEND_TIMEOUT: Duration = Duration::from_secs(1);

fn socket_path() -> PathBuf {
    std::env::var_os(SOCKET_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
}

// One line per process, so a blocking socket with a write timeout is all the hook needs
fn send(path: &Path, line: &str) -> std::io::Result<()> {
    let mut stream = UnixStream::connect(path)?;
    stream.set_write_timeout(Some(SEND_TIMEOUT))?;
    stream.write_all(line.as_bytes())?;
    stream.flush()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let mut input = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut input) {
        debug!(%err, "Cannot read hook payload");
        return;
    }
    let hook: Value = match serde_json::from_str(&input) {
        Ok(hook) => hook,
        Err(err) => {
            debug!(%err, "Hook payload is not JSON");
            return;
        }
    };
    let Some(event) = event_from_hook(&hook, SystemClock.unix_secs()) else {
        debug!("Hook ignored");
        return;
    };
    let line = match encode_line(&event) {
        Ok(line) => line,
        Err(err) => {
            debug!(%err, "Cannot encode event");
            return;
        }
    };
    if let Err(err) = send(&socket_path(), &line) {
        debug!(%err, "Viewer not reachable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::os::unix::net::UnixListener;

    fn scratch_socket(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tidepool-hook-{}-{}.sock", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_send_delivers_one_line() {
        let path = scratch_socket("deliver");
        let listener = UnixListener::bind(&path).unwrap();
        send(&path, "{\"type\":\"agent_start\"}\n").unwrap();

        let (stream, _) = listener.accept().unwrap();
        let mut received = String::new();
        std::io::BufReader::new(stream).read_line(&mut received).unwrap();
        assert_eq!(received, "{\"type\":\"agent_start\"}\n");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_send_without_viewer_fails_fast() {
        let path = scratch_socket("missing");
        assert!(send(&path, "{}\n").is_err());
    }
}
