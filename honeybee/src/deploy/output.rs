//! Subprocess output streaming

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::deploy::compose::CombinedOutput;

/// Turn one raw line (newline included) into published text.
///
/// A bare newline is dropped. Invalid UTF-8 is replaced.
pub fn decode_line(raw: &[u8]) -> Option<String> {
    if raw == b"\n" {
        return None;
    }
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    Some(String::from_utf8_lossy(line).into_owned())
}

/// Forward every line of `reader` into `tx` until end of stream.
///
/// The receiver sees `None` once every pump holding a sender has finished.
pub fn spawn_line_pump<R>(reader: R, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer).await {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(line) = decode_line(&buffer) {
                        if tx.send(line).is_err() {
                            debug!("Output receiver dropped");
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("Error reading subprocess output: {}", e);
                    break;
                }
            }
        }
    })
}

/// Forward a spawned child's output into `tx`
#[cfg(unix)]
pub fn pump_output(output: CombinedOutput, tx: mpsc::UnboundedSender<String>) {
    spawn_line_pump(output, tx);
}

#[cfg(not(unix))]
pub fn pump_output(output: CombinedOutput, tx: mpsc::UnboundedSender<String>) {
    if let Some(stdout) = output.stdout {
        spawn_line_pump(stdout, tx.clone());
    }
    if let Some(stderr) = output.stderr {
        spawn_line_pump(stderr, tx);
    }
}

/// Receive lines until every pump is done
pub async fn collect_lines(mut rx: mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line);
    }
    lines
}
