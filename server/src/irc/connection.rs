use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::UserId;

use super::commands::{self, ClientRequest, CommandError};
use super::dispatcher::DispatcherHandle;
use super::formatter::Formatter;
use super::parser::IrcMessage;
use super::session::{DEFAULT_OUTBOUND_QUEUE, Session};

/// How long the writer gets to flush after the read loop ends.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection limits, taken from the `[limits]` config section.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    /// Maximum bytes per line, newline included.
    pub max_line_length: usize,
    /// Disconnect clients that send nothing for this long.
    pub idle_timeout: Duration,
    /// Lines queued per client before deliveries are dropped.
    pub outbound_queue: usize,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_line_length: 4096,
            idle_timeout: Duration::from_secs(300),
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
        }
    }
}

/// Read one line, capped at `max_len` bytes including the newline.
/// Returns Ok(0) on EOF, Ok(n) on success, Err on I/O error or line too long.
/// A final line without a newline is returned as is.
async fn read_bounded_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    buf: &mut String,
    max_len: usize,
) -> std::io::Result<usize> {
    let limit = max_len.max(1);
    let mut line = Vec::new();
    let n = (&mut *reader)
        .take(limit as u64)
        .read_until(b'\n', &mut line)
        .await?;
    if n == limit && line.last() != Some(&b'\n') {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "line exceeds maximum length",
        ));
    }
    buf.push_str(&String::from_utf8_lossy(&line));
    Ok(n)
}

/// Handle a single client connection from accept to close.
///
/// The connection registers with the dispatcher, forwards every translated
/// line to it, and always deregisters on the way out.
pub async fn handle_connection<S>(
    stream: S,
    id: UserId,
    peer: String,
    dispatcher: DispatcherHandle,
    formatter: Arc<Formatter>,
    limits: ConnectionLimits,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    info!(id, %peer, "client connected");

    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    let (out_tx, mut out_rx) = mpsc::channel::<String>(limits.outbound_queue.max(1));

    let write_handle = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            let data = format!("{line}\r\n");
            if writer.write_all(data.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let session = Session::new(id, peer.clone(), out_tx.clone());
    let Some(nickname) = dispatcher.connect(session).await else {
        return;
    };
    debug!(id, %nickname, "registered");

    let mut line_buf = String::new();
    loop {
        let read = tokio::time::timeout(
            limits.idle_timeout,
            read_bounded_line(&mut reader, &mut line_buf, limits.max_line_length),
        )
        .await;
        match read {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!(id, %peer, error = %e, "read failed");
                break;
            }
            Err(_) => {
                debug!(id, %peer, "idle timeout");
                let _ = out_tx.try_send("ERROR :Closing link (idle timeout)".into());
                break;
            }
        }

        let line = line_buf.trim_end().to_string();
        line_buf.clear();
        if line.is_empty() {
            continue;
        }

        let request = IrcMessage::parse(&line)
            .map_err(CommandError::from)
            .and_then(|msg| commands::translate(&msg));

        match request {
            Ok(ClientRequest::Command(kind)) => {
                if !dispatcher.command(id, kind) {
                    break;
                }
            }
            Ok(ClientRequest::Ping(token)) => {
                let _ = out_tx.try_send(formatter.pong(&token));
            }
            Ok(ClientRequest::Quit(reason)) => {
                let _ = out_tx.try_send(format!(
                    "ERROR :Closing link ({})",
                    reason.as_deref().unwrap_or("Client quit")
                ));
                break;
            }
            Err(e) => {
                dispatcher.reject(id, e);
            }
        }
    }

    dispatcher.disconnect(id);
    drop(out_tx);
    let _ = tokio::time::timeout(WRITER_DRAIN_TIMEOUT, write_handle).await;
    info!(id, %peer, "client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_bounded_line() {
        let data: &[u8] = b"NICK alice\r\nJOIN lounge\n";
        let mut reader = BufReader::new(data);
        let mut buf = String::new();

        assert_eq!(read_bounded_line(&mut reader, &mut buf, 64).await.unwrap(), 12);
        assert_eq!(buf, "NICK alice\r\n");
        buf.clear();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 64).await.unwrap(), 12);
        assert_eq!(buf, "JOIN lounge\n");
        buf.clear();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 64).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_bounded_line_rejects_long_lines() {
        let data = vec![b'a'; 128];
        let mut reader = BufReader::with_capacity(256, data.as_slice());
        let mut buf = String::new();
        let err = read_bounded_line(&mut reader, &mut buf, 32).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_read_bounded_line_rejects_long_line_with_newline_buffered() {
        let mut data = vec![b'a'; 100];
        data.push(b'\n');
        let mut reader = BufReader::new(data.as_slice());
        let mut buf = String::new();
        let err = read_bounded_line(&mut reader, &mut buf, 32).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_read_bounded_line_accepts_line_at_limit() {
        let data: &[u8] = b"JOIN ab\n";
        let mut reader = BufReader::new(data);
        let mut buf = String::new();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 8).await.unwrap(), 8);
        assert_eq!(buf, "JOIN ab\n");
    }

    #[tokio::test]
    async fn test_read_bounded_line_joins_split_writes() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);
        let mut buf = String::new();

        let writer = tokio::spawn(async move {
            client.write_all(b"NICK al").await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            client.write_all(b"ice\r\n").await.unwrap();
            client
        });

        let n = tokio::time::timeout(
            Duration::from_secs(2),
            read_bounded_line(&mut reader, &mut buf, 64),
        )
        .await
        .expect("line split across writes was never completed")
        .unwrap();
        assert_eq!(n, 12);
        assert_eq!(buf, "NICK alice\r\n");
        drop(writer.await.unwrap());
    }

    #[tokio::test]
    async fn test_read_bounded_line_limit_spans_split_writes() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = BufReader::new(server);
        let mut buf = String::new();

        let writer = tokio::spawn(async move {
            client.write_all(b"PRIVMSG lounge ").await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            client.write_all(b":far too long\r\n").await.unwrap();
            client
        });

        let err = tokio::time::timeout(
            Duration::from_secs(2),
            read_bounded_line(&mut reader, &mut buf, 20),
        )
        .await
        .expect("read never completed")
        .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
        drop(writer.await.unwrap());
    }
}
