// One line-protocol session over any byte stream

use crate::comm::error::{CommError, Result};
use crate::comm::lines::{Line, read_line_bounded};
use crate::gateway::Gateway;
use crate::protocol::{Response, encode_response};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Serve requests from `reader` until EOF, writing responses to `writer`
///
/// Each line is handled in its own task so a slow request does not hold up
/// the ones behind it. A single writer task owns `writer`, keeping every
/// response on its own line. Returns after the last in-flight response is
/// written.
pub async fn serve_lines<R, W>(reader: R, writer: W, gateway: Arc<Gateway>, peer: &str) -> Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Response>(256);
    let writer_handle = tokio::spawn(write_responses(writer, rx));

    let max_line_bytes = gateway.max_line_bytes();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    let read_result = loop {
        let line = match read_line_bounded(&mut reader, &mut buf, max_line_bytes).await {
            Ok(line) => line,
            Err(e) => break Err(CommError::ReadError(e.to_string())),
        };

        match line {
            Line::Eof => break Ok(()),
            Line::TooLong(len) => {
                let response = Gateway::oversized(len, max_line_bytes);
                if tx.send(response).await.is_err() {
                    break Ok(());
                }
            }
            Line::Text(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                let gateway = Arc::clone(&gateway);
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(response) = gateway.handle_line(&text).await {
                        if tx.send(response).await.is_err() {
                            debug!("response dropped, writer closed");
                        }
                    }
                });
            }
        }
    };

    // The writer ends once every in-flight task has dropped its sender
    drop(tx);
    match writer_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(peer = %peer, error = %e, "response writer stopped"),
        Err(e) => warn!(peer = %peer, error = %e, "response writer task failed"),
    }

    debug!(peer = %peer, "session closed");
    read_result
}

async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<Response>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let line = encode_response(&response).map_err(|e| CommError::EncodeError(e.to_string()))?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| CommError::WriteError(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| CommError::WriteError(e.to_string()))?;
    }
    Ok(())
}

/// Serve the line protocol on stdin/stdout until stdin closes
pub async fn serve_stdio(gateway: Arc<Gateway>) -> Result<()> {
    serve_lines(tokio::io::stdin(), tokio::io::stdout(), gateway, "stdio").await
}
