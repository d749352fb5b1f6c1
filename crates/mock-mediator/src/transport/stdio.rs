//! Newline-delimited JSON transport over a byte stream (stdin/stdout for the binary).
//!
//! Inbound frames: `{"id": "<correlation id>", "data": "<raw envelope>"}`.
//! `data` may also be an inline JSON object, which is re-serialized before decoding.
//! Outbound frames: `{"id": "<correlation id>", "message": {"type": ..., "payload": ...}}`.
//! Ignored envelopes produce no outbound frame. A frame reusing the id of a
//! frame still awaiting its reply is skipped.

use super::TransportEvent;
use crate::channel::CorrelationId;
use crate::codec::OutboundMessage;
use crate::mediator::Mediator;
use futures::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

/// Upper bound on a single inbound frame.
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct InboundFrame {
    id: String,
    data: Value,
}

#[derive(Debug, Serialize)]
struct OutboundFrame<'a> {
    id: &'a str,
    message: &'a OutboundMessage,
}

/// Serve the mediator over stdin/stdout until stdin closes.
pub async fn serve_stdio(mediator: Arc<Mediator>) -> anyhow::Result<()> {
    serve_lines(mediator, tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(())
}

/// Serve the mediator over any line-oriented byte stream. Returns the writer
/// once every in-flight reply has been flushed.
pub async fn serve_lines<R, W>(mediator: Arc<Mediator>, reader: R, writer: W) -> anyhow::Result<W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let hub = mediator.hub();
    let (events, receiver) = mpsc::channel::<TransportEvent>(64);
    let (lines_out, mut lines_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(mediator.serve(receiver));

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = lines_rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<W, std::io::Error>(writer)
    });

    let mut frames = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_BYTES));
    let mut forwarders = JoinSet::new();
    let in_flight: Arc<Mutex<HashSet<CorrelationId>>> = Arc::default();
    let mut accepted = 0usize;

    while let Some(line) = frames.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("Skipping frame larger than {} bytes", MAX_FRAME_BYTES);
                continue;
            }
            Err(LinesCodecError::Io(e)) => {
                warn!("Failed to read from transport: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let frame: InboundFrame = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping invalid transport frame: {}", e);
                continue;
            }
        };

        let correlation_id = CorrelationId::from(frame.id);
        if !in_flight.lock().insert(correlation_id.clone()) {
            warn!("Skipping frame {}: a reply for that id is still pending", correlation_id);
            continue;
        }
        let data = match frame.data {
            Value::String(raw) => raw,
            other => other.to_string(),
        };

        let reply = match hub.register(correlation_id.clone()) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Skipping frame: {}", e);
                in_flight.lock().remove(&correlation_id);
                continue;
            }
        };
        let out = lines_out.clone();
        let id = correlation_id.clone();
        let in_flight_ids = Arc::clone(&in_flight);
        forwarders.spawn(async move {
            let reply = reply.await;
            in_flight_ids.lock().remove(&id);
            let Ok(message) = reply else {
                debug!("No verdict for {}", id);
                return;
            };
            let frame = OutboundFrame {
                id: id.as_str(),
                message: &message,
            };
            match serde_json::to_string(&frame) {
                Ok(line) => {
                    let _ = out.send(line);
                }
                Err(e) => warn!("Failed to encode verdict for {}: {}", id, e),
            }
        });

        let event = TransportEvent {
            correlation_id,
            data,
        };
        if events.send(event).await.is_err() {
            warn!("Mediator stopped accepting events");
            break;
        }
        accepted += 1;
    }

    drop(events);
    server.await?;
    while forwarders.join_next().await.is_some() {}
    drop(lines_out);
    let writer = writer_task.await??;

    info!("Transport closed after {} events", accepted);
    Ok(writer)
}
