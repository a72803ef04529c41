//! Newline-delimited JSON event feed.
//!
//! Inbound lines are platform events: interactions and message-deleted
//! notices. Outbound lines are either render instructions from the
//! [`ConsoleGateway`] or replies to interactions. Each interaction is
//! handled in its own task.

use crate::engine::Engine;
use crate::gateway::{ConsoleGateway, Outbound};
use crate::handlers::{self, Context, Interaction, Reply};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

/// Longest accepted inbound line.
const MAX_LINE_LENGTH: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    Interaction {
        /// Correlates the reply with the event.
        id: String,
        context: Context,
        interaction: Interaction,
    },
    MessageDeleted {
        message_id: String,
    },
}

#[derive(Debug, Serialize)]
struct ReplyLine {
    r#type: &'static str,
    interaction: String,
    reply: Reply,
}

impl ReplyLine {
    fn new(interaction: String, reply: Reply) -> Self {
        Self {
            r#type: "reply",
            interaction,
            reply,
        }
    }
}

/// Spawn the writer that serializes renders and replies to `output`.
///
/// Runs until both channels are closed or the output fails.
fn spawn_writer<W>(
    output: W,
    mut renders: mpsc::Receiver<Outbound>,
    mut replies: mpsc::Receiver<ReplyLine>,
) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut sink = FramedWrite::new(output, LinesCodec::new());
        loop {
            let line = tokio::select! {
                Some(render) = renders.recv() => serde_json::to_string(&render),
                Some(reply) = replies.recv() => serde_json::to_string(&reply),
                else => break,
            };
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!(error = %e, "Failed to serialize output line");
                    continue;
                }
            };
            if let Err(e) = sink.send(line).await {
                error!(error = %e, "Failed to write output line");
                break;
            }
        }
        debug!("Feed writer stopped");
    })
}

/// Run the feed until `input` reaches end of file.
///
/// Returns the writer task, which keeps draining renders (scheduled closes)
/// after the input ends.
pub async fn run<R, W>(
    engine: Arc<Engine>,
    gateway: Arc<ConsoleGateway>,
    renders: mpsc::Receiver<Outbound>,
    input: R,
    output: W,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (reply_tx, reply_rx) = mpsc::channel::<ReplyLine>(256);
    let writer = spawn_writer(output, renders, reply_rx);
    let mut lines = FramedRead::new(input, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    info!("Event feed started");
    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!(max = MAX_LINE_LENGTH, "Dropping oversized input line");
                continue;
            }
            Err(LinesCodecError::Io(e)) => {
                error!(error = %e, "Failed to read input");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<Inbound>(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed event");
                continue;
            }
        };

        match event {
            Inbound::Interaction {
                id,
                context,
                interaction,
            } => {
                gateway.remember(&context.member);
                let engine = Arc::clone(&engine);
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let reply = handlers::handle(&engine, &context, interaction, Utc::now()).await;
                    if reply_tx.send(ReplyLine::new(id, reply)).await.is_err() {
                        debug!("Reply dropped, writer gone");
                    }
                });
            }
            Inbound::MessageDeleted { message_id } => gateway.mark_deleted(&message_id),
        }
    }

    info!("Event feed input closed");
    writer
}
