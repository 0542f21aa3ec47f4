//! Telemetry transport supervisor
//!
//! Keeps one websocket connection to the game's telemetry feed, decodes each
//! frame and enqueues the snapshot for the session machine. Reconnects after
//! a fixed backoff until the engine shuts down.

use crate::telemetry::{TelemetryDecoder, TelemetrySnapshot};
use crate::{Error, Result};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

type TelemetryStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why a connection ended
#[derive(Debug)]
enum ConnectionEnd {
    /// Shutdown requested or nobody consumes samples any more
    Stop,
    Closed,
    Failed(String),
}

/// Whether the consumer still accepts samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped,
    ConsumerGone,
}

pub struct TransportSupervisor {
    url: Url,
    backoff: Duration,
    decoder: Box<dyn TelemetryDecoder>,
    sink: mpsc::UnboundedSender<TelemetrySnapshot>,
    cancel: CancellationToken,
}

impl TransportSupervisor {
    pub fn new(
        url: &str,
        backoff: Duration,
        decoder: Box<dyn TelemetryDecoder>,
        sink: mpsc::UnboundedSender<TelemetrySnapshot>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid telemetry url '{}': {}", url, e)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::Config(format!(
                "telemetry url must use ws:// or wss://, got '{}'",
                url
            )));
        }
        Ok(Self {
            url,
            backoff,
            decoder,
            sink,
            cancel,
        })
    }

    /// Connect, read and reconnect until cancelled
    pub async fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            info!("Connecting to telemetry feed at {}", self.url);
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((stream, _response)) => {
                    info!("Telemetry feed connected");
                    match self.read_frames(stream).await {
                        ConnectionEnd::Stop => break,
                        ConnectionEnd::Closed => warn!("Telemetry connection closed"),
                        ConnectionEnd::Failed(e) => warn!("Telemetry connection error: {}", e),
                    }
                }
                Err(e) => warn!("Telemetry connection failed: {}", e),
            }

            if self.cancel.is_cancelled() {
                break;
            }
            info!("Reconnecting in {} ms", self.backoff.as_millis());
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
        info!("Telemetry transport stopped");
    }

    async fn read_frames(&mut self, mut stream: TelemetryStream) -> ConnectionEnd {
        loop {
            let message = tokio::select! {
                _ = self.cancel.cancelled() => {
                    if let Err(e) = stream.close(None).await {
                        debug!("Error closing telemetry connection: {}", e);
                    }
                    return ConnectionEnd::Stop;
                }
                message = stream.next() => message,
            };

            let delivery = match message {
                Some(Ok(Message::Text(text))) => self.deliver(&text),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => self.deliver(text),
                    Err(_) => {
                        warn!("Dropping non-UTF-8 telemetry frame ({} bytes)", bytes.len());
                        Delivery::Dropped
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("Telemetry feed sent close: {:?}", frame);
                    return ConnectionEnd::Closed;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return ConnectionEnd::Failed(e.to_string()),
                None => return ConnectionEnd::Closed,
            };

            if delivery == Delivery::ConsumerGone {
                debug!("Session machine gone, stopping transport");
                let _ = stream.close(None).await;
                return ConnectionEnd::Stop;
            }
        }
    }

    /// Decode one frame and enqueue the snapshot
    ///
    /// Malformed frames are logged and dropped.
    pub fn deliver(&mut self, frame: &str) -> Delivery {
        match self.decoder.decode(frame) {
            Ok(Some(snapshot)) => match self.sink.send(snapshot) {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::ConsumerGone,
            },
            Ok(None) => {
                trace!("Telemetry frame carries no state change");
                Delivery::Dropped
            }
            Err(e) => {
                warn!("Dropping malformed telemetry frame: {}", e);
                Delivery::Dropped
            }
        }
    }
}
