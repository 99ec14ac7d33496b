//! Streaming transport for one analysis task
//!
//! A transport owns one duplex streaming connection scoped to a task
//! id and surfaces typed events to its owner without interpreting
//! them. `completed` and `error` are terminal: the underlying
//! connection is released immediately after either is emitted, and no
//! further events are delivered. A connection-level failure is
//! surfaced as a distinct `TransportFailed` event so the owner can
//! tell "the agents reported failure" apart from "the network broke".

use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use stockdash_models::{AgentRole, AnalysisReport, StatusPayload, StreamMessage};

/// Typed event delivered by a transport to its owner
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Status(StatusPayload),
    AgentMessage { agent: AgentRole, content: String },
    Progress(f64),
    Completed(AnalysisReport),
    Error(String),
    /// Connection-level failure, distinct from a domain `Error`.
    TransportFailed(String),
}

impl From<StreamMessage> for TransportEvent {
    fn from(msg: StreamMessage) -> Self {
        match msg {
            StreamMessage::Status { data } => Self::Status(data),
            StreamMessage::AgentMessage { agent, content } => {
                Self::AgentMessage { agent, content }
            }
            StreamMessage::Progress { progress } => Self::Progress(progress),
            StreamMessage::Completed { data } => Self::Completed(data),
            StreamMessage::Error { message } => Self::Error(message),
        }
    }
}

impl TransportEvent {
    /// True for events after which the transport releases its
    /// connection and delivers nothing further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed(_) | Self::Error(_) | Self::TransportFailed(_)
        )
    }
}

/// One open streaming connection
#[async_trait]
pub trait Transport: Send {
    /// Next event in delivery order, or `None` once the stream has
    /// drained or the transport was closed.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Close the connection. Idempotent; safe after the channel
    /// already closed itself.
    async fn close(&mut self);
}

/// Opens transports for task ids
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(&self, task_id: &str) -> Result<Box<dyn Transport>>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport speaking the analysis channel protocol
pub struct WsTransport {
    socket: Option<WsStream>,
}

impl WsTransport {
    /// Connect to the analysis channel for one task.
    pub async fn connect(ws_base: &str, task_id: &str) -> Result<Self> {
        let url = format!("{ws_base}/api/v1/analysis/ws/{task_id}");
        debug!(url, "opening analysis channel");
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| ClientError::WebSocket(e.to_string()))?;
        Ok(Self {
            socket: Some(socket),
        })
    }

    async fn release(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            // Best-effort close handshake; the connection is dropped
            // regardless of the outcome.
            if let Err(e) = socket.close(None).await {
                debug!(error = %e, "close handshake failed");
            }
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            let frame = self.socket.as_mut()?.next().await;
            match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<StreamMessage>(text.as_str()) {
                        Ok(msg) => {
                            let event = TransportEvent::from(msg);
                            if event.is_terminal() {
                                self.release().await;
                            }
                            return Some(event);
                        }
                        Err(e) => {
                            warn!(error = %e, "skipping unparsable channel message");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.socket = None;
                    return None;
                }
                // Control and binary frames carry no channel events.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.socket = None;
                    return Some(TransportEvent::TransportFailed(e.to_string()));
                }
            }
        }
    }

    async fn close(&mut self) {
        self.release().await;
    }
}

/// Factory producing [`WsTransport`] connections
#[derive(Debug, Clone)]
pub struct WsTransportFactory {
    ws_base: String,
}

impl WsTransportFactory {
    pub fn new(ws_base: impl Into<String>) -> Self {
        Self {
            ws_base: ws_base.into(),
        }
    }
}

#[async_trait]
impl TransportFactory for WsTransportFactory {
    async fn open(&self, task_id: &str) -> Result<Box<dyn Transport>> {
        let transport = WsTransport::connect(&self.ws_base, task_id).await?;
        Ok(Box::new(transport))
    }
}
