//! Core service WebSocket client.
//!
//! [`GatewayClient`] performs the handshake and sends the request that
//! opens an attach session. The connection is then handed over to a
//! [`WsChannel`], which implements [`BidiChannel`] for the stream handler.
//!
//! # Example
//!
//! ```rust,no_run
//! use eru_cli::client::GatewayClient;
//! use eru_cli::config::ClientConfig;
//! use eru_proto::ExecuteWorkloadRequest;
//!
//! # async fn example() -> Result<(), eru_cli::CliError> {
//! let client = GatewayClient::connect(&ClientConfig::default()).await?;
//! let request = ExecuteWorkloadRequest::new("c0ffee").with_commands(vec!["id".into()]);
//! let mut channel = client.execute_workload(request).await?;
//! let code = eru_cli::interactive::handle(false, &mut channel, 1, false).await?;
//! # let _ = code;
//! # Ok(())
//! # }
//! ```

use eru_proto::cli::{CliMessage, CliResponse, CLI_PROTOCOL_VERSION};
use eru_proto::{ExecuteWorkloadRequest, Frame, LambdaSpec};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::error::CliError;
use crate::interactive::{BidiChannel, FrameSender};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshaken connection to the core service.
pub struct GatewayClient {
    ws: WsStream,
    server_version: String,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("server_version", &self.server_version)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Connect and identify as a CLI client.
    ///
    /// The connection timeout covers both the WebSocket upgrade and the
    /// handshake.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config is invalid
    /// - Connection fails or times out
    /// - The service rejects the handshake
    pub async fn connect(config: &ClientConfig) -> Result<Self, CliError> {
        config.validate()?;

        debug!(address = %config.address, "connecting to core");

        timeout(config.connect_timeout, Self::connect_inner(&config.address))
            .await
            .map_err(|_| CliError::Timeout(format!("connecting to {} timed out", config.address)))?
    }

    async fn connect_inner(address: &str) -> Result<Self, CliError> {
        let (ws, _response) = connect_async(address)
            .await
            .map_err(|e| CliError::Connection(e.to_string()))?;

        debug!("WebSocket connected, sending handshake");

        let mut client = Self {
            ws,
            server_version: String::new(),
        };
        client
            .send_message(&CliMessage::hello(env!("CARGO_PKG_VERSION")))
            .await?;

        match client.read_response().await? {
            CliResponse::Welcome {
                server_version,
                protocol_version,
            } => {
                if protocol_version != CLI_PROTOCOL_VERSION {
                    warn!(
                        server = protocol_version,
                        client = CLI_PROTOCOL_VERSION,
                        "protocol version mismatch"
                    );
                }
                debug!(version = %server_version, "handshake complete");
                client.server_version = server_version;
                Ok(client)
            }
            CliResponse::Error { code, message, .. } => Err(CliError::Gateway { code, message }),
            CliResponse::Attach { .. } => Err(CliError::Protocol(
                "unexpected attach frame during handshake".into(),
            )),
        }
    }

    /// Version reported by the service.
    #[must_use]
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Open an attach session on a command inside a running workload.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or cannot be sent.
    pub async fn execute_workload(
        mut self,
        request: ExecuteWorkloadRequest,
    ) -> Result<WsChannel, CliError> {
        request.validate()?;
        debug!(workload_id = %request.workload_id, "opening exec session");
        self.send_message(&CliMessage::execute_workload(request)).await?;
        Ok(WsChannel::new(self.ws))
    }

    /// Create lambda replicas and attach to all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid or cannot be sent.
    pub async fn run_and_wait(
        mut self,
        spec: LambdaSpec,
        open_stdin: bool,
    ) -> Result<WsChannel, CliError> {
        spec.validate()?;
        debug!(name = %spec.name, count = spec.count, "opening lambda session");
        self.send_message(&CliMessage::run_and_wait(spec, open_stdin))
            .await?;
        Ok(WsChannel::new(self.ws))
    }

    async fn send_message(&mut self, message: &CliMessage) -> Result<(), CliError> {
        let json = message.to_json()?;
        trace!(request_type = message.request_type(), "sending request");
        self.ws
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| CliError::Connection(e.to_string()))
    }

    async fn read_response(&mut self) -> Result<CliResponse, CliError> {
        loop {
            let message = self
                .ws
                .next()
                .await
                .ok_or_else(|| CliError::Connection("connection closed".into()))?
                .map_err(|e| CliError::Connection(e.to_string()))?;

            match message {
                Message::Text(text) => return Ok(CliResponse::from_json(&text)?),
                Message::Binary(_) => {
                    return Err(CliError::Protocol("unexpected binary message".into()))
                }
                Message::Close(_) => {
                    return Err(CliError::Connection("connection closed by server".into()))
                }
                _ => {}
            }
        }
    }
}

/// An open attach session over WebSocket.
///
/// Outbound data is queued to a writer task so that the input pump and
/// the resize watcher can send while the handler is blocked on `recv`.
pub struct WsChannel {
    stream: SplitStream<WsStream>,
    sender: WsSender,
    writer: JoinHandle<()>,
}

impl std::fmt::Debug for WsChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsChannel").finish_non_exhaustive()
    }
}

impl WsChannel {
    fn new(ws: WsStream) -> Self {
        let (sink, stream) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, rx));
        Self {
            stream,
            sender: WsSender { tx },
            writer,
        }
    }

    /// Send a close frame and wait for queued data to be flushed.
    pub async fn close(self) {
        // The writer exits after the close frame, or immediately if it already stopped.
        let _ = self.sender.tx.send(Message::Close(None));
        drop(self.sender);
        if let Err(e) = self.writer.await {
            warn!(error = %e, "attach writer task failed");
        }
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            debug!(error = %e, "attach writer stopped");
            return;
        }
        if closing {
            return;
        }
    }
}

/// Cloneable outbound half of a [`WsChannel`].
#[derive(Debug, Clone)]
pub struct WsSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl FrameSender for WsSender {
    async fn send(&self, data: Vec<u8>) -> Result<(), CliError> {
        self.tx
            .send(Message::Binary(data.into()))
            .map_err(|_| CliError::Connection("attach stream closed".into()))
    }
}

impl BidiChannel for WsChannel {
    type Sender = WsSender;

    fn sender(&self) -> Self::Sender {
        self.sender.clone()
    }

    async fn recv(&mut self) -> Result<Option<Frame>, CliError> {
        loop {
            let message = match self.stream.next().await {
                None | Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    return Ok(None)
                }
                Some(Err(e)) => return Err(CliError::Connection(e.to_string())),
                Some(Ok(message)) => message,
            };

            match message {
                Message::Text(text) => {
                    return match CliResponse::from_json(&text)? {
                        CliResponse::Attach { message } => Ok(Some(Frame::from(message))),
                        CliResponse::Error { code, message, .. } => {
                            Err(CliError::Gateway { code, message })
                        }
                        CliResponse::Welcome { .. } => {
                            Err(CliError::Protocol("unexpected welcome mid-stream".into()))
                        }
                    };
                }
                Message::Binary(_) => {
                    return Err(CliError::Protocol("unexpected binary message".into()))
                }
                Message::Close(frame) => {
                    debug!(?frame, "attach stream closed by server");
                    return Ok(None);
                }
                _ => trace!("skipping control frame"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn invalid_url_rejected() {
        let err = GatewayClient::connect(&ClientConfig::new("http://invalid"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid gateway URL"));
    }

    #[tokio::test]
    async fn connection_timeout() {
        // Non-routable address
        let config = ClientConfig::new("ws://10.255.255.1:9999")
            .with_connect_timeout(Duration::from_millis(100));
        assert!(GatewayClient::connect(&config).await.is_err());
    }

    #[tokio::test]
    async fn connection_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = GatewayClient::connect(&ClientConfig::new(format!("ws://{addr}")))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::Connection(_)));
    }
}
