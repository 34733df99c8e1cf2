//! tokio-tungstenite transport
//!
//! Each `open` spawns one I/O task that performs the handshake, pumps inbound
//! frames into the manager's `TransportEvents` and writes queued outbound
//! frames. The returned handle only pushes commands into an unbounded
//! channel, so `send` and `close` never block.

use crate::traits::*;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, trace};

/// Commands from the handle to the I/O task
#[derive(Debug)]
enum Outbound {
    Send(WsMessage),
    Close,
}

/// Production connector over tokio-tungstenite
///
/// Must be used from within a tokio runtime; without one every attempt
/// reports an error followed by a close.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for TungsteniteConnector {
    fn open(&self, url: &str, events: TransportEvents) -> Box<dyn Transport> {
        let (tx, rx) = unbounded_channel();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(run_socket(url.to_string(), events, rx));
            }
            Err(e) => {
                error!(url, "No tokio runtime for WebSocket task: {}", e);
                events.error(format!("no tokio runtime: {}", e));
                events.close("no tokio runtime");
            }
        }

        Box::new(TungsteniteTransport { outbound: tx })
    }
}

/// Handle to one tungstenite I/O task
struct TungsteniteTransport {
    outbound: UnboundedSender<Outbound>,
}

impl Transport for TungsteniteTransport {
    fn send(&mut self, message: WsMessage) -> Result<()> {
        self.outbound
            .send(Outbound::Send(message))
            .map_err(|_| LiveWireError::ConnectionClosed("socket task has exited".into()))
    }

    fn close(&mut self) {
        // The task may already be gone; nothing left to close then.
        let _ = self.outbound.send(Outbound::Close);
    }
}

/// Main I/O task for one connection attempt
async fn run_socket(url: String, events: TransportEvents, mut outbound: UnboundedReceiver<Outbound>) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = wait_for_close(&mut outbound) => {
            debug!(url = %url, "Closed while connecting");
            events.close("closed while connecting");
            return;
        }
    };

    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            error!(url = %url, "Failed to connect: {}", e);
            events.error(e.to_string());
            events.close(e.to_string());
            return;
        }
    };

    events.open();
    let (mut write, mut read) = ws_stream.split();

    let reason = loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        events.message(WsMessage::Text(text));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        events.message(WsMessage::Binary(data));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong are answered by tungstenite itself
                        trace!(url = %url, "Control frame received");
                    }
                    Some(Err(e)) => {
                        events.error(e.to_string());
                        break e.to_string();
                    }
                    None => {
                        break "stream ended".to_string();
                    }
                }
            }

            command = outbound.recv() => {
                match command {
                    Some(Outbound::Send(message)) => {
                        if let Err(e) = write.send(to_tungstenite(message)).await {
                            events.error(e.to_string());
                            break e.to_string();
                        }
                    }
                    Some(Outbound::Close) | None => {
                        debug!(url = %url, "Closing WebSocket");
                        let _ = write.close().await;
                        break String::new();
                    }
                }
            }
        }
    };

    events.close(reason);
}

/// Resolve once a close is requested or the handle is dropped
async fn wait_for_close(outbound: &mut UnboundedReceiver<Outbound>) {
    loop {
        match outbound.recv().await {
            Some(Outbound::Close) | None => return,
            Some(Outbound::Send(_)) => {
                trace!("Dropping frame queued before the socket opened");
            }
        }
    }
}

/// Convert WsMessage to tungstenite Message
fn to_tungstenite(message: WsMessage) -> Message {
    match message {
        WsMessage::Text(text) => Message::Text(text),
        WsMessage::Binary(data) => Message::Binary(data),
    }
}
