//! The long-lived event stream to the analysis service.
//!
//! The controller only sees [`ConnectionHandle`]; [`WsConnection`] is the
//! WebSocket-backed implementation. Reconnecting is the handle's concern: each
//! successful connect yields a fresh identity and each drop clears it.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use async_trait::async_trait;
use futures::{Sink, SinkExt, StreamExt};
use shared::{
    domain::ConnectionIdentity,
    protocol::{ClientFrame, ServerFrame, StreamEvent, EVENTS_PATH},
};
use tokio::{
    net::TcpStream,
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::{error::ConnectionError, settings::ClientSettings};

const EVENT_BUFFER: usize = 256;
const OUTBOUND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Connected(ConnectionIdentity),
    Disconnected,
    Stream(StreamEvent),
}

#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// The identity of the live connection, if there is one.
    fn identity(&self) -> Option<ConnectionIdentity>;
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;
    async fn send(&self, frame: ClientFrame) -> Result<(), ConnectionError>;
}

pub fn events_url(server_url: &str) -> Result<Url, ConnectionError> {
    let trimmed = server_url.trim().trim_end_matches('/');
    let ws_base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ConnectionError::UnsupportedScheme(server_url.to_string()));
    };
    Ok(Url::parse(&format!("{ws_base}{EVENTS_PATH}"))?)
}

struct Shared {
    identity: watch::Sender<Option<ConnectionIdentity>>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl Shared {
    fn dispatch(&self, text: &str) {
        match serde_json::from_str::<ServerFrame>(text) {
            Ok(ServerFrame::Connect { socket_id }) => {
                info!(socket_id = %socket_id, "event stream identity assigned");
                self.identity.send_replace(Some(socket_id.clone()));
                let _ = self.events.send(ConnectionEvent::Connected(socket_id));
            }
            Ok(ServerFrame::ProgressUpdate(event)) => {
                debug!(kind = event.kind(), "stream event received");
                let _ = self.events.send(ConnectionEvent::Stream(event));
            }
            Err(err) => warn!(%err, "ignoring malformed server frame"),
        }
    }

    fn mark_disconnected(&self) {
        if let Some(previous) = self.identity.send_replace(None) {
            info!(socket_id = %previous, "event stream disconnected");
            let _ = self.events.send(ConnectionEvent::Disconnected);
        }
    }
}

enum SessionEnd {
    Dropped,
    OwnerGone,
}

pub struct WsConnection {
    shared: Arc<Shared>,
    outbound: mpsc::Sender<ClientFrame>,
    supervisor: JoinHandle<()>,
}

impl WsConnection {
    /// Starts connecting in the background and returns immediately.
    pub fn spawn(settings: &ClientSettings) -> Result<Arc<Self>, ConnectionError> {
        let ws_url = events_url(&settings.server_url)?;
        let (identity, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let shared = Arc::new(Shared { identity, events });
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);

        let supervisor = tokio::spawn(supervise(
            Arc::clone(&shared),
            ws_url,
            outbound_rx,
            settings.reconnect_delay(),
            settings.ping_interval(),
        ));

        Ok(Arc::new(Self {
            shared,
            outbound,
            supervisor,
        }))
    }

    /// Waits until the service has assigned an identity.
    pub async fn wait_for_identity(&self) -> Result<ConnectionIdentity, ConnectionError> {
        let mut rx = self.shared.identity.subscribe();
        let identity = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ConnectionError::Closed)?;
        identity.clone().ok_or(ConnectionError::Closed)
    }

    pub fn shutdown(&self) {
        self.supervisor.abort();
        self.shared.mark_disconnected();
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

#[async_trait]
impl ConnectionHandle for WsConnection {
    fn identity(&self) -> Option<ConnectionIdentity> {
        self.shared.identity.borrow().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    async fn send(&self, frame: ClientFrame) -> Result<(), ConnectionError> {
        if self.identity().is_none() {
            return Err(ConnectionError::Closed);
        }
        self.outbound
            .send(frame)
            .await
            .map_err(|_| ConnectionError::Closed)
    }
}

async fn supervise(
    shared: Arc<Shared>,
    ws_url: Url,
    mut outbound: mpsc::Receiver<ClientFrame>,
    reconnect_delay: Duration,
    ping_interval: Duration,
) {
    loop {
        match connect_async(ws_url.as_str()).await {
            Ok((stream, _)) => {
                info!(url = %ws_url, "event stream connected");
                let end = run_session(&shared, stream, &mut outbound, ping_interval).await;
                shared.mark_disconnected();
                if let SessionEnd::OwnerGone = end {
                    return;
                }
            }
            Err(err) => warn!(url = %ws_url, %err, "event stream connect failed"),
        }
        debug!(delay_ms = reconnect_delay.as_millis() as u64, "scheduling reconnect");
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn run_session(
    shared: &Shared,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    outbound: &mut mpsc::Receiver<ClientFrame>,
    ping_interval: Duration,
) -> SessionEnd {
    let (mut writer, mut reader) = stream.split();
    let mut ping = tokio::time::interval(ping_interval);
    ping.tick().await;

    loop {
        tokio::select! {
            incoming = reader.next() => match incoming {
                Some(Ok(Message::Text(text))) => shared.dispatch(&text),
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Dropped,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(%err, "event stream receive failed");
                    return SessionEnd::Dropped;
                }
            },
            outgoing = outbound.recv() => match outgoing {
                Some(frame) => {
                    if let Err(err) = send_frame(&mut writer, &frame).await {
                        warn!(error = %err, "event stream send failed");
                        return SessionEnd::Dropped;
                    }
                }
                None => {
                    let _ = writer.send(Message::Close(None)).await;
                    return SessionEnd::OwnerGone;
                }
            },
            _ = ping.tick() => {
                if let Err(err) = send_frame(&mut writer, &ClientFrame::Ping).await {
                    warn!(error = %err, "event stream keepalive failed");
                    return SessionEnd::Dropped;
                }
            }
        }
    }
}

async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> anyhow::Result<()>
where
    S: Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame).context("failed to encode client frame")?;
    sink.send(Message::Text(text))
        .await
        .context("failed to write client frame")
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
