//! Realtime Channel
//!
//! One WebSocket connection to the push server. Inbound `status` and
//! `alert` frames fan out to the registered listeners; outbound frames go
//! through a writer task fed by an unbounded channel.

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::listeners::ListenerRegistry;
use super::messages::{AlertEvent, ClientEvent, ServerEvent, StatusEvent};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("Connection to {0} was replaced while connecting")]
    Superseded(String),
}

struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Push connection plus its listener registries
pub struct RealtimeChannel {
    url: String,
    state: Arc<RwLock<ConnectionState>>,
    /// Bumped on every connect/teardown so a stale reader cannot touch
    /// the state of a newer connection
    generation: Arc<AtomicU64>,
    connection: Mutex<Option<Connection>>,
    status_listeners: Arc<ListenerRegistry<StatusEvent>>,
    alert_listeners: Arc<ListenerRegistry<AlertEvent>>,
}

impl RealtimeChannel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            generation: Arc::new(AtomicU64::new(0)),
            connection: Mutex::new(None),
            status_listeners: Arc::new(ListenerRegistry::new()),
            alert_listeners: Arc::new(ListenerRegistry::new()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open a fresh connection, closing any existing one first.
    ///
    /// Listeners survive a reconnect; subscriptions do not.
    pub async fn connect(&self) -> Result<(), RealtimeError> {
        self.teardown();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write() = ConnectionState::Connecting;
        tracing::debug!(url = %self.url, "Connecting realtime channel");

        let (stream, _response) = match connect_async(self.url.as_str()).await {
            Ok(ok) => ok,
            Err(source) => {
                if self.generation.load(Ordering::SeqCst) == generation {
                    *self.state.write() = ConnectionState::Disconnected;
                }
                tracing::warn!(url = %self.url, error = %source, "Realtime connection failed");
                return Err(RealtimeError::Connect {
                    url: self.url.clone(),
                    source,
                });
            }
        };

        let mut connection = self.connection.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            // A disconnect or another connect ran while we were dialing
            return Err(RealtimeError::Superseded(self.url.clone()));
        }

        // Connected before the reader starts, so an immediate server close
        // can only move the state forward to Disconnected
        *self.state.write() = ConnectionState::Connected;

        let (mut sink, mut source) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    tracing::warn!(error = %e, "Realtime send failed");
                    return;
                }
            }
            let _ = sink.close().await;
        });

        let state = Arc::clone(&self.state);
        let current = Arc::clone(&self.generation);
        let status_listeners = Arc::clone(&self.status_listeners);
        let alert_listeners = Arc::clone(&self.alert_listeners);

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        dispatch_frame(&text, &status_listeners, &alert_listeners)
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Realtime connection error");
                        break;
                    }
                }
            }

            if current.load(Ordering::SeqCst) == generation {
                *state.write() = ConnectionState::Disconnected;
                tracing::info!("Realtime channel closed by server");
            }
        });

        *connection = Some(Connection {
            outbound,
            reader,
            writer,
        });
        tracing::info!(url = %self.url, "Realtime channel connected");
        Ok(())
    }

    /// Ask for a bike's event stream. No-op unless connected.
    pub fn subscribe(&self, topic: &str) -> bool {
        self.send(ClientEvent::SubscribeBike(topic.to_string()))
    }

    /// Stop a bike's event stream. No-op unless connected.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.send(ClientEvent::UnsubscribeBike(topic.to_string()))
    }

    fn send(&self, event: ClientEvent) -> bool {
        if !self.is_connected() {
            tracing::debug!(?event, "Realtime channel not connected, dropping");
            return false;
        }

        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode realtime message");
                return false;
            }
        };

        let connection = self.connection.lock();
        match connection.as_ref() {
            Some(conn) => conn.outbound.send(Message::Text(text)).is_ok(),
            None => false,
        }
    }

    pub fn on_status<F>(&self, listener: F)
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.status_listeners.add(listener);
    }

    pub fn on_alert<F>(&self, listener: F)
    where
        F: Fn(&AlertEvent) + Send + Sync + 'static,
    {
        self.alert_listeners.add(listener);
    }

    /// Drop every listener; the connection stays open
    pub fn clear_listeners(&self) {
        self.status_listeners.clear();
        self.alert_listeners.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.status_listeners.len() + self.alert_listeners.len()
    }

    /// Close the connection and drop every listener
    pub fn disconnect(&self) {
        self.teardown();
        self.clear_listeners();
    }

    fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = self.connection.lock().take();
        if let Some(conn) = previous {
            conn.reader.abort();
            // Dropping the sender lets the writer flush and close the sink
            drop(conn.outbound);
            drop(conn.writer);
            tracing::debug!(url = %self.url, "Realtime connection torn down");
        }
        *self.state.write() = ConnectionState::Disconnected;
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(conn) = self.connection.get_mut().take() {
            conn.reader.abort();
            conn.writer.abort();
        }
    }
}

fn dispatch_frame(
    text: &str,
    status_listeners: &ListenerRegistry<StatusEvent>,
    alert_listeners: &ListenerRegistry<AlertEvent>,
) {
    match ServerEvent::parse(text) {
        Ok(ServerEvent::Status(status)) => {
            let n = status_listeners.dispatch(&status);
            tracing::trace!(listeners = n, "Status event dispatched");
        }
        Ok(ServerEvent::Alert(alert)) => {
            let n = alert_listeners.dispatch(&alert);
            tracing::debug!(listeners = n, alert_type = %alert.alert_type, "Alert event dispatched");
        }
        Ok(ServerEvent::Other(event)) => {
            tracing::debug!(event = %event, "Ignoring realtime event");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dropping realtime frame");
        }
    }
}
