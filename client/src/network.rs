//! Session transport: the persistent WebSocket to the remote authority.
//!
//! The socket lives on a background tokio task; the frame loop talks to it
//! exclusively through channels and drives reconnection by polling. Every
//! connection attempt gets a generation number, and events or timers from an
//! older generation are discarded, so a stale reconnect can never resurrect
//! a connection to an abandoned room.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{decode_frame, encode_intent, ClientIntent, ServerFrame};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Delay before the single reconnect attempt after an unexpected close.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Lifecycle of the live session as observed by the rest of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Joined,
}

/// Identity sent with every `join_room` intent (and re-sent on reconnect).
#[derive(Debug, Clone)]
pub struct JoinInfo {
    pub username: String,
    pub skin: String,
    pub color: String,
}

/// Events surfaced to the frame loop, tagged with the connection generation
/// that produced them.
#[derive(Debug)]
pub enum TransportEvent {
    Opened { generation: u64 },
    Frame { generation: u64, frame: ServerFrame },
    Closed { generation: u64 },
}

struct PendingReconnect {
    room_id: String,
    generation: u64,
    due: Instant,
}

pub struct SessionTransport {
    handle: Handle,
    base_url: String,
    player_id: String,

    events_tx: UnboundedSender<TransportEvent>,
    events_rx: UnboundedReceiver<TransportEvent>,
    outgoing: Option<UnboundedSender<String>>,

    generation: u64,
    open: bool,
    room_id: Option<String>,
    join: Option<JoinInfo>,
    reconnect: Option<PendingReconnect>,
}

impl SessionTransport {
    pub fn new(handle: Handle, base_url: String, player_id: String) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        SessionTransport {
            handle,
            base_url,
            player_id,
            events_tx,
            events_rx,
            outgoing: None,
            generation: 0,
            open: false,
            room_id: None,
            join: None,
            reconnect: None,
        }
    }

    /// The WebSocket endpoint: scheme derived from the backend base URL
    /// (secure iff the backend is), path embedding the client's player id.
    fn endpoint(&self) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = trimmed.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = trimmed.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", trimmed)
        };
        format!("{}/ws/{}", ws_base, self.player_id)
    }

    /// Opens a connection to the given room, closing any existing one first.
    /// At most one connection is ever active.
    pub fn connect(&mut self, room_id: &str, join: JoinInfo) {
        self.close();

        let join_intent = ClientIntent::JoinRoom {
            room_id: room_id.to_string(),
            username: join.username.clone(),
            skin: join.skin.clone(),
            color: join.color.clone(),
        };
        let first_message = match encode_intent(&join_intent) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to encode join intent: {}", e);
                return;
            }
        };

        let generation = self.generation;
        let url = self.endpoint();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        self.outgoing = Some(out_tx);
        self.room_id = Some(room_id.to_string());
        self.join = Some(join);

        info!("Connecting to {} (room {})", url, room_id);
        let events = self.events_tx.clone();
        self.handle
            .spawn(run_connection(url, first_message, out_rx, events, generation));
    }

    /// Serializes and transmits an intent, but only while the socket is open.
    /// Otherwise the intent is silently dropped: movement is re-derived from
    /// live input, so there is nothing worth queueing.
    pub fn send(&mut self, intent: &ClientIntent) {
        if !self.open {
            debug!("Dropping intent while socket is not open");
            return;
        }
        let Some(out) = &self.outgoing else {
            return;
        };
        match encode_intent(intent) {
            Ok(text) => {
                if out.send(text).is_err() {
                    debug!("Dropping intent, connection task already gone");
                }
            }
            Err(e) => error!("Failed to encode intent: {}", e),
        }
    }

    /// Closes the connection if present and clears local state. Idempotent.
    pub fn close(&mut self) {
        // Dropping the sender ends the writer loop, which closes the socket.
        self.outgoing = None;
        self.open = false;
        self.reconnect = None;
        // Invalidate events and timers from the connection being abandoned.
        self.generation += 1;
    }

    /// Drains transport events for the frame loop and drives the reconnect
    /// policy. `game_view_active` is the kill-switch: closes observed while
    /// it is false schedule nothing, and a pending attempt whose deadline
    /// arrives after the player left the game view is discarded.
    pub fn poll(&mut self, game_view_active: bool) -> Vec<TransportEvent> {
        let mut events = Vec::new();

        while let Ok(event) = self.events_rx.try_recv() {
            let generation = match &event {
                TransportEvent::Opened { generation }
                | TransportEvent::Frame { generation, .. }
                | TransportEvent::Closed { generation } => *generation,
            };
            if generation != self.generation {
                debug!("Discarding event from stale connection generation");
                continue;
            }

            match &event {
                TransportEvent::Opened { .. } => {
                    self.open = true;
                }
                TransportEvent::Closed { .. } => {
                    self.open = false;
                    self.outgoing = None;
                    if game_view_active {
                        if let Some(room_id) = self.room_id.clone() {
                            warn!("Connection lost, retrying in {:?}", RECONNECT_DELAY);
                            self.reconnect = Some(PendingReconnect {
                                room_id,
                                generation: self.generation,
                                due: Instant::now() + RECONNECT_DELAY,
                            });
                        }
                    }
                }
                TransportEvent::Frame { .. } => {}
            }
            events.push(event);
        }

        let due = self
            .reconnect
            .as_ref()
            .map_or(false, |pending| Instant::now() >= pending.due);
        if due {
            if let Some(pending) = self.reconnect.take() {
                if game_view_active && pending.generation == self.generation {
                    if let Some(join) = self.join.clone() {
                        info!("Reconnecting to room {}", pending.room_id);
                        self.connect(&pending.room_id, join);
                    }
                } else {
                    debug!("Discarding stale reconnect attempt");
                }
            }
        }

        events
    }

    /// True while the socket is open for sending.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// True while a reconnect attempt is scheduled.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect.is_some()
    }
}

/// The connection task: dials the endpoint, transmits the join intent before
/// anything else, then pumps the socket until either side closes. All
/// failures end in a `Closed` event; nothing propagates past this boundary.
async fn run_connection(
    url: String,
    first_message: String,
    mut outgoing: UnboundedReceiver<String>,
    events: UnboundedSender<TransportEvent>,
    generation: u64,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            warn!("Connection to {} failed: {}", url, e);
            let _ = events.send(TransportEvent::Closed { generation });
            return;
        }
    };

    info!("Connected to {}", url);
    let (mut write, mut read) = ws_stream.split();

    // The join intent must go out before any queued message.
    if let Err(e) = write.send(Message::Text(first_message)).await {
        warn!("Failed to send join intent: {}", e);
        let _ = events.send(TransportEvent::Closed { generation });
        return;
    }
    let _ = events.send(TransportEvent::Opened { generation });

    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                        Ok(frame) => {
                            if events.send(TransportEvent::Frame { generation, frame }).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            // Unknown or malformed frames are dropped; the
                            // session continues.
                            debug!("Ignoring undecodable frame: {}", e);
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }
            queued = outgoing.recv() => {
                match queued {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            error!("WebSocket write error: {}", e);
                            break;
                        }
                    }
                    None => {
                        // Transport dropped the sender: deliberate close.
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    let _ = events.send(TransportEvent::Closed { generation });
}
