//! Client-side world state: the latest authoritative snapshot and the values
//! derived from it for the local player.
//!
//! The store keeps no history and does no prediction or interpolation. Each
//! `game_state` frame replaces the previous snapshot as a whole, so a paint
//! can never observe a half-applied update; at low tick rates this shows as
//! visible stepping, which is accepted.

use log::debug;
use shared::{RoomScore, ServerFrame, Snapshot};

/// Score and coin count of the local player in the latest snapshot.
/// Zero when the local player is absent (not yet joined, or eliminated
/// and removed by the authority).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalPlayerView {
    pub score: u32,
    pub coins: u32,
}

#[derive(Debug, Default)]
pub struct WorldStateStore {
    snapshot: Option<Snapshot>,
    leaderboard: Vec<RoomScore>,
    confirmed_room: Option<String>,
    local: LocalPlayerView,
}

impl WorldStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingests one frame from the transport. Only `game_state` mutates world
    /// state; membership notifications are advisory and merely logged, since
    /// the next snapshot already reflects them.
    pub fn apply(&mut self, frame: ServerFrame, local_player_id: &str) {
        match frame {
            ServerFrame::RoomJoined { room_id } => {
                self.confirmed_room = Some(room_id);
            }
            ServerFrame::GameState { state, leaderboard } => {
                self.local = state
                    .players
                    .get(local_player_id)
                    .map(|p| LocalPlayerView {
                        score: p.score,
                        coins: p.coins,
                    })
                    .unwrap_or_default();
                // Whole-snapshot swap: the render loop only ever sees the
                // last fully received frame.
                self.snapshot = Some(state);
                self.leaderboard = leaderboard;
            }
            ServerFrame::PlayerJoined { player } => {
                debug!(
                    "Player joined: {}",
                    player.map(|p| p.username).unwrap_or_default()
                );
            }
            ServerFrame::PlayerLeft { player_id } => {
                debug!("Player left: {}", player_id.unwrap_or_default());
            }
        }
    }

    /// The last fully received snapshot, if any.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn local_view(&self) -> LocalPlayerView {
        self.local
    }

    pub fn leaderboard(&self) -> &[RoomScore] {
        &self.leaderboard
    }

    /// Room id as confirmed by the authority, for the HUD.
    pub fn room_label(&self) -> Option<&str> {
        self.confirmed_room.as_deref()
    }

    pub fn player_count(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.players.len())
    }

    /// Forgets everything from the session that just ended.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{decode_frame, Direction, PlayerState};
    use std::collections::HashMap;

    fn player(score: u32, coins: u32) -> PlayerState {
        PlayerState {
            username: "ada".to_string(),
            skin: "default".to_string(),
            color: "#4dff91".to_string(),
            body: vec![(5, 5), (4, 5)],
            direction: Some(Direction::Right),
            score,
            coins,
            alive: true,
        }
    }

    fn game_state(players: HashMap<String, PlayerState>) -> ServerFrame {
        ServerFrame::GameState {
            state: Snapshot {
                players,
                foods: Vec::new(),
            },
            leaderboard: Vec::new(),
        }
    }

    #[test]
    fn test_local_view_tracks_local_player() {
        let mut store = WorldStateStore::new();
        let mut players = HashMap::new();
        players.insert("p1".to_string(), player(30, 12));

        store.apply(game_state(players), "p1");

        assert_eq!(
            store.local_view(),
            LocalPlayerView {
                score: 30,
                coins: 12
            }
        );
    }

    #[test]
    fn test_local_view_defaults_to_zero_when_absent() {
        let mut store = WorldStateStore::new();
        let mut players = HashMap::new();
        players.insert("p1".to_string(), player(30, 12));
        store.apply(game_state(players), "p1");

        // Next frame no longer contains the local player.
        store.apply(game_state(HashMap::new()), "p1");

        assert_eq!(store.local_view(), LocalPlayerView::default());
        assert_eq!(store.player_count(), 0);
    }

    #[test]
    fn test_latest_of_two_frames_wins() {
        let mut store = WorldStateStore::new();

        let mut first = HashMap::new();
        first.insert("p1".to_string(), player(10, 1));
        let mut second = HashMap::new();
        second.insert("p1".to_string(), player(20, 2));

        // Two frames arrive before any paint; only the latest is observable.
        store.apply(game_state(first), "p1");
        store.apply(game_state(second), "p1");

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.players.get("p1").unwrap().score, 20);
        assert_eq!(store.local_view().score, 20);
    }

    #[test]
    fn test_room_joined_records_label_only() {
        let mut store = WorldStateStore::new();
        store.apply(
            ServerFrame::RoomJoined {
                room_id: "ABX2K9".to_string(),
            },
            "p1",
        );

        assert_eq!(store.room_label(), Some("ABX2K9"));
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_membership_notifications_do_not_touch_state() {
        let mut store = WorldStateStore::new();
        let mut players = HashMap::new();
        players.insert("p1".to_string(), player(10, 1));
        store.apply(game_state(players), "p1");

        store.apply(ServerFrame::PlayerJoined { player: None }, "p1");
        store.apply(
            ServerFrame::PlayerLeft {
                player_id: Some("p9".to_string()),
            },
            "p1",
        );

        assert_eq!(store.player_count(), 1);
        assert_eq!(store.local_view().score, 10);
    }

    #[test]
    fn test_leaderboard_replaced_with_snapshot() {
        let mut store = WorldStateStore::new();
        let frame = decode_frame(
            r#"{"type":"game_state","state":{"players":{},"foods":[]},
                "leaderboard":[{"username":"ada","score":50},{"username":"bob","score":20}]}"#,
        )
        .unwrap();

        store.apply(frame, "p1");

        assert_eq!(store.leaderboard().len(), 2);
        assert_eq!(store.leaderboard()[0].username, "ada");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = WorldStateStore::new();
        let mut players = HashMap::new();
        players.insert("p1".to_string(), player(10, 1));
        store.apply(game_state(players), "p1");
        store.apply(
            ServerFrame::RoomJoined {
                room_id: "global".to_string(),
            },
            "p1",
        );

        store.clear();

        assert!(store.snapshot().is_none());
        assert!(store.room_label().is_none());
        assert_eq!(store.local_view(), LocalPlayerView::default());
        assert!(store.leaderboard().is_empty());
    }
}
