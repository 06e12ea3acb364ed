use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const GRID_WIDTH: i32 = 40;
pub const GRID_HEIGHT: i32 = 30;

/// Fallback snake color when a skin id is unknown or a frame omits the color.
pub const DEFAULT_COLOR: &str = "#4dff91";

/// Returns true when a grid coordinate addresses a cell of the play field.
pub fn in_bounds(x: i32, y: i32) -> bool {
    (0..GRID_WIDTH).contains(&x) && (0..GRID_HEIGHT).contains(&y)
}

/// Client-originated intents, JSON-encoded as `{"action": ..., ...}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientIntent {
    JoinRoom {
        room_id: String,
        username: String,
        skin: String,
        color: String,
    },
    Move {
        direction: Direction,
    },
}

/// Frames emitted by the remote authority, JSON-encoded as `{"type": ..., ...}`.
///
/// Payload fields the authority sends beyond what the client reads (tick
/// timestamps, food values, room grid size) are ignored on decode.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    RoomJoined {
        room_id: String,
    },
    GameState {
        state: Snapshot,
        #[serde(default)]
        leaderboard: Vec<RoomScore>,
    },
    PlayerJoined {
        #[serde(default)]
        player: Option<PlayerNotice>,
    },
    PlayerLeft {
        #[serde(default)]
        player_id: Option<String>,
    },
}

/// One full authoritative world-state frame. Replaced wholesale on arrival;
/// the client keeps no history.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Snapshot {
    #[serde(default)]
    pub players: HashMap<String, PlayerState>,
    #[serde(default)]
    pub foods: Vec<FoodItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerState {
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_skin")]
    pub skin: String,
    #[serde(default = "default_color")]
    pub color: String,
    /// Grid coordinates, head first.
    pub body: Vec<(i32, i32)>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub coins: u32,
    #[serde(default = "default_alive")]
    pub alive: bool,
}

fn default_skin() -> String {
    "default".to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_alive() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FoodItem {
    pub position: (i32, i32),
    #[serde(rename = "type", default)]
    pub kind: FoodKind,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
    #[default]
    Normal,
    Golden,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Per-room leaderboard entry carried inside `game_state` frames.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomScore {
    pub username: String,
    #[serde(default)]
    pub score: u32,
}

/// Advisory payload of a `player_joined` notification.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerNotice {
    pub id: String,
    #[serde(default)]
    pub username: String,
}

pub fn encode_intent(intent: &ClientIntent) -> Result<String, serde_json::Error> {
    serde_json::to_string(intent)
}

pub fn decode_frame(text: &str) -> Result<ServerFrame, serde_json::Error> {
    serde_json::from_str(text)
}

/// Parses a `#rrggbb` color string into its channels.
pub fn parse_hex_color(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 {
        return None;
    }
    let n = u32::from_str_radix(hex, 16).ok()?;
    Some((((n >> 16) & 0xff) as u8, ((n >> 8) & 0xff) as u8, (n & 0xff) as u8))
}

/// Darkens each RGB channel by `round(2.55 * percent)`, clamped to [0, 255],
/// and formats the result back as a lowercase `#rrggbb` string. Unparseable
/// input is returned unchanged.
pub fn darken_color(color: &str, percent: u32) -> String {
    let Some((r, g, b)) = parse_hex_color(color) else {
        return color.to_string();
    };
    let amt = (2.55 * percent as f64).round() as i32;
    let dim = |c: u8| (c as i32 - amt).clamp(0, 255) as u8;
    format!("#{:02x}{:02x}{:02x}", dim(r), dim(g), dim(b))
}

/// Maps a skin id to its snake color. Unknown skins fall back to the default.
pub fn skin_color(skin: &str) -> &'static str {
    match skin {
        "default" => DEFAULT_COLOR,
        "green" => "#00ff00",
        "blue" => "#0099ff",
        "red" => "#ff4757",
        "purple" => "#9d4edd",
        "orange" => "#ff9900",
        "pink" => "#ff66cc",
        "gold" => "#ffd700",
        _ => DEFAULT_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_room_envelope() {
        let intent = ClientIntent::JoinRoom {
            room_id: "global".to_string(),
            username: "ada".to_string(),
            skin: "blue".to_string(),
            color: "#0099ff".to_string(),
        };

        let encoded = encode_intent(&intent).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(
            value,
            json!({
                "action": "join_room",
                "room_id": "global",
                "username": "ada",
                "skin": "blue",
                "color": "#0099ff"
            })
        );
    }

    #[test]
    fn test_move_envelope() {
        let intent = ClientIntent::Move {
            direction: Direction::Up,
        };

        let encoded = encode_intent(&intent).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value, json!({"action": "move", "direction": "UP"}));
    }

    #[test]
    fn test_decode_room_joined_ignores_extra_fields() {
        let text =
            r#"{"type":"room_joined","room_id":"ABX2K9","grid_size":{"width":40,"height":30}}"#;

        match decode_frame(text).unwrap() {
            ServerFrame::RoomJoined { room_id } => assert_eq!(room_id, "ABX2K9"),
            other => panic!("wrong frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_game_state_full_shape() {
        // Mirrors the authority's broadcast, including fields the client ignores.
        let text = json!({
            "type": "game_state",
            "state": {
                "room_id": "global",
                "timestamp": 1712.5,
                "players": {
                    "p1": {
                        "player_id": "p1",
                        "username": "ada",
                        "skin": "gold",
                        "color": "#ffd700",
                        "body": [[5, 5], [4, 5], [3, 5]],
                        "direction": "RIGHT",
                        "score": 30,
                        "coins": 12,
                        "alive": true
                    }
                },
                "foods": [
                    {"position": [6, 5], "type": "normal", "value": 10},
                    {"position": [0, 0], "type": "golden", "value": 30}
                ]
            },
            "leaderboard": [
                {"username": "ada", "score": 30, "coins": 12, "alive": true}
            ]
        })
        .to_string();

        let frame = decode_frame(&text).unwrap();
        let ServerFrame::GameState { state, leaderboard } = frame else {
            panic!("wrong frame kind");
        };

        let p1 = state.players.get("p1").unwrap();
        assert_eq!(p1.body, vec![(5, 5), (4, 5), (3, 5)]);
        assert_eq!(p1.direction, Some(Direction::Right));
        assert_eq!(p1.score, 30);
        assert_eq!(p1.coins, 12);
        assert!(p1.alive);

        assert_eq!(state.foods.len(), 2);
        assert_eq!(state.foods[0].kind, FoodKind::Normal);
        assert_eq!(state.foods[1].kind, FoodKind::Golden);

        assert_eq!(leaderboard.len(), 1);
        assert_eq!(leaderboard[0].username, "ada");
        assert_eq!(leaderboard[0].score, 30);
    }

    #[test]
    fn test_decode_defaults_for_sparse_player() {
        let text = r#"{"type":"game_state","state":{"players":{"p2":{"body":[[1,2]]}},"foods":[]}}"#;

        let ServerFrame::GameState { state, leaderboard } = decode_frame(text).unwrap() else {
            panic!("wrong frame kind");
        };

        let p2 = state.players.get("p2").unwrap();
        assert_eq!(p2.direction, None);
        assert_eq!(p2.score, 0);
        assert_eq!(p2.coins, 0);
        assert!(p2.alive);
        assert_eq!(p2.color, DEFAULT_COLOR);
        assert!(leaderboard.is_empty());
    }

    #[test]
    fn test_decode_advisory_notifications() {
        let joined = r##"{"type":"player_joined","player":{"id":"p9","username":"bob","skin":"red","color":"#ff4757"}}"##;
        match decode_frame(joined).unwrap() {
            ServerFrame::PlayerJoined { player } => {
                let player = player.unwrap();
                assert_eq!(player.id, "p9");
                assert_eq!(player.username, "bob");
            }
            other => panic!("wrong frame: {:?}", other),
        }

        let left = r#"{"type":"player_left","player_id":"p9"}"#;
        match decode_frame(left).unwrap() {
            ServerFrame::PlayerLeft { player_id } => assert_eq!(player_id.as_deref(), Some("p9")),
            other => panic!("wrong frame: {:?}", other),
        }

        // Bare notifications without payload decode too.
        assert!(decode_frame(r#"{"type":"player_joined"}"#).is_ok());
        assert!(decode_frame(r#"{"type":"player_left"}"#).is_ok());
    }

    #[test]
    fn test_decode_rejects_unknown_and_malformed() {
        assert!(decode_frame(r#"{"type":"tournament_started","bracket":[]}"#).is_err());
        assert!(decode_frame("not json at all").is_err());
        assert!(decode_frame(r#"{"no_type_tag":true}"#).is_err());
    }

    #[test]
    fn test_darken_color_reference_case() {
        // 20% darkens each channel by round(2.55 * 20) = 51.
        assert_eq!(darken_color("#4DFF91", 20), "#1acc5e");
    }

    #[test]
    fn test_darken_color_clamps_at_zero() {
        assert_eq!(darken_color("#050505", 20), "#000000");
        assert_eq!(darken_color("#000000", 100), "#000000");
    }

    #[test]
    fn test_darken_color_passes_through_invalid_input() {
        assert_eq!(darken_color("rebeccapurple", 20), "rebeccapurple");
        assert_eq!(darken_color("#abc", 20), "#abc");
    }

    #[test]
    fn test_skin_colors() {
        assert_eq!(skin_color("gold"), "#ffd700");
        assert_eq!(skin_color("default"), DEFAULT_COLOR);
        assert_eq!(skin_color("no-such-skin"), DEFAULT_COLOR);
    }

    #[test]
    fn test_grid_bounds() {
        assert!(in_bounds(0, 0));
        assert!(in_bounds(GRID_WIDTH - 1, GRID_HEIGHT - 1));
        assert!(!in_bounds(-1, 0));
        assert!(!in_bounds(GRID_WIDTH, 0));
        assert!(!in_bounds(0, GRID_HEIGHT));
    }
}
