//! Application state machine: which view is visible, the local session, and
//! the wiring between input, transport, store, collaborators, and painting.
//!
//! The current view is explicit shared state. Both the render path and the
//! reconnect scheduler read it from here, so navigating away from the game
//! stops painting and kills pending reconnects without any implicit queries.

use log::{info, warn};
use macroquad::hash;
use macroquad::prelude::*;
use macroquad::ui::{root_ui, widgets};
use ::rand::Rng;
use shared::{skin_color, ClientIntent, ServerFrame};
use std::path::PathBuf;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::api::{self, ApiClient, ApiEvent, GlobalScore, UserProfile};
use crate::game::WorldStateStore;
use crate::input::InputController;
use crate::network::{ConnectionState, JoinInfo, SessionTransport, TransportEvent};
use crate::rendering::{RenderConfig, Renderer, BOARD_HEIGHT, BOARD_WIDTH};

pub const WINDOW_WIDTH: i32 = 820;
pub const WINDOW_HEIGHT: i32 = 700;

/// Top-left corner of the play field inside the window; the strip above it
/// holds the HUD.
const BOARD_ORIGIN: Vec2 = Vec2::new(10.0, 90.0);

const GLOBAL_ROOM: &str = "global";
const ROOM_CODE_LEN: usize = 6;

/// Purchasable skins: id, display name, price in coins.
pub const SKIN_CATALOG: &[(&str, &str, u32)] = &[
    ("green", "Green Snake", 100),
    ("blue", "Blue Snake", 150),
    ("red", "Red Snake", 200),
    ("purple", "Purple Snake", 300),
    ("orange", "Orange Snake", 400),
    ("pink", "Pink Snake", 500),
    ("gold", "Golden Snake", 1000),
];

/// The page currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Auth,
    Menu,
    Game,
    Shop,
    Leaderboard,
}

#[derive(Debug)]
pub struct Session {
    /// Opaque id minted at startup, stable for the process lifetime.
    pub player_id: String,
    pub room_id: String,
    pub connection_state: ConnectionState,
}

/// `player_` plus nine random base-36 characters.
pub fn generate_player_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = ::rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("player_{}", suffix)
}

/// Six uppercase alphanumerics, the code of a private room.
pub fn generate_room_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = ::rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

struct Notice {
    text: String,
    success: bool,
}

impl Notice {
    fn error(text: String) -> Self {
        Notice {
            text,
            success: false,
        }
    }

    fn success(text: String) -> Self {
        Notice {
            text,
            success: true,
        }
    }

    fn color(&self) -> Color {
        if self.success {
            Color::from_rgba(77, 255, 145, 255)
        } else {
            Color::from_rgba(255, 71, 87, 255)
        }
    }
}

pub struct AppConfig {
    pub base_url: String,
    pub token_file: PathBuf,
    pub draw_grid: bool,
}

pub struct App {
    config: AppConfig,
    view: View,
    session: Session,

    transport: SessionTransport,
    store: WorldStateStore,
    input: InputController,
    renderer: Renderer,

    api: ApiClient,
    api_rx: UnboundedReceiver<ApiEvent>,
    token: Option<String>,
    user: Option<UserProfile>,

    username_field: String,
    password_field: String,
    room_code_field: String,
    show_room_entry: bool,
    auth_notice: Option<Notice>,
    shop_notice: Option<Notice>,
    global_scores: Vec<GlobalScore>,
}

impl App {
    pub fn new(config: AppConfig, handle: Handle) -> Self {
        let player_id = generate_player_id();
        info!("Session player id: {}", player_id);

        let transport =
            SessionTransport::new(handle.clone(), config.base_url.clone(), player_id.clone());
        let (api, api_rx) = ApiClient::new(handle, config.base_url.clone());

        // Silent session restore: a stored token routes straight to the menu
        // once the profile call succeeds; rejection lands on the auth view.
        let token = api::load_token(&config.token_file);
        if let Some(token) = &token {
            info!("Found stored session token, restoring session");
            api.fetch_profile(token.clone(), true);
        }

        let renderer = Renderer::new(
            BOARD_ORIGIN,
            RenderConfig {
                draw_grid: config.draw_grid,
            },
        );
        let pad_origin = vec2(
            BOARD_ORIGIN.x + 20.0,
            BOARD_ORIGIN.y + BOARD_HEIGHT - 160.0,
        );

        App {
            config,
            view: View::Auth,
            session: Session {
                player_id,
                room_id: GLOBAL_ROOM.to_string(),
                connection_state: ConnectionState::Disconnected,
            },
            transport,
            store: WorldStateStore::new(),
            input: InputController::new(pad_origin),
            renderer,
            api,
            api_rx,
            token,
            user: None,
            username_field: String::new(),
            password_field: String::new(),
            room_code_field: String::new(),
            show_room_entry: false,
            auth_notice: None,
            shop_notice: None,
            global_scores: Vec::new(),
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// One cooperative step: drain collaborator results, drain transport
    /// events, then handle game input. Nothing here blocks.
    pub fn update(&mut self) {
        self.drain_api_events();
        self.drain_transport_events();

        if self.view == View::Game {
            if let Some(direction) = self.input.poll() {
                self.transport.send(&ClientIntent::Move { direction });
            }
            if is_key_pressed(KeyCode::Escape) {
                self.leave_game();
            }
        }
    }

    fn drain_transport_events(&mut self) {
        let game_view_active = self.view == View::Game;
        for event in self.transport.poll(game_view_active) {
            match event {
                TransportEvent::Opened { .. } => {
                    // Joined is only reached once the room is confirmed.
                }
                TransportEvent::Frame { frame, .. } => {
                    if matches!(frame, ServerFrame::RoomJoined { .. }) {
                        self.session.connection_state = ConnectionState::Joined;
                    }
                    self.store.apply(frame, &self.session.player_id);
                }
                TransportEvent::Closed { .. } => {
                    self.session.connection_state = if self.transport.reconnect_pending() {
                        ConnectionState::Connecting
                    } else {
                        ConnectionState::Disconnected
                    };
                }
            }
        }
    }

    fn drain_api_events(&mut self) {
        while let Ok(event) = self.api_rx.try_recv() {
            match event {
                ApiEvent::Login(Ok((token, user))) => {
                    api::store_token(&self.config.token_file, &token);
                    self.token = Some(token);
                    self.user = Some(user);
                    self.password_field.clear();
                    self.auth_notice = None;
                    self.view = View::Menu;
                }
                ApiEvent::Login(Err(e)) => {
                    self.auth_notice = Some(Notice::error(e.user_message()));
                }
                ApiEvent::Register(Ok(())) => {
                    self.username_field.clear();
                    self.password_field.clear();
                    self.auth_notice = Some(Notice::success(
                        "Registration successful! Please login.".to_string(),
                    ));
                }
                ApiEvent::Register(Err(e)) => {
                    self.auth_notice = Some(Notice::error(e.user_message()));
                }
                ApiEvent::Profile {
                    restore,
                    result: Ok(user),
                } => {
                    self.user = Some(user);
                    if restore && self.view == View::Auth {
                        self.view = View::Menu;
                    }
                }
                ApiEvent::Profile { restore, result: Err(e) } => {
                    if restore || e.is_unauthorized() {
                        // Stored token was rejected: back to authentication.
                        warn!("Session restore failed: {}", e);
                        api::clear_token(&self.config.token_file);
                        self.token = None;
                    } else {
                        warn!("Profile refresh failed: {}", e);
                    }
                }
                ApiEvent::BuySkin(Ok(())) => {
                    self.shop_notice = Some(Notice::success("Skin purchased!".to_string()));
                    self.refresh_profile();
                }
                ApiEvent::BuySkin(Err(e)) => {
                    self.shop_notice = Some(Notice::error(e.user_message()));
                }
                ApiEvent::SelectSkin(Ok(())) => {
                    self.shop_notice = None;
                    self.refresh_profile();
                }
                ApiEvent::SelectSkin(Err(e)) => {
                    self.shop_notice = Some(Notice::error(e.user_message()));
                }
                ApiEvent::Leaderboard(Ok(scores)) => {
                    self.global_scores = scores;
                }
                ApiEvent::Leaderboard(Err(e)) => {
                    warn!("Failed to load global leaderboard: {}", e);
                }
            }
        }
    }

    fn refresh_profile(&mut self) {
        if let Some(token) = &self.token {
            self.api.fetch_profile(token.clone(), false);
        }
    }

    /// Joins a room: sets the session room, opens the transport, and flips
    /// to the game view. Connecting twice simply replaces the connection.
    pub fn join_room(&mut self, room_id: String) {
        let Some(user) = &self.user else {
            return;
        };
        let join = JoinInfo {
            username: user.username.clone(),
            skin: user.current_skin.clone(),
            color: skin_color(&user.current_skin).to_string(),
        };

        self.store.clear();
        self.session.room_id = room_id.clone();
        self.session.connection_state = ConnectionState::Connecting;
        self.transport.connect(&room_id, join);
        self.view = View::Game;
    }

    /// Explicit leave: tears the connection down (cancelling any pending
    /// reconnect) and returns to the menu.
    pub fn leave_game(&mut self) {
        self.transport.close();
        self.store.clear();
        self.session.connection_state = ConnectionState::Disconnected;
        self.view = View::Menu;
        self.refresh_profile();
    }

    pub fn logout(&mut self) {
        api::clear_token(&self.config.token_file);
        self.token = None;
        self.user = None;
        self.transport.close();
        self.store.clear();
        self.session.connection_state = ConnectionState::Disconnected;
        self.username_field.clear();
        self.password_field.clear();
        self.auth_notice = None;
        self.view = View::Auth;
    }

    fn submit_login(&mut self) {
        let username = self.username_field.trim().to_string();
        let password = self.password_field.clone();
        if username.is_empty() || password.is_empty() {
            self.auth_notice = Some(Notice::error(
                "Please enter username and password".to_string(),
            ));
            return;
        }
        self.api.login(username, password);
    }

    fn submit_register(&mut self) {
        let username = self.username_field.trim().to_string();
        let password = self.password_field.clone();
        if username.is_empty() || password.is_empty() {
            self.auth_notice = Some(Notice::error(
                "Please enter username and password".to_string(),
            ));
            return;
        }
        if username.len() < 3 {
            self.auth_notice = Some(Notice::error(
                "Username must be at least 3 characters".to_string(),
            ));
            return;
        }
        if password.len() < 6 {
            self.auth_notice = Some(Notice::error(
                "Password must be at least 6 characters".to_string(),
            ));
            return;
        }
        self.api.register(username, password);
    }

    pub fn draw(&mut self) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        match self.view {
            View::Auth => self.draw_auth(),
            View::Menu => self.draw_menu(),
            View::Game => self.draw_game(),
            View::Shop => self.draw_shop(),
            View::Leaderboard => self.draw_leaderboard(),
        }
    }

    fn draw_auth(&mut self) {
        draw_text("SNAKE MULTIPLAYER", 240.0, 120.0, 40.0, WHITE);

        let mut login_clicked = false;
        let mut register_clicked = false;

        widgets::Window::new(hash!(), vec2(250.0, 200.0), vec2(320.0, 200.0))
            .label("Sign in")
            .titlebar(true)
            .movable(false)
            .ui(&mut *root_ui(), |ui| {
                ui.input_text(hash!(), "Username", &mut self.username_field);
                ui.input_password(hash!(), "Password", &mut self.password_field);
                ui.separator();
                if ui.button(None, "Login") {
                    login_clicked = true;
                }
                ui.same_line(120.0);
                if ui.button(None, "Register") {
                    register_clicked = true;
                }
            });

        if let Some(notice) = &self.auth_notice {
            draw_text(&notice.text, 250.0, 430.0, 18.0, notice.color());
        }

        if login_clicked || is_key_pressed(KeyCode::Enter) {
            self.submit_login();
        }
        if register_clicked {
            self.submit_register();
        }
    }

    fn draw_menu(&mut self) {
        let (username, total_score, total_coins) = match &self.user {
            Some(user) => (user.username.clone(), user.total_score, user.total_coins),
            None => (String::new(), 0, 0),
        };

        draw_text(&format!("Welcome, {}", username), 40.0, 60.0, 30.0, WHITE);
        draw_text(
            &format!("Total score: {}    Coins: {}", total_score, total_coins),
            40.0,
            95.0,
            20.0,
            Color::from_rgba(180, 180, 180, 255),
        );

        let mut action: Option<MenuAction> = None;

        widgets::Window::new(hash!(), vec2(250.0, 160.0), vec2(320.0, 300.0))
            .label("Play")
            .titlebar(true)
            .movable(false)
            .ui(&mut *root_ui(), |ui| {
                if ui.button(None, "Join Global Room") {
                    action = Some(MenuAction::JoinGlobal);
                }
                if ui.button(None, "Create Private Room") {
                    action = Some(MenuAction::CreatePrivate);
                }
                if ui.button(None, "Join Private Room") {
                    action = Some(MenuAction::ToggleRoomEntry);
                }
                if self.show_room_entry {
                    ui.input_text(hash!(), "Room code", &mut self.room_code_field);
                    if ui.button(None, "Join") {
                        action = Some(MenuAction::JoinPrivate);
                    }
                }
                ui.separator();
                if ui.button(None, "Shop") {
                    action = Some(MenuAction::Shop);
                }
                if ui.button(None, "Leaderboard") {
                    action = Some(MenuAction::Leaderboard);
                }
                if ui.button(None, "Logout") {
                    action = Some(MenuAction::Logout);
                }
            });

        match action {
            Some(MenuAction::JoinGlobal) => self.join_room(GLOBAL_ROOM.to_string()),
            Some(MenuAction::CreatePrivate) => {
                let code = generate_room_code();
                info!("Created private room {}", code);
                self.join_room(code);
            }
            Some(MenuAction::ToggleRoomEntry) => {
                self.show_room_entry = !self.show_room_entry;
            }
            Some(MenuAction::JoinPrivate) => {
                let code = self.room_code_field.trim().to_uppercase();
                if code.len() == ROOM_CODE_LEN {
                    self.room_code_field.clear();
                    self.show_room_entry = false;
                    self.join_room(code);
                }
            }
            Some(MenuAction::Shop) => {
                self.shop_notice = None;
                self.view = View::Shop;
            }
            Some(MenuAction::Leaderboard) => {
                self.api.fetch_leaderboard(20);
                self.view = View::Leaderboard;
            }
            Some(MenuAction::Logout) => self.logout(),
            None => {}
        }
    }

    fn draw_game(&mut self) {
        self.draw_game_hud();
        self.renderer.draw(self.store.snapshot());
        self.input.draw_pad();
        self.draw_room_leaderboard();

        let mut leave_clicked = false;
        widgets::Window::new(
            hash!(),
            vec2(WINDOW_WIDTH as f32 - 110.0, 10.0),
            vec2(100.0, 46.0),
        )
        .titlebar(false)
        .movable(false)
        .ui(&mut *root_ui(), |ui| {
            if ui.button(None, "Leave (Esc)") {
                leave_clicked = true;
            }
        });
        if leave_clicked {
            self.leave_game();
        }
    }

    fn draw_game_hud(&self) {
        let local = self.store.local_view();
        let room = self
            .store
            .room_label()
            .unwrap_or(&self.session.room_id)
            .to_string();

        let status = match self.session.connection_state {
            ConnectionState::Joined => String::new(),
            ConnectionState::Connecting => {
                if self.transport.reconnect_pending() {
                    " - reconnecting...".to_string()
                } else {
                    " - connecting...".to_string()
                }
            }
            ConnectionState::Disconnected => " - disconnected".to_string(),
        };

        draw_text(&format!("Room: {}{}", room, status), 10.0, 30.0, 24.0, WHITE);
        draw_text(
            &format!(
                "Score: {}    Coins: {}    Players: {}",
                local.score,
                local.coins,
                self.store.player_count()
            ),
            10.0,
            60.0,
            20.0,
            Color::from_rgba(180, 180, 180, 255),
        );
    }

    /// Top five of the room leaderboard, local player highlighted.
    fn draw_room_leaderboard(&self) {
        let entries = self.store.leaderboard();
        if entries.is_empty() {
            return;
        }

        let local_name = self.user.as_ref().map(|u| u.username.as_str());
        let x = BOARD_ORIGIN.x + BOARD_WIDTH - 180.0;
        let mut y = BOARD_ORIGIN.y + 20.0;

        draw_rectangle(
            x - 10.0,
            y - 16.0,
            180.0,
            16.0 * (entries.len().min(5) as f32 + 1.0) + 10.0,
            Color::from_rgba(0, 0, 0, 120),
        );

        for (rank, entry) in entries.iter().take(5).enumerate() {
            let color = if Some(entry.username.as_str()) == local_name {
                Color::from_rgba(77, 255, 145, 255)
            } else {
                WHITE
            };
            draw_text(
                &format!("{}. {}  {}", rank + 1, entry.username, entry.score),
                x,
                y,
                16.0,
                color,
            );
            y += 16.0;
        }
    }

    fn draw_shop(&mut self) {
        let (coins, owned, current) = match &self.user {
            Some(user) => (
                user.total_coins,
                user.owned_skins.clone(),
                user.current_skin.clone(),
            ),
            None => (0, Vec::new(), String::new()),
        };

        draw_text("SKIN SHOP", 40.0, 60.0, 30.0, WHITE);
        draw_text(
            &format!("Coins: {}", coins),
            40.0,
            95.0,
            20.0,
            Color::from_rgba(255, 215, 0, 255),
        );

        let mut action: Option<ShopAction> = None;

        widgets::Window::new(hash!(), vec2(200.0, 120.0), vec2(420.0, 470.0))
            .label("Skins")
            .titlebar(true)
            .movable(false)
            .ui(&mut *root_ui(), |ui| {
                for (i, (skin_id, name, price)) in SKIN_CATALOG.iter().enumerate() {
                    widgets::Group::new(hash!("skin", i), vec2(400.0, 52.0)).ui(ui, |ui| {
                        let is_owned = owned.iter().any(|s| s == skin_id);
                        let is_current = current == *skin_id;

                        ui.label(None, name);
                        if is_current {
                            ui.label(None, "Selected");
                        } else if is_owned {
                            if ui.button(None, "Select") {
                                action = Some(ShopAction::Select(skin_id.to_string()));
                            }
                        } else {
                            ui.label(None, &format!("{} coins", price));
                            if ui.button(None, "Buy") {
                                action = Some(ShopAction::Buy(skin_id.to_string(), *price));
                            }
                        }
                    });
                }
                ui.separator();
                if ui.button(None, "Back") {
                    action = Some(ShopAction::Back);
                }
            });

        if let Some(notice) = &self.shop_notice {
            draw_text(&notice.text, 200.0, 620.0, 18.0, notice.color());
        }

        match action {
            Some(ShopAction::Buy(skin_id, price)) => {
                if coins < price {
                    self.shop_notice = Some(Notice::error("Not enough coins!".to_string()));
                } else if let Some(token) = &self.token {
                    self.api.buy_skin(token.clone(), skin_id, price);
                }
            }
            Some(ShopAction::Select(skin_id)) => {
                if let Some(token) = &self.token {
                    self.api.select_skin(token.clone(), skin_id);
                }
            }
            Some(ShopAction::Back) => {
                self.view = View::Menu;
            }
            None => {}
        }
    }

    fn draw_leaderboard(&mut self) {
        draw_text("GLOBAL LEADERBOARD", 40.0, 60.0, 30.0, WHITE);

        let mut back_clicked = false;
        widgets::Window::new(hash!(), vec2(220.0, 100.0), vec2(380.0, 520.0))
            .label("Top players")
            .titlebar(true)
            .movable(false)
            .ui(&mut *root_ui(), |ui| {
                if self.global_scores.is_empty() {
                    ui.label(None, "Loading...");
                }
                for (rank, entry) in self.global_scores.iter().enumerate() {
                    ui.label(
                        None,
                        &format!("{:>2}. {}  {}", rank + 1, entry.username, entry.total_score),
                    );
                }
                ui.separator();
                if ui.button(None, "Back") {
                    back_clicked = true;
                }
            });

        if back_clicked {
            self.view = View::Menu;
        }
    }
}

enum MenuAction {
    JoinGlobal,
    CreatePrivate,
    ToggleRoomEntry,
    JoinPrivate,
    Shop,
    Leaderboard,
    Logout,
}

enum ShopAction {
    Buy(String, u32),
    Select(String),
    Back,
}
