//! # Snake Multiplayer Client
//!
//! Client-side implementation of the multiplayer snake game: it
//! authenticates a user against the HTTP backend, joins a shared or private
//! room over a persistent WebSocket, ingests authoritative world snapshots,
//! and paints them at display rate.
//!
//! ## Architecture Overview
//!
//! The client is deliberately thin. The remote authority owns the whole
//! simulation; this process only forwards intents and draws the last
//! snapshot it received. There is no prediction, no reconciliation, and no
//! interpolation between frames — at low tick rates the motion visibly
//! steps, which is an accepted trade-off for a model with no client-side
//! state to mis-predict.
//!
//! Everything runs on one cooperative frame loop. The WebSocket connection
//! and HTTP calls live on a background tokio runtime and communicate with
//! the loop exclusively through channels that are drained once per frame, so
//! painting and input handling never wait on the network.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! The session transport: connection lifecycle, the at-most-one-connection
//! guarantee, best-effort intent sending, and the single delayed reconnect
//! attempt after an unexpected close, generation-scoped so a stale timer can
//! never resurrect an abandoned room.
//!
//! ### Game Module (`game`)
//! The world state store: the latest snapshot, the room leaderboard, and the
//! values derived for the local player. Snapshots are swapped wholesale; the
//! render path never observes a half-applied update.
//!
//! ### Input Module (`input`)
//! Maps keyboard and on-screen controls to movement intents. Intents are
//! fire-and-forget; the authority is the only arbiter of legality.
//!
//! ### Rendering Module (`rendering`)
//! Paints the grid, foods, and snakes from the current snapshot. Painting is
//! a pure function of the store contents and degrades to background-only
//! when no snapshot exists yet.
//!
//! ### Api Module (`api`)
//! The HTTP collaborators (login, registration, profile, shop, global
//! leaderboard) and the persisted bearer token.
//!
//! ### App Module (`app`)
//! The view state machine tying it all together. The current view is
//! explicit shared state: it gates input capture, game painting, and the
//! reconnect scheduler alike.

pub mod api;
pub mod app;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
