//! # Museum Quest Server Library
//!
//! This library provides the multiplayer session layer of the museum quest
//! AR game. Phones connect over WebSocket, each one gets an avatar in the
//! shared scene, and a small JSON command protocol lets players walk around,
//! collect treasure fragments, solve the puzzle and inspect the restored
//! artifact.
//!
//! ## Core Responsibilities
//!
//! ### Single Owner Of Game State
//! All scene state lives in one [`game::Game`] value owned by the game loop.
//! Network tasks never touch it directly; they enqueue closures on the
//! [`dispatch::MainThreadQueue`], which the loop drains once per tick before
//! advancing the world.
//!
//! ### Session Management
//! Every connection becomes a [`registry::SessionId`] mapped to one player
//! entity and one display name. Players are spawned from a random avatar
//! template on connect and removed on disconnect.
//!
//! ### Quest Progress
//! [`tasks::PlayerTaskState`] tracks per-player progress from the first chat
//! with the guide to the solved puzzle, and decides where auto-tracking
//! should lead next.
//!
//! ### Navigation Hand-off
//! Auto-tracking attaches a path follower and suspends rigid-body physics;
//! any joystick input immediately stops it and restores the previous body
//! settings so manual control always wins.
//!
//! ## Module Organization
//!
//! ### Protocol Plumbing
//! - `network`: WebSocket accept loop, one reader and one writer task per connection
//! - `responder`: per-connection outbound channels, unicast and broadcast
//! - `dispatch`: closure queue between network tasks and the game loop
//!
//! ### Game Loop
//! - `game`: the owned game context and the fixed-rate loop
//! - `handlers`: one handler per decoded command
//! - `registry`: session to entity and name mapping
//! - `tasks`: quest state machine
//! - `weather`: time of day and weather presets, including the auto cycle
//!
//! ### Scene Model
//! - `entity`: player entities, labels, model views and the world
//! - `navigation`: path-follower seam and the auto-navigation state machine
//! - `movement`: joystick input and manual movement
//! - `physics`: vectors and rigid body settings
//!
//! ### Support
//! - `config`: JSON scene config with defaults for every key
//! - `utils`: timestamps and small numeric helpers

pub mod config;
pub mod dispatch;
pub mod entity;
pub mod game;
pub mod handlers;
pub mod movement;
pub mod navigation;
pub mod network;
pub mod physics;
pub mod registry;
pub mod responder;
pub mod tasks;
pub mod utils;
pub mod weather;

pub use config::ServerConfig;
pub use dispatch::{MainThreadQueue, TaskSender};
pub use game::{run_game_loop, Game};
pub use network::Server;
pub use registry::SessionId;
pub use responder::Responder;
