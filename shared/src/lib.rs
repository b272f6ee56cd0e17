//! Wire protocol shared by the museum quest server and phone clients.
//!
//! Phones talk to the server with one JSON object per WebSocket text frame.
//! Every frame carries a `type` discriminator; [`decode`] turns inbound frames
//! into [`Command`] values and [`ServerMessage`] describes everything the
//! server sends back.

pub mod command;
pub mod message;

pub use command::{decode, fragment_index, fragment_label, Command};
pub use message::{AckStatus, ServerMessage, TaskStateLabel};

/// Port the server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 8888;
/// Fragments a player must collect before the puzzle unlocks.
pub const DEFAULT_FRAGMENT_COUNT: usize = 9;
/// Prefix of the fragment ids the phone inventory sends (`fragment1` ...).
pub const FRAGMENT_ID_PREFIX: &str = "fragment";
/// Squared joystick magnitude below which input counts as released.
pub const JOYSTICK_DEADZONE_SQ: f32 = 0.0001;
