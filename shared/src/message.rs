//! Outbound messages.

use serde::{Deserialize, Serialize};

/// Result flag carried by acknowledgements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Success,
    Error,
}

impl AckStatus {
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            AckStatus::Success
        } else {
            AckStatus::Error
        }
    }
}

/// Quest objective shown on the phone's "current target" label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStateLabel {
    CollectFragments,
    ReturnToNpc,
}

/// Everything the server sends to phones, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        message: String,
    },
    NameChanged {
        status: AckStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    FragmentViewAck {
        #[serde(rename = "fragmentId")]
        fragment_id: String,
        status: AckStatus,
        message: String,
        timestamp: u64,
    },
    FragmentControlAck {
        rotation_y: f32,
        status: AckStatus,
        timestamp: u64,
    },
    FragmentHidden {
        message: String,
    },
    PuzzleCompletedAck {
        status: AckStatus,
        message: String,
    },
    ArtifactHidden {
        message: String,
    },
    TaskState {
        state: TaskStateLabel,
    },
    /// Dialog prompt for the NPC conversation.
    Interaction {
        title: String,
        content: String,
    },
    TreasureFound {
        count: usize,
        #[serde(rename = "fragmentIndex")]
        fragment_index: usize,
        total: usize,
    },
    AutoTrackAck {
        status: AckStatus,
        target: String,
        message: String,
    },
    TimeWeatherAck {
        status: AckStatus,
        time: String,
        weather: String,
    },
    ModeAck {
        mode: String,
        status: AckStatus,
    },
    /// Scene-wide environment snapshot, broadcast to every phone.
    Environment {
        time: String,
        weather: String,
        mode: String,
    },
}

impl ServerMessage {
    /// The `type` tag this message serializes with.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::NameChanged { .. } => "name_changed",
            ServerMessage::FragmentViewAck { .. } => "fragment_view_ack",
            ServerMessage::FragmentControlAck { .. } => "fragment_control_ack",
            ServerMessage::FragmentHidden { .. } => "fragment_hidden",
            ServerMessage::PuzzleCompletedAck { .. } => "puzzle_completed_ack",
            ServerMessage::ArtifactHidden { .. } => "artifact_hidden",
            ServerMessage::TaskState { .. } => "task_state",
            ServerMessage::Interaction { .. } => "interaction",
            ServerMessage::TreasureFound { .. } => "treasure_found",
            ServerMessage::AutoTrackAck { .. } => "auto_track_ack",
            ServerMessage::TimeWeatherAck { .. } => "time_weather_ack",
            ServerMessage::ModeAck { .. } => "mode_ack",
            ServerMessage::Environment { .. } => "environment",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
