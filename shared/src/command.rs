//! Inbound command decoding.
//!
//! Decoding is deliberately forgiving: phones run hand-written browser code
//! and occasionally send half-filled objects. Malformed fields fall back to
//! defaults, and anything that cannot be classified becomes
//! [`Command::Unknown`] so the caller can log it. Decoding never fails.

use crate::FRAGMENT_ID_PREFIX;
use log::warn;
use serde_json::{Map, Value};

/// A decoded client request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Joystick vector, each axis nominally in [-1, 1].
    Move { x: f32, y: f32 },
    /// Display name change. `legacy` marks the unacknowledged `update_name` alias.
    ChangeName { name: Option<String>, legacy: bool },
    ConfirmInteraction,
    DialogResult { accepted: bool },
    /// Raw fragment id as sent by the client, echoed back in the ack.
    ViewFragment { fragment_id: Option<String> },
    CloseFragmentView,
    /// Rotation about the vertical axis in radians.
    RotateFragment { angle: Option<f32> },
    ViewArtifactRequest,
    RotateArtifact { angle: Option<f32> },
    CloseArtifactView,
    AutoTrack,
    TimeWeatherChange { time: String, weather: String },
    ModeChange { auto: bool },
    PuzzleCompleted,
    Unknown { raw: String },
}

impl Command {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Move { .. } => "move",
            Command::ChangeName { legacy: false, .. } => "change_name",
            Command::ChangeName { legacy: true, .. } => "update_name",
            Command::ConfirmInteraction => "confirm_interaction",
            Command::DialogResult { accepted: true } => "dialog_confirm",
            Command::DialogResult { accepted: false } => "dialog_cancel",
            Command::ViewFragment { .. } => "view_fragment",
            Command::CloseFragmentView => "close_fragment_view",
            Command::RotateFragment { .. } => "fragment_model_control",
            Command::ViewArtifactRequest => "Artifact_view",
            Command::RotateArtifact { .. } => "model_control",
            Command::CloseArtifactView => "close_artifact_view",
            Command::AutoTrack => "auto_npc_track",
            Command::TimeWeatherChange { .. } => "time_weather_change",
            Command::ModeChange { .. } => "mode_change",
            Command::PuzzleCompleted => "puzzle_completed",
            Command::Unknown { .. } => "unknown",
        }
    }
}

/// Decodes one text frame into a [`Command`].
pub fn decode(raw: &str) -> Command {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Undecodable message ({}): {}", e, raw);
            return unknown(raw);
        }
    };

    let Some(fields) = value.as_object() else {
        warn!("Message is not a JSON object: {}", raw);
        return unknown(raw);
    };

    let Some(kind) = fields.get("type").and_then(Value::as_str) else {
        warn!("Message without a type field: {}", raw);
        return unknown(raw);
    };

    match kind {
        "move" => Command::Move {
            x: number_or_zero(fields, "x", kind),
            y: number_or_zero(fields, "y", kind),
        },
        "change_name" => Command::ChangeName {
            name: name_field(fields),
            legacy: false,
        },
        "update_name" => Command::ChangeName {
            name: name_field(fields),
            legacy: true,
        },
        "confirm_interaction" => Command::ConfirmInteraction,
        "dialog_confirm" => Command::DialogResult { accepted: true },
        "dialog_cancel" => Command::DialogResult { accepted: false },
        "auto_npc_track" => Command::AutoTrack,
        "puzzle_completed" => Command::PuzzleCompleted,
        "Artifact_view" | "artifact_view" => Command::ViewArtifactRequest,
        "view_fragment" => Command::ViewFragment {
            fragment_id: fragment_field(fields),
        },
        "close_fragment_view" => Command::CloseFragmentView,
        "fragment_model_control" => Command::RotateFragment {
            angle: rotation_field(fields, kind),
        },
        "model_control" => Command::RotateArtifact {
            angle: rotation_field(fields, kind),
        },
        "close_artifact_view" => Command::CloseArtifactView,
        "time_weather_change" => Command::TimeWeatherChange {
            time: text_or_empty(fields, "time", kind),
            weather: text_or_empty(fields, "weather", kind),
        },
        "mode_change" => {
            let auto = match fields.get("mode").and_then(Value::as_str) {
                Some(mode) => mode.trim().eq_ignore_ascii_case("auto"),
                None => {
                    warn!("mode_change without a mode, assuming manual");
                    false
                }
            };
            Command::ModeChange { auto }
        }
        other => {
            warn!("Unrecognized message type '{}': {}", other, raw);
            unknown(raw)
        }
    }
}

/// Maps a client fragment id to its 0-based index.
///
/// Accepts the inventory's `fragmentK` form (K counts from 1) and bare
/// 0-based indices. Returns `None` for anything else.
pub fn fragment_index(fragment_id: &str) -> Option<usize> {
    let trimmed = fragment_id.trim();
    match trimmed.strip_prefix(FRAGMENT_ID_PREFIX) {
        Some(number) => number.parse::<usize>().ok()?.checked_sub(1),
        None => trimmed.parse::<usize>().ok(),
    }
}

/// Inverse of [`fragment_index`] for the `fragmentK` form.
pub fn fragment_label(index: usize) -> String {
    format!("{}{}", FRAGMENT_ID_PREFIX, index + 1)
}

fn unknown(raw: &str) -> Command {
    Command::Unknown {
        raw: raw.to_string(),
    }
}

fn number_field(fields: &Map<String, Value>, key: &str) -> Option<f32> {
    let parsed = match fields.get(key)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    } as f32;

    parsed.is_finite().then_some(parsed)
}

fn number_or_zero(fields: &Map<String, Value>, key: &str, kind: &str) -> f32 {
    number_field(fields, key).unwrap_or_else(|| {
        warn!("{} has no usable '{}' field, using 0", kind, key);
        0.0
    })
}

fn rotation_field(fields: &Map<String, Value>, kind: &str) -> Option<f32> {
    let angle = number_field(fields, "rotation_y").or_else(|| number_field(fields, "y"));
    if angle.is_none() {
        warn!("{} has no usable rotation_y/y field", kind);
    }
    angle
}

fn name_field(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn fragment_field(fields: &Map<String, Value>) -> Option<String> {
    let value = fields.get("fragmentId").or_else(|| fields.get("id"))?;
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

fn text_or_empty(fields: &Map<String, Value>, key: &str, kind: &str) -> String {
    match fields.get(key).and_then(Value::as_str) {
        Some(text) => text.trim().to_string(),
        None => {
            warn!("{} has no '{}' field", kind, key);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_decode_move() {
        match decode(r#"{"type":"move","x":0.5,"y":-1.0}"#) {
            Command::Move { x, y } => {
                assert_approx_eq!(x, 0.5);
                assert_approx_eq!(y, -1.0);
            }
            other => panic!("Unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_decode_move_with_bad_axis_falls_back_to_zero() {
        assert_eq!(
            decode(r#"{"type":"move","x":"bad"}"#),
            Command::Move { x: 0.0, y: 0.0 }
        );
        assert_eq!(
            decode(r#"{"type":"move","x":null,"y":"0.25"}"#),
            Command::Move { x: 0.0, y: 0.25 }
        );
        assert_eq!(
            decode(r#"{"type":"move","x":1e300,"y":true}"#),
            Command::Move { x: 0.0, y: 0.0 }
        );
    }

    #[test]
    fn test_decode_names() {
        assert_eq!(
            decode(r#"{"type":"change_name","name":"  Alice "}"#),
            Command::ChangeName {
                name: Some("Alice".to_string()),
                legacy: false
            }
        );
        assert_eq!(
            decode(r#"{"type":"update_name","name":"Bob"}"#),
            Command::ChangeName {
                name: Some("Bob".to_string()),
                legacy: true
            }
        );
        assert_eq!(
            decode(r#"{"type":"change_name","name":"   "}"#),
            Command::ChangeName {
                name: None,
                legacy: false
            }
        );
        assert_eq!(
            decode(r#"{"type":"change_name"}"#),
            Command::ChangeName {
                name: None,
                legacy: false
            }
        );
    }

    #[test]
    fn test_decode_payloadless_commands() {
        let cases = vec![
            (r#"{"type":"confirm_interaction"}"#, Command::ConfirmInteraction),
            (
                r#"{"type":"dialog_confirm"}"#,
                Command::DialogResult { accepted: true },
            ),
            (
                r#"{"type":"dialog_cancel"}"#,
                Command::DialogResult { accepted: false },
            ),
            (r#"{"type":"auto_npc_track"}"#, Command::AutoTrack),
            (r#"{"type":"puzzle_completed"}"#, Command::PuzzleCompleted),
            (r#"{"type":"Artifact_view"}"#, Command::ViewArtifactRequest),
            (r#"{"type":"close_fragment_view"}"#, Command::CloseFragmentView),
            (r#"{"type":"close_artifact_view"}"#, Command::CloseArtifactView),
        ];

        for (raw, expected) in cases {
            assert_eq!(decode(raw), expected, "decoding {}", raw);
        }
    }

    #[test]
    fn test_decode_view_fragment_variants() {
        assert_eq!(
            decode(r#"{"type":"view_fragment","fragmentId":"fragment3","fragmentName":"x"}"#),
            Command::ViewFragment {
                fragment_id: Some("fragment3".to_string())
            }
        );
        assert_eq!(
            decode(r#"{"type":"view_fragment","id":"fragment1"}"#),
            Command::ViewFragment {
                fragment_id: Some("fragment1".to_string())
            }
        );
        assert_eq!(
            decode(r#"{"type":"view_fragment","fragmentId":4}"#),
            Command::ViewFragment {
                fragment_id: Some("4".to_string())
            }
        );
        assert_eq!(
            decode(r#"{"type":"view_fragment"}"#),
            Command::ViewFragment { fragment_id: None }
        );
    }

    #[test]
    fn test_decode_rotation_aliases() {
        assert_eq!(
            decode(r#"{"type":"fragment_model_control","rotation_y":1.5}"#),
            Command::RotateFragment { angle: Some(1.5) }
        );
        assert_eq!(
            decode(r#"{"type":"model_control","y":-0.5}"#),
            Command::RotateArtifact { angle: Some(-0.5) }
        );
        assert_eq!(
            decode(r#"{"type":"model_control"}"#),
            Command::RotateArtifact { angle: None }
        );
    }

    #[test]
    fn test_decode_environment_commands() {
        assert_eq!(
            decode(r#"{"type":"time_weather_change","time":"Night","weather":"Snow"}"#),
            Command::TimeWeatherChange {
                time: "Night".to_string(),
                weather: "Snow".to_string()
            }
        );
        assert_eq!(
            decode(r#"{"type":"time_weather_change"}"#),
            Command::TimeWeatherChange {
                time: String::new(),
                weather: String::new()
            }
        );
        assert_eq!(
            decode(r#"{"type":"mode_change","mode":"AUTO"}"#),
            Command::ModeChange { auto: true }
        );
        assert_eq!(
            decode(r#"{"type":"mode_change","mode":"manual"}"#),
            Command::ModeChange { auto: false }
        );
        assert_eq!(
            decode(r#"{"type":"mode_change"}"#),
            Command::ModeChange { auto: false }
        );
    }

    #[test]
    fn test_decode_unknown_inputs() {
        let raws = vec![
            r#"{"type":"teleport","x":1}"#,
            r#"{"x":1}"#,
            r#"{"type":42}"#,
            r#"[1,2,3]"#,
            "not json at all",
            "",
        ];

        for raw in raws {
            assert_eq!(
                decode(raw),
                Command::Unknown {
                    raw: raw.to_string()
                },
                "decoding {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_fragment_index_parsing() {
        assert_eq!(fragment_index("fragment1"), Some(0));
        assert_eq!(fragment_index("fragment9"), Some(8));
        assert_eq!(fragment_index(" fragment12 "), Some(11));
        assert_eq!(fragment_index("3"), Some(3));
        assert_eq!(fragment_index("fragment0"), None);
        assert_eq!(fragment_index("fragment"), None);
        assert_eq!(fragment_index("fragmentX"), None);
        assert_eq!(fragment_index("-1"), None);
        assert_eq!(fragment_index(""), None);
    }

    #[test]
    fn test_fragment_label_matches_index() {
        for index in 0..9 {
            assert_eq!(fragment_index(&fragment_label(index)), Some(index));
        }
        assert_eq!(fragment_label(0), "fragment1");
    }

    #[test]
    fn test_command_kind_names() {
        assert_eq!(Command::AutoTrack.kind(), "auto_npc_track");
        assert_eq!(
            Command::ChangeName {
                name: None,
                legacy: true
            }
            .kind(),
            "update_name"
        );
        assert_eq!(
            Command::Unknown { raw: String::new() }.kind(),
            "unknown"
        );
    }
}
