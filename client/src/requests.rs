//! Builders for the JSON frames a phone sends, plus the step syntax of the
//! command line client.

use serde_json::{json, Value};
use std::time::Duration;

pub fn move_stick(x: f32, y: f32) -> Value {
    json!({"type": "move", "x": x, "y": y})
}

pub fn change_name(name: &str) -> Value {
    json!({"type": "change_name", "name": name})
}

pub fn confirm_interaction() -> Value {
    json!({"type": "confirm_interaction"})
}

pub fn dialog(accepted: bool) -> Value {
    if accepted {
        json!({"type": "dialog_confirm"})
    } else {
        json!({"type": "dialog_cancel"})
    }
}

pub fn view_fragment(fragment_id: &str) -> Value {
    json!({"type": "view_fragment", "fragmentId": fragment_id})
}

pub fn rotate_fragment(radians: f32) -> Value {
    json!({"type": "fragment_model_control", "rotation_y": radians})
}

pub fn close_fragment_view() -> Value {
    json!({"type": "close_fragment_view"})
}

pub fn auto_track() -> Value {
    json!({"type": "auto_npc_track"})
}

pub fn puzzle_completed() -> Value {
    json!({"type": "puzzle_completed"})
}

pub fn view_artifact() -> Value {
    json!({"type": "Artifact_view"})
}

pub fn rotate_artifact(radians: f32) -> Value {
    json!({"type": "model_control", "rotation_y": radians})
}

pub fn close_artifact_view() -> Value {
    json!({"type": "close_artifact_view"})
}

pub fn time_weather(time: &str, weather: &str) -> Value {
    json!({"type": "time_weather_change", "time": time, "weather": weather})
}

pub fn mode(auto: bool) -> Value {
    json!({"type": "mode_change", "mode": if auto { "auto" } else { "manual" }})
}

/// One step of a scripted session.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Send(Value),
    Raw(String),
    Wait(Duration),
}

impl Step {
    /// Parses `kind[:args]`, e.g. `move:0,-1`, `name:Alice`, `fragment:fragment3`, `wait:500`.
    pub fn parse(text: &str) -> Result<Step, String> {
        let (kind, args) = match text.split_once(':') {
            Some((kind, args)) => (kind.trim(), args.trim()),
            None => (text.trim(), ""),
        };

        let step = match kind {
            "move" => {
                let (x, y) = pair(args)?;
                Step::Send(move_stick(number(x)?, number(y)?))
            }
            "name" => Step::Send(change_name(args)),
            "talk" => Step::Send(confirm_interaction()),
            "accept" => Step::Send(dialog(true)),
            "decline" => Step::Send(dialog(false)),
            "fragment" => Step::Send(view_fragment(args)),
            "rotate-fragment" => Step::Send(rotate_fragment(number(args)?)),
            "close-fragment" => Step::Send(close_fragment_view()),
            "track" => Step::Send(auto_track()),
            "puzzle" => Step::Send(puzzle_completed()),
            "artifact" => Step::Send(view_artifact()),
            "rotate-artifact" => Step::Send(rotate_artifact(number(args)?)),
            "close-artifact" => Step::Send(close_artifact_view()),
            "weather" => {
                let (time, weather) = pair(args)?;
                Step::Send(time_weather(time, weather))
            }
            "mode" => Step::Send(mode(args.eq_ignore_ascii_case("auto"))),
            "wait" => {
                let millis = args
                    .parse::<u64>()
                    .map_err(|e| format!("bad wait {:?}: {}", args, e))?;
                Step::Wait(Duration::from_millis(millis))
            }
            "raw" => Step::Raw(args.to_string()),
            other => return Err(format!("unknown step {:?}", other)),
        };
        Ok(step)
    }
}

fn pair(args: &str) -> Result<(&str, &str), String> {
    args.split_once(',')
        .map(|(a, b)| (a.trim(), b.trim()))
        .ok_or_else(|| format!("expected two comma separated values, got {:?}", args))
}

fn number(text: &str) -> Result<f32, String> {
    text.parse::<f32>()
        .map_err(|e| format!("bad number {:?}: {}", text, e))
}
