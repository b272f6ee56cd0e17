use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Get current timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

// Linear interpolation, `t` is expected in [0, 1]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

// Replace NaN/inf with zero and clamp to [-1, 1]
pub fn clamp_axis(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

// Landmark name of a fragment spot: index 0 -> "01"
pub fn fragment_landmark_name(index: usize) -> String {
    format!("{:02}", index + 1)
}
