use crate::domain::state_machine::MotionState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A latitude/longitude pair in degrees. No range is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Euclidean distance in coordinate-degree space.
    pub fn planar_distance(&self, other: &Position) -> f64 {
        (other.latitude - self.latitude).hypot(other.longitude - self.longitude)
    }

    /// Unit vector pointing at `other`, or `None` when the two coincide.
    pub fn direction_to(&self, other: &Position) -> Option<(f64, f64)> {
        let mut delta_lat = other.latitude - self.latitude;
        let mut delta_lng = other.longitude - self.longitude;
        // Opposite-sign extremes overflow the difference itself; halve both sides first.
        if !(delta_lat.is_finite() && delta_lng.is_finite()) {
            delta_lat = other.latitude / 2.0 - self.latitude / 2.0;
            delta_lng = other.longitude / 2.0 - self.longitude / 2.0;
        }
        let length = delta_lat.hypot(delta_lng);
        if length == 0.0 || !length.is_finite() {
            return None;
        }
        Some((delta_lat / length, delta_lng / length))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementState {
    pub current: Position,
    pub target: Option<Position>,
    pub speed: f64,
    pub moving: bool,
}

impl MovementState {
    /// Fresh state from the first location fix: target on the fix, default speed, idle.
    pub fn from_fix(fix: Position, config: &EngineConfig) -> Self {
        Self {
            current: fix,
            target: Some(fix),
            speed: config.default_speed.max(config.min_speed).min(config.max_speed),
            moving: false,
        }
    }

    pub fn motion_state(&self) -> MotionState {
        MotionState::from_moving(self.moving)
    }

    pub fn remaining_distance(&self) -> Option<f64> {
        self.target.map(|target| self.current.planar_distance(&target))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementPatch {
    pub current: Option<Position>,
    pub target: Option<Position>,
    pub speed: Option<f64>,
    pub moving: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    pub epsilon: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub default_speed: f64,
    #[serde(default)]
    pub clamp_step_to_remaining: bool,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        let values = [
            self.epsilon,
            self.min_speed,
            self.max_speed,
            self.default_speed,
        ];
        if values.iter().any(|value| !value.is_finite()) {
            return Err(AppError::new(
                "INVALID_CONFIG",
                "engine config values must be finite numbers",
                None,
            ));
        }
        if self.epsilon <= 0.0 {
            return Err(AppError::new(
                "INVALID_CONFIG",
                format!("epsilon must be positive, got {}", self.epsilon),
                None,
            ));
        }
        if self.min_speed <= 0.0 || self.min_speed > self.max_speed {
            return Err(AppError::new(
                "INVALID_CONFIG",
                format!(
                    "speed range [{}, {}] is not a positive interval",
                    self.min_speed, self.max_speed
                ),
                Some("set minSpeed > 0 and minSpeed <= maxSpeed".to_string()),
            ));
        }
        if self.default_speed < self.min_speed || self.default_speed > self.max_speed {
            return Err(AppError::new(
                "INVALID_CONFIG",
                format!(
                    "defaultSpeed {} lies outside [{}, {}]",
                    self.default_speed, self.min_speed, self.max_speed
                ),
                None,
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.00001,
            min_speed: 0.000001,
            max_speed: 0.0001,
            default_speed: 0.00001,
            clamp_step_to_remaining: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    pub frame_rate_hz: u32,
}

impl DriverConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate_hz.max(1)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { frame_rate_hz: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSettings {
    pub permission_granted: bool,
    pub fix: Option<Position>,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            permission_granted: true,
            fix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRegion {
    pub center: Position,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl MapRegion {
    pub fn around(center: Position) -> Self {
        Self {
            center,
            latitude_delta: 0.005,
            longitude_delta: 0.005,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub session_id: String,
    pub sequence: u64,
    pub current: Position,
    pub target: Option<Position>,
    pub speed: f64,
    pub state: MotionState,
    pub remaining_distance: Option<f64>,
    pub at: DateTime<Utc>,
}

impl RenderFrame {
    pub fn from_state(session_id: &str, sequence: u64, state: &MovementState) -> Self {
        Self {
            session_id: session_id.to_string(),
            sequence,
            current: state.current,
            target: state.target,
            speed: state.speed,
            state: state.motion_state(),
            remaining_distance: state.remaining_distance(),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl AppError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion,
        }
    }

    pub fn lock(what: &str) -> Self {
        Self::new("STATE_LOCK_ERROR", format!("failed to lock {what}"), None)
    }
}
