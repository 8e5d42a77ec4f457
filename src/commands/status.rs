use crate::domain::models::{AppError, MovementState};
use serde::Serialize;

pub const WAITING_FOR_LOCATION: &str = "Waiting for location...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub info: String,
    pub motion: String,
    pub toggle_label: String,
}

/// Text above the map: an error wins over a fix, a fix wins over waiting.
pub fn location_text(snapshot: Option<&MovementState>, error: Option<&AppError>) -> String {
    if let Some(error) = error {
        return error.message.clone();
    }
    match snapshot {
        Some(snapshot) => format!(
            "Lat: {:.5}, Lng: {:.5}",
            snapshot.current.latitude, snapshot.current.longitude
        ),
        None => WAITING_FOR_LOCATION.to_string(),
    }
}

pub fn status_view(snapshot: Option<&MovementState>, error: Option<&AppError>) -> StatusView {
    let motion = snapshot
        .map(MovementState::motion_state)
        .unwrap_or_default();
    StatusView {
        info: location_text(snapshot, error),
        motion: format!("Motion: {}", motion.status_label()),
        toggle_label: motion.toggle_label().to_string(),
    }
}
