use crate::domain::models::{AppError, LocationSettings};
use crate::infra::storage::settings_store::{
    load_or_default_settings, save_settings, SettingsFile,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettingsPatch {
    pub epsilon: Option<f64>,
    pub min_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub default_speed: Option<f64>,
    pub clamp_step_to_remaining: Option<bool>,
    pub frame_rate_hz: Option<u32>,
}

pub fn load_settings(path: &Path) -> Result<SettingsFile, AppError> {
    load_or_default_settings(path)
}

/// Applies the patch, validates, then persists. Takes effect for sessions opened afterwards.
pub fn update_engine_settings(
    path: &Path,
    patch: EngineSettingsPatch,
) -> Result<SettingsFile, AppError> {
    let mut settings = load_or_default_settings(path)?;
    if let Some(epsilon) = patch.epsilon {
        settings.engine.epsilon = epsilon;
    }
    if let Some(min_speed) = patch.min_speed {
        settings.engine.min_speed = min_speed;
    }
    if let Some(max_speed) = patch.max_speed {
        settings.engine.max_speed = max_speed;
    }
    if let Some(default_speed) = patch.default_speed {
        settings.engine.default_speed = default_speed;
    }
    if let Some(clamp_step_to_remaining) = patch.clamp_step_to_remaining {
        settings.engine.clamp_step_to_remaining = clamp_step_to_remaining;
    }
    if let Some(frame_rate_hz) = patch.frame_rate_hz {
        settings.driver.frame_rate_hz = frame_rate_hz;
    }
    save_settings(path, &settings)?;
    Ok(settings)
}

pub fn save_location_settings(
    path: &Path,
    location: LocationSettings,
) -> Result<SettingsFile, AppError> {
    let mut settings = load_or_default_settings(path)?;
    if let Some(fix) = location.fix.filter(|fix| !fix.is_finite()) {
        return Err(AppError::new(
            "INVALID_POSITION",
            format!(
                "configured fix must be finite, got ({}, {})",
                fix.latitude, fix.longitude
            ),
            None,
        ));
    }
    settings.location = location;
    save_settings(path, &settings)?;
    Ok(settings)
}
