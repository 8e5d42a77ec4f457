use crate::domain::models::{AppError, DriverConfig, EngineConfig, LocationSettings};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;
pub const DEFAULT_SETTINGS_FILE: &str = "pinpath-settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    pub schema_version: u8,
    pub engine: EngineConfig,
    pub driver: DriverConfig,
    pub location: LocationSettings,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            engine: EngineConfig::default(),
            driver: DriverConfig::default(),
            location: LocationSettings::default(),
        }
    }
}

pub fn settings_path() -> PathBuf {
    std::env::var("PINPATH_SETTINGS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE))
}

pub fn load_or_default_settings(path: &Path) -> Result<SettingsFile, AppError> {
    if !path.exists() {
        let settings = SettingsFile::default();
        save_settings(path, &settings)?;
        tracing::info!(path = %path.display(), "wrote default settings");
        return Ok(settings);
    }
    load_settings_from_file(path)
}

pub fn load_settings_from_file(path: &Path) -> Result<SettingsFile, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        AppError::new(
            "SETTINGS_READ_FAIL",
            format!("failed to read settings: {error}"),
            None,
        )
    })?;

    let mut value: Value = serde_json::from_str(&raw).map_err(|error| {
        AppError::new(
            "SETTINGS_PARSE_FAIL",
            format!("failed to parse settings json: {error}"),
            None,
        )
    })?;

    let schema_version = value
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    if schema_version > u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(AppError::new(
            "UNSUPPORTED_SCHEMA",
            format!(
                "schemaVersion {schema_version} is newer than supported {}",
                CURRENT_SCHEMA_VERSION
            ),
            Some("upgrade pinpath before loading these settings".to_string()),
        ));
    }

    if schema_version < u64::from(CURRENT_SCHEMA_VERSION) {
        value = migrate_to_v1(value)?;
    }

    let settings: SettingsFile = serde_json::from_value(value).map_err(|error| {
        AppError::new(
            "SETTINGS_PARSE_FAIL",
            format!("failed to decode settings: {error}"),
            None,
        )
    })?;
    settings.engine.validate()?;
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &SettingsFile) -> Result<(), AppError> {
    settings.engine.validate()?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|error| {
            AppError::new(
                "SETTINGS_WRITE_FAIL",
                format!("failed to create settings dir: {error}"),
                None,
            )
        })?;
    }
    let raw = serde_json::to_string_pretty(settings).map_err(|error| {
        AppError::new(
            "SETTINGS_WRITE_FAIL",
            format!("failed to serialize settings: {error}"),
            None,
        )
    })?;
    std::fs::write(path, raw).map_err(|error| {
        AppError::new(
            "SETTINGS_WRITE_FAIL",
            format!("failed to write settings: {error}"),
            Some("check disk space and path permissions".to_string()),
        )
    })
}

fn migrate_to_v1(mut value: Value) -> Result<Value, AppError> {
    let defaults = serde_json::to_value(SettingsFile::default()).map_err(|error| {
        AppError::new(
            "MIGRATION_ERROR",
            format!("failed to build default settings: {error}"),
            None,
        )
    })?;
    let (Some(object), Some(default_object)) = (value.as_object_mut(), defaults.as_object())
    else {
        return Err(AppError::new(
            "MIGRATION_ERROR",
            "legacy settings should be a JSON object",
            None,
        ));
    };
    merge_missing(object, default_object);
    object.insert(
        "schemaVersion".to_string(),
        Value::Number(CURRENT_SCHEMA_VERSION.into()),
    );
    Ok(value)
}

fn merge_missing(object: &mut Map<String, Value>, defaults: &Map<String, Value>) {
    for (key, default_value) in defaults {
        match object.get_mut(key) {
            None => {
                object.insert(key.clone(), default_value.clone());
            }
            Some(Value::Object(nested)) => {
                if let Value::Object(nested_defaults) = default_value {
                    merge_missing(nested, nested_defaults);
                }
            }
            Some(_) => {}
        }
    }
}
