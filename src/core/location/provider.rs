use crate::domain::models::{AppError, LocationSettings, Position};

pub const PERMISSION_DENIED_MESSAGE: &str = "Permission to access location was denied";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// Supplies the one initial fix. The engine never polls it again.
pub trait LocationProvider {
    fn request_permission(&self) -> PermissionStatus;
    fn current_position(&self) -> Result<Position, AppError>;
}

pub fn acquire_fix(provider: &dyn LocationProvider) -> Result<Position, AppError> {
    if provider.request_permission() == PermissionStatus::Denied {
        tracing::warn!("location permission denied");
        return Err(AppError::new(
            "PERMISSION_DENIED",
            PERMISSION_DENIED_MESSAGE,
            Some("grant location access and reopen the session".to_string()),
        ));
    }
    let fix = provider.current_position()?;
    if !fix.is_finite() {
        return Err(AppError::new(
            "LOCATION_UNAVAILABLE",
            "location provider returned a non-finite fix",
            None,
        ));
    }
    Ok(fix)
}

/// Serves a fix taken from settings, optionally overridden by `PINPATH_INITIAL_FIX`.
#[derive(Debug, Clone)]
pub struct ConfiguredLocationProvider {
    settings: LocationSettings,
}

impl ConfiguredLocationProvider {
    pub fn new(settings: LocationSettings) -> Self {
        Self { settings }
    }

    pub fn from_env(mut settings: LocationSettings) -> Result<Self, AppError> {
        if let Ok(raw) = std::env::var("PINPATH_INITIAL_FIX") {
            settings.fix = Some(parse_fix(&raw)?);
        }
        Ok(Self::new(settings))
    }
}

impl LocationProvider for ConfiguredLocationProvider {
    fn request_permission(&self) -> PermissionStatus {
        if self.settings.permission_granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    fn current_position(&self) -> Result<Position, AppError> {
        self.settings.fix.ok_or_else(|| {
            AppError::new(
                "LOCATION_UNAVAILABLE",
                "no location fix configured",
                Some("set location.fix in settings or PINPATH_INITIAL_FIX=lat,lng".to_string()),
            )
        })
    }
}

/// Parses `"lat,lng"`.
pub fn parse_fix(raw: &str) -> Result<Position, AppError> {
    let invalid = || {
        AppError::new(
            "INVALID_POSITION",
            format!("expected \"lat,lng\", got {raw:?}"),
            None,
        )
    };
    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let latitude = lat.trim().parse::<f64>().map_err(|_| invalid())?;
    let longitude = lng.trim().parse::<f64>().map_err(|_| invalid())?;
    let position = Position::new(latitude, longitude);
    if !position.is_finite() {
        return Err(invalid());
    }
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::{acquire_fix, parse_fix, ConfiguredLocationProvider, PERMISSION_DENIED_MESSAGE};
    use crate::domain::models::{LocationSettings, Position};

    #[test]
    fn granted_provider_yields_fix() {
        let provider = ConfiguredLocationProvider::new(LocationSettings {
            permission_granted: true,
            fix: Some(Position::new(44.4268, 26.1025)),
        });
        assert_eq!(acquire_fix(&provider).unwrap(), Position::new(44.4268, 26.1025));
    }

    #[test]
    fn denied_provider_reports_permission_error() {
        let provider = ConfiguredLocationProvider::new(LocationSettings {
            permission_granted: false,
            fix: Some(Position::new(1.0, 1.0)),
        });
        let error = acquire_fix(&provider).unwrap_err();
        assert_eq!(error.code, "PERMISSION_DENIED");
        assert_eq!(error.message, PERMISSION_DENIED_MESSAGE);
    }

    #[test]
    fn missing_fix_is_unavailable() {
        let provider = ConfiguredLocationProvider::new(LocationSettings::default());
        assert_eq!(acquire_fix(&provider).unwrap_err().code, "LOCATION_UNAVAILABLE");
    }

    #[test]
    fn parse_fix_accepts_spaced_pairs() {
        assert_eq!(parse_fix(" 45.5, -73.56 ").unwrap(), Position::new(45.5, -73.56));
    }

    #[test]
    fn parse_fix_rejects_garbage() {
        assert_eq!(parse_fix("45.5").unwrap_err().code, "INVALID_POSITION");
        assert_eq!(parse_fix("a,b").unwrap_err().code, "INVALID_POSITION");
        assert_eq!(parse_fix("NaN,1").unwrap_err().code, "INVALID_POSITION");
    }
}
