use crate::core::driver::sink::FrameSink;
use crate::core::location::provider::{acquire_fix, LocationProvider};
use crate::domain::models::AppError;
use crate::infra::storage::settings_store::SettingsFile;
use crate::state::RuntimeState;
use chrono::Utc;
use std::sync::Arc;

/// Takes the one location fix and builds the engine around it.
///
/// On permission denial nothing is constructed and the error is returned to the host as-is.
pub fn open_session(
    provider: &dyn LocationProvider,
    settings: &SettingsFile,
    sink: Arc<dyn FrameSink>,
) -> Result<RuntimeState, AppError> {
    settings.engine.validate()?;
    let fix = acquire_fix(provider)?;
    let state = RuntimeState::new(fix, settings.engine, settings.driver, sink);
    tracing::info!(
        session_id = %state.session_id,
        latitude = fix.latitude,
        longitude = fix.longitude,
        frame_rate_hz = settings.driver.frame_rate_hz,
        "session opened"
    );
    Ok(state)
}

/// Cancels any pending frame unconditionally. Safe to call twice.
pub fn close_session(state: &RuntimeState) -> Result<(), AppError> {
    let first_close = state.mark_closed();
    state.store.stop()?;
    let cancelled = state.driver.cancel()?;
    if first_close {
        tracing::info!(
            session_id = %state.session_id,
            cancelled,
            frames = state.driver.frames_emitted(),
            uptime_ms = (Utc::now() - state.started_at).num_milliseconds(),
            "session closed"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{close_session, open_session};
    use crate::commands::motion::{set_target, start_motion};
    use crate::core::driver::sink::testing::RecordingSink;
    use crate::core::location::provider::ConfiguredLocationProvider;
    use crate::domain::models::{LocationSettings, MapRegion, Position};
    use crate::infra::storage::settings_store::SettingsFile;
    use std::sync::Arc;
    use std::time::Duration;

    fn settings(granted: bool) -> SettingsFile {
        SettingsFile {
            location: LocationSettings {
                permission_granted: granted,
                fix: Some(Position::new(46.77, 23.59)),
            },
            ..SettingsFile::default()
        }
    }

    #[test]
    fn open_initializes_store_from_the_fix() {
        let settings = settings(true);
        let provider = ConfiguredLocationProvider::new(settings.location.clone());
        let state = open_session(&provider, &settings, Arc::new(RecordingSink::default())).unwrap();
        let snapshot = state.store.get().unwrap();
        assert_eq!(snapshot.current, Position::new(46.77, 23.59));
        assert_eq!(snapshot.target, Some(Position::new(46.77, 23.59)));
        assert_eq!(snapshot.speed, settings.engine.default_speed);
        assert!(!snapshot.moving);
        assert_eq!(state.initial_region, MapRegion::around(Position::new(46.77, 23.59)));
        assert!(!state.driver.is_running());
    }

    #[test]
    fn denied_permission_builds_nothing() {
        let settings = settings(false);
        let provider = ConfiguredLocationProvider::new(settings.location.clone());
        let result = open_session(&provider, &settings, Arc::new(RecordingSink::default()));
        assert_eq!(result.err().unwrap().code, "PERMISSION_DENIED");
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_frames_and_rejects_commands() {
        let settings = settings(true);
        let provider = ConfiguredLocationProvider::new(settings.location.clone());
        let sink = Arc::new(RecordingSink::default());
        let state = open_session(&provider, &settings, sink.clone()).unwrap();
        set_target(&state, 46.78, 23.60).await.unwrap();
        start_motion(&state).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sink.count() > 0);

        close_session(&state).unwrap();
        let emitted = sink.count();
        let frozen = state.store.get().unwrap().current;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(sink.count(), emitted);
        assert_eq!(state.store.get().unwrap().current, frozen);
        assert_eq!(
            start_motion(&state).await.unwrap_err().code,
            "SESSION_CLOSED"
        );
        assert!(close_session(&state).is_ok());
    }
}
