use crate::core::driver::service::FrameDriver;
use crate::core::driver::sink::FrameSink;
use crate::core::motion::store::{PositionStore, SharedPositionStore};
use crate::domain::models::{AppError, DriverConfig, EngineConfig, MapRegion, Position};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// One simulation session: the engine, its frame driver, and host bookkeeping.
pub struct RuntimeState {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub initial_region: MapRegion,
    pub store: SharedPositionStore,
    pub driver: FrameDriver,
    settings_path: Option<PathBuf>,
    closed: AtomicBool,
}

impl RuntimeState {
    pub fn new(
        fix: Position,
        engine: EngineConfig,
        driver: DriverConfig,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let session_id = Uuid::new_v4().to_string();
        Self {
            driver: FrameDriver::new(session_id.clone(), driver, sink),
            session_id,
            started_at: Utc::now(),
            initial_region: MapRegion::around(fix),
            store: PositionStore::shared(engine, fix),
            settings_path: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Where console `config`/`pin` commands persist. Sessions without one refuse them.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn settings_path(&self) -> Result<&Path, AppError> {
        self.settings_path.as_deref().ok_or_else(|| {
            AppError::new(
                "SETTINGS_UNAVAILABLE",
                "this session has no settings file",
                None,
            )
        })
    }

    pub fn ensure_open(&self) -> Result<(), AppError> {
        if self.is_closed() {
            return Err(AppError::new(
                "SESSION_CLOSED",
                format!("session {} has been closed", self.session_id),
                Some("open a new session".to_string()),
            ));
        }
        Ok(())
    }

    /// Returns false if the session was already closed.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
