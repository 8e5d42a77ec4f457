use crate::domain::models::{AppError, RenderFrame};

/// Rendering surface seam: receives one frame per driven step.
pub trait FrameSink: Send + Sync {
    fn emit(&self, frame: &RenderFrame) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFrameSink;

impl FrameSink for TracingFrameSink {
    fn emit(&self, frame: &RenderFrame) -> Result<(), AppError> {
        tracing::debug!(
            session_id = %frame.session_id,
            sequence = frame.sequence,
            latitude = frame.current.latitude,
            longitude = frame.current.longitude,
            remaining = frame.remaining_distance.unwrap_or(0.0),
            state = ?frame.state,
            "frame"
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::FrameSink;
    use crate::domain::models::{AppError, RenderFrame};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct RecordingSink {
        frames: Mutex<Vec<RenderFrame>>,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        pub fn failing_after(count: usize) -> Self {
            Self {
                frames: Mutex::new(Vec::new()),
                fail_after: Some(count),
            }
        }

        pub fn frames(&self) -> Vec<RenderFrame> {
            self.frames.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.frames.lock().unwrap().len()
        }
    }

    impl FrameSink for RecordingSink {
        fn emit(&self, frame: &RenderFrame) -> Result<(), AppError> {
            let mut frames = self.frames.lock().unwrap();
            if self.fail_after.is_some_and(|limit| frames.len() >= limit) {
                return Err(AppError::new("EVENT_ERROR", "render surface gone", None));
            }
            frames.push(frame.clone());
            Ok(())
        }
    }
}
