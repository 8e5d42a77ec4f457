use crate::core::driver::sink::FrameSink;
use crate::core::motion::simulator::StepOutcome;
use crate::core::motion::store::{PositionStore, SharedPositionStore};
use crate::domain::models::{AppError, DriverConfig, RenderFrame};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Default)]
struct DriverSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Invokes `step` once per frame while motion is on, with at most one loop alive.
///
/// The loop only holds weak references to the store and to this driver, so a
/// task that outlives its session finds nothing to step and exits.
pub struct FrameDriver {
    session_id: String,
    config: DriverConfig,
    sink: Arc<dyn FrameSink>,
    slot: Arc<Mutex<DriverSlot>>,
    sequence: Arc<AtomicU64>,
}

impl FrameDriver {
    pub fn new(
        session_id: impl Into<String>,
        config: DriverConfig,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            config,
            sink,
            slot: Arc::new(Mutex::new(DriverSlot::default())),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn frame_interval(&self) -> Duration {
        self.config.frame_interval()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }

    /// Spawns the frame loop unless one is already pending. Returns whether a loop was spawned.
    pub fn ensure_running(&self, store: &SharedPositionStore) -> Result<bool, AppError> {
        let mut slot = self.lock()?;
        if slot.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Ok(false);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|error| {
            AppError::new(
                "RUNTIME_ERROR",
                format!("no async runtime to drive frames: {error}"),
                Some("call motion commands from inside the tokio runtime".to_string()),
            )
        })?;
        slot.generation = slot.generation.wrapping_add(1);
        let frame_loop = FrameLoop {
            generation: slot.generation,
            session_id: self.session_id.clone(),
            interval: self.frame_interval(),
            store: Arc::downgrade(store),
            slot: Arc::downgrade(&self.slot),
            sink: Arc::clone(&self.sink),
            sequence: Arc::clone(&self.sequence),
        };
        slot.task = Some(runtime.spawn(frame_loop.run()));
        tracing::debug!(
            session_id = %self.session_id,
            generation = slot.generation,
            "frame loop started"
        );
        Ok(true)
    }

    /// Aborts any pending loop. Returns whether one was alive.
    pub fn cancel(&self) -> Result<bool, AppError> {
        let mut slot = self.lock()?;
        let Some(task) = slot.task.take() else {
            return Ok(false);
        };
        let alive = !task.is_finished();
        task.abort();
        tracing::debug!(session_id = %self.session_id, alive, "frame loop cancelled");
        Ok(alive)
    }

    pub fn is_running(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.task.as_ref().is_some_and(|task| !task.is_finished()))
            .unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DriverSlot>, AppError> {
        self.slot.lock().map_err(|_| AppError::lock("frame driver"))
    }
}

impl Drop for FrameDriver {
    fn drop(&mut self) {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(task) = slot.task.take() {
            task.abort();
        }
    }
}

struct FrameLoop {
    generation: u64,
    session_id: String,
    interval: Duration,
    store: Weak<PositionStore>,
    slot: Weak<Mutex<DriverSlot>>,
    sink: Arc<dyn FrameSink>,
    sequence: Arc<AtomicU64>,
}

impl FrameLoop {
    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the first step belongs to the next frame.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(store) = self.store.upgrade() else {
                tracing::debug!(
                    session_id = %self.session_id,
                    "position store released, frame loop exiting"
                );
                break;
            };
            let stepped = store.step();
            drop(store);

            let (outcome, state) = match stepped {
                Ok(stepped) => stepped,
                Err(error) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        %error,
                        "step failed, frame loop exiting"
                    );
                    self.release();
                    break;
                }
            };

            if outcome != StepOutcome::Inactive {
                let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
                let frame = RenderFrame::from_state(&self.session_id, sequence, &state);
                if let Err(error) = self.sink.emit(&frame) {
                    tracing::warn!(
                        session_id = %self.session_id,
                        %error,
                        "frame emit failed, frame loop exiting"
                    );
                    self.release();
                    break;
                }
            }

            if outcome.keeps_running() {
                continue;
            }
            if self.try_finish() {
                break;
            }
        }
    }

    /// Re-checks the motion flag with the slot held so a concurrent `start`
    /// either sees this loop alive or finds the slot free to spawn a new one.
    fn try_finish(&self) -> bool {
        let Some(slot) = self.slot.upgrade() else {
            return true;
        };
        let Ok(mut slot) = slot.lock() else {
            return true;
        };
        let still_moving = self
            .store
            .upgrade()
            .and_then(|store| store.get().ok())
            .is_some_and(|state| state.moving && state.target.is_some());
        if still_moving {
            return false;
        }
        if slot.generation == self.generation {
            slot.task = None;
        }
        tracing::debug!(session_id = %self.session_id, "motion idle, frame loop exiting");
        true
    }

    fn release(&self) {
        if let Some(slot) = self.slot.upgrade() {
            if let Ok(mut slot) = slot.lock() {
                if slot.generation == self.generation {
                    slot.task = None;
                }
            }
        }
    }
}
