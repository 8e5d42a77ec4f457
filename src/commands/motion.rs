use crate::core::motion::trajectory::{
    evaluate_trajectory, frames_to_arrival, project_path, TrajectoryMetrics,
};
use crate::domain::models::{AppError, MovementState, Position, RenderFrame};
use crate::domain::state_machine::{MotionState, Transition};
use crate::state::RuntimeState;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPreview {
    pub path: Vec<Position>,
    pub steps_to_arrival: Option<usize>,
    pub overshoot_detected: bool,
    pub final_distance: Option<f64>,
    pub estimated_frames: Option<u64>,
}

/// Map tap or marker drag end.
pub async fn set_target(
    state: &RuntimeState,
    latitude: f64,
    longitude: f64,
) -> Result<MovementState, AppError> {
    state.ensure_open()?;
    let target = Position::new(latitude, longitude);
    if !target.is_finite() {
        return Err(AppError::new(
            "INVALID_POSITION",
            format!("target must be finite, got ({latitude}, {longitude})"),
            None,
        ));
    }
    let snapshot = state.store.set_target(target)?;
    // A loop may have exited while the target was unset or reached.
    if snapshot.moving {
        state.driver.ensure_running(&state.store)?;
    }
    Ok(snapshot)
}

/// Slider change; the raw value is clamped by the engine.
pub async fn set_speed(state: &RuntimeState, speed: f64) -> Result<f64, AppError> {
    state.ensure_open()?;
    if speed.is_nan() {
        return Err(AppError::new("INVALID_SPEED", "speed must be a number", None));
    }
    state.store.set_speed(speed)
}

pub async fn start_motion(state: &RuntimeState) -> Result<MotionState, AppError> {
    state.ensure_open()?;
    let transition = state.store.start()?;
    sync_driver(state, transition)
}

pub async fn stop_motion(state: &RuntimeState) -> Result<MotionState, AppError> {
    state.ensure_open()?;
    let transition = state.store.stop()?;
    sync_driver(state, transition)
}

/// Start/stop button. The flip happens inside one store lock, so concurrent presses never merge.
pub async fn toggle_motion(state: &RuntimeState) -> Result<MotionState, AppError> {
    state.ensure_open()?;
    let transition = state.store.toggle()?;
    sync_driver(state, transition)
}

fn sync_driver(state: &RuntimeState, transition: Transition) -> Result<MotionState, AppError> {
    let motion = transition.state();
    match motion {
        MotionState::Moving => {
            if transition.changed() {
                tracing::info!(session_id = %state.session_id, "motion started");
            }
            state.driver.ensure_running(&state.store)?;
        }
        MotionState::Idle => {
            if transition.changed() {
                tracing::info!(session_id = %state.session_id, "motion stopped");
            }
            state.driver.cancel()?;
        }
    }
    Ok(motion)
}

pub fn get_snapshot(state: &RuntimeState) -> Result<MovementState, AppError> {
    state.store.get()
}

pub fn current_frame(state: &RuntimeState) -> Result<RenderFrame, AppError> {
    let snapshot = state.store.get()?;
    Ok(RenderFrame::from_state(
        &state.session_id,
        state.driver.frames_emitted(),
        &snapshot,
    ))
}

pub fn preview_trajectory(
    state: &RuntimeState,
    max_steps: usize,
) -> Result<TrajectoryPreview, AppError> {
    let snapshot = state.store.get()?;
    let config = state.store.config();
    let path = project_path(&snapshot, config, max_steps);
    let TrajectoryMetrics {
        steps_to_arrival,
        overshoot_detected,
        final_distance,
    } = evaluate_trajectory(&snapshot, config, max_steps);
    Ok(TrajectoryPreview {
        path,
        steps_to_arrival,
        overshoot_detected,
        final_distance,
        estimated_frames: frames_to_arrival(&snapshot, config),
    })
}
