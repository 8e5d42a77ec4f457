use crate::core::motion::simulator::{MovementSimulator, StepOutcome};
use crate::domain::models::{EngineConfig, MovementState, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryMetrics {
    pub steps_to_arrival: Option<usize>,
    pub overshoot_detected: bool,
    pub final_distance: Option<f64>,
}

/// Dry-runs the simulator on a copy of `state`, returning every visited position
/// (starting with the current one). Stops on arrival or after `max_steps`.
pub fn project_path(
    state: &MovementState,
    config: &EngineConfig,
    max_steps: usize,
) -> Vec<Position> {
    let simulator = MovementSimulator::new(*config);
    let mut scratch = *state;
    scratch.moving = true;
    let mut output = Vec::with_capacity(max_steps.min(1024) + 1);
    output.push(scratch.current);
    for _ in 0..max_steps {
        let outcome = simulator.step(&mut scratch);
        if outcome == StepOutcome::Inactive {
            break;
        }
        if output.last() != Some(&scratch.current) {
            output.push(scratch.current);
        }
        if outcome == StepOutcome::Arrived {
            break;
        }
    }
    output
}

/// `steps_to_arrival` counts the steps that move the point; a state already
/// within epsilon reports zero, matching `frames_to_arrival`.
pub fn evaluate_trajectory(
    state: &MovementState,
    config: &EngineConfig,
    max_steps: usize,
) -> TrajectoryMetrics {
    let Some(target) = state.target else {
        return TrajectoryMetrics {
            steps_to_arrival: None,
            overshoot_detected: false,
            final_distance: None,
        };
    };

    let mut previous = state.current.planar_distance(&target);
    if previous < config.epsilon {
        return TrajectoryMetrics {
            steps_to_arrival: Some(0),
            overshoot_detected: false,
            final_distance: Some(previous),
        };
    }

    let simulator = MovementSimulator::new(*config);
    let mut scratch = *state;
    scratch.moving = true;
    let mut steps_to_arrival = None;
    let mut overshoot_detected = false;
    for index in 0..max_steps {
        let outcome = simulator.step(&mut scratch);
        let distance = scratch.current.planar_distance(&target);
        if outcome == StepOutcome::Arrived {
            steps_to_arrival = Some(index + 1);
            previous = distance;
            break;
        }
        // Growing distance means the fixed step jumped past the target.
        if distance >= previous {
            overshoot_detected = true;
        }
        previous = distance;
    }

    TrajectoryMetrics {
        steps_to_arrival,
        overshoot_detected,
        final_distance: Some(previous),
    }
}

/// Frames needed at the current speed, ignoring overshoot. Arrival fires as soon
/// as the remaining distance drops under epsilon, so the last partial step counts.
pub fn frames_to_arrival(state: &MovementState, config: &EngineConfig) -> Option<u64> {
    let distance = state.remaining_distance()?;
    if distance < config.epsilon {
        return Some(0);
    }
    if state.speed <= 0.0 || !distance.is_finite() {
        return None;
    }
    Some(((distance - config.epsilon) / state.speed).floor() as u64 + 1)
}
