use crate::domain::models::{EngineConfig, MovementState, Position};
use crate::domain::state_machine::{MotionState, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Not moving, or no target yet. Nothing changed.
    Inactive,
    /// `current` moved and the target is still at least epsilon away.
    Advanced,
    /// Within epsilon of the target; motion flag is now off.
    Arrived,
}

impl StepOutcome {
    pub fn keeps_running(self) -> bool {
        self == StepOutcome::Advanced
    }
}

/// Interpolates a position toward its target by a fixed step per frame.
///
/// All operations are total: the simulator never fails, it only no-ops.
#[derive(Debug, Clone, Copy)]
pub struct MovementSimulator {
    config: EngineConfig,
}

impl MovementSimulator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn initial_state(&self, fix: Position) -> MovementState {
        MovementState::from_fix(fix, &self.config)
    }

    pub fn step(&self, state: &mut MovementState) -> StepOutcome {
        if !state.moving {
            return StepOutcome::Inactive;
        }
        let Some(target) = state.target else {
            return StepOutcome::Inactive;
        };

        let distance = state.current.planar_distance(&target);
        let direction = state
            .current
            .direction_to(&target)
            .filter(|_| distance >= self.config.epsilon);
        let Some((unit_lat, unit_lng)) = direction else {
            state.moving = false;
            return StepOutcome::Arrived;
        };

        // Without clamping the step can overshoot once speed exceeds the remaining distance.
        let magnitude = if self.config.clamp_step_to_remaining {
            state.speed.min(distance)
        } else {
            state.speed
        };
        state.current = Position {
            latitude: state.current.latitude + unit_lat * magnitude,
            longitude: state.current.longitude + unit_lng * magnitude,
        };

        if state.current.planar_distance(&target) < self.config.epsilon {
            state.moving = false;
            return StepOutcome::Arrived;
        }
        StepOutcome::Advanced
    }

    pub fn set_target(&self, state: &mut MovementState, target: Position) {
        state.target = Some(target);
    }

    /// Clamps into `[min_speed, max_speed]`. NaN leaves the stored speed untouched.
    pub fn set_speed(&self, state: &mut MovementState, speed: f64) -> f64 {
        if let Some(clamped) = self.clamp_speed(speed) {
            state.speed = clamped;
        }
        state.speed
    }

    pub fn clamp_speed(&self, speed: f64) -> Option<f64> {
        if speed.is_nan() {
            return None;
        }
        Some(speed.max(self.config.min_speed).min(self.config.max_speed))
    }

    pub fn start(&self, state: &mut MovementState) -> Transition {
        self.apply(state, state.motion_state().start())
    }

    pub fn stop(&self, state: &mut MovementState) -> Transition {
        self.apply(state, state.motion_state().stop())
    }

    pub fn toggle(&self, state: &mut MovementState) -> Transition {
        self.apply(state, state.motion_state().toggle())
    }

    /// Teleports `current` without touching target or motion flag.
    pub fn snap(&self, state: &mut MovementState, position: Position) {
        state.current = position;
    }

    fn apply(&self, state: &mut MovementState, transition: Transition) -> Transition {
        state.moving = transition.state() == MotionState::Moving;
        transition
    }
}

impl Default for MovementSimulator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{MovementSimulator, StepOutcome};
    use crate::domain::models::{EngineConfig, MovementState, Position};

    fn moving_state(current: Position, target: Position, speed: f64) -> MovementState {
        MovementState {
            current,
            target: Some(target),
            speed,
            moving: true,
        }
    }

    #[test]
    fn ten_steps_cover_a_thousandth_of_a_degree() {
        let simulator = MovementSimulator::default();
        let mut state = moving_state(
            Position::new(0.0, 0.0),
            Position::new(0.001, 0.0),
            0.0001,
        );
        for _ in 0..10 {
            simulator.step(&mut state);
        }
        assert!((state.current.latitude - 0.001).abs() < simulator.config().epsilon);
        assert!(state.current.longitude.abs() < simulator.config().epsilon);
        assert!(!state.moving);
    }

    #[test]
    fn already_at_target_stops_without_moving() {
        let simulator = MovementSimulator::default();
        let here = Position::new(10.0, 20.0);
        let mut state = moving_state(here, here, 0.00001);
        let outcome = simulator.step(&mut state);
        assert_eq!(outcome, StepOutcome::Arrived);
        assert_eq!(state.current, here);
        assert!(!state.moving);
    }

    #[test]
    fn distance_strictly_decreases_until_arrival() {
        let simulator = MovementSimulator::default();
        let target = Position::new(0.0004, -0.0003);
        let mut state = moving_state(Position::new(0.0, 0.0), target, 0.00002);
        let mut previous = state.current.planar_distance(&target);
        let mut steps = 0;
        while state.moving {
            simulator.step(&mut state);
            let distance = state.current.planar_distance(&target);
            if state.moving {
                assert!(distance < previous);
            }
            previous = distance;
            steps += 1;
            assert!(steps < 1_000, "did not converge");
        }
        assert!(previous < simulator.config().epsilon);
    }

    #[test]
    fn arrived_state_stays_put() {
        let simulator = MovementSimulator::default();
        let mut state = moving_state(
            Position::new(1.0, 1.0),
            Position::new(1.0, 1.00005),
            0.00005,
        );
        while state.moving {
            simulator.step(&mut state);
        }
        let settled = state.current;
        for _ in 0..20 {
            assert_eq!(simulator.step(&mut state), StepOutcome::Inactive);
        }
        assert_eq!(state.current, settled);
    }

    #[test]
    fn missing_target_is_a_no_op_whatever_the_flag() {
        let simulator = MovementSimulator::default();
        for moving in [true, false] {
            let mut state = MovementState {
                current: Position::new(5.0, 5.0),
                target: None,
                speed: 0.0001,
                moving,
            };
            assert_eq!(simulator.step(&mut state), StepOutcome::Inactive);
            assert_eq!(state.current, Position::new(5.0, 5.0));
            assert_eq!(state.moving, moving);
        }
    }

    #[test]
    fn speed_is_clamped_into_configured_range() {
        let simulator = MovementSimulator::default();
        let config = *simulator.config();
        let mut state = simulator.initial_state(Position::new(0.0, 0.0));
        assert_eq!(simulator.set_speed(&mut state, 5.0), config.max_speed);
        assert_eq!(simulator.set_speed(&mut state, -3.0), config.min_speed);
        assert_eq!(simulator.set_speed(&mut state, 0.00005), 0.00005);
        assert_eq!(
            simulator.set_speed(&mut state, f64::INFINITY),
            config.max_speed
        );
        assert_eq!(
            simulator.set_speed(&mut state, f64::NEG_INFINITY),
            config.min_speed
        );
    }

    #[test]
    fn nan_speed_keeps_previous_value() {
        let simulator = MovementSimulator::default();
        let mut state = simulator.initial_state(Position::new(0.0, 0.0));
        simulator.set_speed(&mut state, 0.00007);
        assert_eq!(simulator.set_speed(&mut state, f64::NAN), 0.00007);
    }

    #[test]
    fn retarget_redirects_the_next_step() {
        let simulator = MovementSimulator::default();
        let mut state = moving_state(
            Position::new(0.0, 0.0),
            Position::new(1.0, 0.0),
            0.0001,
        );
        simulator.step(&mut state);
        assert!(state.current.latitude > 0.0);
        let before = state.current;
        simulator.set_target(&mut state, Position::new(before.latitude, -1.0));
        simulator.step(&mut state);
        assert!((state.current.latitude - before.latitude).abs() < 1e-12);
        assert!(state.current.longitude < before.longitude);
    }

    #[test]
    fn stop_mid_motion_freezes_position_until_restart() {
        let simulator = MovementSimulator::default();
        let mut state = moving_state(
            Position::new(1.0, 1.0),
            Position::new(2.0, 2.0),
            0.0001,
        );
        assert!(simulator.stop(&mut state).changed());
        for _ in 0..5 {
            simulator.step(&mut state);
        }
        assert_eq!(state.current, Position::new(1.0, 1.0));

        simulator.start(&mut state);
        assert_eq!(simulator.step(&mut state), StepOutcome::Advanced);
        assert!(state.current.latitude > 1.0);
    }

    #[test]
    fn start_without_target_degrades_to_no_op_steps() {
        let simulator = MovementSimulator::default();
        let mut state = MovementState {
            current: Position::new(0.0, 0.0),
            target: None,
            speed: 0.0001,
            moving: false,
        };
        simulator.start(&mut state);
        assert!(state.moving);
        assert_eq!(simulator.step(&mut state), StepOutcome::Inactive);
        assert_eq!(state.current, Position::new(0.0, 0.0));
    }

    #[test]
    fn unclamped_step_overshoots_and_oscillates() {
        let simulator = MovementSimulator::default();
        let target = Position::new(0.000015, 0.0);
        let mut state = moving_state(Position::new(0.0, 0.0), target, 0.0001);
        for _ in 0..50 {
            simulator.step(&mut state);
        }
        assert!(state.moving);
        assert!(state.current.planar_distance(&target) >= simulator.config().epsilon);
    }

    #[test]
    fn clamped_step_lands_on_target() {
        let simulator = MovementSimulator::new(EngineConfig {
            clamp_step_to_remaining: true,
            ..EngineConfig::default()
        });
        let target = Position::new(0.000015, 0.0);
        let mut state = moving_state(Position::new(0.0, 0.0), target, 0.0001);
        assert_eq!(simulator.step(&mut state), StepOutcome::Arrived);
        assert!(state.current.planar_distance(&target) < 1e-12);
        assert!(!state.moving);
    }

    #[test]
    fn far_but_finite_target_still_makes_progress() {
        let simulator = MovementSimulator::default();
        let target = Position::new(1e200, 0.0);
        let mut state = moving_state(Position::new(0.0, 0.0), target, 0.0001);
        assert_eq!(simulator.step(&mut state), StepOutcome::Advanced);
        assert!((state.current.latitude - 0.0001).abs() < 1e-12);
        assert_eq!(state.current.longitude, 0.0);
        assert!(state.current.planar_distance(&target).is_finite());

        let mut across = moving_state(
            Position::new(0.0, -f64::MAX),
            Position::new(0.0, f64::MAX),
            0.0001,
        );
        assert_eq!(simulator.step(&mut across), StepOutcome::Advanced);
        assert!(across.current.is_finite());
        assert_eq!(across.current.latitude, 0.0);
    }

    #[test]
    fn snap_moves_current_only() {
        let simulator = MovementSimulator::default();
        let mut state = moving_state(
            Position::new(0.0, 0.0),
            Position::new(1.0, 1.0),
            0.0001,
        );
        simulator.snap(&mut state, Position::new(0.5, 0.5));
        assert_eq!(state.current, Position::new(0.5, 0.5));
        assert_eq!(state.target, Some(Position::new(1.0, 1.0)));
        assert!(state.moving);
    }
}
