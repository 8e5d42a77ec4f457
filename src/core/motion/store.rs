use crate::core::motion::simulator::{MovementSimulator, StepOutcome};
use crate::domain::models::{AppError, EngineConfig, MovementPatch, MovementState, Position};
use crate::domain::state_machine::Transition;
use std::sync::{Arc, Mutex, MutexGuard};

/// Holds the single `MovementState` behind one lock.
///
/// Every engine operation runs inside one critical section, so readers and
/// `step` never observe a partially applied target or speed change.
#[derive(Debug)]
pub struct PositionStore {
    simulator: MovementSimulator,
    state: Mutex<MovementState>,
}

pub type SharedPositionStore = Arc<PositionStore>;

impl PositionStore {
    pub fn new(config: EngineConfig, fix: Position) -> Self {
        let simulator = MovementSimulator::new(config);
        let state = simulator.initial_state(fix);
        Self {
            simulator,
            state: Mutex::new(state),
        }
    }

    pub fn shared(config: EngineConfig, fix: Position) -> SharedPositionStore {
        Arc::new(Self::new(config, fix))
    }

    pub fn config(&self) -> &EngineConfig {
        self.simulator.config()
    }

    pub fn get(&self) -> Result<MovementState, AppError> {
        Ok(*self.lock()?)
    }

    /// Replaces the given fields in one critical section. Speed still goes through clamping.
    pub fn set(&self, patch: MovementPatch) -> Result<MovementState, AppError> {
        let mut state = self.lock()?;
        if let Some(current) = patch.current {
            self.simulator.snap(&mut state, current);
        }
        if let Some(target) = patch.target {
            self.simulator.set_target(&mut state, target);
        }
        if let Some(speed) = patch.speed {
            self.simulator.set_speed(&mut state, speed);
        }
        if let Some(moving) = patch.moving {
            if moving {
                self.simulator.start(&mut state);
            } else {
                self.simulator.stop(&mut state);
            }
        }
        Ok(*state)
    }

    pub fn step(&self) -> Result<(StepOutcome, MovementState), AppError> {
        let mut state = self.lock()?;
        let outcome = self.simulator.step(&mut state);
        if outcome == StepOutcome::Arrived {
            tracing::info!(
                latitude = state.current.latitude,
                longitude = state.current.longitude,
                "arrived at target"
            );
        }
        Ok((outcome, *state))
    }

    pub fn set_target(&self, target: Position) -> Result<MovementState, AppError> {
        let mut state = self.lock()?;
        self.simulator.set_target(&mut state, target);
        tracing::debug!(
            latitude = target.latitude,
            longitude = target.longitude,
            "target updated"
        );
        Ok(*state)
    }

    pub fn set_speed(&self, speed: f64) -> Result<f64, AppError> {
        let mut state = self.lock()?;
        let stored = self.simulator.set_speed(&mut state, speed);
        if stored != speed {
            tracing::debug!(requested = speed, stored, "speed clamped");
        }
        Ok(stored)
    }

    pub fn start(&self) -> Result<Transition, AppError> {
        let mut state = self.lock()?;
        Ok(self.simulator.start(&mut state))
    }

    pub fn stop(&self) -> Result<Transition, AppError> {
        let mut state = self.lock()?;
        Ok(self.simulator.stop(&mut state))
    }

    pub fn toggle(&self) -> Result<Transition, AppError> {
        let mut state = self.lock()?;
        Ok(self.simulator.toggle(&mut state))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MovementState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::lock("position store"))
    }
}

#[cfg(test)]
mod tests {
    use super::PositionStore;
    use crate::core::motion::simulator::StepOutcome;
    use crate::domain::models::{EngineConfig, MovementPatch, Position};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_applies_patch_with_speed_clamping() {
        let store = PositionStore::new(EngineConfig::default(), Position::new(0.0, 0.0));
        let state = store
            .set(MovementPatch {
                target: Some(Position::new(1.0, 1.0)),
                speed: Some(5.0),
                moving: Some(true),
                ..MovementPatch::default()
            })
            .unwrap();
        assert_eq!(state.target, Some(Position::new(1.0, 1.0)));
        assert_eq!(state.speed, EngineConfig::default().max_speed);
        assert!(state.moving);
        assert_eq!(state.current, Position::new(0.0, 0.0));
    }

    #[test]
    fn get_returns_a_detached_snapshot() {
        let store = PositionStore::new(EngineConfig::default(), Position::new(0.0, 0.0));
        store.set_target(Position::new(0.0, 1.0)).unwrap();
        store.start().unwrap();
        let before = store.get().unwrap();
        store.step().unwrap();
        assert_eq!(before.current, Position::new(0.0, 0.0));
        assert!(store.get().unwrap().current.longitude > 0.0);
    }

    #[test]
    fn concurrent_retargets_never_tear_the_state() {
        let store = Arc::new(PositionStore::new(
            EngineConfig::default(),
            Position::new(0.0, 0.0),
        ));
        store.start().unwrap();
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for index in 0..500 {
                    let value = f64::from(index);
                    store
                        .set(MovementPatch {
                            target: Some(Position::new(value, value)),
                            speed: Some(0.00001 * (1.0 + value % 5.0)),
                            ..MovementPatch::default()
                        })
                        .unwrap();
                }
            })
        };
        for _ in 0..500 {
            let (_, state) = store.step().unwrap();
            let target = state.target.unwrap();
            assert_eq!(target.latitude, target.longitude);
        }
        writer.join().unwrap();
    }

    #[test]
    fn step_reports_arrival_once() {
        let store = PositionStore::new(EngineConfig::default(), Position::new(3.0, 3.0));
        store.start().unwrap();
        let (outcome, state) = store.step().unwrap();
        assert_eq!(outcome, StepOutcome::Arrived);
        assert!(!state.moving);
        let (outcome, _) = store.step().unwrap();
        assert_eq!(outcome, StepOutcome::Inactive);
    }
}
