pub mod simulator;
pub mod store;
pub mod trajectory;
