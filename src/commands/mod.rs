pub mod console;
pub mod motion;
pub mod session;
pub mod settings;
pub mod status;
