pub mod commands;
pub mod core;
pub mod domain;
pub mod infra;
pub mod state;

use crate::commands::console::run_console;
use crate::commands::session::{close_session, open_session};
use crate::commands::settings::load_settings;
use crate::commands::status::{location_text, WAITING_FOR_LOCATION};
use crate::core::driver::sink::TracingFrameSink;
use crate::core::location::provider::ConfiguredLocationProvider;
use crate::domain::models::AppError;
use crate::infra::logging::init_tracing;
use crate::infra::storage::settings_store::settings_path;
use std::sync::Arc;
use tokio::io::BufReader;

pub fn run() {
    init_tracing();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");
    if let Err(error) = runtime.block_on(run_session()) {
        tracing::error!(code = %error.code, suggestion = ?error.suggestion, "{}", error.message);
        eprintln!("{}", location_text(None, Some(&error)));
        std::process::exit(1);
    }
}

async fn run_session() -> Result<(), AppError> {
    let path = settings_path();
    let settings = load_settings(&path)?;
    let provider = ConfiguredLocationProvider::from_env(settings.location.clone())?;

    println!("{WAITING_FOR_LOCATION}");
    let state = open_session(&provider, &settings, Arc::new(TracingFrameSink))?
        .with_settings_path(&path);
    println!("{}", location_text(Some(&state.store.get()?), None));

    let result = run_console(&state, BufReader::new(tokio::io::stdin())).await;
    close_session(&state)?;
    result
}
