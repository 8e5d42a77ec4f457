use crate::commands::motion::{
    get_snapshot, preview_trajectory, set_speed, set_target, start_motion, stop_motion,
    toggle_motion,
};
use crate::commands::settings::{
    load_settings, save_location_settings, update_engine_settings, EngineSettingsPatch,
};
use crate::commands::status::status_view;
use crate::domain::models::AppError;
use crate::state::RuntimeState;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const PREVIEW_STEP_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    Target { latitude: f64, longitude: f64 },
    Speed(f64),
    Toggle,
    Start,
    Stop,
    Status,
    Preview,
    Config(EngineSettingsPatch),
    Pin,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleReply {
    Line(String),
    Quit,
}

pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, AppError> {
    let mut tokens = line.split_whitespace();
    let Some(head) = tokens.next() else {
        return Ok(None);
    };
    let args = tokens.collect::<Vec<_>>();
    let command = match head.to_lowercase().as_str() {
        "target" | "t" => {
            let [latitude, longitude] = args.as_slice() else {
                return Err(usage("target <lat> <lng>"));
            };
            ConsoleCommand::Target {
                latitude: parse_number(latitude)?,
                longitude: parse_number(longitude)?,
            }
        }
        "speed" | "s" => {
            let [speed] = args.as_slice() else {
                return Err(usage("speed <value>"));
            };
            ConsoleCommand::Speed(parse_number(speed)?)
        }
        "toggle" => ConsoleCommand::Toggle,
        "start" => ConsoleCommand::Start,
        "stop" => ConsoleCommand::Stop,
        "status" => ConsoleCommand::Status,
        "preview" => ConsoleCommand::Preview,
        "config" => {
            let [key, value] = args.as_slice() else {
                return Err(usage("config <key> <value>"));
            };
            ConsoleCommand::Config(parse_config(key, value)?)
        }
        "pin" => ConsoleCommand::Pin,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => {
            return Err(AppError::new(
                "UNKNOWN_COMMAND",
                format!("unknown command: {other}"),
                Some(
                    "try target, speed, toggle, start, stop, status, preview, config, pin, quit"
                        .to_string(),
                ),
            ))
        }
    };
    Ok(Some(command))
}

pub async fn execute(
    state: &RuntimeState,
    command: ConsoleCommand,
) -> Result<ConsoleReply, AppError> {
    let line = match command {
        ConsoleCommand::Target {
            latitude,
            longitude,
        } => {
            let snapshot = set_target(state, latitude, longitude).await?;
            let suffix = if snapshot.moving { " (moving)" } else { "" };
            format!("target set to {latitude:.5}, {longitude:.5}{suffix}")
        }
        ConsoleCommand::Speed(raw) => {
            let stored = set_speed(state, raw).await?;
            format!("speed {stored:.6}")
        }
        ConsoleCommand::Toggle => {
            let motion = toggle_motion(state).await?;
            format!("Motion: {}", motion.status_label())
        }
        ConsoleCommand::Start => {
            let motion = start_motion(state).await?;
            format!("Motion: {}", motion.status_label())
        }
        ConsoleCommand::Stop => {
            let motion = stop_motion(state).await?;
            format!("Motion: {}", motion.status_label())
        }
        ConsoleCommand::Status => {
            let snapshot = get_snapshot(state)?;
            let view = status_view(Some(&snapshot), None);
            format!("{} | {} | [{}]", view.info, view.motion, view.toggle_label)
        }
        ConsoleCommand::Preview => {
            let preview = preview_trajectory(state, PREVIEW_STEP_LIMIT)?;
            match preview.steps_to_arrival {
                Some(steps) => format!("arrives in {steps} frames"),
                None if preview.overshoot_detected => {
                    "step exceeds remaining distance; point will oscillate around the target"
                        .to_string()
                }
                None => format!("no arrival within {PREVIEW_STEP_LIMIT} frames"),
            }
        }
        ConsoleCommand::Config(patch) => {
            update_engine_settings(state.settings_path()?, patch)?;
            "settings saved; they apply to the next session".to_string()
        }
        ConsoleCommand::Pin => {
            let path = state.settings_path()?;
            let current = get_snapshot(state)?.current;
            let mut location = load_settings(path)?.location;
            location.fix = Some(current);
            save_location_settings(path, location)?;
            format!(
                "start fix saved at {:.5}, {:.5}",
                current.latitude, current.longitude
            )
        }
        ConsoleCommand::Quit => return Ok(ConsoleReply::Quit),
    };
    Ok(ConsoleReply::Line(line))
}

/// Reads commands line by line until `quit` or end of input. Bad lines are reported, not fatal.
pub async fn run_console<R>(state: &RuntimeState, input: R) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.map_err(|error| {
        AppError::new(
            "IO_ERROR",
            format!("failed to read console input: {error}"),
            None,
        )
    })? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(error) => {
                println!("{}", error.message);
                continue;
            }
        };
        match execute(state, command).await {
            Ok(ConsoleReply::Line(reply)) => println!("{reply}"),
            Ok(ConsoleReply::Quit) => break,
            Err(error) => {
                tracing::debug!(code = %error.code, "console command rejected");
                println!("{}", error.message);
            }
        }
    }
    Ok(())
}

fn parse_number(raw: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .map_err(|_| AppError::new("INVALID_ARGUMENT", format!("not a number: {raw}"), None))
}

fn parse_config(key: &str, value: &str) -> Result<EngineSettingsPatch, AppError> {
    let mut patch = EngineSettingsPatch::default();
    match key {
        "epsilon" => patch.epsilon = Some(parse_number(value)?),
        "min-speed" => patch.min_speed = Some(parse_number(value)?),
        "max-speed" => patch.max_speed = Some(parse_number(value)?),
        "default-speed" => patch.default_speed = Some(parse_number(value)?),
        "clamp" => {
            patch.clamp_step_to_remaining = Some(match value {
                "on" | "true" => true,
                "off" | "false" => false,
                _ => return Err(usage("config clamp on|off")),
            })
        }
        "rate" => {
            let hz = value.parse::<u32>().map_err(|_| {
                AppError::new("INVALID_ARGUMENT", format!("not a frame rate: {value}"), None)
            })?;
            patch.frame_rate_hz = Some(hz);
        }
        other => {
            return Err(AppError::new(
                "INVALID_ARGUMENT",
                format!("unknown setting: {other}"),
                Some(
                    "settings: epsilon, min-speed, max-speed, default-speed, clamp, rate"
                        .to_string(),
                ),
            ))
        }
    }
    Ok(patch)
}

fn usage(form: &str) -> AppError {
    AppError::new("INVALID_ARGUMENT", format!("usage: {form}"), None)
}
