//! Command parsing and execution for the headless CLI.
//!
//! Usage:
//!   pixpilot run                 Drive the target to its main menu
//!   pixpilot check               Report process/window status
//!   pixpilot snapshot            Capture one frame to the diagnostics dir
//!
//! Options:
//!   --config <path>    Load configuration from an explicit file
//!   --strategy <name>  Login strategy: wait-then-click | cooldown-polling
//!   --json             Output in JSON format

use std::path::PathBuf;

use pixpilot_core::{
    Config, Diagnostics, Engine, LoginStrategy, NativeDesktop, ProcessControl, State, Supervisor,
};
use pixpilot_core::Desktop as _;

/// CLI command to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Run,
    Check,
    Snapshot,
}

/// CLI options
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub json: bool,
    pub config_path: Option<PathBuf>,
    pub strategy: Option<LoginStrategy>,
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut command: Option<CliCommand> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--json" => options.json = true,
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a path".to_string());
                }
                options.config_path = Some(PathBuf::from(&args[i]));
            }
            "--strategy" => {
                i += 1;
                if i >= args.len() {
                    return Err("--strategy requires a value".to_string());
                }
                options.strategy = Some(parse_strategy(&args[i])?);
            }
            "run" => command = Some(CliCommand::Run),
            "check" => command = Some(CliCommand::Check),
            "snapshot" => command = Some(CliCommand::Snapshot),
            _ => {
                return Err(format!("Unknown argument: {}", arg));
            }
        }
        i += 1;
    }

    let command = command.unwrap_or(CliCommand::Run);
    Ok((command, options))
}

fn parse_strategy(value: &str) -> Result<LoginStrategy, String> {
    match value {
        "wait-then-click" => Ok(LoginStrategy::WaitThenClick),
        "cooldown-polling" => Ok(LoginStrategy::CooldownPolling),
        other => Err(format!(
            "Unknown strategy: {} (expected wait-then-click or cooldown-polling)",
            other
        )),
    }
}

/// Load configuration honoring the CLI options.
pub fn load_config(options: &CliOptions) -> anyhow::Result<Config> {
    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };
    if let Some(strategy) = options.strategy {
        config.login_strategy = strategy;
    }
    Ok(config)
}

pub fn print_help() {
    println!("pixpilot v{}", env!("CARGO_PKG_VERSION"));
    println!("Drive a game to its main menu by watching pixels");
    println!();
    println!("USAGE:");
    println!("    pixpilot [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    run         Launch/attach to the target and sync to the main menu (default)");
    println!("    check       Report target process and window status");
    println!("    snapshot    Capture one frame into the diagnostics directory");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>     Load configuration from an explicit file");
    println!("    --strategy <name>   wait-then-click | cooldown-polling");
    println!("    --json              Output in JSON format");
    println!("    --help              Show this help message");
}

/// Execute a command; returns the process exit code.
pub fn run(command: CliCommand, options: CliOptions, config: Config) -> anyhow::Result<i32> {
    match command {
        CliCommand::Run => cmd_run(options, config),
        CliCommand::Check => cmd_check(options, config),
        CliCommand::Snapshot => cmd_snapshot(options, config),
    }
}

fn cmd_run(options: CliOptions, config: Config) -> anyhow::Result<i32> {
    let desktop = NativeDesktop::new(config.monitor_index);
    let supervisor = Supervisor::new(config.process_names.clone(), config.steam_app_id);
    let mut engine = Engine::new(config, desktop, supervisor)?;
    let outcome = engine.run();

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if outcome.is_ok() {
        println!("Main menu reached");
    } else {
        println!("Run failed: {}", outcome.reason);
        if let Some(path) = &outcome.screenshot {
            println!("Failure screenshot: {}", path.display());
        }
    }
    Ok(outcome.exit_code())
}

fn cmd_check(options: CliOptions, config: Config) -> anyhow::Result<i32> {
    let desktop = NativeDesktop::new(config.monitor_index);
    let mut supervisor = Supervisor::new(config.process_names.clone(), config.steam_app_id);

    let running = supervisor.is_running();
    let rect = desktop.window_rect(&config.window_title);

    if options.json {
        let report = serde_json::json!({
            "process_running": running,
            "window_title": config.window_title,
            "window_rect": rect,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Process: {}",
            if running { "running" } else { "not running" }
        );
        match rect {
            Some(r) => println!(
                "Window '{}': {}x{} at ({}, {})",
                config.window_title, r.width, r.height, r.x, r.y
            ),
            None => println!("Window '{}': not found", config.window_title),
        }
    }
    Ok(if running { 0 } else { 1 })
}

fn cmd_snapshot(options: CliOptions, config: Config) -> anyhow::Result<i32> {
    let mut desktop = NativeDesktop::new(config.monitor_index);
    let diagnostics = Diagnostics::new(&config.diagnostics_dir);

    let frame = desktop.capture(&config.window_title)?;
    let path = diagnostics.save_frame(&frame, State::Start, "snapshot")?;

    if options.json {
        let report = serde_json::json!({
            "path": path,
            "width": frame.width(),
            "height": frame.height(),
            "source": frame.source().as_str(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Saved {}x{} {} capture to {}",
            frame.width(),
            frame.height(),
            frame.source(),
            path.display()
        );
    }
    Ok(0)
}
