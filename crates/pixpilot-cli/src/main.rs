//! pixpilot - drive a game from launch to its main menu by watching pixels
//!
//! Usage:
//!   pixpilot              Run a full synchronization (default)
//!   pixpilot check        Report process/window status
//!   pixpilot snapshot     Capture one frame
//!   pixpilot --help       Show help

use std::fs::File;
use std::io;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

mod cli;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        cli::print_help();
        return Ok(());
    }

    let (command, options) = match cli::parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            cli::print_help();
            std::process::exit(2);
        }
    };

    let config = cli::load_config(&options)?;
    init_logging(&config.diagnostics_dir);

    let exit_code = cli::run(command, options, config)?;
    std::process::exit(exit_code);
}

fn init_logging(dir: &std::path::Path) {
    // Log to stderr and to a per-run file under the diagnostics directory.
    // If the file cannot be created, stderr logging still works.
    let _ = std::fs::create_dir_all(dir);
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_path = dir.join(format!("run_{}.log", timestamp));

    match File::create(&log_path) {
        Ok(log_file) => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(Level::DEBUG)
                .with_target(false)
                .with_ansi(false)
                .with_writer(
                    log_file
                        .with_max_level(Level::DEBUG)
                        .and(io::stderr.with_max_level(Level::INFO)),
                )
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
        Err(_) => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(Level::INFO)
                .with_target(false)
                .with_ansi(false)
                .with_writer(io::stderr.with_max_level(Level::INFO))
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    }
}
