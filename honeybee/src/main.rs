//! HoneyBee - Entry Point
//!
//! Generates misconfigured application environments and matching detection
//! templates with an LLM, and serves them over a local HTTP API.

use std::collections::HashMap;
use std::env;

use honeybee::app::options::AppOptions;
use honeybee::app::run::run;
use honeybee::logs::{init_logging, LogLevel, LogOptions};
use honeybee::storage::layout::StorageLayout;
use honeybee::storage::settings::Settings;
use honeybee::utils::{run_diagnostic, version_info};

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Unable to print version: {}", e),
        }
        return;
    }

    let layout = StorageLayout::default();

    // Run diagnostics
    if cli_args.contains_key("diagnostic") || cli_args.contains_key("diag") {
        if let Err(e) = run_diagnostic(&layout).await {
            eprintln!("Diagnostic failed: {}", e);
        }
        return;
    }

    // Retrieve the settings file
    let mut settings = match Settings::load(&layout.settings_file()).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!(
                "Unable to read settings file {}: {}",
                layout.settings_file().path().display(),
                e
            );
            return;
        }
    };

    // Command line overrides
    if let Some(host) = cli_args.get("host") {
        settings.server.host = host.clone();
    }
    if let Some(port) = cli_args.get("port") {
        match port.parse() {
            Ok(port) => settings.server.port = port,
            Err(_) => {
                eprintln!("Invalid port: {}", port);
                return;
            }
        }
    }
    if let Some(level) = cli_args.get("log-level") {
        match level.parse::<LogLevel>() {
            Ok(level) => settings.log_level = level,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        }
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        json_format: settings.log_json,
        log_dir: settings
            .log_to_file
            .then(|| layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    let options = match AppOptions::from_settings(layout, settings) {
        Ok(options) => options,
        Err(e) => {
            error!("Invalid settings: {}", e);
            return;
        }
    };

    info!("Running HoneyBee {} with options: {:?}", version.version, options);
    if let Err(e) = run(options, await_shutdown_signal()).await {
        error!("Failed to run HoneyBee: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Unable to register signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Ctrl+C received, shutting down...");
    }
}
