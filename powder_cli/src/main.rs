mod cli;
mod error_fmt;
mod inspect;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::WrapErr;
use powder_core::{RunEnd, RunSummary};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("error hook not installed: {e}");
    }

    let cfg = powder_config::load_file(&cli.config);
    init_tracing(&cli, cfg.as_ref().ok().map(|c| &c.logging));

    let result = cfg.and_then(|cfg| dispatch(&cli, &cfg));
    if let Err(err) = result {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn dispatch(cli: &Cli, cfg: &powder_config::Config) -> eyre::Result<()> {
    match &cli.cmd {
        Commands::Run {
            ticks,
            no_delay,
            sim,
        } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&shutdown);
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            let summary = run::run_instrument(cfg, *ticks, *no_delay, sim, &shutdown)?;
            print_summary(cli.json, &summary);
        }
        Commands::SelfCheck => {
            let report = inspect::self_check(cfg)?;
            if cli.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                println!(
                    "self-check ok: storage {}, {} profiles ({} calibrated), active {}, {} sessions logged",
                    report.storage_dir,
                    report.profiles,
                    report.calibrated_profiles,
                    report.current_config_index,
                    report.session_logs
                );
            }
        }
        Commands::Sessions { index: Some(i) } => {
            print!("{}", inspect::session_summary(cfg, *i)?);
        }
        Commands::Sessions { index: None } => {
            let logs = inspect::session_logs(cfg)?;
            if cli.json {
                println!("{}", serde_json::to_string(&logs)?);
            } else {
                print!("{}", inspect::format_logs(&logs));
            }
        }
    }
    Ok(())
}

fn end_name(end: RunEnd) -> &'static str {
    match end {
        RunEnd::Stopped => "stopped",
        RunEnd::TickLimit => "tickLimit",
        RunEnd::RestartRequested => "restartRequested",
    }
}

fn print_summary(json: bool, summary: &RunSummary) {
    if json {
        println!(
            "{}",
            serde_json::json!({ "runSummary": { "ticks": summary.ticks, "end": end_name(summary.end) } })
        );
    } else {
        eprintln!(
            "stopped after {} ticks ({})",
            summary.ticks,
            end_name(summary.end)
        );
    }
}

/// Console layer on stderr (stdout carries telemetry), plus an optional
/// JSON file layer from `[logging]`.
fn init_tracing(cli: &Cli, logging: Option<&powder_config::Logging>) {
    let level = logging
        .and_then(|l| l.level.clone())
        .filter(|_| cli.log_level == "info")
        .unwrap_or_else(|| cli.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let console = if cli.json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let file_layer = logging.and_then(|l| l.file.as_deref()).map(|file| {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "powdersense.log".into(), |n| n.to_os_string());
        let appender = match logging.and_then(|l| l.rotation.as_deref()) {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        fmt::layer().json().with_ansi(false).with_writer(writer)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();
}
