//! Human-readable error descriptions and structured JSON error formatting.

use powder_core::error::{BootError, PowderError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BootError>() {
        return match be {
            BootError::Storage(msg) => format!(
                "What happened: Storage could not be mounted ({msg}).\nLikely causes: storage.dir points to a read-only or missing location.\nHow to fix: Set [storage].dir in the config to a writable directory."
            ),
            BootError::Display(msg) => format!(
                "What happened: Display initialization failed ({msg}).\nLikely causes: Panel not connected or driver misconfigured.\nHow to fix: Check the display wiring and restart the instrument."
            ),
            BootError::MissingSampler => {
                "What happened: No analog source was provided to the control loop.\nLikely causes: The sampler was not wired into the builder.\nHow to fix: Pass the sources via with_sources(...) or with_sampler(...).".to_string()
            }
            BootError::MissingPeripherals => {
                "What happened: No peripherals were provided to the control loop.\nLikely causes: The builder was booted before with_peripherals(...).\nHow to fix: Supply the display, storage, link and transport peripherals.".to_string()
            }
        };
    }

    if let Some(pe) = err.downcast_ref::<PowderError>() {
        return format!(
            "What happened: {pe}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Point --config at an existing TOML file. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") || lower.contains(" must be ") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: A value is out of range or has the wrong type.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("session") && lower.contains("not found") {
        return format!("{msg}.\nHow to fix: Run `powdersense sessions` to list the logged sessions.");
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Boot failures stop the instrument (exit 2); everything else exits 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BootError>().is_some() {
        return 2;
    }
    1
}

/// Stable reason name used in JSON error output.
fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<BootError>() {
        Some(BootError::Storage(_)) => "StorageMount",
        Some(BootError::Display(_)) => "DisplayInit",
        Some(BootError::MissingSampler | BootError::MissingPeripherals) => "Assembly",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exitCode": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
