//! Human-readable error descriptions and structured JSON error formatting.

use vetune_core::error::{BuildError, VeError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEngine => {
                "What happened: No engine layout was provided to the session.\nLikely causes: The session builder was used without with_config(...) or with_preset(...).\nHow to fix: Select a preset with --preset or set engine.preset in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid tuning configuration ({msg}).\nLikely causes: Out-of-range values in the [gates] section.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ve) = err.downcast_ref::<VeError>() {
        return match ve {
            VeError::Telemetry(msg) => format!(
                "What happened: Telemetry stopped arriving ({msg}).\nLikely causes: The source disconnected, or sampler.read_timeout_ms is too low for it.\nHow to fix: Check the telemetry link and consider raising sampler.read_timeout_ms in the config."
            ),
            VeError::UnknownPreset(name) => {
                let known: Vec<&str> = vetune_core::EnginePreset::ALL
                    .iter()
                    .map(|p| p.name())
                    .collect();
                format!(
                    "What happened: Unknown engine preset '{name}'.\nLikely causes: A typo in --preset or engine.preset.\nHow to fix: Use one of: {}. Run `vetune presets` for details.",
                    known.join(", ")
                )
            }
            VeError::InvalidAxis(msg) => format!(
                "What happened: Invalid breakpoint axis ({msg}).\nLikely causes: engine.rpm_bins or engine.map_bins is empty, unsorted, or has duplicates.\nHow to fix: List strictly increasing breakpoints in the [engine] section."
            ),
            VeError::InvalidTarget { map_kpa, afr } => format!(
                "What happened: Target AFR {afr} at {map_kpa} kPa is not usable.\nLikely causes: A zero, negative, or blank target in the table.\nHow to fix: Every target must be a positive number; fix the target file or [targets] table."
            ),
            VeError::Config(msg) | VeError::Io(msg) => format!(
                "What happened: {msg}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from file loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("target csv must have headers") {
        return "Invalid headers in target CSV. Expected 'map_kpa,afr'.".to_string();
    }
    if lower.contains("target grid csv must start with") {
        return "Invalid headers in target grid CSV. Expected 'rpm' followed by MAP columns."
            .to_string();
    }
    if lower.contains("telemetry csv must have headers") {
        return "Invalid headers in telemetry CSV. Expected 'rpm,map_kpa,afr' with an optional 'live' column.".to_string();
    }

    if lower.contains("invalid config")
        || lower.starts_with("engine.")
        || lower.starts_with("gates.")
        || lower.starts_with("targets.")
        || lower.starts_with("sampler.")
        || lower.starts_with("logging.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or inconsistent values in the TOML.\nHow to fix: Edit the config file and try again."
        );
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

/// Stable exit codes: 3 telemetry stall, 4 invalid input, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 4;
    }
    match err.downcast_ref::<VeError>() {
        Some(VeError::Telemetry(_)) => 3,
        Some(
            VeError::InvalidAxis(_)
            | VeError::UnknownPreset(_)
            | VeError::InvalidTarget { .. }
            | VeError::Config(_),
        ) => 4,
        _ => 1,
    }
}

/// Stable reason name for JSON error output.
pub fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingEngine => "MissingEngine",
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match err.downcast_ref::<VeError>() {
        Some(VeError::Telemetry(_)) => "TelemetryStall",
        Some(VeError::InvalidAxis(_)) => "InvalidAxis",
        Some(VeError::UnknownPreset(_)) => "UnknownPreset",
        Some(VeError::InvalidTarget { .. }) => "InvalidTarget",
        Some(VeError::Config(_)) => "Config",
        Some(VeError::Io(_)) => "Io",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn telemetry_stall_has_dedicated_exit_code() {
        let err: eyre::Report = VeError::Telemetry("no telemetry for 900 ms".into()).into();
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("read_timeout_ms"));
    }

    #[test]
    fn unknown_preset_lists_choices() {
        let err: eyre::Report = VeError::UnknownPreset("evo".into()).into();
        let text = humanize(&err);
        assert!(text.contains("harley_m8"));
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn json_error_is_parseable() {
        let err = eyre::eyre!("target CSV must have headers 'map_kpa,afr', got: a,b");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
        assert_eq!(v["exit_code"], 1);
        assert!(v["message"].as_str().unwrap().contains("Invalid headers"));
    }
}
