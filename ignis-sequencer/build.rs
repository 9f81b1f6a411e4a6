//! Build script for ignis-sequencer
//!
//! Validates the compiled-in launch.toml at compile time

use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn main() {
    validate_config();
}

/// Validate launch.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=launch.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("launch.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: launch.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The sequencer embeds a default launch.toml configuration.       ║\n\
            ║  Please create one in the ignis-sequencer directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read launch.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in launch.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_required(&config, &mut errors);
    let outputs = names(&config, "output", "name", &mut errors);
    let inputs = names(&config, "input", "name", &mut errors);
    validate_events(&config, &outputs, &mut errors);
    validate_interlocks(&config, &inputs, &mut errors);
    validate_main_hold(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid launch.toml                                      ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors.join("\n"))
        );
    }

    println!("cargo:warning=launch.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tables<'a>(config: &'a toml::Value, key: &str) -> &'a [toml::Value] {
    config
        .get(key)
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or(&[])
}

fn validate_required(config: &toml::Value, errors: &mut Vec<String>) {
    if config.get("name").and_then(|v| v.as_str()).is_none() {
        errors.push("Missing top-level `name`".to_string());
    }
    if tables(config, "output").is_empty() {
        errors.push("Missing [[output]] - at least one output is required".to_string());
    }
    if tables(config, "event").is_empty() {
        errors.push("Missing [[event]] - at least one event is required".to_string());
    }
}

/// Collect the `field` of each `[[key]]`, reporting duplicates
fn names(
    config: &toml::Value,
    key: &str,
    field: &str,
    errors: &mut Vec<String>,
) -> HashSet<String> {
    let mut seen = HashSet::new();
    for (i, table) in tables(config, key).iter().enumerate() {
        match table.get(field).and_then(|v| v.as_str()) {
            Some(name) => {
                if !seen.insert(name.to_string()) {
                    errors.push(format!("Duplicate {} \"{}\"", key, name));
                }
            }
            None => errors.push(format!("[[{}]] #{} has no `{}`", key, i + 1, field)),
        }
    }
    seen
}

fn validate_events(config: &toml::Value, outputs: &HashSet<String>, errors: &mut Vec<String>) {
    for event in tables(config, "event") {
        let label = event
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>");
        if event.get("at_ms").and_then(|v| v.as_integer()).is_none() {
            errors.push(format!("Event {} has no integer `at_ms`", label));
        }
        let Some(action) = event.get("action") else {
            errors.push(format!("Event {} has no `action`", label));
            continue;
        };

        let mut referenced = Vec::new();
        if let Some(output) = action.get("output").and_then(|v| v.as_str()) {
            referenced.push(output);
        }
        if let Some(group) = action.get("outputs").and_then(|v| v.as_array()) {
            referenced.extend(group.iter().filter_map(|v| v.as_str()));
        }
        for output in referenced {
            if !outputs.contains(output) {
                errors.push(format!("Event {} uses unknown output \"{}\"", label, output));
            }
        }
    }
}

fn validate_interlocks(config: &toml::Value, inputs: &HashSet<String>, errors: &mut Vec<String>) {
    for interlock in tables(config, "interlock") {
        let label = interlock
            .get("label")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>");
        match interlock.get("input").and_then(|v| v.as_str()) {
            Some(input) if !inputs.contains(input) => {
                errors.push(format!("Interlock {} uses unknown input \"{}\"", label, input));
            }
            Some(_) => {}
            None => errors.push(format!("Interlock {} has no `input`", label)),
        }
        // A missing threshold would block abort arming at runtime
        if interlock.get("threshold").is_none() {
            errors.push(format!("Interlock {} has no `threshold`", label));
        }
    }
}

fn validate_main_hold(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(hold) = config.get("main_hold") else {
        return;
    };
    let boundary = hold.get("boundary_ms").and_then(|v| v.as_integer());
    let end = hold.get("window_end_ms").and_then(|v| v.as_integer());
    if let (Some(boundary), Some(end)) = (boundary, end) {
        if boundary > end {
            errors.push(format!(
                "main_hold boundary_ms {} is after window_end_ms {}",
                boundary, end
            ));
        }
    }
}
