//! Operator console on stdin
//!
//! Each line is `NAME VALUE`, e.g. `ARM_AUTO 1` or `PT_OX_201 3.6`, and is
//! delivered exactly like an update from the telemetry feed.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use embassy_futures::block_on;
use thiserror::Error;
use tracing::{info, warn};

use crate::channels::{FeedEvent, FeedUpdate, FEED_CHANNEL};
use crate::error::StartupError;

#[derive(Error, Debug, PartialEq)]
pub enum ConsoleError {
    #[error("expected NAME VALUE")]
    Syntax,
    #[error("invalid value \"{0}\"")]
    Value(String),
    #[error("name too long")]
    NameTooLong,
}

/// Parse one console line; blank lines and `#` comments yield `None`
pub fn parse_line(line: &str) -> Result<Option<FeedUpdate>, ConsoleError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ConsoleError::Syntax);
    };
    let value: f32 = value
        .parse()
        .map_err(|_| ConsoleError::Value(value.to_string()))?;
    FeedUpdate::new(name, value)
        .map(Some)
        .ok_or(ConsoleError::NameTooLong)
}

/// Start the stdin reader thread
pub fn spawn() -> Result<JoinHandle<()>, StartupError> {
    thread::Builder::new()
        .name("console".into())
        .spawn(console_reader)
        .map_err(|e| StartupError::Thread("console", e))
}

fn console_reader() {
    info!("Console ready: NAME VALUE per line");
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Console read failed: {}", e);
                return;
            }
        };
        match parse_line(&line) {
            Ok(Some(update)) => block_on(FEED_CHANNEL.send(FeedEvent::Update(update))),
            Ok(None) => {}
            Err(e) => warn!("Console: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control() {
        let update = parse_line("ARM_AUTO 1").unwrap().unwrap();
        assert_eq!(update.name.as_str(), "ARM_AUTO");
        assert_eq!(update.value, 1.0);
    }

    #[test]
    fn test_parse_negative_and_blank() {
        let update = parse_line("  T_CLOCK_ADD_SEC   -23.5 ").unwrap().unwrap();
        assert_eq!(update.value, -23.5);
        assert_eq!(parse_line(""), Ok(None));
        assert_eq!(parse_line("# comment"), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("ARM_AUTO"), Err(ConsoleError::Syntax));
        assert_eq!(parse_line("ARM_AUTO 1 2"), Err(ConsoleError::Syntax));
        assert_eq!(
            parse_line("ARM_AUTO yes"),
            Err(ConsoleError::Value("yes".into()))
        );
        let long = format!("{} 1", "X".repeat(40));
        assert_eq!(parse_line(&long), Err(ConsoleError::NameTooLong));
    }
}
