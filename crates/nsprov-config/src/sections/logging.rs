// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;

/// Log verbosity accepted on the command line and in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
	All,
	Debug,
	#[default]
	Info,
	Warn,
	Error,
	None,
}

impl LogLevel {
	pub const VARIANTS: [&'static str; 6] = ["all", "debug", "info", "warn", "error", "none"];

	/// The `tracing` filter directive for this level.
	pub fn as_filter(&self) -> &'static str {
		match self {
			LogLevel::All => "trace",
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
			LogLevel::None => "off",
		}
	}
}

impl FromStr for LogLevel {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"all" => Ok(LogLevel::All),
			"debug" => Ok(LogLevel::Debug),
			"info" => Ok(LogLevel::Info),
			"warn" => Ok(LogLevel::Warn),
			"error" => Ok(LogLevel::Error),
			"none" => Ok(LogLevel::None),
			other => Err(ConfigError::InvalidValue {
				key: "logging.level".to_string(),
				message: format!(
					"unknown level '{other}', expected one of: {}",
					Self::VARIANTS.join(", ")
				),
			}),
		}
	}
}

impl fmt::Display for LogLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			LogLevel::All => "all",
			LogLevel::Debug => "debug",
			LogLevel::Info => "info",
			LogLevel::Warn => "warn",
			LogLevel::Error => "error",
			LogLevel::None => "none",
		};
		f.write_str(name)
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
	}

	pub fn resolve(self) -> Result<LoggingConfig, ConfigError> {
		let level = match self.level {
			Some(level) => level.parse()?,
			None => LogLevel::default(),
		};
		Ok(LoggingConfig { level })
	}
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoggingConfig {
	pub level: LogLevel,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_level_is_info() {
		let config = LoggingConfigLayer::default().resolve().unwrap();
		assert_eq!(config.level, LogLevel::Info);
		assert_eq!(config.level.as_filter(), "info");
	}

	#[test]
	fn test_all_and_none_map_to_trace_and_off() {
		assert_eq!("all".parse::<LogLevel>().unwrap().as_filter(), "trace");
		assert_eq!("NONE".parse::<LogLevel>().unwrap().as_filter(), "off");
	}

	#[test]
	fn test_unknown_level_lists_choices() {
		let err = "verbose".parse::<LogLevel>().unwrap_err();
		let message = err.to_string();
		assert!(message.contains("verbose"));
		assert!(message.contains("all, debug, info, warn, error, none"));
	}

	#[test]
	fn test_display_round_trips() {
		for name in LogLevel::VARIANTS {
			let level: LogLevel = name.parse().unwrap();
			assert_eq!(level.to_string(), name);
		}
	}
}
