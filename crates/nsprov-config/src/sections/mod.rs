// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod auth;
mod cluster;
mod http;
mod logging;
mod provisioner;

pub use auth::{AuthConfig, AuthConfigLayer};
pub use cluster::{ClusterConfig, ClusterConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogLevel, LoggingConfig, LoggingConfigLayer};
pub use provisioner::{ProvisionerConfig, ProvisionerConfigLayer, DEFAULT_SELECTOR};

use std::time::Duration;

use crate::error::ConfigError;

/// Parse a humantime duration (`30s`, `1h 30m`) for `key`.
pub(crate) fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
	humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("invalid duration '{value}': {e}"),
	})
}

/// Resolve an optional duration string, falling back to `default`.
pub(crate) fn resolve_duration(
	key: &str,
	value: Option<String>,
	default: Duration,
) -> Result<Duration, ConfigError> {
	match value {
		Some(v) => parse_duration(key, &v),
		None => Ok(default),
	}
}
