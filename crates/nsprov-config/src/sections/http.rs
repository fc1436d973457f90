// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use super::resolve_duration;
use crate::error::ConfigError;

const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
const DEFAULT_LISTEN_INTERNAL: &str = "0.0.0.0:9090";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP server configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct HttpConfig {
	/// Address of the namespace API.
	pub listen: SocketAddr,
	/// Address of the metrics and health endpoints.
	pub listen_internal: SocketAddr,
	/// Deadline applied to each API request, including its cluster calls.
	pub request_timeout: Duration,
}

/// HTTP configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpConfigLayer {
	#[serde(default)]
	pub listen: Option<String>,
	#[serde(default)]
	pub listen_internal: Option<String>,
	#[serde(default)]
	pub request_timeout: Option<String>,
}

impl HttpConfigLayer {
	pub fn merge(&mut self, other: HttpConfigLayer) {
		if other.listen.is_some() {
			self.listen = other.listen;
		}
		if other.listen_internal.is_some() {
			self.listen_internal = other.listen_internal;
		}
		if other.request_timeout.is_some() {
			self.request_timeout = other.request_timeout;
		}
	}

	pub fn resolve(self) -> Result<HttpConfig, ConfigError> {
		let listen = parse_addr("http.listen", self.listen.as_deref().unwrap_or(DEFAULT_LISTEN))?;
		let listen_internal = parse_addr(
			"http.listen_internal",
			self.listen_internal
				.as_deref()
				.unwrap_or(DEFAULT_LISTEN_INTERNAL),
		)?;
		let request_timeout = resolve_duration(
			"http.request_timeout",
			self.request_timeout,
			DEFAULT_REQUEST_TIMEOUT,
		)?;

		if request_timeout.is_zero() {
			return Err(ConfigError::Validation(
				"http.request_timeout must be greater than zero".to_string(),
			));
		}
		if listen == listen_internal {
			return Err(ConfigError::Validation(format!(
				"http.listen and http.listen_internal must differ (both {listen})"
			)));
		}

		Ok(HttpConfig {
			listen,
			listen_internal,
			request_timeout,
		})
	}
}

fn parse_addr(key: &str, value: &str) -> Result<SocketAddr, ConfigError> {
	value.parse().map_err(|_| ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("invalid socket address '{value}'"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = HttpConfigLayer::default().resolve().unwrap();
		assert_eq!(config.listen.port(), 8080);
		assert_eq!(config.listen_internal.port(), 9090);
		assert_eq!(config.request_timeout, Duration::from_secs(30));
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = HttpConfigLayer {
			listen: Some("127.0.0.1:3000".to_string()),
			listen_internal: None,
			request_timeout: Some("10s".to_string()),
		};
		base.merge(HttpConfigLayer {
			listen: None,
			listen_internal: Some("127.0.0.1:3001".to_string()),
			request_timeout: Some("1m".to_string()),
		});
		let config = base.resolve().unwrap();
		assert_eq!(config.listen.to_string(), "127.0.0.1:3000");
		assert_eq!(config.listen_internal.to_string(), "127.0.0.1:3001");
		assert_eq!(config.request_timeout, Duration::from_secs(60));
	}

	#[test]
	fn test_rejects_bad_address() {
		let layer = HttpConfigLayer {
			listen: Some("localhost".to_string()),
			..Default::default()
		};
		assert!(matches!(
			layer.resolve(),
			Err(ConfigError::InvalidValue { .. })
		));
	}

	#[test]
	fn test_rejects_shared_listener() {
		let layer = HttpConfigLayer {
			listen: Some("0.0.0.0:9090".to_string()),
			..Default::default()
		};
		assert!(layer.resolve().is_err());
	}
}
