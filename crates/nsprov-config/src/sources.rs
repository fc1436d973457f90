// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment variables and
//! command-line overrides.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::secret::load_secret_env;
use crate::sections::{
	AuthConfigLayer, ClusterConfigLayer, HttpConfigLayer, LoggingConfigLayer,
	ProvisionerConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	CommandLine = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/nsprov/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: NSPROV_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()),
			cluster: Some(load_cluster_from_env()),
			logging: Some(load_logging_from_env()),
			provisioner: Some(load_provisioner_from_env()),
			auth: Some(load_auth_from_env()?),
		})
	}
}

/// Command-line overrides, already parsed into a layer by the binary.
pub struct OverrideSource {
	layer: ServerConfigLayer,
}

impl OverrideSource {
	pub fn new(layer: ServerConfigLayer) -> Self {
		Self { layer }
	}
}

impl ConfigSource for OverrideSource {
	fn name(&self) -> &'static str {
		"command-line"
	}

	fn precedence(&self) -> Precedence {
		Precedence::CommandLine
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(self.layer.clone())
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn load_http_from_env() -> HttpConfigLayer {
	HttpConfigLayer {
		listen: env_var("NSPROV_HTTP_LISTEN"),
		listen_internal: env_var("NSPROV_HTTP_LISTEN_INTERNAL"),
		request_timeout: env_var("NSPROV_HTTP_REQUEST_TIMEOUT"),
	}
}

fn load_cluster_from_env() -> ClusterConfigLayer {
	ClusterConfigLayer {
		kubeconfig: env_var("NSPROV_CLUSTER_KUBECONFIG").map(PathBuf::from),
		master: env_var("NSPROV_CLUSTER_MASTER"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("NSPROV_LOG_LEVEL"),
	}
}

fn load_provisioner_from_env() -> ProvisionerConfigLayer {
	ProvisionerConfigLayer {
		prefix: env_var("NSPROV_PROVISIONER_PREFIX"),
		selector: env_var("NSPROV_PROVISIONER_SELECTOR"),
		ttl: env_var("NSPROV_PROVISIONER_TTL"),
		cluster_role: env_var("NSPROV_PROVISIONER_CLUSTER_ROLE"),
		role_file: env_var("NSPROV_PROVISIONER_ROLE_FILE").map(PathBuf::from),
		expiry_delete_timeout: env_var("NSPROV_PROVISIONER_EXPIRY_DELETE_TIMEOUT"),
	}
}

fn load_auth_from_env() -> Result<AuthConfigLayer, ConfigError> {
	Ok(AuthConfigLayer {
		token: load_secret_env("NSPROV_AUTH_TOKEN")?,
	})
}
