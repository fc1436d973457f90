// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration for the tenant namespace provisioner.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file,
//!   environment, command line)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`NSPROV_*`)
//!
//! # Usage
//!
//! ```ignore
//! use nsprov_config::{load_config, ServerConfigLayer};
//!
//! let config = load_config(None, ServerConfigLayer::default())?;
//! println!("API listening on {}", config.http.listen);
//! ```

pub mod error;
pub mod layer;
pub mod secret;
pub mod sections;
pub mod selector;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use secret::{load_secret_env, Secret, SecretString, REDACTED};
pub use sections::*;
pub use selector::parse_label_selector;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, OverrideSource, Precedence, TomlSource,
};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub cluster: ClusterConfig,
	pub logging: LoggingConfig,
	pub provisioner: ProvisionerConfig,
	pub auth: AuthConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables (`NSPROV_*`)
/// 3. Config file (`config_path`, or `/etc/nsprov/server.toml`)
/// 4. Built-in defaults
pub fn load_config(
	config_path: Option<PathBuf>,
	overrides: ServerConfigLayer,
) -> Result<ServerConfig, ConfigError> {
	let toml = match config_path {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};

	let mut sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(OverrideSource::new(overrides)),
		Box::new(EnvSource),
		Box::new(toml),
		Box::new(DefaultsSource),
	];

	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Resolve a merged layer into a validated configuration.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let http = layer.http.unwrap_or_default().resolve()?;
	let cluster = layer.cluster.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().resolve()?;
	let provisioner = layer.provisioner.unwrap_or_default().resolve()?;
	let auth = layer.auth.unwrap_or_default().finalize();

	info!(
		listen = %http.listen,
		listen_internal = %http.listen_internal,
		kubeconfig = ?cluster.kubeconfig,
		master = ?cluster.master,
		prefix = %provisioner.prefix,
		selector = %provisioner.selector,
		ttl = %humantime::format_duration(provisioner.ttl),
		auth_enabled = auth.token.is_some(),
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		http,
		cluster,
		logging,
		provisioner,
		auth,
	})
}
