// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner configuration section.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::resolve_duration;
use crate::error::ConfigError;
use crate::selector::parse_label_selector;

pub const DEFAULT_SELECTOR: &str = "controller.observatorium.io=namespace-selector";

const DEFAULT_PREFIX: &str = "np";
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_EXPIRY_DELETE_TIMEOUT: Duration = Duration::from_secs(120);

/// `{prefix}-{uuid}` must fit a 63 character namespace name.
const MAX_PREFIX_LENGTH: usize = 63 - 37;

/// Provisioner configuration (runtime, resolved).
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
	pub prefix: String,
	/// The selector as configured, used to scope the namespace watch.
	pub selector: String,
	/// The selector as a label set, stamped on every created resource.
	pub labels: BTreeMap<String, String>,
	pub ttl: Duration,
	pub cluster_role: Option<String>,
	pub role_file: Option<PathBuf>,
	pub expiry_delete_timeout: Duration,
}

/// Provisioner configuration layer (for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionerConfigLayer {
	#[serde(default)]
	pub prefix: Option<String>,
	#[serde(default)]
	pub selector: Option<String>,
	#[serde(default)]
	pub ttl: Option<String>,
	#[serde(default)]
	pub cluster_role: Option<String>,
	#[serde(default)]
	pub role_file: Option<PathBuf>,
	#[serde(default)]
	pub expiry_delete_timeout: Option<String>,
}

impl ProvisionerConfigLayer {
	pub fn merge(&mut self, other: ProvisionerConfigLayer) {
		if other.prefix.is_some() {
			self.prefix = other.prefix;
		}
		if other.selector.is_some() {
			self.selector = other.selector;
		}
		if other.ttl.is_some() {
			self.ttl = other.ttl;
		}
		if other.cluster_role.is_some() {
			self.cluster_role = other.cluster_role;
		}
		if other.role_file.is_some() {
			self.role_file = other.role_file;
		}
		if other.expiry_delete_timeout.is_some() {
			self.expiry_delete_timeout = other.expiry_delete_timeout;
		}
	}

	pub fn resolve(self) -> Result<ProvisionerConfig, ConfigError> {
		let prefix = self.prefix.unwrap_or_else(|| DEFAULT_PREFIX.to_string());
		validate_prefix(&prefix)?;

		let selector = self
			.selector
			.unwrap_or_else(|| DEFAULT_SELECTOR.to_string());
		let labels = parse_label_selector(&selector)?;

		let ttl = resolve_duration("provisioner.ttl", self.ttl, DEFAULT_TTL)?;
		if ttl.is_zero() {
			return Err(ConfigError::Validation(
				"provisioner.ttl must be greater than zero".to_string(),
			));
		}

		let expiry_delete_timeout = resolve_duration(
			"provisioner.expiry_delete_timeout",
			self.expiry_delete_timeout,
			DEFAULT_EXPIRY_DELETE_TIMEOUT,
		)?;
		if expiry_delete_timeout.is_zero() {
			return Err(ConfigError::Validation(
				"provisioner.expiry_delete_timeout must be greater than zero".to_string(),
			));
		}

		let cluster_role = self
			.cluster_role
			.map(|r| r.trim().to_string())
			.filter(|r| !r.is_empty());
		if cluster_role.is_none() && self.role_file.is_none() {
			return Err(ConfigError::Validation(
				"one of provisioner.cluster_role or provisioner.role_file is required".to_string(),
			));
		}

		Ok(ProvisionerConfig {
			prefix,
			selector,
			labels,
			ttl,
			cluster_role,
			role_file: self.role_file,
			expiry_delete_timeout,
		})
	}
}

fn validate_prefix(prefix: &str) -> Result<(), ConfigError> {
	let invalid = |message: &str| ConfigError::InvalidValue {
		key: "provisioner.prefix".to_string(),
		message: format!("'{prefix}' {message}"),
	};

	if prefix.is_empty() || prefix.len() > MAX_PREFIX_LENGTH {
		return Err(invalid(&format!(
			"must be 1-{MAX_PREFIX_LENGTH} characters"
		)));
	}
	if !prefix
		.chars()
		.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
	{
		return Err(invalid("may only contain lowercase letters, digits and '-'"));
	}
	if !prefix.starts_with(|c: char| c.is_ascii_alphanumeric()) {
		return Err(invalid("must start with a letter or digit"));
	}
	Ok(())
}
