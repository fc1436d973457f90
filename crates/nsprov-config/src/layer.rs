// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	AuthConfigLayer, ClusterConfigLayer, HttpConfigLayer, LoggingConfigLayer,
	ProvisionerConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub cluster: Option<ClusterConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub provisioner: Option<ProvisionerConfigLayer>,
	#[serde(default)]
	pub auth: Option<AuthConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.cluster, other.cluster, ClusterConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_option(
			&mut self.provisioner,
			other.provisioner,
			ProvisionerConfigLayer::merge,
		);
		merge_option(&mut self.auth, other.auth, AuthConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer::default());
		assert!(base.http.is_none());
		assert!(base.provisioner.is_none());
	}

	#[test]
	fn test_merge_other_overwrites_field_by_field() {
		let mut base = ServerConfigLayer {
			provisioner: Some(ProvisionerConfigLayer {
				prefix: Some("base".to_string()),
				cluster_role: Some("edit".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		let other = ServerConfigLayer {
			provisioner: Some(ProvisionerConfigLayer {
				prefix: Some("other".to_string()),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(other);

		let provisioner = base.provisioner.unwrap();
		assert_eq!(provisioner.prefix.as_deref(), Some("other"));
		assert_eq!(provisioner.cluster_role.as_deref(), Some("edit"));
	}

	#[test]
	fn test_merge_adds_missing_sections() {
		let mut base = ServerConfigLayer::default();
		let other = ServerConfigLayer {
			logging: Some(LoggingConfigLayer {
				level: Some("warn".to_string()),
			}),
			..Default::default()
		};
		base.merge(other);
		assert_eq!(
			base.logging.and_then(|l| l.level).as_deref(),
			Some("warn")
		);
	}

	#[test]
	fn test_deserialize_full_toml() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
[http]
listen = "127.0.0.1:8000"
request_timeout = "10s"

[cluster]
master = "https://api.example.com:6443"

[provisioner]
ttl = "30m"
cluster_role = "admin"
"#,
		)
		.unwrap();

		assert_eq!(
			layer.http.as_ref().and_then(|h| h.listen.as_deref()),
			Some("127.0.0.1:8000")
		);
		assert_eq!(
			layer.cluster.as_ref().and_then(|c| c.master.as_deref()),
			Some("https://api.example.com:6443")
		);
		assert_eq!(
			layer.provisioner.as_ref().and_then(|p| p.ttl.as_deref()),
			Some("30m")
		);
	}
}
