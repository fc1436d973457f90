// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubeconfig documents scoped to a single tenant namespace.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ProvisionerError;

const ENTRY_NAME: &str = "np";

/// Client configuration document (`kind: Config`).
#[derive(Clone, Serialize, Deserialize)]
pub struct Kubeconfig {
	#[serde(rename = "apiVersion")]
	pub api_version: String,
	pub kind: String,
	pub clusters: Vec<NamedCluster>,
	pub users: Vec<NamedUser>,
	pub contexts: Vec<NamedContext>,
	#[serde(rename = "current-context")]
	pub current_context: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NamedCluster {
	pub name: String,
	pub cluster: Cluster,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Cluster {
	pub server: String,
	#[serde(rename = "certificate-authority-data")]
	pub certificate_authority_data: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NamedUser {
	pub name: String,
	pub user: User,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
	pub token: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NamedContext {
	pub name: String,
	pub context: Context,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Context {
	pub cluster: String,
	pub user: String,
	pub namespace: String,
}

impl Kubeconfig {
	/// The namespace of the current context.
	pub fn current_namespace(&self) -> Option<&str> {
		self.contexts
			.iter()
			.find(|c| c.name == self.current_context)
			.map(|c| c.context.namespace.as_str())
	}
}

/// Render a kubeconfig whose only context is `namespace`.
///
/// `ca_crt` is the PEM bundle from the token secret; it is base64-encoded
/// into `certificate-authority-data`.
pub fn build_kubeconfig(
	server: &str,
	namespace: &str,
	ca_crt: &[u8],
	token: &str,
) -> Result<String, ProvisionerError> {
	let config = Kubeconfig {
		api_version: "v1".to_string(),
		kind: "Config".to_string(),
		clusters: vec![NamedCluster {
			name: ENTRY_NAME.to_string(),
			cluster: Cluster {
				server: server.to_string(),
				certificate_authority_data: base64::engine::general_purpose::STANDARD
					.encode(ca_crt),
			},
		}],
		users: vec![NamedUser {
			name: ENTRY_NAME.to_string(),
			user: User {
				token: token.to_string(),
			},
		}],
		contexts: vec![NamedContext {
			name: ENTRY_NAME.to_string(),
			context: Context {
				cluster: ENTRY_NAME.to_string(),
				user: ENTRY_NAME.to_string(),
				namespace: namespace.to_string(),
			},
		}],
		current_context: ENTRY_NAME.to_string(),
	};

	serde_yaml::to_string(&config).map_err(|e| ProvisionerError::Kubeconfig(e.to_string()))
}
