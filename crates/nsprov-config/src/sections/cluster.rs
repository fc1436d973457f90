// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster connection configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// How to reach the control plane. Both unset means infer (in-cluster,
/// `KUBECONFIG`, `~/.kube/config`).
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
	pub kubeconfig: Option<PathBuf>,
	/// Overrides the server URL from the kubeconfig.
	pub master: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterConfigLayer {
	#[serde(default)]
	pub kubeconfig: Option<PathBuf>,
	#[serde(default)]
	pub master: Option<String>,
}

impl ClusterConfigLayer {
	pub fn merge(&mut self, other: ClusterConfigLayer) {
		if other.kubeconfig.is_some() {
			self.kubeconfig = other.kubeconfig;
		}
		if other.master.is_some() {
			self.master = other.master;
		}
	}

	pub fn finalize(self) -> ClusterConfig {
		ClusterConfig {
			kubeconfig: self.kubeconfig,
			master: self
				.master
				.map(|m| m.trim().to_string())
				.filter(|m| !m.is_empty()),
		}
	}
}
