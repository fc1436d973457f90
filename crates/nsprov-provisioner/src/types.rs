// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant namespace types.

use chrono::{DateTime, Utc};

/// Unique identifier for a tenant namespace, using UUID7 (time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespaceId(uuid7::Uuid);

impl NamespaceId {
	pub fn new() -> Self {
		Self(uuid7::uuid7())
	}

	/// The namespace name for this id: `{prefix}-{uuid}`.
	pub fn as_k8s_name(&self, prefix: &str) -> String {
		format!("{prefix}-{}", self.0)
	}
}

impl Default for NamespaceId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for NamespaceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A provisioned namespace and the credentials issued for it.
pub struct CreatedNamespace {
	pub name: String,
	/// Kubeconfig YAML scoped to the namespace. Carries the bearer token.
	pub kubeconfig: String,
	pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for CreatedNamespace {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CreatedNamespace")
			.field("name", &self.name)
			.field("kubeconfig", &"[REDACTED]")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// How a delete request was satisfied. Every variant is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
	/// The delete call was accepted by the control plane.
	Deleted,
	/// The namespace did not exist (per the cache or the control plane).
	AlreadyAbsent,
	/// The namespace was already being torn down.
	AlreadyTerminating,
}

impl DeleteOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			DeleteOutcome::Deleted => "deleted",
			DeleteOutcome::AlreadyAbsent => "already_absent",
			DeleteOutcome::AlreadyTerminating => "already_terminating",
		}
	}
}
