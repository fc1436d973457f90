// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioner error types.

use std::path::PathBuf;

/// Errors that can occur while provisioning or deleting tenant namespaces.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionerError {
	/// The namespace name failed validation.
	#[error("Invalid namespace name: {name:?}")]
	InvalidName { name: String },

	/// The token secret was not populated before the deadline.
	#[error("Token for namespace {namespace} was not issued in time")]
	TokenNotReady { namespace: String },

	/// The kubeconfig could not be assembled.
	#[error("Failed to build kubeconfig: {0}")]
	Kubeconfig(String),

	/// The role template could not be loaded.
	#[error("Invalid role template {path}: {message}")]
	RoleTemplate { path: PathBuf, message: String },

	/// Neither a cluster role nor a role template was configured.
	#[error("No cluster role or role template configured")]
	MissingRole,

	/// Kubernetes error
	#[error(transparent)]
	K8sError(#[from] nsprov_k8s::K8sError),
}

impl ProvisionerError {
	/// Whether the error was caused by the caller's input.
	pub fn is_client_error(&self) -> bool {
		matches!(self, ProvisionerError::InvalidName { .. })
	}
}
