// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Result type alias for K8s operations.
pub type K8sResult<T> = Result<T, K8sError>;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("Namespace not found: {name}")]
	NamespaceNotFound { name: String },

	#[error("Namespace is already terminating: {name}")]
	NamespaceTerminating { name: String },

	#[error("Secret not found: {namespace}/{name}")]
	SecretNotFound { namespace: String, name: String },

	#[error("Operation timed out")]
	Timeout,

	#[error("K8s client configuration error: {message}")]
	Config { message: String },

	#[error("Namespace cache failed to sync: {message}")]
	CacheSync { message: String },
}

impl K8sError {
	/// Whether the error reports a resource that does not exist.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			K8sError::NamespaceNotFound { .. } | K8sError::SecretNotFound { .. }
		)
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}
