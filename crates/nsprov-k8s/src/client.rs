// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;

use crate::error::K8sError;
use crate::types::{Namespace, Role, RoleBinding, Secret, ServiceAccount};

/// Trait for the cluster operations needed to provision tenant namespaces.
///
/// The control plane is the store of record; every call is a remote
/// round-trip. Not-found outcomes are reported as typed variants so callers
/// can normalize them.
#[async_trait]
pub trait ClusterGateway: Send + Sync {
	/// Create a cluster-scoped namespace.
	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError>;

	/// Delete a namespace with foreground propagation, so dependents are
	/// reaped before the namespace itself disappears.
	///
	/// Returns [`K8sError::NamespaceNotFound`] if it does not exist and
	/// [`K8sError::NamespaceTerminating`] if a deletion is already underway.
	async fn delete_namespace(&self, name: &str) -> Result<(), K8sError>;

	/// Create a service account in the given namespace.
	async fn create_service_account(
		&self,
		namespace: &str,
		service_account: ServiceAccount,
	) -> Result<ServiceAccount, K8sError>;

	/// Create a secret in the given namespace.
	async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, K8sError>;

	/// Read a secret by name.
	async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sError>;

	/// Create a role in the given namespace.
	async fn create_role(&self, namespace: &str, role: Role) -> Result<Role, K8sError>;

	/// Create a role binding in the given namespace.
	async fn create_role_binding(
		&self,
		namespace: &str,
		binding: RoleBinding,
	) -> Result<RoleBinding, K8sError>;
}
