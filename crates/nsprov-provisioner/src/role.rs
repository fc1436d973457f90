// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! What the tenant identity is bound to.

use std::path::Path;

use nsprov_k8s::{ObjectMeta, Role, RoleRef};

use crate::error::ProvisionerError;
use crate::provisioner::IDENTITY_NAME;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Role the per-namespace binding references.
#[derive(Debug, Clone)]
pub enum BindingTarget {
	/// A pre-existing cluster role, referenced by name.
	ClusterRole(String),
	/// A role created in every tenant namespace from a template.
	Role(Role),
}

impl BindingTarget {
	/// The role template wins when both are configured.
	pub fn from_config(
		cluster_role: Option<&str>,
		role_file: Option<&Path>,
	) -> Result<Self, ProvisionerError> {
		match (role_file, cluster_role) {
			(Some(path), _) => load_role_template(path).map(BindingTarget::Role),
			(None, Some(name)) => Ok(BindingTarget::ClusterRole(name.to_string())),
			(None, None) => Err(ProvisionerError::MissingRole),
		}
	}

	/// The role to create in `namespace` before binding, if any.
	pub(crate) fn role_for(&self, namespace: &str) -> Option<Role> {
		match self {
			BindingTarget::ClusterRole(_) => None,
			BindingTarget::Role(template) => {
				let mut role = template.clone();
				role.metadata.namespace = Some(namespace.to_string());
				Some(role)
			}
		}
	}

	pub(crate) fn role_ref(&self) -> RoleRef {
		match self {
			BindingTarget::ClusterRole(name) => RoleRef {
				api_group: RBAC_API_GROUP.to_string(),
				kind: "ClusterRole".to_string(),
				name: name.clone(),
			},
			BindingTarget::Role(_) => RoleRef {
				api_group: RBAC_API_GROUP.to_string(),
				kind: "Role".to_string(),
				name: IDENTITY_NAME.to_string(),
			},
		}
	}
}

/// Load an `rbac.authorization.k8s.io/v1` Role from a YAML file.
///
/// The template's name and namespace are replaced; only its rules and
/// labels/annotations are kept.
pub fn load_role_template(path: &Path) -> Result<Role, ProvisionerError> {
	let content = std::fs::read_to_string(path).map_err(|e| ProvisionerError::RoleTemplate {
		path: path.to_path_buf(),
		message: e.to_string(),
	})?;
	parse_role_template(&content).map_err(|message| ProvisionerError::RoleTemplate {
		path: path.to_path_buf(),
		message,
	})
}

fn parse_role_template(content: &str) -> Result<Role, String> {
	let role: Role = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
	if role.rules.as_ref().map_or(true, Vec::is_empty) {
		return Err("role template has no rules".to_string());
	}

	Ok(Role {
		metadata: ObjectMeta {
			name: Some(IDENTITY_NAME.to_string()),
			labels: role.metadata.labels,
			annotations: role.metadata.annotations,
			..Default::default()
		},
		rules: role.rules,
	})
}
