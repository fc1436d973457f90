// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Cluster access for tenant namespace provisioning.
//!
//! This crate provides:
//! - [`ClusterGateway`], the narrow create/get/delete surface the provisioner
//!   uses against the Kubernetes API, with a kube-rs implementation
//! - [`NamespaceCache`], an eventually-consistent view of managed namespaces
//!   backed by a kube-rs reflector
//! - [`fake::FakeCluster`], an in-memory cluster implementing both traits for tests

mod cache;
mod client;
mod error;
pub mod fake;
mod kube_client;
mod types;

pub use cache::{CachedNamespace, NamespaceCache, ReflectorCache};
pub use client::ClusterGateway;
pub use error::{K8sError, K8sResult};
pub use kube_client::{connect, ClusterConnection, ConnectOptions, KubeGateway};
pub use types::{
	Namespace, ObjectMeta, PolicyRule, Role, RoleBinding, RoleRef, Secret, ServiceAccount, Subject,
	SERVICE_ACCOUNT_NAME_ANNOTATION, SERVICE_ACCOUNT_TOKEN_TYPE,
};
