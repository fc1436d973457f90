// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Idempotent namespace deletion.

use std::sync::Arc;

use nsprov_k8s::{CachedNamespace, ClusterGateway, K8sError, NamespaceCache};
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::ProvisionerError;
use crate::types::DeleteOutcome;
use crate::with_deadline;

/// Deletes tenant namespaces on behalf of API requests and expiry timers.
///
/// The cached view only short-circuits work; it may lag the control plane in
/// either direction. Not-found and already-terminating answers from the
/// control plane are success, so concurrent callers need no lock.
pub struct DeletionCoordinator {
	gateway: Arc<dyn ClusterGateway>,
	cache: Arc<dyn NamespaceCache>,
}

impl DeletionCoordinator {
	pub fn new(gateway: Arc<dyn ClusterGateway>, cache: Arc<dyn NamespaceCache>) -> Self {
		Self { gateway, cache }
	}

	/// Delete `name` with foreground propagation.
	#[instrument(skip_all, fields(namespace = %name))]
	pub async fn delete(
		&self,
		name: &str,
		deadline: Instant,
	) -> Result<DeleteOutcome, ProvisionerError> {
		if name.trim().is_empty() {
			return Err(ProvisionerError::InvalidName {
				name: name.to_string(),
			});
		}

		match self.cache.lookup(name) {
			CachedNamespace::Absent => {
				debug!("namespace not in cache, nothing to delete");
				return Ok(DeleteOutcome::AlreadyAbsent);
			}
			CachedNamespace::Terminating => {
				debug!("namespace already terminating");
				return Ok(DeleteOutcome::AlreadyTerminating);
			}
			CachedNamespace::Present => {}
		}

		let outcome = match with_deadline(deadline, self.gateway.delete_namespace(name)).await {
			Ok(()) => DeleteOutcome::Deleted,
			Err(K8sError::NamespaceNotFound { .. }) => DeleteOutcome::AlreadyAbsent,
			Err(K8sError::NamespaceTerminating { .. }) => DeleteOutcome::AlreadyTerminating,
			Err(e) => return Err(e.into()),
		};

		info!(outcome = outcome.as_str(), "namespace delete finished");
		Ok(outcome)
	}
}
