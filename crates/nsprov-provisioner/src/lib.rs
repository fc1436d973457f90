// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant namespace lifecycle management.
//!
//! This crate provides:
//! - [`Provisioner`], which creates a namespace with a scoped identity and
//!   returns a kubeconfig for it
//! - [`DeletionCoordinator`], the idempotent delete shared by API requests and
//!   expiry timers
//! - [`ExpiryScheduler`], the per-namespace TTL timers

mod deletion;
mod error;
mod expiry;
mod kubeconfig;
mod provisioner;
mod role;
mod types;

pub use deletion::DeletionCoordinator;
pub use error::ProvisionerError;
pub use expiry::{ExpiryScheduler, ExpiryState};
pub use kubeconfig::{build_kubeconfig, Kubeconfig};
pub use provisioner::{Provisioner, ProvisionerSettings, IDENTITY_NAME};
pub use role::{load_role_template, BindingTarget};
pub use types::{CreatedNamespace, DeleteOutcome, NamespaceId};

use std::future::Future;
use std::time::Duration;

use nsprov_k8s::{K8sError, K8sResult};
use tokio::time::Instant;

/// Deadlines this far out stand in for "never".
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + after`, saturating instead of overflowing the clock.
pub fn deadline_after(after: Duration) -> Instant {
	let now = Instant::now();
	now.checked_add(after).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Run a cluster call under the caller's deadline.
pub(crate) async fn with_deadline<T, F>(deadline: Instant, call: F) -> K8sResult<T>
where
	F: Future<Output = K8sResult<T>>,
{
	tokio::time::timeout_at(deadline, call)
		.await
		.map_err(|_| K8sError::Timeout)?
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deadline_after_saturates() {
		let now = Instant::now();
		assert!(deadline_after(Duration::MAX) >= now + FAR_FUTURE);
		assert!(deadline_after(Duration::from_secs(1)) <= Instant::now() + Duration::from_secs(1));
	}
}
