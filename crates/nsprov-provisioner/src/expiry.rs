// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-namespace TTL timers.
//!
//! Each scheduled namespace gets one task that sleeps until its deadline and
//! then runs the [`DeletionCoordinator`] once. Timers are in-memory only and
//! are lost on restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::deletion::DeletionCoordinator;
use crate::deadline_after;

/// Lifecycle of one namespace's expiry while it is tracked.
///
/// Entries leave the registry once the deletion attempt finishes or the
/// timer is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryState {
	/// Waiting for the deadline.
	Scheduled,
	/// Deadline reached, deletion in progress.
	Fired,
}

struct Entry {
	/// Distinguishes this registration from a later one under the same name.
	id: u64,
	state: ExpiryState,
	deadline: Instant,
	cancel: CancellationToken,
}

type Registry = Arc<Mutex<HashMap<String, Entry>>>;

/// Registry of TTL timers keyed by namespace name.
///
/// A name has at most one live timer, and each timer deletes at most once.
pub struct ExpiryScheduler {
	registry: Registry,
	deletion: Arc<DeletionCoordinator>,
	delete_timeout: Duration,
	tracker: TaskTracker,
	shutdown: CancellationToken,
	next_id: AtomicU64,
	failed: Arc<AtomicUsize>,
}

impl ExpiryScheduler {
	/// `delete_timeout` bounds each firing's delete call.
	pub fn new(deletion: Arc<DeletionCoordinator>, delete_timeout: Duration) -> Self {
		Self {
			registry: Arc::new(Mutex::new(HashMap::new())),
			deletion,
			delete_timeout,
			tracker: TaskTracker::new(),
			shutdown: CancellationToken::new(),
			next_id: AtomicU64::new(0),
			failed: Arc::new(AtomicUsize::new(0)),
		}
	}

	/// Delete `name` once `ttl` has elapsed.
	///
	/// Returns `false` if the name already has a live timer or the scheduler
	/// is shutting down.
	pub fn schedule(&self, name: &str, ttl: Duration) -> bool {
		if self.shutdown.is_cancelled() {
			warn!(namespace = %name, "scheduler is shut down, expiry not registered");
			return false;
		}

		let deadline = deadline_after(ttl);
		let cancel = self.shutdown.child_token();
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		{
			let mut registry = lock(&self.registry);
			if registry.contains_key(name) {
				warn!(namespace = %name, "expiry already registered");
				return false;
			}
			registry.insert(
				name.to_string(),
				Entry {
					id,
					state: ExpiryState::Scheduled,
					deadline,
					cancel: cancel.clone(),
				},
			);
		}

		debug!(namespace = %name, ttl = ?ttl, "expiry scheduled");

		let name = name.to_string();
		let registry = Arc::clone(&self.registry);
		let deletion = Arc::clone(&self.deletion);
		let failed = Arc::clone(&self.failed);
		let delete_timeout = self.delete_timeout;
		self.tracker.spawn(async move {
			tokio::select! {
				biased;
				_ = cancel.cancelled() => {
					debug!(namespace = %name, "expiry cancelled");
					remove(&registry, &name, id);
					return;
				}
				_ = tokio::time::sleep_until(deadline) => {}
			}

			if !claim(&registry, &name, id) {
				return;
			}

			info!(namespace = %name, "namespace TTL expired, deleting");
			match deletion.delete(&name, deadline_after(delete_timeout)).await {
				Ok(outcome) => {
					info!(namespace = %name, outcome = outcome.as_str(), "expired namespace deleted");
				}
				Err(e) => {
					failed.fetch_add(1, Ordering::Relaxed);
					error!(namespace = %name, error = %e, "failed to delete expired namespace");
				}
			}
			remove(&registry, &name, id);
		});

		true
	}

	/// Stop a timer that has not fired yet.
	pub fn cancel(&self, name: &str) -> bool {
		let mut registry = lock(&self.registry);
		if registry.get(name).map(|e| e.state) != Some(ExpiryState::Scheduled) {
			return false;
		}
		if let Some(entry) = registry.remove(name) {
			entry.cancel.cancel();
		}
		true
	}

	/// `None` once the namespace is no longer tracked.
	pub fn state(&self, name: &str) -> Option<ExpiryState> {
		lock(&self.registry).get(name).map(|e| e.state)
	}

	/// When `name` is due to fire, if it is still waiting.
	pub fn deadline(&self, name: &str) -> Option<Instant> {
		lock(&self.registry)
			.get(name)
			.filter(|e| e.state == ExpiryState::Scheduled)
			.map(|e| e.deadline)
	}

	/// Number of timers that have not fired yet.
	pub fn pending(&self) -> usize {
		lock(&self.registry)
			.values()
			.filter(|e| e.state == ExpiryState::Scheduled)
			.count()
	}

	/// Firings whose delete returned an error.
	pub fn failed_firings(&self) -> usize {
		self.failed.load(Ordering::Relaxed)
	}

	/// Cancel every waiting timer and wait for in-flight deletions.
	pub async fn shutdown(&self) {
		let pending = self.pending();
		info!(pending, "draining expiry scheduler");
		self.shutdown.cancel();
		self.tracker.close();
		self.tracker.wait().await;
	}
}

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, Entry>> {
	registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Move a due entry to `Fired`. Loses to a concurrent [`ExpiryScheduler::cancel`].
fn claim(registry: &Registry, name: &str, id: u64) -> bool {
	let mut registry = lock(registry);
	match registry.get_mut(name) {
		Some(entry)
			if entry.id == id
				&& entry.state == ExpiryState::Scheduled
				&& !entry.cancel.is_cancelled() =>
		{
			entry.state = ExpiryState::Fired;
			true
		}
		_ => false,
	}
}

fn remove(registry: &Registry, name: &str, id: u64) {
	let mut registry = lock(registry);
	if registry.get(name).is_some_and(|e| e.id == id) {
		registry.remove(name);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nsprov_k8s::fake::{FakeCluster, Operation};
	use nsprov_k8s::{K8sError, Namespace, ObjectMeta};

	const TTL: Duration = Duration::from_secs(60);

	fn namespace(name: &str) -> Namespace {
		Namespace {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				..Default::default()
			},
			..Default::default()
		}
	}

	fn scheduler(cluster: &Arc<FakeCluster>) -> ExpiryScheduler {
		let deletion = Arc::new(DeletionCoordinator::new(cluster.clone(), cluster.clone()));
		ExpiryScheduler::new(deletion, Duration::from_secs(120))
	}

	#[tokio::test(start_paused = true)]
	async fn fires_once_after_ttl_and_not_before() {
		let cluster = Arc::new(FakeCluster::new());
		cluster.seed_namespace(namespace("np-a"));
		let scheduler = scheduler(&cluster);

		assert!(scheduler.schedule("np-a", TTL));
		assert_eq!(scheduler.state("np-a"), Some(ExpiryState::Scheduled));

		tokio::time::sleep(TTL - Duration::from_secs(1)).await;
		assert!(cluster.calls_of(Operation::DeleteNamespace).is_empty());
		assert!(cluster.namespace_exists("np-a"));

		tokio::time::sleep(Duration::from_secs(2)).await;
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 1);
		assert!(!cluster.namespace_exists("np-a"));
		assert_eq!(scheduler.state("np-a"), None);

		tokio::time::sleep(TTL * 10).await;
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn duplicate_registration_is_ignored() {
		let cluster = Arc::new(FakeCluster::new());
		cluster.seed_namespace(namespace("np-a"));
		let scheduler = scheduler(&cluster);

		assert!(scheduler.schedule("np-a", TTL));
		assert!(!scheduler.schedule("np-a", TTL));
		assert_eq!(scheduler.pending(), 1);

		tokio::time::sleep(TTL * 2).await;
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn registry_drains_after_firing() {
		let cluster = Arc::new(FakeCluster::new());
		let scheduler = scheduler(&cluster);
		for i in 0..100 {
			let name = format!("np-{i}");
			cluster.seed_namespace(namespace(&name));
			assert!(scheduler.schedule(&name, TTL + Duration::from_secs(i)));
		}
		assert_eq!(lock(&scheduler.registry).len(), 100);

		tokio::time::sleep(TTL * 3).await;

		assert!(lock(&scheduler.registry).is_empty());
		assert!(cluster.namespace_names().is_empty());
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 100);
	}

	#[tokio::test(start_paused = true)]
	async fn overflowing_ttl_waits_instead_of_panicking() {
		let cluster = Arc::new(FakeCluster::new());
		cluster.seed_namespace(namespace("np-a"));
		let scheduler = scheduler(&cluster);

		assert!(scheduler.schedule("np-a", Duration::MAX));
		assert!(scheduler.deadline("np-a").unwrap() > Instant::now() + TTL * 1000);

		tokio::time::sleep(TTL * 10).await;
		assert!(cluster.calls().is_empty());
		assert_eq!(scheduler.pending(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn timers_are_independent() {
		let cluster = Arc::new(FakeCluster::new().with_latency(Duration::from_secs(30)));
		cluster.seed_namespace(namespace("np-slow"));
		cluster.seed_namespace(namespace("np-fast"));
		let scheduler = scheduler(&cluster);

		scheduler.schedule("np-slow", Duration::from_secs(10));
		scheduler.schedule("np-fast", Duration::from_secs(20));

		// np-slow's delete is still in flight when np-fast fires.
		tokio::time::sleep(Duration::from_secs(25)).await;
		assert_eq!(scheduler.state("np-slow"), Some(ExpiryState::Fired));
		assert_eq!(scheduler.state("np-fast"), Some(ExpiryState::Fired));

		tokio::time::sleep(Duration::from_secs(30)).await;
		assert!(cluster.namespace_names().is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn cancel_prevents_firing() {
		let cluster = Arc::new(FakeCluster::new());
		cluster.seed_namespace(namespace("np-a"));
		let scheduler = scheduler(&cluster);

		scheduler.schedule("np-a", TTL);
		assert!(scheduler.cancel("np-a"));
		assert!(!scheduler.cancel("np-a"));

		tokio::time::sleep(TTL * 2).await;
		assert!(cluster.calls().is_empty());
		assert_eq!(scheduler.state("np-a"), None);
		assert!(lock(&scheduler.registry).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn fires_even_after_explicit_delete() {
		let cluster = Arc::new(FakeCluster::new().with_lagging_cache());
		cluster.seed_namespace(namespace("np-a"));
		cluster.sync_cache();
		let scheduler = scheduler(&cluster);
		scheduler.schedule("np-a", TTL);

		scheduler
			.deletion
			.delete("np-a", Instant::now() + Duration::from_secs(5))
			.await
			.unwrap();

		// The cache still lists the namespace, so the firing reaches the
		// control plane and gets not-found.
		tokio::time::sleep(TTL * 2).await;
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 2);
		assert_eq!(scheduler.failed_firings(), 0);
		assert_eq!(scheduler.state("np-a"), None);
	}

	#[tokio::test(start_paused = true)]
	async fn failed_firing_is_logged_and_dropped() {
		let cluster = Arc::new(FakeCluster::new());
		cluster.seed_namespace(namespace("np-a"));
		cluster.fail(
			Operation::DeleteNamespace,
			K8sError::ApiError {
				message: "boom".to_string(),
			},
		);
		let scheduler = scheduler(&cluster);
		scheduler.schedule("np-a", TTL);

		tokio::time::sleep(TTL * 2).await;
		assert_eq!(scheduler.state("np-a"), None);
		assert_eq!(scheduler.failed_firings(), 1);
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_drains_without_firing() {
		let cluster = Arc::new(FakeCluster::new());
		cluster.seed_namespace(namespace("np-a"));
		let scheduler = scheduler(&cluster);
		scheduler.schedule("np-a", TTL);

		scheduler.shutdown().await;

		assert!(!scheduler.schedule("np-b", TTL));
		tokio::time::sleep(TTL * 2).await;
		assert!(cluster.calls().is_empty());
		assert_eq!(scheduler.pending(), 0);
		assert!(lock(&scheduler.registry).is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn firing_races_explicit_delete() {
		let cluster = Arc::new(FakeCluster::new().with_latency(Duration::from_millis(100)));
		cluster.seed_namespace(namespace("np-a"));
		let scheduler = scheduler(&cluster);
		scheduler.schedule("np-a", TTL);

		// Wakes in the same tick as the timer, so both see the namespace
		// present and both reach the control plane.
		tokio::time::sleep(TTL).await;
		let explicit = scheduler
			.deletion
			.delete("np-a", Instant::now() + Duration::from_secs(5))
			.await;

		tokio::time::sleep(Duration::from_secs(1)).await;
		assert!(explicit.is_ok());
		assert_eq!(cluster.calls_of(Operation::DeleteNamespace).len(), 2);
		assert_eq!(scheduler.failed_firings(), 0);
		assert!(!cluster.namespace_exists("np-a"));
		assert_eq!(scheduler.state("np-a"), None);
	}
}
