// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Eventually-consistent view of managed namespaces.
//!
//! The view is fed by a watch on the API server and can lag the control plane
//! in both directions: a namespace may still be listed after it is gone, or
//! be missing shortly after it was created. Callers must treat the answer as
//! a hint and rely on idempotent mutations for correctness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{future, StreamExt};
use kube::{
	runtime::{
		reflector::{self, ObjectRef, Store},
		watcher, WatchStreamExt,
	},
	Api, Client,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::K8sError;
use crate::types::Namespace;

/// What the cached view currently believes about a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedNamespace {
	Absent,
	Present,
	/// Present, but already carrying a deletion timestamp.
	Terminating,
}

/// Read-only lookup of namespaces by name.
pub trait NamespaceCache: Send + Sync {
	fn lookup(&self, name: &str) -> CachedNamespace;

	/// Whether the initial list has completed.
	fn is_ready(&self) -> bool;
}

/// Namespace view backed by a kube-rs reflector store.
///
/// Only namespaces matching the label selector are visible.
#[derive(Clone)]
pub struct ReflectorCache {
	store: Store<Namespace>,
	ready: Arc<AtomicBool>,
}

impl ReflectorCache {
	/// Start watching namespaces matching `label_selector`.
	///
	/// The returned task drives the watch until it is aborted; watch errors
	/// are retried with the default backoff.
	pub fn spawn(client: Client, label_selector: &str) -> (Self, JoinHandle<()>) {
		let api: Api<Namespace> = Api::all(client);
		let (store, writer) = reflector::store();
		let config = watcher::Config::default().labels(label_selector);

		let stream = reflector::reflector(writer, watcher(api, config))
			.default_backoff()
			.touched_objects();

		let handle = tokio::spawn(async move {
			stream
				.for_each(|event| {
					if let Err(e) = event {
						warn!(error = %e, "namespace watch error");
					}
					future::ready(())
				})
				.await;
		});

		let cache = Self {
			store,
			ready: Arc::new(AtomicBool::new(false)),
		};
		(cache, handle)
	}

	/// Block until the initial list has been loaded into the store.
	pub async fn wait_until_ready(&self) -> Result<(), K8sError> {
		self
			.store
			.wait_until_ready()
			.await
			.map_err(|e| K8sError::CacheSync {
				message: e.to_string(),
			})?;
		self.ready.store(true, Ordering::SeqCst);
		info!(namespaces = self.store.state().len(), "namespace cache synced");
		Ok(())
	}
}

impl NamespaceCache for ReflectorCache {
	fn lookup(&self, name: &str) -> CachedNamespace {
		match self.store.get(&ObjectRef::new(name)) {
			None => CachedNamespace::Absent,
			Some(ns) if ns.metadata.deletion_timestamp.is_some() => CachedNamespace::Terminating,
			Some(_) => CachedNamespace::Present,
		}
	}

	fn is_ready(&self) -> bool {
		self.ready.load(Ordering::SeqCst)
	}
}
