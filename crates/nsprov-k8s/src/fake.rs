// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! An in-memory cluster that can be used for testing.
//!
//! [`FakeCluster`] implements both [`ClusterGateway`] and [`NamespaceCache`].
//! It records every gateway call, can inject failures per operation, can let
//! its cached view lag the store, and can delay token materialization the
//! way the token controller does.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::ByteString;

use crate::cache::{CachedNamespace, NamespaceCache};
use crate::client::ClusterGateway;
use crate::error::K8sError;
use crate::types::{
	Namespace, Role, RoleBinding, Secret, ServiceAccount, SERVICE_ACCOUNT_TOKEN_TYPE,
};

/// CA bundle written into materialized token secrets.
pub const FAKE_CA_CRT: &[u8] = b"-----BEGIN CERTIFICATE-----\nfake\n-----END CERTIFICATE-----\n";

/// Gateway operations, used for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
	CreateNamespace,
	DeleteNamespace,
	CreateServiceAccount,
	CreateSecret,
	GetSecret,
	CreateRole,
	CreateRoleBinding,
}

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
	pub operation: Operation,
	/// Namespace the call targeted (the namespace itself for namespace calls).
	pub namespace: String,
	pub name: String,
}

type Key = (String, String);

#[derive(Default)]
struct State {
	namespaces: BTreeMap<String, Namespace>,
	terminating: BTreeSet<String>,
	service_accounts: BTreeMap<Key, ServiceAccount>,
	secrets: BTreeMap<Key, Secret>,
	secret_reads: HashMap<Key, usize>,
	roles: BTreeMap<Key, Role>,
	role_bindings: BTreeMap<Key, RoleBinding>,
	cached: BTreeMap<String, CachedNamespace>,
	failures: HashMap<Operation, K8sError>,
	calls: Vec<Call>,
}

/// In-memory cluster for tests.
pub struct FakeCluster {
	state: Mutex<State>,
	lagging_cache: bool,
	latency: Option<Duration>,
	token_after_reads: usize,
	ready: Mutex<bool>,
}

impl Default for FakeCluster {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeCluster {
	/// A cluster whose cached view tracks the store immediately and whose
	/// token secrets are populated as soon as they are created.
	pub fn new() -> Self {
		Self {
			state: Mutex::new(State::default()),
			lagging_cache: false,
			latency: None,
			token_after_reads: 0,
			ready: Mutex::new(true),
		}
	}

	/// Stop mirroring store changes into the cached view until
	/// [`FakeCluster::sync_cache`] is called.
	pub fn with_lagging_cache(mut self) -> Self {
		self.lagging_cache = true;
		self
	}

	/// Sleep this long inside every gateway call.
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = Some(latency);
		self
	}

	/// Leave token secrets empty until they have been read `reads` times.
	pub fn with_token_after_reads(mut self, reads: usize) -> Self {
		self.token_after_reads = reads;
		self
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
	}

	/// Make every subsequent call of `operation` fail with `error`.
	pub fn fail(&self, operation: Operation, error: K8sError) {
		self.lock().failures.insert(operation, error);
	}

	pub fn clear_failures(&self) {
		self.lock().failures.clear();
	}

	/// Copy the store's namespaces into the cached view.
	pub fn sync_cache(&self) {
		let mut state = self.lock();
		let cached = state
			.namespaces
			.keys()
			.map(|name| {
				let view = if state.terminating.contains(name) {
					CachedNamespace::Terminating
				} else {
					CachedNamespace::Present
				};
				(name.clone(), view)
			})
			.collect();
		state.cached = cached;
	}

	/// Force the cached view's answer for `name`, regardless of the store.
	pub fn set_cached(&self, name: &str, view: CachedNamespace) {
		let mut state = self.lock();
		match view {
			CachedNamespace::Absent => {
				state.cached.remove(name);
			}
			view => {
				state.cached.insert(name.to_string(), view);
			}
		}
	}

	pub fn set_ready(&self, ready: bool) {
		*self.ready.lock().unwrap_or_else(|p| p.into_inner()) = ready;
	}

	/// Put an existing namespace into the finalizing state: it stays in the
	/// store and further deletes answer with a conflict.
	pub fn mark_terminating(&self, name: &str) {
		let mut state = self.lock();
		if state.namespaces.contains_key(name) {
			state.terminating.insert(name.to_string());
			if !self.lagging_cache {
				state
					.cached
					.insert(name.to_string(), CachedNamespace::Terminating);
			}
		}
	}

	/// Insert a namespace directly, bypassing call recording.
	pub fn seed_namespace(&self, namespace: Namespace) {
		let name = namespace.metadata.name.clone().unwrap_or_default();
		let mut state = self.lock();
		state.namespaces.insert(name.clone(), namespace);
		if !self.lagging_cache {
			state.cached.insert(name, CachedNamespace::Present);
		}
	}

	pub fn namespace_exists(&self, name: &str) -> bool {
		self.lock().namespaces.contains_key(name)
	}

	pub fn namespace(&self, name: &str) -> Option<Namespace> {
		self.lock().namespaces.get(name).cloned()
	}

	pub fn namespace_names(&self) -> Vec<String> {
		self.lock().namespaces.keys().cloned().collect()
	}

	pub fn service_account(&self, namespace: &str, name: &str) -> Option<ServiceAccount> {
		self.lock().service_accounts.get(&key(namespace, name)).cloned()
	}

	pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
		self.lock().secrets.get(&key(namespace, name)).cloned()
	}

	pub fn role(&self, namespace: &str, name: &str) -> Option<Role> {
		self.lock().roles.get(&key(namespace, name)).cloned()
	}

	pub fn role_binding(&self, namespace: &str, name: &str) -> Option<RoleBinding> {
		self.lock().role_bindings.get(&key(namespace, name)).cloned()
	}

	/// Every gateway call so far, in order.
	pub fn calls(&self) -> Vec<Call> {
		self.lock().calls.clone()
	}

	/// Calls of one kind, in order.
	pub fn calls_of(&self, operation: Operation) -> Vec<Call> {
		self
			.lock()
			.calls
			.iter()
			.filter(|c| c.operation == operation)
			.cloned()
			.collect()
	}

	/// The ordered list of operations issued so far.
	pub fn operations(&self) -> Vec<Operation> {
		self.lock().calls.iter().map(|c| c.operation).collect()
	}

	async fn enter(&self, operation: Operation, namespace: &str, name: &str) -> Result<(), K8sError> {
		if let Some(latency) = self.latency {
			tokio::time::sleep(latency).await;
		}
		let mut state = self.lock();
		state.calls.push(Call {
			operation,
			namespace: namespace.to_string(),
			name: name.to_string(),
		});
		match state.failures.get(&operation) {
			Some(err) => Err(err.clone()),
			None => Ok(()),
		}
	}
}

fn key(namespace: &str, name: &str) -> Key {
	(namespace.to_string(), name.to_string())
}

fn require_namespace(state: &State, namespace: &str) -> Result<(), K8sError> {
	if state.namespaces.contains_key(namespace) && !state.terminating.contains(namespace) {
		Ok(())
	} else {
		Err(K8sError::NamespaceNotFound {
			name: namespace.to_string(),
		})
	}
}

fn already_exists(kind: &str, name: &str) -> K8sError {
	K8sError::ApiError {
		message: format!("{kind} {name:?} already exists"),
	}
}

fn materialize_token(secret: &mut Secret, namespace: &str) {
	let data = secret.data.get_or_insert_with(BTreeMap::new);
	data.insert(
		"token".to_string(),
		ByteString(format!("token-for-{namespace}").into_bytes()),
	);
	data.insert("ca.crt".to_string(), ByteString(FAKE_CA_CRT.to_vec()));
	data.insert("namespace".to_string(), ByteString(namespace.as_bytes().to_vec()));
}

#[async_trait]
impl ClusterGateway for FakeCluster {
	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError> {
		let name = namespace.metadata.name.clone().unwrap_or_default();
		self
			.enter(Operation::CreateNamespace, &name, &name)
			.await?;
		let mut state = self.lock();
		if state.namespaces.contains_key(&name) {
			return Err(already_exists("namespace", &name));
		}
		state.namespaces.insert(name.clone(), namespace.clone());
		if !self.lagging_cache {
			state.cached.insert(name, CachedNamespace::Present);
		}
		Ok(namespace)
	}

	async fn delete_namespace(&self, name: &str) -> Result<(), K8sError> {
		self.enter(Operation::DeleteNamespace, name, name).await?;
		let mut state = self.lock();
		if !state.namespaces.contains_key(name) {
			return Err(K8sError::NamespaceNotFound { name: name.into() });
		}
		if state.terminating.contains(name) {
			return Err(K8sError::NamespaceTerminating { name: name.into() });
		}

		// Foreground propagation: dependents go with the namespace.
		state.namespaces.remove(name);
		state.service_accounts.retain(|(ns, _), _| ns != name);
		state.secrets.retain(|(ns, _), _| ns != name);
		state.secret_reads.retain(|(ns, _), _| ns != name);
		state.roles.retain(|(ns, _), _| ns != name);
		state.role_bindings.retain(|(ns, _), _| ns != name);
		if !self.lagging_cache {
			state.cached.remove(name);
		}
		Ok(())
	}

	async fn create_service_account(
		&self,
		namespace: &str,
		service_account: ServiceAccount,
	) -> Result<ServiceAccount, K8sError> {
		let name = service_account.metadata.name.clone().unwrap_or_default();
		self
			.enter(Operation::CreateServiceAccount, namespace, &name)
			.await?;
		let mut state = self.lock();
		require_namespace(&state, namespace)?;
		let k = key(namespace, &name);
		if state.service_accounts.contains_key(&k) {
			return Err(already_exists("serviceaccount", &name));
		}
		state.service_accounts.insert(k, service_account.clone());
		Ok(service_account)
	}

	async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, K8sError> {
		let name = secret.metadata.name.clone().unwrap_or_default();
		self
			.enter(Operation::CreateSecret, namespace, &name)
			.await?;
		let mut state = self.lock();
		require_namespace(&state, namespace)?;
		let k = key(namespace, &name);
		if state.secrets.contains_key(&k) {
			return Err(already_exists("secret", &name));
		}
		let mut stored = secret;
		if stored.type_.as_deref() == Some(SERVICE_ACCOUNT_TOKEN_TYPE) && self.token_after_reads == 0
		{
			materialize_token(&mut stored, namespace);
		}
		state.secrets.insert(k, stored.clone());
		Ok(stored)
	}

	async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sError> {
		self.enter(Operation::GetSecret, namespace, name).await?;
		let mut state = self.lock();
		let k = key(namespace, name);
		let reads = {
			let reads = state.secret_reads.entry(k.clone()).or_insert(0);
			*reads += 1;
			*reads
		};
		let token_after_reads = self.token_after_reads;
		let secret = state
			.secrets
			.get_mut(&k)
			.ok_or_else(|| K8sError::SecretNotFound {
				namespace: namespace.into(),
				name: name.into(),
			})?;
		if secret.type_.as_deref() == Some(SERVICE_ACCOUNT_TOKEN_TYPE)
			&& token_after_reads > 0
			&& reads >= token_after_reads
		{
			materialize_token(secret, namespace);
		}
		Ok(secret.clone())
	}

	async fn create_role(&self, namespace: &str, role: Role) -> Result<Role, K8sError> {
		let name = role.metadata.name.clone().unwrap_or_default();
		self.enter(Operation::CreateRole, namespace, &name).await?;
		let mut state = self.lock();
		require_namespace(&state, namespace)?;
		let k = key(namespace, &name);
		if state.roles.contains_key(&k) {
			return Err(already_exists("role", &name));
		}
		state.roles.insert(k, role.clone());
		Ok(role)
	}

	async fn create_role_binding(
		&self,
		namespace: &str,
		binding: RoleBinding,
	) -> Result<RoleBinding, K8sError> {
		let name = binding.metadata.name.clone().unwrap_or_default();
		self
			.enter(Operation::CreateRoleBinding, namespace, &name)
			.await?;
		let mut state = self.lock();
		require_namespace(&state, namespace)?;
		let k = key(namespace, &name);
		if state.role_bindings.contains_key(&k) {
			return Err(already_exists("rolebinding", &name));
		}
		state.role_bindings.insert(k, binding.clone());
		Ok(binding)
	}
}

impl NamespaceCache for FakeCluster {
	fn lookup(&self, name: &str) -> CachedNamespace {
		self
			.lock()
			.cached
			.get(name)
			.copied()
			.unwrap_or(CachedNamespace::Absent)
	}

	fn is_ready(&self) -> bool {
		*self.ready.lock().unwrap_or_else(|p| p.into_inner())
	}
}
