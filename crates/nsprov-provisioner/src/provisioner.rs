// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tenant namespace provisioning.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nsprov_k8s::{
	ClusterGateway, Namespace, ObjectMeta, RoleBinding, Secret, ServiceAccount, Subject,
	SERVICE_ACCOUNT_NAME_ANNOTATION, SERVICE_ACCOUNT_TOKEN_TYPE,
};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn, Span};

use crate::error::ProvisionerError;
use crate::expiry::ExpiryScheduler;
use crate::kubeconfig::build_kubeconfig;
use crate::role::BindingTarget;
use crate::types::{CreatedNamespace, NamespaceId};
use crate::with_deadline;

/// Name shared by the service account, token secret, role and role binding
/// in every tenant namespace.
pub const IDENTITY_NAME: &str = "np";

const POLL_INTERVAL_MS: u64 = 500;
const TOKEN_KEY: &str = "token";
const CA_KEY: &str = "ca.crt";

/// Everything the provisioner needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ProvisionerSettings {
	pub prefix: String,
	/// Stamped on every created resource; the cached view watches the same set.
	pub labels: BTreeMap<String, String>,
	pub ttl: Duration,
	pub binding: BindingTarget,
	/// API server URL written into issued kubeconfigs.
	pub server_url: String,
}

/// Creates tenant namespaces and hands them to the expiry scheduler.
pub struct Provisioner {
	gateway: Arc<dyn ClusterGateway>,
	scheduler: Arc<ExpiryScheduler>,
	settings: ProvisionerSettings,
}

impl Provisioner {
	pub fn new(
		gateway: Arc<dyn ClusterGateway>,
		scheduler: Arc<ExpiryScheduler>,
		settings: ProvisionerSettings,
	) -> Self {
		Self {
			gateway,
			scheduler,
			settings,
		}
	}

	pub fn settings(&self) -> &ProvisionerSettings {
		&self.settings
	}

	/// Create a namespace, its identity and binding, and return a kubeconfig
	/// for it.
	///
	/// The expiry is registered before anything is created, so a namespace
	/// left behind by a failed request is still deleted when its TTL runs out.
	/// Failed steps are not rolled back.
	#[instrument(skip_all, fields(namespace))]
	pub async fn create(&self, deadline: Instant) -> Result<CreatedNamespace, ProvisionerError> {
		let name = NamespaceId::new().as_k8s_name(&self.settings.prefix);
		Span::current().record("namespace", name.as_str());

		let expires_at = expiry_time(self.settings.ttl);
		self.scheduler.schedule(&name, self.settings.ttl);

		match self.create_resources(&name, deadline).await {
			Ok(kubeconfig) => {
				info!(expires_at = %expires_at, "namespace provisioned");
				Ok(CreatedNamespace {
					name,
					kubeconfig,
					expires_at,
				})
			}
			Err(e) => {
				warn!(error = %e, "provisioning failed, leaving cleanup to expiry");
				Err(e)
			}
		}
	}

	async fn create_resources(
		&self,
		name: &str,
		deadline: Instant,
	) -> Result<String, ProvisionerError> {
		let gateway = &self.gateway;

		with_deadline(deadline, gateway.create_namespace(self.namespace(name))).await?;
		debug!("namespace created");

		with_deadline(
			deadline,
			gateway.create_service_account(name, self.service_account()),
		)
		.await?;
		debug!("service account created");

		with_deadline(deadline, gateway.create_secret(name, self.token_secret())).await?;
		debug!("token secret created");

		if let Some(mut role) = self.settings.binding.role_for(name) {
			role.metadata
				.labels
				.get_or_insert_with(BTreeMap::new)
				.extend(self.settings.labels.clone());
			with_deadline(deadline, gateway.create_role(name, role)).await?;
			debug!("role created");
		}

		with_deadline(
			deadline,
			gateway.create_role_binding(name, self.role_binding(name)),
		)
		.await?;
		debug!("role binding created");

		let (token, ca_crt) = self.wait_for_token(name, deadline).await?;
		build_kubeconfig(&self.settings.server_url, name, &ca_crt, &token)
	}

	/// Read the token secret until the token controller has filled it in.
	async fn wait_for_token(
		&self,
		namespace: &str,
		deadline: Instant,
	) -> Result<(String, Vec<u8>), ProvisionerError> {
		let poll_interval = Duration::from_millis(POLL_INTERVAL_MS);

		loop {
			match with_deadline(deadline, self.gateway.get_secret(namespace, IDENTITY_NAME)).await {
				Ok(secret) => {
					if let Some(credentials) = token_credentials(&secret) {
						return Ok(credentials);
					}
				}
				// The secret's creation may not be visible to reads yet.
				Err(e) if e.is_not_found() => {}
				Err(e) => return Err(e.into()),
			}

			let now = Instant::now();
			if now >= deadline {
				return Err(ProvisionerError::TokenNotReady {
					namespace: namespace.to_string(),
				});
			}
			debug!("token not populated yet");
			tokio::time::sleep_until((now + poll_interval).min(deadline)).await;
		}
	}

	fn metadata(&self, name: &str) -> ObjectMeta {
		ObjectMeta {
			name: Some(name.to_string()),
			labels: Some(self.settings.labels.clone()),
			..Default::default()
		}
	}

	fn namespace(&self, name: &str) -> Namespace {
		Namespace {
			metadata: self.metadata(name),
			..Default::default()
		}
	}

	fn service_account(&self) -> ServiceAccount {
		ServiceAccount {
			metadata: self.metadata(IDENTITY_NAME),
			..Default::default()
		}
	}

	fn token_secret(&self) -> Secret {
		let mut metadata = self.metadata(IDENTITY_NAME);
		metadata.annotations = Some(BTreeMap::from([(
			SERVICE_ACCOUNT_NAME_ANNOTATION.to_string(),
			IDENTITY_NAME.to_string(),
		)]));
		Secret {
			metadata,
			type_: Some(SERVICE_ACCOUNT_TOKEN_TYPE.to_string()),
			..Default::default()
		}
	}

	fn role_binding(&self, namespace: &str) -> RoleBinding {
		RoleBinding {
			metadata: self.metadata(IDENTITY_NAME),
			role_ref: self.settings.binding.role_ref(),
			subjects: Some(vec![Subject {
				kind: "ServiceAccount".to_string(),
				name: IDENTITY_NAME.to_string(),
				namespace: Some(namespace.to_string()),
				..Default::default()
			}]),
		}
	}
}

fn token_credentials(secret: &Secret) -> Option<(String, Vec<u8>)> {
	let data = secret.data.as_ref()?;
	let token = data.get(TOKEN_KEY).filter(|t| !t.0.is_empty())?;
	let ca_crt = data.get(CA_KEY).filter(|c| !c.0.is_empty())?;
	let token = String::from_utf8(token.0.clone()).ok()?;
	Some((token, ca_crt.0.clone()))
}

fn expiry_time(ttl: Duration) -> DateTime<Utc> {
	chrono::Duration::from_std(ttl)
		.ok()
		.and_then(|ttl| Utc::now().checked_add_signed(ttl))
		.unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::deletion::DeletionCoordinator;
	use crate::expiry::ExpiryState;
	use crate::kubeconfig::Kubeconfig;
	use nsprov_k8s::fake::{FakeCluster, Operation};
	use nsprov_k8s::{K8sError, PolicyRule, Role};

	const TTL: Duration = Duration::from_secs(3600);

	struct Harness {
		cluster: Arc<FakeCluster>,
		scheduler: Arc<ExpiryScheduler>,
		provisioner: Provisioner,
	}

	fn harness_with(cluster: FakeCluster, binding: BindingTarget) -> Harness {
		let cluster = Arc::new(cluster);
		let deletion = Arc::new(DeletionCoordinator::new(cluster.clone(), cluster.clone()));
		let scheduler = Arc::new(ExpiryScheduler::new(deletion, Duration::from_secs(120)));
		let settings = ProvisionerSettings {
			prefix: "np".to_string(),
			labels: BTreeMap::from([(
				"controller.observatorium.io".to_string(),
				"namespace-selector".to_string(),
			)]),
			ttl: TTL,
			binding,
			server_url: "https://api.example.com:6443".to_string(),
		};
		let provisioner = Provisioner::new(cluster.clone(), scheduler.clone(), settings);
		Harness {
			cluster,
			scheduler,
			provisioner,
		}
	}

	fn harness(cluster: FakeCluster) -> Harness {
		harness_with(cluster, BindingTarget::ClusterRole("edit".to_string()))
	}

	fn deadline() -> Instant {
		Instant::now() + Duration::from_secs(30)
	}

	fn template_role() -> Role {
		Role {
			metadata: ObjectMeta {
				name: Some(IDENTITY_NAME.to_string()),
				..Default::default()
			},
			rules: Some(vec![PolicyRule {
				api_groups: Some(vec![String::new()]),
				resources: Some(vec!["pods".to_string()]),
				verbs: vec!["get".to_string()],
				..Default::default()
			}]),
		}
	}

	#[tokio::test]
	async fn creates_resources_in_dependency_order() {
		let h = harness(FakeCluster::new());

		h.provisioner.create(deadline()).await.unwrap();

		assert_eq!(
			h.cluster.operations(),
			vec![
				Operation::CreateNamespace,
				Operation::CreateServiceAccount,
				Operation::CreateSecret,
				Operation::CreateRoleBinding,
				Operation::GetSecret,
			]
		);
	}

	#[tokio::test]
	async fn stamps_labels_and_fixed_identity() {
		let h = harness(FakeCluster::new());

		let created = h.provisioner.create(deadline()).await.unwrap();

		assert!(created.name.starts_with("np-"));
		let namespace = h.cluster.namespace(&created.name).unwrap();
		let labels = namespace.metadata.labels.unwrap();
		assert_eq!(labels["controller.observatorium.io"], "namespace-selector");

		assert!(h.cluster.service_account(&created.name, "np").is_some());
		let secret = h.cluster.secret(&created.name, "np").unwrap();
		assert_eq!(secret.type_.as_deref(), Some(SERVICE_ACCOUNT_TOKEN_TYPE));
		assert_eq!(
			secret.metadata.annotations.unwrap()[SERVICE_ACCOUNT_NAME_ANNOTATION],
			"np"
		);

		let binding = h.cluster.role_binding(&created.name, "np").unwrap();
		assert_eq!(binding.role_ref.kind, "ClusterRole");
		assert_eq!(binding.role_ref.name, "edit");
		let subject = &binding.subjects.unwrap()[0];
		assert_eq!(subject.kind, "ServiceAccount");
		assert_eq!(subject.name, "np");
		assert_eq!(subject.namespace.as_deref(), Some(created.name.as_str()));
	}

	#[tokio::test]
	async fn kubeconfig_targets_the_new_namespace() {
		let h = harness(FakeCluster::new());

		let created = h.provisioner.create(deadline()).await.unwrap();

		let kubeconfig: Kubeconfig = serde_yaml::from_str(&created.kubeconfig).unwrap();
		assert_eq!(kubeconfig.current_namespace(), Some(created.name.as_str()));
		assert_eq!(
			kubeconfig.users[0].user.token,
			format!("token-for-{}", created.name)
		);
		assert_eq!(
			kubeconfig.clusters[0].cluster.server,
			"https://api.example.com:6443"
		);
	}

	#[tokio::test]
	async fn registers_expiry() {
		let h = harness(FakeCluster::new());

		let created = h.provisioner.create(deadline()).await.unwrap();

		assert_eq!(
			h.scheduler.state(&created.name),
			Some(ExpiryState::Scheduled)
		);
		assert!(created.expires_at > Utc::now());
	}

	#[tokio::test]
	async fn role_template_is_created_before_binding() {
		let h = harness_with(FakeCluster::new(), BindingTarget::Role(template_role()));

		let created = h.provisioner.create(deadline()).await.unwrap();

		assert_eq!(
			h.cluster.operations(),
			vec![
				Operation::CreateNamespace,
				Operation::CreateServiceAccount,
				Operation::CreateSecret,
				Operation::CreateRole,
				Operation::CreateRoleBinding,
				Operation::GetSecret,
			]
		);
		let role = h.cluster.role(&created.name, "np").unwrap();
		assert_eq!(role.metadata.namespace.as_deref(), Some(created.name.as_str()));
		let labels = role.metadata.labels.unwrap();
		assert_eq!(labels["controller.observatorium.io"], "namespace-selector");
		let binding = h.cluster.role_binding(&created.name, "np").unwrap();
		assert_eq!(binding.role_ref.kind, "Role");
		assert_eq!(binding.role_ref.name, "np");
	}

	#[tokio::test]
	async fn role_keeps_template_labels_alongside_managed_ones() {
		let mut template = template_role();
		template.metadata.labels = Some(BTreeMap::from([(
			"team".to_string(),
			"platform".to_string(),
		)]));
		let h = harness_with(FakeCluster::new(), BindingTarget::Role(template));

		let created = h.provisioner.create(deadline()).await.unwrap();

		let role = h.cluster.role(&created.name, "np").unwrap();
		let labels = role.metadata.labels.unwrap();
		assert_eq!(labels["team"], "platform");
		assert_eq!(labels["controller.observatorium.io"], "namespace-selector");
	}

	#[tokio::test]
	async fn failure_stops_before_the_next_step() {
		let steps = [
			Operation::CreateNamespace,
			Operation::CreateServiceAccount,
			Operation::CreateSecret,
			Operation::CreateRole,
			Operation::CreateRoleBinding,
			Operation::GetSecret,
		];

		for (k, failing) in steps.iter().enumerate() {
			let h = harness_with(FakeCluster::new(), BindingTarget::Role(template_role()));
			h.cluster.fail(
				*failing,
				K8sError::ApiError {
					message: "injected".to_string(),
				},
			);

			let err = h.provisioner.create(deadline()).await.unwrap_err();

			assert!(matches!(err, ProvisionerError::K8sError(_)));
			assert_eq!(h.cluster.operations(), steps[..=k].to_vec(), "failing at {failing:?}");
		}
	}

	#[tokio::test]
	async fn no_binding_without_service_account() {
		let h = harness(FakeCluster::new());
		h.cluster.fail(
			Operation::CreateServiceAccount,
			K8sError::ApiError {
				message: "forbidden".to_string(),
			},
		);

		h.provisioner.create(deadline()).await.unwrap_err();

		let name = h.cluster.calls_of(Operation::CreateNamespace)[0].name.clone();
		assert!(h.cluster.role_binding(&name, "np").is_none());
		assert!(h.cluster.namespace_exists(&name));
	}

	#[tokio::test]
	async fn failed_request_still_expires() {
		let h = harness(FakeCluster::new());
		h.cluster.fail(
			Operation::CreateRoleBinding,
			K8sError::ApiError {
				message: "injected".to_string(),
			},
		);

		h.provisioner.create(deadline()).await.unwrap_err();

		let name = h.cluster.calls_of(Operation::CreateNamespace)[0].name.clone();
		assert_eq!(h.scheduler.state(&name), Some(ExpiryState::Scheduled));
	}

	#[tokio::test(start_paused = true)]
	async fn polls_until_token_is_issued() {
		let h = harness(FakeCluster::new().with_token_after_reads(3));

		let started = Instant::now();
		h.provisioner.create(deadline()).await.unwrap();

		assert_eq!(h.cluster.calls_of(Operation::GetSecret).len(), 3);
		assert_eq!(started.elapsed(), Duration::from_millis(2 * POLL_INTERVAL_MS));
	}

	#[tokio::test(start_paused = true)]
	async fn token_never_issued_times_out() {
		let h = harness(FakeCluster::new().with_token_after_reads(usize::MAX));

		let err = h
			.provisioner
			.create(Instant::now() + Duration::from_secs(2))
			.await
			.unwrap_err();

		assert!(matches!(err, ProvisionerError::TokenNotReady { .. }));
	}

	#[tokio::test(start_paused = true)]
	async fn slow_control_plane_hits_the_deadline() {
		let h = harness(FakeCluster::new().with_latency(Duration::from_secs(10)));

		let err = h
			.provisioner
			.create(Instant::now() + Duration::from_secs(15))
			.await
			.unwrap_err();

		// The service account call was abandoned before it reached the cluster.
		assert!(matches!(err, ProvisionerError::K8sError(K8sError::Timeout)));
		assert_eq!(h.cluster.operations(), vec![Operation::CreateNamespace]);
	}

	#[tokio::test]
	async fn concurrent_creates_get_distinct_names() {
		let h = harness(FakeCluster::new());

		let (a, b) = tokio::join!(
			h.provisioner.create(deadline()),
			h.provisioner.create(deadline()),
		);

		assert_ne!(a.unwrap().name, b.unwrap().name);
		assert_eq!(h.cluster.namespace_names().len(), 2);
	}
}
