// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use async_trait::async_trait;
use kube::{
	api::{Api, DeleteParams, PostParams},
	config::{KubeConfigOptions, Kubeconfig},
	Client, Config,
};
use tracing::{debug, instrument};

use crate::client::ClusterGateway;
use crate::error::K8sError;
use crate::types::{Namespace, Role, RoleBinding, Secret, ServiceAccount};

/// Where to find cluster credentials.
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
	/// Explicit kubeconfig path. When unset the configuration is inferred.
	pub kubeconfig: Option<PathBuf>,
	/// API server URL overriding whatever the kubeconfig says.
	pub master: Option<String>,
}

/// An established client plus the API server URL it talks to.
#[derive(Clone)]
pub struct ClusterConnection {
	pub client: Client,
	/// API server URL without a trailing slash, suitable for a kubeconfig.
	pub cluster_url: String,
}

/// Build a kube client from the given options.
///
/// Without an explicit kubeconfig this will attempt to load config from:
/// 1. In-cluster service account (when running in K8s)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn connect(opts: &ConnectOptions) -> Result<ClusterConnection, K8sError> {
	let mut config = match &opts.kubeconfig {
		Some(path) => {
			let kubeconfig = Kubeconfig::read_from(path).map_err(|e| K8sError::Config {
				message: format!("failed to read kubeconfig {}: {e}", path.display()),
			})?;
			Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
				.await
				.map_err(|e| K8sError::Config {
					message: e.to_string(),
				})?
		}
		None => Config::infer().await.map_err(|e| K8sError::Config {
			message: e.to_string(),
		})?,
	};

	if let Some(master) = &opts.master {
		config.cluster_url = master.parse::<http::Uri>().map_err(|e| K8sError::Config {
			message: format!("invalid master URL {master:?}: {e}"),
		})?;
	}

	let cluster_url = config.cluster_url.to_string().trim_end_matches('/').to_string();
	let client = Client::try_from(config)?;
	debug!(cluster_url = %cluster_url, "K8s client initialized");

	Ok(ClusterConnection {
		client,
		cluster_url,
	})
}

/// Production gateway implementation using the kube crate.
pub struct KubeGateway {
	client: Client,
}

impl KubeGateway {
	pub fn new(client: Client) -> Self {
		Self { client }
	}
}

#[async_trait]
impl ClusterGateway for KubeGateway {
	#[instrument(skip(self, namespace), fields(namespace = ?namespace.metadata.name))]
	async fn create_namespace(&self, namespace: Namespace) -> Result<Namespace, K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		let namespace = namespaces.create(&PostParams::default(), &namespace).await?;
		Ok(namespace)
	}

	#[instrument(skip(self))]
	async fn delete_namespace(&self, name: &str) -> Result<(), K8sError> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		match namespaces.delete(name, &DeleteParams::foreground()).await {
			Ok(_) => Ok(()),
			Err(kube::Error::Api(err)) if err.code == 404 => {
				Err(K8sError::NamespaceNotFound { name: name.into() })
			}
			// The API server answers 409 while a namespace is already being finalized.
			Err(kube::Error::Api(err)) if err.code == 409 => {
				Err(K8sError::NamespaceTerminating { name: name.into() })
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn create_service_account(
		&self,
		namespace: &str,
		service_account: ServiceAccount,
	) -> Result<ServiceAccount, K8sError> {
		let accounts: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
		let account = accounts
			.create(&PostParams::default(), &service_account)
			.await?;
		Ok(account)
	}

	async fn create_secret(&self, namespace: &str, secret: Secret) -> Result<Secret, K8sError> {
		let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
		let secret = secrets.create(&PostParams::default(), &secret).await?;
		Ok(secret)
	}

	async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, K8sError> {
		let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
		match secrets.get(name).await {
			Ok(secret) => Ok(secret),
			Err(kube::Error::Api(err)) if err.code == 404 => Err(K8sError::SecretNotFound {
				namespace: namespace.into(),
				name: name.into(),
			}),
			Err(e) => Err(e.into()),
		}
	}

	async fn create_role(&self, namespace: &str, role: Role) -> Result<Role, K8sError> {
		let roles: Api<Role> = Api::namespaced(self.client.clone(), namespace);
		let role = roles.create(&PostParams::default(), &role).await?;
		Ok(role)
	}

	async fn create_role_binding(
		&self,
		namespace: &str,
		binding: RoleBinding,
	) -> Result<RoleBinding, K8sError> {
		let bindings: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
		let binding = bindings.create(&PostParams::default(), &binding).await?;
		Ok(binding)
	}
}
