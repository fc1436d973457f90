// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tenant namespace provisioner binary.

use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use nsprov_config::{
	load_config, ClusterConfigLayer, HttpConfigLayer, LogLevel, LoggingConfigLayer,
	ProvisionerConfigLayer, ServerConfigLayer,
};
use nsprov_k8s::{connect, ConnectOptions, KubeGateway, ReflectorCache};
use nsprov_provisioner::{BindingTarget, ProvisionerSettings};
use nsprov_server::{create_app_state, create_internal_router, create_router, StateOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Provisions short-lived tenant namespaces with scoped credentials.
///
/// Flags override the config file and `NSPROV_*` environment variables. The
/// bearer token is read from `NSPROV_AUTH_TOKEN` or `NSPROV_AUTH_TOKEN_FILE`.
#[derive(Parser, Debug)]
#[command(name = "nsprov-server", about = "Tenant namespace provisioner", version)]
struct Args {
	/// Path to the TOML config file (default: /etc/nsprov/server.toml)
	#[arg(long, env = "NSPROV_CONFIG")]
	config: Option<PathBuf>,

	/// Address for the namespace API
	#[arg(long)]
	listen: Option<String>,

	/// Address for metrics and health endpoints
	#[arg(long)]
	listen_internal: Option<String>,

	/// Per-request deadline, e.g. "30s"
	#[arg(long)]
	request_timeout: Option<String>,

	/// Kubeconfig path; inferred when unset
	#[arg(long)]
	kubeconfig: Option<PathBuf>,

	/// API server URL, overriding the kubeconfig
	#[arg(long)]
	master: Option<String>,

	/// Log level: all, debug, info, warn, error, none
	#[arg(long)]
	log_level: Option<String>,

	/// Prefix for generated namespace names
	#[arg(long)]
	prefix: Option<String>,

	/// Label selector scoping the namespace cache, stamped on created resources
	#[arg(long)]
	selector: Option<String>,

	/// Lifetime of a tenant namespace, e.g. "1h"
	#[arg(long)]
	ttl: Option<String>,

	/// Cluster role bound to each tenant identity
	#[arg(long)]
	cluster_role: Option<String>,

	/// Role template created in each tenant namespace instead of a cluster role
	#[arg(long)]
	role_file: Option<PathBuf>,

	/// Deadline for deletes triggered by TTL expiry, e.g. "2m"
	#[arg(long)]
	expiry_delete_timeout: Option<String>,
}

impl Args {
	fn overrides(&self) -> ServerConfigLayer {
		ServerConfigLayer {
			http: Some(HttpConfigLayer {
				listen: self.listen.clone(),
				listen_internal: self.listen_internal.clone(),
				request_timeout: self.request_timeout.clone(),
			}),
			cluster: Some(ClusterConfigLayer {
				kubeconfig: self.kubeconfig.clone(),
				master: self.master.clone(),
			}),
			logging: Some(LoggingConfigLayer {
				level: self.log_level.clone(),
			}),
			provisioner: Some(ProvisionerConfigLayer {
				prefix: self.prefix.clone(),
				selector: self.selector.clone(),
				ttl: self.ttl.clone(),
				cluster_role: self.cluster_role.clone(),
				role_file: self.role_file.clone(),
				expiry_delete_timeout: self.expiry_delete_timeout.clone(),
			}),
			auth: None,
		}
	}
}

fn init_tracing(level: LogLevel) {
	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter())),
		)
		.with(
			tracing_subscriber::fmt::layer()
				.json()
				.with_writer(std::io::stderr),
		)
		.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let config =
		load_config(args.config.clone(), args.overrides()).context("failed to load configuration")?;
	init_tracing(config.logging.level);

	tracing::info!(
		listen = %config.http.listen,
		listen_internal = %config.http.listen_internal,
		prefix = %config.provisioner.prefix,
		selector = %config.provisioner.selector,
		ttl = %humantime::format_duration(config.provisioner.ttl),
		auth_enabled = config.auth.token.is_some(),
		"starting nsprov-server"
	);

	let binding = BindingTarget::from_config(
		config.provisioner.cluster_role.as_deref(),
		config.provisioner.role_file.as_deref(),
	)
	.context("failed to load role binding target")?;

	let connection = connect(&ConnectOptions {
		kubeconfig: config.cluster.kubeconfig.clone(),
		master: config.cluster.master.clone(),
	})
	.await
	.context("failed to build Kubernetes client")?;

	let (cache, watcher) =
		ReflectorCache::spawn(connection.client.clone(), &config.provisioner.selector);
	cache
		.wait_until_ready()
		.await
		.context("namespace cache failed to sync")?;

	let settings = ProvisionerSettings {
		prefix: config.provisioner.prefix.clone(),
		labels: config.provisioner.labels.clone(),
		ttl: config.provisioner.ttl,
		binding,
		server_url: connection.cluster_url.clone(),
	};
	let state = create_app_state(
		Arc::new(KubeGateway::new(connection.client.clone())),
		Arc::new(cache),
		settings,
		StateOptions {
			request_timeout: config.http.request_timeout,
			expiry_delete_timeout: config.provisioner.expiry_delete_timeout,
			auth_token: config.auth.token.clone(),
		},
	)
	.context("failed to register metrics")?;

	let api = create_router(state.clone());
	let internal = create_internal_router(state.clone());

	let api_listener = tokio::net::TcpListener::bind(config.http.listen)
		.await
		.with_context(|| format!("failed to bind {}", config.http.listen))?;
	let internal_listener = tokio::net::TcpListener::bind(config.http.listen_internal)
		.await
		.with_context(|| format!("failed to bind {}", config.http.listen_internal))?;
	tracing::info!(
		listen = %config.http.listen,
		listen_internal = %config.http.listen_internal,
		"listening"
	);

	let shutdown = CancellationToken::new();
	tokio::spawn({
		let shutdown = shutdown.clone();
		async move {
			shutdown_signal().await;
			tracing::info!("Received shutdown signal");
			shutdown.cancel();
		}
	});

	let api_server = axum::serve(api_listener, api)
		.with_graceful_shutdown(shutdown.clone().cancelled_owned())
		.into_future();
	let internal_server = axum::serve(internal_listener, internal)
		.with_graceful_shutdown(shutdown.clone().cancelled_owned())
		.into_future();

	let (api_result, internal_result) = tokio::join!(api_server, internal_server);
	if let Err(e) = api_result {
		tracing::error!(error = %e, "API server error");
	}
	if let Err(e) = internal_result {
		tracing::error!(error = %e, "Internal server error");
	}

	tracing::info!("Shutting down expiry scheduler...");
	state.scheduler.shutdown().await;
	watcher.abort();

	tracing::info!("Server shutdown complete");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}
