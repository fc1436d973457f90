// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and routers.

use std::sync::Arc;
use std::time::Duration;

use axum::{
	middleware,
	routing::{delete, get, post},
	Router,
};
use nsprov_config::SecretString;
use nsprov_k8s::{ClusterGateway, NamespaceCache};
use nsprov_provisioner::{DeletionCoordinator, ExpiryScheduler, Provisioner, ProvisionerSettings};
use tower_http::trace::TraceLayer;

use crate::{auth_middleware::require_bearer_token, metrics::ProvisionerMetrics, routes};

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
	pub provisioner: Arc<Provisioner>,
	pub deletion: Arc<DeletionCoordinator>,
	pub scheduler: Arc<ExpiryScheduler>,
	pub cache: Arc<dyn NamespaceCache>,
	pub metrics: Arc<ProvisionerMetrics>,
	/// `None` disables the bearer token gate.
	pub auth_token: Option<SecretString>,
	pub request_timeout: Duration,
}

/// Server options that are not part of [`ProvisionerSettings`].
#[derive(Debug, Clone)]
pub struct StateOptions {
	pub request_timeout: Duration,
	pub expiry_delete_timeout: Duration,
	pub auth_token: Option<SecretString>,
}

/// Wire the deletion coordinator, expiry scheduler and provisioner together.
pub fn create_app_state(
	gateway: Arc<dyn ClusterGateway>,
	cache: Arc<dyn NamespaceCache>,
	settings: ProvisionerSettings,
	options: StateOptions,
) -> Result<AppState, prometheus::Error> {
	let deletion = Arc::new(DeletionCoordinator::new(
		Arc::clone(&gateway),
		Arc::clone(&cache),
	));
	let scheduler = Arc::new(ExpiryScheduler::new(
		Arc::clone(&deletion),
		options.expiry_delete_timeout,
	));
	let provisioner = Arc::new(Provisioner::new(gateway, Arc::clone(&scheduler), settings));

	Ok(AppState {
		provisioner,
		deletion,
		scheduler,
		cache,
		metrics: Arc::new(ProvisionerMetrics::new()?),
		auth_token: options.auth_token,
		request_timeout: options.request_timeout,
	})
}

/// The namespace API, gated by the bearer token when one is configured.
pub fn create_router(state: AppState) -> Router {
	let mut api = Router::new()
		.route("/api/v1/namespace", post(routes::namespace::create_namespace))
		.route(
			"/api/v1/namespace/",
			delete(routes::namespace::delete_namespace_without_name),
		)
		.route(
			"/api/v1/namespace/{name}",
			delete(routes::namespace::delete_namespace),
		);

	if state.auth_token.is_some() {
		api = api.route_layer(middleware::from_fn_with_state(
			state.clone(),
			require_bearer_token,
		));
	}

	api.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Metrics and health endpoints for the internal listener.
pub fn create_internal_router(state: AppState) -> Router {
	Router::new()
		.route("/metrics", get(routes::health::prometheus_metrics))
		.route("/healthz", get(routes::health::liveness))
		.route("/readyz", get(routes::health::readiness))
		.with_state(state)
}
