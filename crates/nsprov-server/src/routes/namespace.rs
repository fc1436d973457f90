// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tenant namespace HTTP handlers.

use axum::{
	extract::{Path, State},
	http::{header, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use nsprov_provisioner::deadline_after;
use serde::Serialize;

use crate::{api::AppState, error::ServerError, metrics::Action};

#[derive(Debug, Serialize)]
pub struct DeleteNamespaceResponse {
	pub namespace: String,
	pub outcome: &'static str,
}

/// POST /api/v1/namespace - Provision a namespace and return its kubeconfig.
pub async fn create_namespace(State(state): State<AppState>) -> Result<Response, ServerError> {
	let _timer = state.metrics.start_timer(Action::Create);
	let deadline = deadline_after(state.request_timeout);

	let created = state.provisioner.create(deadline).await?;
	state
		.metrics
		.set_scheduled_expiries(state.scheduler.pending());

	tracing::info!(namespace = %created.name, expires_at = %created.expires_at, "Namespace created");
	Ok((
		StatusCode::CREATED,
		[(header::CONTENT_TYPE, "application/yaml")],
		created.kubeconfig,
	)
		.into_response())
}

/// DELETE /api/v1/namespace/{name} - Delete a namespace. Deleting a namespace
/// that is already gone succeeds.
pub async fn delete_namespace(
	State(state): State<AppState>,
	Path(name): Path<String>,
) -> Result<Json<DeleteNamespaceResponse>, ServerError> {
	delete(state, name).await
}

/// DELETE /api/v1/namespace/ - Rejected, a name is required.
pub async fn delete_namespace_without_name(
	State(state): State<AppState>,
) -> Result<Json<DeleteNamespaceResponse>, ServerError> {
	delete(state, String::new()).await
}

async fn delete(
	state: AppState,
	name: String,
) -> Result<Json<DeleteNamespaceResponse>, ServerError> {
	let _timer = state.metrics.start_timer(Action::Delete);
	let deadline = deadline_after(state.request_timeout);

	let outcome = state.deletion.delete(&name, deadline).await?;

	Ok(Json(DeleteNamespaceResponse {
		namespace: name,
		outcome: outcome.as_str(),
	}))
}
