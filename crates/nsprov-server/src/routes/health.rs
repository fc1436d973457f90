// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Internal metrics and health handlers.

use axum::{
	extract::State,
	http::{header, StatusCode},
	response::IntoResponse,
};

use crate::{api::AppState, error::ServerError};

/// GET /metrics - Prometheus text exposition.
pub async fn prometheus_metrics(
	State(state): State<AppState>,
) -> Result<impl IntoResponse, ServerError> {
	state
		.metrics
		.set_scheduled_expiries(state.scheduler.pending());
	let body = state
		.metrics
		.encode()
		.map_err(|e| ServerError::Internal(format!("failed to encode metrics: {e}")))?;

	Ok((
		[(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
		body,
	))
}

/// GET /healthz - The process is serving.
pub async fn liveness() -> impl IntoResponse {
	(StatusCode::OK, "ok")
}

/// GET /readyz - The namespace cache has completed its initial sync.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
	if state.cache.is_ready() {
		(StatusCode::OK, "ok")
	} else {
		(StatusCode::SERVICE_UNAVAILABLE, "namespace cache not synced")
	}
}
