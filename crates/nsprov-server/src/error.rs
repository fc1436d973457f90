// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use nsprov_provisioner::ProvisionerError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Missing or wrong bearer token.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	/// Internal server error.
	#[error("Internal error: {0}")]
	Internal(String),

	/// Provisioning or deletion failed.
	#[error("Provisioner error: {0}")]
	Provisioner(#[from] ProvisionerError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	fn new(error: &str, message: impl Into<String>) -> Self {
		Self {
			error: error.to_string(),
			message: message.into(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::Unauthorized(message) => (
				StatusCode::UNAUTHORIZED,
				ErrorResponse::new("unauthorized", message.clone()),
			),
			ServerError::Provisioner(e) if e.is_client_error() => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::new("bad_request", e.to_string()),
			),
			ServerError::Internal(message) => {
				tracing::error!(error = %message, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
			ServerError::Provisioner(e) => {
				tracing::error!(error = %e, "provisioner error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("internal_error", "An internal error occurred"),
				)
			}
		};

		(status, Json(body)).into_response()
	}
}
