// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared bearer token gate for the namespace API.
//!
//! Installed only when a token is configured. Requests must carry
//! `Authorization: Bearer <token>`; anything else is rejected with 401 before
//! the handler runs. Token values are never logged.

use axum::{
	body::Body,
	extract::State,
	http::{header::AUTHORIZATION, HeaderMap, Request},
	middleware::Next,
	response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument};

use crate::{api::AppState, error::ServerError};

#[instrument(name = "auth_layer", skip_all, fields(method = %request.method(), path = %request.uri().path()))]
pub async fn require_bearer_token(
	State(state): State<AppState>,
	request: Request<Body>,
	next: Next,
) -> Response {
	let Some(expected) = state.auth_token.as_ref() else {
		return next.run(request).await;
	};

	let rejection = match extract_bearer_token(request.headers()) {
		Some(token) if token_matches(token, expected.expose()) => None,
		Some(_) => Some("invalid bearer token"),
		None => Some("missing bearer token"),
	};

	match rejection {
		None => next.run(request).await,
		Some(reason) => {
			debug!(reason, "request rejected");
			ServerError::Unauthorized(reason.to_string()).into_response()
		}
	}
}

/// The header must be exactly two space-separated parts, `Bearer <token>`.
/// The scheme is case-insensitive.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
	let parts: Vec<&str> = value.split(' ').collect();
	match parts.as_slice() {
		[scheme, token] if scheme.eq_ignore_ascii_case("bearer") => Some(token),
		_ => None,
	}
}

fn token_matches(given: &str, expected: &str) -> bool {
	given.as_bytes().ct_eq(expected.as_bytes()).into()
}
