// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tenant namespace provisioner server.
//!
//! This crate provides the HTTP API for creating and deleting tenant
//! namespaces, the bearer token gate in front of it, and the internal
//! metrics and health endpoints.

pub mod api;
pub mod auth_middleware;
pub mod error;
pub mod metrics;
pub mod routes;

pub use api::{create_app_state, create_internal_router, create_router, AppState, StateOptions};
pub use error::ServerError;
pub use metrics::{Action, ProvisionerMetrics};
