// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
	body::{to_bytes, Body},
	http::{Request, Response},
	Router,
};
use nsprov_config::Secret;
use nsprov_k8s::fake::FakeCluster;
use nsprov_provisioner::{BindingTarget, ProvisionerSettings};
use nsprov_server::{create_app_state, create_internal_router, create_router, AppState, StateOptions};

pub struct TestApp {
	pub router: Router,
	pub internal: Router,
	pub cluster: Arc<FakeCluster>,
	pub state: AppState,
}

pub fn setup_test_app(token: Option<&str>) -> TestApp {
	setup_with_cluster(FakeCluster::new(), token)
}

pub fn setup_with_cluster(cluster: FakeCluster, token: Option<&str>) -> TestApp {
	setup_with_timeout(cluster, token, Duration::from_secs(30))
}

pub fn setup_with_timeout(
	cluster: FakeCluster,
	token: Option<&str>,
	request_timeout: Duration,
) -> TestApp {
	let cluster = Arc::new(cluster);
	let settings = ProvisionerSettings {
		prefix: "np".to_string(),
		labels: BTreeMap::from([(
			"controller.observatorium.io".to_string(),
			"namespace-selector".to_string(),
		)]),
		ttl: Duration::from_secs(3600),
		binding: BindingTarget::ClusterRole("edit".to_string()),
		server_url: "https://api.example.com:6443".to_string(),
	};
	let state = create_app_state(
		cluster.clone(),
		cluster.clone(),
		settings,
		StateOptions {
			request_timeout,
			expiry_delete_timeout: Duration::from_secs(120),
			auth_token: token.map(|t| Secret::new(t.to_string())),
		},
	)
	.unwrap();

	TestApp {
		router: create_router(state.clone()),
		internal: create_internal_router(state.clone()),
		cluster,
		state,
	}
}

pub fn post_namespace(authorization: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder().method("POST").uri("/api/v1/namespace");
	if let Some(value) = authorization {
		builder = builder.header("authorization", value);
	}
	builder.body(Body::empty()).unwrap()
}

pub fn delete_namespace(name: &str, authorization: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("DELETE")
		.uri(format!("/api/v1/namespace/{name}"));
	if let Some(value) = authorization {
		builder = builder.header("authorization", value);
	}
	builder.body(Body::empty()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
	let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
	String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
	serde_json::from_str(&body_string(response).await).unwrap()
}
