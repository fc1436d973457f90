// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Prometheus metrics for namespace provisioning.

use prometheus::{
	histogram_opts, Encoder, HistogramTimer, HistogramVec, IntGauge, Registry, TextEncoder,
};

/// API entry points whose duration is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Create,
	Delete,
}

impl Action {
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Create => "create",
			Action::Delete => "delete",
		}
	}
}

/// Metrics owned by the server, exported on the internal listener.
pub struct ProvisionerMetrics {
	registry: Registry,
	/// Histogram with labels: duration of each API action
	action_duration_seconds: HistogramVec,
	/// Gauge: expiry timers that have not fired yet
	scheduled_expiries: IntGauge,
}

impl ProvisionerMetrics {
	/// # Errors
	/// Returns an error if metric registration fails.
	pub fn new() -> Result<Self, prometheus::Error> {
		let registry = Registry::new();

		let action_duration_seconds = HistogramVec::new(
			histogram_opts!(
				"namespace_provisioner_action_duration_seconds",
				"Duration of namespace provisioner API actions in seconds",
				vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
			),
			&["action"],
		)?;
		registry.register(Box::new(action_duration_seconds.clone()))?;

		let scheduled_expiries = IntGauge::new(
			"namespace_provisioner_scheduled_expiries",
			"Namespaces waiting for their TTL to expire",
		)?;
		registry.register(Box::new(scheduled_expiries.clone()))?;

		#[cfg(target_os = "linux")]
		registry.register(Box::new(
			prometheus::process_collector::ProcessCollector::for_self(),
		))?;

		Ok(Self {
			registry,
			action_duration_seconds,
			scheduled_expiries,
		})
	}

	/// Observes the elapsed time for `action` when the timer is dropped.
	pub fn start_timer(&self, action: Action) -> HistogramTimer {
		self.action_duration_seconds
			.with_label_values(&[action.as_str()])
			.start_timer()
	}

	pub fn set_scheduled_expiries(&self, count: usize) {
		self.scheduled_expiries.set(count as i64);
	}

	/// Render every metric in the text exposition format.
	pub fn encode(&self) -> Result<String, prometheus::Error> {
		let encoder = TextEncoder::new();
		let mut buffer = Vec::new();
		encoder.encode(&self.registry.gather(), &mut buffer)?;
		String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn records_action_durations() {
		let metrics = ProvisionerMetrics::new().unwrap();
		drop(metrics.start_timer(Action::Create));
		drop(metrics.start_timer(Action::Delete));
		drop(metrics.start_timer(Action::Delete));

		let output = metrics.encode().unwrap();
		assert!(output.contains(
			"namespace_provisioner_action_duration_seconds_count{action=\"create\"} 1"
		));
		assert!(output.contains(
			"namespace_provisioner_action_duration_seconds_count{action=\"delete\"} 2"
		));
	}

	#[test]
	fn exports_scheduled_expiries() {
		let metrics = ProvisionerMetrics::new().unwrap();
		metrics.set_scheduled_expiries(3);
		assert!(metrics
			.encode()
			.unwrap()
			.contains("namespace_provisioner_scheduled_expiries 3"));
	}

	#[cfg(target_os = "linux")]
	#[test]
	fn exports_process_metrics() {
		let output = ProvisionerMetrics::new().unwrap().encode().unwrap();
		assert!(output.contains("process_open_fds"));
		assert!(output.contains("process_resident_memory_bytes"));
	}

	#[test]
	fn registries_are_independent() {
		assert!(ProvisionerMetrics::new().is_ok());
		assert!(ProvisionerMetrics::new().is_ok());
	}
}
