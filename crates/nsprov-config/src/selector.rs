// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Equality label selectors.
//!
//! The same selector scopes the namespace watch and is stamped as labels on
//! every created resource, so only `key=value` terms are accepted.

use std::collections::BTreeMap;

use crate::error::ConfigError;

const MAX_LABEL_VALUE_LENGTH: usize = 63;

/// Convert a selector such as `a=b,c=d` into a label map.
pub fn parse_label_selector(selector: &str) -> Result<BTreeMap<String, String>, ConfigError> {
	let mut labels = BTreeMap::new();

	for term in selector.split(',').map(str::trim).filter(|t| !t.is_empty()) {
		let (key, value) = term
			.split_once("==")
			.or_else(|| term.split_once('='))
			.ok_or_else(|| invalid(selector, format!("term {term:?} is not key=value")))?;
		let key = key.trim();
		let value = value.trim();

		if key.ends_with('!') || value.contains('=') {
			return Err(invalid(
				selector,
				format!("term {term:?} is not an equality requirement"),
			));
		}
		validate_key(key).map_err(|m| invalid(selector, m))?;
		validate_value(value).map_err(|m| invalid(selector, m))?;

		if let Some(existing) = labels.insert(key.to_string(), value.to_string()) {
			if existing != value {
				return Err(invalid(
					selector,
					format!("key {key:?} has conflicting values"),
				));
			}
		}
	}

	if labels.is_empty() {
		return Err(invalid(selector, "selector is empty".to_string()));
	}

	Ok(labels)
}

fn invalid(selector: &str, message: String) -> ConfigError {
	ConfigError::InvalidValue {
		key: format!("selector {selector:?}"),
		message,
	}
}

fn is_label_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'
}

fn validate_name_part(name: &str) -> Result<(), String> {
	if name.is_empty() || name.len() > MAX_LABEL_VALUE_LENGTH {
		return Err(format!("label name {name:?} must be 1-63 characters"));
	}
	if !name.chars().all(is_label_char)
		|| !name.starts_with(|c: char| c.is_ascii_alphanumeric())
		|| !name.ends_with(|c: char| c.is_ascii_alphanumeric())
	{
		return Err(format!("label name {name:?} is not a valid label name"));
	}
	Ok(())
}

fn validate_key(key: &str) -> Result<(), String> {
	match key.split_once('/') {
		Some((prefix, name)) => {
			if prefix.is_empty()
				|| prefix.len() > 253
				|| !prefix
					.chars()
					.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
			{
				return Err(format!("label prefix {prefix:?} is not a DNS subdomain"));
			}
			validate_name_part(name)
		}
		None => validate_name_part(key),
	}
}

fn validate_value(value: &str) -> Result<(), String> {
	if value.is_empty() {
		return Ok(());
	}
	validate_name_part(value).map_err(|_| format!("label value {value:?} is invalid"))
}
