// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Access gate configuration.

use serde::Deserialize;

use crate::secret::SecretString;

/// Resolved access gate configuration. `token: None` runs the API
/// unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
	pub token: Option<SecretString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub token: Option<SecretString>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.token.is_some() {
			self.token = other.token;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			token: self.token.filter(|t| !t.expose().is_empty()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::secret::Secret;

	#[test]
	fn test_empty_token_disables_gate() {
		let layer = AuthConfigLayer {
			token: Some(Secret::new(String::new())),
		};
		assert!(layer.finalize().token.is_none());
	}

	#[test]
	fn test_token_is_kept_and_redacted() {
		let layer: AuthConfigLayer = toml::from_str(r#"token = "s3cret""#).unwrap();
		let config = layer.finalize();
		let token = config.token.as_ref().unwrap();
		assert_eq!(token.expose(), "s3cret");
		assert!(!format!("{config:?}").contains("s3cret"));
	}
}
