// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the authorization engine.

use thiserror::Error;

/// Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Errors that can occur while mutating or querying the policy store.
///
/// None of these may ever be interpreted as an allow. Callers at the request
/// boundary must treat every error as a deny.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
	/// Removal of a policy or grouping edge that does not exist
	#[error("not found: {0}")]
	NotFound(String),

	/// Malformed attribute set, pattern, or grouping reference
	#[error("invalid pattern: {0}")]
	InvalidPattern(String),

	/// Backing storage failed or is unreachable
	#[error("storage error: {0}")]
	Storage(String),

	/// Stored data could not be encoded or decoded
	#[error("serialization error: {0}")]
	Serialization(String),
}

impl AuthzError {
	pub fn not_found(msg: impl Into<String>) -> Self {
		Self::NotFound(msg.into())
	}

	pub fn invalid_pattern(msg: impl Into<String>) -> Self {
		Self::InvalidPattern(msg.into())
	}

	pub fn storage(msg: impl Into<String>) -> Self {
		Self::Storage(msg.into())
	}

	/// Returns true for errors caused by the caller's input rather than the engine.
	pub fn is_client_error(&self) -> bool {
		matches!(self, Self::NotFound(_) | Self::InvalidPattern(_))
	}
}

impl From<serde_json::Error> for AuthzError {
	fn from(err: serde_json::Error) -> Self {
		Self::Serialization(err.to_string())
	}
}
