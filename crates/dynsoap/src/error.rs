// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error types.

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::dynamic::{ConstructError, CycleDetected, ValueConversionError};
use crate::proxy::{InvocationError, SynthesisError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A name that does not match anything known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("Service {0} has not been resolved")]
    UnknownService(String),

    #[error("Endpoint '{endpoint}' not found in {service}")]
    UnknownEndpoint { service: String, endpoint: String },

    #[error("Operation '{operation}' not found on endpoint '{endpoint}'")]
    UnknownOperation { endpoint: String, operation: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("Invalid value: {0}")]
    Conversion(#[from] ValueConversionError),

    #[error("{0}")]
    Construct(#[from] ConstructError),

    #[error("{0}")]
    Cycle(#[from] CycleDetected),

    #[error("Invocation failed: {0}")]
    Invocation(#[from] InvocationError),

    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<crate::invoke::InvokeError> for Error {
    fn from(e: crate::invoke::InvokeError) -> Self {
        match e {
            crate::invoke::InvokeError::NotFound(e) => Self::NotFound(e),
            crate::invoke::InvokeError::Invocation(e) => Self::Invocation(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err: Error = NotFoundError::UnknownOperation {
            endpoint: "Calc".into(),
            operation: "UnknownOp".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Operation 'UnknownOp' not found on endpoint 'Calc'"
        );

        let err: Error = DiscoveryError::InvalidAddress("x".into()).into();
        assert_eq!(
            err.to_string(),
            "Discovery failed: 'x' is not an absolute address"
        );
    }
}
