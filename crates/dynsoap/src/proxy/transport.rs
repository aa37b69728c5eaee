// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Request/response call primitive.

use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::{header, redirect, Client, StatusCode};

/// Call failure below the SOAP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("cannot reach {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("{address} answered HTTP {status}")]
    Status { address: String, status: u16 },
}

/// Performs one remote call.
///
/// Implementations return the response body, including fault-bearing
/// bodies sent with an error status.
#[async_trait]
pub trait CallTransport: Send + Sync {
    async fn call(
        &self,
        address: &str,
        soap_action: &str,
        payload: String,
    ) -> Result<String, TransportError>;
}

/// HTTP(S) transport posting `text/xml` requests.
#[derive(Debug, Clone)]
pub struct HttpCallTransport {
    client: Client,
}

impl HttpCallTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallTransport for HttpCallTransport {
    async fn call(
        &self,
        address: &str,
        soap_action: &str,
        payload: String,
    ) -> Result<String, TransportError> {
        let unreachable = |e: reqwest::Error| TransportError::Unreachable {
            address: address.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .post(address)
            .header(header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", soap_action))
            .body(payload)
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        // SOAP 1.1 faults travel with 500.
        if !status.is_success() && status != StatusCode::INTERNAL_SERVER_ERROR {
            return Err(TransportError::Status {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(unreachable)
    }
}
