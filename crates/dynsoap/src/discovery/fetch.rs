// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metadata retrieval.

use super::DiscoveryError;
use crate::config::HttpConfig;
use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};
use url::Url;

/// A retrieved document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Final location after redirects; relative references resolve against it.
    pub url: Url,
    /// HTTP status of the final response.
    pub status: u16,
    pub body: String,
}

impl FetchedDocument {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Retrieves metadata documents.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, DiscoveryError>;
}

/// HTTP(S) metadata fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher following at most `config.max_redirects` redirects.
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, DiscoveryError> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_redirect() {
                DiscoveryError::RedirectUnresolvable {
                    uri: url.to_string(),
                    reason: e.to_string(),
                }
            } else {
                DiscoveryError::Unreachable {
                    uri: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_redirection() {
            return Err(DiscoveryError::RedirectUnresolvable {
                uri: url.to_string(),
                reason: format!("{} without a usable Location header", status),
            });
        }
        // WCF answers `?wsdl` requests for non-metadata addresses with 400/404,
        // and plain GETs of an endpoint with 405; let the caller decide.
        if !status.is_success()
            && !matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED
            )
        {
            return Err(DiscoveryError::Unreachable {
                uri: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| DiscoveryError::Unreachable {
            uri: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(FetchedDocument {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}
