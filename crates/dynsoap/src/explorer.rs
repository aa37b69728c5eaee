// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Front-end facade.
//!
//! Bundles the cache and the invoker behind the four calls front ends need:
//! list endpoints, build a value, flatten a type and invoke an operation.

use crate::cache::{CacheEntry, CacheError, ProxyCache};
use crate::config::Config;
use crate::discovery::EndpointDescriptor;
use crate::dynamic::{
    construct, flatten, ConstructError, Flatten, TokenSource, TypeDescriptor, ValueNode,
};
use crate::error::Result;
use crate::events::SharedSink;
use crate::invoke::Invoker;
use std::sync::Arc;

pub struct Explorer {
    cache: ProxyCache,
    invoker: Invoker,
}

impl Explorer {
    pub fn new(cache: ProxyCache, events: SharedSink) -> Self {
        Self {
            cache,
            invoker: Invoker::new(events),
        }
    }

    /// Explorer resolving and calling over HTTP(S).
    pub fn http(config: &Config, events: SharedSink) -> Result<Self> {
        let cache = ProxyCache::http(config, events.clone())?;
        Ok(Self::new(cache, events))
    }

    pub fn cache(&self) -> &ProxyCache {
        &self.cache
    }

    /// Resolve `uri` (once) and return its cache entry.
    pub async fn resolve(&self, uri: &str) -> std::result::Result<Arc<CacheEntry>, CacheError> {
        self.cache.get_info(uri).await
    }

    /// Endpoints of the service at `uri`, with their operations.
    pub async fn list_endpoints(
        &self,
        uri: &str,
    ) -> std::result::Result<Vec<EndpointDescriptor>, CacheError> {
        Ok(self.resolve(uri).await?.service().endpoints.clone())
    }

    /// Build a value of `desc`, asking `source` for each token.
    pub fn build_value<S: TokenSource + ?Sized>(
        &self,
        desc: &TypeDescriptor,
        source: &mut S,
    ) -> std::result::Result<ValueNode, ConstructError> {
        construct(desc, source)
    }

    /// Leaves of `desc` in declaration order.
    pub fn flatten(&self, desc: &Arc<TypeDescriptor>) -> Flatten {
        flatten(desc)
    }

    /// Call `operation` of `endpoint` at `uri`.
    pub async fn invoke(
        &self,
        uri: &str,
        endpoint: &str,
        operation: &str,
        args: &[ValueNode],
    ) -> Result<ValueNode> {
        let entry = self.resolve(uri).await?;
        let client = entry.client(endpoint)?;
        Ok(self.invoker.invoke(&client, operation, args).await?)
    }
}
