// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy cache.
//!
//! Memoizes discovery and synthesis per normalized address. Each key holds
//! either a finished entry or a shared future for the resolution in flight:
//!
//! ```text
//! get_info(uri) --> Ready(entry)          --> entry (hit)
//!               --> Resolving(future)     --> await future (joined)
//!               --> vacant: spawn resolve --> Resolving --> Ready | removed
//! ```
//!
//! The map lock is held only while a slot is read or created, never while
//! resolving, so distinct keys never wait on each other. Failed resolutions
//! are removed; the next request starts over.

use crate::config::Config;
use crate::discovery::{parse_address, DiscoveryError, Discoverer, ServiceDescriptor};
use crate::error::NotFoundError;
use crate::events::{ProxyEvent, SharedSink};
use crate::proxy::{EndpointClient, SynthesisError, Synthesizer};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Why a service could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// The resolution task ended without a result.
    #[error("Resolution of {uri} aborted: {reason}")]
    Aborted { uri: String, reason: String },
}

/// Normalized cache key: `scheme://host:port/path`.
///
/// Scheme and host compare case-insensitively; query and fragment are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn parse(uri: &str) -> Result<Self, DiscoveryError> {
        let url = parse_address(uri)?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let key = match url.port_or_known_default() {
            Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
            None => format!("{}://{}{}", url.scheme(), host, url.path()),
        };
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved service and its clients.
#[derive(Debug)]
pub struct CacheEntry {
    service: ServiceDescriptor,
    clients: Vec<Arc<EndpointClient>>,
}

impl CacheEntry {
    pub fn new(service: ServiceDescriptor, clients: Vec<Arc<EndpointClient>>) -> Self {
        Self { service, clients }
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    pub fn clients(&self) -> &[Arc<EndpointClient>] {
        &self.clients
    }

    /// Client of the endpoint named `name`.
    pub fn client(&self, name: &str) -> Result<Arc<EndpointClient>, NotFoundError> {
        self.clients
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| NotFoundError::UnknownEndpoint {
                service: self.service.uri.clone(),
                endpoint: name.to_string(),
            })
    }
}

/// Produces a cache entry for an address.
#[async_trait]
pub trait ServiceResolver: Send + Sync + 'static {
    async fn resolve(&self, uri: &str) -> Result<CacheEntry, CacheError>;
}

/// Discovery followed by synthesis.
pub struct DiscoveryResolver {
    discoverer: Discoverer,
    synthesizer: Synthesizer,
}

impl DiscoveryResolver {
    pub fn new(discoverer: Discoverer, synthesizer: Synthesizer) -> Self {
        Self {
            discoverer,
            synthesizer,
        }
    }

    /// HTTP discovery and HTTP clients.
    pub fn http(config: &Config, events: SharedSink) -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            Discoverer::http(config, events.clone())?,
            Synthesizer::http(config, events)?,
        ))
    }
}

#[async_trait]
impl ServiceResolver for DiscoveryResolver {
    async fn resolve(&self, uri: &str) -> Result<CacheEntry, CacheError> {
        let service = self.discoverer.discover(uri).await?;
        let clients = self.synthesizer.synthesize(&service)?;
        Ok(CacheEntry::new(service, clients))
    }
}

type Resolution = Result<Arc<CacheEntry>, CacheError>;

enum Slot {
    Resolving {
        generation: u64,
        future: Shared<BoxFuture<'static, Resolution>>,
    },
    Ready(Arc<CacheEntry>),
}

/// Per-address memo of resolved services with single-flight resolution.
pub struct ProxyCache {
    resolver: Arc<dyn ServiceResolver>,
    slots: Arc<DashMap<CacheKey, Slot>>,
    generation: AtomicU64,
    events: SharedSink,
}

impl ProxyCache {
    pub fn new(resolver: Arc<dyn ServiceResolver>, events: SharedSink) -> Self {
        Self {
            resolver,
            slots: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            events,
        }
    }

    /// Cache resolving over HTTP(S).
    pub fn http(config: &Config, events: SharedSink) -> Result<Self, reqwest::Error> {
        let resolver = DiscoveryResolver::http(config, events.clone())?;
        Ok(Self::new(Arc::new(resolver), events))
    }

    /// Resolved service for `uri`, resolving it at most once.
    ///
    /// Concurrent callers for the same key share one resolution and observe
    /// the same entry or the same error. Must be called within a tokio runtime.
    pub async fn get_info(&self, uri: &str) -> Result<Arc<CacheEntry>, CacheError> {
        let key = CacheKey::parse(uri)?;
        let future = match self.slots.entry(key.clone()) {
            Entry::Occupied(slot) => match slot.get() {
                Slot::Ready(entry) => {
                    self.events.emit(ProxyEvent::CacheHit {
                        key: key.to_string(),
                    });
                    return Ok(entry.clone());
                }
                Slot::Resolving { future, .. } => {
                    self.events.emit(ProxyEvent::CacheJoined {
                        key: key.to_string(),
                    });
                    future.clone()
                }
            },
            Entry::Vacant(vacant) => {
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let future = self.spawn_resolution(key.clone(), uri.to_string(), generation);
                vacant.insert(Slot::Resolving {
                    generation,
                    future: future.clone(),
                });
                future
            }
        };
        future.await
    }

    /// Start the resolution task. It settles its own slot, so it completes
    /// even if every waiter goes away.
    fn spawn_resolution(
        &self,
        key: CacheKey,
        uri: String,
        generation: u64,
    ) -> Shared<BoxFuture<'static, Resolution>> {
        let resolver = self.resolver.clone();
        let slots = self.slots.clone();
        let events = self.events.clone();

        let task = {
            let key = key.clone();
            let slots = slots.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                let result = resolver.resolve(&uri).await.map(Arc::new);
                settle(&slots, &key, generation, &result, &events);
                result
            })
        };

        async move {
            match task.await {
                Ok(result) => result,
                Err(join) => {
                    let err = CacheError::Aborted {
                        uri,
                        reason: join.to_string(),
                    };
                    slots.remove_if(&key, |_, slot| is_generation(slot, generation));
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Client for `endpoint` of an already resolved `uri`.
    pub fn get_client(
        &self,
        uri: &str,
        endpoint: &str,
    ) -> Result<Arc<EndpointClient>, NotFoundError> {
        let unknown = || NotFoundError::UnknownService(uri.to_string());
        let key = CacheKey::parse(uri).map_err(|_| unknown())?;
        let entry = match self.slots.get(&key).as_deref() {
            Some(Slot::Ready(entry)) => entry.clone(),
            _ => return Err(unknown()),
        };
        entry.client(endpoint)
    }

    /// Drop the entry for `uri`. A resolution in flight still completes for
    /// its waiters but is not stored.
    pub fn evict(&self, uri: &str) -> bool {
        let Ok(key) = CacheKey::parse(uri) else {
            return false;
        };
        let removed = self.slots.remove(&key).is_some();
        if removed {
            self.events.emit(ProxyEvent::CacheEvicted {
                key: key.to_string(),
            });
        }
        removed
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_generation(slot: &Slot, generation: u64) -> bool {
    matches!(slot, Slot::Resolving { generation: g, .. } if *g == generation)
}

/// Publish a finished resolution if its slot is still the one that started it.
fn settle(
    slots: &DashMap<CacheKey, Slot>,
    key: &CacheKey,
    generation: u64,
    result: &Resolution,
    events: &SharedSink,
) {
    if let Entry::Occupied(mut slot) = slots.entry(key.clone()) {
        if !is_generation(slot.get(), generation) {
            return;
        }
        match result {
            Ok(entry) => {
                slot.insert(Slot::Ready(entry.clone()));
                events.emit(ProxyEvent::CacheStored {
                    key: key.to_string(),
                });
            }
            Err(_) => {
                slot.remove();
            }
        }
    }
}
