// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Observability events.
//!
//! Components never log through global state; each one holds an
//! [`EventSink`] handed to it at construction.

use parking_lot::Mutex;
use std::sync::Arc;

/// Something worth reporting happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    DiscoveryStarted { uri: String },
    /// A metadata document was retrieved.
    DocumentFetched { uri: String, bytes: usize },
    DiscoveryCompleted { uri: String, endpoints: usize },
    DiscoveryFailed { uri: String, reason: String },
    /// A port was not usable (wrong binding style or protocol).
    EndpointSkipped { endpoint: String, reason: String },
    SynthesisCompleted { uri: String, endpoints: usize },
    /// Served from a ready cache entry.
    CacheHit { key: String },
    /// Joined a resolution already in flight.
    CacheJoined { key: String },
    CacheStored { key: String },
    CacheEvicted { key: String },
    InvocationStarted { endpoint: String, operation: String },
    InvocationCompleted { endpoint: String, operation: String },
    InvocationFailed {
        endpoint: String,
        operation: String,
        reason: String,
    },
}

/// Receiver of [`ProxyEvent`]s.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProxyEvent);
}

/// Shared sink handle.
pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ProxyEvent) {
        match event {
            ProxyEvent::DiscoveryStarted { uri } => {
                tracing::info!("Discovering service at {}", uri);
            }
            ProxyEvent::DocumentFetched { uri, bytes } => {
                tracing::debug!("Fetched {} ({} bytes)", uri, bytes);
            }
            ProxyEvent::DiscoveryCompleted { uri, endpoints } => {
                tracing::info!("Discovered {} endpoint(s) at {}", endpoints, uri);
            }
            ProxyEvent::DiscoveryFailed { uri, reason } => {
                tracing::warn!("Discovery of {} failed: {}", uri, reason);
            }
            ProxyEvent::EndpointSkipped { endpoint, reason } => {
                tracing::warn!("Skipping endpoint {}: {}", endpoint, reason);
            }
            ProxyEvent::SynthesisCompleted { uri, endpoints } => {
                tracing::debug!("Synthesized {} client(s) for {}", endpoints, uri);
            }
            ProxyEvent::CacheHit { key } => tracing::trace!("Cache hit for {}", key),
            ProxyEvent::CacheJoined { key } => {
                tracing::debug!("Waiting on in-flight resolution of {}", key);
            }
            ProxyEvent::CacheStored { key } => tracing::debug!("Cached {}", key),
            ProxyEvent::CacheEvicted { key } => tracing::info!("Evicted {}", key),
            ProxyEvent::InvocationStarted {
                endpoint,
                operation,
            } => {
                tracing::info!("Invoking {}.{}", endpoint, operation);
            }
            ProxyEvent::InvocationCompleted {
                endpoint,
                operation,
            } => {
                tracing::debug!("{}.{} completed", endpoint, operation);
            }
            ProxyEvent::InvocationFailed {
                endpoint,
                operation,
                reason,
            } => {
                tracing::warn!("{}.{} failed: {}", endpoint, operation, reason);
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ProxyEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<ProxyEvent> {
        self.events.lock().clone()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&ProxyEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ProxyEvent) {
        self.events.lock().push(event);
    }
}

/// Discards events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ProxyEvent) {}
}

/// Default sink: [`TracingSink`].
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(ProxyEvent::CacheStored { key: "a".into() });
        sink.emit(ProxyEvent::CacheHit { key: "a".into() });

        assert_eq!(
            sink.events(),
            vec![
                ProxyEvent::CacheStored { key: "a".into() },
                ProxyEvent::CacheHit { key: "a".into() },
            ]
        );
        assert_eq!(
            sink.count(|e| matches!(e, ProxyEvent::CacheHit { .. })),
            1
        );
        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_sinks_are_object_safe() {
        let sinks: Vec<SharedSink> = vec![Arc::new(NullSink), default_sink()];
        for sink in sinks {
            sink.emit(ProxyEvent::DiscoveryStarted {
                uri: "http://localhost/".into(),
            });
        }
    }
}
