// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy cache behaviour over the full discovery pipeline.

mod common;

use common::{Fixture, ADDRESS};
use dynsoap::{MemorySink, ProxyEvent, SharedSink};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_lookups_share_one_resolution() {
    let fixture = Fixture::new();
    let events = Arc::new(MemorySink::new());
    let sink: SharedSink = events.clone();
    let cache = Arc::new(common::cache(&fixture, sink));

    let mut handles = Vec::new();
    for i in 0..8 {
        let cache = cache.clone();
        // Same service, spelled differently.
        let uri = if i % 2 == 0 {
            ADDRESS.to_string()
        } else {
            "http://FIXTURE:8095/test".to_string()
        };
        handles.push(tokio::spawn(async move { cache.get_info(&uri).await }));
    }
    let mut entries = Vec::new();
    for handle in handles {
        entries.push(handle.await.expect("join").expect("resolve"));
    }

    for entry in &entries[1..] {
        assert!(Arc::ptr_eq(&entries[0], entry));
    }
    assert_eq!(
        events.count(|e| matches!(e, ProxyEvent::DiscoveryStarted { .. })),
        1
    );
    assert_eq!(fixture.fetches(), 7);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_clients_follow_endpoints() {
    let fixture = Fixture::new();
    let cache = common::cache(&fixture, Arc::new(MemorySink::new()));
    let entry = cache.get_info(ADDRESS).await.expect("resolve");

    let names: Vec<&str> = entry.clients().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["ServiceName1", "ServiceName2", "Calc"]);

    let calc = cache.get_client(ADDRESS, "Calc").expect("Calc client");
    assert_eq!(calc.address(), "http://fixture:8095/test/Calc");
    assert!(cache.get_client(ADDRESS, "Missing").is_err());
}

#[tokio::test]
async fn test_evict_forces_rediscovery() {
    let fixture = Fixture::new();
    let cache = common::cache(&fixture, Arc::new(MemorySink::new()));

    let first = cache.get_info(ADDRESS).await.expect("resolve");
    assert!(cache.evict(ADDRESS));
    assert!(cache.is_empty());
    let second = cache.get_info(ADDRESS).await.expect("resolve again");

    assert!(!Arc::ptr_eq(&first, &second));
    let signatures = |entry: &dynsoap::CacheEntry| -> Vec<String> {
        entry
            .service()
            .endpoints
            .iter()
            .flat_map(|e| e.operations.iter().map(|op| op.signature()))
            .collect()
    };
    assert_eq!(signatures(&first), signatures(&second));
    assert_eq!(fixture.fetches(), 14);
}
