// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory service used by the integration tests.
//!
//! Serves the documents under `tests/fixtures` the way a WCF host lays them
//! out (`?wsdl`, `?wsdl=wsdl0`, `?xsd=xsdN`) and answers calls with canned
//! envelopes.

#![allow(dead_code)]

use async_trait::async_trait;
use dynsoap::discovery::{DiscoveryError, FetchedDocument, MetadataFetcher};
use dynsoap::proxy::{CallTransport, TransportError};
use dynsoap::{
    DiscoveryResolver, Discoverer, Explorer, MemorySink, ProxyCache, SharedSink, Synthesizer,
};
use dynsoap::config::DiscoveryConfig;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

pub const ADDRESS: &str = "http://fixture:8095/test";

const DOCUMENTS: &[(&str, &str)] = &[
    ("http://fixture:8095/test", include_str!("../fixtures/help.html")),
    ("http://fixture:8095/test?wsdl", include_str!("../fixtures/service.wsdl")),
    ("http://fixture:8095/test?wsdl=wsdl0", include_str!("../fixtures/contract.wsdl")),
    ("http://fixture:8095/test?xsd=xsd0", include_str!("../fixtures/operations.xsd")),
    ("http://fixture:8095/test?xsd=xsd1", include_str!("../fixtures/model.xsd")),
    ("http://fixture:8095/test?xsd=xsd2", include_str!("../fixtures/enums.xsd")),
    ("http://fixture:8095/test?xsd=xsd3", include_str!("../fixtures/calc.xsd")),
];

/// A call received by the fixture.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub address: String,
    pub soap_action: String,
    pub payload: String,
}

#[derive(Default)]
pub struct Fixture {
    fetches: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Fixture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of documents served so far.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl MetadataFetcher for Fixture {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, DiscoveryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers pile up behind the first resolution.
        tokio::task::yield_now().await;
        let body = DOCUMENTS
            .iter()
            .find(|(location, _)| *location == url.as_str())
            .map(|(_, body)| body.to_string())
            .ok_or_else(|| DiscoveryError::Unreachable {
                uri: url.to_string(),
                reason: "404 Not Found".into(),
            })?;
        Ok(FetchedDocument {
            url: url.clone(),
            status: 200,
            body,
        })
    }
}

fn envelope(body: &str) -> String {
    format!(
        "<s:Envelope xmlns:s=\"http://schemas.xmlsoap.org/soap/envelope/\"><s:Body>{}</s:Body></s:Envelope>",
        body
    )
}

fn fault(message: &str) -> String {
    envelope(&format!(
        "<s:Fault><faultcode>s:Client</faultcode><faultstring>{}</faultstring>\
         <detail><reason>rejected</reason></detail></s:Fault>",
        message
    ))
}

fn int_argument(payload: &str, name: &str) -> Option<i64> {
    let doc = roxmltree::Document::parse(payload).ok()?;
    let node = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)?;
    node.text()?.trim().parse().ok()
}

#[async_trait]
impl CallTransport for Fixture {
    async fn call(
        &self,
        address: &str,
        soap_action: &str,
        payload: String,
    ) -> Result<String, TransportError> {
        self.calls.lock().push(RecordedCall {
            address: address.to_string(),
            soap_action: soap_action.to_string(),
            payload: payload.clone(),
        });

        if !address.starts_with(ADDRESS) {
            return Err(TransportError::Unreachable {
                address: address.to_string(),
                reason: "connection refused".into(),
            });
        }
        if payload.contains(">fault</s>") {
            return Ok(fault("The server was unable to process the request"));
        }

        let operation = soap_action.rsplit('/').next().unwrap_or_default();
        let namespace = if soap_action.starts_with("urn:calc") {
            "urn:calc"
        } else {
            "http://tempuri.org/"
        };
        if operation == "Add" {
            let sum = int_argument(&payload, "a").unwrap_or(0)
                + int_argument(&payload, "b").unwrap_or(0);
            return Ok(envelope(&format!(
                "<AddResponse xmlns=\"{}\"><AddResult>{}</AddResult></AddResponse>",
                namespace, sum
            )));
        }
        Ok(envelope(&format!(
            "<{}Response xmlns=\"{}\"/>",
            operation, namespace
        )))
    }
}

/// Everything a test needs: the fixture, a recording sink and an explorer
/// wired to both.
pub struct Harness {
    pub fixture: Arc<Fixture>,
    pub events: Arc<MemorySink>,
    pub explorer: Explorer,
}

pub fn discoverer(fixture: &Arc<Fixture>, events: SharedSink) -> Discoverer {
    Discoverer::new(fixture.clone(), DiscoveryConfig::default(), events)
}

pub fn cache(fixture: &Arc<Fixture>, events: SharedSink) -> ProxyCache {
    let resolver = DiscoveryResolver::new(
        discoverer(fixture, events.clone()),
        Synthesizer::new(fixture.clone(), events.clone()),
    );
    ProxyCache::new(Arc::new(resolver), events)
}

pub fn harness() -> Harness {
    let fixture = Fixture::new();
    let events = Arc::new(MemorySink::new());
    let sink: SharedSink = events.clone();
    let explorer = Explorer::new(cache(&fixture, sink.clone()), sink);
    Harness {
        fixture,
        events,
        explorer,
    }
}
