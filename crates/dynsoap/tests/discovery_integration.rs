// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery against a WCF-style document layout: help page, `?wsdl` retry,
//! split contract, chained schema imports and a chameleon include.

mod common;

use common::{Fixture, ADDRESS};
use dynsoap::dynamic::TypeKind;
use dynsoap::{DiscoveryError, MemorySink, PrimitiveKind, ProxyEvent, SharedSink};
use std::sync::Arc;

#[tokio::test]
async fn test_discovers_every_soap11_endpoint() {
    let fixture = Fixture::new();
    let events = Arc::new(MemorySink::new());
    let sink: SharedSink = events.clone();
    let service = common::discoverer(&fixture, sink)
        .discover(ADDRESS)
        .await
        .expect("discovery");

    assert_eq!(
        service.endpoint_names().collect::<Vec<_>>(),
        vec!["ServiceName1", "ServiceName2", "Calc"]
    );
    let log = service.endpoint("ServiceName1").expect("ServiceName1");
    assert_eq!(log.address, "http://fixture:8095/test/ServiceName1");
    assert_eq!(
        log.operation_names().collect::<Vec<_>>(),
        vec![
            "SimpleInt32",
            "SimpleString",
            "ComplexObject",
            "ComplexObject2",
            "ArrayTest",
            "ListTest",
            "TestComplexList"
        ]
    );

    // help page, ?wsdl, contract and four schemas
    assert_eq!(fixture.fetches(), 7);
    assert_eq!(
        events.count(|e| matches!(e, ProxyEvent::DocumentFetched { .. })),
        7
    );
    assert_eq!(
        events.count(|e| matches!(
            e,
            ProxyEvent::EndpointSkipped { endpoint, .. } if endpoint == "ServiceName1Soap12"
        )),
        1
    );
}

#[tokio::test]
async fn test_resolves_nested_types() {
    let fixture = Fixture::new();
    let service = common::discoverer(&fixture, Arc::new(MemorySink::new()))
        .discover(ADDRESS)
        .await
        .expect("discovery");
    let log = service.endpoint("ServiceName1").expect("ServiceName1");

    let op = log.operation("ComplexObject2").expect("ComplexObject2");
    assert_eq!(
        op.parameters.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["c", "d", "g"]
    );
    assert_eq!(
        op.parameter("d").expect("d").type_desc.kind,
        TypeKind::Primitive(PrimitiveKind::DateTime)
    );
    assert_eq!(
        op.parameter("g").expect("g").type_desc.kind,
        TypeKind::Primitive(PrimitiveKind::Guid)
    );
    assert!(op.result.is_none());

    let c = op.parameter("c").expect("c");
    assert!(c.optional);
    let my_class2 = c.type_desc.as_record().expect("MyClass2 is a record");
    assert_eq!(my_class2.name, "MyClass2");
    // Declared in a schema without a target namespace, pulled in by include.
    let b = my_class2.field("B").expect("B");
    assert_eq!(b.type_desc.describe(), "Test {One, Two, Three}");
    let inner = my_class2.field("C").expect("C");
    assert_eq!(inner.type_desc.fields().map(<[_]>::len), Some(2));

    let ints = &log.operation("ArrayTest").expect("ArrayTest").parameters[0];
    match &ints.type_desc.kind {
        TypeKind::Sequence(seq) => {
            assert_eq!(seq.item.as_ref().map(|n| n.local.as_str()), Some("int"));
            assert_eq!(seq.element.kind, TypeKind::Primitive(PrimitiveKind::I32));
        }
        other => panic!("expected a sequence, got {:?}", other),
    }
    assert_eq!(ints.type_desc.describe(), "int32[]");
}

#[tokio::test]
async fn test_wrapped_result() {
    let fixture = Fixture::new();
    let service = common::discoverer(&fixture, Arc::new(MemorySink::new()))
        .discover(ADDRESS)
        .await
        .expect("discovery");
    let add = service
        .endpoint("Calc")
        .and_then(|e| e.operation("Add"))
        .expect("Calc.Add");

    assert_eq!(add.signature(), "Add(a: int32, b: int32) -> int32");
    assert_eq!(add.binding.soap_action, "urn:calc/Add");
    assert_eq!(add.result.as_ref().map(|r| r.name.as_str()), Some("AddResult"));
}

#[tokio::test]
async fn test_unknown_host_is_unreachable() {
    let fixture = Fixture::new();
    let err = common::discoverer(&fixture, Arc::new(MemorySink::new()))
        .discover("http://elsewhere:8095/test")
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::Unreachable { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_relative_address_rejected() {
    let fixture = Fixture::new();
    let err = common::discoverer(&fixture, Arc::new(MemorySink::new()))
        .discover("fixture/test")
        .await
        .unwrap_err();
    assert_eq!(err, DiscoveryError::InvalidAddress("fixture/test".into()));
    assert_eq!(fixture.fetches(), 0);
}
