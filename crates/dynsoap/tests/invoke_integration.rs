// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end calls through the explorer: resolve, check, encode, send,
//! decode.

mod common;

use common::ADDRESS;
use dynsoap::{Error, FaultDetails, InvocationError, NotFoundError, ProxyEvent, ValueNode};

fn element_text(payload: &str, name: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(payload).ok()?;
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(str::to_string)
}

#[tokio::test]
async fn test_add_returns_result() {
    let h = common::harness();
    let output = h
        .explorer
        .invoke(ADDRESS, "Calc", "Add", &[ValueNode::from(30), ValueNode::from(12)])
        .await
        .expect("Add");
    assert_eq!(output, ValueNode::from(42));

    let call = h.fixture.last_call().expect("one call");
    assert_eq!(call.address, "http://fixture:8095/test/Calc");
    assert_eq!(call.soap_action, "urn:calc/Add");
    assert_eq!(element_text(&call.payload, "a").as_deref(), Some("30"));
    assert_eq!(
        h.events.count(
            |e| matches!(e, ProxyEvent::InvocationCompleted { operation, .. } if operation == "Add")
        ),
        1
    );
}

#[tokio::test]
async fn test_record_argument_on_the_wire() {
    let h = common::harness();
    let item = ValueNode::record([
        ("Name", ValueNode::from("widget")),
        ("Kind", ValueNode::enum_symbol("Two")),
    ]);
    let output = h
        .explorer
        .invoke(ADDRESS, "Calc", "Describe", &[item])
        .await
        .expect("Describe");
    assert_eq!(output, ValueNode::Absent);

    let call = h.fixture.last_call().expect("one call");
    assert_eq!(element_text(&call.payload, "Name").as_deref(), Some("widget"));
    assert_eq!(element_text(&call.payload, "Kind").as_deref(), Some("Two"));
}

#[tokio::test]
async fn test_wrapped_array_argument() {
    let h = common::harness();
    let ints = ValueNode::from(vec![1, 2, 3]);
    h.explorer
        .invoke(ADDRESS, "ServiceName1", "ArrayTest", &[ints])
        .await
        .expect("ArrayTest");

    let call = h.fixture.last_call().expect("one call");
    let doc = roxmltree::Document::parse(&call.payload).expect("request XML");
    let wrapper = doc
        .descendants()
        .find(|n| n.tag_name().name() == "ints")
        .expect("ints element");
    let items: Vec<&str> = wrapper
        .children()
        .filter(|n| n.is_element())
        .map(|n| {
            assert_eq!(n.tag_name().name(), "int");
            n.text().unwrap_or_default()
        })
        .collect();
    assert_eq!(items, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_unknown_operation() {
    let h = common::harness();
    let err = h
        .explorer
        .invoke(ADDRESS, "Calc", "UnknownOp", &[])
        .await
        .unwrap_err();
    match err {
        Error::NotFound(NotFoundError::UnknownOperation { endpoint, operation }) => {
            assert_eq!(endpoint, "Calc");
            assert_eq!(operation, "UnknownOp");
        }
        other => panic!("expected UnknownOperation, got {:?}", other),
    }
    assert!(h.fixture.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let h = common::harness();
    let err = h
        .explorer
        .invoke(ADDRESS, "Nope", "Add", &[])
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::NotFound(NotFoundError::UnknownEndpoint { .. })),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_shape_mismatch_is_not_sent() {
    let h = common::harness();
    let err = h
        .explorer
        .invoke(ADDRESS, "Calc", "Add", &[ValueNode::from("x"), ValueNode::from(1)])
        .await
        .unwrap_err();
    match err {
        Error::Invocation(InvocationError::ShapeMismatch { path, .. }) => assert_eq!(path, "a"),
        other => panic!("expected ShapeMismatch, got {:?}", other),
    }
    assert!(h.fixture.calls().is_empty());
    assert_eq!(
        h.events.count(|e| matches!(e, ProxyEvent::InvocationFailed { .. })),
        1
    );
}

#[tokio::test]
async fn test_soap_fault_surfaces() {
    let h = common::harness();
    let err = h
        .explorer
        .invoke(ADDRESS, "ServiceName1", "SimpleString", &[ValueNode::from("fault")])
        .await
        .unwrap_err();
    match err {
        Error::Invocation(InvocationError::RemoteFault {
            details: FaultDetails::Soap { code, string, detail },
        }) => {
            assert_eq!(code, "s:Client");
            assert_eq!(string, "The server was unable to process the request");
            assert!(detail.unwrap_or_default().contains("rejected"));
        }
        other => panic!("expected a SOAP fault, got {:?}", other),
    }
}
