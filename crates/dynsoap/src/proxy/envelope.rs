// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SOAP 1.1 envelope codec.
//!
//! Requests are written from the operation's parameter descriptors and the
//! argument values; responses are read back through the result descriptor.
//! Element names on the way in are matched by local name only.

use super::{FaultDetails, InvocationError};
use crate::discovery::{MessageLayout, OperationDescriptor};
use crate::dynamic::{
    element_path, join_path, FieldDescriptor, PrimitiveValue, TypeDescriptor, TypeKind, ValueNode,
};
use roxmltree::{Document, Node};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Minimal escaping XML writer.
struct XmlWriter {
    out: String,
}

impl XmlWriter {
    fn new() -> Self {
        Self {
            out: String::with_capacity(512),
        }
    }

    fn escape(&mut self, text: &str, attribute: bool) {
        for c in text.chars() {
            match c {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                '"' if attribute => self.out.push_str("&quot;"),
                '\r' => self.out.push_str("&#xD;"),
                _ => self.out.push(c),
            }
        }
    }

    /// Open `<local>`, declaring `namespace` as default when it differs from `scope`.
    fn open(&mut self, local: &str, namespace: Option<&str>, scope: Option<&str>) {
        self.out.push('<');
        self.out.push_str(local);
        if namespace != scope {
            self.out.push_str(" xmlns=\"");
            self.escape(namespace.unwrap_or_default(), true);
            self.out.push('"');
        }
        self.out.push('>');
    }

    fn nil(&mut self, local: &str, namespace: Option<&str>, scope: Option<&str>) {
        self.open(local, namespace, scope);
        // Rewrite the closing '>' into a self-closed nil element.
        self.out.pop();
        self.out.push_str(" xsi:nil=\"true\"/>");
    }

    fn close(&mut self, local: &str) {
        self.out.push_str("</");
        self.out.push_str(local);
        self.out.push('>');
    }

    fn text(&mut self, text: &str) {
        self.escape(text, false);
    }
}

fn mismatch(path: &str, expected: &TypeDescriptor, found: &ValueNode) -> InvocationError {
    InvocationError::ShapeMismatch {
        path: path.to_string(),
        expected: expected.describe(),
        found: found.shape_name().to_string(),
    }
}

/// Serialize a request envelope for `op`.
pub fn encode_request(
    op: &OperationDescriptor,
    args: &[ValueNode],
) -> Result<String, InvocationError> {
    let mut w = XmlWriter::new();
    w.out.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    w.out.push_str(r#"<soap:Envelope xmlns:soap=""#);
    w.out.push_str(SOAP_ENV_NS);
    w.out.push_str(r#"" xmlns:xsi=""#);
    w.out.push_str(XSI_NS);
    w.out.push_str(r#""><soap:Body>"#);

    match &op.binding.request {
        MessageLayout::Wrapped { element } => {
            let ns = element.namespace.as_deref();
            w.open(&element.local, ns, None);
            write_fields(&mut w, "", &op.parameters, args, ns)?;
            w.close(&element.local);
        }
        MessageLayout::Bare => write_fields(&mut w, "", &op.parameters, args, None)?,
    }

    w.out.push_str("</soap:Body></soap:Envelope>");
    Ok(w.out)
}

fn write_fields(
    w: &mut XmlWriter,
    prefix: &str,
    fields: &[FieldDescriptor],
    values: &[ValueNode],
    scope: Option<&str>,
) -> Result<(), InvocationError> {
    for (field, value) in fields.iter().zip(values) {
        write_field(w, &join_path(prefix, &field.name), field, value, scope)?;
    }
    Ok(())
}

fn write_field(
    w: &mut XmlWriter,
    path: &str,
    field: &FieldDescriptor,
    value: &ValueNode,
    scope: Option<&str>,
) -> Result<(), InvocationError> {
    let ns = field.namespace.as_deref();
    match (&field.type_desc.kind, value) {
        // The field element itself repeats once per item.
        (TypeKind::Sequence(seq), ValueNode::Sequence(items)) if seq.item.is_none() => {
            for (i, item) in items.iter().enumerate() {
                write_element(
                    w,
                    &element_path(path, i),
                    &field.name,
                    ns,
                    scope,
                    &seq.element,
                    item,
                    false,
                )?;
            }
            Ok(())
        }
        _ => write_element(
            w,
            path,
            &field.name,
            ns,
            scope,
            &field.type_desc,
            value,
            field.nillable,
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn write_element(
    w: &mut XmlWriter,
    path: &str,
    local: &str,
    ns: Option<&str>,
    scope: Option<&str>,
    desc: &TypeDescriptor,
    value: &ValueNode,
    nillable: bool,
) -> Result<(), InvocationError> {
    match (&desc.kind, value) {
        (_, ValueNode::Absent) => {
            if nillable {
                w.nil(local, ns, scope);
            }
        }
        (TypeKind::Primitive(kind), ValueNode::Primitive(v)) if v.kind() == *kind => {
            w.open(local, ns, scope);
            w.text(&v.to_wire());
            w.close(local);
        }
        (TypeKind::Enum(e), ValueNode::Enum(symbol)) if e.symbols.contains(symbol) => {
            w.open(local, ns, scope);
            w.text(symbol);
            w.close(local);
        }
        (TypeKind::Record(record), ValueNode::Record(values)) => {
            w.open(local, ns, scope);
            for field in record.fields() {
                let value = values
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map_or(&ValueNode::Absent, |(_, v)| v);
                write_field(w, &join_path(path, &field.name), field, value, ns)?;
            }
            w.close(local);
        }
        (TypeKind::Sequence(seq), ValueNode::Sequence(items)) => {
            w.open(local, ns, scope);
            match &seq.item {
                Some(item) => {
                    let item_ns = item.namespace.as_deref();
                    for (i, v) in items.iter().enumerate() {
                        write_element(
                            w,
                            &element_path(path, i),
                            &item.local,
                            item_ns,
                            ns,
                            &seq.element,
                            v,
                            true,
                        )?;
                    }
                }
                None => {
                    for (i, v) in items.iter().enumerate() {
                        write_element(
                            w,
                            &element_path(path, i),
                            local,
                            ns,
                            ns,
                            &seq.element,
                            v,
                            false,
                        )?;
                    }
                }
            }
            w.close(local);
        }
        _ => return Err(mismatch(path, desc, value)),
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> InvocationError {
    InvocationError::RemoteFault {
        details: FaultDetails::InvalidResponse(reason.into()),
    }
}

fn child_elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn named<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    child_elements(node).filter(move |n| n.tag_name().name() == local)
}

/// Deserialize a response envelope for `op`.
///
/// Operations without a result answer [`ValueNode::Absent`]. A `soap:Fault`
/// body becomes [`InvocationError::RemoteFault`].
pub fn decode_response(
    op: &OperationDescriptor,
    text: &str,
) -> Result<ValueNode, InvocationError> {
    let doc =
        Document::parse(text).map_err(|e| invalid(format!("response is not XML: {}", e)))?;
    let envelope = doc.root_element();
    if envelope.tag_name().name() != "Envelope"
        || envelope.tag_name().namespace() != Some(SOAP_ENV_NS)
    {
        return Err(invalid(format!(
            "expected a SOAP 1.1 envelope, found <{}>",
            envelope.tag_name().name()
        )));
    }
    let body = child_elements(envelope)
        .find(|n| n.tag_name().name() == "Body" && n.tag_name().namespace() == Some(SOAP_ENV_NS))
        .ok_or_else(|| invalid("envelope has no Body"))?;

    if let Some(fault) = child_elements(body)
        .find(|n| n.tag_name().name() == "Fault" && n.tag_name().namespace() == Some(SOAP_ENV_NS))
    {
        return Err(read_fault(text, fault));
    }

    let Some(result) = &op.result else {
        return Ok(ValueNode::Absent);
    };
    let container = match &op.binding.response {
        MessageLayout::Wrapped { element } => named(body, &element.local)
            .next()
            .ok_or_else(|| invalid(format!("response has no <{}> element", element.local)))?,
        MessageLayout::Bare => body,
    };
    read_field(container, &result.name, result)
}

fn read_fault(text: &str, fault: Node) -> InvocationError {
    let child_text = |local: &str| {
        named(fault, local)
            .next()
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    };
    let detail = named(fault, "detail").next().map(|d| {
        child_elements(d)
            .map(|n| &text[n.range()])
            .collect::<Vec<_>>()
            .join("")
    });
    InvocationError::RemoteFault {
        details: FaultDetails::Soap {
            code: child_text("faultcode"),
            string: child_text("faultstring"),
            detail: detail.filter(|d| !d.is_empty()),
        },
    }
}

fn is_nil(node: Node) -> bool {
    matches!(node.attribute((XSI_NS, "nil")), Some("true" | "1"))
}

fn read_field(
    parent: Node,
    path: &str,
    field: &FieldDescriptor,
) -> Result<ValueNode, InvocationError> {
    if let TypeKind::Sequence(seq) = &field.type_desc.kind {
        if seq.item.is_none() {
            let items = named(parent, &field.name)
                .enumerate()
                .map(|(i, n)| read_element(n, &element_path(path, i), &seq.element))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(ValueNode::Sequence(items));
        }
    }
    match named(parent, &field.name).next() {
        Some(node) => read_element(node, path, &field.type_desc),
        None => Ok(ValueNode::Absent),
    }
}

fn read_element(
    node: Node,
    path: &str,
    desc: &TypeDescriptor,
) -> Result<ValueNode, InvocationError> {
    if is_nil(node) {
        return Ok(ValueNode::Absent);
    }
    match &desc.kind {
        TypeKind::Primitive(kind) => {
            let text: String = node
                .descendants()
                .filter(Node::is_text)
                .filter_map(|n| n.text())
                .collect();
            PrimitiveValue::from_wire(*kind, &text)
                .map(ValueNode::Primitive)
                .map_err(|e| invalid(e.at(path).to_string()))
        }
        TypeKind::Enum(e) => {
            let text = node.text().unwrap_or_default().trim();
            e.symbols
                .iter()
                .find(|s| s.as_str() == text)
                .map(|s| ValueNode::Enum(s.clone()))
                .ok_or_else(|| {
                    invalid(format!("{}: '{}' is not a {} symbol", path, text, desc.name))
                })
        }
        TypeKind::Record(record) => {
            let mut values = Vec::with_capacity(record.fields().len());
            for field in record.fields() {
                let value = read_field(node, &join_path(path, &field.name), field)?;
                values.push((field.name.clone(), value));
            }
            Ok(ValueNode::Record(values))
        }
        TypeKind::Sequence(seq) => {
            let items: Vec<Node> = match &seq.item {
                Some(item) => named(node, &item.local).collect(),
                None => child_elements(node).collect(),
            };
            let values = items
                .into_iter()
                .enumerate()
                .map(|(i, n)| read_element(n, &element_path(path, i), &seq.element))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ValueNode::Sequence(values))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::OperationBinding;
    use crate::dynamic::{EnumBuilder, PrimitiveKind, RecordBuilder, XmlName};
    use std::sync::Arc;

    const NS: &str = "http://tempuri.org/";

    fn int() -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::primitive(PrimitiveKind::I32))
    }

    fn add_operation() -> OperationDescriptor {
        OperationDescriptor {
            name: "Add".into(),
            parameters: vec![
                FieldDescriptor::new("a", int()).with_namespace(NS),
                FieldDescriptor::new("b", int()).with_namespace(NS),
            ],
            result: Some(FieldDescriptor::new("AddResult", int()).with_namespace(NS)),
            binding: OperationBinding {
                soap_action: "http://tempuri.org/ICalc/Add".into(),
                request: MessageLayout::Wrapped {
                    element: XmlName::new(Some(NS), "Add"),
                },
                response: MessageLayout::Wrapped {
                    element: XmlName::new(Some(NS), "AddResponse"),
                },
            },
        }
    }

    fn envelope(body: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>{}</s:Body></s:Envelope>"#,
            body
        )
    }

    #[test]
    fn test_encode_wrapped() {
        let xml = encode_request(&add_operation(), &[30.into(), 12.into()]).expect("encode");
        assert!(xml.contains(r#"<Add xmlns="http://tempuri.org/"><a>30</a><b>12</b></Add>"#));
    }

    #[test]
    fn test_decode_wrapped() {
        let text = envelope(r#"<AddResponse xmlns="http://tempuri.org/"><AddResult>42</AddResult></AddResponse>"#);
        assert_eq!(
            decode_response(&add_operation(), &text).expect("decode"),
            ValueNode::from(42)
        );
    }

    #[test]
    fn test_escaping_and_nil() {
        let record = Arc::new(
            RecordBuilder::new("Note")
                .string_field("Text")
                .build()
                .expect("record"),
        );
        let op = OperationDescriptor {
            name: "Put".into(),
            parameters: vec![
                FieldDescriptor::new(
                    "s",
                    Arc::new(TypeDescriptor::primitive(PrimitiveKind::String)),
                ),
                FieldDescriptor::new("n", record).nillable(),
            ],
            result: None,
            binding: OperationBinding {
                soap_action: String::new(),
                request: MessageLayout::Bare,
                response: MessageLayout::Bare,
            },
        };
        let xml = encode_request(&op, &["a<b & \"c\"".into(), ValueNode::Absent]).expect("encode");
        assert!(xml.contains("<s>a&lt;b &amp; \"c\"</s>"));
        assert!(xml.contains(r#"<n xsi:nil="true"/>"#));
        assert_eq!(decode_response(&op, &envelope("")).expect("void"), ValueNode::Absent);
    }

    #[test]
    fn test_sequences_on_the_wire() {
        let wrapped = TypeDescriptor::new(
            "ArrayOfInt",
            TypeKind::Sequence(crate::dynamic::SequenceDescriptor::wrapped(
                int(),
                XmlName::new(Some(NS), "int"),
            )),
        );
        let repeated = Arc::new(TypeDescriptor::sequence(int()));
        let op = OperationDescriptor {
            name: "ArrayTest".into(),
            parameters: vec![
                FieldDescriptor::new("ints", Arc::new(wrapped)).with_namespace(NS),
                FieldDescriptor::new("r", repeated.clone()).with_namespace(NS),
            ],
            result: Some(FieldDescriptor::new("r", repeated).with_namespace(NS)),
            binding: OperationBinding {
                soap_action: String::new(),
                request: MessageLayout::Bare,
                response: MessageLayout::Bare,
            },
        };
        let xml = encode_request(&op, &[vec![1, 2].into(), vec![3, 4].into()]).expect("encode");
        assert!(xml.contains(r#"<ints xmlns="http://tempuri.org/"><int>1</int><int>2</int></ints>"#));
        assert!(xml.contains(r#"<r xmlns="http://tempuri.org/">3</r><r xmlns="http://tempuri.org/">4</r>"#));

        let text = envelope(r#"<r xmlns="urn:x">7</r><r xmlns="urn:x">8</r>"#);
        assert_eq!(
            decode_response(&op, &text).expect("decode"),
            ValueNode::from(vec![7, 8])
        );
    }

    #[test]
    fn test_record_with_enum_round_trip() {
        let kind = Arc::new(EnumBuilder::new("Test").symbol("One").symbol("Two").build());
        let desc = Arc::new(
            RecordBuilder::new("Item")
                .string_field("Name")
                .nested_field("Kind", kind)
                .build()
                .expect("record"),
        );
        let op = OperationDescriptor {
            name: "Echo".into(),
            parameters: vec![FieldDescriptor::new("c", desc.clone())],
            result: Some(FieldDescriptor::new("c", desc)),
            binding: OperationBinding {
                soap_action: String::new(),
                request: MessageLayout::Bare,
                response: MessageLayout::Bare,
            },
        };
        let value = ValueNode::record([
            ("Name", "widget".into()),
            ("Kind", ValueNode::enum_symbol("Two")),
        ]);
        let xml = encode_request(&op, std::slice::from_ref(&value)).expect("encode");
        assert!(xml.contains("<c><Name>widget</Name><Kind>Two</Kind></c>"));

        assert_eq!(decode_response(&op, &xml).expect("decode"), value);
    }

    #[test]
    fn test_fault() {
        let text = envelope(
            r#"<s:Fault><faultcode>s:Client</faultcode><faultstring>bad input</faultstring><detail><code>7</code></detail></s:Fault>"#,
        );
        let err = decode_response(&add_operation(), &text).unwrap_err();
        assert_eq!(
            err,
            InvocationError::RemoteFault {
                details: FaultDetails::Soap {
                    code: "s:Client".into(),
                    string: "bad input".into(),
                    detail: Some("<code>7</code>".into()),
                }
            }
        );
    }

    #[test]
    fn test_bad_primitive_in_response() {
        let text = envelope(r#"<AddResponse><AddResult>forty</AddResult></AddResponse>"#);
        let err = decode_response(&add_operation(), &text).unwrap_err();
        assert!(matches!(
            err,
            InvocationError::RemoteFault {
                details: FaultDetails::InvalidResponse(_)
            }
        ));
    }

    #[test]
    fn test_shape_mismatch_is_reported() {
        let err = encode_request(&add_operation(), &["x".into(), 1.into()]).unwrap_err();
        assert!(matches!(err, InvocationError::ShapeMismatch { ref path, .. } if path == "a"));
    }
}
