// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WSDL 1.1 and DISCO document parsing.

use super::schema::{is_xsd, parse_schema, qname, SchemaDoc};
use super::MetadataError;
use crate::dynamic::XmlName;
use roxmltree::{Document, Node};

pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
pub const SOAP11_BINDING_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
pub const SOAP12_BINDING_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";
pub const DISCO_NS: &str = "http://schemas.xmlsoap.org/disco/";
pub const DISCO_SCL_NS: &str = "http://schemas.xmlsoap.org/disco/scl/";
pub const DISCO_SCHEMA_NS: &str = "http://schemas.xmlsoap.org/disco/schema/";

/// A `wsdl:message` part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartDecl {
    pub name: String,
    pub element: Option<XmlName>,
    pub type_ref: Option<XmlName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageDecl {
    pub name: XmlName,
    pub parts: Vec<PartDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortTypeOperation {
    pub name: String,
    pub input: Option<XmlName>,
    pub output: Option<XmlName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortTypeDecl {
    pub name: XmlName,
    pub operations: Vec<PortTypeOperation>,
}

/// Protocol of a binding, from its extension element namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingProtocol {
    Soap11,
    Soap12,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingOperation {
    pub name: String,
    pub soap_action: Option<String>,
    pub style: Option<String>,
    pub input_use: Option<String>,
    pub output_use: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingDecl {
    pub name: XmlName,
    pub port_type: XmlName,
    pub protocol: BindingProtocol,
    pub style: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortDecl {
    pub name: String,
    pub binding: XmlName,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDecl {
    pub name: String,
    pub ports: Vec<PortDecl>,
}

/// One parsed `wsdl:definitions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WsdlDoc {
    pub target_namespace: Option<String>,
    /// `location` of `wsdl:import` elements.
    pub imports: Vec<String>,
    /// Schemas embedded in `wsdl:types`.
    pub schemas: Vec<SchemaDoc>,
    pub messages: Vec<MessageDecl>,
    pub port_types: Vec<PortTypeDecl>,
    pub bindings: Vec<BindingDecl>,
    pub services: Vec<ServiceDecl>,
}

/// Any document the discovery client may receive.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataDocument {
    Wsdl(WsdlDoc),
    Schema(SchemaDoc),
    /// DISCO document: contract and schema references.
    Disco {
        contracts: Vec<String>,
        schemas: Vec<String>,
    },
    /// Anything else (HTML help page, plain text, unknown XML).
    NotMetadata,
}

fn is_wsdl(node: &Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(WSDL_NS)
}

fn wsdl_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    local: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is_wsdl(n, local))
}

fn required<'a>(node: &Node<'a, '_>, attr: &str) -> Result<&'a str, MetadataError> {
    node.attribute(attr).ok_or_else(|| {
        MetadataError::new(format!(
            "<{}> is missing the '{}' attribute",
            node.tag_name().name(),
            attr
        ))
    })
}

fn qualified(target: &Option<String>, local: &str) -> XmlName {
    XmlName::new(target.as_deref(), local)
}

/// Parse and classify a metadata document.
///
/// Text that is not well-formed XML is reported as [`MetadataDocument::NotMetadata`].
pub fn parse_document(text: &str) -> Result<MetadataDocument, MetadataError> {
    let doc = match Document::parse(text) {
        Ok(doc) => doc,
        Err(_) => return Ok(MetadataDocument::NotMetadata),
    };
    let root = doc.root_element();

    if is_wsdl(&root, "definitions") {
        return parse_definitions(root).map(MetadataDocument::Wsdl);
    }
    if is_xsd(&root, "schema") {
        return parse_schema(root).map(MetadataDocument::Schema);
    }
    if root.tag_name().name() == "discovery" && root.tag_name().namespace() == Some(DISCO_NS) {
        let refs = |ns: &str, local: &str| -> Vec<String> {
            root.children()
                .filter(|n| {
                    n.is_element()
                        && n.tag_name().name() == local
                        && n.tag_name().namespace() == Some(ns)
                })
                .filter_map(|n| n.attribute("ref").map(str::to_string))
                .collect()
        };
        return Ok(MetadataDocument::Disco {
            contracts: refs(DISCO_SCL_NS, "contractRef"),
            schemas: refs(DISCO_SCHEMA_NS, "schemaRef"),
        });
    }
    Ok(MetadataDocument::NotMetadata)
}

fn parse_definitions(root: Node) -> Result<WsdlDoc, MetadataError> {
    let target = root.attribute("targetNamespace").map(str::to_string);
    let mut doc = WsdlDoc {
        target_namespace: target.clone(),
        ..Default::default()
    };

    for import in wsdl_children(root, "import") {
        doc.imports.push(required(&import, "location")?.to_string());
    }

    for types in wsdl_children(root, "types") {
        for schema in types.children().filter(|n| is_xsd(n, "schema")) {
            doc.schemas.push(parse_schema(schema)?);
        }
    }

    for message in wsdl_children(root, "message") {
        let mut parts = Vec::new();
        for part in wsdl_children(message, "part") {
            parts.push(PartDecl {
                name: required(&part, "name")?.to_string(),
                element: part.attribute("element").map(|v| qname(&part, v)).transpose()?,
                type_ref: part.attribute("type").map(|v| qname(&part, v)).transpose()?,
            });
        }
        doc.messages.push(MessageDecl {
            name: qualified(&target, required(&message, "name")?),
            parts,
        });
    }

    for port_type in wsdl_children(root, "portType") {
        let mut operations = Vec::new();
        for op in wsdl_children(port_type, "operation") {
            let message_of = |local: &'static str| -> Result<Option<XmlName>, MetadataError> {
                wsdl_children(op, local)
                    .next()
                    .map(|n| qname(&n, required(&n, "message")?))
                    .transpose()
            };
            operations.push(PortTypeOperation {
                name: required(&op, "name")?.to_string(),
                input: message_of("input")?,
                output: message_of("output")?,
            });
        }
        doc.port_types.push(PortTypeDecl {
            name: qualified(&target, required(&port_type, "name")?),
            operations,
        });
    }

    for binding in wsdl_children(root, "binding") {
        doc.bindings.push(parse_binding(binding, &target)?);
    }

    for service in wsdl_children(root, "service") {
        let mut ports = Vec::new();
        for port in wsdl_children(service, "port") {
            let address = port
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "address")
                .and_then(|n| n.attribute("location"))
                .map(str::to_string);
            ports.push(PortDecl {
                name: required(&port, "name")?.to_string(),
                binding: qname(&port, required(&port, "binding")?)?,
                address,
            });
        }
        doc.services.push(ServiceDecl {
            name: required(&service, "name")?.to_string(),
            ports,
        });
    }

    Ok(doc)
}

fn soap_extension<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| {
        n.is_element()
            && n.tag_name().name() == local
            && matches!(
                n.tag_name().namespace(),
                Some(SOAP11_BINDING_NS) | Some(SOAP12_BINDING_NS)
            )
    })
}

fn parse_binding(binding: Node, target: &Option<String>) -> Result<BindingDecl, MetadataError> {
    let soap = soap_extension(binding, "binding");
    let protocol = match soap.and_then(|n| n.tag_name().namespace()) {
        Some(SOAP11_BINDING_NS) => BindingProtocol::Soap11,
        Some(SOAP12_BINDING_NS) => BindingProtocol::Soap12,
        _ => BindingProtocol::Other,
    };

    let mut operations = Vec::new();
    for op in wsdl_children(binding, "operation") {
        let soap_op = soap_extension(op, "operation");
        let use_of = |local: &'static str| {
            wsdl_children(op, local)
                .next()
                .and_then(|n| soap_extension(n, "body"))
                .and_then(|b| b.attribute("use"))
                .map(str::to_string)
        };
        operations.push(BindingOperation {
            name: required(&op, "name")?.to_string(),
            soap_action: soap_op
                .and_then(|n| n.attribute("soapAction"))
                .map(str::to_string),
            style: soap_op.and_then(|n| n.attribute("style")).map(str::to_string),
            input_use: use_of("input"),
            output_use: use_of("output"),
        });
    }

    Ok(BindingDecl {
        name: qualified(target, required(&binding, "name")?),
        port_type: qname(&binding, required(&binding, "type")?)?,
        protocol,
        style: soap.and_then(|n| n.attribute("style")).map(str::to_string),
        operations,
    })
}
