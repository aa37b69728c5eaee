// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! XML Schema subset parser.
//!
//! Reads the declarations needed to describe message types: top-level
//! elements, named complex and simple types, and import/include locations.
//! The result owns its data so that documents can outlive their source text.

use super::MetadataError;
use crate::dynamic::XmlName;
use roxmltree::Node;

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Upper bound of an element's occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl MaxOccurs {
    pub fn repeats(&self) -> bool {
        !matches!(self, Self::Bounded(0 | 1))
    }
}

/// Element declaration (top-level or local).
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    pub name: String,
    /// Namespace the element is qualified with on the wire.
    pub namespace: Option<String>,
    pub type_ref: Option<XmlName>,
    pub element_ref: Option<XmlName>,
    pub inline: Option<Box<TypeDef>>,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub nillable: bool,
}

/// Anonymous type definition.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Complex(ComplexTypeDecl),
    Simple(SimpleTypeDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexTypeDecl {
    pub name: Option<String>,
    /// `complexContent/extension` base.
    pub base: Option<XmlName>,
    /// Child elements in declaration order.
    pub particles: Vec<ElementDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimpleTypeDecl {
    pub name: Option<String>,
    pub base: Option<XmlName>,
    pub enumeration: Vec<String>,
}

/// One parsed `xs:schema`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDoc {
    pub target_namespace: Option<String>,
    pub elements: Vec<ElementDecl>,
    pub complex_types: Vec<ComplexTypeDecl>,
    pub simple_types: Vec<SimpleTypeDecl>,
    /// `schemaLocation` of `xs:import` elements.
    pub imports: Vec<String>,
    /// `schemaLocation` of `xs:include` elements.
    pub includes: Vec<String>,
}

impl SchemaDoc {
    /// Adopt `namespace` when this schema has none (included "chameleon" schema).
    pub fn adopt_namespace(&mut self, namespace: &str) {
        if self.target_namespace.is_some() {
            return;
        }
        self.target_namespace = Some(namespace.to_string());
        for element in &mut self.elements {
            element.namespace = Some(namespace.to_string());
        }
    }
}

pub(crate) fn is_xsd(node: &Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(XSD_NS)
}

fn xsd_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(XSD_NS))
}

/// Resolve a `prefix:local` attribute value against the namespaces in scope.
pub(crate) fn qname(node: &Node, value: &str) -> Result<XmlName, MetadataError> {
    let (prefix, local) = match value.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, value),
    };
    match node.lookup_namespace_uri(prefix) {
        Some(ns) => Ok(XmlName::new(Some(ns), local)),
        None if prefix.is_none() => Ok(XmlName::local(local)),
        None => Err(MetadataError::new(format!(
            "undeclared namespace prefix in '{}'",
            value
        ))),
    }
}

fn qname_attr(node: &Node, attr: &str) -> Result<Option<XmlName>, MetadataError> {
    node.attribute(attr).map(|v| qname(node, v)).transpose()
}

fn parse_occurs(node: &Node) -> Result<(u32, MaxOccurs), MetadataError> {
    let min = match node.attribute("minOccurs") {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| MetadataError::new(format!("invalid minOccurs '{}'", v)))?,
        None => 1,
    };
    let max = match node.attribute("maxOccurs").map(str::trim) {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(v) => MaxOccurs::Bounded(
            v.parse()
                .map_err(|_| MetadataError::new(format!("invalid maxOccurs '{}'", v)))?,
        ),
        None => MaxOccurs::Bounded(1),
    };
    Ok((min, max))
}

struct Context<'a> {
    target_namespace: Option<&'a str>,
    qualified: bool,
}

/// Parse an `xs:schema` element.
pub fn parse_schema(schema: Node) -> Result<SchemaDoc, MetadataError> {
    let target_namespace = schema.attribute("targetNamespace").map(str::to_string);
    let ctx = Context {
        target_namespace: target_namespace.as_deref(),
        qualified: schema.attribute("elementFormDefault") == Some("qualified"),
    };

    let mut doc = SchemaDoc {
        target_namespace: target_namespace.clone(),
        ..Default::default()
    };

    for child in xsd_children(schema) {
        match child.tag_name().name() {
            "element" => {
                let mut element = parse_element(child, &ctx)?;
                element.namespace = target_namespace.clone();
                doc.elements.push(element);
            }
            "complexType" => doc.complex_types.push(parse_complex_type(child, &ctx)?),
            "simpleType" => doc.simple_types.push(parse_simple_type(child)?),
            "import" => {
                if let Some(location) = child.attribute("schemaLocation") {
                    doc.imports.push(location.to_string());
                }
            }
            "include" => {
                let location = child.attribute("schemaLocation").ok_or_else(|| {
                    MetadataError::new("xs:include without schemaLocation".to_string())
                })?;
                doc.includes.push(location.to_string());
            }
            "attribute" | "attributeGroup" | "annotation" => {}
            "group" | "redefine" | "override" | "notation" => {
                return Err(MetadataError::new(format!(
                    "unsupported schema construct xs:{}",
                    child.tag_name().name()
                )))
            }
            _ => {}
        }
    }
    Ok(doc)
}

fn parse_element(node: Node, ctx: &Context) -> Result<ElementDecl, MetadataError> {
    let (min_occurs, max_occurs) = parse_occurs(&node)?;
    let element_ref = qname_attr(&node, "ref")?;
    let name = match (&element_ref, node.attribute("name")) {
        (_, Some(name)) => name.to_string(),
        (Some(r), None) => r.local.clone(),
        (None, None) => return Err(MetadataError::new("element without a name".to_string())),
    };

    let qualified = match node.attribute("form") {
        Some(form) => form == "qualified",
        None => ctx.qualified,
    };
    let namespace = match &element_ref {
        Some(r) => r.namespace.clone(),
        None if qualified => ctx.target_namespace.map(str::to_string),
        None => None,
    };

    let mut inline = None;
    for child in xsd_children(node) {
        match child.tag_name().name() {
            "complexType" => {
                inline = Some(Box::new(TypeDef::Complex(parse_complex_type(child, ctx)?)))
            }
            "simpleType" => inline = Some(Box::new(TypeDef::Simple(parse_simple_type(child)?))),
            _ => {}
        }
    }

    Ok(ElementDecl {
        name,
        namespace,
        type_ref: qname_attr(&node, "type")?,
        element_ref,
        inline,
        min_occurs,
        max_occurs,
        nillable: node.attribute("nillable") == Some("true"),
    })
}

fn unsupported(node: &Node, owner: Option<&str>) -> MetadataError {
    MetadataError::new(format!(
        "unsupported content model xs:{} in '{}'",
        node.tag_name().name(),
        owner.unwrap_or("(anonymous)")
    ))
}

/// Collect the elements of a `sequence`/`all` group, flattening nested groups.
fn parse_group(
    group: Node,
    ctx: &Context,
    owner: Option<&str>,
    out: &mut Vec<ElementDecl>,
) -> Result<(), MetadataError> {
    let (_, max) = parse_occurs(&group)?;
    if max.repeats() {
        return Err(MetadataError::new(format!(
            "repeating model group in '{}' is not supported",
            owner.unwrap_or("(anonymous)")
        )));
    }
    for child in xsd_children(group) {
        match child.tag_name().name() {
            "element" => out.push(parse_element(child, ctx)?),
            "sequence" | "all" => parse_group(child, ctx, owner, out)?,
            "choice" | "any" | "group" => return Err(unsupported(&child, owner)),
            _ => {}
        }
    }
    Ok(())
}

/// Content of a complex type or of its extension.
fn parse_content(
    container: Node,
    ctx: &Context,
    owner: Option<&str>,
    out: &mut Vec<ElementDecl>,
) -> Result<(), MetadataError> {
    for child in xsd_children(container) {
        match child.tag_name().name() {
            "sequence" | "all" => parse_group(child, ctx, owner, out)?,
            "choice" | "group" | "any" | "simpleContent" => {
                return Err(unsupported(&child, owner))
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_complex_type(node: Node, ctx: &Context) -> Result<ComplexTypeDecl, MetadataError> {
    let name = node.attribute("name").map(str::to_string);
    let owner = name.as_deref();
    let mut particles = Vec::new();
    let mut base = None;

    match xsd_children(node).find(|c| c.tag_name().name() == "complexContent") {
        Some(content) => {
            let derivation = xsd_children(content)
                .find(|c| matches!(c.tag_name().name(), "extension" | "restriction"))
                .ok_or_else(|| MetadataError::new("empty complexContent".to_string()))?;
            if derivation.tag_name().name() != "extension" {
                return Err(MetadataError::new(format!(
                    "complexContent restriction of '{}' is not supported",
                    owner.unwrap_or("(anonymous)")
                )));
            }
            base = qname_attr(&derivation, "base")?;
            parse_content(derivation, ctx, owner, &mut particles)?;
        }
        None => parse_content(node, ctx, owner, &mut particles)?,
    }

    Ok(ComplexTypeDecl {
        name,
        base,
        particles,
    })
}

fn parse_simple_type(node: Node) -> Result<SimpleTypeDecl, MetadataError> {
    let name = node.attribute("name").map(str::to_string);
    let mut decl = SimpleTypeDecl {
        name,
        base: None,
        enumeration: Vec::new(),
    };
    for child in xsd_children(node) {
        match child.tag_name().name() {
            "restriction" => {
                decl.base = qname_attr(&child, "base")?;
                decl.enumeration = xsd_children(child)
                    .filter(|f| f.tag_name().name() == "enumeration")
                    .filter_map(|f| f.attribute("value").map(str::to_string))
                    .collect();
            }
            "list" | "union" => {
                return Err(MetadataError::new(format!(
                    "xs:{} simple type '{}' is not supported",
                    child.tag_name().name(),
                    decl.name.as_deref().unwrap_or("(anonymous)")
                )))
            }
            _ => {}
        }
    }
    if decl.base.is_none() {
        return Err(MetadataError::new(format!(
            "simple type '{}' has no restriction base",
            decl.name.as_deref().unwrap_or("(anonymous)")
        )));
    }
    Ok(decl)
}

/// Parse a standalone schema document.
pub fn parse_schema_document(text: &str) -> Result<SchemaDoc, MetadataError> {
    let doc = roxmltree::Document::parse(text)
        .map_err(|e| MetadataError::new(format!("failed to parse XML: {}", e)))?;
    let root = doc.root_element();
    if !is_xsd(&root, "schema") {
        return Err(MetadataError::new(format!(
            "expected xs:schema, found <{}>",
            root.tag_name().name()
        )));
    }
    parse_schema(root)
}
