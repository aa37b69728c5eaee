// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Resolution of a merged document set into a [`ServiceDescriptor`].
//!
//! Complex types, named or anonymous, are declared before their fields are
//! resolved, so a type that refers to itself (directly or through others)
//! resolves to a shared record instead of recursing forever. Simple and
//! `ArrayOf` types have no record to share and are rejected when they loop.

use super::schema::{ComplexTypeDecl, ElementDecl, SchemaDoc, SimpleTypeDecl, TypeDef, XSD_NS};
use super::wsdl::{BindingDecl, BindingProtocol, MessageDecl, PartDecl, PortTypeDecl, WsdlDoc};
use super::{
    EndpointDescriptor, MessageLayout, MetadataError, OperationBinding, OperationDescriptor,
    ServiceDescriptor,
};
use crate::dynamic::{
    FieldDescriptor, PrimitiveKind, RecordDescriptor, SequenceDescriptor, TypeDescriptor,
    TypeKind, XmlName,
};
use crate::events::{EventSink, ProxyEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Namespaces whose `guid`/`char` types map to primitives.
const MS_SERIALIZATION_NS: &str = "http://schemas.microsoft.com/2003/10/Serialization/";
const MS_WSDL_TYPES_NS: &str = "http://microsoft.com/wsdl/types/";

/// Every document reached from the discovery address.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub wsdls: Vec<WsdlDoc>,
    /// Standalone schemas (embedded ones stay in their WSDL).
    pub schemas: Vec<SchemaDoc>,
}

impl DocumentSet {
    fn all_schemas(&self) -> impl Iterator<Item = &SchemaDoc> {
        self.wsdls
            .iter()
            .flat_map(|w| w.schemas.iter())
            .chain(self.schemas.iter())
    }
}

struct Index<'d> {
    elements: HashMap<XmlName, &'d ElementDecl>,
    complex_types: HashMap<XmlName, &'d ComplexTypeDecl>,
    simple_types: HashMap<XmlName, &'d SimpleTypeDecl>,
    messages: HashMap<&'d XmlName, &'d MessageDecl>,
    port_types: HashMap<&'d XmlName, &'d PortTypeDecl>,
    bindings: HashMap<&'d XmlName, &'d BindingDecl>,
}

impl<'d> Index<'d> {
    fn build(docs: &'d DocumentSet) -> Self {
        let mut index = Index {
            elements: HashMap::new(),
            complex_types: HashMap::new(),
            simple_types: HashMap::new(),
            messages: HashMap::new(),
            port_types: HashMap::new(),
            bindings: HashMap::new(),
        };
        for schema in docs.all_schemas() {
            let ns = schema.target_namespace.as_deref();
            for element in &schema.elements {
                index
                    .elements
                    .entry(XmlName::new(ns, element.name.clone()))
                    .or_insert(element);
            }
            for ty in &schema.complex_types {
                if let Some(name) = &ty.name {
                    index
                        .complex_types
                        .entry(XmlName::new(ns, name.clone()))
                        .or_insert(ty);
                }
            }
            for ty in &schema.simple_types {
                if let Some(name) = &ty.name {
                    index
                        .simple_types
                        .entry(XmlName::new(ns, name.clone()))
                        .or_insert(ty);
                }
            }
        }
        for wsdl in &docs.wsdls {
            for m in &wsdl.messages {
                index.messages.insert(&m.name, m);
            }
            for p in &wsdl.port_types {
                index.port_types.insert(&p.name, p);
            }
            for b in &wsdl.bindings {
                index.bindings.insert(&b.name, b);
            }
        }
        index
    }
}

/// Memoizing type resolver.
struct TypeResolver<'d> {
    index: Index<'d>,
    named: HashMap<XmlName, Arc<TypeDescriptor>>,
    /// Anonymous complex types, keyed by the address of their declaration.
    anonymous: HashMap<*const ComplexTypeDecl, Arc<TypeDescriptor>>,
    /// Named types that cannot be declared ahead and are being resolved.
    pending: HashSet<XmlName>,
}

impl<'d> TypeResolver<'d> {
    fn new(index: Index<'d>) -> Self {
        Self {
            index,
            named: HashMap::new(),
            anonymous: HashMap::new(),
            pending: HashSet::new(),
        }
    }

    /// Runs `resolve` for `name` unless `name` is already being resolved.
    fn guarded<T>(
        &mut self,
        name: &XmlName,
        resolve: impl FnOnce(&mut Self) -> Result<T, MetadataError>,
    ) -> Result<T, MetadataError> {
        if !self.pending.insert(name.clone()) {
            return Err(MetadataError::new(format!("type {} refers to itself", name)));
        }
        let result = resolve(self);
        self.pending.remove(name);
        result
    }

    fn named_type(&mut self, name: &XmlName) -> Result<Arc<TypeDescriptor>, MetadataError> {
        if let Some(desc) = self.named.get(name) {
            return Ok(desc.clone());
        }

        let ns = name.namespace.as_deref();
        if ns == Some(XSD_NS) {
            let kind = PrimitiveKind::from_xsd(&name.local).ok_or_else(|| {
                MetadataError::new(format!("built-in type xs:{} is not supported", name.local))
            })?;
            return Ok(self.remember(name, TypeDescriptor::primitive(kind)));
        }
        if ns == Some(MS_SERIALIZATION_NS) || ns == Some(MS_WSDL_TYPES_NS) {
            let kind = match name.local.as_str() {
                "guid" => Some(PrimitiveKind::Guid),
                "char" => Some(PrimitiveKind::Char),
                _ => None,
            };
            if let Some(kind) = kind {
                return Ok(self.remember(name, TypeDescriptor::primitive(kind)));
            }
        }

        if let Some(decl) = self.index.complex_types.get(name).copied() {
            return self.complex_type(Some(name), &name.local, decl);
        }
        if let Some(decl) = self.index.simple_types.get(name).copied() {
            let desc = self.guarded(name, |this| this.simple_type(&name.local, decl))?;
            return Ok(self.remember(name, desc));
        }
        Err(MetadataError::new(format!("unresolved type {}", name)))
    }

    fn remember(&mut self, name: &XmlName, desc: TypeDescriptor) -> Arc<TypeDescriptor> {
        let desc = Arc::new(desc);
        self.named.insert(name.clone(), desc.clone());
        desc
    }

    fn simple_type(
        &mut self,
        name: &str,
        decl: &SimpleTypeDecl,
    ) -> Result<TypeDescriptor, MetadataError> {
        if !decl.enumeration.is_empty() {
            return Ok(TypeDescriptor::enumeration(name, decl.enumeration.clone()));
        }
        let base = decl
            .base
            .as_ref()
            .ok_or_else(|| MetadataError::new(format!("simple type '{}' has no base", name)))?;
        let base = self.named_type(base)?;
        Ok(TypeDescriptor::new(name, base.kind.clone()))
    }

    /// `ArrayOfX` wrapper types hold exactly one repeated element.
    fn array_item(decl: &ComplexTypeDecl) -> Option<&ElementDecl> {
        let name = decl.name.as_deref().unwrap_or_default();
        match decl.particles.as_slice() {
            [item]
                if decl.base.is_none()
                    && name.starts_with("ArrayOf")
                    && item.max_occurs.repeats() =>
            {
                Some(item)
            }
            _ => None,
        }
    }

    /// Resolve a complex type; anonymous types are named after their element.
    fn complex_type(
        &mut self,
        name: Option<&XmlName>,
        type_name: &str,
        decl: &'d ComplexTypeDecl,
    ) -> Result<Arc<TypeDescriptor>, MetadataError> {
        let key: *const ComplexTypeDecl = decl;
        if name.is_none() {
            if let Some(desc) = self.anonymous.get(&key) {
                return Ok(desc.clone());
            }
        }

        if let Some(item) = Self::array_item(decl) {
            let (element, _) = match name {
                Some(n) => self.guarded(n, |this| this.element_type(item))?,
                None => self.element_type(item)?,
            };
            let seq = SequenceDescriptor::wrapped(
                element,
                XmlName::new(item.namespace.as_deref(), item.name.clone()),
            );
            let desc = TypeDescriptor::new(type_name, TypeKind::Sequence(seq));
            return Ok(match name {
                Some(n) => self.remember(n, desc),
                None => Arc::new(desc),
            });
        }

        let record = RecordDescriptor::declare(type_name);
        let desc = Arc::new(TypeDescriptor::record(record.clone()));
        match name {
            Some(n) => self.named.insert(n.clone(), desc.clone()),
            None => self.anonymous.insert(key, desc.clone()),
        };

        let mut fields = Vec::new();
        if let Some(base) = &decl.base {
            let base_desc = self.named_type(base)?;
            let base_record = base_desc.as_record().ok_or_else(|| {
                MetadataError::new(format!("'{}' extends non-record type {}", record.name, base))
            })?;
            if !base_record.is_defined() {
                return Err(MetadataError::new(format!(
                    "'{}' extends itself through {}",
                    record.name, base
                )));
            }
            fields.extend(base_record.fields().iter().cloned());
        }
        for particle in &decl.particles {
            fields.push(self.field(particle)?);
        }
        record
            .define(fields)
            .map_err(|e| MetadataError::new(e.to_string()))?;
        Ok(desc)
    }

    /// Type of an element's content, and the element it came from when it was a `ref`.
    fn element_type(
        &mut self,
        element: &'d ElementDecl,
    ) -> Result<(Arc<TypeDescriptor>, &'d ElementDecl), MetadataError> {
        if let Some(target) = &element.element_ref {
            let referenced = self
                .index
                .elements
                .get(target)
                .copied()
                .ok_or_else(|| MetadataError::new(format!("unresolved element {}", target)))?;
            if referenced.element_ref.is_some() {
                return Err(MetadataError::new(format!(
                    "element reference chain at {}",
                    target
                )));
            }
            return Ok((self.element_type(referenced)?.0, referenced));
        }
        if let Some(type_ref) = &element.type_ref {
            return Ok((self.named_type(type_ref)?, element));
        }
        match element.inline.as_deref() {
            Some(TypeDef::Complex(decl)) => {
                Ok((self.complex_type(None, &element.name, decl)?, element))
            }
            Some(TypeDef::Simple(decl)) => {
                Ok((Arc::new(self.simple_type(&element.name, decl)?), element))
            }
            None => Err(MetadataError::new(format!(
                "element '{}' has no type (xs:anyType is not supported)",
                element.name
            ))),
        }
    }

    fn field(&mut self, element: &'d ElementDecl) -> Result<FieldDescriptor, MetadataError> {
        let (mut type_desc, _) = self.element_type(element)?;
        if element.max_occurs.repeats() {
            type_desc = Arc::new(TypeDescriptor::sequence(type_desc));
        }
        let mut field = FieldDescriptor::new(element.name.clone(), type_desc);
        field.namespace = element.namespace.clone();
        field.optional = element.min_occurs == 0;
        field.nillable = element.nillable;
        Ok(field)
    }

    fn top_element(&self, name: &XmlName) -> Result<&'d ElementDecl, MetadataError> {
        self.index
            .elements
            .get(name)
            .copied()
            .ok_or_else(|| MetadataError::new(format!("unresolved element {}", name)))
    }

    /// Field for a message part.
    fn part_field(&mut self, part: &PartDecl) -> Result<FieldDescriptor, MetadataError> {
        match (&part.element, &part.type_ref) {
            (Some(element), _) => {
                let decl = self.top_element(element)?;
                let mut field = self.field(decl)?;
                field.namespace = element.namespace.clone();
                Ok(field)
            }
            (None, Some(type_ref)) => Ok(FieldDescriptor::new(
                part.name.clone(),
                self.named_type(type_ref)?,
            )),
            (None, None) => Err(MetadataError::new(format!(
                "part '{}' has neither element nor type",
                part.name
            ))),
        }
    }

    fn message(&self, name: &XmlName) -> Result<&'d MessageDecl, MetadataError> {
        self.index
            .messages
            .get(name)
            .copied()
            .ok_or_else(|| MetadataError::new(format!("unresolved message {}", name)))
    }

    /// Wrapper element of a single-part message, if its element is named `expected`.
    fn wrapper(
        &mut self,
        message: &MessageDecl,
        expected: &str,
    ) -> Result<Option<(XmlName, Arc<TypeDescriptor>)>, MetadataError> {
        let [part] = message.parts.as_slice() else {
            return Ok(None);
        };
        let Some(element) = &part.element else {
            return Ok(None);
        };
        if element.local != expected {
            return Ok(None);
        }
        let decl = self.top_element(element)?;
        let (desc, _) = self.element_type(decl)?;
        if desc.is_record() && !decl.max_occurs.repeats() {
            Ok(Some((element.clone(), desc)))
        } else {
            Ok(None)
        }
    }

    fn operation(
        &mut self,
        name: &str,
        input: Option<&XmlName>,
        output: Option<&XmlName>,
        soap_action: String,
    ) -> Result<OperationDescriptor, MetadataError> {
        let (parameters, request) = match input {
            None => (Vec::new(), MessageLayout::Bare),
            Some(input) => {
                let message = self.message(input)?;
                match self.wrapper(message, name)? {
                    Some((element, desc)) => (
                        desc.fields().map(<[FieldDescriptor]>::to_vec).unwrap_or_default(),
                        MessageLayout::Wrapped { element },
                    ),
                    None => (
                        message
                            .parts
                            .iter()
                            .map(|p| self.part_field(p))
                            .collect::<Result<Vec<_>, _>>()?,
                        MessageLayout::Bare,
                    ),
                }
            }
        };

        let (result, response) = match output {
            None => (None, MessageLayout::Bare),
            Some(output) => {
                let message = self.message(output)?;
                let wrapped = self.wrapper(message, &format!("{}Response", name))?;
                match wrapped {
                    Some((element, desc)) if desc.fields().map_or(0, <[_]>::len) <= 1 => (
                        desc.fields().and_then(|f| f.first()).cloned(),
                        MessageLayout::Wrapped { element },
                    ),
                    _ => match message.parts.as_slice() {
                        [] => (None, MessageLayout::Bare),
                        [part] => (Some(self.part_field(part)?), MessageLayout::Bare),
                        _ => {
                            return Err(MetadataError::new(format!(
                                "operation '{}' returns {} parts",
                                name,
                                message.parts.len()
                            )))
                        }
                    },
                }
            }
        };

        Ok(OperationDescriptor {
            name: name.to_string(),
            parameters,
            result,
            binding: OperationBinding {
                soap_action,
                request,
                response,
            },
        })
    }
}

/// Why a port cannot be served by the interpreter, if it cannot.
fn unusable(binding: &BindingDecl) -> Option<String> {
    match binding.protocol {
        BindingProtocol::Soap11 => {}
        BindingProtocol::Soap12 => return Some("SOAP 1.2 binding".to_string()),
        BindingProtocol::Other => return Some("not a SOAP binding".to_string()),
    }
    for op in &binding.operations {
        let style = op.style.as_deref().or(binding.style.as_deref()).unwrap_or("document");
        if style != "document" {
            return Some(format!("operation '{}' uses {} style", op.name, style));
        }
        for body_use in [&op.input_use, &op.output_use].into_iter().flatten() {
            if body_use != "literal" {
                return Some(format!("operation '{}' uses {} encoding", op.name, body_use));
            }
        }
    }
    None
}

/// Build the service description from every reachable document.
pub fn build_service(
    uri: &str,
    docs: &DocumentSet,
    events: &dyn EventSink,
) -> Result<ServiceDescriptor, MetadataError> {
    let mut resolver = TypeResolver::new(Index::build(docs));
    let mut endpoints: Vec<EndpointDescriptor> = Vec::new();
    let mut seen = HashSet::new();

    for service in docs.wsdls.iter().flat_map(|w| w.services.iter()) {
        for port in &service.ports {
            let binding = resolver
                .index
                .bindings
                .get(&port.binding)
                .copied()
                .ok_or_else(|| MetadataError::new(format!("unresolved binding {}", port.binding)))?;

            if let Some(reason) = unusable(binding) {
                events.emit(ProxyEvent::EndpointSkipped {
                    endpoint: port.name.clone(),
                    reason,
                });
                continue;
            }
            if !seen.insert(port.name.clone()) {
                return Err(MetadataError::new(format!(
                    "endpoint name '{}' is used twice",
                    port.name
                )));
            }

            let address = port.address.clone().ok_or_else(|| {
                MetadataError::new(format!("endpoint '{}' has no address", port.name))
            })?;
            let port_type = resolver
                .index
                .port_types
                .get(&binding.port_type)
                .copied()
                .ok_or_else(|| {
                    MetadataError::new(format!("unresolved port type {}", binding.port_type))
                })?;

            let mut operations: Vec<OperationDescriptor> = Vec::new();
            for op in &port_type.operations {
                if operations.iter().any(|o| o.name == op.name) {
                    return Err(MetadataError::new(format!(
                        "operation '{}' is declared twice in '{}'",
                        op.name, port.name
                    )));
                }
                let soap_action = binding
                    .operations
                    .iter()
                    .find(|b| b.name == op.name)
                    .and_then(|b| b.soap_action.clone())
                    .unwrap_or_default();
                operations.push(resolver.operation(
                    &op.name,
                    op.input.as_ref(),
                    op.output.as_ref(),
                    soap_action,
                )?);
            }

            endpoints.push(EndpointDescriptor {
                name: port.name.clone(),
                address,
                operations,
            });
        }
    }

    if endpoints.is_empty() {
        return Err(MetadataError::new(
            "no SOAP 1.1 document/literal endpoint found".to_string(),
        ));
    }

    Ok(ServiceDescriptor {
        uri: uri.to_string(),
        endpoints,
    })
}
