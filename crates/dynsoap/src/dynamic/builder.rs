// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for TypeDescriptor.

use crate::dynamic::{
    DescriptorError, FieldDescriptor, PrimitiveKind, RecordDescriptor, SequenceDescriptor,
    TypeDescriptor, TypeKind, XmlName,
};
use std::sync::Arc;

/// Builder for record types.
#[derive(Debug)]
pub struct RecordBuilder {
    name: String,
    namespace: Option<String>,
    fields: Vec<FieldDescriptor>,
}

impl RecordBuilder {
    /// Create a new builder for a record type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            fields: Vec::new(),
        }
    }

    /// Qualify fields added after this call with `namespace`.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    fn push(mut self, field: FieldDescriptor) -> Self {
        let field = match &self.namespace {
            Some(ns) if field.namespace.is_none() => field.with_namespace(ns.clone()),
            _ => field,
        };
        self.fields.push(field);
        self
    }

    /// Add a primitive field.
    pub fn field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        let type_desc = Arc::new(TypeDescriptor::primitive(kind));
        self.push(FieldDescriptor::new(name, type_desc))
    }

    /// Add a field with a type descriptor.
    pub fn field_with_type(self, name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        self.push(FieldDescriptor::new(name, type_desc))
    }

    /// Add an optional primitive field.
    pub fn optional_field(self, name: impl Into<String>, kind: PrimitiveKind) -> Self {
        let type_desc = Arc::new(TypeDescriptor::primitive(kind));
        self.push(FieldDescriptor::new(name, type_desc).optional())
    }

    /// Add a string field.
    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, PrimitiveKind::String)
    }

    /// Add an unwrapped (repeated element) sequence field.
    pub fn sequence_field(self, name: impl Into<String>, element_kind: PrimitiveKind) -> Self {
        let element = Arc::new(TypeDescriptor::primitive(element_kind));
        self.push(FieldDescriptor::new(name, Arc::new(TypeDescriptor::sequence(element))))
    }

    /// Add a wrapped sequence field, `ArrayOf<item>` style.
    pub fn wrapped_sequence_field(
        self,
        name: impl Into<String>,
        element: Arc<TypeDescriptor>,
        item: XmlName,
    ) -> Self {
        let type_name = format!("ArrayOf{}", item.local);
        let seq = SequenceDescriptor::wrapped(element, item);
        let type_desc = Arc::new(TypeDescriptor::new(type_name, TypeKind::Sequence(seq)));
        self.push(FieldDescriptor::new(name, type_desc).optional())
    }

    /// Add a fixed-length sequence field.
    pub fn array_field(
        self,
        name: impl Into<String>,
        element_kind: PrimitiveKind,
        length: usize,
    ) -> Self {
        let element = Arc::new(TypeDescriptor::primitive(element_kind));
        let seq = SequenceDescriptor::repeated(element).with_length(length);
        let type_name = format!("{}[{}]", element_kind.display_name(), length);
        let type_desc = Arc::new(TypeDescriptor::new(type_name, TypeKind::Sequence(seq)));
        self.push(FieldDescriptor::new(name, type_desc))
    }

    /// Add a nested record or enum field.
    pub fn nested_field(self, name: impl Into<String>, nested: Arc<TypeDescriptor>) -> Self {
        self.field_with_type(name, nested)
    }

    /// Build the record descriptor.
    pub fn build_record(self) -> Result<Arc<RecordDescriptor>, DescriptorError> {
        RecordDescriptor::new(self.name, self.fields)
    }

    /// Build the TypeDescriptor.
    pub fn build(self) -> Result<TypeDescriptor, DescriptorError> {
        self.build_record().map(TypeDescriptor::record)
    }
}

/// Builder for enum types.
#[derive(Debug)]
pub struct EnumBuilder {
    name: String,
    symbols: Vec<String>,
}

impl EnumBuilder {
    /// Create a new enum builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbols: Vec::new(),
        }
    }

    /// Add a symbol.
    pub fn symbol(mut self, name: impl Into<String>) -> Self {
        self.symbols.push(name.into());
        self
    }

    /// Build the TypeDescriptor.
    pub fn build(self) -> TypeDescriptor {
        TypeDescriptor::enumeration(self.name, self.symbols)
    }
}
