// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for discovered parameter and return types.

use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Errors raised while assembling descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("record '{record}' declares field '{field}' more than once")]
    DuplicateField { record: String, field: String },

    #[error("record '{0}' is already defined")]
    AlreadyDefined(String),
}

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Decimal,
    String,
    Char,
    Guid,
    DateTime,
}

impl PrimitiveKind {
    /// Name shown in prompts and parameter lists.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::I64 => "int64",
            Self::U64 => "uint64",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Char => "char",
            Self::Guid => "guid",
            Self::DateTime => "datetime",
        }
    }

    /// Map an XML Schema built-in type name to a primitive kind.
    pub fn from_xsd(local_name: &str) -> Option<Self> {
        let kind = match local_name {
            "boolean" => Self::Bool,
            "byte" => Self::I8,
            "unsignedByte" => Self::U8,
            "short" => Self::I16,
            "unsignedShort" => Self::U16,
            "int" => Self::I32,
            "unsignedInt" => Self::U32,
            "long" | "integer" => Self::I64,
            "unsignedLong" | "nonNegativeInteger" | "positiveInteger" => Self::U64,
            "float" => Self::F32,
            "double" => Self::F64,
            "decimal" => Self::Decimal,
            "string" | "normalizedString" | "token" | "anyURI" | "NCName" | "Name" | "QName"
            | "language" | "ID" | "IDREF" | "NMTOKEN" => Self::String,
            "dateTime" => Self::DateTime,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Namespace-qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlName {
    /// Namespace URI (None = no namespace).
    pub namespace: Option<String>,
    /// Local part.
    pub local: String,
}

impl XmlName {
    pub fn new(namespace: Option<&str>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            local: local.into(),
        }
    }

    /// Name without a namespace.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Type kind enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// Primitive type.
    Primitive(PrimitiveKind),
    /// Enumeration with an ordered symbol list.
    Enum(EnumDescriptor),
    /// Record with named fields. Shared so that recursive types can refer back to it.
    Record(Arc<RecordDescriptor>),
    /// Sequence (fixed array or growable list).
    Sequence(SequenceDescriptor),
}

/// A complete type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type name (schema name, or the element name for anonymous types).
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
}

impl TypeDescriptor {
    /// Create a new type descriptor.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a primitive type descriptor named after its kind.
    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(kind.display_name(), TypeKind::Primitive(kind))
    }

    /// Create an enumeration descriptor.
    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::new(name, TypeKind::Enum(EnumDescriptor::new(symbols)))
    }

    /// Create a record descriptor around an existing record.
    pub fn record(record: Arc<RecordDescriptor>) -> Self {
        Self::new(record.name.clone(), TypeKind::Record(record))
    }

    /// Create an unwrapped sequence of `element`.
    pub fn sequence(element: Arc<TypeDescriptor>) -> Self {
        let name = format!("{}[]", element.name);
        Self::new(name, TypeKind::Sequence(SequenceDescriptor::repeated(element)))
    }

    /// Check if this is a primitive type.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_))
    }

    /// Check if this is a record type.
    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    /// Primitives and enums are leaves of the value tree.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(_) | TypeKind::Enum(_))
    }

    /// Get the record if this is one.
    pub fn as_record(&self) -> Option<&Arc<RecordDescriptor>> {
        match &self.kind {
            TypeKind::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Get fields if this is a record.
    pub fn fields(&self) -> Option<&[FieldDescriptor]> {
        self.as_record().map(|r| r.fields())
    }

    /// Get field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields()?.iter().find(|f| f.name == name)
    }

    /// Short human readable shape, e.g. `int32`, `MyClass`, `ArrayOfInt (int32[])`.
    pub fn describe(&self) -> String {
        match &self.kind {
            TypeKind::Primitive(p) => p.display_name().to_string(),
            TypeKind::Enum(e) => format!("{} {{{}}}", self.name, e.symbols.join(", ")),
            TypeKind::Record(_) => self.name.clone(),
            TypeKind::Sequence(seq) => {
                let element = match &seq.element.kind {
                    TypeKind::Primitive(p) => p.display_name().to_string(),
                    _ => seq.element.name.clone(),
                };
                match seq.length {
                    Some(n) => format!("{}[{}]", element, n),
                    None => format!("{}[]", element),
                }
            }
        }
    }
}

/// Stable identity of a record, used to detect recursive types on a traversal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(usize);

/// Record (struct-like) type descriptor.
///
/// Fields are set once. A record may be declared first and defined later, which
/// is how self-referential schema types are represented.
pub struct RecordDescriptor {
    /// Record name.
    pub name: String,
    fields: OnceLock<Vec<FieldDescriptor>>,
}

impl RecordDescriptor {
    /// Create a fully defined record.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Arc<Self>, DescriptorError> {
        let record = Self::declare(name);
        record.define(fields)?;
        Ok(record)
    }

    /// Declare a record whose fields are provided later with [`define`](Self::define).
    pub fn declare(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fields: OnceLock::new(),
        })
    }

    /// Set the field list. Field names must be unique.
    pub fn define(&self, fields: Vec<FieldDescriptor>) -> Result<(), DescriptorError> {
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(DescriptorError::DuplicateField {
                    record: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        self.fields
            .set(fields)
            .map_err(|_| DescriptorError::AlreadyDefined(self.name.clone()))
    }

    /// Fields in declaration order (empty while only declared).
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.fields.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether [`define`](Self::define) has been called.
    pub fn is_defined(&self) -> bool {
        self.fields.get().is_some()
    }

    /// Identity of this record.
    pub fn id(self: &Arc<Self>) -> RecordId {
        RecordId(Arc::as_ptr(self) as usize)
    }

    /// Get field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|f| f.name == name)
    }
}

// Records can be cyclic, so equality and Debug stop at the record boundary.
impl PartialEq for RecordDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields().iter().map(|f| f.name.as_str()).collect();
        f.debug_struct("RecordDescriptor")
            .field("name", &self.name)
            .field("fields", &names)
            .finish()
    }
}

/// Field descriptor for record members and operation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field (element) name.
    pub name: String,
    /// Field type.
    pub type_desc: Arc<TypeDescriptor>,
    /// Element namespace on the wire (None = unqualified).
    pub namespace: Option<String>,
    /// May be left out of the message (minOccurs="0").
    pub optional: bool,
    /// May be sent as an explicit nil.
    pub nillable: bool,
}

impl FieldDescriptor {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, type_desc: Arc<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            type_desc,
            namespace: None,
            optional: false,
            nillable: false,
        }
    }

    /// Set the element namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Mark as optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark as nillable.
    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }

    /// Whether an Absent value is acceptable for this field.
    pub fn accepts_absent(&self) -> bool {
        self.optional || self.nillable
    }

    /// Qualified element name.
    pub fn xml_name(&self) -> XmlName {
        XmlName::new(self.namespace.as_deref(), self.name.clone())
    }
}

/// Sequence type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceDescriptor {
    /// Element type.
    pub element: Arc<TypeDescriptor>,
    /// Item element name when the sequence is wrapped in its own element
    /// (`<ints><int>1</int></ints>`). None = the owning element repeats.
    pub item: Option<XmlName>,
    /// Fixed length (None = growable).
    pub length: Option<usize>,
}

impl SequenceDescriptor {
    /// Create an unwrapped, growable sequence.
    pub fn repeated(element: Arc<TypeDescriptor>) -> Self {
        Self {
            element,
            item: None,
            length: None,
        }
    }

    /// Create a wrapped, growable sequence.
    pub fn wrapped(element: Arc<TypeDescriptor>, item: XmlName) -> Self {
        Self {
            element,
            item: Some(item),
            length: None,
        }
    }

    /// Fix the length.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Whether the sequence has a fixed length.
    pub fn fixed_length(&self) -> bool {
        self.length.is_some()
    }
}

/// Enumeration type descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    /// Symbols in declaration order.
    pub symbols: Vec<String>,
}

impl EnumDescriptor {
    /// Create enum descriptor.
    pub fn new<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve a token to its declared symbol.
    ///
    /// Exact matches win; otherwise the match is case-insensitive and must be unique.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        if let Some(exact) = self.symbols.iter().find(|s| s.as_str() == token) {
            return Some(exact);
        }
        let lowered = token.to_lowercase();
        let mut matches = self.symbols.iter().filter(|s| s.to_lowercase() == lowered);
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}
