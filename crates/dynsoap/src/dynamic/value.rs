// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic value types.
//!
//! Every primitive has two textual forms: the *token* typed by an operator and
//! the *wire* lexical form used inside SOAP messages. They only differ for
//! `char`, which travels as its code point.

use crate::dynamic::PrimitiveKind;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

fn at(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}: ", path)
    }
}

/// A textual token could not be turned into a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueConversionError {
    #[error("{}cannot read '{token}' as {expected}", at(.path))]
    BadFormat {
        path: String,
        expected: String,
        token: String,
    },

    #[error("{}'{token}' is not one of [{}]", at(.path), .symbols.join(", "))]
    UnknownSymbol {
        path: String,
        token: String,
        symbols: Vec<String>,
    },
}

impl ValueConversionError {
    fn bad_format(kind: PrimitiveKind, token: &str) -> Self {
        Self::BadFormat {
            path: String::new(),
            expected: kind.display_name().to_string(),
            token: token.to_string(),
        }
    }

    /// Attach the dotted path of the offending leaf.
    pub fn at(mut self, leaf: &str) -> Self {
        match &mut self {
            Self::BadFormat { path, .. } | Self::UnknownSymbol { path, .. } => {
                *path = leaf.to_string();
            }
        }
        self
    }

    /// Path of the offending leaf.
    pub fn path(&self) -> &str {
        match self {
            Self::BadFormat { path, .. } | Self::UnknownSymbol { path, .. } => path,
        }
    }
}

/// Date and time, with or without a UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeValue {
    Offset(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

impl DateTimeValue {
    /// Parse an ISO-8601 timestamp (`2024-05-01T10:30:00`, with optional
    /// fraction and offset, or a bare `2024-05-01`).
    pub fn parse(text: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(Self::Offset(dt));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(Self::Local(dt));
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::Local)
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// A primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Validated decimal literal, kept as text to avoid rounding.
    Decimal(String),
    String(String),
    Char(char),
    Guid(Uuid),
    DateTime(DateTimeValue),
}

fn parse_float(token: &str) -> Option<f64> {
    match token {
        "INF" | "Infinity" | "+INF" => Some(f64::INFINITY),
        "-INF" | "-Infinity" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => {
            // Rust also accepts "inf"/"nan" spellings, which the wire form does not use.
            if token.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
                return None;
            }
            token.parse().ok()
        }
    }
}

fn format_float<T: fmt::Display>(
    v: T,
    nan: bool,
    infinite: Option<bool>,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    match (nan, infinite) {
        (true, _) => f.write_str("NaN"),
        (_, Some(true)) => f.write_str("-INF"),
        (_, Some(false)) => f.write_str("INF"),
        _ => write!(f, "{}", v),
    }
}

fn is_decimal(token: &str) -> bool {
    let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
    !(int.is_empty() && frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

impl PrimitiveValue {
    /// Parse an operator token with the canonical parser for `kind`.
    ///
    /// Strings are taken verbatim; every other kind ignores surrounding whitespace.
    pub fn parse(kind: PrimitiveKind, token: &str) -> Result<Self, ValueConversionError> {
        if kind == PrimitiveKind::String {
            return Ok(Self::String(token.to_string()));
        }
        let text = token.trim();
        let bad = || ValueConversionError::bad_format(kind, token);
        let value = match kind {
            PrimitiveKind::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "1" => Self::Bool(true),
                "false" | "0" => Self::Bool(false),
                _ => return Err(bad()),
            },
            PrimitiveKind::I8 => Self::I8(text.parse().map_err(|_| bad())?),
            PrimitiveKind::U8 => Self::U8(text.parse().map_err(|_| bad())?),
            PrimitiveKind::I16 => Self::I16(text.parse().map_err(|_| bad())?),
            PrimitiveKind::U16 => Self::U16(text.parse().map_err(|_| bad())?),
            PrimitiveKind::I32 => Self::I32(text.parse().map_err(|_| bad())?),
            PrimitiveKind::U32 => Self::U32(text.parse().map_err(|_| bad())?),
            PrimitiveKind::I64 => Self::I64(text.parse().map_err(|_| bad())?),
            PrimitiveKind::U64 => Self::U64(text.parse().map_err(|_| bad())?),
            PrimitiveKind::F32 => Self::F32(parse_float(text).ok_or_else(bad)? as f32),
            PrimitiveKind::F64 => Self::F64(parse_float(text).ok_or_else(bad)?),
            PrimitiveKind::Decimal if is_decimal(text) => Self::Decimal(text.to_string()),
            PrimitiveKind::Decimal => return Err(bad()),
            PrimitiveKind::Char => {
                // A lone space is a valid char.
                let source = if token.chars().count() == 1 { token } else { text };
                let mut chars = source.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::Char(c),
                    _ => return Err(bad()),
                }
            }
            PrimitiveKind::Guid => Self::Guid(Uuid::parse_str(text).map_err(|_| bad())?),
            PrimitiveKind::DateTime => Self::DateTime(DateTimeValue::parse(text).ok_or_else(bad)?),
            PrimitiveKind::String => Self::String(token.to_string()),
        };
        Ok(value)
    }

    /// Parse the wire lexical form found in a message.
    pub fn from_wire(kind: PrimitiveKind, text: &str) -> Result<Self, ValueConversionError> {
        match kind {
            PrimitiveKind::Char => text
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(Self::Char)
                .ok_or_else(|| ValueConversionError::bad_format(kind, text)),
            _ => Self::parse(kind, text),
        }
    }

    /// Wire lexical form.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Char(c) => u32::from(*c).to_string(),
            other => other.to_string(),
        }
    }

    /// Kind of this value.
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Bool(_) => PrimitiveKind::Bool,
            Self::I8(_) => PrimitiveKind::I8,
            Self::U8(_) => PrimitiveKind::U8,
            Self::I16(_) => PrimitiveKind::I16,
            Self::U16(_) => PrimitiveKind::U16,
            Self::I32(_) => PrimitiveKind::I32,
            Self::U32(_) => PrimitiveKind::U32,
            Self::I64(_) => PrimitiveKind::I64,
            Self::U64(_) => PrimitiveKind::U64,
            Self::F32(_) => PrimitiveKind::F32,
            Self::F64(_) => PrimitiveKind::F64,
            Self::Decimal(_) => PrimitiveKind::Decimal,
            Self::String(_) => PrimitiveKind::String,
            Self::Char(_) => PrimitiveKind::Char,
            Self::Guid(_) => PrimitiveKind::Guid,
            Self::DateTime(_) => PrimitiveKind::DateTime,
        }
    }
}

/// Token form.
impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::I8(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => format_float(v, v.is_nan(), v.is_infinite().then(|| *v < 0.0), f),
            Self::F64(v) => format_float(v, v.is_nan(), v.is_infinite().then(|| *v < 0.0), f),
            Self::Decimal(v) | Self::String(v) => f.write_str(v),
            Self::Char(c) => write!(f, "{}", c),
            Self::Guid(g) => write!(f, "{}", g.hyphenated()),
            Self::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

/// A value tree mirroring the shape of a [`TypeDescriptor`](crate::dynamic::TypeDescriptor).
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Primitive(PrimitiveValue),
    /// Declared enum symbol.
    Enum(String),
    /// Field values in declaration order.
    Record(Vec<(String, ValueNode)>),
    Sequence(Vec<ValueNode>),
    /// Unset (omitted or nil on the wire).
    Absent,
}

impl ValueNode {
    /// Build a record value from `(name, value)` pairs.
    pub fn record<S: Into<String>>(fields: impl IntoIterator<Item = (S, ValueNode)>) -> Self {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn enum_symbol(symbol: impl Into<String>) -> Self {
        Self::Enum(symbol.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Primitive(PrimitiveValue::I32(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Primitive(PrimitiveValue::F64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Primitive(PrimitiveValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ValueNode]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Get a record field by name.
    pub fn field(&self, name: &str) -> Option<&ValueNode> {
        match self {
            Self::Record(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short name of the node's variant, for diagnostics.
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Enum(_) => "enum",
            Self::Record(_) => "record",
            Self::Sequence(_) => "sequence",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{}", p),
            Self::Enum(symbol) => f.write_str(symbol),
            Self::Record(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str("}")
            }
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Absent => f.write_str("null"),
        }
    }
}

impl From<PrimitiveValue> for ValueNode {
    fn from(v: PrimitiveValue) -> Self {
        Self::Primitive(v)
    }
}

impl From<bool> for ValueNode {
    fn from(v: bool) -> Self {
        Self::Primitive(PrimitiveValue::Bool(v))
    }
}

impl From<i32> for ValueNode {
    fn from(v: i32) -> Self {
        Self::Primitive(PrimitiveValue::I32(v))
    }
}

impl From<i64> for ValueNode {
    fn from(v: i64) -> Self {
        Self::Primitive(PrimitiveValue::I64(v))
    }
}

impl From<f64> for ValueNode {
    fn from(v: f64) -> Self {
        Self::Primitive(PrimitiveValue::F64(v))
    }
}

impl From<&str> for ValueNode {
    fn from(v: &str) -> Self {
        Self::Primitive(PrimitiveValue::String(v.to_string()))
    }
}

impl From<String> for ValueNode {
    fn from(v: String) -> Self {
        Self::Primitive(PrimitiveValue::String(v))
    }
}

impl From<Uuid> for ValueNode {
    fn from(v: Uuid) -> Self {
        Self::Primitive(PrimitiveValue::Guid(v))
    }
}

impl<T: Into<ValueNode>> From<Vec<T>> for ValueNode {
    fn from(v: Vec<T>) -> Self {
        Self::Sequence(v.into_iter().map(Into::into).collect())
    }
}
