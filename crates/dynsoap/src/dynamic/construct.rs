// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value construction from per-leaf textual input.
//!
//! The constructor walks a type depth-first in declaration order and asks a
//! [`TokenSource`] for one token per leaf, plus an element count before each
//! growable sequence. Conversion failures are collected so that every bad
//! leaf is reported in one pass.

use crate::dynamic::flatten::{element_path, join_path};
use crate::dynamic::{
    CycleDetected, FieldDescriptor, PrimitiveKind, PrimitiveValue, RecordId, TypeDescriptor,
    TypeKind, ValueConversionError, ValueNode,
};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// What the constructor needs next.
#[derive(Debug, Clone, Copy)]
pub enum TokenKind<'a> {
    /// A primitive or enum value of this type.
    Leaf(&'a TypeDescriptor),
    /// Element count of the growable sequence at the request path.
    Count(&'a TypeDescriptor),
}

/// A request for one token.
#[derive(Debug, Clone, Copy)]
pub struct TokenRequest<'a> {
    /// Dotted path of the leaf (`c.I`, `items[2]`).
    pub path: &'a str,
    pub kind: TokenKind<'a>,
    /// An empty answer is accepted and means "not set".
    pub optional: bool,
}

impl TokenRequest<'_> {
    /// Human readable type of the expected token.
    pub fn type_name(&self) -> String {
        match self.kind {
            TokenKind::Leaf(desc) => desc.describe(),
            TokenKind::Count(desc) => format!("number of {} elements", desc.describe()),
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(self.kind, TokenKind::Count(_))
    }
}

/// Supplies tokens on demand (console prompt, UI form, scripted input).
pub trait TokenSource {
    /// Next token for `request`, or `None` when input has run out.
    fn next_token(&mut self, request: &TokenRequest<'_>) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: FnMut(&TokenRequest<'_>) -> Option<String>,
{
    fn next_token(&mut self, request: &TokenRequest<'_>) -> Option<String> {
        self(request)
    }
}

/// Tokens consumed in order, regardless of path.
#[derive(Debug, Clone, Default)]
pub struct TokenQueue {
    tokens: VecDeque<String>,
}

impl TokenQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push_back(token.into());
    }

    pub fn remaining(&self) -> usize {
        self.tokens.len()
    }
}

impl<S: Into<String>> FromIterator<S> for TokenQueue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl TokenSource for TokenQueue {
    fn next_token(&mut self, _request: &TokenRequest<'_>) -> Option<String> {
        self.tokens.pop_front()
    }
}

/// Tokens keyed by path, as filled in a form.
///
/// Missing leaves answer with an empty token. A sequence count is the value
/// stored at the sequence path, or else the number of consecutive `path[i]`
/// entries. A path inside a sequence element that has no entry at all is
/// unanswered, so a count larger than the given elements ends the input.
#[derive(Debug, Clone, Default)]
pub struct FieldValues {
    values: HashMap<String, String>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, token: impl Into<String>) {
        self.values.insert(path.into(), token.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    /// Whether any entry lies at or below `prefix`.
    fn covers(&self, prefix: &str) -> bool {
        self.values.keys().any(|k| {
            k.strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(&['.', '['][..]))
        })
    }

    /// Whether every sequence element enclosing `path` has an entry.
    fn elements_given(&self, path: &str) -> bool {
        path.match_indices(']')
            .all(|(end, _)| self.covers(&path[..=end]))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TokenSource for FieldValues {
    fn next_token(&mut self, request: &TokenRequest<'_>) -> Option<String> {
        if let Some(token) = self.values.get(request.path) {
            return Some(token.clone());
        }
        if !self.elements_given(request.path) {
            return None;
        }
        if request.is_count() {
            let count = (0..)
                .take_while(|i| self.covers(&element_path(request.path, *i)))
                .count();
            if count == 0 && request.optional {
                return Some(String::new());
            }
            return Some(count.to_string());
        }
        Some(String::new())
    }
}

/// Construction failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructError {
    /// One or more leaves could not be converted.
    #[error("{} invalid value(s): {}", .0.len(), render(.0))]
    Invalid(Vec<ValueConversionError>),

    #[error(transparent)]
    Cycle(#[from] CycleDetected),

    #[error("input ended before a value for '{0}' was given")]
    InputExhausted(String),
}

fn render(errors: &[ValueConversionError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConstructError {
    /// Conversion errors, empty for structural failures.
    pub fn conversion_errors(&self) -> &[ValueConversionError] {
        match self {
            Self::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

/// Construct a value of `desc`, rooted at the empty path.
pub fn construct<S: TokenSource + ?Sized>(
    desc: &TypeDescriptor,
    source: &mut S,
) -> Result<ValueNode, ConstructError> {
    let mut ctor = Constructor::new(source);
    let value = ctor.value(desc, "", false)?;
    ctor.finish(value)
}

/// Construct one argument per parameter, each rooted at its parameter name.
/// Errors from all parameters are reported together.
pub fn construct_arguments<S: TokenSource + ?Sized>(
    params: &[FieldDescriptor],
    source: &mut S,
) -> Result<Vec<ValueNode>, ConstructError> {
    let mut ctor = Constructor::new(source);
    let mut args = Vec::with_capacity(params.len());
    for param in params {
        args.push(ctor.value(&param.type_desc, &param.name, param.accepts_absent())?);
    }
    ctor.finish(args)
}

struct Constructor<'s, S: TokenSource + ?Sized> {
    source: &'s mut S,
    errors: Vec<ValueConversionError>,
    on_path: Vec<RecordId>,
}

impl<'s, S: TokenSource + ?Sized> Constructor<'s, S> {
    fn new(source: &'s mut S) -> Self {
        Self {
            source,
            errors: Vec::new(),
            on_path: Vec::new(),
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ConstructError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ConstructError::Invalid(self.errors))
        }
    }

    fn request(&mut self, request: TokenRequest<'_>) -> Result<String, ConstructError> {
        self.source
            .next_token(&request)
            .ok_or_else(|| ConstructError::InputExhausted(request.path.to_string()))
    }

    fn value(
        &mut self,
        desc: &TypeDescriptor,
        path: &str,
        optional: bool,
    ) -> Result<ValueNode, ConstructError> {
        match &desc.kind {
            TypeKind::Primitive(_) | TypeKind::Enum(_) => self.leaf(desc, path, optional),
            TypeKind::Record(record) => {
                let id = record.id();
                if self.on_path.contains(&id) {
                    return Err(CycleDetected {
                        path: path.to_string(),
                        record: record.name.clone(),
                    }
                    .into());
                }
                self.on_path.push(id);
                let mut fields = Vec::with_capacity(record.fields().len());
                for field in record.fields() {
                    let child = self.value(
                        &field.type_desc,
                        &join_path(path, &field.name),
                        field.accepts_absent(),
                    )?;
                    fields.push((field.name.clone(), child));
                }
                self.on_path.pop();
                Ok(ValueNode::Record(fields))
            }
            TypeKind::Sequence(seq) => {
                let count = match seq.length {
                    Some(n) => n,
                    None => {
                        let token = self.request(TokenRequest {
                            path,
                            kind: TokenKind::Count(desc),
                            optional,
                        })?;
                        let text = token.trim();
                        if optional && text.is_empty() {
                            return Ok(ValueNode::Absent);
                        }
                        match text.parse::<usize>() {
                            Ok(n) => n,
                            Err(_) => {
                                self.errors.push(ValueConversionError::BadFormat {
                                    path: path.to_string(),
                                    expected: "element count".to_string(),
                                    token,
                                });
                                return Ok(ValueNode::Absent);
                            }
                        }
                    }
                };
                let mut items = Vec::with_capacity(count.min(1024));
                for i in 0..count {
                    items.push(self.value(&seq.element, &element_path(path, i), false)?);
                }
                Ok(ValueNode::Sequence(items))
            }
        }
    }

    fn leaf(
        &mut self,
        desc: &TypeDescriptor,
        path: &str,
        optional: bool,
    ) -> Result<ValueNode, ConstructError> {
        let token = self.request(TokenRequest {
            path,
            kind: TokenKind::Leaf(desc),
            optional,
        })?;

        let is_string = matches!(desc.kind, TypeKind::Primitive(PrimitiveKind::String));
        if optional && !is_string && token.trim().is_empty() {
            return Ok(ValueNode::Absent);
        }

        let converted = match &desc.kind {
            TypeKind::Primitive(kind) => {
                PrimitiveValue::parse(*kind, &token).map(ValueNode::Primitive)
            }
            TypeKind::Enum(e) => match e.lookup(token.trim()) {
                Some(symbol) => Ok(ValueNode::Enum(symbol.to_string())),
                None => Err(ValueConversionError::UnknownSymbol {
                    path: String::new(),
                    token: token.clone(),
                    symbols: e.symbols.clone(),
                }),
            },
            _ => Ok(ValueNode::Absent),
        };

        match converted {
            Ok(value) => Ok(value),
            Err(e) => {
                self.errors.push(e.at(path));
                Ok(ValueNode::Absent)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{EnumBuilder, RecordBuilder, RecordDescriptor};
    use std::sync::Arc;

    fn describe_type() -> TypeDescriptor {
        let kind = Arc::new(
            EnumBuilder::new("Test")
                .symbol("One")
                .symbol("Two")
                .symbol("Three")
                .build(),
        );
        RecordBuilder::new("Widget")
            .string_field("Name")
            .nested_field("Kind", kind)
            .build()
            .expect("record")
    }

    #[test]
    fn test_construct_record_with_enum() {
        let desc = describe_type();
        let mut tokens: TokenQueue = ["widget", "two"].into_iter().collect();
        let value = construct(&desc, &mut tokens).expect("construct");
        assert_eq!(
            value,
            ValueNode::record([
                ("Name", ValueNode::from("widget")),
                ("Kind", ValueNode::enum_symbol("Two")),
            ])
        );
    }

    #[test]
    fn test_unknown_symbol() {
        let desc = describe_type();
        let mut tokens: TokenQueue = ["widget", "Four"].into_iter().collect();
        let err = construct(&desc, &mut tokens).unwrap_err();
        match &err.conversion_errors()[..] {
            [ValueConversionError::UnknownSymbol { path, token, .. }] => {
                assert_eq!(path, "Kind");
                assert_eq!(token, "Four");
            }
            other => panic!("unexpected errors {:?}", other),
        }
    }

    #[test]
    fn test_all_bad_leaves_reported() {
        let desc = RecordBuilder::new("Numbers")
            .field("n", PrimitiveKind::I32)
            .field("ok", PrimitiveKind::I32)
            .field("d", PrimitiveKind::F64)
            .build()
            .expect("record");
        let mut tokens: TokenQueue = ["abc", "5", "x.y"].into_iter().collect();

        let err = construct(&desc, &mut tokens).unwrap_err();
        let paths: Vec<&str> = err.conversion_errors().iter().map(|e| e.path()).collect();
        assert_eq!(paths, vec!["n", "d"]);
        assert!(err
            .conversion_errors()
            .iter()
            .all(|e| matches!(e, ValueConversionError::BadFormat { .. })));
    }

    #[test]
    fn test_sequence_count_then_elements() {
        let desc = RecordBuilder::new("Lists")
            .sequence_field("values", PrimitiveKind::I32)
            .build()
            .expect("record");

        let mut seen = Vec::new();
        let mut answers = ["3", "1", "2", "3"].into_iter();
        let mut source = |req: &TokenRequest<'_>| {
            seen.push((req.path.to_string(), req.is_count()));
            answers.next().map(str::to_string)
        };
        let value = construct(&desc, &mut source).expect("construct");

        assert_eq!(
            value.field("values"),
            Some(&ValueNode::from(vec![1, 2, 3]))
        );
        assert_eq!(
            seen,
            vec![
                ("values".to_string(), true),
                ("values[0]".to_string(), false),
                ("values[1]".to_string(), false),
                ("values[2]".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_bad_count() {
        let desc = RecordBuilder::new("Lists")
            .sequence_field("values", PrimitiveKind::I32)
            .field("n", PrimitiveKind::I32)
            .build()
            .expect("record");
        let mut tokens: TokenQueue = ["many", "zz"].into_iter().collect();
        let err = construct(&desc, &mut tokens).unwrap_err();
        assert_eq!(err.conversion_errors().len(), 2);
    }

    #[test]
    fn test_optional_leaf_may_be_empty() {
        let desc = RecordBuilder::new("Opt")
            .optional_field("n", PrimitiveKind::I32)
            .field("s", PrimitiveKind::String)
            .build()
            .expect("record");
        let mut tokens: TokenQueue = ["", ""].into_iter().collect();
        let value = construct(&desc, &mut tokens).expect("construct");
        assert_eq!(value.field("n"), Some(&ValueNode::Absent));
        assert_eq!(value.field("s"), Some(&ValueNode::from("")));
    }

    #[test]
    fn test_input_exhausted() {
        let desc = describe_type();
        let mut tokens: TokenQueue = ["only one"].into_iter().collect();
        assert_eq!(
            construct(&desc, &mut tokens),
            Err(ConstructError::InputExhausted("Kind".into()))
        );
    }

    #[test]
    fn test_cycle_is_reported() {
        let node = RecordDescriptor::declare("Node");
        let node_type = Arc::new(TypeDescriptor::record(node.clone()));
        node.define(vec![FieldDescriptor::new("next", node_type.clone()).optional()])
            .expect("define");

        let mut tokens = TokenQueue::new();
        let err = construct(&node_type, &mut tokens).unwrap_err();
        assert!(
            matches!(err, ConstructError::Cycle(CycleDetected { ref path, .. }) if path == "next")
        );
    }

    #[test]
    fn test_field_values_source() {
        let params = vec![
            FieldDescriptor::new(
                "ints",
                Arc::new(TypeDescriptor::sequence(Arc::new(TypeDescriptor::primitive(
                    PrimitiveKind::I32,
                )))),
            ),
            FieldDescriptor::new("s", Arc::new(TypeDescriptor::primitive(PrimitiveKind::String))),
        ];
        let mut form: FieldValues = [("ints[0]", "7"), ("ints[1]", "8"), ("s", "hello")]
            .into_iter()
            .collect();

        let args = construct_arguments(&params, &mut form).expect("construct");
        assert_eq!(args[0], ValueNode::from(vec![7, 8]));
        assert_eq!(args[1], ValueNode::from("hello"));
    }

    #[test]
    fn test_field_values_count_beyond_given_elements() {
        let params = vec![FieldDescriptor::new(
            "ints",
            Arc::new(TypeDescriptor::sequence(Arc::new(TypeDescriptor::primitive(
                PrimitiveKind::I32,
            )))),
        )];
        let mut form: FieldValues = [("ints", "4000000000"), ("ints[0]", "1")]
            .into_iter()
            .collect();

        let err = construct_arguments(&params, &mut form).unwrap_err();
        assert_eq!(err, ConstructError::InputExhausted("ints[1]".to_string()));
    }

    #[test]
    fn test_field_values_nested_element_paths() {
        let point = RecordDescriptor::new(
            "Point",
            vec![
                FieldDescriptor::new("x", Arc::new(TypeDescriptor::primitive(PrimitiveKind::I32))),
                FieldDescriptor::new("y", Arc::new(TypeDescriptor::primitive(PrimitiveKind::I32)))
                    .optional(),
            ],
        )
        .expect("record");
        let params = vec![FieldDescriptor::new(
            "points",
            Arc::new(TypeDescriptor::sequence(Arc::new(TypeDescriptor::record(
                point,
            )))),
        )];
        // `points[1]` is not given by `points[10]`.
        let mut form: FieldValues = [("points[0].x", "1"), ("points[10].x", "2")]
            .into_iter()
            .collect();

        let args = construct_arguments(&params, &mut form).expect("construct");
        let ValueNode::Sequence(items) = &args[0] else {
            panic!("expected sequence, got {:?}", args[0]);
        };
        assert_eq!(items.len(), 1);
    }
}
