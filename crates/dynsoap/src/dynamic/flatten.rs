// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flattening of type trees into addressable leaf fields, and of value trees
//! back into the tokens that would construct them.

use crate::dynamic::{FieldDescriptor, RecordId, TypeDescriptor, TypeKind, ValueNode};
use std::fmt;
use std::sync::Arc;

/// A record type contains itself on a traversal path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDetected {
    /// Path at which the record was entered a second time.
    pub path: String,
    /// Name of the recursive record.
    pub record: String,
}

impl fmt::Display for CycleDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Recursive type '{}' reached again at '{}'",
            self.record, self.path
        )
    }
}

impl std::error::Error for CycleDetected {}

/// Join a dotted path with a field name.
pub fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Path of the `index`-th element of the sequence at `prefix`.
pub fn element_path(prefix: &str, index: usize) -> String {
    format!("{}[{}]", prefix, index)
}

/// An addressable leaf produced by [`flatten`].
#[derive(Debug, Clone, PartialEq)]
pub struct FlatField {
    /// Dotted path (`c.I`, `items[0]`).
    pub path: String,
    /// Leaf type: primitive, enum, or an opaque sequence.
    pub type_desc: Arc<TypeDescriptor>,
    /// Whether the leaf may be left empty.
    pub optional: bool,
}

/// Traversal options for [`Flatten`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlattenOptions {
    /// Element count used to expand growable sequences. `None` keeps every
    /// sequence as a single opaque leaf.
    pub sequence_count: Option<usize>,
}

#[derive(Debug, Clone)]
enum Frame {
    Visit {
        path: String,
        desc: Arc<TypeDescriptor>,
        optional: bool,
    },
    Leave,
}

/// Lazy depth-first leaf iterator. Stops after reporting a cycle.
#[derive(Debug, Clone)]
pub struct Flatten {
    roots: Vec<Frame>,
    stack: Vec<Frame>,
    on_path: Vec<RecordId>,
    options: FlattenOptions,
    failed: bool,
}

impl Flatten {
    fn new(roots: Vec<Frame>, options: FlattenOptions) -> Self {
        let mut stack = roots.clone();
        stack.reverse();
        Self {
            roots,
            stack,
            on_path: Vec::new(),
            options,
            failed: false,
        }
    }

    /// Use different traversal options and start over.
    pub fn with_options(mut self, options: FlattenOptions) -> Self {
        self.options = options;
        self.restart();
        self
    }

    /// Rewind to the first leaf.
    pub fn restart(&mut self) {
        self.stack = self.roots.iter().rev().cloned().collect();
        self.on_path.clear();
        self.failed = false;
    }
}

impl Iterator for Flatten {
    type Item = Result<FlatField, CycleDetected>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while let Some(frame) = self.stack.pop() {
            let (path, desc, optional) = match frame {
                Frame::Leave => {
                    self.on_path.pop();
                    continue;
                }
                Frame::Visit {
                    path,
                    desc,
                    optional,
                } => (path, desc, optional),
            };

            match &desc.kind {
                TypeKind::Record(record) => {
                    let id = record.id();
                    if self.on_path.contains(&id) {
                        self.failed = true;
                        self.stack.clear();
                        return Some(Err(CycleDetected {
                            path,
                            record: record.name.clone(),
                        }));
                    }
                    self.on_path.push(id);
                    self.stack.push(Frame::Leave);
                    for field in record.fields().iter().rev() {
                        self.stack.push(Frame::Visit {
                            path: join_path(&path, &field.name),
                            desc: field.type_desc.clone(),
                            optional: field.accepts_absent(),
                        });
                    }
                }
                TypeKind::Sequence(seq) => match (seq.length, self.options.sequence_count) {
                    (_, None) => {
                        return Some(Ok(FlatField {
                            path,
                            type_desc: desc,
                            optional,
                        }))
                    }
                    (fixed, Some(count)) => {
                        let n = fixed.unwrap_or(count);
                        for i in (0..n).rev() {
                            self.stack.push(Frame::Visit {
                                path: element_path(&path, i),
                                desc: seq.element.clone(),
                                optional: false,
                            });
                        }
                    }
                },
                _ => {
                    return Some(Ok(FlatField {
                        path,
                        type_desc: desc,
                        optional,
                    }))
                }
            }
        }
        None
    }
}

/// Flatten a type rooted at the empty path.
pub fn flatten(desc: &Arc<TypeDescriptor>) -> Flatten {
    let root = Frame::Visit {
        path: String::new(),
        desc: desc.clone(),
        optional: false,
    };
    Flatten::new(vec![root], FlattenOptions::default())
}

/// Flatten a parameter list; each parameter name is a path root.
pub fn flatten_fields(fields: &[FieldDescriptor]) -> Flatten {
    let roots = fields
        .iter()
        .map(|field| Frame::Visit {
            path: field.name.clone(),
            desc: field.type_desc.clone(),
            optional: field.accepts_absent(),
        })
        .collect();
    Flatten::new(roots, FlattenOptions::default())
}

/// One token of a flattened value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatToken {
    pub path: String,
    pub token: String,
    /// Element count of a growable sequence rather than a leaf value.
    pub count: bool,
}

/// Render `value` as the token stream that constructs it again, in the order
/// the constructor asks for tokens.
pub fn flatten_value(desc: &TypeDescriptor, value: &ValueNode) -> Vec<FlatToken> {
    let mut out = Vec::new();
    push_value(desc, value, "", &mut out);
    out
}

/// Same as [`flatten_value`] for a parameter list and its arguments.
pub fn flatten_arguments(params: &[FieldDescriptor], args: &[ValueNode]) -> Vec<FlatToken> {
    let mut out = Vec::new();
    for (param, arg) in params.iter().zip(args) {
        push_value(&param.type_desc, arg, &param.name, &mut out);
    }
    out
}

fn push_value(desc: &TypeDescriptor, value: &ValueNode, path: &str, out: &mut Vec<FlatToken>) {
    let leaf = |out: &mut Vec<FlatToken>, token: String| {
        out.push(FlatToken {
            path: path.to_string(),
            token,
            count: false,
        })
    };
    match (&desc.kind, value) {
        (_, ValueNode::Absent) => leaf(out, String::new()),
        (TypeKind::Record(record), ValueNode::Record(fields)) => {
            for field in record.fields() {
                let child = fields
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, v)| v)
                    .unwrap_or(&ValueNode::Absent);
                push_value(&field.type_desc, child, &join_path(path, &field.name), out);
            }
        }
        (TypeKind::Sequence(seq), ValueNode::Sequence(items)) => {
            if seq.length.is_none() {
                out.push(FlatToken {
                    path: path.to_string(),
                    token: items.len().to_string(),
                    count: true,
                });
            }
            for (i, item) in items.iter().enumerate() {
                push_value(&seq.element, item, &element_path(path, i), out);
            }
        }
        (_, ValueNode::Primitive(p)) => leaf(out, p.to_string()),
        (_, ValueNode::Enum(symbol)) => leaf(out, symbol.clone()),
        (_, other) => leaf(out, other.to_string()),
    }
}
