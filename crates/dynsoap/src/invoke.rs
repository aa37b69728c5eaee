// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generic invoker.
//!
//! Looks an operation up by name, checks every argument against its declared
//! parameter type and runs a single call. Nothing is retried.

use crate::discovery::OperationDescriptor;
use crate::dynamic::{
    element_path, join_path, FieldDescriptor, TypeDescriptor, TypeKind, ValueNode,
};
use crate::error::NotFoundError;
use crate::events::{ProxyEvent, SharedSink};
use crate::proxy::{EndpointClient, InvocationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

fn mismatch(
    path: &str,
    expected: impl Into<String>,
    found: impl Into<String>,
) -> InvocationError {
    InvocationError::ShapeMismatch {
        path: path.to_string(),
        expected: expected.into(),
        found: found.into(),
    }
}

/// Check that `args` fit the parameters of `op`, one value per parameter.
pub fn check_arguments(
    op: &OperationDescriptor,
    args: &[ValueNode],
) -> Result<(), InvocationError> {
    if args.len() != op.parameters.len() {
        return Err(mismatch(
            "",
            format!("{} argument(s)", op.parameters.len()),
            format!("{}", args.len()),
        ));
    }
    for (param, arg) in op.parameters.iter().zip(args) {
        check_field(&param.name, param, arg)?;
    }
    Ok(())
}

fn check_field(
    path: &str,
    field: &FieldDescriptor,
    value: &ValueNode,
) -> Result<(), InvocationError> {
    if value.is_absent() {
        if field.accepts_absent() {
            return Ok(());
        }
        return Err(mismatch(
            path,
            field.type_desc.describe(),
            "absent (field is required)",
        ));
    }
    check_shape(path, &field.type_desc, value)
}

/// Check that `value` has the shape of `desc`.
pub fn check_shape(
    path: &str,
    desc: &TypeDescriptor,
    value: &ValueNode,
) -> Result<(), InvocationError> {
    match (&desc.kind, value) {
        (TypeKind::Primitive(kind), ValueNode::Primitive(v)) => {
            if v.kind() == *kind {
                Ok(())
            } else {
                Err(mismatch(path, kind.display_name(), v.kind().display_name()))
            }
        }
        (TypeKind::Enum(e), ValueNode::Enum(symbol)) => {
            if e.symbols.contains(symbol) {
                Ok(())
            } else {
                Err(mismatch(path, desc.describe(), format!("symbol '{}'", symbol)))
            }
        }
        (TypeKind::Record(record), ValueNode::Record(values)) => {
            for (name, _) in values {
                if record.field(name).is_none() {
                    return Err(mismatch(
                        &join_path(path, name),
                        format!("a field of {}", record.name),
                        "unknown field",
                    ));
                }
            }
            for field in record.fields() {
                let value = value.field(&field.name).unwrap_or(&ValueNode::Absent);
                check_field(&join_path(path, &field.name), field, value)?;
            }
            Ok(())
        }
        (TypeKind::Sequence(seq), ValueNode::Sequence(items)) => {
            if let Some(length) = seq.length {
                if items.len() != length {
                    return Err(mismatch(
                        path,
                        format!("{} element(s)", length),
                        format!("{}", items.len()),
                    ));
                }
            }
            for (i, item) in items.iter().enumerate() {
                let item_path = element_path(path, i);
                // Wrapped items may be nil.
                if item.is_absent() && seq.item.is_some() {
                    continue;
                }
                check_shape(&item_path, &seq.element, item)?;
            }
            Ok(())
        }
        _ => Err(mismatch(path, desc.describe(), value.shape_name())),
    }
}

/// Dispatches operations on synthesized clients.
pub struct Invoker {
    events: SharedSink,
}

impl Invoker {
    pub fn new(events: SharedSink) -> Self {
        Self { events }
    }

    /// Call `operation` on `client`.
    ///
    /// Operations without a result answer [`ValueNode::Absent`].
    pub async fn invoke(
        &self,
        client: &EndpointClient,
        operation: &str,
        args: &[ValueNode],
    ) -> Result<ValueNode, InvokeError> {
        let op = client
            .operation(operation)
            .ok_or_else(|| NotFoundError::UnknownOperation {
                endpoint: client.name().to_string(),
                operation: operation.to_string(),
            })?;

        self.events.emit(ProxyEvent::InvocationStarted {
            endpoint: client.name().to_string(),
            operation: op.name.clone(),
        });

        let result = match check_arguments(op, args) {
            Ok(()) => client.execute(op, args).await,
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => self.events.emit(ProxyEvent::InvocationCompleted {
                endpoint: client.name().to_string(),
                operation: op.name.clone(),
            }),
            Err(e) => self.events.emit(ProxyEvent::InvocationFailed {
                endpoint: client.name().to_string(),
                operation: op.name.clone(),
                reason: e.to_string(),
            }),
        }
        result.map_err(InvokeError::from)
    }
}
