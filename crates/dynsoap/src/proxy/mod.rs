// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Proxy synthesis.
//!
//! A synthesized client is an interpreter over the discovered descriptors:
//! no code is generated. [`EndpointClient::execute`] serializes the argument
//! values into a SOAP envelope, performs one call through a
//! [`CallTransport`] and reads the response back into a [`ValueNode`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dynsoap::config::Config;
//! use dynsoap::discovery::Discoverer;
//! use dynsoap::events::default_sink;
//! use dynsoap::proxy::Synthesizer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let service = Discoverer::http(&config, default_sink())?
//!     .discover("http://localhost:8095/test")
//!     .await?;
//! let clients = Synthesizer::http(&config, default_sink())?.synthesize(&service)?;
//! for client in &clients {
//!     println!("{}: {} operation(s)", client.name(), client.operations().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod envelope;
mod transport;

pub use transport::{CallTransport, HttpCallTransport, TransportError};

use crate::config::Config;
use crate::discovery::{EndpointDescriptor, MessageLayout, OperationDescriptor, ServiceDescriptor};
use crate::dynamic::{FieldDescriptor, RecordId, TypeDescriptor, TypeKind, ValueNode};
use crate::events::{ProxyEvent, SharedSink};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("{endpoint}.{operation}: unsupported type: {reason}")]
    UnsupportedType {
        endpoint: String,
        operation: String,
        reason: String,
    },
}

/// What went wrong on the remote side of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultDetails {
    /// `soap:Fault` returned by the service.
    Soap {
        code: String,
        string: String,
        /// Raw XML content of the `detail` element.
        detail: Option<String>,
    },
    /// The call never produced a response.
    Transport(TransportError),
    /// The response could not be read.
    InvalidResponse(String),
}

impl fmt::Display for FaultDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Soap {
                code,
                string,
                detail,
            } => {
                write!(f, "{} ({})", string, code)?;
                if let Some(detail) = detail {
                    write!(f, " - {}", detail)?;
                }
                Ok(())
            }
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::InvalidResponse(reason) => write!(f, "invalid response: {}", reason),
        }
    }
}

/// Errors that can occur while executing an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationError {
    /// A value does not fit the declared parameter type
    ShapeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// The remote call failed
    RemoteFault { details: FaultDetails },
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch {
                path,
                expected,
                found,
            } => {
                if path.is_empty() {
                    write!(f, "Shape mismatch: expected {}, found {}", expected, found)
                } else {
                    write!(
                        f,
                        "Shape mismatch at '{}': expected {}, found {}",
                        path, expected, found
                    )
                }
            }
            Self::RemoteFault { details } => write!(f, "Remote fault: {}", details),
        }
    }
}

impl std::error::Error for InvocationError {}

impl From<TransportError> for InvocationError {
    fn from(e: TransportError) -> Self {
        Self::RemoteFault {
            details: FaultDetails::Transport(e),
        }
    }
}

/// Invocable client for one endpoint.
pub struct EndpointClient {
    descriptor: EndpointDescriptor,
    transport: Arc<dyn CallTransport>,
}

impl fmt::Debug for EndpointClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointClient")
            .field("name", &self.descriptor.name)
            .field("address", &self.descriptor.address)
            .finish_non_exhaustive()
    }
}

impl EndpointClient {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn address(&self) -> &str {
        &self.descriptor.address
    }

    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    pub fn operations(&self) -> &[OperationDescriptor] {
        &self.descriptor.operations
    }

    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.descriptor.operation(name)
    }

    /// Run `op` with `args` (one value per parameter).
    ///
    /// Argument shapes are not re-validated here; see [`crate::invoke`].
    pub async fn execute(
        &self,
        op: &OperationDescriptor,
        args: &[ValueNode],
    ) -> Result<ValueNode, InvocationError> {
        let payload = envelope::encode_request(op, args)?;
        let response = self
            .transport
            .call(&self.descriptor.address, &op.binding.soap_action, payload)
            .await?;
        envelope::decode_response(op, &response)
    }
}

/// Turns service descriptors into endpoint clients.
pub struct Synthesizer {
    transport: Arc<dyn CallTransport>,
    events: SharedSink,
}

impl Synthesizer {
    pub fn new(transport: Arc<dyn CallTransport>, events: SharedSink) -> Self {
        Self { transport, events }
    }

    /// Synthesizer whose clients call over HTTP(S).
    pub fn http(config: &Config, events: SharedSink) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Arc::new(HttpCallTransport::new(&config.http)?), events))
    }

    /// One client per endpoint, in declaration order.
    pub fn synthesize(
        &self,
        service: &ServiceDescriptor,
    ) -> Result<Vec<Arc<EndpointClient>>, SynthesisError> {
        let mut clients = Vec::with_capacity(service.endpoints.len());
        for endpoint in &service.endpoints {
            for op in &endpoint.operations {
                check_operation(op).map_err(|reason| SynthesisError::UnsupportedType {
                    endpoint: endpoint.name.clone(),
                    operation: op.name.clone(),
                    reason,
                })?;
            }
            clients.push(Arc::new(EndpointClient {
                descriptor: endpoint.clone(),
                transport: self.transport.clone(),
            }));
        }
        self.events.emit(ProxyEvent::SynthesisCompleted {
            uri: service.uri.clone(),
            endpoints: clients.len(),
        });
        Ok(clients)
    }
}

fn check_operation(op: &OperationDescriptor) -> Result<(), String> {
    if let MessageLayout::Wrapped { element } = &op.binding.request {
        if element.local.is_empty() {
            return Err("wrapped request without an element name".to_string());
        }
    }
    let mut checked = HashSet::new();
    for field in op.parameters.iter().chain(op.result.as_ref()) {
        check_field(field, &mut checked)?;
    }
    Ok(())
}

fn check_field(field: &FieldDescriptor, checked: &mut HashSet<RecordId>) -> Result<(), String> {
    check_type(&field.type_desc, checked).map_err(|reason| format!("{}: {}", field.name, reason))
}

/// Records are checked once each, so recursive types terminate.
fn check_type(desc: &TypeDescriptor, checked: &mut HashSet<RecordId>) -> Result<(), String> {
    match &desc.kind {
        TypeKind::Primitive(_) => Ok(()),
        TypeKind::Enum(e) if e.symbols.is_empty() => {
            Err(format!("enumeration '{}' has no symbols", desc.name))
        }
        TypeKind::Enum(_) => Ok(()),
        TypeKind::Record(record) => {
            if !checked.insert(record.id()) {
                return Ok(());
            }
            if !record.is_defined() {
                return Err(format!("record '{}' was never defined", record.name));
            }
            let mut names = HashSet::new();
            for field in record.fields() {
                if !names.insert(field.name.as_str()) {
                    return Err(format!(
                        "record '{}' repeats field '{}'",
                        record.name, field.name
                    ));
                }
                check_field(field, checked)?;
            }
            Ok(())
        }
        TypeKind::Sequence(seq) => {
            if let TypeKind::Sequence(inner) = &seq.element.kind {
                if seq.item.is_none() && inner.item.is_none() {
                    return Err(format!("'{}' nests a repeated element directly", desc.name));
                }
            }
            check_type(&seq.element, checked)
        }
    }
}
