// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dynsoap - Dynamic SOAP client
//!
//! Point at a service address, discover what it exposes and call any of its
//! operations with values typed in at run time. No bindings are generated:
//! discovered metadata becomes a structural type model, and clients are
//! interpreters over that model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynsoap::{default_sink, Config, Explorer, FieldValues, Session};
//!
//! # async fn example() -> dynsoap::Result<()> {
//! let explorer = Explorer::http(&Config::default(), default_sink())?;
//!
//! let mut session = Session::new();
//! session.set_address("http://localhost:8095/test");
//! session.resolve(&explorer).await?;
//! session.select_endpoint("ServiceName1")?;
//! session.select_operation("SimpleInt32")?;
//!
//! let values: FieldValues = [("i", "42")].into_iter().collect();
//! let output = session.invoke(&explorer, &values).await?;
//! println!("Output: {}", output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                  Front ends (console, sessions)                  |
//! |          Explorer: list / build value / flatten / invoke         |
//! +------------------------------------------------------------------+
//! |  ProxyCache (single-flight per address)  |   Invoker (checks)    |
//! +------------------------------------------+-----------------------+
//! |  Discoverer (WSDL/XSD -> descriptors)    |  Synthesizer (clients)|
//! +------------------------------------------------------------------+
//! |  dynamic: TypeDescriptor, ValueNode, construct, flatten          |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Modules Overview
//!
//! - [`dynamic`] - Type descriptors and value trees
//! - [`discovery`] - Metadata retrieval and resolution
//! - [`proxy`] - Client synthesis and the SOAP codec
//! - [`cache`] - Resolved services, one resolution per address
//! - [`invoke`] - Operation dispatch with argument checks
//! - [`explorer`] / [`commands`] - Front-end facade and session state
//! - [`events`] - Observability events

pub mod cache;
pub mod commands;
pub mod config;
pub mod discovery;
pub mod dynamic;
pub mod error;
pub mod events;
pub mod explorer;
pub mod invoke;
pub mod proxy;

pub use cache::{CacheEntry, CacheError, CacheKey, DiscoveryResolver, ProxyCache, ServiceResolver};
pub use commands::{ParameterField, ResolveCommand, Session, StartupArgs};
pub use config::{Config, ConfigError};
pub use discovery::{
    DiscoveryError, Discoverer, EndpointDescriptor, OperationDescriptor, ServiceDescriptor,
};
pub use dynamic::{
    construct, flatten, ConstructError, CycleDetected, FieldDescriptor, FieldValues,
    PrimitiveKind, PrimitiveValue, TokenQueue, TokenRequest, TokenSource, TypeDescriptor,
    ValueConversionError, ValueNode,
};
pub use error::{Error, NotFoundError, Result};
pub use events::{default_sink, EventSink, MemorySink, ProxyEvent, SharedSink, TracingSink};
pub use explorer::Explorer;
pub use invoke::{InvokeError, Invoker};
pub use proxy::{
    CallTransport, EndpointClient, FaultDetails, InvocationError, SynthesisError, Synthesizer,
};
