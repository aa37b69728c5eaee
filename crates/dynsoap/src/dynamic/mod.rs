// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic types for discovered services
//!
//! Runtime type manipulation without compile-time bindings.
//! Everything a front end needs to ask for, validate and show values of a
//! type only known after discovery.
//!
//! # Features
//!
//! - **TypeDescriptor**: Structural type description (primitive, enum, record, sequence)
//! - **ValueNode**: Value tree mirroring a descriptor
//! - **Builder API**: Fluent interface for building type descriptors
//! - **Construct**: Build a value from per-leaf textual tokens
//! - **Flatten**: Enumerate addressable leaves, cycle-checked
//!
//! # Example
//!
//! ```rust
//! use dynsoap::dynamic::{construct, flatten, PrimitiveKind, RecordBuilder, TokenQueue};
//! use std::sync::Arc;
//!
//! let point = Arc::new(
//!     RecordBuilder::new("Point")
//!         .field("x", PrimitiveKind::I32)
//!         .field("y", PrimitiveKind::I32)
//!         .build()
//!         .unwrap(),
//! );
//!
//! let paths: Vec<String> = flatten(&point).map(|leaf| leaf.unwrap().path).collect();
//! assert_eq!(paths, ["x", "y"]);
//!
//! let mut input: TokenQueue = ["3", "4"].into_iter().collect();
//! let value = construct(&point, &mut input).unwrap();
//! assert_eq!(value.to_string(), "{x: 3, y: 4}");
//! ```

mod builder;
mod construct;
mod flatten;
mod type_descriptor;
mod value;

pub use builder::{EnumBuilder, RecordBuilder};
pub use construct::{
    construct, construct_arguments, ConstructError, FieldValues, TokenKind, TokenQueue,
    TokenRequest, TokenSource,
};
pub use flatten::{
    element_path, flatten, flatten_arguments, flatten_fields, flatten_value, join_path,
    CycleDetected, FlatField, FlatToken, Flatten, FlattenOptions,
};
pub use type_descriptor::{
    DescriptorError, EnumDescriptor, FieldDescriptor, PrimitiveKind, RecordDescriptor, RecordId,
    SequenceDescriptor, TypeDescriptor, TypeKind, XmlName,
};
pub use value::{DateTimeValue, PrimitiveValue, ValueConversionError, ValueNode};
