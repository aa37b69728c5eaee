// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command objects and session state for interactive front ends.
//!
//! A [`Session`] holds what an explorer window shows: the address, the
//! endpoints found there, the selected endpoint's operations and the
//! parameter fields of the selected operation.

use crate::cache::{CacheEntry, CacheError, ProxyCache};
use crate::discovery::{parse_address, EndpointDescriptor, OperationDescriptor};
use crate::dynamic::{construct_arguments, flatten_fields, FieldValues, TokenSource, ValueNode};
use crate::error::{NotFoundError, Result};
use crate::explorer::Explorer;
use std::sync::Arc;

/// Resolve the service at an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveCommand {
    address: String,
}

impl ResolveCommand {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Only absolute addresses can be resolved.
    pub fn can_execute(&self) -> bool {
        parse_address(&self.address).is_ok()
    }

    pub async fn execute(
        &self,
        cache: &ProxyCache,
    ) -> std::result::Result<Arc<CacheEntry>, CacheError> {
        cache.get_info(&self.address).await
    }
}

/// Initial selection passed on start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupArgs {
    pub address: Option<String>,
    pub service_name: Option<String>,
    pub method: Option<String>,
}

/// One input field of the selected operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterField {
    /// Dotted path (`c.I`).
    pub path: String,
    pub type_name: String,
}

#[derive(Debug, Default)]
pub struct Session {
    address: String,
    entry: Option<Arc<CacheEntry>>,
    endpoint: Option<String>,
    operation: Option<String>,
    parameters: Vec<ParameterField>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Change the address; the previous resolution is forgotten.
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = address.into();
        self.entry = None;
        self.clear_endpoint();
    }

    pub fn resolve_command(&self) -> ResolveCommand {
        ResolveCommand::new(self.address.clone())
    }

    /// Resolve the current address. A single endpoint is selected right away.
    pub async fn resolve(&mut self, explorer: &Explorer) -> std::result::Result<(), CacheError> {
        let entry = self.resolve_command().execute(explorer.cache()).await?;
        self.clear_endpoint();
        if let [only] = entry.service().endpoints.as_slice() {
            self.endpoint = Some(only.name.clone());
        }
        self.entry = Some(entry);
        Ok(())
    }

    pub fn is_resolved(&self) -> bool {
        self.entry.is_some()
    }

    pub fn endpoints(&self) -> Vec<&str> {
        self.entry
            .as_ref()
            .map(|e| e.service().endpoint_names().collect())
            .unwrap_or_default()
    }

    /// Endpoint named `name` of the resolved service.
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.entry.as_ref()?.service().endpoint(name)
    }

    pub fn select_endpoint(&mut self, name: &str) -> std::result::Result<(), NotFoundError> {
        let entry = self
            .entry
            .as_ref()
            .ok_or_else(|| NotFoundError::UnknownService(self.address.clone()))?;
        if entry.service().endpoint(name).is_none() {
            return Err(NotFoundError::UnknownEndpoint {
                service: self.address.clone(),
                endpoint: name.to_string(),
            });
        }
        self.clear_endpoint();
        self.endpoint = Some(name.to_string());
        Ok(())
    }

    pub fn selected_endpoint(&self) -> Option<&EndpointDescriptor> {
        let name = self.endpoint.as_deref()?;
        self.entry.as_ref()?.service().endpoint(name)
    }

    /// Operations of the selected endpoint.
    pub fn operations(&self) -> Vec<&str> {
        self.selected_endpoint()
            .map(|e| e.operation_names().collect())
            .unwrap_or_default()
    }

    /// Select an operation and list its parameter fields.
    pub fn select_operation(&mut self, name: &str) -> Result<()> {
        let endpoint = self.selected_endpoint().ok_or_else(|| {
            NotFoundError::UnknownEndpoint {
                service: self.address.clone(),
                endpoint: self.endpoint.clone().unwrap_or_default(),
            }
        })?;
        let op = endpoint
            .operation(name)
            .ok_or_else(|| NotFoundError::UnknownOperation {
                endpoint: endpoint.name.clone(),
                operation: name.to_string(),
            })?;
        let parameters = flatten_fields(&op.parameters)
            .map(|leaf| {
                leaf.map(|leaf| ParameterField {
                    type_name: leaf.type_desc.describe(),
                    path: leaf.path,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.operation = Some(name.to_string());
        self.parameters = parameters;
        Ok(())
    }

    pub fn selected_operation(&self) -> Option<&OperationDescriptor> {
        self.selected_endpoint()?.operation(self.operation.as_deref()?)
    }

    /// Whether the selected operation declares a result.
    pub fn returns_value(&self) -> bool {
        self.selected_operation().is_some_and(|op| op.result.is_some())
    }

    pub fn parameters(&self) -> &[ParameterField] {
        &self.parameters
    }

    /// Apply start-up arguments: set and resolve the address, then select
    /// the named endpoint and operation when given.
    pub async fn initialize(&mut self, explorer: &Explorer, args: StartupArgs) -> Result<()> {
        let Some(address) = args.address else {
            return Ok(());
        };
        self.set_address(address);
        self.resolve(explorer).await?;
        if let Some(service) = args.service_name.as_deref() {
            self.select_endpoint(service)?;
        }
        if let Some(method) = args.method.as_deref() {
            self.select_operation(method)?;
        }
        Ok(())
    }

    /// Build the arguments from `values` (keyed by parameter path) and call
    /// the selected operation.
    pub async fn invoke(&self, explorer: &Explorer, values: &FieldValues) -> Result<ValueNode> {
        let mut source = values.clone();
        self.invoke_with(explorer, &mut source).await
    }

    /// Call the selected operation, asking `source` for each argument token.
    pub async fn invoke_with<S: TokenSource + ?Sized>(
        &self,
        explorer: &Explorer,
        source: &mut S,
    ) -> Result<ValueNode> {
        let (endpoint, op) = match (self.selected_endpoint(), self.selected_operation()) {
            (Some(endpoint), Some(op)) => (endpoint, op),
            (Some(endpoint), None) => {
                return Err(NotFoundError::UnknownOperation {
                    endpoint: endpoint.name.clone(),
                    operation: self.operation.clone().unwrap_or_default(),
                }
                .into())
            }
            (None, _) => return Err(NotFoundError::UnknownService(self.address.clone()).into()),
        };
        let args = construct_arguments(&op.parameters, source)?;
        explorer.invoke(&self.address, &endpoint.name, &op.name, &args).await
    }

    fn clear_endpoint(&mut self) {
        self.endpoint = None;
        self.operation = None;
        self.parameters.clear();
    }
}
