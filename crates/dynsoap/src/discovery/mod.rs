// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Service discovery.
//!
//! [`Discoverer::discover`] fetches the metadata published at an address,
//! follows every import it references and resolves the result into a
//! [`ServiceDescriptor`]:
//!
//! ```text
//! address --fetch--> WSDL | DISCO | other --(retry with ?wsdl)--> WSDL
//!    |                                                     |
//!    +-- wsdl:import / xs:import / xs:include (transitive) +
//!                            |
//!                        resolve --> ServiceDescriptor
//! ```
//!
//! Nothing is cached here; see [`crate::cache::ProxyCache`].

mod fetch;
mod resolve;
pub mod schema;
pub mod wsdl;

pub use fetch::{FetchedDocument, HttpFetcher, MetadataFetcher};
pub use resolve::DocumentSet;

use crate::config::{Config, DiscoveryConfig};
use crate::dynamic::{FieldDescriptor, XmlName};
use crate::events::{ProxyEvent, SharedSink};
use schema::{parse_schema_document, SchemaDoc};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use url::Url;
use wsdl::{parse_document, MetadataDocument};

/// Metadata that cannot be turned into descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataError(String);

impl MetadataError {
    pub fn new(reason: String) -> Self {
        Self(reason)
    }
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MetadataError {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("{uri} is unreachable: {reason}")]
    Unreachable { uri: String, reason: String },

    #[error("metadata at {uri} is malformed: {reason}")]
    Malformed { uri: String, reason: String },

    #[error("cannot follow redirect from {uri}: {reason}")]
    RedirectUnresolvable { uri: String, reason: String },

    #[error("'{0}' is not an absolute address")]
    InvalidAddress(String),
}

impl DiscoveryError {
    fn malformed(uri: &Url, err: impl fmt::Display) -> Self {
        Self::Malformed {
            uri: uri.to_string(),
            reason: err.to_string(),
        }
    }
}

/// How an operation's message maps onto the SOAP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLayout {
    /// One wrapper element whose children are the fields.
    Wrapped { element: XmlName },
    /// Each field is a direct child of the body.
    Bare,
}

/// Wire details of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationBinding {
    /// `SOAPAction` header value (may be empty).
    pub soap_action: String,
    pub request: MessageLayout,
    pub response: MessageLayout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    /// Unique within its endpoint.
    pub name: String,
    pub parameters: Vec<FieldDescriptor>,
    /// `None` for operations without a result.
    pub result: Option<FieldDescriptor>,
    pub binding: OperationBinding,
}

impl OperationDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&FieldDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// `Add(a: int32, b: int32) -> int32`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.type_desc.name))
            .collect();
        match &self.result {
            Some(result) => format!(
                "{}({}) -> {}",
                self.name,
                params.join(", "),
                result.type_desc.name
            ),
            None => format!("{}({})", self.name, params.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    /// Port name; unique within the service.
    pub name: String,
    /// Address calls are posted to.
    pub address: String,
    pub operations: Vec<OperationDescriptor>,
}

impl EndpointDescriptor {
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|o| o.name == name)
    }

    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.iter().map(|o| o.name.as_str())
    }
}

/// Everything discovered at one address. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    /// Address discovery started from.
    pub uri: String,
    pub endpoints: Vec<EndpointDescriptor>,
}

impl ServiceDescriptor {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|e| e.name == name)
    }

    pub fn endpoint_names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|e| e.name.as_str())
    }
}

/// Parse an absolute address.
pub fn parse_address(uri: &str) -> Result<Url, DiscoveryError> {
    let url = Url::parse(uri.trim()).map_err(|_| DiscoveryError::InvalidAddress(uri.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(DiscoveryError::InvalidAddress(uri.to_string()));
    }
    Ok(url)
}

/// Pending document in the import crawl.
struct Pending {
    url: Url,
    depth: usize,
    kind: Expected,
    /// Namespace of the including schema (for `xs:include`).
    include_into: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Expected {
    Wsdl,
    Schema,
}

/// Discovery client.
pub struct Discoverer {
    fetcher: Arc<dyn MetadataFetcher>,
    config: DiscoveryConfig,
    events: SharedSink,
}

impl Discoverer {
    pub fn new(
        fetcher: Arc<dyn MetadataFetcher>,
        config: DiscoveryConfig,
        events: SharedSink,
    ) -> Self {
        Self {
            fetcher,
            config,
            events,
        }
    }

    /// Discoverer fetching over HTTP(S).
    pub fn http(config: &Config, events: SharedSink) -> Result<Self, reqwest::Error> {
        let fetcher = HttpFetcher::new(&config.http)?;
        Ok(Self::new(Arc::new(fetcher), config.discovery.clone(), events))
    }

    /// Discover the service at `uri`.
    pub async fn discover(&self, uri: &str) -> Result<ServiceDescriptor, DiscoveryError> {
        self.events.emit(ProxyEvent::DiscoveryStarted {
            uri: uri.to_string(),
        });
        let result = self.discover_inner(uri).await;
        match &result {
            Ok(service) => self.events.emit(ProxyEvent::DiscoveryCompleted {
                uri: uri.to_string(),
                endpoints: service.endpoints.len(),
            }),
            Err(err) => self.events.emit(ProxyEvent::DiscoveryFailed {
                uri: uri.to_string(),
                reason: err.to_string(),
            }),
        }
        result
    }

    async fn discover_inner(&self, uri: &str) -> Result<ServiceDescriptor, DiscoveryError> {
        let address = parse_address(uri)?;
        let docs = self.collect(&address).await?;
        resolve::build_service(uri, &docs, self.events.as_ref())
            .map_err(|e| DiscoveryError::malformed(&address, e))
    }

    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, DiscoveryError> {
        let doc = self.fetcher.fetch(url).await?;
        self.events.emit(ProxyEvent::DocumentFetched {
            uri: doc.url.to_string(),
            bytes: doc.body.len(),
        });
        Ok(doc)
    }

    /// Fetch the root document, then every document it imports.
    async fn collect(&self, address: &Url) -> Result<DocumentSet, DiscoveryError> {
        let mut root = self.fetch(address).await?;
        let mut parsed =
            parse_document(&root.body).map_err(|e| DiscoveryError::malformed(&root.url, e))?;
        let address_refused = !root.is_success();

        if parsed == MetadataDocument::NotMetadata
            && self.config.try_wsdl_query
            && address.query().is_none()
        {
            let mut with_query = address.clone();
            with_query.set_query(Some("wsdl"));
            root = self.fetch(&with_query).await?;
            parsed =
                parse_document(&root.body).map_err(|e| DiscoveryError::malformed(&root.url, e))?;
        }

        let mut docs = DocumentSet::default();
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        visited.insert(root.url.clone());

        match parsed {
            MetadataDocument::Wsdl(wsdl) => {
                self.enqueue_wsdl_imports(&root.url, &wsdl, 0, &mut queue)?;
                docs.wsdls.push(wsdl);
            }
            MetadataDocument::Disco { contracts, schemas } => {
                if contracts.is_empty() {
                    return Err(DiscoveryError::malformed(
                        &root.url,
                        "DISCO document lists no contracts",
                    ));
                }
                for (refs, kind) in [(contracts, Expected::Wsdl), (schemas, Expected::Schema)] {
                    for location in refs {
                        queue.push_back(Pending {
                            url: join(&root.url, &location)?,
                            depth: 0,
                            kind,
                            include_into: None,
                        });
                    }
                }
            }
            MetadataDocument::Schema(_) => {
                return Err(DiscoveryError::malformed(
                    &root.url,
                    "address serves a schema, not a service description",
                ))
            }
            MetadataDocument::NotMetadata if address_refused && !root.is_success() => {
                return Err(DiscoveryError::Unreachable {
                    uri: address.to_string(),
                    reason: format!("HTTP {}", root.status),
                })
            }
            MetadataDocument::NotMetadata => {
                return Err(DiscoveryError::malformed(
                    &root.url,
                    "no service description found",
                ))
            }
        }

        while let Some(pending) = queue.pop_front() {
            if !visited.insert(pending.url.clone()) {
                continue;
            }
            if pending.depth > self.config.max_import_depth {
                return Err(DiscoveryError::malformed(
                    &pending.url,
                    format!("imports nest deeper than {}", self.config.max_import_depth),
                ));
            }
            let doc = self
                .fetch(&pending.url)
                .await
                .map_err(|e| DiscoveryError::Malformed {
                    uri: pending.url.to_string(),
                    reason: format!("import failed: {}", e),
                })?;
            if !doc.is_success() {
                return Err(DiscoveryError::malformed(
                    &pending.url,
                    format!("import failed: HTTP {}", doc.status),
                ));
            }

            match pending.kind {
                Expected::Wsdl => {
                    let wsdl = match parse_document(&doc.body) {
                        Ok(MetadataDocument::Wsdl(wsdl)) => wsdl,
                        Ok(_) => {
                            return Err(DiscoveryError::malformed(
                                &doc.url,
                                "expected a WSDL document",
                            ))
                        }
                        Err(e) => return Err(DiscoveryError::malformed(&doc.url, e)),
                    };
                    self.enqueue_wsdl_imports(&doc.url, &wsdl, pending.depth + 1, &mut queue)?;
                    docs.wsdls.push(wsdl);
                }
                Expected::Schema => {
                    let mut schema = parse_schema_document(&doc.body)
                        .map_err(|e| DiscoveryError::malformed(&doc.url, e))?;
                    if let Some(ns) = &pending.include_into {
                        schema.adopt_namespace(ns);
                    }
                    enqueue_schema_refs(&doc.url, &schema, pending.depth + 1, &mut queue)?;
                    docs.schemas.push(schema);
                }
            }
        }

        Ok(docs)
    }

    fn enqueue_wsdl_imports(
        &self,
        base: &Url,
        wsdl: &wsdl::WsdlDoc,
        depth: usize,
        queue: &mut VecDeque<Pending>,
    ) -> Result<(), DiscoveryError> {
        for location in &wsdl.imports {
            queue.push_back(Pending {
                url: join(base, location)?,
                depth,
                kind: Expected::Wsdl,
                include_into: None,
            });
        }
        for schema in &wsdl.schemas {
            enqueue_schema_refs(base, schema, depth, queue)?;
        }
        Ok(())
    }
}

fn enqueue_schema_refs(
    base: &Url,
    schema: &SchemaDoc,
    depth: usize,
    queue: &mut VecDeque<Pending>,
) -> Result<(), DiscoveryError> {
    for location in &schema.imports {
        queue.push_back(Pending {
            url: join(base, location)?,
            depth,
            kind: Expected::Schema,
            include_into: None,
        });
    }
    for location in &schema.includes {
        queue.push_back(Pending {
            url: join(base, location)?,
            depth,
            kind: Expected::Schema,
            include_into: schema.target_namespace.clone(),
        });
    }
    Ok(())
}

fn join(base: &Url, location: &str) -> Result<Url, DiscoveryError> {
    base.join(location).map_err(|e| {
        DiscoveryError::malformed(base, format!("bad reference '{}': {}", location, e))
    })
}
