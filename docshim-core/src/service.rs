//! Abstraction over the underlying document service client.
//!
//! The driver does not talk HTTP itself. It forwards every operation to a
//! [`DocumentService`], the already-existing client for the target service,
//! and reshapes what comes back. Sessions are produced by a
//! [`ServiceConnector`] when the driver client connects.
//!
//! # Traits
//!
//! - [`DocumentService`]: per-session operations on namespaces, collections and documents
//! - [`ServiceConnector`]: factory that establishes a session from a base URL and token
//!
//! # Examples
//!
//! ```ignore
//! use docshim_core::service::{DocumentService, ServiceConnector};
//! use bson::doc;
//!
//! let service = connector.create_session(&base_url, "token").await?;
//! service
//!     .create_document("app", "products", "p1", doc! { "_id": "p1", "name": "A" })
//!     .await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Document;
use std::{collections::HashMap, fmt::Debug};
use url::Url;

use crate::{error::DriverResult, query::FindOptions};

/// Result of a find request as the service returns it.
///
/// Documents are keyed by their service document id; the map carries no
/// ordering guarantee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindResponse {
    /// Matched documents keyed by document id.
    pub data: HashMap<String, Document>,
    /// Total match count, when the service reports one.
    pub count: Option<u64>,
}

impl FindResponse {
    /// Number of matches: the service-reported count, or the number of returned entries.
    pub fn total(&self) -> u64 {
        self.count
            .unwrap_or(self.data.len() as u64)
    }

    /// Projects the keyed result set into a sequence of documents.
    pub fn into_documents(self) -> Vec<Document> {
        self.data
            .into_values()
            .collect()
    }
}

/// Abstract interface for the document service client.
///
/// Implementations must be thread-safe; the driver shares a single session
/// between every database and collection handle it creates. Any concurrency
/// control, ordering or retry behaviour is the implementation's concern.
///
/// # Error Handling
///
/// Implementations report transport and service failures as
/// [`DriverError::Backend`](crate::error::DriverError::Backend); the driver
/// re-tags them at its boundary.
#[async_trait]
pub trait DocumentService: Send + Sync + Debug {
    /// Creates (or replaces) the document stored under `id`.
    async fn create_document(
        &self,
        namespace: &str,
        collection: &str,
        id: &str,
        document: Document,
    ) -> DriverResult<()>;

    /// Writes several documents in one request, keying each by the value at `id_path`.
    ///
    /// Returns the document ids the service assigned, in request order.
    async fn batch_documents(
        &self,
        namespace: &str,
        collection: &str,
        documents: Vec<Document>,
        id_path: &str,
    ) -> DriverResult<Vec<String>>;

    /// Finds every document matching an operator-structured query.
    async fn find_documents(
        &self,
        namespace: &str,
        collection: &str,
        query: Document,
        options: FindOptions,
    ) -> DriverResult<FindResponse>;

    /// Finds a single document matching an operator-structured query.
    async fn find_one_document(
        &self,
        namespace: &str,
        collection: &str,
        query: Document,
    ) -> DriverResult<Option<Document>>;

    /// Merges `patch` into the document stored under `id`.
    async fn update_document(
        &self,
        namespace: &str,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> DriverResult<()>;

    /// Deletes the document stored under `id`.
    async fn delete_document(&self, namespace: &str, collection: &str, id: &str) -> DriverResult<()>;

    /// Creates a collection in a namespace.
    async fn create_collection(&self, namespace: &str, name: &str) -> DriverResult<()>;

    /// Deletes a collection and all its documents.
    async fn delete_collection(&self, namespace: &str, name: &str) -> DriverResult<()>;

    /// Lists the collection names of a namespace.
    async fn list_collections(&self, namespace: &str) -> DriverResult<Vec<String>>;
}

/// Factory trait establishing sessions against the document service.
#[async_trait]
pub trait ServiceConnector: Send + Sync + Debug {
    type Service: DocumentService + 'static;

    /// Establishes a session for `base_url`, authenticated with `token`.
    async fn create_session(&self, base_url: &Url, token: &str) -> DriverResult<Self::Service>;
}
