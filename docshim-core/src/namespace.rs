//! Namespace and collection handles over a shared service session.
//!
//! These mirror the shape of the underlying client: a session hands out a
//! [`Namespace`] per keyspace, and a namespace hands out a [`CollectionClient`]
//! per collection. Both are cheap to clone and perform no I/O on construction.

use bson::Document;
use std::sync::Arc;

use crate::{
    error::DriverResult,
    query::FindOptions,
    service::{DocumentService, FindResponse},
};

/// Handle for a keyspace within a service session.
#[derive(Debug, Clone)]
pub struct Namespace {
    name: String,
    service: Arc<dyn DocumentService>,
}

impl Namespace {
    pub(crate) fn new(name: String, service: Arc<dyn DocumentService>) -> Self {
        Self { name, service }
    }

    /// Returns the name of this namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the client for a collection in this namespace.
    pub fn collection(&self, name: &str) -> CollectionClient {
        CollectionClient {
            namespace: self.name.clone(),
            name: name.to_string(),
            service: Arc::clone(&self.service),
        }
    }

    pub async fn create_collection(&self, name: &str) -> DriverResult<()> {
        self.service
            .create_collection(&self.name, name)
            .await
    }

    pub async fn delete_collection(&self, name: &str) -> DriverResult<()> {
        self.service
            .delete_collection(&self.name, name)
            .await
    }

    pub async fn list_collections(&self) -> DriverResult<Vec<String>> {
        self.service.list_collections(&self.name).await
    }
}

/// Per-collection client forwarding to the shared service session.
#[derive(Debug, Clone)]
pub struct CollectionClient {
    namespace: String,
    name: String,
    service: Arc<dyn DocumentService>,
}

impl CollectionClient {
    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace this collection lives in.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub async fn create(&self, id: &str, document: Document) -> DriverResult<()> {
        self.service
            .create_document(&self.namespace, &self.name, id, document)
            .await
    }

    pub async fn batch(&self, documents: Vec<Document>, id_path: &str) -> DriverResult<Vec<String>> {
        self.service
            .batch_documents(&self.namespace, &self.name, documents, id_path)
            .await
    }

    pub async fn find(&self, query: Document, options: FindOptions) -> DriverResult<FindResponse> {
        self.service
            .find_documents(&self.namespace, &self.name, query, options)
            .await
    }

    pub async fn find_one(&self, query: Document) -> DriverResult<Option<Document>> {
        self.service
            .find_one_document(&self.namespace, &self.name, query)
            .await
    }

    pub async fn update(&self, id: &str, patch: Document) -> DriverResult<()> {
        self.service
            .update_document(&self.namespace, &self.name, id, patch)
            .await
    }

    pub async fn delete(&self, id: &str) -> DriverResult<()> {
        self.service
            .delete_document(&self.namespace, &self.name, id)
            .await
    }
}
