//! In-memory implementation of the document service.
//!
//! Documents are kept as BSON in nested HashMaps (namespace -> collection ->
//! document id -> document) behind an async-aware read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use bson::Document;
use mea::rwlock::RwLock;
use tracing::debug;
use url::Url;

use docshim_core::{
    document::id_to_string,
    error::{DriverError, DriverResult},
    query::{FindOptions, apply_patch},
    service::{DocumentService, FindResponse, ServiceConnector},
};

use crate::evaluator::QueryEvaluator;

type CollectionMap = HashMap<String, Document>;
type NamespaceMap = HashMap<String, CollectionMap>;
type StoreMap = HashMap<String, NamespaceMap>;


/// Thread-safe in-memory document service.
///
/// `InMemoryService` is cloneable and uses an `Arc`-wrapped internal state;
/// clones share the same underlying data, so a test can keep one clone to
/// inspect what the driver wrote through another.
///
/// Writes create collections implicitly, as the remote service does. Queries
/// scan every document of the collection.
///
/// # Example
///
/// ```ignore
/// use docshim_memory::InMemoryService;
/// use docshim_core::service::DocumentService;
/// use bson::doc;
///
/// let service = InMemoryService::new();
/// service.create_document("shop", "products", "p1", doc! { "_id": "p1" }).await?;
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryService {
    /// namespace -> collection -> document id -> document
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryService {
    /// Creates a new empty service.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a connector handing out sessions onto this service.
    pub fn connector(&self) -> InMemoryConnector {
        InMemoryConnector {
            service: self.clone(),
            token: None,
        }
    }

    /// Returns the number of documents stored in a collection.
    pub async fn document_count(&self, namespace: &str, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(namespace)
            .and_then(|collections| collections.get(collection))
            .map_or(0, HashMap::len)
    }

    fn project(document: Document, fields: &[String]) -> Document {
        document
            .into_iter()
            .filter(|(key, _)| fields.iter().any(|field| field == key))
            .collect()
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new()
    }
}


#[async_trait]
impl DocumentService for InMemoryService {
    async fn create_document(&self, namespace: &str, collection: &str, id: &str, document: Document) -> DriverResult<()> {
        self.store
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);

        Ok(())
    }

    async fn batch_documents(&self, namespace: &str, collection: &str, documents: Vec<Document>, id_path: &str) -> DriverResult<Vec<String>> {
        // Resolve every id before writing so a bad document leaves the collection untouched
        let keyed = documents
            .into_iter()
            .map(|document| {
                let id = document
                    .get(id_path)
                    .ok_or_else(|| DriverError::Backend(format!("document is missing {id_path}")))
                    .and_then(|id| id_to_string(id).map_err(|e| DriverError::Backend(e.to_string())))?;
                Ok((id, document))
            })
            .collect::<DriverResult<Vec<_>>>()?;

        let mut store = self.store.write().await;
        let collection_map = store
            .entry(namespace.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        let mut ids = Vec::with_capacity(keyed.len());
        for (id, document) in keyed {
            collection_map.insert(id.clone(), document);
            ids.push(id);
        }

        Ok(ids)
    }

    async fn find_documents(&self, namespace: &str, collection: &str, query: Document, options: FindOptions) -> DriverResult<FindResponse> {
        let store = self.store.read().await;
        let collection_map = match store
            .get(namespace)
            .and_then(|collections| collections.get(collection))
        {
            Some(col) => col,
            None => return Ok(FindResponse::default()),
        };

        let data = QueryEvaluator::filter_documents(collection_map.iter(), &query)?
            .into_iter()
            .take(options.limit.unwrap_or(usize::MAX))
            .map(|(id, document)| match &options.projection {
                Some(fields) => (id, Self::project(document, fields)),
                None => (id, document),
            })
            .collect::<HashMap<_, _>>();

        Ok(FindResponse { data, count: None })
    }

    async fn find_one_document(&self, namespace: &str, collection: &str, query: Document) -> DriverResult<Option<Document>> {
        Ok(self
            .find_documents(namespace, collection, query, FindOptions::single())
            .await?
            .into_documents()
            .into_iter()
            .next())
    }

    async fn update_document(&self, namespace: &str, collection: &str, id: &str, patch: Document) -> DriverResult<()> {
        let mut store = self.store.write().await;
        let document = store
            .get_mut(namespace)
            .and_then(|collections| collections.get_mut(collection))
            .and_then(|documents| documents.get_mut(id))
            .ok_or_else(|| DriverError::Backend(format!("document {id} not found in collection {collection}")))?;

        *document = apply_patch(document, &patch);

        Ok(())
    }

    async fn delete_document(&self, namespace: &str, collection: &str, id: &str) -> DriverResult<()> {
        let mut store = self.store.write().await;

        if let Some(documents) = store
            .get_mut(namespace)
            .and_then(|collections| collections.get_mut(collection))
        {
            documents.remove(id);
        }

        Ok(())
    }

    async fn create_collection(&self, namespace: &str, name: &str) -> DriverResult<()> {
        let mut store = self.store.write().await;
        let collections = store
            .entry(namespace.to_string())
            .or_default();

        if collections.contains_key(name) {
            return Err(DriverError::Backend(format!("collection {name} already exists")));
        }

        collections.insert(name.to_string(), CollectionMap::new());
        debug!(namespace, collection = name, "in-memory collection created");

        Ok(())
    }

    async fn delete_collection(&self, namespace: &str, name: &str) -> DriverResult<()> {
        let mut store = self.store.write().await;

        if store
            .get_mut(namespace)
            .and_then(|collections| collections.remove(name))
            .is_none()
        {
            return Err(DriverError::Backend(format!("collection {name} not found")));
        }

        debug!(namespace, collection = name, "in-memory collection deleted");

        Ok(())
    }

    async fn list_collections(&self, namespace: &str) -> DriverResult<Vec<String>> {
        Ok(
            self.store
                .read()
                .await
                .get(namespace)
                .map(|collections| collections.keys().cloned().collect())
                .unwrap_or_default()
        )
    }
}


/// Connector producing sessions onto a shared [`InMemoryService`].
///
/// When a token is configured, sessions are only granted for that token.
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    service: InMemoryService,
    token: Option<String>,
}

impl InMemoryConnector {
    /// Requires sessions to present `token`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

#[async_trait]
impl ServiceConnector for InMemoryConnector {
    type Service = InMemoryService;

    async fn create_session(&self, base_url: &Url, token: &str) -> DriverResult<Self::Service> {
        if let Some(expected) = &self.token {
            if expected != token {
                return Err(DriverError::Connection(format!("token rejected by {base_url}")));
            }
        }

        Ok(self.service.clone())
    }
}
