//! Driver-style collection operations.
//!
//! [`Collection`] adapts the conventional driver calls a mapper issues
//! (`insertOne`, `find`, `updateOne`, `distinct`, ...) to the per-collection
//! service client, formatting queries on the way in and reshaping results on
//! the way out.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//!
//! let db = client.db("shop")?;
//! let products = db.collection("products");
//!
//! products.insert_one(doc! { "name": "Product 1", "price": 10 }).await?;
//! let cheap = products.find(doc! { "price": 10 }).to_array().await?;
//! let names = products.distinct("name", doc! {}).await?;
//! # Ok::<(), docshim_core::error::DriverError>(())
//! ```

use bson::{Bson, Document};
use tracing::{debug, warn};

use crate::{
    cursor::FindCursor,
    document::{DocumentExt, ID_FIELD, document_id, ensure_id},
    error::{DriverError, DriverResult},
    namespace::CollectionClient,
    query::{FindOptions, apply_patch, format_query, update_patch},
};

/// Result of [`Collection::insert_one`].
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    /// The `_id` the inserted document carries.
    pub inserted_id: Bson,
}

/// Result of [`Collection::insert_many`].
#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    /// The `_id` of every inserted document, in input order.
    pub inserted_ids: Vec<Bson>,
}

/// Result of [`Collection::delete_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    /// Number of documents removed (0 or 1).
    pub deleted_count: u64,
}

/// A named collection bound to the shared service session.
#[derive(Debug, Clone)]
pub struct Collection {
    client: CollectionClient,
}

impl Collection {
    pub(crate) fn new(client: CollectionClient) -> Self {
        Self { client }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.client.name()
    }

    /// Returns the namespace (keyspace) this collection lives in.
    pub fn namespace(&self) -> &str {
        self.client.namespace()
    }

    /// Inserts a document keyed by its `_id`, generating one if it has none.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Write`] if the service rejects the document, or
    /// [`DriverError::InvalidDocument`] if its `_id` cannot key a document.
    pub async fn insert_one(&self, mut document: Document) -> DriverResult<InsertOneResult> {
        let inserted_id = ensure_id(&mut document);
        let id = document_id(&document)?;

        debug!(collection = self.name(), id = %id, "insert_one");

        self.client
            .create(&id, document)
            .await
            .map_err(DriverError::into_write)?;

        Ok(InsertOneResult { inserted_id })
    }

    /// Serializes `value` and inserts it with [`Collection::insert_one`].
    pub async fn insert_one_as<T: DocumentExt>(&self, value: &T) -> DriverResult<InsertOneResult> {
        self.insert_one(value.to_document()?).await
    }

    /// Inserts several documents in a single batched write keyed by `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Write`] if the batch is rejected. Identifiers are
    /// validated before anything is sent.
    pub async fn insert_many(&self, documents: Vec<Document>) -> DriverResult<InsertManyResult> {
        if documents.is_empty() {
            return Ok(InsertManyResult { inserted_ids: Vec::new() });
        }

        let mut inserted_ids = Vec::with_capacity(documents.len());
        let mut batch = Vec::with_capacity(documents.len());

        for mut document in documents {
            inserted_ids.push(ensure_id(&mut document));
            document_id(&document)?;
            batch.push(document);
        }

        debug!(collection = self.name(), count = batch.len(), "insert_many");

        self.client
            .batch(batch, ID_FIELD)
            .await
            .map_err(DriverError::into_write)?;

        Ok(InsertManyResult { inserted_ids })
    }

    /// Updates the first document matching `query`.
    ///
    /// Returns the matched document with the update applied, or `None` when
    /// nothing matches. A miss is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::InvalidDocument`] for unsupported update
    /// documents and [`DriverError::Write`] if the lookup or update fails.
    pub async fn update_one(&self, query: Document, update: Document) -> DriverResult<Option<Document>> {
        let patch = update_patch(&update)?;
        let formatted = format_query(&query);

        debug!(collection = self.name(), query = %formatted, "update_one");

        let Some(target) = self
            .client
            .find_one(formatted)
            .await
            .map_err(DriverError::into_write)?
        else {
            return Ok(None);
        };

        let id = document_id(&target)?;
        self.client
            .update(&id, patch.clone())
            .await
            .map_err(DriverError::into_write)?;

        Ok(Some(apply_patch(&target, &patch)))
    }

    /// Creates a cursor for `query` without executing it.
    pub fn find(&self, query: Document) -> FindCursor {
        FindCursor::new(self.client.clone(), format_query(&query))
    }

    /// Finds the first document matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::QueryExecution`] if the service rejects the query.
    pub async fn find_one(&self, query: Document) -> DriverResult<Option<Document>> {
        let formatted = format_query(&query);

        debug!(collection = self.name(), query = %formatted, "find_one");

        self.client
            .find_one(formatted)
            .await
            .map_err(DriverError::into_query_execution)
    }

    /// Finds the first document matching `query` and deserializes it into `T`.
    pub async fn find_one_as<T: DocumentExt>(&self, query: Document) -> DriverResult<Option<T>> {
        self.find_one(query)
            .await?
            .map(T::from_document)
            .transpose()
    }

    /// Returns the distinct values of `key` across documents matching `filter`.
    ///
    /// Array values are flattened. The first occurrence of each value is kept;
    /// since the service returns matches in no particular order, callers should
    /// treat the result as unordered.
    pub async fn distinct(&self, key: &str, filter: Document) -> DriverResult<Vec<Bson>> {
        let formatted = format_query(&filter);

        debug!(collection = self.name(), key, query = %formatted, "distinct");

        let documents = self
            .client
            .find(formatted, FindOptions::default())
            .await
            .map_err(DriverError::into_query_execution)?
            .into_documents();

        let mut values: Vec<Bson> = Vec::new();
        for value in documents
            .iter()
            .filter_map(|doc| doc.get(key))
        {
            let flattened = match value {
                Bson::Array(items) => items.iter().collect::<Vec<_>>(),
                single => vec![single],
            };

            for item in flattened {
                if !values.contains(item) {
                    values.push(item.clone());
                }
            }
        }

        Ok(values)
    }

    /// Counts documents matching `query`.
    ///
    /// Never fails: an execution failure is logged and reported as `0`.
    pub async fn count(&self, query: Document) -> u64 {
        let formatted = format_query(&query);

        debug!(collection = self.name(), query = %formatted, "count");

        match self
            .client
            .find(formatted, FindOptions::default())
            .await
        {
            Ok(response) => response.total(),
            Err(err) => {
                warn!(collection = self.name(), error = %err, "count failed, reporting zero");
                0
            }
        }
    }

    /// Same as [`Collection::count`].
    pub async fn count_documents(&self, query: Document) -> u64 {
        self.count(query).await
    }

    /// Acknowledges an index request without building anything.
    ///
    /// The service manages its own indexing; the index keys are echoed back.
    pub async fn create_index(&self, keys: Document) -> DriverResult<Document> {
        debug!(collection = self.name(), keys = %keys, "create_index acknowledged");

        Ok(keys)
    }

    /// Deletes the first document matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Write`] if the lookup or delete fails.
    pub async fn delete_one(&self, query: Document) -> DriverResult<DeleteResult> {
        let formatted = format_query(&query);

        debug!(collection = self.name(), query = %formatted, "delete_one");

        let Some(target) = self
            .client
            .find_one(formatted)
            .await
            .map_err(DriverError::into_write)?
        else {
            return Ok(DeleteResult { deleted_count: 0 });
        };

        self.client
            .delete(&document_id(&target)?)
            .await
            .map_err(DriverError::into_write)?;

        Ok(DeleteResult { deleted_count: 1 })
    }
}
