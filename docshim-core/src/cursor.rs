//! Deferred find queries.

use bson::Document;
use tracing::debug;

use crate::{
    completion::CompletionExt,
    document::DocumentExt,
    error::{DriverError, DriverResult},
    namespace::CollectionClient,
    query::FindOptions,
};

/// A find query that has not been executed yet.
///
/// Creating a cursor performs no I/O. Each call to [`FindCursor::to_array`]
/// runs the bound query against the service; results are not cached between
/// calls and their order is whatever the service's keyed result set yields.
#[derive(Debug, Clone)]
pub struct FindCursor {
    client: CollectionClient,
    query: Document,
    options: FindOptions,
}

impl FindCursor {
    pub(crate) fn new(client: CollectionClient, query: Document) -> Self {
        Self { client, query, options: FindOptions::default() }
    }

    /// Returns the operator-structured query this cursor is bound to.
    pub fn query(&self) -> &Document {
        &self.query
    }

    /// Limits the number of documents returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    /// Restricts returned documents to the given top-level fields.
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Executes the query and returns the matched documents as a sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::QueryExecution`] if the service rejects the query.
    pub async fn to_array(&self) -> DriverResult<Vec<Document>> {
        debug!(
            collection = self.client.name(),
            namespace = self.client.namespace(),
            "materializing find cursor"
        );

        let response = self
            .client
            .find(self.query.clone(), self.options.clone())
            .await
            .map_err(DriverError::into_query_execution)?;

        let mut documents = response.into_documents();
        if let Some(limit) = self.options.limit {
            documents.truncate(limit);
        }

        Ok(documents)
    }

    /// Executes the query, invoking `callback` with `(error, documents)` on completion.
    pub async fn to_array_with_callback<F>(&self, callback: F) -> DriverResult<Vec<Document>>
    where
        F: FnOnce(Option<&DriverError>, Option<&Vec<Document>>),
    {
        self.to_array()
            .with_callback(callback)
            .await
    }

    /// Executes the query and deserializes every match into `T`.
    pub async fn to_vec_as<T: DocumentExt>(&self) -> DriverResult<Vec<T>> {
        self.to_array()
            .await?
            .into_iter()
            .map(T::from_document)
            .collect()
    }
}
