//! Database handles bound to a keyspace.
//!
//! A [`Db`] resolves collections and performs collection lifecycle operations.
//! Creating and dropping collections is best-effort: the service's refusal
//! (already exists, not found, or anything else) is reported as a
//! [`BestEffort::Skipped`] status instead of an error.

use tracing::{debug, warn};

use crate::{collection::Collection, error::DriverResult, namespace::Namespace};

/// Outcome of a best-effort lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort {
    /// The service performed the operation.
    Applied,
    /// The service declined; the reason is kept for diagnostics.
    Skipped { reason: String },
}

impl BestEffort {
    /// Returns true if the service performed the operation.
    pub fn is_applied(&self) -> bool {
        matches!(self, BestEffort::Applied)
    }
}

/// A handle for one keyspace of the connected service.
#[derive(Debug, Clone)]
pub struct Db {
    namespace: Namespace,
}

impl Db {
    pub(crate) fn new(namespace: Namespace) -> Self {
        Self { namespace }
    }

    /// Returns the keyspace name.
    pub fn name(&self) -> &str {
        self.namespace.name()
    }

    /// Gets a collection handle. Performs no I/O.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.namespace.collection(name))
    }

    /// Creates a collection; an existing collection counts as done.
    pub async fn create_collection(&self, name: &str) -> BestEffort {
        match self.namespace.create_collection(name).await {
            Ok(()) => {
                debug!(namespace = self.name(), collection = name, "collection created");
                BestEffort::Applied
            }
            Err(err) => {
                warn!(namespace = self.name(), collection = name, error = %err, "create_collection ignored");
                BestEffort::Skipped { reason: err.to_string() }
            }
        }
    }

    /// Drops a collection; a missing collection counts as done.
    pub async fn drop_collection(&self, name: &str) -> BestEffort {
        match self.namespace.delete_collection(name).await {
            Ok(()) => {
                debug!(namespace = self.name(), collection = name, "collection dropped");
                BestEffort::Applied
            }
            Err(err) => {
                warn!(namespace = self.name(), collection = name, error = %err, "drop_collection ignored");
                BestEffort::Skipped { reason: err.to_string() }
            }
        }
    }

    /// Lists the collection names in this keyspace.
    pub async fn list_collection_names(&self) -> DriverResult<Vec<String>> {
        self.namespace.list_collections().await
    }
}
