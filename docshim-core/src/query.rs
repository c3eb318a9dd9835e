//! Query and update translation between driver conventions and service request shapes.
//!
//! Mapper-style query documents use bare values for equality (`{"name": "A"}`),
//! while the document service only accepts explicit operators
//! (`{"name": {"$eq": "A"}}`). [`format_query`] performs that rewrite on the
//! top-level fields of a query. [`update_patch`] reduces a driver update
//! document to the merge patch the service applies.
//!
//! # Example
//!
//! ```ignore
//! use bson::doc;
//! use docshim_core::query::format_query;
//!
//! let formatted = format_query(&doc! { "status": "active", "age": { "$gt": 18 } });
//! assert_eq!(formatted, doc! { "status": { "$eq": "active" }, "age": { "$gt": 18 } });
//! ```

use bson::{Bson, Document};

use crate::error::{DriverError, DriverResult};

/// Operator key the service uses for equality.
pub const EQUALS_OPERATOR: &str = "$eq";

/// Update operator whose contents are applied as a merge patch.
pub const SET_OPERATOR: &str = "$set";

/// Largest page the service hands back for a single find request.
pub const MAX_PAGE_SIZE: usize = 20;

/// Options forwarded to the service with a find request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
    /// Top-level fields to return; `None` returns whole documents.
    pub projection: Option<Vec<String>>,
}

impl FindOptions {
    /// Creates options for a single-document lookup.
    pub fn single() -> Self {
        Self { limit: Some(1), projection: None }
    }
}

/// Returns true for the scalar kinds the service needs wrapped in an equality operator.
pub fn is_equality_scalar(value: &Bson) -> bool {
    matches!(
        value,
        Bson::String(_)
            | Bson::Int32(_)
            | Bson::Int64(_)
            | Bson::Double(_)
            | Bson::Decimal128(_)
            | Bson::Boolean(_)
            | Bson::ObjectId(_)
    )
}

/// Rewrites every top-level scalar value of `query` into `{"$eq": value}`.
///
/// Values that are not strings, numbers, booleans or object ids pass through
/// untouched, so already-structured operator expressions are never wrapped a
/// second time. Nested documents are not inspected. The input is not modified.
pub fn format_query(query: &Document) -> Document {
    query
        .iter()
        .map(|(field, value)| {
            if is_equality_scalar(value) {
                let mut wrapped = Document::new();
                wrapped.insert(EQUALS_OPERATOR, value.clone());
                (field.clone(), Bson::Document(wrapped))
            } else {
                (field.clone(), value.clone())
            }
        })
        .collect()
}

/// Reduces a driver update document to the merge patch sent to the service.
///
/// Accepts either `{"$set": {...}}` or a plain field document. The `_id`
/// field is never patched.
///
/// # Errors
///
/// Returns [`DriverError::InvalidDocument`] for any other update operator, for
/// a `$set` whose value is not a document, or for an update mixing operators
/// and plain fields.
pub fn update_patch(update: &Document) -> DriverResult<Document> {
    let has_operators = update.keys().any(|key| key.starts_with('$'));

    let patch = if has_operators {
        let mut patch = Document::new();

        for (key, value) in update {
            match (key.as_str(), value) {
                (SET_OPERATOR, Bson::Document(fields)) => {
                    for (field, value) in fields {
                        patch.insert(field.clone(), value.clone());
                    }
                }
                (SET_OPERATOR, _) => {
                    return Err(DriverError::InvalidDocument(
                        "$set requires a document value".to_string(),
                    ));
                }
                (op, _) if op.starts_with('$') => {
                    return Err(DriverError::InvalidDocument(format!(
                        "unsupported update operator: {op}"
                    )));
                }
                (field, _) => {
                    return Err(DriverError::InvalidDocument(format!(
                        "update mixes operators with plain field {field}"
                    )));
                }
            }
        }

        patch
    } else {
        update.clone()
    };

    Ok(patch
        .into_iter()
        .filter(|(key, _)| key != crate::document::ID_FIELD)
        .collect())
}

/// Applies a merge patch to a document, returning the patched copy.
pub fn apply_patch(document: &Document, patch: &Document) -> Document {
    let mut patched = document.clone();
    for (key, value) in patch {
        patched.insert(key.clone(), value.clone());
    }
    patched
}
