//! Identifier handling and typed conversion for documents.
//!
//! Documents travel through the driver as [`bson::Document`]. The service keys
//! every document by a string id derived from the `_id` field, so this module
//! owns the mapping between BSON identifiers and service document ids, and the
//! serde conversions used by the typed convenience methods.

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};

use crate::error::{DriverError, DriverResult};

/// Name of the primary key field carried by every stored document.
pub const ID_FIELD: &str = "_id";

/// Converts an identifier value into the string id used by the service.
///
/// The service keys documents by string, so identifiers of different kinds
/// that print the same share one key: `_id: 1`, `_id: 1_i64` and `_id: "1"`
/// all map to `"1"`, and writing one replaces a document stored under another.
///
/// # Errors
///
/// Returns [`DriverError::InvalidDocument`] for identifier kinds the service
/// cannot key on (documents, arrays, floats, ...).
pub fn id_to_string(id: &Bson) -> DriverResult<String> {
    match id {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        Bson::String(s) if !s.is_empty() => Ok(s.clone()),
        Bson::Int32(n) => Ok(n.to_string()),
        Bson::Int64(n) => Ok(n.to_string()),
        other => Err(DriverError::InvalidDocument(format!(
            "unsupported {ID_FIELD} value: {other}"
        ))),
    }
}

/// Returns the service document id of `document`.
///
/// # Errors
///
/// Returns [`DriverError::InvalidDocument`] if the document has no `_id` or
/// the `_id` is not a supported identifier kind.
pub fn document_id(document: &Document) -> DriverResult<String> {
    match document.get(ID_FIELD) {
        Some(id) => id_to_string(id),
        None => Err(DriverError::InvalidDocument(format!(
            "document is missing the {ID_FIELD} field"
        ))),
    }
}

/// Makes sure `document` carries an `_id`, generating an [`ObjectId`] when it does not.
///
/// Returns the identifier value the document ends up with.
pub fn ensure_id(document: &mut Document) -> Bson {
    if let Some(id) = document.get(ID_FIELD) {
        return id.clone();
    }

    let id = Bson::ObjectId(ObjectId::new());
    document.insert(ID_FIELD, id.clone());
    id
}

/// Extension trait providing document conversion for serde types.
///
/// This trait is automatically implemented for every type that is both
/// `Serialize` and `Deserialize`, which lets the typed collection helpers
/// accept plain application structs.
pub trait DocumentExt: Sized {
    /// Converts this value into a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the value does not serialize to a document.
    fn to_document(&self) -> DriverResult<Document>;

    /// Creates a value from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_document(document: Document) -> DriverResult<Self>;
}

impl<T> DocumentExt for T
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    fn to_document(&self) -> DriverResult<Document> {
        match serialize_to_bson(self)? {
            Bson::Document(document) => Ok(document),
            other => Err(DriverError::InvalidDocument(format!(
                "expected a document, found {:?}",
                other.element_type()
            ))),
        }
    }

    fn from_document(document: Document) -> DriverResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(document))?)
    }
}
