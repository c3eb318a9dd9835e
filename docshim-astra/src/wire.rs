//! BSON <-> JSON conversion for the document API wire format.
//!
//! The service speaks plain JSON. Values with no JSON counterpart are lowered
//! to the string forms the service indexes and compares on; everything else
//! goes out as relaxed extended JSON.

use bson::{Bson, Document, spec::BinarySubtype};
use chrono::SecondsFormat;
use serde_json::{Map, Number, Value};

use docshim_core::error::{DriverError, DriverResult};


pub(crate) struct WireValue;

impl WireValue {
    /// Lowers a BSON value to its JSON wire form.
    pub(crate) fn to_json(value: &Bson) -> Value {
        match value {
            Bson::Null | Bson::Undefined => Value::Null,
            Bson::Boolean(b) => Value::Bool(*b),
            Bson::Int32(n) => Value::from(*n),
            Bson::Int64(n) => Value::from(*n),
            // NaN and infinities have no JSON number form
            Bson::Double(n) => Number::from_f64(*n).map_or_else(|| value.clone().into_relaxed_extjson(), Value::Number),
            Bson::String(s) => Value::String(s.clone()),
            Bson::ObjectId(oid) => Value::String(oid.to_hex()),
            Bson::DateTime(dt) => Value::String(dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)),
            Bson::Binary(binary) if binary.subtype == BinarySubtype::Uuid => {
                match <[u8; 16]>::try_from(binary.bytes.as_slice()) {
                    Ok(bytes) => Value::String(bson::Uuid::from_bytes(bytes).to_string()),
                    Err(_) => value.clone().into_relaxed_extjson(),
                }
            }
            Bson::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Bson::Document(doc) => Value::Object(Self::object(doc)),
            other => other.clone().into_relaxed_extjson(),
        }
    }

    pub(crate) fn object(document: &Document) -> Map<String, Value> {
        document
            .iter()
            .map(|(k, v)| (k.clone(), Self::to_json(v)))
            .collect()
    }

    /// Raises a JSON wire value back to BSON.
    pub(crate) fn to_bson(value: Value) -> Bson {
        match value {
            Value::Null => Bson::Null,
            Value::Bool(b) => Bson::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i32::try_from(i).map_or(Bson::Int64(i), Bson::Int32),
                None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Bson::String(s),
            Value::Array(items) => Bson::Array(items.into_iter().map(Self::to_bson).collect()),
            Value::Object(map) => Bson::Document(Self::document(map)),
        }
    }

    pub(crate) fn document(map: Map<String, Value>) -> Document {
        map.into_iter()
            .map(|(k, v)| (k, Self::to_bson(v)))
            .collect()
    }

    /// Raises a JSON value that must be an object.
    pub(crate) fn expect_document(value: Value) -> DriverResult<Document> {
        match value {
            Value::Object(map) => Ok(Self::document(map)),
            other => Err(DriverError::Backend(format!("expected a JSON object, got {other}"))),
        }
    }
}
