//! Operator query evaluation for in-memory document filtering.
//!
//! Queries reaching the service are operator-structured
//! (`{"field": {"$op": value}}`), optionally combined with `$and` / `$or`.
//! Bare values are rejected the same way the remote service rejects them.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, DateTime, Document, oid::ObjectId};

use docshim_core::error::{DriverError, DriverResult};


/// Type-erased, comparable representation of BSON values.
///
/// Integers compare exactly against integers; mixing an integer with a float
/// compares both as f64 so that `3` and `3.0` are equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (Int32 and Int64)
    Int(i64),
    /// Floating point value
    Number(f64),
    /// Decimal value, compared by its encoded bytes
    Decimal([u8; 16]),
    /// DateTime value
    DateTime(DateTime),
    /// Object id
    ObjectId(ObjectId),
    /// String value
    String(&'a str),
    /// Array of comparable values
    Array(Vec<Comparable<'a>>),
    /// Map/Object of comparable values
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other kind, equal only to an identical value of the same kind
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::Decimal128(value) => Comparable::Decimal(value.bytes()),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Int(a), Comparable::Int(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::Int(a), Comparable::Number(b)) | (Comparable::Number(b), Comparable::Int(a)) => *a as f64 == *b,
            (Comparable::Decimal(a), Comparable::Decimal(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


/// Resolves a possibly dotted field path inside a document.
fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Evaluates operator-structured queries against one document at a time.
pub(crate) struct QueryEvaluator<'a> {
    document: &'a Document,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&self, query: &Document) -> DriverResult<bool> {
        for (key, condition) in query {
            let matched = match key.as_str() {
                "$and" => self.evaluate_all(key, condition)?,
                "$or" => self.evaluate_any(key, condition)?,
                op if op.starts_with('$') => {
                    return Err(DriverError::QueryExecution(format!("unsupported query operator: {op}")));
                }
                field => self.evaluate_field(field, condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Keeps the documents matching `query`, failing on the first malformed condition.
    pub fn filter_documents<I>(documents: I, query: &Document) -> DriverResult<Vec<(String, Document)>>
    where
        I: IntoIterator<Item = (&'a String, &'a Document)>,
    {
        let mut matched = Vec::new();

        for (id, document) in documents {
            if QueryEvaluator::new(document).evaluate(query)? {
                matched.push((id.clone(), document.clone()));
            }
        }

        Ok(matched)
    }

    fn subqueries<'q>(key: &str, condition: &'q Bson) -> DriverResult<Vec<&'q Document>> {
        condition
            .as_array()
            .ok_or_else(|| DriverError::QueryExecution(format!("{key} requires an array of queries")))?
            .iter()
            .map(|item| {
                item.as_document()
                    .ok_or_else(|| DriverError::QueryExecution(format!("{key} entries must be documents")))
            })
            .collect()
    }

    fn evaluate_all(&self, key: &str, condition: &Bson) -> DriverResult<bool> {
        for query in Self::subqueries(key, condition)? {
            if !self.evaluate(query)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn evaluate_any(&self, key: &str, condition: &Bson) -> DriverResult<bool> {
        for query in Self::subqueries(key, condition)? {
            if self.evaluate(query)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn evaluate_field(&self, field: &str, condition: &Bson) -> DriverResult<bool> {
        let operators = match condition {
            Bson::Document(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => ops,
            _ => {
                return Err(DriverError::QueryExecution(format!(
                    "condition on {field} must be an operator document"
                )));
            }
        };

        let field_value = lookup(self.document, field);

        for (op, value) in operators {
            if !Self::apply(op, field_value, value)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn apply(op: &str, field_value: Option<&Bson>, value: &Bson) -> DriverResult<bool> {
        if op == "$exists" {
            return match value {
                Bson::Boolean(should_exist) => Ok(field_value.is_some() == *should_exist),
                _ => Err(DriverError::QueryExecution("$exists requires a boolean".to_string())),
            };
        }

        let Some(field_value) = field_value else {
            return Ok(matches!(op, "$ne" | "$nin"));
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        match op {
            "$eq" => Ok(left == right),
            "$ne" => Ok(left != right),
            "$gt" | "$gte" | "$lt" | "$lte" => match left.partial_cmp(&right) {
                Some(ordering) => Ok(match op {
                    "$gt" => ordering == Ordering::Greater,
                    "$gte" => ordering != Ordering::Less,
                    "$lt" => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                }),
                None => Ok(false),
            },
            "$in" | "$nin" => {
                let Comparable::Array(candidates) = right else {
                    return Err(DriverError::QueryExecution(format!("{op} requires an array")));
                };
                let found = candidates.iter().any(|candidate| candidate == &left);
                Ok(if op == "$in" { found } else { !found })
            }
            other => Err(DriverError::QueryExecution(format!("unsupported query operator: {other}"))),
        }
    }
}
