//! A MongoDB-style driver surface over a document-collection HTTP service.
//!
//! This crate is the core of the docshim project and provides:
//!
//! - **Query translation** ([`query`]) - Equality wrapping of mapper queries and update patches
//! - **Service abstraction** ([`service`]) - Traits for the underlying document service client
//! - **Service handles** ([`namespace`]) - Namespace and per-collection clients over a shared session
//! - **Driver surface** ([`client`], [`database`], [`collection`], [`cursor`]) - `MongoClient`, `Db`, `Collection`, `FindCursor`
//! - **Completion callbacks** ([`completion`]) - `(error, value)` callbacks on pending results
//! - **Documents** ([`document`]) - Identifier handling and typed conversion
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docshim_core::client::{ClientOptions, MongoClient};
//! use bson::doc;
//!
//! let client = MongoClient::new(ClientOptions::from_env()?, connector);
//! client.connect().await?;
//!
//! let products = client.default_db()?.collection("products");
//! products.insert_one(doc! { "name": "Product 1", "price": 10 }).await?;
//!
//! let found = products.find_one(doc! { "name": "Product 1" }).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshim_core;

pub mod client;
pub mod collection;
pub mod completion;
pub mod cursor;
pub mod database;
pub mod document;
pub mod error;
pub mod namespace;
pub mod query;
pub mod service;

#[cfg(test)]
mod testing;
