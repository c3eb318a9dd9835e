//! In-memory document service for docshim.
//!
//! This crate provides a thread-safe, in-memory implementation of the
//! `DocumentService` trait that behaves like the remote document service:
//! queries must be operator-structured, writes create collections implicitly
//! and collection lifecycle calls report conflicts. It is intended for
//! development and tests.
//!
//! # Quick Start
//!
//! ```ignore
//! use docshim::{prelude::*, memory::InMemoryService};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> DriverResult<()> {
//!     let service = InMemoryService::new();
//!     let options = ClientOptions::new("http://localhost", "shop", "token")?;
//!     let client = MongoClient::new(options, service.connector());
//!     client.connect().await?;
//!
//!     let products = client.default_db()?.collection("products");
//!     products.insert_one(doc! { "name": "Product 1" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshim_memory;

pub mod service;
mod evaluator;

pub use service::{InMemoryConnector, InMemoryService};
