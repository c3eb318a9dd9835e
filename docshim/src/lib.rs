//! MongoDB-style driver surface over the AstraDB document service.
//!
//! This crate is the primary entry point. It re-exports the driver types from
//! `docshim-core` and provides access to the service backends:
//!
//! - **Familiar surface** - `MongoClient`, `Db`, `Collection` and `FindCursor` shaped like the MongoDB driver
//! - **Query formatting** - bare equality conditions are rewritten to `$eq` before reaching the service
//! - **Async first** - every operation is a future; completion callbacks are available through [`prelude::CompletionExt`]
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
//!     let client = MongoClient::new(
//!         ClientOptions::new("http://localhost", "shop", "token")?,
//!         service.connector(),
//!     );
//!     client.connect().await?;
//!
//!     let products = client.default_db()?.collection("products");
//!     products.insert_one(doc! { "name": "Product 1", "status": "active" }).await?;
//!
//!     let active = products
//!         .find(doc! { "status": "active" })
//!         .to_array()
//!         .await?;
//!
//!     println!("active products: {active:?}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Callbacks
//!
//! Any operation can report through an `(error, value)` callback as well as
//! its returned result:
//!
//! ```ignore
//! use docshim::prelude::*;
//!
//! let found = products
//!     .find_one(doc! { "name": "Product 1" })
//!     .with_callback(|err, doc| match (err, doc) {
//!         (Some(err), _) => eprintln!("lookup failed: {err}"),
//!         (None, Some(doc)) => println!("found {doc:?}"),
//!         (None, None) => {}
//!     })
//!     .await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process service for development and testing
//! - `astra` - AstraDB Document API v2 over HTTP (requires the `astra` feature)

pub mod prelude;

pub use docshim_core::{client, collection, completion, cursor, database, document, error, namespace, query, service};

// Re-export BSON types for convenience
pub use bson;

/// In-memory service implementation.
pub mod memory {
    pub use docshim_memory::{InMemoryConnector, InMemoryService};
}

/// AstraDB service implementation.
///
/// This module is only available when the `astra` feature is enabled.
#[cfg(feature = "astra")]
pub mod astra {
    pub use docshim_astra::{AstraConnector, AstraService};
}
