//! AstraDB backend for docshim.
//!
//! This crate implements the `DocumentService` trait over the AstraDB
//! Document API v2 using `reqwest`. Every request is authenticated with the
//! application token given to the driver client.
//!
//! To use this backend, include the `astra` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docshim = { version = "x.y.z", features = ["astra"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docshim::{prelude::*, astra::AstraConnector};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> DriverResult<()> {
//!     let options = ClientOptions::from_env()?;
//!     let connector = AstraConnector::new().timeout(Duration::from_secs(10));
//!
//!     let client = MongoClient::new(options, connector);
//!     client.connect().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docshim_astra;

pub mod service;
mod wire;

pub use service::{AstraConnector, AstraService};
