//! Convenient re-exports of commonly used types from docshim.
//!
//! ```ignore
//! use docshim::prelude::*;
//! ```

pub use docshim_core::{
    client::{ClientOptions, ClientOptionsBuilder, MongoClient},
    collection::{Collection, DeleteResult, InsertManyResult, InsertOneResult},
    completion::CompletionExt,
    cursor::FindCursor,
    database::{BestEffort, Db},
    document::DocumentExt,
    service::{DocumentService, ServiceConnector},
    error::{DriverError, DriverResult},
};
