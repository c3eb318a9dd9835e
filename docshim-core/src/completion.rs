//! Completion callbacks for pending driver results.
//!
//! Every driver operation is an `async fn`; the returned future is the
//! pending result. Callers that want the `(error, value)` callback style wrap
//! the future with [`CompletionExt::with_callback`]. The callback runs exactly
//! once when the future resolves and the wrapped future still yields the same
//! result, so both styles can be used together.
//!
//! ```ignore
//! use docshim_core::completion::CompletionExt;
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

use futures::FutureExt;
use std::future::Future;

use crate::error::{DriverError, DriverResult};

/// Extension trait attaching a completion callback to a pending driver result.
pub trait CompletionExt<T>: Future<Output = DriverResult<T>> + Sized {
    /// Invokes `callback` with `(error, value)` once the result is available.
    ///
    /// Exactly one of the two arguments is `Some`.
    fn with_callback<F>(self, callback: F) -> impl Future<Output = DriverResult<T>>
    where
        F: FnOnce(Option<&DriverError>, Option<&T>),
    {
        self.inspect(move |result| match result {
            Ok(value) => callback(None, Some(value)),
            Err(err) => callback(Some(err), None),
        })
    }
}

impl<T, Fut> CompletionExt<T> for Fut where Fut: Future<Output = DriverResult<T>> {}
