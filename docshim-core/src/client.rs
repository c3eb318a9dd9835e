//! Driver client: connection parameters and the shared service session.
//!
//! A [`MongoClient`] is created from [`ClientOptions`] and a
//! [`ServiceConnector`]. [`MongoClient::connect`] establishes the session once;
//! every [`Db`] and collection handle created afterwards shares it.
//!
//! # Example
//!
//! ```ignore
//! use docshim_core::client::{ClientOptions, MongoClient};
//!
//! let options = ClientOptions::from_env()?;
//! let client = MongoClient::new(options, connector);
//! client.connect().await?;
//!
//! let carts = client.default_db()?.collection("carts");
//! # Ok::<(), docshim_core::error::DriverError>(())
//! ```

use mea::mutex::Mutex;
use serde::Deserialize;
use std::{
    fmt,
    sync::{Arc, OnceLock},
};
use tracing::info;
use url::Url;

use crate::{
    database::Db,
    error::{DriverError, DriverResult},
    namespace::Namespace,
    service::{DocumentService, ServiceConnector},
};

const ENV_BASE_URL: &str = "ASTRA_DB_BASE_URL";
const ENV_DB_ID: &str = "ASTRA_DB_ID";
const ENV_DB_REGION: &str = "ASTRA_DB_REGION";
const ENV_KEYSPACE: &str = "ASTRA_DB_KEYSPACE";
const ENV_TOKEN: &str = "ASTRA_DB_APPLICATION_TOKEN";

/// Connection parameters, fixed at construction.
///
/// Deserialized options go through the same validation as [`ClientOptions::new`].
#[derive(Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawClientOptions")]
pub struct ClientOptions {
    base_url: Url,
    keyspace: String,
    token: String,
}

impl ClientOptions {
    /// Creates options from a base URL, keyspace and access token.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Connection`] if the base URL does not parse or
    /// the keyspace or token is empty.
    pub fn new(base_url: &str, keyspace: &str, token: &str) -> DriverResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DriverError::Connection(format!("invalid base url {base_url}: {e}")))?;

        if keyspace.is_empty() {
            return Err(DriverError::Connection("keyspace must not be empty".to_string()));
        }
        if token.is_empty() {
            return Err(DriverError::Connection("access token must not be empty".to_string()));
        }

        Ok(Self {
            base_url,
            keyspace: keyspace.to_string(),
            token: token.to_string(),
        })
    }

    /// Creates a new builder for fluent construction.
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Reads options from the `ASTRA_DB_*` environment variables.
    ///
    /// `ASTRA_DB_BASE_URL` wins when set; otherwise the base URL is derived
    /// from `ASTRA_DB_ID` and `ASTRA_DB_REGION`. `ASTRA_DB_KEYSPACE` and
    /// `ASTRA_DB_APPLICATION_TOKEN` are required.
    pub fn from_env() -> DriverResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientOptions::from_env`] with a custom variable lookup.
    pub fn from_lookup<F>(lookup: F) -> DriverResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| DriverError::Connection(format!("{key} is not set")))
        };

        let base_url = match lookup(ENV_BASE_URL).filter(|value| !value.is_empty()) {
            Some(url) => url,
            None => astra_base_url(&require(ENV_DB_ID)?, &require(ENV_DB_REGION)?),
        };

        Self::new(&base_url, &require(ENV_KEYSPACE)?, &require(ENV_TOKEN)?)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Deserialize)]
struct RawClientOptions {
    base_url: String,
    keyspace: String,
    token: String,
}

impl TryFrom<RawClientOptions> for ClientOptions {
    type Error = DriverError;

    fn try_from(raw: RawClientOptions) -> DriverResult<Self> {
        Self::new(&raw.base_url, &raw.keyspace, &raw.token)
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url.as_str())
            .field("keyspace", &self.keyspace)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Builds the AstraDB application URL for a database id and region.
pub fn astra_base_url(database_id: &str, region: &str) -> String {
    format!("https://{database_id}-{region}.apps.astra.datastax.com")
}

/// Builder for [`ClientOptions`].
#[derive(Debug, Default)]
pub struct ClientOptionsBuilder {
    base_url: Option<String>,
    keyspace: Option<String>,
    token: Option<String>,
}

impl ClientOptionsBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the base URL from an AstraDB database id and region.
    pub fn astra(mut self, database_id: &str, region: &str) -> Self {
        self.base_url = Some(astra_base_url(database_id, region));
        self
    }

    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Builds the options, validating every parameter.
    pub fn build(self) -> DriverResult<ClientOptions> {
        ClientOptions::new(
            self.base_url.as_deref().unwrap_or_default(),
            self.keyspace.as_deref().unwrap_or_default(),
            self.token.as_deref().unwrap_or_default(),
        )
    }
}

/// Driver entry point holding the connection parameters and, once connected,
/// the single service session shared by every handle it creates.
pub struct MongoClient<C: ServiceConnector> {
    options: ClientOptions,
    connector: C,
    session: OnceLock<Arc<dyn DocumentService>>,
    connecting: Mutex<()>,
}

impl<C: ServiceConnector> MongoClient<C> {
    /// Creates a disconnected client.
    pub fn new(options: ClientOptions, connector: C) -> Self {
        Self {
            options,
            connector,
            session: OnceLock::new(),
            connecting: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns true once a session has been established.
    pub fn is_connected(&self) -> bool {
        self.session.get().is_some()
    }

    /// Establishes the service session. Later calls reuse the existing session.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Connection`] if the connector cannot create a session.
    pub async fn connect(&self) -> DriverResult<&Self> {
        let _guard = self.connecting.lock().await;

        if self.is_connected() {
            return Ok(self);
        }

        let service = self
            .connector
            .create_session(self.options.base_url(), self.options.token())
            .await
            .map_err(|e| match e {
                DriverError::Connection(message) => DriverError::Connection(message),
                other => DriverError::Connection(other.to_string()),
            })?;

        info!(
            base_url = self.options.base_url().as_str(),
            keyspace = self.options.keyspace(),
            "document service session established"
        );

        let _ = self.session.set(Arc::new(service));

        Ok(self)
    }

    /// Gets a database handle for a keyspace.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotConnected`] if [`MongoClient::connect`] has not succeeded yet.
    pub fn db(&self, name: &str) -> DriverResult<Db> {
        let service = self
            .session
            .get()
            .ok_or(DriverError::NotConnected)?;

        Ok(Db::new(Namespace::new(name.to_string(), Arc::clone(service))))
    }

    /// Gets the database handle for the keyspace named in the options.
    pub fn default_db(&self) -> DriverResult<Db> {
        self.db(self.options.keyspace())
    }
}

impl<C: ServiceConnector> fmt::Debug for MongoClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoClient")
            .field("options", &self.options)
            .field("connector", &self.connector)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::testing::StubConnector;

    fn options() -> ClientOptions {
        ClientOptions::new("https://db-region.apps.astra.datastax.com", "shop", "secret").unwrap()
    }

    #[test]
    fn options_validate_parameters() {
        assert!(matches!(
            ClientOptions::new("not a url", "shop", "secret"),
            Err(DriverError::Connection(_))
        ));
        assert!(matches!(
            ClientOptions::new("https://example.com", "", "secret"),
            Err(DriverError::Connection(_))
        ));
        assert!(ClientOptions::builder().keyspace("shop").build().is_err());
    }

    #[test]
    fn deserialized_options_are_validated() {
        let parsed: ClientOptions = serde_json::from_value(serde_json::json!({
            "base_url": "https://db-region.apps.astra.datastax.com",
            "keyspace": "shop",
            "token": "secret",
        }))
        .unwrap();
        assert_eq!(parsed, options());

        let empty_token = serde_json::from_value::<ClientOptions>(serde_json::json!({
            "base_url": "https://example.com",
            "keyspace": "shop",
            "token": "",
        }));
        assert!(empty_token.unwrap_err().to_string().contains("access token must not be empty"));

        let bad_url = serde_json::from_value::<ClientOptions>(serde_json::json!({
            "base_url": "not a url",
            "keyspace": "shop",
            "token": "secret",
        }));
        assert!(bad_url.is_err());
    }

    #[test]
    fn options_debug_hides_token() {
        assert!(!format!("{:?}", options()).contains("secret"));
    }

    #[test]
    fn options_read_astra_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ASTRA_DB_ID", "abc"),
            ("ASTRA_DB_REGION", "us-east1"),
            ("ASTRA_DB_KEYSPACE", "shop"),
            ("ASTRA_DB_APPLICATION_TOKEN", "AstraCS:token"),
        ]);

        let options = ClientOptions::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(options.base_url().as_str(), "https://abc-us-east1.apps.astra.datastax.com/");
        assert_eq!(options.keyspace(), "shop");
        assert_eq!(options.token(), "AstraCS:token");
    }

    #[test]
    fn options_report_missing_variables() {
        let err = ClientOptions::from_lookup(|_| None).unwrap_err();

        assert_eq!(err, DriverError::Connection("ASTRA_DB_ID is not set".to_string()));
    }

    #[tokio::test]
    async fn db_before_connect_fails_fast() {
        let client = MongoClient::new(options(), StubConnector::default());

        assert_eq!(client.db("shop").unwrap_err(), DriverError::NotConnected);
    }

    #[tokio::test]
    async fn connect_creates_one_session() {
        let connector = StubConnector::default();
        let client = MongoClient::new(options(), connector.clone());

        client.connect().await.unwrap();
        client.connect().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(connector.sessions(), 1);
        assert_eq!(client.default_db().unwrap().name(), "shop");
    }

    #[tokio::test]
    async fn connect_failures_are_connection_errors() {
        let client = MongoClient::new(options(), StubConnector::refusing());

        assert!(matches!(client.connect().await, Err(DriverError::Connection(_))));
        assert!(!client.is_connected());
    }
}
