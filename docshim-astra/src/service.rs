use std::{collections::HashMap, time::Duration};
use async_trait::async_trait;
use bson::Document;
use reqwest::{
    Client, Response, StatusCode,
    header::{HeaderMap, HeaderValue},
};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use docshim_core::{
    error::{DriverError, DriverResult},
    query::{FindOptions, MAX_PAGE_SIZE},
    service::{DocumentService, FindResponse, ServiceConnector},
};

use crate::wire::WireValue;

const TOKEN_HEADER: &str = "x-cassandra-token";
const API_PATH: [&str; 4] = ["api", "rest", "v2", "namespaces"];


#[derive(Debug, Deserialize)]
struct FindPage {
    #[serde(default)]
    data: HashMap<String, Value>,
    #[serde(rename = "pageState")]
    page_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    #[serde(rename = "documentIds")]
    document_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionsResponse {
    data: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    name: String,
}


/// Document service session over the AstraDB Document API v2.
#[derive(Debug, Clone)]
pub struct AstraService {
    http: Client,
    base_url: Url,
}

impl AstraService {
    /// Wraps an HTTP client that already carries the auth header.
    pub fn new(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn url(&self, segments: &[&str]) -> DriverResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DriverError::Backend(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .extend(API_PATH)
            .extend(segments);

        Ok(url)
    }

    fn collections_url(&self, namespace: &str) -> DriverResult<Url> {
        self.url(&[namespace, "collections"])
    }

    fn collection_url(&self, namespace: &str, collection: &str) -> DriverResult<Url> {
        self.url(&[namespace, "collections", collection])
    }

    fn document_url(&self, namespace: &str, collection: &str, id: &str) -> DriverResult<Url> {
        self.url(&[namespace, "collections", collection, id])
    }

    fn find_url(
        &self,
        namespace: &str,
        collection: &str,
        query: &Document,
        options: &FindOptions,
        page_size: usize,
        page_state: Option<&str>,
    ) -> DriverResult<Url> {
        let mut url = self.collection_url(namespace, collection)?;
        {
            let mut pairs = url.query_pairs_mut();

            if !query.is_empty() {
                pairs.append_pair("where", &Value::Object(WireValue::object(query)).to_string());
            }
            pairs.append_pair("page-size", &page_size.to_string());
            if let Some(state) = page_state {
                pairs.append_pair("page-state", state);
            }
            if let Some(fields) = &options.projection {
                pairs.append_pair("fields", &serde_json::to_string(fields)?);
            }
        }

        Ok(url)
    }

    /// Passes successful responses through and turns the rest into backend errors.
    async fn check(response: Response) -> DriverResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let description = response
            .text()
            .await
            .unwrap_or_default();

        Err(DriverError::Backend(format!("{status}: {description}")))
    }

    fn transport(e: reqwest::Error) -> DriverError {
        DriverError::Backend(e.to_string())
    }
}

#[async_trait]
impl DocumentService for AstraService {
    async fn create_document(&self, namespace: &str, collection: &str, id: &str, document: Document) -> DriverResult<()> {
        let response = self.http
            .put(self.document_url(namespace, collection, id)?)
            .json(&WireValue::object(&document))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(response).await?;

        Ok(())
    }

    async fn batch_documents(&self, namespace: &str, collection: &str, documents: Vec<Document>, id_path: &str) -> DriverResult<Vec<String>> {
        let mut url = self.url(&[namespace, "collections", collection, "batch"])?;
        url.query_pairs_mut().append_pair("id-path", id_path);

        let body = documents
            .iter()
            .map(|document| Value::Object(WireValue::object(document)))
            .collect::<Vec<_>>();

        let response = self.http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport)?;

        Ok(
            Self::check(response)
                .await?
                .json::<BatchResponse>()
                .await
                .map_err(Self::transport)?
                .document_ids
        )
    }

    async fn find_documents(&self, namespace: &str, collection: &str, query: Document, options: FindOptions) -> DriverResult<FindResponse> {
        let mut data = HashMap::new();
        let mut page_state: Option<String> = None;

        loop {
            let remaining = options
                .limit
                .map_or(usize::MAX, |limit| limit.saturating_sub(data.len()));
            if remaining == 0 {
                break;
            }

            let url = self.find_url(
                namespace,
                collection,
                &query,
                &options,
                remaining.min(MAX_PAGE_SIZE),
                page_state.as_deref(),
            )?;
            debug!(namespace, collection, url = url.as_str(), "fetching page");

            let response = self.http
                .get(url)
                .send()
                .await
                .map_err(Self::transport)?;

            // The service answers 404 when nothing matches
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }

            let page = Self::check(response)
                .await?
                .json::<FindPage>()
                .await
                .map_err(Self::transport)?;

            for (id, document) in page.data {
                data.insert(id, WireValue::expect_document(document)?);
            }

            match page.page_state {
                Some(state) if !state.is_empty() => page_state = Some(state),
                _ => break,
            }
        }

        Ok(FindResponse { data, count: None })
    }

    async fn find_one_document(&self, namespace: &str, collection: &str, query: Document) -> DriverResult<Option<Document>> {
        Ok(self
            .find_documents(namespace, collection, query, FindOptions::single())
            .await?
            .into_documents()
            .into_iter()
            .next())
    }

    async fn update_document(&self, namespace: &str, collection: &str, id: &str, patch: Document) -> DriverResult<()> {
        let response = self.http
            .patch(self.document_url(namespace, collection, id)?)
            .json(&WireValue::object(&patch))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(response).await?;

        Ok(())
    }

    async fn delete_document(&self, namespace: &str, collection: &str, id: &str) -> DriverResult<()> {
        let response = self.http
            .delete(self.document_url(namespace, collection, id)?)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(response).await?;

        Ok(())
    }

    async fn create_collection(&self, namespace: &str, name: &str) -> DriverResult<()> {
        let response = self.http
            .post(self.collections_url(namespace)?)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(response).await?;

        Ok(())
    }

    async fn delete_collection(&self, namespace: &str, name: &str) -> DriverResult<()> {
        let response = self.http
            .delete(self.collection_url(namespace, name)?)
            .send()
            .await
            .map_err(Self::transport)?;
        Self::check(response).await?;

        Ok(())
    }

    async fn list_collections(&self, namespace: &str) -> DriverResult<Vec<String>> {
        let response = self.http
            .get(self.collections_url(namespace)?)
            .send()
            .await
            .map_err(Self::transport)?;

        Ok(
            Self::check(response)
                .await?
                .json::<CollectionsResponse>()
                .await
                .map_err(Self::transport)?
                .data
                .into_iter()
                .map(|entry| entry.name)
                .collect()
        )
    }
}


/// Connector establishing [`AstraService`] sessions.
#[derive(Debug, Clone, Default)]
pub struct AstraConnector {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl AstraConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[async_trait]
impl ServiceConnector for AstraConnector {
    type Service = AstraService;

    async fn create_session(&self, base_url: &Url, token: &str) -> DriverResult<Self::Service> {
        let mut token = HeaderValue::from_str(token)
            .map_err(|e| DriverError::Connection(format!("invalid access token: {e}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let http = builder
            .build()
            .map_err(|e| DriverError::Connection(e.to_string()))?;

        Ok(AstraService::new(http, base_url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use bson::doc;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;

    #[derive(Debug, Clone)]
    struct Received {
        line: String,
        headers: String,
        body: String,
    }

    type Requests = Arc<Mutex<Vec<Received>>>;

    async fn read_request(stream: &mut TcpStream) -> Received {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];

        let head_end = loop {
            let read = stream.read(&mut chunk).await.unwrap();
            assert!(read > 0, "connection closed before the request head");
            buffer.extend_from_slice(&chunk[..read]);

            if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
        let (line, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
        let length = headers
            .lines()
            .filter_map(|header| header.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map_or(0, |(_, value)| value.trim().parse::<usize>().unwrap());

        let mut body = buffer[head_end + 4..].to_vec();
        while body.len() < length {
            let read = stream.read(&mut chunk).await.unwrap();
            body.extend_from_slice(&chunk[..read]);
        }

        Received {
            line: line.to_string(),
            headers: headers.to_lowercase(),
            body: String::from_utf8_lossy(&body).to_string(),
        }
    }

    /// Serves canned JSON responses on a local port and records every request.
    async fn serve<F>(respond: F) -> (Url, Requests)
    where
        F: Fn(&Received) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        let requests = Requests::default();
        let recorded = Arc::clone(&requests);
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let recorded = Arc::clone(&recorded);
                let respond = Arc::clone(&respond);

                tokio::spawn(async move {
                    let request = read_request(&mut stream).await;
                    let (status, body) = respond(&request);
                    recorded.lock().unwrap().push(request);

                    let reply = format!(
                        "HTTP/1.1 {status} Status\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    stream.write_all(reply.as_bytes()).await.unwrap();
                    let _ = stream.shutdown().await;
                });
            }
        });

        (url, requests)
    }

    async fn session(url: &Url) -> AstraService {
        AstraConnector::new()
            .user_agent("docshim-tests")
            .create_session(url, "AstraCS:secret")
            .await
            .unwrap()
    }

    fn two_pages(request: &Received) -> (u16, String) {
        if request.line.contains("page-state=next") {
            (200, r#"{"data":{"b":{"_id":"b","n":2}}}"#.to_string())
        } else {
            (200, r#"{"data":{"a":{"_id":"a","n":1}},"pageState":"next"}"#.to_string())
        }
    }

    fn service() -> AstraService {
        AstraService::new(
            Client::new(),
            Url::parse("https://db-us-east1.apps.astra.datastax.com").unwrap(),
        )
    }

    #[test]
    fn builds_document_paths() {
        let url = service().document_url("shop", "products", "p 1").unwrap();

        assert_eq!(
            url.as_str(),
            "https://db-us-east1.apps.astra.datastax.com/api/rest/v2/namespaces/shop/collections/products/p%201"
        );
    }

    #[test]
    fn builds_find_queries() {
        let options = FindOptions {
            limit: None,
            projection: Some(vec!["name".to_string()]),
        };
        let url = service()
            .find_url("shop", "products", &doc! { "status": { "$eq": "active" } }, &options, 20, Some("abc"))
            .unwrap();

        let pairs = url
            .query_pairs()
            .into_owned()
            .collect::<HashMap<String, String>>();

        assert_eq!(url.path(), "/api/rest/v2/namespaces/shop/collections/products");
        assert_eq!(pairs["where"], r#"{"status":{"$eq":"active"}}"#);
        assert_eq!(pairs["page-size"], "20");
        assert_eq!(pairs["page-state"], "abc");
        assert_eq!(pairs["fields"], r#"["name"]"#);
    }

    #[test]
    fn omits_empty_where_clause() {
        let url = service()
            .find_url("shop", "products", &doc! {}, &FindOptions::default(), 5, None)
            .unwrap();

        assert_eq!(url.query(), Some("page-size=5"));
    }

    #[tokio::test]
    async fn rejects_tokens_that_cannot_be_sent() {
        let url = Url::parse("https://example.com").unwrap();
        let result = AstraConnector::new()
            .create_session(&url, "bad\ntoken")
            .await;

        assert!(matches!(result, Err(DriverError::Connection(_))));
    }

    #[tokio::test]
    async fn find_follows_page_state_until_exhausted() {
        let (url, requests) = serve(two_pages).await;

        let response = session(&url)
            .await
            .find_documents("shop", "products", doc! { "n": { "$gt": 0 } }, FindOptions::default())
            .await
            .unwrap();

        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data["a"], doc! { "_id": "a", "n": 1 });
        assert_eq!(response.data["b"], doc! { "_id": "b", "n": 2 });
        assert_eq!(response.count, None);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].line.starts_with("GET /api/rest/v2/namespaces/shop/collections/products?"));
        assert!(requests[0].line.contains("page-size=20"));
        assert!(!requests[0].line.contains("page-state"));
        assert!(requests[1].line.contains("page-state=next"));
        assert!(requests.iter().all(|r| r.headers.contains("x-cassandra-token: astracs:secret")));
        assert!(requests.iter().all(|r| r.headers.contains("user-agent: docshim-tests")));
    }

    #[tokio::test]
    async fn find_stops_paging_at_the_limit() {
        let (url, requests) = serve(two_pages).await;

        let response = session(&url)
            .await
            .find_documents("shop", "products", doc! {}, FindOptions::single())
            .await
            .unwrap();

        assert_eq!(response.data.len(), 1);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].line.contains("page-size=1"));
    }

    #[tokio::test]
    async fn find_treats_not_found_as_empty() {
        let (url, _) = serve(|_| (404, String::new())).await;

        let found = session(&url)
            .await
            .find_one_document("shop", "products", doc! { "_id": { "$eq": "ghost" } })
            .await
            .unwrap();

        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn failure_statuses_carry_the_service_description() {
        let (url, requests) = serve(|_| (409, r#"{"description":"collection exists"}"#.to_string())).await;

        let err = session(&url)
            .await
            .create_collection("shop", "products")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DriverError::Backend(r#"409 Conflict: {"description":"collection exists"}"#.to_string())
        );

        let requests = requests.lock().unwrap();
        assert!(requests[0].line.starts_with("POST /api/rest/v2/namespaces/shop/collections "));
        assert_eq!(requests[0].body, r#"{"name":"products"}"#);
    }

    #[tokio::test]
    async fn batch_returns_document_ids() {
        let (url, requests) = serve(|_| (201, r#"{"documentIds":["a","b"]}"#.to_string())).await;

        let ids = session(&url)
            .await
            .batch_documents("shop", "products", vec![doc! { "_id": "a" }, doc! { "_id": "b" }], "_id")
            .await
            .unwrap();

        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);

        let requests = requests.lock().unwrap();
        assert!(requests[0].line.starts_with("POST /api/rest/v2/namespaces/shop/collections/products/batch?id-path=_id "));
        assert_eq!(requests[0].body, r#"[{"_id":"a"},{"_id":"b"}]"#);
    }

    #[tokio::test]
    async fn updates_are_sent_as_patches() {
        let (url, requests) = serve(|_| (200, "{}".to_string())).await;

        session(&url)
            .await
            .update_document("shop", "products", "p1", doc! { "price": 12 })
            .await
            .unwrap();

        let requests = requests.lock().unwrap();
        assert!(requests[0].line.starts_with("PATCH /api/rest/v2/namespaces/shop/collections/products/p1 "));
        assert_eq!(requests[0].body, r#"{"price":12}"#);
    }
}
