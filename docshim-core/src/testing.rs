//! Minimal recording service used by the unit tests of this crate.

use async_trait::async_trait;
use bson::Document;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use url::Url;

use crate::{
    collection::Collection,
    document::document_id,
    error::{DriverError, DriverResult},
    namespace::Namespace,
    query::{EQUALS_OPERATOR, FindOptions, apply_patch},
    service::{DocumentService, FindResponse, ServiceConnector},
};

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, HashMap<String, Document>>,
    batches: usize,
    finds: usize,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StubService {
    state: Arc<Mutex<State>>,
    failing: bool,
    reported_count: Option<u64>,
}

impl StubService {
    pub(crate) fn failing() -> Self {
        Self { failing: true, ..Self::default() }
    }

    pub(crate) fn with_reported_count(count: u64) -> Self {
        Self { reported_count: Some(count), ..Self::default() }
    }

    pub(crate) fn stored(&self, collection: &str, id: &str) -> Option<Document> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub(crate) fn len(&self, collection: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map_or(0, HashMap::len)
    }

    pub(crate) fn batches(&self) -> usize {
        self.state.lock().unwrap().batches
    }

    pub(crate) fn finds(&self) -> usize {
        self.state.lock().unwrap().finds
    }

    fn check(&self) -> DriverResult<()> {
        if self.failing {
            return Err(DriverError::Backend("service unavailable".to_string()));
        }
        Ok(())
    }

    fn matches(document: &Document, query: &Document) -> bool {
        query.iter().all(|(field, condition)| {
            match condition
                .as_document()
                .and_then(|ops| ops.get(EQUALS_OPERATOR))
            {
                Some(expected) => document.get(field) == Some(expected),
                None => true,
            }
        })
    }

    fn matching(&self, collection: &str, query: &Document) -> HashMap<String, Document> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| Self::matches(doc, query))
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentService for StubService {
    async fn create_document(&self, _namespace: &str, collection: &str, id: &str, document: Document) -> DriverResult<()> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);
        Ok(())
    }

    async fn batch_documents(&self, _namespace: &str, collection: &str, documents: Vec<Document>, _id_path: &str) -> DriverResult<Vec<String>> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.batches += 1;

        let mut ids = Vec::new();
        for document in documents {
            let id = document_id(&document)?;
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), document);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn find_documents(&self, _namespace: &str, collection: &str, query: Document, _options: FindOptions) -> DriverResult<FindResponse> {
        self.check()?;
        self.state.lock().unwrap().finds += 1;

        Ok(FindResponse {
            data: self.matching(collection, &query),
            count: self.reported_count,
        })
    }

    async fn find_one_document(&self, _namespace: &str, collection: &str, query: Document) -> DriverResult<Option<Document>> {
        self.check()?;
        Ok(self
            .matching(collection, &query)
            .into_values()
            .next())
    }

    async fn update_document(&self, _namespace: &str, collection: &str, id: &str, patch: Document) -> DriverResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        let stored = state
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| DriverError::Backend(format!("no document {id}")))?;
        *stored = apply_patch(stored, &patch);
        Ok(())
    }

    async fn delete_document(&self, _namespace: &str, collection: &str, id: &str) -> DriverResult<()> {
        self.check()?;
        if let Some(docs) = self.state.lock().unwrap().collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn create_collection(&self, _namespace: &str, name: &str) -> DriverResult<()> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        if state.collections.contains_key(name) {
            return Err(DriverError::Backend(format!("collection {name} already exists")));
        }
        state.collections.insert(name.to_string(), HashMap::new());
        Ok(())
    }

    async fn delete_collection(&self, _namespace: &str, name: &str) -> DriverResult<()> {
        self.check()?;
        match self.state.lock().unwrap().collections.remove(name) {
            Some(_) => Ok(()),
            None => Err(DriverError::Backend(format!("collection {name} not found"))),
        }
    }

    async fn list_collections(&self, _namespace: &str) -> DriverResult<Vec<String>> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .collections
            .keys()
            .cloned()
            .collect())
    }
}

pub(crate) fn collection_on(service: &StubService, name: &str) -> Collection {
    Collection::new(Namespace::new("test".to_string(), Arc::new(service.clone())).collection(name))
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StubConnector {
    sessions: Arc<AtomicUsize>,
    refuse: bool,
}

impl StubConnector {
    pub(crate) fn refusing() -> Self {
        Self { refuse: true, ..Self::default() }
    }

    pub(crate) fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceConnector for StubConnector {
    type Service = StubService;

    async fn create_session(&self, _base_url: &Url, _token: &str) -> DriverResult<StubService> {
        if self.refuse {
            return Err(DriverError::Backend("401 Unauthorized".to_string()));
        }
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(StubService::default())
    }
}
