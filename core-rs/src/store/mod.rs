/**
 * store module
 * Triplestore clients: remote SPARQL endpoints over HTTP and an embedded
 * oxigraph store, behind one async `query` call
 */

pub mod embedded;
pub mod remote;

use oxigraph::model::{Graph, Term};
use std::collections::HashMap;

pub use embedded::EmbeddedStore;
pub use remote::{RemoteSparqlStore, RemoteStoreConfig};

use crate::errors::{PrezError, Result};
use crate::query::{QueryResult, SparqlQuery};

/// What a store returns: SELECT solutions or a CONSTRUCT graph
#[derive(Debug, Clone)]
pub enum QueryResponse {
    Rows(Vec<QueryResult>),
    Graph(Graph),
}

impl QueryResponse {
    pub fn rows(&self) -> Option<&[QueryResult]> {
        match self {
            QueryResponse::Rows(rows) => Some(rows),
            QueryResponse::Graph(_) => None,
        }
    }

    pub fn graph(&self) -> Option<&Graph> {
        match self {
            QueryResponse::Graph(graph) => Some(graph),
            QueryResponse::Rows(_) => None,
        }
    }

    pub fn into_rows(self) -> Result<Vec<QueryResult>> {
        match self {
            QueryResponse::Rows(rows) => Ok(rows),
            QueryResponse::Graph(_) => Err(PrezError::store(502, "expected SELECT results, got a graph")),
        }
    }

    pub fn into_graph(self) -> Result<Graph> {
        match self {
            QueryResponse::Graph(graph) => Ok(graph),
            QueryResponse::Rows(_) => Err(PrezError::store(502, "expected a graph, got SELECT results")),
        }
    }
}

/// Raw value of a term: IRI text, literal lexical form, or blank node id
pub(crate) fn raw_value(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => node.as_str().to_string(),
        Term::BlankNode(node) => node.as_str().to_string(),
        Term::Literal(literal) => literal.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

/// A configured triplestore
#[derive(Debug)]
pub enum TripleStore {
    Remote(RemoteSparqlStore),
    Embedded(EmbeddedStore),
}

impl TripleStore {
    pub async fn query(&self, query: &SparqlQuery) -> Result<QueryResponse> {
        match self {
            TripleStore::Remote(store) => store.query(query).await,
            TripleStore::Embedded(store) => store.query(query),
        }
    }
}

impl From<RemoteSparqlStore> for TripleStore {
    fn from(store: RemoteSparqlStore) -> Self {
        TripleStore::Remote(store)
    }
}

impl From<EmbeddedStore> for TripleStore {
    fn from(store: EmbeddedStore) -> Self {
        TripleStore::Embedded(store)
    }
}

/// Named query targets, e.g. "VocPrez" or "SpacePrez"
#[derive(Debug, Default)]
pub struct StoreRegistry {
    stores: HashMap<String, TripleStore>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, store: impl Into<TripleStore>) {
        self.stores.insert(name.into(), store.into());
    }

    pub fn get(&self, name: &str) -> Result<&TripleStore> {
        self.stores
            .get(name)
            .ok_or_else(|| PrezError::UnknownStore(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    pub async fn query(&self, name: &str, query: &SparqlQuery) -> Result<QueryResponse> {
        self.get(name)?.query(query).await
    }
}
