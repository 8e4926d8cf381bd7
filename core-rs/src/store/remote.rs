/**
 * remote.rs
 * SPARQL 1.1 protocol client for remote triplestores
 */

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{Graph, Triple};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::info;

use super::QueryResponse;
use crate::errors::{PrezError, Result};
use crate::query::{QueryForm, QueryResult, SparqlQuery};

pub const SPARQL_QUERY_CONTENT_TYPE: &str = "application/sparql-query";
pub const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";
pub const N_TRIPLES: &str = "application/n-triples";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint and credentials for one remote store
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteStoreConfig {
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl RemoteStoreConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for RemoteStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteStoreConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Triplestore reached over HTTP
pub struct RemoteSparqlStore {
    client: Client,
    config: RemoteStoreConfig,
}

impl RemoteSparqlStore {
    pub fn new(config: RemoteStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PrezError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// POST the query text and decode the response by query form.
    ///
    /// Non-success statuses surface as `StoreQuery` with the HTTP status and
    /// body. Transport failures map to 503, undecodable bodies to 502.
    pub async fn query(&self, query: &SparqlQuery) -> Result<QueryResponse> {
        let accept = match query.form() {
            QueryForm::Empty => return Ok(QueryResponse::Graph(Graph::new())),
            QueryForm::Select => SPARQL_RESULTS_JSON,
            QueryForm::Construct => N_TRIPLES,
        };

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header(CONTENT_TYPE, SPARQL_QUERY_CONTENT_TYPE)
            .header(ACCEPT, accept)
            .body(query.as_str().to_string());
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        info!(endpoint = %self.config.endpoint, form = ?query.form(), "querying store");
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PrezError::store(503, format!("store request timed out: {}", e))
            } else {
                PrezError::store(503, format!("store unreachable: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrezError::store(status.as_u16(), body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PrezError::store(502, format!("failed to read store response: {}", e)))?;
        match query.form() {
            QueryForm::Select => parse_select_results(&body).map(QueryResponse::Rows),
            _ => parse_n_triples(&body).map(QueryResponse::Graph),
        }
    }
}

impl fmt::Debug for RemoteSparqlStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSparqlStore")
            .field("config", &self.config)
            .finish()
    }
}

#[derive(Deserialize)]
struct SelectResults {
    results: Bindings,
}

#[derive(Deserialize)]
struct Bindings {
    bindings: Vec<HashMap<String, BoundTerm>>,
}

#[derive(Deserialize)]
struct BoundTerm {
    value: String,
}

/// Decode `application/sparql-results+json` into raw-valued rows
pub fn parse_select_results(body: &[u8]) -> Result<Vec<QueryResult>> {
    let parsed: SelectResults = serde_json::from_slice(body)
        .map_err(|e| PrezError::store(502, format!("invalid SPARQL results JSON: {}", e)))?;
    Ok(parsed
        .results
        .bindings
        .into_iter()
        .map(|binding| binding.into_iter().map(|(var, term)| (var, term.value)).collect())
        .collect())
}

/// Decode an `application/n-triples` body into a graph
pub fn parse_n_triples(body: &[u8]) -> Result<Graph> {
    let mut graph = Graph::new();
    for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(body) {
        let quad = quad.map_err(|e| PrezError::store(502, format!("invalid N-Triples: {}", e)))?;
        graph.insert(&Triple::from(quad));
    }
    Ok(graph)
}
