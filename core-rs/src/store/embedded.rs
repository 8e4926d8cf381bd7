/**
 * embedded.rs
 * In-process triplestore backed by oxigraph
 */

use oxigraph::io::RdfFormat;
use oxigraph::model::Graph;
use oxigraph::sparql::{Query, QueryResults};
use oxigraph::store::Store;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

use super::{raw_value, QueryResponse};
use crate::errors::{PrezError, Result};
use crate::query::SparqlQuery;

/// Data held in memory, queried without a network hop
pub struct EmbeddedStore {
    store: Store,
}

impl EmbeddedStore {
    pub fn new() -> Result<Self> {
        Ok(Self { store: Store::new()? })
    }

    pub fn from_turtle(data: &str) -> Result<Self> {
        let store = Self::new()?;
        store.load_turtle(data)?;
        Ok(store)
    }

    pub fn load_turtle(&self, data: &str) -> Result<()> {
        self.store
            .load_from_reader(RdfFormat::Turtle, data.as_bytes())
            .map_err(|e| PrezError::store(400, format!("failed to load data: {}", e)))
    }

    pub fn load_file(&self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        self.load_turtle(&content)?;
        info!(path = %path.display(), quads = self.len(), "loaded embedded store data");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the query and normalize SELECT terms to their raw values.
    ///
    /// Unparseable text is a 400, evaluation failures a 500.
    pub fn query(&self, query: &SparqlQuery) -> Result<QueryResponse> {
        if query.is_empty() {
            return Ok(QueryResponse::Graph(Graph::new()));
        }
        let parsed = Query::parse(query.as_str(), None).map_err(|e| PrezError::store(400, e.to_string()))?;
        let results = self
            .store
            .query(parsed)
            .map_err(|e| PrezError::store(500, e.to_string()))?;

        match results {
            QueryResults::Solutions(solutions) => {
                let mut rows = Vec::new();
                for solution in solutions {
                    let solution = solution.map_err(|e| PrezError::store(500, e.to_string()))?;
                    let mut row = HashMap::new();
                    for (var, term) in solution.iter() {
                        row.insert(var.as_str().to_string(), raw_value(term));
                    }
                    rows.push(row);
                }
                Ok(QueryResponse::Rows(rows))
            }
            QueryResults::Graph(triples) => {
                let mut graph = Graph::new();
                for triple in triples {
                    let triple = triple.map_err(|e| PrezError::store(500, e.to_string()))?;
                    graph.insert(&triple);
                }
                Ok(QueryResponse::Graph(graph))
            }
            QueryResults::Boolean(result) => {
                let mut row = HashMap::new();
                row.insert("result".to_string(), result.to_string());
                Ok(QueryResponse::Rows(vec![row]))
            }
        }
    }
}

impl fmt::Debug for EmbeddedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedStore").field("quads", &self.len()).finish()
    }
}
