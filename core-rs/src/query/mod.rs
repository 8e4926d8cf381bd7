/**
 * query module
 * SPARQL query synthesis: typed syntax, fragments, and the query shapes
 * served by the API (item, listing, count, negotiation, search, spatial,
 * identity)
 */

pub mod assemblers;
pub mod ast;
pub mod fragments;
pub mod identity;
pub mod search;
pub mod spatial;

use std::collections::HashMap;
use std::fmt;

use crate::vocab::QUERY_PREFIXES;

/// One SELECT solution, variable name to raw term value
pub type QueryResult = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryForm {
    Construct,
    Select,
    /// Nothing to retrieve; callers skip the store round trip
    Empty,
}

/// Rendered SPARQL text, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SparqlQuery {
    query: String,
    form: QueryForm,
}

impl SparqlQuery {
    /// Wrap raw text, inferring the form from its first query keyword
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        let form = infer_form(&query);
        Self { query, form }
    }

    /// The "nothing to retrieve" sentinel: empty text
    pub fn empty() -> Self {
        Self {
            query: String::new(),
            form: QueryForm::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn form(&self) -> QueryForm {
        self.form
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    pub(crate) fn from_ast(query: &ast::Query) -> Self {
        let form = match query {
            ast::Query::Construct(_) => QueryForm::Construct,
            ast::Query::Select(_) => QueryForm::Select,
        };
        let text = query.render(&QUERY_PREFIXES);
        tracing::debug!(form = ?form, "synthesized query:\n{}", text);
        Self { query: text, form }
    }
}

impl fmt::Display for SparqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

fn infer_form(query: &str) -> QueryForm {
    if query.trim().is_empty() {
        return QueryForm::Empty;
    }
    let upper = query.to_ascii_uppercase();
    match (upper.find("CONSTRUCT"), upper.find("SELECT")) {
        (Some(c), Some(s)) if c < s => QueryForm::Construct,
        (Some(_), None) => QueryForm::Construct,
        _ => QueryForm::Select,
    }
}
