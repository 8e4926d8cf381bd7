/**
 * search.rs
 * Full-text search over a text-indexed triplestore
 */

use oxigraph::model::{Graph, NamedNode, NamedNodeRef, SubjectRef, TermRef};
use sha2::{Digest, Sha256};
use tracing::warn;

use super::ast::{
    ConstructQuery, Expression, Function, GroupPattern, Literal, OrderCondition, PatternElement,
    PropertyPath, Projection, Query, SelectQuery, SolutionModifier, Term, TriplePattern, Var,
};
use super::SparqlQuery;
use crate::errors::{PrezError, Result};
use crate::vocab;

pub const HASH_PREFIX: &str = "urn:hash:";

/// Predicates searched after walking `path` from the focus node
#[derive(Debug, Clone, PartialEq)]
pub struct PathGroup {
    pub path: Vec<NamedNode>,
    pub predicates: Vec<NamedNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub term: String,
    /// Results the caller wants on this page
    pub limit: u64,
    pub offset: u64,
    /// Predicates searched directly on the focus node
    pub predicates: Vec<NamedNode>,
    pub path_groups: Vec<PathGroup>,
    /// Extra CONSTRUCT triples decorating each result
    pub extra_template: Vec<TriplePattern>,
}

impl SearchRequest {
    pub fn new(term: impl Into<String>, limit: u64, offset: u64) -> Self {
        Self {
            term: term.into(),
            limit,
            offset,
            predicates: Vec::new(),
            path_groups: Vec::new(),
            extra_template: Vec::new(),
        }
    }

    pub fn predicates(mut self, predicates: impl IntoIterator<Item = NamedNode>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn path_group(mut self, path: Vec<NamedNode>, predicates: Vec<NamedNode>) -> Self {
        self.path_groups.push(PathGroup { path, predicates });
        self
    }
}

/// Whitespace-separated words joined with `+`, as the text index ranks them better
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join("+")
}

/// `urn:hash:` + hex SHA-256 of the concatenated lexical forms
pub fn search_result_id(focus_node: &str, predicate: &str, matched: &str, weight: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(focus_node.as_bytes());
    hasher.update(predicate.as_bytes());
    hasher.update(matched.as_bytes());
    hasher.update(weight.as_bytes());
    format!("{}{}", HASH_PREFIX, hex::encode(hasher.finalize()))
}

/// `( ?subject ?weight ?match ?g ?pred ) <index> ( <p>... "term" )`
fn index_call(subject: &Var, predicates: &[NamedNode], term: &str, index: &NamedNode) -> TriplePattern {
    let bindings = Term::Collection(
        [subject.name(), "weight", "match", "g", "pred"]
            .into_iter()
            .map(|name| Term::Var(Var::new(name)))
            .collect(),
    );
    let mut arguments: Vec<Term> = predicates.iter().map(|p| Term::Iri(p.clone())).collect();
    arguments.push(Term::Literal(Literal::simple(term)));
    TriplePattern::new(bindings, index, Term::Collection(arguments))
}

/// Nested full-text search CONSTRUCT. The inner SELECT fetches one row more
/// than requested so the caller can tell whether another page exists.
pub fn search_construct(request: &SearchRequest, text_index: &NamedNode) -> Result<SparqlQuery> {
    let term = normalize_term(&request.term);
    if term.is_empty() {
        return Err(PrezError::InvalidInput("search term is empty".to_string()));
    }
    let fetch_limit = request
        .limit
        .checked_add(1)
        .ok_or_else(|| PrezError::InvalidInput(format!("search limit {} is too large", request.limit)))?;

    let focus = Var::new("focus_node");
    let pred = Var::new("pred");
    let matched = Var::new("match");
    let weight = Var::new("weight");
    let hash = Var::new("hashID");
    let search_node = Var::new("fts_search_node");

    let mut groups = Vec::new();
    if !request.predicates.is_empty() {
        let mut group = GroupPattern::new();
        group.push(PatternElement::Triple(index_call(&focus, &request.predicates, &term, text_index)));
        groups.push(group);
    }
    for path_group in &request.path_groups {
        if path_group.path.is_empty() || path_group.predicates.is_empty() {
            warn!("skipping search path group without path or predicates");
            continue;
        }
        let mut group = GroupPattern::new();
        group
            .triple(&focus, PropertyPath::sequence(path_group.path.iter()), &search_node)
            .push(PatternElement::Triple(index_call(
                &search_node,
                &path_group.predicates,
                &term,
                text_index,
            )));
        groups.push(group);
    }
    if groups.is_empty() {
        return Err(PrezError::InvalidInput("no predicates to search over".to_string()));
    }

    let stringified = [&focus, &pred, &matched, &weight]
        .into_iter()
        .map(|v| Expression::str(Expression::var(v)))
        .collect();
    let hash_expression = Expression::call(
        Function::Uri,
        vec![Expression::call(
            Function::Concat,
            vec![
                Literal::simple(HASH_PREFIX).into(),
                Expression::call(
                    Function::Sha256,
                    vec![Expression::call(Function::Concat, stringified)],
                ),
            ],
        )],
    );

    let mut inner_pattern = GroupPattern::new();
    inner_pattern.union(groups);
    let inner = SelectQuery {
        distinct: false,
        projection: vec![
            Projection::Var(focus.clone()),
            Projection::Var(pred.clone()),
            Projection::Var(matched.clone()),
            Projection::Var(weight.clone()),
            Projection::Expression(hash_expression, hash.clone()),
        ],
        pattern: inner_pattern,
        modifier: SolutionModifier {
            order_by: vec![OrderCondition::desc(&weight)],
            limit: Some(fetch_limit),
            offset: Some(request.offset),
            ..Default::default()
        },
    };

    let mut template = vec![
        TriplePattern::new(&hash, vocab::RDF_TYPE, vocab::PREZ_SEARCH_RESULT),
        TriplePattern::new(&hash, vocab::PREZ_SEARCH_RESULT_URI, &focus),
        TriplePattern::new(&hash, vocab::PREZ_SEARCH_RESULT_MATCH, &matched),
        TriplePattern::new(&hash, vocab::PREZ_SEARCH_RESULT_PREDICATE, &pred),
        TriplePattern::new(&hash, vocab::PREZ_SEARCH_RESULT_WEIGHT, &weight),
    ];
    template.extend(request.extra_template.iter().cloned());

    let mut pattern = GroupPattern::new();
    pattern.push(PatternElement::SubSelect(Box::new(inner)));
    Ok(SparqlQuery::from_ast(&Query::Construct(ConstructQuery {
        template,
        pattern,
        modifier: SolutionModifier::default(),
    })))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub focus_node: NamedNode,
    pub predicate: NamedNode,
    pub matched: String,
    pub weight: f64,
}

/// One page of search results as shown to the user
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub has_more: bool,
}

impl SearchPage {
    /// Reads the results out of a search CONSTRUCT response. `limit` is the
    /// caller's limit; the extra row beyond it only sets `has_more`.
    pub fn from_triples(graph: &Graph, limit: u64) -> Self {
        let mut results: Vec<SearchResult> = graph
            .subjects_for_predicate_object(vocab::RDF_TYPE, vocab::PREZ_SEARCH_RESULT)
            .filter_map(|subject| read_result(graph, subject))
            .collect();
        results.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let has_more = results.len() > limit;
        results.truncate(limit);
        Self { results, has_more }
    }
}

fn read_result(graph: &Graph, subject: SubjectRef<'_>) -> Option<SearchResult> {
    let object = |predicate: NamedNodeRef<'_>| graph.object_for_subject_predicate(subject, predicate);
    let id = match subject {
        SubjectRef::NamedNode(node) => node.as_str().to_string(),
        _ => subject.to_string(),
    };
    let focus_node = match object(vocab::PREZ_SEARCH_RESULT_URI)? {
        TermRef::NamedNode(node) => node.into_owned(),
        _ => return None,
    };
    let predicate = match object(vocab::PREZ_SEARCH_RESULT_PREDICATE)? {
        TermRef::NamedNode(node) => node.into_owned(),
        _ => return None,
    };
    let matched = match object(vocab::PREZ_SEARCH_RESULT_MATCH)? {
        TermRef::Literal(literal) => literal.value().to_string(),
        _ => return None,
    };
    let weight = match object(vocab::PREZ_SEARCH_RESULT_WEIGHT)? {
        TermRef::Literal(literal) => literal.value().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(SearchResult {
        id,
        focus_node,
        predicate,
        matched,
        weight,
    })
}
