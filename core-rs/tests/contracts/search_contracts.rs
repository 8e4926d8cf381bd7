// Search Contract Tests
//
// These tests verify the paging and identity guarantees of full-text search.
//
// **Problem**: search paging guessed from a short page, or result ids that
// change between calls, break "next page" links and client-side caching
// **Solution**: contract tests pin the extra row and the hash id recipe

use oxigraph::model::{Graph, Literal, NamedNode, Triple};
use oxigraph::sparql::Query as ParsedQuery;

use prez_core::{search_construct, search_result_id, PrezError, SearchPage, SearchRequest};

const SEARCH_RESULT: &str = "https://prez.dev/SearchResult";

fn iri(value: &str) -> NamedNode {
    NamedNode::new(value).unwrap()
}

fn text_index() -> NamedNode {
    iri("http://jena.apache.org/text#query")
}

fn label() -> NamedNode {
    iri("http://www.w3.org/2000/01/rdf-schema#label")
}

fn response(weights: &[f64]) -> Graph {
    let mut graph = Graph::new();
    for (i, weight) in weights.iter().enumerate() {
        let focus = format!("http://example.com/f{}", i);
        let weight_lexical = weight.to_string();
        let id = iri(&search_result_id(&focus, label().as_str(), "creek", &weight_lexical));
        let triples = [
            Triple::new(id.clone(), iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"), iri(SEARCH_RESULT)),
            Triple::new(id.clone(), iri("https://prez.dev/searchResultURI"), iri(&focus)),
            Triple::new(id.clone(), iri("https://prez.dev/searchResultPredicate"), label()),
            Triple::new(id.clone(), iri("https://prez.dev/searchResultMatch"), Literal::new_simple_literal("creek")),
            Triple::new(
                id.clone(),
                iri("https://prez.dev/searchResultWeight"),
                Literal::new_typed_literal(weight_lexical, iri("http://www.w3.org/2001/XMLSchema#decimal")),
            ),
        ];
        for triple in &triples {
            graph.insert(triple);
        }
    }
    graph
}

/// WHY: The store is asked for one row more than the page holds
/// REASON: The extra row is how "there is a next page" is known
/// BREAKS: Paging either stops early or offers an empty next page
#[test]
fn search_fetches_one_row_past_the_page() {
    let request = SearchRequest::new("sandy creek", 20, 40).predicates([label()]);
    let query = search_construct(&request, &text_index()).unwrap();
    assert!(query.as_str().contains("LIMIT 21"));
    assert!(query.as_str().contains("OFFSET 40"));
    assert!(ParsedQuery::parse(query.as_str(), None).is_ok());
}

/// WHY: The extra row sets `has_more` and is never shown
/// BREAKS: Pages hold limit + 1 results and overlap the next page
#[test]
fn extra_row_is_not_returned() {
    let full = SearchPage::from_triples(&response(&[0.9, 0.8, 0.7]), 2);
    assert!(full.has_more);
    assert_eq!(full.results.len(), 2);
    assert_eq!(full.results[0].weight, 0.9);

    let last = SearchPage::from_triples(&response(&[0.9, 0.8]), 2);
    assert!(!last.has_more);
    assert_eq!(last.results.len(), 2);
}

/// WHY: Result ids are a pure function of (focus, predicate, match, weight)
/// FORBIDDEN: Random or time-based components in result ids
/// REASON: The store computes the same hash with SHA256(CONCAT(...))
/// BREAKS: The same hit gets a new id on every request
#[test]
fn result_ids_are_deterministic() {
    let a = search_result_id("http://example.com/f", label().as_str(), "creek", "0.5");
    let b = search_result_id("http://example.com/f", label().as_str(), "creek", "0.5");
    assert_eq!(a, b);
    assert!(a.starts_with("urn:hash:"));
    assert!(a["urn:hash:".len()..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

    let query = search_construct(
        &SearchRequest::new("creek", 5, 0).predicates([label()]),
        &text_index(),
    )
    .unwrap();
    assert!(query
        .as_str()
        .contains("SHA256(CONCAT(STR(?focus_node), STR(?pred), STR(?match), STR(?weight)))"));
}

/// WHY: Search terms are data, never syntax
/// REASON: Terms come straight from the query string
/// BREAKS: A `"` in the search box rewrites the query
#[test]
fn search_term_is_escaped() {
    let request = SearchRequest::new("creek\" } ; DROP ALL ; #", 5, 0).predicates([label()]);
    let query = search_construct(&request, &text_index()).unwrap();
    assert!(ParsedQuery::parse(query.as_str(), None).is_ok());
    assert!(!query.as_str().contains("creek\" }"));
}

/// WHY: A search needs a term and something to search over
/// BREAKS: Blank searches scan the whole text index
#[test]
fn search_without_term_or_predicates_is_rejected() {
    let blank = SearchRequest::new("  \t ", 5, 0).predicates([label()]);
    assert!(matches!(
        search_construct(&blank, &text_index()),
        Err(PrezError::InvalidInput(_))
    ));
    assert!(matches!(
        search_construct(&SearchRequest::new("creek", 5, 0), &text_index()),
        Err(PrezError::InvalidInput(_))
    ));
}
