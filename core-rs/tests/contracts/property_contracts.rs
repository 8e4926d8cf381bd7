//! Property-based contract tests for query synthesis.
//!
//! Uses proptest to check that the generated SPARQL depends only on what a
//! profile declares, never on the order its triples are stored in, and stays
//! parseable for any identifier a request can carry.

use oxigraph::model::NamedNode;
use oxigraph::sparql::Query as ParsedQuery;
use proptest::prelude::*;
use std::sync::Arc;

use prez_core::{
    item_construct, listing_construct, search_result_id, ItemDescriptor, ItemPredicates, ListingPredicates,
    MemoCache, OxigraphProfileGraph, Pagination, PredicateResolver, DEFAULT_BNODE_DEPTH,
};

fn iri(value: &str) -> NamedNode {
    NamedNode::new(value).unwrap()
}

fn predicate(local: &str) -> NamedNode {
    iri(&format!("http://example.com/{}", local))
}

fn dataset(uri: Option<&str>, id: Option<&str>) -> ItemDescriptor {
    let class = iri("http://www.w3.org/ns/dcat#Dataset");
    let mut builder = ItemDescriptor::builder(class.clone(), class).link_constructor("/s/datasets");
    if let Some(uri) = uri {
        builder = builder.uri(iri(uri));
    }
    if let Some(id) = id {
        builder = builder.id(id);
    }
    builder.build()
}

fn item() -> ItemDescriptor {
    dataset(Some("http://example.com/ds"), None)
}

const SHAPE_PREFIXES: &str = "\
@prefix ex: <http://example.com/> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix dash: <http://datashapes.org/dash#> .
@prefix altr-ext: <http://www.w3.org/ns/dx/conneg/altr-ext#> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
";

/// One profile shape as standalone triples, so any order is valid Turtle.
/// The sequence paths are declared z-chain first.
fn shape_statements() -> Vec<&'static str> {
    vec![
        "ex:profile altr-ext:hasNodeShape ex:shape .",
        "ex:profile altr-ext:hasBNodeDepth 1 .",
        "ex:shape sh:targetClass ex:Scheme .",
        "ex:shape altr-ext:outboundChildren ex:hasTop .",
        "ex:shape altr-ext:outboundChildren ex:hasMember .",
        "ex:shape altr-ext:inboundParents ex:inScheme .",
        "ex:shape sh:path ex:title .",
        "ex:shape sh:path ex:description .",
        "ex:shape sh:inversePath ex:partOf .",
        "ex:shape sh:property _:geometry .",
        "_:geometry sh:path ex:geometry .",
        "ex:shape sh:property _:secret .",
        "_:secret sh:path ex:secret .",
        "_:secret dash:hidden true .",
        "ex:shape sh:sequencePath _:z1 .",
        "_:z1 rdf:first ex:z1 .",
        "_:z1 rdf:rest _:z2 .",
        "_:z2 rdf:first ex:z2 .",
        "_:z2 rdf:rest _:z3 .",
        "_:z3 rdf:first ex:z3 .",
        "_:z3 rdf:rest rdf:nil .",
        "ex:shape sh:sequencePath _:a1 .",
        "_:a1 rdf:first ex:a1 .",
        "_:a1 rdf:rest _:a2 .",
        "_:a2 rdf:first ex:a2 .",
        "_:a2 rdf:rest rdf:nil .",
    ]
}

fn resolver_for(statements: &[&str]) -> PredicateResolver {
    let turtle = format!("{}{}", SHAPE_PREFIXES, statements.join("\n"));
    PredicateResolver::new(
        Arc::new(OxigraphProfileGraph::from_turtle(&turtle).unwrap()),
        DEFAULT_BNODE_DEPTH,
        MemoCache::new("listing", 4),
        MemoCache::new("item", 4),
    )
}

// =============================================================================
// Order independence
// =============================================================================

proptest! {
    /// Profile shapes stored in any triple order resolve to the same
    /// predicates, and to the same query
    #[test]
    fn prop_shape_triple_order_does_not_change_resolution(
        statements in Just(shape_statements()).prop_shuffle(),
    ) {
        let declared = resolver_for(&shape_statements());
        let shuffled = resolver_for(&statements);
        let profile = predicate("profile");
        let class = predicate("Scheme");

        let expected = declared.resolve_item_predicates(&profile, &class).unwrap();
        let actual = shuffled.resolve_item_predicates(&profile, &class).unwrap();
        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(
            &actual.sequence,
            &vec![
                vec![predicate("a1"), predicate("a2")],
                vec![predicate("z1"), predicate("z2"), predicate("z3")],
            ]
        );
        prop_assert_eq!(actual.include.len(), 3);
        prop_assert_eq!(actual.bnode_depth, 1);
        prop_assert_eq!(
            item_construct(&item(), &actual).unwrap(),
            item_construct(&item(), &expected).unwrap()
        );

        prop_assert_eq!(
            shuffled.resolve_listing_predicates(&profile, &class).unwrap(),
            declared.resolve_listing_predicates(&profile, &class).unwrap()
        );
    }

    /// Listing relations give the same query whatever order they were declared in
    #[test]
    fn prop_listing_relations_are_order_independent(
        locals in prop::collection::vec("[a-z]{1,8}", 1..6),
    ) {
        let mut forward = ListingPredicates::default();
        let mut backward = ListingPredicates::default();
        for local in &locals {
            forward.outbound_children.insert(predicate(local));
        }
        for local in locals.iter().rev() {
            backward.outbound_children.insert(predicate(local));
        }
        let page = Pagination::unbounded();
        prop_assert_eq!(
            listing_construct(&item(), &forward, &page, &[]).unwrap(),
            listing_construct(&item(), &backward, &page, &[]).unwrap()
        );
    }
}

// =============================================================================
// Blank node depth and sequence paths
// =============================================================================

proptest! {
    /// Depth n expands exactly n nested blank-node levels
    #[test]
    fn prop_bnode_depth_levels(depth in 0u32..6) {
        let mut predicates = ItemPredicates::with_depth(depth);
        predicates.include.insert(predicate("title"));
        let query = item_construct(&item(), &predicates).unwrap();
        let text = query.as_str();

        prop_assert_eq!(text.matches("ISBLANK(").count(), depth as usize);
        let deepest = format!("?o{} ?p{} ?o{}", depth, depth + 1, depth + 1);
        let beyond = format!("?o{} ?p{} ?o{}", depth + 1, depth + 2, depth + 2);
        prop_assert_eq!(text.contains(&deepest), depth > 0);
        prop_assert!(!text.contains(&beyond));
    }

    /// A sequence path is walked step by step in declared order
    #[test]
    fn prop_sequence_chain_keeps_order(len in 1usize..6) {
        let chain: Vec<NamedNode> = (0..len).map(|i| predicate(&format!("step{}", i))).collect();
        let mut predicates = ItemPredicates::with_depth(0);
        predicates.sequence.push(chain);
        let query = item_construct(&item(), &predicates).unwrap();
        let text = query.as_str();

        prop_assert!(text.contains("<http://example.com/ds> <http://example.com/step0> ?seq0_o1 ."));
        for i in 1..len {
            let step = format!("?seq0_o{} <http://example.com/step{}> ?seq0_o{} .", i, i, i + 1);
            prop_assert!(text.contains(&step), "missing step {}", step);
        }
    }
}

// =============================================================================
// Pagination
// =============================================================================

proptest! {
    /// page/per_page map to LIMIT per_page OFFSET (page - 1) * per_page
    #[test]
    fn prop_pagination_window(page in 1u32..10_000, per_page in 1u32..500) {
        let pagination = Pagination::new(Some(page), Some(per_page)).unwrap();
        let (limit, offset) = pagination.window().unwrap();
        prop_assert_eq!(limit, u64::from(per_page));
        prop_assert_eq!(offset, u64::from(page - 1) * u64::from(per_page));

        let query = listing_construct(
            &dataset(None, None),
            &ListingPredicates::default(),
            &pagination,
            &[],
        )
        .unwrap();
        let limit_clause = format!("LIMIT {}", limit);
        let offset_clause = format!("OFFSET {}", offset);
        prop_assert!(query.as_str().contains(&limit_clause));
        prop_assert!(query.as_str().contains(&offset_clause));
    }

    /// Only one half of the window means no LIMIT/OFFSET at all
    #[test]
    fn prop_partial_pagination_is_unbounded(value in 1u32..500, page_only: bool) {
        let pagination = if page_only {
            Pagination::new(Some(value), None).unwrap()
        } else {
            Pagination::new(None, Some(value)).unwrap()
        };
        prop_assert!(pagination.window().is_none());
        let query = listing_construct(&dataset(None, None), &ListingPredicates::default(), &pagination, &[])
            .unwrap();
        prop_assert!(!query.as_str().contains("LIMIT"));
    }
}

// =============================================================================
// Identifiers and hashes
// =============================================================================

proptest! {
    /// Any identifier yields a query that parses
    #[test]
    fn prop_any_identifier_parses(id in "[a-zA-Z0-9 \"'\\\\{}<>#;.\n\t-]{1,30}") {
        let query = item_construct(&dataset(None, Some(&id)), &ItemPredicates::with_depth(1)).unwrap();
        prop_assert!(ParsedQuery::parse(query.as_str(), None).is_ok(), "{}", query);
    }

    /// Result ids depend only on their inputs
    #[test]
    fn prop_result_id_is_deterministic(
        focus in "[a-z]{1,10}",
        matched in ".{0,20}",
        weight in 0.0f64..100.0,
    ) {
        let focus = format!("http://example.com/{}", focus);
        let weight = weight.to_string();
        let a = search_result_id(&focus, "http://www.w3.org/2000/01/rdf-schema#label", &matched, &weight);
        let b = search_result_id(&focus, "http://www.w3.org/2000/01/rdf-schema#label", &matched, &weight);
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.len(), "urn:hash:".len() + 64);
    }
}
