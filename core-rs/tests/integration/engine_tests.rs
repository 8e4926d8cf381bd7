//! Integration tests for the query engine
//!
//! Tests complete request flows including:
//! - Profile loading from config and Turtle files
//! - Item and listing synthesis driven by node shapes
//! - Execution against registered stores
//! - Memoization of predicates, item queries and identities

use oxigraph::model::{Graph, Literal, NamedNode, NamedNodeRef, SubjectRef, Term, TermRef, Triple};
use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

use prez_core::{
    CacheCapacities, EmbeddedStore, EngineSettings, IdentityRequest, ItemDescriptor, OxigraphProfileGraph,
    Pagination, PrezConfig, PrezError, ProfileGraph, QueryEngine, QueryResponse, StoreRegistry, TripleStore,
};

const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";

const PROFILES: &str = r#"
@prefix ex: <http://example.com/> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix dash: <http://datashapes.org/dash#> .
@prefix altr-ext: <http://www.w3.org/ns/dx/conneg/altr-ext#> .

ex:vocProfile altr-ext:hasNodeShape ex:schemeShape ;
    altr-ext:hasBNodeDepth 1 ;
    altr-ext:constrainsClass skos:ConceptScheme ;
    altr-ext:hasResourceFormat "text/turtle", "application/ld+json" ;
    altr-ext:hasDefaultResourceFormat "text/turtle" .

ex:schemeShape sh:targetClass skos:ConceptScheme ;
    altr-ext:hasDefaultProfile ex:vocProfile ;
    altr-ext:outboundChildren skos:hasTopConcept ;
    sh:path skos:prefLabel, dcterms:description ;
    sh:inversePath ex:inScheme ;
    sh:sequencePath ( skos:hasTopConcept rdfs:label ) ;
    sh:property [ sh:path ex:hidden ; dash:hidden true ] .

ex:bareProfile altr-ext:hasNodeShape ex:bareShape .
ex:bareShape sh:targetClass skos:ConceptScheme .

skos:prefLabel rdfs:label "preferred label"@en .
"#;

const DATA: &str = r#"
@prefix ex: <http://example.com/> .
@prefix skos: <http://www.w3.org/2004/02/skos/core#> .
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix dcat: <http://www.w3.org/ns/dcat#> .

ex:scheme a skos:ConceptScheme ;
    dcterms:identifier "scheme"^^xsd:token ;
    skos:prefLabel "Scheme"@en ;
    skos:hasTopConcept ex:c1, ex:c2 ;
    dcterms:description [
        rdfs:label "nested" ;
        ex:deeper [ rdfs:label "deeper" ]
    ] ;
    ex:hidden "secret" .

ex:c1 a skos:Concept ;
    dcterms:identifier "c1"^^xsd:token ;
    ex:inScheme ex:scheme ;
    rdfs:label "One"@en .

ex:c2 a skos:Concept ;
    dcterms:identifier "c2"^^xsd:token ;
    rdfs:label "Two"@en .

ex:ds1 a dcat:Dataset ;
    dcterms:identifier "ds1"^^xsd:token .
"#;

fn iri(value: &str) -> NamedNode {
    NamedNode::new(value).unwrap()
}

fn ex(local: &str) -> NamedNode {
    iri(&format!("http://example.com/{}", local))
}

fn engine() -> QueryEngine {
    let graph = OxigraphProfileGraph::from_turtle(PROFILES).unwrap();
    QueryEngine::new(Arc::new(graph), EngineSettings::default(), CacheCapacities::default())
}

fn data_store() -> TripleStore {
    EmbeddedStore::from_turtle(DATA).unwrap().into()
}

fn scheme() -> ItemDescriptor {
    let class = iri(&format!("{}ConceptScheme", SKOS));
    ItemDescriptor::builder(class.clone(), class)
        .uri(ex("scheme"))
        .link_constructor("/v/vocab/scheme")
        .build()
}

fn has(graph: &Graph, subject: &NamedNode, predicate: &str, object: impl Into<Term>) -> bool {
    graph.contains(&Triple::new(subject.clone(), iri(predicate), object))
}

/// Profile graph that counts how often it is consulted
struct CountingGraph {
    inner: OxigraphProfileGraph,
    calls: AtomicUsize,
}

impl ProfileGraph for CountingGraph {
    fn triples_matching(
        &self,
        subjects: Option<&[Term]>,
        predicate: NamedNodeRef<'_>,
        object: Option<&Term>,
    ) -> prez_core::Result<Vec<Triple>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.triples_matching(subjects, predicate, object)
    }

    fn list_items(&self, head: &Term) -> prez_core::Result<Vec<Term>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_items(head)
    }
}

// =============================================================================
// Item
// =============================================================================

#[tokio::test]
async fn test_item_follows_node_shape() {
    let engine = engine();
    let query = engine.item_construct(&scheme(), &ex("vocProfile")).unwrap();
    let graph = engine
        .fetch(&data_store(), &query)
        .await
        .unwrap()
        .unwrap()
        .into_graph()
        .unwrap();

    let scheme = ex("scheme");
    assert!(has(
        &graph,
        &scheme,
        &format!("{}prefLabel", SKOS),
        Literal::new_language_tagged_literal("Scheme", "en").unwrap()
    ));

    // inverse path
    assert!(has(&graph, &ex("c1"), "http://example.com/inScheme", scheme.clone()));

    // sequence path walks to the top concepts' labels
    assert!(has(&graph, &scheme, &format!("{}hasTopConcept", SKOS), ex("c2")));
    assert!(has(
        &graph,
        &ex("c2"),
        RDFS_LABEL,
        Literal::new_language_tagged_literal("Two", "en").unwrap()
    ));

    // hidden property never comes back
    assert!(!has(&graph, &scheme, "http://example.com/hidden", Literal::new_simple_literal("secret")));

    // profile depth 1: first blank node level only
    let blank_labels: BTreeSet<String> = graph
        .triples_for_predicate(NamedNodeRef::new_unchecked(RDFS_LABEL))
        .filter(|t| matches!(t.subject, SubjectRef::BlankNode(_)))
        .filter_map(|t| match t.object {
            TermRef::Literal(literal) => Some(literal.value().to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(blank_labels, ["nested".to_string()].into_iter().collect());
}

#[test]
fn test_items_of_one_class_share_resolved_predicates() {
    let graph = Arc::new(CountingGraph {
        inner: OxigraphProfileGraph::from_turtle(PROFILES).unwrap(),
        calls: AtomicUsize::new(0),
    });
    let engine = QueryEngine::new(graph.clone(), EngineSettings::default(), CacheCapacities::default());
    let class = iri(&format!("{}ConceptScheme", SKOS));

    let first = ItemDescriptor::builder(class.clone(), class.clone()).id("scheme").build();
    let second = ItemDescriptor::builder(class.clone(), class).id("other").build();

    let a = engine.item_construct(&first, &ex("vocProfile")).unwrap();
    let after_first = graph.calls.load(Ordering::SeqCst);
    assert!(after_first > 0);

    let b = engine.item_construct(&second, &ex("vocProfile")).unwrap();
    assert_eq!(graph.calls.load(Ordering::SeqCst), after_first);
    assert_ne!(a, b);

    // same item again: served from the item query cache
    assert_eq!(engine.item_construct(&first, &ex("vocProfile")).unwrap(), a);
    assert_eq!(graph.calls.load(Ordering::SeqCst), after_first);
}

#[test]
fn test_item_needs_id_or_uri() {
    let class = iri(&format!("{}ConceptScheme", SKOS));
    let item = ItemDescriptor::builder(class.clone(), class).build();
    let err = engine().item_construct(&item, &ex("vocProfile")).unwrap_err();
    assert!(matches!(err, PrezError::InvalidInput(_)));
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_listing_through_registry() {
    let engine = engine();
    let mut registry = StoreRegistry::new();
    registry.register("VocPrez", EmbeddedStore::from_turtle(DATA).unwrap());

    let query = engine
        .listing_construct(&scheme(), &ex("vocProfile"), &Pagination::unbounded())
        .unwrap();
    let graph = registry.query("VocPrez", &query).await.unwrap().into_graph().unwrap();

    assert!(has(
        &graph,
        &ex("c1"),
        "https://prez.dev/link",
        Literal::new_simple_literal("/v/vocab/scheme/c1")
    ));
    assert!(has(
        &graph,
        &ex("c2"),
        "https://prez.dev/link",
        Literal::new_simple_literal("/v/vocab/scheme/c2")
    ));

    assert!(matches!(
        registry.query("SpacePrez", &query).await,
        Err(PrezError::UnknownStore(_))
    ));
}

#[tokio::test]
async fn test_listing_without_relations_skips_store() {
    let engine = engine();
    let query = engine
        .listing_construct(&scheme(), &ex("bareProfile"), &Pagination::unbounded())
        .unwrap();
    assert!(query.is_empty());
    assert!(engine.fetch(&data_store(), &query).await.unwrap().is_none());
}

#[tokio::test]
async fn test_count_through_engine() {
    let engine = engine();
    let class = iri(&format!("{}Concept", SKOS));
    let concepts = ItemDescriptor::builder(class.clone(), class.clone()).build();
    let response = engine
        .fetch(&data_store(), &engine.listing_count(&concepts))
        .await
        .unwrap()
        .unwrap();
    let graph = match response {
        QueryResponse::Graph(graph) => graph,
        QueryResponse::Rows(_) => panic!("count must be a CONSTRUCT"),
    };
    let count = graph
        .object_for_subject_predicate(&class, NamedNodeRef::new_unchecked("https://prez.dev/count"))
        .and_then(|o| match o {
            TermRef::Literal(literal) => Some(literal.value().to_string()),
            _ => None,
        });
    assert_eq!(count.as_deref(), Some("2"));
}

// =============================================================================
// Negotiation
// =============================================================================

#[tokio::test]
async fn test_negotiate_against_profile_store() {
    let engine = engine();
    let profiles: TripleStore = EmbeddedStore::from_turtle(PROFILES).unwrap().into();
    let class = iri(&format!("{}ConceptScheme", SKOS));

    let chosen = engine
        .negotiate(&profiles, std::slice::from_ref(&class), None, &[])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(chosen.profile, ex("vocProfile"));
    assert_eq!(chosen.class, class);
    assert_eq!(chosen.mediatype, "text/turtle");

    let json = engine
        .negotiate(
            &profiles,
            std::slice::from_ref(&class),
            None,
            &[(0.9, "application/ld+json".to_string())],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(json.mediatype, "application/ld+json");
}

#[test]
fn test_negotiation_is_order_independent() {
    let engine = engine();
    let a = iri(&format!("{}ConceptScheme", SKOS));
    let b = iri(&format!("{}Concept", SKOS));
    let forward = engine.profile_mediatype(&[a.clone(), b.clone()], None, &[]).unwrap();
    let backward = engine.profile_mediatype(&[b, a], None, &[]).unwrap();
    assert_eq!(forward, backward);
}

// =============================================================================
// Identity
// =============================================================================

#[tokio::test]
async fn test_identity_resolution_is_memoized() {
    let engine = engine();
    let request = IdentityRequest::ids(Some("ds1"), None, None);

    let first = engine.resolve_identity(&data_store(), &request).await.unwrap();
    assert_eq!(first.dataset_uri, Some(ex("ds1")));
    assert_eq!(engine.cached_identities(), 1);

    // an empty store would not find ds1; the cached answer is returned
    let empty: TripleStore = EmbeddedStore::new().unwrap().into();
    let second = engine.resolve_identity(&empty, &request).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(engine.cached_identities(), 1);
}

#[tokio::test]
async fn test_identity_failure_is_not_cached() {
    let engine = engine();
    let request = IdentityRequest::ids(None, None, None);
    assert!(engine.resolve_identity(&data_store(), &request).await.is_err());
    assert_eq!(engine.cached_identities(), 0);
}

// =============================================================================
// Annotations
// =============================================================================

#[tokio::test]
async fn test_annotations_use_profile_graph_first() {
    let engine = engine();
    let item = engine.item_construct(&scheme(), &ex("vocProfile")).unwrap();
    let graph = engine
        .fetch(&data_store(), &item)
        .await
        .unwrap()
        .unwrap()
        .into_graph()
        .unwrap();

    let (found, query) = engine.annotations(&graph).unwrap();
    // skos:prefLabel is labelled in the profiles graph
    assert!(has(
        &found,
        &iri(&format!("{}prefLabel", SKOS)),
        RDFS_LABEL,
        Literal::new_language_tagged_literal("preferred label", "en").unwrap()
    ));
    assert!(!query.is_empty());

    let labels = engine
        .fetch(&data_store(), &query)
        .await
        .unwrap()
        .unwrap()
        .into_graph()
        .unwrap();
    assert!(has(
        &labels,
        &ex("c1"),
        RDFS_LABEL,
        Literal::new_language_tagged_literal("One", "en").unwrap()
    ));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_engine_from_config_file() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("profiles.ttl"), PROFILES).unwrap();
    let config_path = temp_dir.path().join("prez.yaml");
    fs::write(
        &config_path,
        r#"
labelLanguages: [en]
defaultBnodeDepth: 4
profiles:
  - profiles.ttl
stores:
  VocPrez:
    endpoint: http://localhost:3030/vocprez/query
"#,
    )
    .unwrap();

    let config = PrezConfig::load(&config_path).unwrap();
    assert_eq!(config.profiles, vec![temp_dir.path().join("profiles.ttl")]);

    let engine = QueryEngine::from_config(&config).unwrap();
    assert_eq!(engine.settings().label_languages, vec!["en".to_string()]);
    assert_eq!(engine.settings().default_bnode_depth, 4);

    // the profile's own depth wins over the configured default
    let query = engine.item_construct(&scheme(), &ex("vocProfile")).unwrap();
    assert!(query.as_str().contains("?o1 ?p2 ?o2"));
    assert!(!query.as_str().contains("?o2 ?p3 ?o3"));
}

#[test]
fn test_engine_from_config_with_missing_profile_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("prez.yaml");
    fs::write(&config_path, "profiles:\n  - missing.ttl\n").unwrap();
    let config = PrezConfig::load(&config_path).unwrap();
    assert!(QueryEngine::from_config(&config).is_err());
}
