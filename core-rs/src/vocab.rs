//! Vocabulary terms used by profile lookups and generated queries.
//!
//! Grouped by namespace. Every constant is a `NamedNodeRef<'static>` so it can
//! be passed straight into graph lookups or the query AST.

use oxigraph::model::NamedNodeRef;

pub const ALTREXT: &str = "http://www.w3.org/ns/dx/conneg/altr-ext#";
pub const PREZ: &str = "https://prez.dev/";
pub const SH: &str = "http://www.w3.org/ns/shacl#";
pub const DASH: &str = "http://datashapes.org/dash#";
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const DCAT: &str = "http://www.w3.org/ns/dcat#";
pub const GEO: &str = "http://www.opengis.net/ont/geosparql#";
pub const SKOS: &str = "http://www.w3.org/2004/02/skos/core#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Default full-text index predicate (Jena text index)
pub const JENA_TEXT_QUERY: &str = "http://jena.apache.org/text#query";

// altr-ext
pub const HAS_NODE_SHAPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#hasNodeShape");
pub const HAS_BNODE_DEPTH: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#hasBNodeDepth");
pub const INBOUND_CHILDREN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#inboundChildren");
pub const INBOUND_PARENTS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#inboundParents");
pub const OUTBOUND_CHILDREN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#outboundChildren");
pub const OUTBOUND_PARENTS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#outboundParents");
pub const CONSTRAINS_CLASS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#constrainsClass");
pub const HAS_RESOURCE_FORMAT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#hasResourceFormat");
pub const HAS_DEFAULT_RESOURCE_FORMAT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#hasDefaultResourceFormat");
pub const HAS_DEFAULT_PROFILE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dx/conneg/altr-ext#hasDefaultProfile");

// shacl / dash
pub const SH_TARGET_CLASS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#targetClass");
pub const SH_PATH: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#path");
pub const SH_PROPERTY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#property");
pub const SH_INVERSE_PATH: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#inversePath");
pub const SH_SEQUENCE_PATH: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/shacl#sequencePath");
pub const DASH_HIDDEN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://datashapes.org/dash#hidden");

// rdf / rdfs
pub const RDF_TYPE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
pub const RDF_FIRST: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#first");
pub const RDF_REST: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#rest");
pub const RDF_NIL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#nil");
pub const RDF_BAG: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#Bag");
pub const RDFS_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#label");
pub const RDFS_COMMENT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#comment");
pub const RDFS_MEMBER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#member");
pub const RDFS_SUB_CLASS_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subClassOf");

// dcterms / skos
pub const DCTERMS_IDENTIFIER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/identifier");
pub const DCTERMS_TITLE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/title");
pub const DCTERMS_DESCRIPTION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/description");
pub const DCTERMS_PROVENANCE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/provenance");
pub const SKOS_PREF_LABEL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");

// catalogue / spatial classes
pub const DCAT_DATASET: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/dcat#Dataset");
pub const GEO_FEATURE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#Feature");
pub const GEO_FEATURE_COLLECTION: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#FeatureCollection");
pub const GEO_HAS_GEOMETRY: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#hasGeometry");
pub const GEO_AS_WKT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#asWKT");
pub const GEO_WKT_LITERAL: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#wktLiteral");
pub const GEO_SF_INTERSECTS: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#sfIntersects");

// xsd
pub const XSD_TOKEN: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#token");

// prez
pub const PREZ_LINK: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("https://prez.dev/link");
pub const PREZ_COUNT: NamedNodeRef<'_> = NamedNodeRef::new_unchecked("https://prez.dev/count");
pub const PREZ_MEMBER_LIST: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://prez.dev/memberList");
pub const PREZ_SEARCH_RESULT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://prez.dev/SearchResult");
pub const PREZ_SEARCH_RESULT_URI: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://prez.dev/searchResultURI");
pub const PREZ_SEARCH_RESULT_MATCH: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://prez.dev/searchResultMatch");
pub const PREZ_SEARCH_RESULT_PREDICATE: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://prez.dev/searchResultPredicate");
pub const PREZ_SEARCH_RESULT_WEIGHT: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("https://prez.dev/searchResultWeight");

/// General classes served by the listing endpoints, used as the anchor for
/// subclass distance during profile negotiation.
pub const DEFAULT_GENERAL_CLASSES: [&str; 14] = [
    "http://www.w3.org/ns/dcat#Dataset",
    "http://www.opengis.net/ont/geosparql#FeatureCollection",
    "https://prez.dev/FeatureCollectionList",
    "https://prez.dev/FeatureList",
    "http://www.opengis.net/ont/geosparql#Feature",
    "http://www.w3.org/2004/02/skos/core#ConceptScheme",
    "http://www.w3.org/2004/02/skos/core#Concept",
    "http://www.w3.org/2004/02/skos/core#Collection",
    "https://prez.dev/DatasetList",
    "https://prez.dev/VocPrezCollectionList",
    "https://prez.dev/SchemesList",
    "https://prez.dev/CatalogList",
    "http://www.w3.org/ns/dcat#Catalog",
    "http://www.w3.org/ns/dcat#Resource",
];

/// Prefixes declared at the top of generated queries.
pub const QUERY_PREFIXES: [(&str, &str); 10] = [
    ("dcterms", DCTERMS),
    ("prez", PREZ),
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("xsd", XSD),
    ("skos", SKOS),
    ("sh", SH),
    ("altr-ext", ALTREXT),
    ("geo", GEO),
    ("dcat", DCAT),
];
