//! # Prez Core - SPARQL query synthesis
//!
//! Prez exposes RDF data held in a SPARQL triplestore through profile-aware,
//! content-negotiated endpoints. This crate is the part that decides what to
//! ask the store: given an item, a listing, a search term or a count request
//! and a profile, it builds the SPARQL query that retrieves exactly the
//! triples the profile allows.
//!
//! ## Core Principle
//!
//! **Profiles are data**: which predicates an item shows, how deep blank
//! nodes unwind and which relations a listing follows are read from SHACL
//! shapes in the profiles graph, never hard-coded.
//!
//! ## Architecture
//!
//! ```text
//! request ──► ItemDescriptor ──► PredicateResolver ──► assembler ──► SparqlQuery
//!                                       │                                │
//!                                 ProfileGraph                      TripleStore
//!                              (oxigraph, in memory)          (remote HTTP / embedded)
//! ```

pub mod vocab;
pub mod errors;
pub mod model;
pub mod query;
pub mod profiles;
pub mod cache;
pub mod store;
pub mod engine;
pub mod config;

pub use errors::{PrezError, Result};
pub use model::{ItemDescriptor, ItemPredicates, ListingPredicates, Pagination};
pub use query::{QueryForm, QueryResult, SparqlQuery};
pub use query::assemblers::{
    annotation_terms, annotations_construct, cached_annotations, item_construct, listing_construct,
    listing_count_construct, select_profile_mediatype, stored_counts, NegotiatedProfile,
};
pub use query::identity::{object_identity_select, IdentityRequest, IdentityResolution};
pub use query::search::{search_construct, search_result_id, SearchPage, SearchRequest, SearchResult};
pub use query::spatial::{feature_bbox_select, BoundingBox};
pub use profiles::{OxigraphProfileGraph, PredicateResolver, ProfileGraph, DEFAULT_BNODE_DEPTH};
pub use cache::{CacheCapacities, MemoCache, SynthesisCaches};
pub use store::{EmbeddedStore, QueryResponse, RemoteSparqlStore, RemoteStoreConfig, StoreRegistry, TripleStore};
pub use engine::{EngineSettings, QueryEngine};
pub use config::{PrezConfig, StoreConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prez names a store can be registered under
pub const KNOWN_PREZS: [&str; 4] = ["VocPrez", "SpacePrez", "CatPrez", "TimePrez"];
