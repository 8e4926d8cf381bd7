/**
 * engine.rs
 * Process-lifetime query engine: profile graph, predicate resolver and the
 * memoization caches behind one handle
 */

use oxigraph::model::{Graph, NamedNode};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{CacheCapacities, MemoCache, SynthesisCaches};
use crate::config::PrezConfig;
use crate::errors::{PrezError, Result};
use crate::model::{ItemDescriptor, ListingPredicates, Pagination};
use crate::profiles::{OxigraphProfileGraph, PredicateResolver, ProfileGraph, DEFAULT_BNODE_DEPTH};
use crate::query::assemblers::{self, NegotiatedProfile};
use crate::query::identity::{object_identity_select, IdentityRequest, IdentityResolution};
use crate::query::search::{search_construct, SearchPage, SearchRequest};
use crate::query::spatial::{feature_bbox_select, BoundingBox};
use crate::query::SparqlQuery;
use crate::store::{QueryResponse, TripleStore};
use crate::vocab;

/// Values the assemblers take from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub text_index: NamedNode,
    pub label_languages: Vec<String>,
    pub general_classes: Vec<NamedNode>,
    pub search_predicates: Vec<NamedNode>,
    pub default_bnode_depth: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            text_index: NamedNode::new_unchecked(vocab::JENA_TEXT_QUERY),
            label_languages: vec!["en".to_string(), "en-AU".to_string()],
            general_classes: vocab::DEFAULT_GENERAL_CLASSES
                .iter()
                .map(|c| NamedNode::new_unchecked(*c))
                .collect(),
            search_predicates: vec![vocab::RDFS_LABEL.into_owned(), vocab::RDFS_COMMENT.into_owned()],
            default_bnode_depth: DEFAULT_BNODE_DEPTH,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &PrezConfig) -> Result<Self> {
        Ok(Self {
            text_index: NamedNode::new(config.text_index_predicate.as_str())?,
            label_languages: config.label_languages.clone(),
            general_classes: parse_iris(&config.general_classes())?,
            search_predicates: parse_iris(&config.search_predicates)?,
            default_bnode_depth: config.default_bnode_depth,
        })
    }
}

/// Shared synthesis context, built once and passed around behind an `Arc`
pub struct QueryEngine {
    resolver: PredicateResolver,
    item_queries: MemoCache<(ItemDescriptor, NamedNode), SparqlQuery>,
    identities: MemoCache<IdentityRequest, IdentityResolution>,
    settings: EngineSettings,
}

impl QueryEngine {
    pub fn new(graph: Arc<dyn ProfileGraph>, settings: EngineSettings, capacities: CacheCapacities) -> Self {
        let SynthesisCaches {
            item_queries,
            listing_predicates,
            item_predicates,
            identities,
        } = SynthesisCaches::new(capacities);
        let resolver = PredicateResolver::new(
            graph,
            settings.default_bnode_depth,
            listing_predicates,
            item_predicates,
        );
        Self {
            resolver,
            item_queries,
            identities,
            settings,
        }
    }

    /// Load the configured profile files and build the engine
    pub fn from_config(config: &PrezConfig) -> Result<Self> {
        let graph = OxigraphProfileGraph::from_paths(config.profiles.as_slice())?;
        info!(profiles = config.profiles.len(), triples = graph.len(), "profile graph ready");
        Ok(Self::new(
            Arc::new(graph),
            EngineSettings::from_config(config)?,
            config.cache.into(),
        ))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn resolver(&self) -> &PredicateResolver {
        &self.resolver
    }

    // =========================================================================
    // Synthesis
    // =========================================================================

    /// Item CONSTRUCT for `item` under `profile`, memoized per (item, profile)
    pub fn item_construct(&self, item: &ItemDescriptor, profile: &NamedNode) -> Result<SparqlQuery> {
        item.require_identity()?;
        self.item_queries
            .get_or_try_insert_with((item.clone(), profile.clone()), || {
                let predicates = self.resolver.resolve_item_predicates(profile, item.selected_class())?;
                assemblers::item_construct(item, &predicates)
            })
    }

    /// Listing page; the profile's listing relations apply when the parent
    /// has a URI
    pub fn listing_construct(
        &self,
        parent: &ItemDescriptor,
        profile: &NamedNode,
        pagination: &Pagination,
    ) -> Result<SparqlQuery> {
        let predicates = match parent.uri() {
            Some(_) => self
                .resolver
                .resolve_listing_predicates(profile, parent.selected_class())?,
            None => ListingPredicates::default(),
        };
        assemblers::listing_construct(parent, &predicates, pagination, &self.settings.label_languages)
    }

    pub fn listing_count(&self, item: &ItemDescriptor) -> SparqlQuery {
        assemblers::listing_count_construct(item)
    }

    pub fn profile_mediatype(
        &self,
        classes: &[NamedNode],
        requested_profile: Option<&NamedNode>,
        requested_mediatypes: &[(f64, String)],
    ) -> Result<SparqlQuery> {
        assemblers::select_profile_mediatype(
            classes,
            requested_profile,
            requested_mediatypes,
            &self.settings.general_classes,
        )
    }

    /// Search over the configured predicates
    pub fn search(&self, term: &str, limit: u64, offset: u64) -> Result<SparqlQuery> {
        let request = SearchRequest::new(term, limit, offset).predicates(self.settings.search_predicates.clone());
        self.search_request(&request)
    }

    pub fn search_request(&self, request: &SearchRequest) -> Result<SparqlQuery> {
        search_construct(request, &self.settings.text_index)
    }

    pub fn bbox(
        &self,
        collection: &ItemDescriptor,
        bbox: &BoundingBox,
        pagination: &Pagination,
    ) -> Result<SparqlQuery> {
        feature_bbox_select(collection, bbox, pagination)
    }

    /// Annotations for the IRIs in `graph`: what the profile graph already
    /// holds, plus the label query for the rest
    pub fn annotations(&self, graph: &Graph) -> Result<(Graph, SparqlQuery)> {
        let terms = assemblers::annotation_terms(graph);
        let (uncached, found) = assemblers::cached_annotations(self.resolver.graph().as_ref(), &terms)?;
        debug!(terms = terms.len(), uncached = uncached.len(), "annotation lookup");
        let query = assemblers::annotations_construct(
            &uncached,
            &vocab::RDFS_LABEL.into_owned(),
            &self.settings.label_languages,
        )?;
        Ok((found, query))
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run `query` on `store`; the empty sentinel never reaches the store
    pub async fn fetch(&self, store: &TripleStore, query: &SparqlQuery) -> Result<Option<QueryResponse>> {
        if query.is_empty() {
            debug!("empty query, skipping store");
            return Ok(None);
        }
        store.query(query).await.map(Some)
    }

    /// Identity lookup, memoized per request
    pub async fn resolve_identity(
        &self,
        store: &TripleStore,
        request: &IdentityRequest,
    ) -> Result<IdentityResolution> {
        if let Some(hit) = self.identities.get(request) {
            return Ok(hit);
        }
        let query = object_identity_select(request)?;
        let rows = store.query(&query).await?.into_rows()?;
        let resolution = IdentityResolution::from_rows(request, &rows)?;
        self.identities.insert(request.clone(), resolution.clone());
        Ok(resolution)
    }

    /// Best (profile, class, mediatype) for the candidate classes
    pub async fn negotiate(
        &self,
        store: &TripleStore,
        classes: &[NamedNode],
        requested_profile: Option<&NamedNode>,
        requested_mediatypes: &[(f64, String)],
    ) -> Result<Option<NegotiatedProfile>> {
        let query = self.profile_mediatype(classes, requested_profile, requested_mediatypes)?;
        let rows = store.query(&query).await?.into_rows()?;
        NegotiatedProfile::from_rows(&rows)
    }

    /// One page of search results
    pub async fn search_page(&self, store: &TripleStore, request: &SearchRequest) -> Result<SearchPage> {
        let query = self.search_request(request)?;
        let graph = store.query(&query).await?.into_graph()?;
        Ok(SearchPage::from_triples(&graph, request.limit))
    }

    /// Cached identity resolutions currently held
    pub fn cached_identities(&self) -> usize {
        self.identities.len()
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("settings", &self.settings)
            .field("item_queries", &self.item_queries)
            .field("identities", &self.identities)
            .finish()
    }
}

/// Parse a list of IRIs given on the command line or in a request
pub fn parse_iris<S: AsRef<str>>(values: &[S]) -> Result<Vec<NamedNode>> {
    values
        .iter()
        .map(|value| {
            NamedNode::new(value.as_ref()).map_err(|e| PrezError::InvalidIri(format!("{}: {}", value.as_ref(), e)))
        })
        .collect()
}
