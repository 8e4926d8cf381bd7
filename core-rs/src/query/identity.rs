/**
 * identity.rs
 * Maps dataset / collection / feature identifiers to URIs and back
 */

use oxigraph::model::NamedNode;

use super::ast::{GroupPattern, Projection, PropertyPath, Query, SelectQuery, SolutionModifier, Term, Values, Var};
use super::fragments::{identified_by, token_filter};
use super::{QueryResult, SparqlQuery};
use crate::errors::{PrezError, Result};
use crate::vocab;

/// Which nesting level of the Dataset > FeatureCollection > Feature chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Dataset,
    Collection,
    Feature,
}

impl Level {
    fn var(self) -> Var {
        Var::new(match self {
            Level::Dataset => "d",
            Level::Collection => "fc",
            Level::Feature => "f",
        })
    }

    fn id_var(self) -> Var {
        Var::new(format!("{}_id", self.var().name()))
    }

    fn class(self) -> NamedNode {
        match self {
            Level::Dataset => vocab::DCAT_DATASET.into_owned(),
            Level::Collection => vocab::GEO_FEATURE_COLLECTION.into_owned(),
            Level::Feature => vocab::GEO_FEATURE.into_owned(),
        }
    }

    fn parent(self) -> Option<Level> {
        match self {
            Level::Dataset => None,
            Level::Collection => Some(Level::Dataset),
            Level::Feature => Some(Level::Collection),
        }
    }
}

const LEVELS: [Level; 3] = [Level::Dataset, Level::Collection, Level::Feature];

/// Lookup key: either the identifier tokens from a request path or the URIs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityRequest {
    Ids {
        dataset: Option<String>,
        collection: Option<String>,
        feature: Option<String>,
    },
    Uris {
        dataset: Option<NamedNode>,
        collection: Option<NamedNode>,
        feature: Option<NamedNode>,
    },
}

impl IdentityRequest {
    pub fn ids(dataset: Option<&str>, collection: Option<&str>, feature: Option<&str>) -> Self {
        IdentityRequest::Ids {
            dataset: dataset.map(str::to_string),
            collection: collection.map(str::to_string),
            feature: feature.map(str::to_string),
        }
    }

    fn id(&self, level: Level) -> Option<&str> {
        match self {
            IdentityRequest::Ids {
                dataset,
                collection,
                feature,
            } => match level {
                Level::Dataset => dataset.as_deref(),
                Level::Collection => collection.as_deref(),
                Level::Feature => feature.as_deref(),
            },
            IdentityRequest::Uris { .. } => None,
        }
    }

    fn uri(&self, level: Level) -> Option<&NamedNode> {
        match self {
            IdentityRequest::Uris {
                dataset,
                collection,
                feature,
            } => match level {
                Level::Dataset => dataset.as_ref(),
                Level::Collection => collection.as_ref(),
                Level::Feature => feature.as_ref(),
            },
            IdentityRequest::Ids { .. } => None,
        }
    }

    fn requested(&self, level: Level) -> bool {
        self.id(level).is_some() || self.uri(level).is_some()
    }

    /// Nearest requested level above `level`, with the number of
    /// `rdfs:member` steps between them
    fn requested_ancestor(&self, level: Level) -> Option<(Level, usize)> {
        let mut hops = 0;
        let mut current = level;
        while let Some(parent) = current.parent() {
            hops += 1;
            if self.requested(parent) {
                return Some((parent, hops));
            }
            current = parent;
        }
        None
    }

    fn deepest(&self) -> Option<Level> {
        LEVELS.iter().rev().copied().find(|level| self.requested(*level))
    }
}

/// `SELECT ?d ?fc ?f ... ?class` resolving the requested levels.
///
/// Identifier lookups nest each level's OPTIONAL block inside its parent's,
/// joined by `rdfs:member`, so a child is only found under a parent that was.
/// URI lookups pin each level with VALUES, require `rdfs:member` between
/// consecutive requested levels and read the identifiers optionally.
/// `?class` is bound on the deepest level.
pub fn object_identity_select(request: &IdentityRequest) -> Result<SparqlQuery> {
    let deepest = request
        .deepest()
        .ok_or_else(|| PrezError::InvalidInput("identity lookup needs at least one id or URI".to_string()))?;
    let class = Var::new("class");

    let mut projection: Vec<Projection> = LEVELS.iter().map(|level| Projection::Var(level.var())).collect();
    let mut pattern = GroupPattern::new();

    match request {
        IdentityRequest::Ids { .. } => {
            let mut nested: Option<GroupPattern> = None;
            for level in LEVELS.iter().rev().copied() {
                let Some(id) = request.id(level) else {
                    continue;
                };
                let focus = level.var();
                let mut block = identified_by(&focus, id, &level.class());
                if let Some(parent) = level.parent() {
                    block.triple(parent.var(), vocab::RDFS_MEMBER, &focus);
                }
                if level == deepest {
                    block.triple(&focus, vocab::RDF_TYPE, &class);
                }
                if let Some(child) = nested.take() {
                    block.optional(child);
                }
                nested = Some(block);
            }
            if let Some(outermost) = nested {
                pattern.optional(outermost);
            }
        }
        IdentityRequest::Uris { .. } => {
            for level in LEVELS {
                let Some(uri) = request.uri(level) else {
                    continue;
                };
                let focus = level.var();
                let id = level.id_var();
                pattern.values(Values {
                    vars: vec![focus.clone()],
                    rows: vec![vec![Term::Iri(uri.clone())]],
                });
                if let Some((ancestor, hops)) = request.requested_ancestor(level) {
                    let path = PropertyPath::sequence((0..hops).map(|_| vocab::RDFS_MEMBER));
                    pattern.triple(ancestor.var(), path, &focus);
                }
                let mut block = GroupPattern::new();
                block
                    .triple(&focus, vocab::DCTERMS_IDENTIFIER, &id)
                    .push(token_filter(&id));
                pattern.optional(block);
                if level == deepest {
                    let mut classes = GroupPattern::new();
                    classes.triple(&focus, vocab::RDF_TYPE, &class);
                    pattern.optional(classes);
                }
                projection.push(Projection::Var(id));
            }
        }
    }
    projection.push(Projection::Var(class));

    Ok(SparqlQuery::from_ast(&Query::Select(SelectQuery {
        distinct: true,
        projection,
        pattern,
        modifier: SolutionModifier::default(),
    })))
}

/// URIs, identifiers and classes of a resolved object chain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityResolution {
    pub dataset_uri: Option<NamedNode>,
    pub collection_uri: Option<NamedNode>,
    pub feature_uri: Option<NamedNode>,
    pub dataset_id: Option<String>,
    pub collection_id: Option<String>,
    pub feature_id: Option<String>,
    /// Classes of the deepest requested object, in result order
    pub classes: Vec<NamedNode>,
}

impl IdentityResolution {
    /// Interpret the rows of [`object_identity_select`] for `request`
    pub fn from_rows(request: &IdentityRequest, rows: &[QueryResult]) -> Result<Self> {
        let mut resolution = IdentityResolution::default();
        let first = rows.first();

        for level in LEVELS {
            let var = level.var();
            // URIs always come from the store: a level that did not match
            // leaves its variable unbound, or yields no row at all
            let uri = first
                .and_then(|row| row.get(var.name()))
                .map(|value| NamedNode::new(value.as_str()))
                .transpose()?;
            let id = match (request.id(level), &uri) {
                (Some(id), Some(_)) => Some(id.to_string()),
                (Some(_), None) => None,
                (None, _) => first.and_then(|row| row.get(level.id_var().name())).cloned(),
            };
            match level {
                Level::Dataset => {
                    resolution.dataset_uri = uri;
                    resolution.dataset_id = id;
                }
                Level::Collection => {
                    resolution.collection_uri = uri;
                    resolution.collection_id = id;
                }
                Level::Feature => {
                    resolution.feature_uri = uri;
                    resolution.feature_id = id;
                }
            }
        }

        for row in rows {
            if let Some(value) = row.get("class") {
                let class = NamedNode::new(value.as_str())?;
                if !resolution.classes.contains(&class) {
                    resolution.classes.push(class);
                }
            }
        }
        Ok(resolution)
    }

    /// True when every requested level was found in the store
    pub fn is_complete(&self, request: &IdentityRequest) -> bool {
        LEVELS.iter().all(|level| {
            !request.requested(*level)
                || match level {
                    Level::Dataset => self.dataset_uri.is_some(),
                    Level::Collection => self.collection_uri.is_some(),
                    Level::Feature => self.feature_uri.is_some(),
                }
        })
    }
}
