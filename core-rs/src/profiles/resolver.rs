/**
 * resolver.rs
 * Resolves the predicates a profile exposes for a class
 */

use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::graph::ProfileGraph;
use crate::cache::{MemoCache, PredicateKey};
use crate::errors::Result;
use crate::model::{ItemPredicates, ListingPredicates};
use crate::vocab;

pub const DEFAULT_BNODE_DEPTH: u32 = 2;

/// Reads profile shapes and turns them into predicate sets.
///
/// Both resolutions are pure functions of (profile, class) and are memoized;
/// a repeated call never reaches the profile graph.
pub struct PredicateResolver {
    graph: Arc<dyn ProfileGraph>,
    default_bnode_depth: u32,
    listing_cache: MemoCache<PredicateKey, ListingPredicates>,
    item_cache: MemoCache<PredicateKey, ItemPredicates>,
}

impl PredicateResolver {
    pub fn new(
        graph: Arc<dyn ProfileGraph>,
        default_bnode_depth: u32,
        listing_cache: MemoCache<PredicateKey, ListingPredicates>,
        item_cache: MemoCache<PredicateKey, ItemPredicates>,
    ) -> Self {
        Self {
            graph,
            default_bnode_depth,
            listing_cache,
            item_cache,
        }
    }

    pub fn graph(&self) -> &Arc<dyn ProfileGraph> {
        &self.graph
    }

    pub fn resolve_listing_predicates(
        &self,
        profile: &NamedNode,
        class: &NamedNode,
    ) -> Result<ListingPredicates> {
        self.listing_cache
            .get_or_try_insert_with((profile.clone(), class.clone()), || {
                self.lookup_listing_predicates(profile, class)
            })
    }

    pub fn resolve_item_predicates(&self, profile: &NamedNode, class: &NamedNode) -> Result<ItemPredicates> {
        self.item_cache
            .get_or_try_insert_with((profile.clone(), class.clone()), || {
                self.lookup_item_predicates(profile, class)
            })
    }

    fn lookup_listing_predicates(&self, profile: &NamedNode, class: &NamedNode) -> Result<ListingPredicates> {
        let shapes = self.shapes_for(profile, class)?;
        if shapes.is_empty() {
            debug!(profile = %profile, class = %class, "no shapes for listing");
            return Ok(ListingPredicates::default());
        }
        Ok(ListingPredicates {
            inbound_children: self.iri_objects(&shapes, vocab::INBOUND_CHILDREN)?,
            inbound_parents: self.iri_objects(&shapes, vocab::INBOUND_PARENTS)?,
            outbound_children: self.iri_objects(&shapes, vocab::OUTBOUND_CHILDREN)?,
            outbound_parents: self.iri_objects(&shapes, vocab::OUTBOUND_PARENTS)?,
        })
    }

    fn lookup_item_predicates(&self, profile: &NamedNode, class: &NamedNode) -> Result<ItemPredicates> {
        let mut predicates = ItemPredicates::with_depth(self.bnode_depth(profile)?);
        let shapes = self.shapes_for(profile, class)?;
        if shapes.is_empty() {
            debug!(profile = %profile, class = %class, "no shapes for item");
            return Ok(predicates);
        }

        // Path declarations live on the targeted shapes and on their property shapes
        let mut nodes = shapes.clone();
        for property in self.graph.triples_matching(Some(&shapes), vocab::SH_PROPERTY, None)? {
            if !nodes.contains(&property.object) {
                nodes.push(property.object);
            }
        }
        let (hidden, visible): (Vec<Term>, Vec<Term>) = {
            let mut hidden = Vec::new();
            let mut visible = Vec::new();
            for node in nodes {
                if self.is_hidden(&node)? {
                    hidden.push(node);
                } else {
                    visible.push(node);
                }
            }
            (hidden, visible)
        };

        predicates.include = self.iri_objects(&visible, vocab::SH_PATH)?;
        predicates.exclude = self.iri_objects(&hidden, vocab::SH_PATH)?;
        predicates.inverse = self.iri_objects(&visible, vocab::SH_INVERSE_PATH)?;
        predicates.sequence = self.sequence_chains(&visible)?;
        Ok(predicates)
    }

    /// Shapes of `profile` that target `class`
    fn shapes_for(&self, profile: &NamedNode, class: &NamedNode) -> Result<Vec<Term>> {
        let profile = [Term::NamedNode(profile.clone())];
        let declared: Vec<Term> = self
            .graph
            .triples_matching(Some(&profile), vocab::HAS_NODE_SHAPE, None)?
            .into_iter()
            .map(|t| t.object)
            .collect();
        if declared.is_empty() {
            return Ok(Vec::new());
        }
        let class = Term::NamedNode(class.clone());
        let mut shapes: Vec<Term> = Vec::new();
        for triple in self
            .graph
            .triples_matching(Some(&declared), vocab::SH_TARGET_CLASS, Some(&class))?
        {
            let shape = Term::from(triple.subject);
            if !shapes.contains(&shape) {
                shapes.push(shape);
            }
        }
        Ok(shapes)
    }

    fn is_hidden(&self, node: &Term) -> Result<bool> {
        let hidden = Term::Literal(Literal::from(true));
        Ok(!self
            .graph
            .triples_matching(Some(std::slice::from_ref(node)), vocab::DASH_HIDDEN, Some(&hidden))?
            .is_empty())
    }

    /// IRI objects of `predicate` on `nodes`; anything else is skipped
    fn iri_objects(&self, nodes: &[Term], predicate: NamedNodeRef<'_>) -> Result<BTreeSet<NamedNode>> {
        if nodes.is_empty() {
            return Ok(BTreeSet::new());
        }
        let mut found = BTreeSet::new();
        for triple in self.graph.triples_matching(Some(nodes), predicate, None)? {
            match triple.object {
                Term::NamedNode(node) => {
                    found.insert(node);
                }
                other => warn!(predicate = %predicate, value = %other, "skipping non-IRI profile annotation"),
            }
        }
        Ok(found)
    }

    /// Declared `sh:sequencePath` chains. Chain order is preserved; the set of
    /// chains is sorted so storage order never leaks into the query.
    fn sequence_chains(&self, nodes: &[Term]) -> Result<Vec<Vec<NamedNode>>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let mut chains = Vec::new();
        'heads: for head in self.graph.triples_matching(Some(nodes), vocab::SH_SEQUENCE_PATH, None)? {
            let mut chain = Vec::new();
            for item in self.graph.list_items(&head.object)? {
                match item {
                    Term::NamedNode(node) => chain.push(node),
                    other => {
                        warn!(value = %other, "skipping sequence path with non-IRI step");
                        continue 'heads;
                    }
                }
            }
            if !chain.is_empty() && !chains.contains(&chain) {
                chains.push(chain);
            }
        }
        chains.sort();
        Ok(chains)
    }

    fn bnode_depth(&self, profile: &NamedNode) -> Result<u32> {
        let profile = [Term::NamedNode(profile.clone())];
        let declared = self
            .graph
            .triples_matching(Some(&profile), vocab::HAS_BNODE_DEPTH, None)?;
        for triple in declared {
            if let Term::Literal(literal) = &triple.object {
                if let Ok(depth) = literal.value().trim().parse::<u32>() {
                    return Ok(depth);
                }
            }
            warn!(value = %triple.object, "unparseable blank node depth, using default");
        }
        Ok(self.default_bnode_depth)
    }
}
