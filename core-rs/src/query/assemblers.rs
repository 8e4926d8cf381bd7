/**
 * assemblers.rs
 * Complete query shapes: item, listing, count, profile negotiation,
 * annotations and stored counts
 */

use oxigraph::model::{Graph, NamedNode, Term as RdfTerm, TermRef};
use std::collections::BTreeSet;

use super::ast::{
    ConstructQuery, Expression, GroupPattern, Literal, OrderCondition, PatternElement,
    PropertyPath, Projection, Query, SelectQuery, SolutionModifier, Term, TriplePattern, Values,
    Var,
};
use super::fragments::{
    bnode_construct, bnode_where, exclude_filter, identified_by, inbound_predicates, label_path,
    language_filter, link_bind, outbound_predicates, sequence_patterns, values_clause, ITEM, LABEL,
};
use super::{QueryResult, SparqlQuery};
use crate::errors::{PrezError, Result};
use crate::model::{ItemDescriptor, ItemPredicates, ListingPredicates, Pagination};
use crate::profiles::ProfileGraph;
use crate::vocab;

pub(crate) fn paginate(pagination: &Pagination) -> SolutionModifier {
    match pagination.window() {
        Some((limit, offset)) => SolutionModifier {
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        },
        None => SolutionModifier::default(),
    }
}

// =============================================================================
// Item
// =============================================================================

/// CONSTRUCT for a single item under a profile.
///
/// Direct triples are restricted to the declared includes (all outbound
/// predicates when the profile declares none) minus exclusions; inverse
/// triples and sequence chains come from their own branches; every direct
/// object is expanded into blank-node structure up to the profile's depth.
pub fn item_construct(item: &ItemDescriptor, predicates: &ItemPredicates) -> Result<SparqlQuery> {
    item.require_identity()?;

    let focus_var = Var::new("focus");
    let mut pattern = GroupPattern::new();
    let focus: Term = match item.uri() {
        Some(uri) => Term::Iri(uri.clone()),
        None => {
            if let Some(id) = item.id() {
                pattern.extend(identified_by(&focus_var, id, item.selected_class()));
            }
            Term::Var(focus_var)
        }
    };

    let p = Var::new("p1");
    let o = Var::new("o1");
    let mut template = vec![TriplePattern::new(focus.clone(), &p, &o)];
    template.extend(bnode_construct(predicates.bnode_depth));

    let mut direct = GroupPattern::new();
    direct.triple(focus.clone(), &p, &o);
    if !predicates.include.is_empty() {
        direct.push(values_clause(&p, &predicates.include));
    }
    if let Some(filter) = exclude_filter(&p, &predicates.exclude) {
        direct.push(filter);
    }
    if let Some(expansion) = bnode_where(predicates.bnode_depth) {
        direct.push(expansion);
    }
    let mut branches = vec![direct];

    if !predicates.inverse.is_empty() {
        let s = Var::new("inbound_s");
        let inbound = Var::new("inbound_p");
        let edge = TriplePattern::new(&s, &inbound, focus.clone());
        template.push(edge.clone());
        let mut group = GroupPattern::new();
        group
            .push(PatternElement::Triple(edge))
            .push(values_clause(&inbound, &predicates.inverse));
        branches.push(group);
    }

    for chain in sequence_patterns(&focus, &predicates.sequence) {
        template.extend(chain.iter().cloned());
        let mut group = GroupPattern::new();
        for triple in chain {
            group.push(PatternElement::Triple(triple));
        }
        branches.push(group);
    }

    pattern.union(branches);
    Ok(SparqlQuery::from_ast(&Query::Construct(ConstructQuery {
        template,
        pattern,
        modifier: SolutionModifier::default(),
    })))
}

// =============================================================================
// Listing
// =============================================================================

/// CONSTRUCT for a listing page.
///
/// With a parent URI the members are found through the profile's listing
/// relations; returns the empty sentinel when the profile declares none.
/// Without a parent URI every instance of the general class becomes a member
/// of `prez:memberList`.
pub fn listing_construct(
    parent: &ItemDescriptor,
    predicates: &ListingPredicates,
    pagination: &Pagination,
    languages: &[String],
) -> Result<SparqlQuery> {
    let item = Var::new(ITEM);
    let label = Var::new(LABEL);
    let mut template = Vec::new();
    let mut pattern = GroupPattern::new();

    match parent.uri() {
        Some(uri) => {
            if predicates.is_empty() {
                return Ok(SparqlQuery::empty());
            }
            let link = parent.link_constructor();
            let mut branches = outbound_predicates(
                uri,
                link,
                &predicates.outbound_children,
                &predicates.outbound_parents,
            );
            branches.extend(inbound_predicates(
                uri,
                link,
                &predicates.inbound_children,
                &predicates.inbound_parents,
            ));
            let mut groups = Vec::with_capacity(branches.len());
            for branch in branches {
                template.extend(branch.template);
                groups.push(branch.pattern);
            }
            pattern.union(groups);
        }
        None => {
            let member_list = Term::from(vocab::PREZ_MEMBER_LIST);
            let id = Var::new("outbound_general_id");
            let link = Var::new("outbound_general_link");
            template.push(TriplePattern::new(member_list.clone(), vocab::RDF_TYPE, vocab::RDF_BAG));
            template.push(TriplePattern::new(member_list, vocab::RDFS_MEMBER, &item));
            template.push(TriplePattern::new(&item, vocab::PREZ_LINK, &link));
            pattern
                .triple(&item, vocab::RDF_TYPE, parent.general_class())
                .triple(&item, vocab::DCTERMS_IDENTIFIER, &id)
                .push(link_bind(parent.link_constructor(), &id, &link, true));
        }
    }

    template.push(TriplePattern::new(&item, vocab::RDFS_LABEL, &label));
    let mut labels = GroupPattern::new();
    labels.triple(&item, label_path(), &label);
    if let Some(filter) = language_filter(&label, languages)? {
        labels.push(filter);
    }
    pattern.optional(labels);

    Ok(SparqlQuery::from_ast(&Query::Construct(ConstructQuery {
        template,
        pattern,
        modifier: paginate(pagination),
    })))
}

// =============================================================================
// Counts
// =============================================================================

/// `prez:count` for the members of an item, or for all instances of its
/// general class when it has no URI
pub fn listing_count_construct(item: &ItemDescriptor) -> SparqlQuery {
    let member = Var::new(ITEM);
    let count = Var::new("count");
    let mut inner = GroupPattern::new();
    let subject = match item.uri() {
        Some(uri) => {
            inner.triple(uri, vocab::RDFS_MEMBER, &member);
            uri.clone()
        }
        None => {
            inner.triple(&member, vocab::RDF_TYPE, item.general_class());
            item.general_class().clone()
        }
    };
    let mut pattern = GroupPattern::new();
    pattern.push(PatternElement::SubSelect(Box::new(SelectQuery {
        distinct: false,
        projection: vec![Projection::Expression(Expression::count(&member), count.clone())],
        pattern: inner,
        modifier: SolutionModifier::default(),
    })));
    SparqlQuery::from_ast(&Query::Construct(ConstructQuery {
        template: vec![TriplePattern::new(subject, vocab::PREZ_COUNT, &count)],
        pattern,
        modifier: SolutionModifier::default(),
    }))
}

/// Counts already materialised in the store
pub fn stored_counts() -> SparqlQuery {
    let class = Var::new("class");
    let count = Var::new("count");
    let triple = TriplePattern::new(&class, vocab::PREZ_COUNT, &count);
    let mut pattern = GroupPattern::new();
    pattern.push(PatternElement::Triple(triple.clone()));
    SparqlQuery::from_ast(&Query::Construct(ConstructQuery {
        template: vec![triple],
        pattern,
        modifier: SolutionModifier::default(),
    }))
}

// =============================================================================
// Profile / mediatype negotiation
// =============================================================================

/// SELECT picking one (profile, format) for the candidate classes.
///
/// Ranking: requested profile, then subclass distance from the general
/// class (most specific class wins), then default profile, then requested
/// format weight, then default format.
pub fn select_profile_mediatype(
    classes: &[NamedNode],
    requested_profile: Option<&NamedNode>,
    requested_mediatypes: &[(f64, String)],
    general_classes: &[NamedNode],
) -> Result<SparqlQuery> {
    if classes.is_empty() {
        return Err(PrezError::InvalidInput("no candidate classes to negotiate over".to_string()));
    }
    let profile = Var::new("profile");
    let class = Var::new("class");
    let mid = Var::new("mid");
    let general = Var::new("general_class");
    let distance = Var::new("distance");
    let req_profile = Var::new("req_profile");
    let def_profile = Var::new("def_profile");
    let format = Var::new("format");
    let req_format = Var::new("req_format");
    let def_format = Var::new("def_format");
    let shape = Var::new("shape");

    let classes: BTreeSet<NamedNode> = classes.iter().cloned().collect();
    let generals: BTreeSet<NamedNode> = general_classes.iter().cloned().collect();

    let mut pattern = GroupPattern::new();
    pattern
        .push(values_clause(&class, &classes))
        .triple(&class, PropertyPath::zero_or_more(vocab::RDFS_SUB_CLASS_OF), &mid)
        .triple(&mid, PropertyPath::zero_or_more(vocab::RDFS_SUB_CLASS_OF), &general)
        .push(values_clause(&general, &generals))
        .triple(&profile, vocab::CONSTRAINS_CLASS, &class)
        .triple(&profile, vocab::HAS_RESOURCE_FORMAT, &format);

    if let Some(requested) = requested_profile {
        pattern.bind(Expression::equal(Expression::var(&profile), requested.into()), &req_profile);
    }

    let mut default_profile = GroupPattern::new();
    default_profile
        .triple(&shape, vocab::SH_TARGET_CLASS, &class)
        .triple(&shape, vocab::HAS_DEFAULT_PROFILE, &profile);
    pattern.bind(Expression::Exists(default_profile), &def_profile);

    if !requested_mediatypes.is_empty() {
        let mut seen = BTreeSet::new();
        let mut rows = Vec::new();
        for (weight, mediatype) in requested_mediatypes {
            if seen.insert(mediatype.as_str()) {
                rows.push(vec![
                    Term::Literal(Literal::simple(mediatype.as_str())),
                    Term::Literal(Literal::decimal(*weight)?),
                ]);
            }
        }
        let mut weights = GroupPattern::new();
        weights.values(Values {
            vars: vec![format.clone(), req_format.clone()],
            rows,
        });
        pattern.optional(weights);
    }

    let mut default_format = GroupPattern::new();
    default_format.triple(&profile, vocab::HAS_DEFAULT_RESOURCE_FORMAT, &format);
    pattern.bind(Expression::Exists(default_format), &def_format);

    let select = SelectQuery {
        distinct: false,
        projection: vec![
            Projection::Var(profile.clone()),
            Projection::Var(class.clone()),
            Projection::Expression(Expression::count(&mid), distance.clone()),
            Projection::Var(req_profile.clone()),
            Projection::Var(def_profile.clone()),
            Projection::Var(format.clone()),
            Projection::Var(req_format.clone()),
            Projection::Var(def_format.clone()),
        ],
        pattern,
        modifier: SolutionModifier {
            group_by: vec![
                class,
                profile,
                req_profile.clone(),
                def_profile.clone(),
                format,
                req_format.clone(),
                def_format.clone(),
            ],
            order_by: vec![
                OrderCondition::desc(&req_profile),
                OrderCondition::desc(&distance),
                OrderCondition::desc(&def_profile),
                OrderCondition::desc(&req_format),
                OrderCondition::desc(&def_format),
            ],
            limit: Some(1),
            offset: None,
        },
    };
    Ok(SparqlQuery::from_ast(&Query::Select(select)))
}

/// The row chosen by [`select_profile_mediatype`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedProfile {
    pub profile: NamedNode,
    pub class: NamedNode,
    pub mediatype: String,
}

impl NegotiatedProfile {
    /// `None` when no profile constrains any candidate class
    pub fn from_rows(rows: &[QueryResult]) -> Result<Option<Self>> {
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let field = |name: &str| {
            row.get(name)
                .ok_or_else(|| PrezError::InvalidInput(format!("negotiation row lacks ?{}", name)))
        };
        Ok(Some(Self {
            profile: NamedNode::new(field("profile")?.as_str())?,
            class: NamedNode::new(field("class")?.as_str())?,
            mediatype: field("format")?.clone(),
        }))
    }
}

// =============================================================================
// Annotations
// =============================================================================

/// IRIs used as predicates or objects in `graph`
pub fn annotation_terms(graph: &Graph) -> BTreeSet<NamedNode> {
    let mut terms = BTreeSet::new();
    for triple in graph.iter() {
        terms.insert(triple.predicate.into_owned());
        if let TermRef::NamedNode(node) = triple.object {
            terms.insert(node.into_owned());
        }
    }
    terms
}

/// Labels, descriptions and provenance already held in `tbox`, plus the
/// terms it knows nothing about
pub fn cached_annotations(
    tbox: &dyn ProfileGraph,
    terms: &BTreeSet<NamedNode>,
) -> Result<(BTreeSet<NamedNode>, Graph)> {
    let subjects: Vec<RdfTerm> = terms.iter().cloned().map(RdfTerm::NamedNode).collect();
    let mut found = Graph::new();
    let mut annotated = BTreeSet::new();
    for predicate in [vocab::RDFS_LABEL, vocab::DCTERMS_DESCRIPTION, vocab::DCTERMS_PROVENANCE] {
        for triple in tbox.triples_matching(Some(&subjects), predicate, None)? {
            if let RdfTerm::NamedNode(node) = RdfTerm::from(triple.subject.clone()) {
                annotated.insert(node);
            }
            found.insert(&triple);
        }
    }
    let uncached = terms.difference(&annotated).cloned().collect();
    Ok((uncached, found))
}

/// Label CONSTRUCT for terms the local annotation graph could not answer.
/// No terms gives the empty sentinel.
pub fn annotations_construct(
    terms: &BTreeSet<NamedNode>,
    label_predicate: &NamedNode,
    languages: &[String],
) -> Result<SparqlQuery> {
    if terms.is_empty() {
        return Ok(SparqlQuery::empty());
    }
    let term = Var::new("term");
    let label = Var::new(LABEL);
    let mut pattern = GroupPattern::new();
    pattern
        .triple(&term, label_predicate, &label)
        .push(values_clause(&term, terms));
    if let Some(filter) = language_filter(&label, languages)? {
        pattern.push(filter);
    }
    Ok(SparqlQuery::from_ast(&Query::Construct(ConstructQuery {
        template: vec![TriplePattern::new(&term, label_predicate, &label)],
        pattern,
        modifier: SolutionModifier::default(),
    })))
}
