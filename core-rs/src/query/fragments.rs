/**
 * fragments.rs
 * Reusable pattern fragments shared by the query assemblers
 */

use oxigraph::model::NamedNode;
use std::collections::BTreeSet;

use super::ast::{
    validate_language_tag, Expression, Function, GroupPattern, Literal, PatternElement,
    PropertyPath, Term, TriplePattern, Values, Var,
};
use crate::errors::Result;
use crate::vocab;

pub const ITEM: &str = "item";
pub const LABEL: &str = "label";

/// Explicit enumeration of the allowed predicates. Never a wildcard; an empty
/// set renders `VALUES ?var {}` which matches nothing.
pub fn values_clause(var: &Var, predicates: &BTreeSet<NamedNode>) -> PatternElement {
    PatternElement::Values(Values {
        vars: vec![var.clone()],
        rows: predicates.iter().map(|p| vec![Term::Iri(p.clone())]).collect(),
    })
}

/// `FILTER(DATATYPE(?id) = xsd:token)`
pub fn token_filter(id: &Var) -> PatternElement {
    PatternElement::Filter(Expression::equal(
        Expression::call(Function::Datatype, vec![Expression::var(id)]),
        vocab::XSD_TOKEN.into(),
    ))
}

/// `?focus dcterms:identifier "id"^^xsd:token ; a <class>`
pub fn identified_by(focus: &Var, id: &str, class: &NamedNode) -> GroupPattern {
    let mut pattern = GroupPattern::new();
    pattern
        .triple(focus, vocab::DCTERMS_IDENTIFIER, Literal::typed(id, vocab::XSD_TOKEN))
        .triple(focus, vocab::RDF_TYPE, class);
    pattern
}

/// `rdfs:label|dcterms:title|skos:prefLabel`
pub fn label_path() -> PropertyPath {
    PropertyPath::alternative([vocab::RDFS_LABEL, vocab::DCTERMS_TITLE, vocab::SKOS_PREF_LABEL])
}

/// Direction of a listing relation relative to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    OutboundChildren,
    OutboundParents,
    InboundChildren,
    InboundParents,
}

impl Relation {
    pub fn name(self) -> &'static str {
        match self {
            Relation::OutboundChildren => "outbound_children",
            Relation::OutboundParents => "outbound_parents",
            Relation::InboundChildren => "inbound_children",
            Relation::InboundParents => "inbound_parents",
        }
    }

    fn is_inbound(self) -> bool {
        matches!(self, Relation::InboundChildren | Relation::InboundParents)
    }

    fn is_child(self) -> bool {
        matches!(self, Relation::OutboundChildren | Relation::InboundChildren)
    }
}

/// CONSTRUCT template and WHERE branch for one listing relation
#[derive(Debug, Clone, PartialEq)]
pub struct ListingBranch {
    pub template: Vec<TriplePattern>,
    pub pattern: GroupPattern,
}

/// Child links point at `link/<id>`, parent links at `link` itself.
pub fn link_bind(link: &str, id: &Var, target: &Var, append_id: bool) -> PatternElement {
    let expression = if append_id {
        Expression::call(
            Function::Concat,
            vec![
                Literal::simple(link).into(),
                Literal::simple("/").into(),
                Expression::str(Expression::var(id)),
            ],
        )
    } else {
        Literal::simple(link).into()
    };
    PatternElement::Bind(expression, target.clone())
}

fn relation_branch(
    parent: &NamedNode,
    link: &str,
    relation: Relation,
    predicates: &BTreeSet<NamedNode>,
) -> Option<ListingBranch> {
    if predicates.is_empty() {
        return None;
    }
    let item = Var::new(ITEM);
    let predicate = Var::new(relation.name());
    let id = Var::new(format!("{}_id", relation.name()));
    let link_var = Var::new(format!("{}_link", relation.name()));

    let edge = if relation.is_inbound() {
        TriplePattern::new(&item, &predicate, parent)
    } else {
        TriplePattern::new(parent, &predicate, &item)
    };

    let mut pattern = GroupPattern::new();
    pattern
        .push(PatternElement::Triple(edge.clone()))
        .triple(&item, vocab::DCTERMS_IDENTIFIER, &id)
        .push(token_filter(&id))
        .push(values_clause(&predicate, predicates))
        .push(link_bind(link, &id, &link_var, relation.is_child()));

    Some(ListingBranch {
        template: vec![edge, TriplePattern::new(&item, vocab::PREZ_LINK, &link_var)],
        pattern,
    })
}

/// Listing branches for items the parent points at
pub fn outbound_predicates(
    parent: &NamedNode,
    link: &str,
    children: &BTreeSet<NamedNode>,
    parents: &BTreeSet<NamedNode>,
) -> Vec<ListingBranch> {
    [
        relation_branch(parent, link, Relation::OutboundChildren, children),
        relation_branch(parent, link, Relation::OutboundParents, parents),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Listing branches for items pointing at the parent
pub fn inbound_predicates(
    parent: &NamedNode,
    link: &str,
    children: &BTreeSet<NamedNode>,
    parents: &BTreeSet<NamedNode>,
) -> Vec<ListingBranch> {
    [
        relation_branch(parent, link, Relation::InboundChildren, children),
        relation_branch(parent, link, Relation::InboundParents, parents),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn object_var(level: u32) -> Var {
    Var::new(format!("o{}", level))
}

fn predicate_var(level: u32) -> Var {
    Var::new(format!("p{}", level))
}

/// `?o_i ?p_(i+1) ?o_(i+1)` for i in 1..=depth
pub fn bnode_construct(depth: u32) -> Vec<TriplePattern> {
    (1..=depth)
        .map(|i| TriplePattern::new(object_var(i), predicate_var(i + 1), object_var(i + 1)))
        .collect()
}

/// `depth` nested OPTIONAL blocks, each descending only into blank nodes.
/// Depth 0 yields nothing.
pub fn bnode_where(depth: u32) -> Option<PatternElement> {
    let mut inner: Option<PatternElement> = None;
    for i in (1..=depth).rev() {
        let mut group = GroupPattern::new();
        group
            .filter(Expression::call(Function::IsBlank, vec![Expression::var(&object_var(i))]))
            .triple(object_var(i), predicate_var(i + 1), object_var(i + 1));
        if let Some(nested) = inner.take() {
            group.push(nested);
        }
        inner = Some(PatternElement::Optional(group));
    }
    inner
}

/// One triple list per chain; chain `k` of length `n` walks from `focus`
/// through `?seq{k}_o1 .. ?seq{k}_o{n-1}` to `?seq{k}_o{n}`.
pub fn sequence_patterns(focus: &Term, chains: &[Vec<NamedNode>]) -> Vec<Vec<TriplePattern>> {
    chains
        .iter()
        .enumerate()
        .filter(|(_, chain)| !chain.is_empty())
        .map(|(k, chain)| {
            chain
                .iter()
                .enumerate()
                .map(|(i, predicate)| {
                    let subject = if i == 0 {
                        focus.clone()
                    } else {
                        Term::Var(Var::new(format!("seq{}_o{}", k, i)))
                    };
                    let object = Var::new(format!("seq{}_o{}", k, i + 1));
                    TriplePattern::new(subject, predicate, object)
                })
                .collect()
        })
        .collect()
}

/// `FILTER(LANG(?v) = "" || LANG(?v) = "en" ...)`; no languages means no filter
pub fn language_filter(var: &Var, languages: &[String]) -> Result<Option<PatternElement>> {
    if languages.is_empty() {
        return Ok(None);
    }
    let lang = || Expression::call(Function::Lang, vec![Expression::var(var)]);
    let mut alternatives = vec![Expression::equal(lang(), Literal::simple("").into())];
    for language in languages {
        validate_language_tag(language)?;
        alternatives.push(Expression::equal(lang(), Literal::simple(language.as_str()).into()));
    }
    Ok(Some(PatternElement::Filter(Expression::Or(alternatives))))
}

/// Drops rows whose predicate is one of `predicates`
pub fn exclude_filter(var: &Var, predicates: &BTreeSet<NamedNode>) -> Option<PatternElement> {
    let mut conditions: Vec<Expression> = predicates
        .iter()
        .map(|p| Expression::not_equal(Expression::var(var), p.into()))
        .collect();
    match conditions.len() {
        0 => None,
        1 => conditions.pop().map(PatternElement::Filter),
        _ => Some(PatternElement::Filter(Expression::And(conditions))),
    }
}
