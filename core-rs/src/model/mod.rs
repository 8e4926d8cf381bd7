//! Request-side data model: the item being served, the predicates a profile
//! authorizes for it, and the pagination window.

use oxigraph::model::NamedNode;
use std::collections::BTreeSet;

use crate::errors::{PrezError, Result};

/// The resource a request targets.
///
/// Built once per request and never mutated; it keys the item-query cache so
/// it is `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemDescriptor {
    id: Option<String>,
    uri: Option<NamedNode>,
    selected_class: NamedNode,
    general_class: NamedNode,
    link_constructor: String,
    ancestors: Vec<(String, NamedNode)>,
}

impl ItemDescriptor {
    pub fn builder(selected_class: NamedNode, general_class: NamedNode) -> ItemDescriptorBuilder {
        ItemDescriptorBuilder {
            item: ItemDescriptor {
                id: None,
                uri: None,
                selected_class,
                general_class,
                link_constructor: String::new(),
                ancestors: Vec::new(),
            },
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn uri(&self) -> Option<&NamedNode> {
        self.uri.as_ref()
    }

    pub fn selected_class(&self) -> &NamedNode {
        &self.selected_class
    }

    pub fn general_class(&self) -> &NamedNode {
        &self.general_class
    }

    pub fn link_constructor(&self) -> &str {
        &self.link_constructor
    }

    pub fn ancestors(&self) -> &[(String, NamedNode)] {
        &self.ancestors
    }

    pub fn ancestor(&self, role: &str) -> Option<&NamedNode> {
        self.ancestors
            .iter()
            .find(|(name, _)| name == role)
            .map(|(_, uri)| uri)
    }

    /// Fails when the item can be located by neither identifier nor URI
    pub fn require_identity(&self) -> Result<()> {
        if self.id.is_none() && self.uri.is_none() {
            return Err(PrezError::InvalidInput(
                "either an id or a URI is required to locate the item".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ItemDescriptorBuilder {
    item: ItemDescriptor,
}

impl ItemDescriptorBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.item.id = Some(id.into());
        self
    }

    pub fn uri(mut self, uri: NamedNode) -> Self {
        self.item.uri = Some(uri);
        self
    }

    pub fn link_constructor(mut self, link: impl Into<String>) -> Self {
        self.item.link_constructor = link.into();
        self
    }

    pub fn ancestor(mut self, role: impl Into<String>, uri: NamedNode) -> Self {
        self.item.ancestors.push((role.into(), uri));
        self
    }

    pub fn build(self) -> ItemDescriptor {
        self.item
    }
}

/// Relations a profile exposes on a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPredicates {
    pub inbound_children: BTreeSet<NamedNode>,
    pub inbound_parents: BTreeSet<NamedNode>,
    pub outbound_children: BTreeSet<NamedNode>,
    pub outbound_parents: BTreeSet<NamedNode>,
}

impl ListingPredicates {
    pub fn is_empty(&self) -> bool {
        self.inbound_children.is_empty()
            && self.inbound_parents.is_empty()
            && self.outbound_children.is_empty()
            && self.outbound_parents.is_empty()
    }
}

/// Predicates a profile exposes on a single item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPredicates {
    pub include: BTreeSet<NamedNode>,
    pub exclude: BTreeSet<NamedNode>,
    pub inverse: BTreeSet<NamedNode>,
    /// Chains keep their declared order
    pub sequence: Vec<Vec<NamedNode>>,
    pub bnode_depth: u32,
}

impl ItemPredicates {
    pub fn with_depth(bnode_depth: u32) -> Self {
        Self {
            include: BTreeSet::new(),
            exclude: BTreeSet::new(),
            inverse: BTreeSet::new(),
            sequence: Vec::new(),
            bnode_depth,
        }
    }
}

/// Page window. Both parts must be present for LIMIT/OFFSET to be emitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pagination {
    page: Option<u32>,
    per_page: Option<u32>,
}

impl Pagination {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Result<Self> {
        if page == Some(0) {
            return Err(PrezError::InvalidInput("page numbers start at 1".to_string()));
        }
        if per_page == Some(0) {
            return Err(PrezError::InvalidInput("per_page must be at least 1".to_string()));
        }
        Ok(Self { page, per_page })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `(limit, offset)` when both page and per_page are known
    pub fn window(&self) -> Option<(u64, u64)> {
        match (self.page, self.per_page) {
            (Some(page), Some(per_page)) => {
                let per_page = u64::from(per_page);
                Some((per_page, (u64::from(page) - 1) * per_page))
            }
            _ => None,
        }
    }
}
