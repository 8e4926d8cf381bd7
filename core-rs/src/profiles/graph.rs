/**
 * graph.rs
 * Queryable view over the profiles graph
 */

use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNodeRef, SubjectRef, Term, Triple};
use oxigraph::store::Store;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::{PrezError, Result};
use crate::vocab;

/// The two lookups query synthesis needs from the profiles graph.
pub trait ProfileGraph: Send + Sync {
    /// Triples with `predicate`, whose subject is one of `subjects` (any
    /// subject when `None`) and whose object is `object` when given.
    fn triples_matching(
        &self,
        subjects: Option<&[Term]>,
        predicate: NamedNodeRef<'_>,
        object: Option<&Term>,
    ) -> Result<Vec<Triple>>;

    /// Members of the RDF list starting at `head`, in list order.
    fn list_items(&self, head: &Term) -> Result<Vec<Term>>;
}

/// Subject position view of a term; literals cannot be subjects
pub(crate) fn as_subject(term: &Term) -> Option<SubjectRef<'_>> {
    match term {
        Term::NamedNode(node) => Some(node.as_ref().into()),
        Term::BlankNode(node) => Some(node.as_ref().into()),
        _ => None,
    }
}

/// In-memory oxigraph store holding profile and shape definitions.
pub struct OxigraphProfileGraph {
    store: Store,
}

impl OxigraphProfileGraph {
    pub fn new() -> Result<Self> {
        Ok(Self { store: Store::new()? })
    }

    pub fn from_turtle(data: &str) -> Result<Self> {
        let graph = Self::new()?;
        graph.load_turtle(data)?;
        Ok(graph)
    }

    /// Load every Turtle file given, in order
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let graph = Self::new()?;
        for path in paths {
            graph.load_file(path.as_ref())?;
        }
        Ok(graph)
    }

    pub fn load_turtle(&self, data: &str) -> Result<()> {
        self.store
            .load_from_reader(RdfFormat::Turtle, data.as_bytes())
            .map_err(|e| PrezError::ProfileGraph(e.to_string()))
    }

    pub fn load_file(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(PrezError::ProfileGraph(format!("not a file: {}", path.display())));
        }
        let content = fs::read_to_string(path)?;
        self.load_turtle(&content)?;
        info!(path = %path.display(), triples = self.len(), "loaded profiles");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching_subject(
        &self,
        subject: Option<SubjectRef<'_>>,
        predicate: NamedNodeRef<'_>,
        object: Option<&Term>,
        out: &mut Vec<Triple>,
    ) -> Result<()> {
        for quad in self
            .store
            .quads_for_pattern(subject, Some(predicate), object.map(Term::as_ref), None)
        {
            let quad = quad?;
            out.push(Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(())
    }
}

impl ProfileGraph for OxigraphProfileGraph {
    fn triples_matching(
        &self,
        subjects: Option<&[Term]>,
        predicate: NamedNodeRef<'_>,
        object: Option<&Term>,
    ) -> Result<Vec<Triple>> {
        let mut out = Vec::new();
        match subjects {
            None => self.matching_subject(None, predicate, object, &mut out)?,
            Some(subjects) => {
                for subject in subjects.iter().filter_map(as_subject) {
                    self.matching_subject(Some(subject), predicate, object, &mut out)?;
                }
            }
        }
        Ok(out)
    }

    fn list_items(&self, head: &Term) -> Result<Vec<Term>> {
        let nil = Term::NamedNode(vocab::RDF_NIL.into_owned());
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut node = head.clone();
        while node != nil {
            if !seen.insert(node.clone()) {
                warn!(head = %head, "cyclic RDF list, truncating");
                break;
            }
            let current = [node.clone()];
            let first = self.triples_matching(Some(&current), vocab::RDF_FIRST, None)?;
            let Some(item) = first.into_iter().next() else {
                warn!(head = %head, node = %node, "RDF list node without rdf:first");
                break;
            };
            items.push(item.object);
            let rest = self.triples_matching(Some(&current), vocab::RDF_REST, None)?;
            match rest.into_iter().next() {
                Some(next) => node = next.object,
                None => break,
            }
        }
        Ok(items)
    }
}
