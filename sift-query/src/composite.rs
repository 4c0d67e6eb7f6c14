//! Composite nodes: AND / OR over child specifications.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

use crate::context::{QueryId, QueryRoot};
use crate::error::SpecResult;
use crate::predicate::Predicate;
use crate::specification::Specification;

/// AND over child specifications.
///
/// Children whose role is a pure side effect (join registrations) are kept
/// in their own ordered list and never contribute a predicate. They run
/// exactly once per [`QueryId`], in declared order, before any regular
/// child is asked for its predicate — the same tree is built once for the
/// data query and once for the count query, and join state must exist for
/// each pass without being duplicated within it.
#[derive(Debug)]
pub struct Conjunction {
    fakes: Vec<Specification>,
    specs: Vec<Specification>,
    initialized: Mutex<HashSet<QueryId>>,
}

impl Conjunction {
    /// Create a conjunction; effectful-only children are split out in
    /// declaration order.
    pub fn new(children: Vec<Specification>) -> Self {
        let (fakes, specs) = children.into_iter().partition(Specification::is_fake);
        Self {
            fakes,
            specs,
            initialized: Mutex::new(HashSet::new()),
        }
    }

    /// All children, fakes first, each group in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &Specification> {
        self.fakes.iter().chain(self.specs.iter())
    }

    /// Run every fake child's side effect once for `query`.
    ///
    /// Nested conjunctions initialize their own fakes as part of the same
    /// pass, so join state exists before any sibling leaf resolves a path
    /// through it.
    fn initialize_fakes(&self, root: &QueryRoot, query: QueryId) -> SpecResult<()> {
        if self.initialized.lock().contains(&query) {
            return Ok(());
        }
        for fake in &self.fakes {
            fake.to_predicate(root, query)?;
        }
        for child in &self.specs {
            if let Specification::Conjunction(inner) = child {
                inner.initialize_fakes(root, query)?;
            }
        }
        self.initialized.lock().insert(query);
        Ok(())
    }

    /// Build the AND of the children's predicates.
    pub fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        self.initialize_fakes(root, query)?;
        let mut predicates = Vec::with_capacity(self.specs.len());
        for child in &self.specs {
            if let Some(p) = child.to_predicate(root, query)? {
                predicates.push(p);
            }
        }
        Ok(Some(Predicate::and(predicates)))
    }
}

impl Clone for Conjunction {
    fn clone(&self) -> Self {
        // a cloned node is a new node; it has initialized nothing yet
        Self {
            fakes: self.fakes.clone(),
            specs: self.specs.clone(),
            initialized: Mutex::new(HashSet::new()),
        }
    }
}

impl PartialEq for Conjunction {
    fn eq(&self, other: &Self) -> bool {
        multiset_eq(&self.fakes, &other.fakes) && multiset_eq(&self.specs, &other.specs)
    }
}

impl Eq for Conjunction {}

impl Hash for Conjunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.fakes.len());
        state.write_usize(self.specs.len());
        state.write_u64(unordered_hash(self.children()));
    }
}

/// OR over child specifications.
#[derive(Debug, Clone)]
pub struct Disjunction {
    specs: Vec<Specification>,
}

impl Disjunction {
    /// Create a disjunction.
    ///
    /// # Panics
    ///
    /// Panics when `children` is empty: an OR over nothing matches nothing,
    /// which is never what a declared disjunction means.
    pub fn new(children: Vec<Specification>) -> Self {
        assert!(
            !children.is_empty(),
            "a disjunction requires at least one inner specification"
        );
        Self { specs: children }
    }

    /// The children, in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &Specification> {
        self.specs.iter()
    }

    /// Build the OR of the children's predicates; children yielding no
    /// predicate are omitted.
    pub fn to_predicate(&self, root: &QueryRoot, query: QueryId) -> SpecResult<Option<Predicate>> {
        let mut predicates = Vec::with_capacity(self.specs.len());
        for child in &self.specs {
            if let Some(p) = child.to_predicate(root, query)? {
                predicates.push(p);
            }
        }
        Ok(Some(Predicate::or(predicates)))
    }
}

impl PartialEq for Disjunction {
    fn eq(&self, other: &Self) -> bool {
        multiset_eq(&self.specs, &other.specs)
    }
}

impl Eq for Disjunction {}

impl Hash for Disjunction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.specs.len());
        state.write_u64(unordered_hash(self.specs.iter()));
    }
}

/// Child collections compare as unordered multisets: declaration order
/// matters for side-effect sequencing, not for node identity.
fn multiset_eq(a: &[Specification], b: &[Specification]) -> bool {
    a.len() == b.len()
        && a.iter().all(|x| {
            let count = |side: &[Specification]| side.iter().filter(|y| *y == x).count();
            count(a) == count(b)
        })
}

fn unordered_hash<'a>(children: impl Iterator<Item = &'a Specification>) -> u64 {
    children
        .map(|c| {
            let mut h = std::collections::hash_map::DefaultHasher::new();
            c.hash(&mut h);
            h.finish()
        })
        .fold(0u64, u64::wrapping_add)
}
