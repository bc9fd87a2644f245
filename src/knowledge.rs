use std::fmt;
use std::ops::Add;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::bindings::Bindings;
use crate::error::EngineError;
use crate::realizer::{Answers, Realizer, Search};
use crate::term::Term;
use crate::trace::Tracer;

/// A knowledge base: facts and rules grouped by functor name, plus a
/// set of bare literal assertions.
///
/// Clause order within a predicate group is insertion order, and the
/// search tries candidates in that order (first-declared,
/// first-tried). A knowledge base is immutable once built; renaming
/// produces fresh copies, never in-place edits, so clause trees can be
/// shared across concurrently active search branches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeBase {
    clauses: IndexMap<String, Vec<Rc<Term>>>,
    literals: IndexSet<Term>,
}

impl KnowledgeBase {
    /// Build a knowledge base from a flat clause list.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::MalformedKnowledge`] if any clause is
    /// neither a fact, a rule, nor a literal.
    pub fn new(knowledge: Vec<Term>) -> Result<Self, EngineError> {
        let mut clauses: IndexMap<String, Vec<Rc<Term>>> = IndexMap::new();
        let mut literals = IndexSet::new();
        for clause in knowledge {
            let functor = match &clause {
                Term::Fact { name, .. } | Term::Rule { name, .. } => Some(name.clone()),
                Term::Lit(_) => None,
                Term::Var(_) | Term::Conj(..) | Term::Disj(..) | Term::Host(_) => {
                    return Err(EngineError::MalformedKnowledge(clause));
                }
            };
            match functor {
                Some(name) => clauses.entry(name).or_default().push(Rc::new(clause)),
                None => {
                    literals.insert(clause);
                }
            }
        }
        Ok(Self { clauses, literals })
    }

    /// The number of stored clauses and literals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.values().map(Vec::len).sum::<usize>() + self.literals.len()
    }

    /// Whether the knowledge base holds nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty() && self.literals.is_empty()
    }

    /// Iterate over every stored clause, predicate groups first (in
    /// insertion order), then the bare literals.
    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.clauses
            .values()
            .flatten()
            .map(|clause| &**clause)
            .chain(self.literals.iter())
    }

    /// Merge two knowledge bases: matching predicate groups are
    /// concatenated (clauses are never deduplicated), bare literals
    /// are set-unioned.
    #[must_use]
    pub fn union(&self, other: &KnowledgeBase) -> KnowledgeBase {
        let mut clauses = self.clauses.clone();
        for (name, group) in &other.clauses {
            clauses
                .entry(name.clone())
                .or_default()
                .extend(group.iter().map(Rc::clone));
        }
        let mut literals = self.literals.clone();
        literals.extend(other.literals.iter().cloned());
        KnowledgeBase { clauses, literals }
    }

    /// The candidate clauses for a goal: the group sharing the goal's
    /// functor name, or the literal set for non-functor goals.
    pub(crate) fn candidates(&self, goal: &Term) -> Vec<Rc<Term>> {
        match goal {
            Term::Fact { name, .. } | Term::Rule { name, .. } => {
                self.clauses.get(name).cloned().unwrap_or_default()
            }
            _ => self
                .literals
                .iter()
                .map(|literal| Rc::new(literal.clone()))
                .collect(),
        }
    }

    /// A fresh copy with every clause alpha-renamed against `avoid`,
    /// so clause variables can never capture the caller's.
    pub(crate) fn renamed_avoiding(&self, avoid: &IndexSet<String>) -> KnowledgeBase {
        KnowledgeBase {
            clauses: self
                .clauses
                .iter()
                .map(|(name, group)| {
                    let renamed = group
                        .iter()
                        .map(|clause| Rc::new(clause.renamed_avoiding(avoid)))
                        .collect();
                    (name.clone(), renamed)
                })
                .collect(),
            literals: self.literals.clone(),
        }
    }

    /// Enumerate the bindings that satisfy `query`, lazily.
    ///
    /// The returned stream yields one substitution environment per
    /// solution, restricted to the query's free variables.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidQuery`] if `query` is a bare
    /// variable or a rule.
    pub fn ask(&self, query: &Term) -> Result<Answers, EngineError> {
        self.ask_with(query, None)
    }

    /// Same as [`KnowledgeBase::ask`], with a tracer attached to every
    /// step of the search.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidQuery`] if `query` is a bare
    /// variable or a rule.
    pub fn ask_traced(
        &self,
        query: &Term,
        tracer: Rc<dyn Tracer>,
    ) -> Result<Answers, EngineError> {
        self.ask_with(query, Some(tracer))
    }

    fn ask_with(
        &self,
        query: &Term,
        tracer: Option<Rc<dyn Tracer>>,
    ) -> Result<Answers, EngineError> {
        if matches!(query, Term::Var(_) | Term::Rule { .. }) {
            return Err(EngineError::InvalidQuery(query.clone()));
        }

        let variables = query.free_variables();
        let sequences = query.goal_sequences();
        debug!(
            "query `{query}` splits into {} goal sequence(s)",
            sequences.len()
        );

        // One freshly renamed knowledge copy per branch, so the
        // query's variables never collide with clause variables of the
        // same textual name.
        let realizers = sequences
            .into_iter()
            .map(|goals| {
                let knowledge = Rc::new(self.renamed_avoiding(&variables));
                Realizer::new(goals, knowledge, Bindings::new(), tracer.clone())
            })
            .collect();
        Ok(Answers::new(Search::over(realizers), variables))
    }
}

impl Add for KnowledgeBase {
    type Output = KnowledgeBase;

    fn add(self, other: KnowledgeBase) -> KnowledgeBase {
        self.union(&other)
    }
}

impl Add<&KnowledgeBase> for &KnowledgeBase {
    type Output = KnowledgeBase;

    fn add(self, other: &KnowledgeBase) -> KnowledgeBase {
        self.union(other)
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, clause) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{clause}")?;
        }
        write!(f, "]")
    }
}
