use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};
use smallvec::{smallvec, SmallVec};

use crate::bindings::Bindings;

/// Functor name reserved for the built-in unify-and-continue goal.
pub(crate) const UNIFY_FUNCTOR: &str = "hornlog.unify";

/// A goal sequence, one conjunctive branch of a query or rule body.
pub(crate) type Goals = SmallVec<[Term; 4]>;

/// A host value embedded in a literal term.
///
/// Literals are compared by value equality only; the engine never
/// interprets them (no arithmetic built-ins).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// A signed integer.
    Int(i64),
    /// A string.
    Str(String),
    /// A boolean.
    Bool(bool),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Str(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// A host-language predicate embedded in a term.
///
/// The wrapped closure is evaluated against the current bindings and
/// only accepts or rejects; it never contributes new bindings. Two
/// host predicates are equal iff they wrap the same closure instance.
#[derive(Clone)]
pub struct HostPred(Rc<dyn Fn(&Bindings) -> bool>);

impl HostPred {
    pub(crate) fn new(predicate: impl Fn(&Bindings) -> bool + 'static) -> Self {
        Self(Rc::new(predicate))
    }

    /// Evaluate the predicate against the given bindings.
    #[must_use]
    pub fn accepts(&self, bindings: &Bindings) -> bool {
        (self.0)(bindings)
    }
}

impl PartialEq for HostPred {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for HostPred {}

impl Hash for HostPred {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.0).cast::<()>() as usize).hash(state);
    }
}

impl fmt::Debug for HostPred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostPred(..)")
    }
}

/// A term of the logic language.
///
/// Terms are immutable trees; the engine never mutates a term in
/// place, it only builds new ones (e.g. when renaming variables).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// A logic variable, identified by name.
    Var(String),
    /// An embedded host value.
    Lit(Value),
    /// A compound structure, e.g. `link(0, 1)`.
    Fact {
        /// The functor name.
        name: String,
        /// The arguments; arity is `args.len()`.
        args: Vec<Term>,
    },
    /// A rule: a head (functor + arguments) and a body to prove.
    Rule {
        /// The head functor name.
        name: String,
        /// The head arguments.
        args: Vec<Term>,
        /// The body goal term.
        body: Box<Term>,
    },
    /// The conjunction of two goals.
    Conj(Box<Term>, Box<Term>),
    /// The disjunction of two goals.
    Disj(Box<Term>, Box<Term>),
    /// A host-predicate escape hatch.
    Host(HostPred),
}

impl Term {
    /// Build a variable term.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Term {
        Term::Var(name.into())
    }

    /// Build a literal term from a host value.
    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Term {
        Term::Lit(value.into())
    }

    /// Build a compound term.
    #[must_use]
    pub fn fact(name: impl Into<String>, args: Vec<Term>) -> Term {
        Term::Fact {
            name: name.into(),
            args,
        }
    }

    /// Build a rule with the given head and body.
    #[must_use]
    pub fn rule(name: impl Into<String>, args: Vec<Term>, body: Term) -> Term {
        Term::Rule {
            name: name.into(),
            args,
            body: Box::new(body),
        }
    }

    /// Build the conjunction of two goals.
    #[must_use]
    pub fn conj(lhs: Term, rhs: Term) -> Term {
        Term::Conj(Box::new(lhs), Box::new(rhs))
    }

    /// Build the disjunction of two goals.
    #[must_use]
    pub fn disj(lhs: Term, rhs: Term) -> Term {
        Term::Disj(Box::new(lhs), Box::new(rhs))
    }

    /// Build the built-in goal that unifies two terms directly,
    /// independently of the knowledge base.
    #[must_use]
    pub fn unification(lhs: Term, rhs: Term) -> Term {
        Term::fact(UNIFY_FUNCTOR, vec![lhs, rhs])
    }

    /// Build a host-predicate term from a closure.
    #[must_use]
    pub fn host(predicate: impl Fn(&Bindings) -> bool + 'static) -> Term {
        Term::Host(HostPred::new(predicate))
    }

    /// Rewrite the top level of the term towards disjunctive normal
    /// form. The rewrite is applied once, at the top only; connectives
    /// nested deeper on both sides are left as-is.
    fn dnf(&self) -> Term {
        if let Term::Conj(lhs, rhs) = self {
            if let Term::Disj(b, c) = rhs.as_ref() {
                let a = lhs.as_ref();
                return Term::disj(
                    Term::conj(a.clone(), b.as_ref().clone()),
                    Term::conj(a.clone(), c.as_ref().clone()),
                );
            }
            if let Term::Disj(a, b) = lhs.as_ref() {
                let c = rhs.as_ref();
                return Term::disj(
                    Term::conj(a.as_ref().clone(), c.clone()),
                    Term::conj(b.as_ref().clone(), c.clone()),
                );
            }
        }
        self.clone()
    }

    /// Decompose the term into its goal sequences: one sequence per
    /// disjunctive branch, each sequence a conjunction of goals.
    pub(crate) fn goal_sequences(&self) -> Vec<Goals> {
        match self.dnf() {
            Term::Conj(lhs, rhs) => {
                let mut left = lhs.goal_sequences();
                let mut right = rhs.goal_sequences();
                debug_assert!(left.len() == 1 && right.len() == 1);
                let mut sequence = left.pop().unwrap_or_default();
                sequence.extend(right.pop().unwrap_or_default());
                vec![sequence]
            }
            Term::Disj(lhs, rhs) => {
                let mut sequences = lhs.goal_sequences();
                sequences.extend(rhs.goal_sequences());
                sequences
            }
            other => vec![smallvec![other]],
        }
    }

    /// Collect the names of every variable occurring in the term, in
    /// first-occurrence order.
    #[must_use]
    pub fn free_variables(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables(&self, names: &mut IndexSet<String>) {
        match self {
            Term::Var(name) => {
                names.insert(name.clone());
            }
            Term::Fact { args, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
            }
            Term::Rule { args, body, .. } => {
                for arg in args {
                    arg.collect_variables(names);
                }
                body.collect_variables(names);
            }
            Term::Conj(lhs, rhs) | Term::Disj(lhs, rhs) => {
                lhs.collect_variables(names);
                rhs.collect_variables(names);
            }
            Term::Lit(_) | Term::Host(_) => {}
        }
    }

    /// Alpha-rename every variable whose name belongs to `avoid`,
    /// appending `'` until the name is fresh.
    ///
    /// Freshness is checked against the avoid set, the term's own
    /// variables and every name already assigned, so two distinct
    /// variables can never be conflated by the renaming (`x` next to a
    /// pre-existing `x'` becomes `x''`, not `x'`).
    pub(crate) fn renamed_avoiding(&self, avoid: &IndexSet<String>) -> Term {
        let own = self.free_variables();
        let mut taken: IndexSet<String> = avoid.union(&own).cloned().collect();
        let mut renames: IndexMap<String, String> = IndexMap::new();
        for name in &own {
            if avoid.contains(name) {
                let mut fresh = format!("{name}'");
                while taken.contains(&fresh) {
                    fresh.push('\'');
                }
                taken.insert(fresh.clone());
                renames.insert(name.clone(), fresh);
            }
        }
        self.applying_renames(&renames)
    }

    fn applying_renames(&self, renames: &IndexMap<String, String>) -> Term {
        match self {
            Term::Var(name) => match renames.get(name) {
                Some(fresh) => Term::Var(fresh.clone()),
                None => self.clone(),
            },
            Term::Fact { name, args } => Term::Fact {
                name: name.clone(),
                args: args.iter().map(|arg| arg.applying_renames(renames)).collect(),
            },
            Term::Rule { name, args, body } => Term::Rule {
                name: name.clone(),
                args: args.iter().map(|arg| arg.applying_renames(renames)).collect(),
                body: Box::new(body.applying_renames(renames)),
            },
            Term::Conj(lhs, rhs) => Term::conj(
                lhs.applying_renames(renames),
                rhs.applying_renames(renames),
            ),
            Term::Disj(lhs, rhs) => Term::disj(
                lhs.applying_renames(renames),
                rhs.applying_renames(renames),
            ),
            Term::Lit(_) | Term::Host(_) => self.clone(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_head(f: &mut fmt::Formatter<'_>, name: &str, args: &[Term]) -> fmt::Result {
            if args.is_empty() {
                write!(f, "{name}")
            } else {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }

        match self {
            Term::Var(name) => write!(f, "${name}"),
            Term::Lit(value) => write!(f, "{value}"),
            Term::Fact { name, args } => write_head(f, name, args),
            Term::Rule { name, args, body } => {
                write!(f, "(")?;
                write_head(f, name, args)?;
                write!(f, " :- {body})")
            }
            Term::Conj(lhs, rhs) => write!(f, "({lhs} ∧ {rhs})"),
            Term::Disj(lhs, rhs) => write!(f, "({lhs} ∨ {rhs})"),
            Term::Host(_) => write!(f, "<host predicate>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dnf_distributes_conjunction_over_right_disjunction() {
        let a = Term::fact("a", vec![]);
        let b = Term::fact("b", vec![]);
        let c = Term::fact("c", vec![]);

        let term = Term::conj(a.clone(), Term::disj(b.clone(), c.clone()));
        let expected = Term::disj(
            Term::conj(a.clone(), b.clone()),
            Term::conj(a.clone(), c.clone()),
        );
        assert_eq!(term.dnf(), expected);
    }

    #[test]
    fn test_dnf_distributes_conjunction_over_left_disjunction() {
        let a = Term::fact("a", vec![]);
        let b = Term::fact("b", vec![]);
        let c = Term::fact("c", vec![]);

        let term = Term::conj(Term::disj(a.clone(), b.clone()), c.clone());
        let expected = Term::disj(
            Term::conj(a.clone(), c.clone()),
            Term::conj(b.clone(), c.clone()),
        );
        assert_eq!(term.dnf(), expected);
    }

    #[test]
    fn test_dnf_leaves_plain_terms_unchanged() {
        let term = Term::fact("a", vec![Term::var("x")]);
        assert_eq!(term.dnf(), term);
    }

    #[test]
    fn test_goal_sequences_of_plain_term() {
        let term = Term::fact("a", vec![]);
        assert_eq!(term.goal_sequences(), vec![Goals::from_vec(vec![term])]);
    }

    #[test]
    fn test_goal_sequences_of_conjunction() {
        let a = Term::fact("a", vec![]);
        let b = Term::fact("b", vec![]);
        let term = Term::conj(a.clone(), b.clone());
        assert_eq!(term.goal_sequences(), vec![Goals::from_vec(vec![a, b])]);
    }

    #[test]
    fn test_goal_sequences_of_disjunction() {
        let a = Term::fact("a", vec![]);
        let b = Term::fact("b", vec![]);
        let term = Term::disj(a.clone(), b.clone());
        assert_eq!(
            term.goal_sequences(),
            vec![Goals::from_vec(vec![a]), Goals::from_vec(vec![b])]
        );
    }

    #[test]
    fn test_goal_sequences_of_mixed_connectives() {
        let a = Term::fact("a", vec![]);
        let b = Term::fact("b", vec![]);
        let c = Term::fact("c", vec![]);

        // a ∧ (b ∨ c) distributes into [a, b] and [a, c].
        let term = Term::conj(a.clone(), Term::disj(b.clone(), c.clone()));
        assert_eq!(
            term.goal_sequences(),
            vec![
                Goals::from_vec(vec![a.clone(), b]),
                Goals::from_vec(vec![a, c])
            ]
        );
    }

    #[test]
    fn test_free_variables_in_first_occurrence_order() {
        let term = Term::rule(
            "p",
            vec![Term::var("x"), Term::fact("f", vec![Term::var("y")])],
            Term::conj(
                Term::fact("q", vec![Term::var("z"), Term::var("x")]),
                Term::lit(1),
            ),
        );
        let variables = term.free_variables();
        let names: Vec<&str> = variables.iter().map(String::as_str).collect();
        assert_eq!(names, ["x", "y", "z"]);
    }

    #[test]
    fn test_renamed_avoiding_renames_only_collisions() {
        let avoid: IndexSet<String> = ["x".to_string()].into_iter().collect();
        let term = Term::fact("p", vec![Term::var("x"), Term::var("y")]);
        assert_eq!(
            term.renamed_avoiding(&avoid),
            Term::fact("p", vec![Term::var("x'"), Term::var("y")])
        );
    }

    #[test]
    fn test_renamed_avoiding_skips_taken_suffixes() {
        let avoid: IndexSet<String> = ["x".to_string(), "x'".to_string()].into_iter().collect();
        let term = Term::var("x");
        assert_eq!(term.renamed_avoiding(&avoid), Term::var("x''"));
    }

    #[test]
    fn test_renamed_avoiding_keeps_distinct_variables_distinct() {
        // The clause already owns an `x'`; renaming `x` must not
        // merge the two.
        let avoid: IndexSet<String> = ["x".to_string()].into_iter().collect();
        let term = Term::fact("p", vec![Term::var("x"), Term::var("x'")]);
        assert_eq!(
            term.renamed_avoiding(&avoid),
            Term::fact("p", vec![Term::var("x''"), Term::var("x'")])
        );
    }

    #[test]
    fn test_renamed_avoiding_assigns_pairwise_fresh_names() {
        let avoid: IndexSet<String> = ["x".to_string(), "x'".to_string()].into_iter().collect();
        let term = Term::fact("p", vec![Term::var("x"), Term::var("x'")]);
        assert_eq!(
            term.renamed_avoiding(&avoid),
            Term::fact("p", vec![Term::var("x''"), Term::var("x'''")])
        );
    }

    #[test]
    fn test_renamed_avoiding_reaches_rule_bodies() {
        let avoid: IndexSet<String> = ["x".to_string()].into_iter().collect();
        let term = Term::rule(
            "p",
            vec![Term::var("x")],
            Term::fact("q", vec![Term::var("x")]),
        );
        assert_eq!(
            term.renamed_avoiding(&avoid),
            Term::rule(
                "p",
                vec![Term::var("x'")],
                Term::fact("q", vec![Term::var("x'")]),
            )
        );
    }

    #[test]
    fn test_display() {
        let rule = Term::rule(
            "happy",
            vec![Term::var("who")],
            Term::conj(
                Term::fact("play", vec![Term::var("who")]),
                Term::fact("rest", vec![Term::var("who")]),
            ),
        );
        assert_eq!(
            rule.to_string(),
            "(happy($who) :- (play($who) ∧ rest($who)))"
        );
        assert_eq!(Term::fact("zero", vec![]).to_string(), "zero");
        assert_eq!(Term::lit("mia").to_string(), "mia");
    }

    #[test]
    fn test_host_predicates_compare_by_identity() {
        let first = Term::host(|_| true);
        let second = Term::host(|_| true);
        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }
}
