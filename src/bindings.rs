use indexmap::{IndexMap, IndexSet};

use crate::term::Term;

/// A substitution environment: the variable-to-term mapping threaded
/// through a search.
///
/// Every operation that would mutate the mapping returns a new
/// environment instead, so concurrently live search branches never
/// observe each other's bindings. Equality ignores insertion order.
///
/// There is no occurs-check anywhere in the engine: binding a variable
/// to a term containing itself is permitted and makes
/// [`Bindings::deep_walk`] diverge on that variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    map: IndexMap<String, Term>,
}

impl Bindings {
    /// Create an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the term a variable is directly bound to, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Term> {
        self.map.get(name)
    }

    /// The number of bound variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over the bound variables and their terms.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Term)> {
        self.map.iter()
    }

    /// Follow `Var` chains until reaching an unbound variable or a
    /// non-variable term; any other term passes through unchanged.
    #[must_use]
    pub fn shallow_walk(&self, term: &Term) -> Term {
        let mut current = term;
        while let Term::Var(name) = current {
            match self.map.get(name) {
                Some(bound) => current = bound,
                None => break,
            }
        }
        current.clone()
    }

    /// Shallow-walk, then recursively substitute into compound
    /// arguments and connective operands. Rules, literals, unbound
    /// variables and host predicates pass through structurally.
    #[must_use]
    pub fn deep_walk(&self, term: &Term) -> Term {
        match self.shallow_walk(term) {
            Term::Fact { name, args } => Term::Fact {
                name,
                args: args.iter().map(|arg| self.deep_walk(arg)).collect(),
            },
            Term::Conj(lhs, rhs) => Term::conj(self.deep_walk(&lhs), self.deep_walk(&rhs)),
            Term::Disj(lhs, rhs) => Term::disj(self.deep_walk(&lhs), self.deep_walk(&rhs)),
            walked => walked,
        }
    }

    /// Return a copy of this environment with `name` bound to `term`.
    #[must_use]
    pub fn binding(&self, name: impl Into<String>, term: Term) -> Bindings {
        let mut map = self.map.clone();
        map.insert(name.into(), term);
        Bindings { map }
    }

    /// Return this environment extended by `other`'s bindings;
    /// `other` wins on key collision.
    #[must_use]
    pub fn merged(&self, other: &Bindings) -> Bindings {
        let mut map = self.map.clone();
        for (name, term) in &other.map {
            map.insert(name.clone(), term.clone());
        }
        Bindings { map }
    }

    /// Deep-walk every bound variable.
    #[must_use]
    pub(crate) fn reified(&self) -> Bindings {
        self.map
            .iter()
            .map(|(name, term)| (name.clone(), self.deep_walk(term)))
            .collect()
    }

    /// Keep only the bindings for the requested variable names.
    #[must_use]
    pub(crate) fn restricted(&self, variables: &IndexSet<String>) -> Bindings {
        self.map
            .iter()
            .filter(|(name, _)| variables.contains(*name))
            .map(|(name, term)| (name.clone(), term.clone()))
            .collect()
    }
}

impl FromIterator<(String, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (String, Term)>>(iter: I) -> Self {
        Bindings {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bindings {
        [
            ("w".to_string(), Term::fact("a", vec![])),
            ("x".to_string(), Term::var("y")),
            ("y".to_string(), Term::var("z")),
            ("z".to_string(), Term::fact("t", vec![Term::var("w")])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_shallow_walk_follows_variable_chains() {
        let bindings = sample();
        let expected = Term::fact("t", vec![Term::var("w")]);

        assert_eq!(
            bindings.shallow_walk(&Term::fact("u", vec![])),
            Term::fact("u", vec![])
        );
        assert_eq!(bindings.shallow_walk(&Term::var("z")), expected);
        assert_eq!(bindings.shallow_walk(&Term::var("y")), expected);
        assert_eq!(bindings.shallow_walk(&Term::var("x")), expected);
    }

    #[test]
    fn test_shallow_walk_leaves_unbound_variables() {
        let bindings = Bindings::new();
        assert_eq!(bindings.shallow_walk(&Term::var("x")), Term::var("x"));
    }

    #[test]
    fn test_deep_walk_substitutes_into_arguments() {
        let bindings = sample();
        let expected = Term::fact("t", vec![Term::fact("a", vec![])]);

        assert_eq!(
            bindings.deep_walk(&Term::fact("u", vec![])),
            Term::fact("u", vec![])
        );
        assert_eq!(bindings.deep_walk(&Term::var("z")), expected);
        assert_eq!(bindings.deep_walk(&Term::var("y")), expected);
        assert_eq!(bindings.deep_walk(&Term::var("x")), expected);
    }

    #[test]
    fn test_reified_walks_every_binding() {
        let reified = sample().reified();
        let expected = Term::fact("t", vec![Term::fact("a", vec![])]);

        assert_eq!(reified.get("w"), Some(&Term::fact("a", vec![])));
        assert_eq!(reified.get("x"), Some(&expected));
        assert_eq!(reified.get("y"), Some(&expected));
        assert_eq!(reified.get("z"), Some(&expected));
    }

    #[test]
    fn test_reified_is_idempotent() {
        let reified = sample().reified();
        assert_eq!(reified.reified(), reified);
    }

    #[test]
    fn test_binding_adds_and_overrides() {
        let bindings: Bindings = [("x".to_string(), Term::var("y"))].into_iter().collect();
        assert_eq!(
            bindings.binding("v", Term::fact("b", vec![])).get("v"),
            Some(&Term::fact("b", vec![]))
        );
        assert_eq!(
            bindings.binding("x", Term::fact("b", vec![])).get("x"),
            Some(&Term::fact("b", vec![]))
        );
        // The receiver is untouched.
        assert_eq!(bindings.get("x"), Some(&Term::var("y")));
    }

    #[test]
    fn test_merged_prefers_the_other_side() {
        let bindings: Bindings = [("x".to_string(), Term::var("y"))].into_iter().collect();
        let extended: Bindings = [("y".to_string(), Term::var("z"))].into_iter().collect();
        let overridden: Bindings = [("x".to_string(), Term::var("z"))].into_iter().collect();

        assert_eq!(bindings.merged(&extended).get("y"), Some(&Term::var("z")));
        assert_eq!(bindings.merged(&overridden).get("x"), Some(&Term::var("z")));
    }

    #[test]
    fn test_restricted_drops_internal_variables() {
        let variables: IndexSet<String> = ["x".to_string()].into_iter().collect();
        let restricted = sample().restricted(&variables);
        assert_eq!(restricted.len(), 1);
        assert_eq!(restricted.get("x"), Some(&Term::var("y")));
    }

    #[test]
    fn test_equality_ignores_insertion_order() {
        let forward: Bindings = [
            ("x".to_string(), Term::lit(1)),
            ("y".to_string(), Term::lit(2)),
        ]
        .into_iter()
        .collect();
        let backward: Bindings = [
            ("y".to_string(), Term::lit(2)),
            ("x".to_string(), Term::lit(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(forward, backward);
    }
}
