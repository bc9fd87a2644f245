use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::bindings::Bindings;
use crate::knowledge::KnowledgeBase;
use crate::term::{Goals, Term, UNIFY_FUNCTOR};
use crate::trace::Tracer;

/// Compute the most general extension of `bindings` making `goal` and
/// `fact` syntactically equal, or `None` if the terms do not unify.
///
/// No occurs-check is performed: binding a variable to a term
/// containing itself is permitted and produces an infinite term on
/// deep walk.
pub(crate) fn unify(goal: &Term, fact: &Term, bindings: &Bindings) -> Option<Bindings> {
    let lhs = bindings.shallow_walk(goal);
    let rhs = bindings.shallow_walk(fact);

    // Equal terms always unify.
    if lhs == rhs {
        return Some(bindings.clone());
    }

    match (&lhs, &rhs) {
        // A variable surviving the walk is unbound by construction.
        (Term::Var(name), _) => Some(bindings.binding(name.clone(), rhs.clone())),
        (_, Term::Var(name)) => Some(bindings.binding(name.clone(), lhs.clone())),
        (Term::Lit(lvalue), Term::Lit(rvalue)) => (lvalue == rvalue).then(|| bindings.clone()),
        (
            Term::Fact {
                name: lname,
                args: largs,
            },
            Term::Fact {
                name: rname,
                args: rargs,
            },
        ) if lname == rname => {
            if largs.len() != rargs.len() {
                return None;
            }
            // Unify argument lists pairwise, threading the
            // environment through, fail-fast.
            largs
                .iter()
                .zip(rargs)
                .try_fold(bindings.clone(), |acc, (larg, rarg)| unify(larg, rarg, &acc))
        }
        _ => None,
    }
}

/// A resumable search, either a single goal-sequence realizer or an
/// alternator over several of them.
pub(crate) enum Search {
    Goals(Realizer),
    Branches(Alternator),
}

impl Search {
    /// Wrap the realizers in an alternator when there is more than
    /// one of them.
    pub(crate) fn over(mut realizers: Vec<Realizer>) -> Search {
        if realizers.len() == 1 {
            if let Some(realizer) = realizers.pop() {
                return Search::Goals(realizer);
            }
        }
        Search::Branches(Alternator::new(realizers))
    }

    pub(crate) fn next(&mut self) -> Option<Bindings> {
        match self {
            Search::Goals(realizer) => realizer.next(),
            Search::Branches(alternator) => alternator.next(),
        }
    }
}

/// Fair OR-combination of several realizers.
///
/// Solutions are pulled round-robin so a branch with infinitely many
/// derivations cannot starve its siblings.
pub(crate) struct Alternator {
    realizers: Vec<Realizer>,
    index: usize,
}

impl Alternator {
    pub(crate) fn new(realizers: Vec<Realizer>) -> Self {
        Self {
            realizers,
            index: 0,
        }
    }

    pub(crate) fn next(&mut self) -> Option<Bindings> {
        while !self.realizers.is_empty() {
            match self.realizers[self.index].next() {
                Some(result) => {
                    self.index = (self.index + 1) % self.realizers.len();
                    return Some(result);
                }
                None => {
                    self.realizers.remove(self.index);
                    if !self.realizers.is_empty() {
                        self.index %= self.realizers.len();
                    }
                }
            }
        }
        None
    }
}

/// The goal-resolution search for one goal sequence.
///
/// All suspension state lives in plain fields: the candidate cursor,
/// the active child search, the parent bindings. Each call to
/// [`Realizer::next`] resumes exactly where the previous one left off
/// instead of re-running from scratch.
pub(crate) struct Realizer {
    /// The goals left to realize; never empty.
    goals: Goals,
    knowledge: Rc<KnowledgeBase>,
    /// Bindings already determined by the parent realizer.
    parent: Bindings,
    /// Candidate clauses for the first goal's predicate.
    candidates: Vec<Rc<Term>>,
    cursor: usize,
    child: Option<Box<Search>>,
    /// Whether a built-in (unification or host-predicate) first goal
    /// has already been attempted; such goals yield at most once.
    builtin_tried: bool,
    tracer: Option<Rc<dyn Tracer>>,
}

impl Realizer {
    pub(crate) fn new(
        goals: Goals,
        knowledge: Rc<KnowledgeBase>,
        parent: Bindings,
        tracer: Option<Rc<dyn Tracer>>,
    ) -> Self {
        debug_assert!(!goals.is_empty());
        let candidates = knowledge.candidates(&goals[0]);
        Self {
            goals,
            knowledge,
            parent,
            candidates,
            cursor: 0,
            child: None,
            builtin_tried: false,
            tracer,
        }
    }

    fn spawn(&self, goals: Goals, knowledge: Rc<KnowledgeBase>, parent: Bindings) -> Box<Search> {
        Box::new(Search::Goals(Realizer::new(
            goals,
            knowledge,
            parent,
            self.tracer.clone(),
        )))
    }

    /// Pull the next solution, resuming from the retained state.
    pub(crate) fn next(&mut self) -> Option<Bindings> {
        // Drain an active child search first; its exhaustion is the
        // backtracking step.
        if let Some(child) = self.child.as_mut() {
            if let Some(result) = child.next() {
                return Some(result.merged(&self.parent));
            }
            if let Some(tracer) = &self.tracer {
                tracer.did_backtrack();
            }
            self.child = None;
        }

        let goal = self.goals[0].clone();
        if let Some(tracer) = &self.tracer {
            tracer.will_realize(&goal);
        }

        if !self.builtin_tried {
            // Built-in unify-and-continue goal: two explicit subterms
            // unified directly, independently of the knowledge base.
            if let Term::Fact { name, args } = &goal {
                if name == UNIFY_FUNCTOR && args.len() == 2 {
                    self.builtin_tried = true;
                    if let Some(result) = unify(&args[0], &args[1], &Bindings::new()) {
                        if self.goals.len() > 1 {
                            let rest: Goals = self.goals[1..]
                                .iter()
                                .map(|goal| result.deep_walk(goal))
                                .collect();
                            let mut child =
                                self.spawn(rest, Rc::clone(&self.knowledge), result);
                            if let Some(branch) = child.next() {
                                self.child = Some(child);
                                return Some(branch.merged(&self.parent));
                            }
                        } else {
                            return Some(result.merged(&self.parent));
                        }
                    }
                }
            }

            // Host-predicate goal: accept or reject against the
            // current environment, contributing no bindings.
            if let Term::Host(predicate) = &goal {
                self.builtin_tried = true;
                if predicate.accepts(&self.parent) {
                    if self.goals.len() > 1 {
                        let rest: Goals = self.goals[1..].iter().cloned().collect();
                        let mut child =
                            self.spawn(rest, Rc::clone(&self.knowledge), Bindings::new());
                        if let Some(branch) = child.next() {
                            self.child = Some(child);
                            return Some(branch.merged(&self.parent));
                        }
                    } else {
                        return Some(self.parent.clone());
                    }
                }
            }
        }

        // Scan the candidate clauses for the first goal.
        while self.cursor < self.candidates.len() {
            let clause = Rc::clone(&self.candidates[self.cursor]);
            self.cursor += 1;
            if let Some(tracer) = &self.tracer {
                tracer.will_attempt(&clause);
            }

            match (&goal, clause.as_ref()) {
                (Term::Lit(lvalue), Term::Lit(rvalue)) if lvalue == rvalue => {
                    if self.goals.len() > 1 {
                        let rest: Goals = self.goals[1..].iter().cloned().collect();
                        let mut child =
                            self.spawn(rest, Rc::clone(&self.knowledge), Bindings::new());
                        if let Some(branch) = child.next() {
                            self.child = Some(child);
                            return Some(branch.merged(&self.parent));
                        }
                    } else {
                        return Some(self.parent.clone());
                    }
                }

                (Term::Fact { .. }, Term::Fact { .. }) => {
                    if let Some(result) = unify(&goal, &clause, &Bindings::new()) {
                        if self.goals.len() > 1 {
                            let rest: Goals = self.goals[1..]
                                .iter()
                                .map(|goal| result.deep_walk(goal))
                                .collect();
                            let mut child =
                                self.spawn(rest, Rc::clone(&self.knowledge), result);
                            if let Some(branch) = child.next() {
                                self.child = Some(child);
                                return Some(branch.merged(&self.parent));
                            }
                        } else {
                            return Some(result.merged(&self.parent));
                        }
                    }
                }

                (Term::Fact { .. }, Term::Rule { name, args, body }) => {
                    // Try to unify the goal with the rule's head.
                    let head = Term::Fact {
                        name: name.clone(),
                        args: args.clone(),
                    };
                    if let Some(result) = unify(&goal, &head, &Bindings::new()) {
                        let rest: Vec<Term> = self.goals[1..]
                            .iter()
                            .map(|goal| result.deep_walk(goal))
                            .collect();
                        let branches: Vec<Goals> = body
                            .goal_sequences()
                            .into_iter()
                            .map(|sequence| {
                                sequence
                                    .iter()
                                    .map(|goal| result.deep_walk(goal))
                                    .chain(rest.iter().cloned())
                                    .collect()
                            })
                            .collect();
                        debug_assert!(!branches.is_empty());

                        // Rename the matched clause's variables in the
                        // child's knowledge copy. Consider a recursive
                        // rule `p(q($x), $y) ⊢ p($x, q($y))` and a
                        // goal `p($z, 0)`: `$z` gets bound to `q($x)`
                        // before `p($x, q(0))` is attempted, and
                        // without the renaming the recursion would try
                        // to unify `$x` with a term containing `$x`.
                        let knowledge =
                            Rc::new(self.knowledge.renamed_avoiding(&clause.free_variables()));
                        let realizers = branches
                            .into_iter()
                            .map(|goals| {
                                Realizer::new(
                                    goals,
                                    Rc::clone(&knowledge),
                                    result.clone(),
                                    self.tracer.clone(),
                                )
                            })
                            .collect();
                        let mut child = Box::new(Search::over(realizers));
                        if let Some(branch) = child.next() {
                            self.child = Some(child);
                            return Some(branch.merged(&self.parent));
                        }
                    }
                }

                _ => {}
            }
        }

        None
    }
}

/// The lazy stream of solutions for a query.
///
/// Each pull drives the underlying search exactly one solution
/// forward; the end of the stream is permanent. Dropping the stream
/// before exhaustion releases all retained search state.
pub struct Answers {
    search: Search,
    variables: IndexSet<String>,
    exhausted: bool,
}

impl Answers {
    pub(crate) fn new(search: Search, variables: IndexSet<String>) -> Self {
        Self {
            search,
            variables,
            exhausted: false,
        }
    }
}

impl Iterator for Answers {
    type Item = Bindings;

    fn next(&mut self) -> Option<Bindings> {
        if self.exhausted {
            return None;
        }
        match self.search.next() {
            Some(solution) => Some(solution.reified().restricted(&self.variables)),
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

impl fmt::Debug for Answers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Answers")
            .field("variables", &self.variables)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}
