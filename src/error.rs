use thiserror::Error;

use crate::term::Term;

/// Errors surfaced by the engine.
///
/// Both variants are caller-input errors detected eagerly; a
/// unification mismatch or an exhausted answer stream is ordinary
/// control flow, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The query is a bare variable or a rule; there is nothing to
    /// prove against the knowledge base.
    #[error("invalid query `{0}`: a query must not be a bare variable or a rule")]
    InvalidQuery(Term),

    /// A clause handed to knowledge-base construction is neither a
    /// fact, a rule, nor a literal.
    #[error("malformed clause `{0}`: knowledge must consist of facts, rules and literals")]
    MalformedKnowledge(Term),
}
