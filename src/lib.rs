//! # Hornlog
//!
//! An embeddable Horn-clause resolution engine: store facts and rules,
//! ask a query term, and lazily enumerate every variable binding that
//! satisfies it through unification and depth-first search with
//! backtracking.
//!
//! ## Example
//!
//! ```rust
//! use hornlog::{KnowledgeBase, Term};
//!
//! let kb = KnowledgeBase::new(vec![
//!     Term::fact("link", vec![Term::lit(0), Term::lit(1)]),
//!     Term::fact("link", vec![Term::lit(1), Term::lit(2)]),
//! ])?;
//!
//! for answer in kb.ask(&Term::fact("link", vec![Term::lit(0), Term::var("x")]))? {
//!     println!("x = {}", answer.get("x").unwrap());
//! }
//! # Ok::<(), hornlog::EngineError>(())
//! ```

/// Substitution environments.
pub mod bindings;
/// Engine errors.
pub mod error;
/// Knowledge bases: clause storage, indexing and queries.
pub mod knowledge;
/// The resumable goal-resolution search and answer streams.
pub mod realizer;
/// Terms of the logic language.
pub mod term;
/// Observation hooks for the search.
pub mod trace;

pub use bindings::Bindings;
pub use error::EngineError;
pub use knowledge::KnowledgeBase;
pub use realizer::Answers;
pub use term::{HostPred, Term, Value};
pub use trace::{LogTracer, Tracer};
