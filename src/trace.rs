use crate::term::Term;

/// Observer of the resolution search, notified synchronously before
/// each step. Implementations must not affect control flow.
pub trait Tracer {
    /// The search is about to attempt to satisfy `goal`.
    fn will_realize(&self, goal: &Term);

    /// The search is about to try the candidate clause `clause`.
    fn will_attempt(&self, clause: &Term);

    /// A child search is exhausted and the search backtracks.
    fn did_backtrack(&self);
}

/// Tracer that forwards every notification to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn will_realize(&self, goal: &Term) {
        log::debug!("attempting to realize `{goal}`");
    }

    fn will_attempt(&self, clause: &Term) {
        log::trace!("trying clause `{clause}`");
    }

    fn did_backtrack(&self) {
        log::trace!("backtracking");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Tracer that records every notification, for assertions.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingTracer {
        pub(crate) events: RefCell<Vec<String>>,
    }

    impl Tracer for RecordingTracer {
        fn will_realize(&self, goal: &Term) {
            self.events.borrow_mut().push(format!("realize {goal}"));
        }

        fn will_attempt(&self, clause: &Term) {
            self.events.borrow_mut().push(format!("attempt {clause}"));
        }

        fn did_backtrack(&self) {
            self.events.borrow_mut().push("backtrack".to_string());
        }
    }

    #[test]
    fn test_recording_tracer_collects_events() {
        let tracer = Rc::new(RecordingTracer::default());
        tracer.will_realize(&Term::fact("p", vec![]));
        tracer.will_attempt(&Term::fact("q", vec![]));
        tracer.did_backtrack();
        assert_eq!(
            *tracer.events.borrow(),
            ["realize p", "attempt q", "backtrack"]
        );
    }
}
