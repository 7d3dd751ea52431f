//! Compensating writes.
//!
//! The store executes one statement per call and cannot group calls into a
//! transaction. A [`Saga`] approximates one: every successful step records
//! its inverse, and the first failing step unwinds the recorded inverses in
//! reverse order. Inverses that fail are logged and counted, never retried.

use thiserror::Error;

use crate::error::{Error, Result};

type Compensation<'a> = Box<dyn FnOnce() -> Result<()> + 'a>;

#[derive(Debug, Error)]
#[error("{step} failed: {source}")]
pub struct StepFailed {
    pub step: String,
    #[source]
    pub source: Error,
    /// Compensations that ran while unwinding.
    pub compensated: usize,
    /// Compensations that returned an error. Non-zero means the data is
    /// only partially rolled back.
    pub compensation_failures: usize,
}

impl StepFailed {
    #[must_use]
    pub fn fully_reverted(&self) -> bool {
        self.compensation_failures == 0
    }
}

pub struct Saga<'a> {
    name: &'static str,
    completed: Vec<(String, Compensation<'a>)>,
}

impl<'a> Saga<'a> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            completed: Vec::new(),
        }
    }

    /// Runs `action`. On success `compensate` is recorded; on failure every
    /// previously recorded compensation runs, newest first.
    pub fn step<T, A, C>(
        &mut self,
        label: impl Into<String>,
        action: A,
        compensate: C,
    ) -> std::result::Result<T, StepFailed>
    where
        A: FnOnce() -> Result<T>,
        C: FnOnce() -> Result<()> + 'a,
    {
        let label = label.into();
        match action() {
            Ok(value) => {
                self.completed.push((label, Box::new(compensate)));
                Ok(value)
            }
            Err(source) => Err(self.fail(label, source)),
        }
    }

    /// Runs a step with nothing to undo (reads, snapshots). A failure still
    /// unwinds the steps before it.
    pub fn run<T, A>(&mut self, label: impl Into<String>, action: A) -> std::result::Result<T, StepFailed>
    where
        A: FnOnce() -> Result<T>,
    {
        action().map_err(|source| self.fail(label.into(), source))
    }

    /// Keeps every completed step.
    pub fn commit(mut self) {
        tracing::debug!(saga = self.name, steps = self.completed.len(), "saga committed");
        self.completed.clear();
    }

    fn fail(&mut self, step: String, source: Error) -> StepFailed {
        tracing::warn!(
            saga = self.name,
            step = %step,
            error = %source,
            "step failed, reverting {} completed step(s)",
            self.completed.len()
        );
        let (compensated, compensation_failures) = self.unwind();
        StepFailed {
            step,
            source,
            compensated,
            compensation_failures,
        }
    }

    fn unwind(&mut self) -> (usize, usize) {
        let mut compensated = 0;
        let mut failures = 0;

        while let Some((label, compensate)) = self.completed.pop() {
            compensated += 1;
            if let Err(e) = compensate() {
                failures += 1;
                tracing::error!(saga = self.name, step = %label, error = %e, "rollback failed");
            }
        }
        (compensated, failures)
    }
}

// A saga abandoned through an early return is unwound as well.
impl Drop for Saga<'_> {
    fn drop(&mut self) {
        if !self.completed.is_empty() {
            tracing::warn!(saga = self.name, "saga dropped before commit, reverting");
            self.unwind();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn boom() -> Error {
        Error::Io(std::io::Error::other("boom"))
    }

    #[test]
    fn test_failure_unwinds_in_reverse_order() {
        let log = RefCell::new(Vec::new());
        let mut saga = Saga::new("test");

        saga.step("a", || Ok(()), || {
            log.borrow_mut().push("undo a");
            Ok(())
        })
        .unwrap();
        saga.step("b", || Ok(()), || {
            log.borrow_mut().push("undo b");
            Ok(())
        })
        .unwrap();

        let err = saga
            .step("c", || Err::<(), _>(boom()), || {
                log.borrow_mut().push("undo c");
                Ok(())
            })
            .unwrap_err();

        assert_eq!(err.step, "c");
        assert_eq!(err.compensated, 2);
        assert!(err.fully_reverted());
        assert_eq!(*log.borrow(), vec!["undo b", "undo a"]);
    }

    #[test]
    fn test_compensation_failures_are_counted_not_fatal() {
        let log = RefCell::new(Vec::new());
        let mut saga = Saga::new("test");

        saga.step("a", || Ok(()), || {
            log.borrow_mut().push("undo a");
            Ok(())
        })
        .unwrap();
        saga.step("b", || Ok(()), || Err(boom())).unwrap();

        let err = saga.run("c", || Err::<(), _>(boom())).unwrap_err();
        assert_eq!(err.compensated, 2);
        assert_eq!(err.compensation_failures, 1);
        assert!(!err.fully_reverted());
        assert_eq!(*log.borrow(), vec!["undo a"]);
    }

    #[test]
    fn test_commit_discards_compensations() {
        let log = RefCell::new(Vec::new());
        {
            let mut saga = Saga::new("test");
            saga.step("a", || Ok(1), || {
                log.borrow_mut().push("undo a");
                Ok(())
            })
            .unwrap();
            saga.commit();
        }
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_drop_without_commit_unwinds() {
        let log = RefCell::new(Vec::new());
        {
            let mut saga = Saga::new("test");
            saga.step("a", || Ok(()), || {
                log.borrow_mut().push("undo a");
                Ok(())
            })
            .unwrap();
        }
        assert_eq!(*log.borrow(), vec!["undo a"]);
    }
}
