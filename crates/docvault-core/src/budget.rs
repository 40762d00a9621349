//! Soft deadlines for long traversals (search, standards loading).
//!
//! There is no cancellation primitive: a traversal calls
//! [`Deadline::check`] between nodes and bails out with
//! [`Error::Timeout`] once the budget is spent.

use std::time::{Duration, Instant};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Deadline {
    stage: &'static str,
    started: Instant,
    budget: Option<Duration>,
}

impl Deadline {
    pub fn new(stage: &'static str, budget: Option<Duration>) -> Self {
        Self {
            stage,
            started: Instant::now(),
            budget,
        }
    }

    /// A deadline that never expires.
    pub fn unbounded(stage: &'static str) -> Self {
        Self::new(stage, None)
    }

    /// Same start instant and budget, reported under another stage name.
    pub fn for_stage(&self, stage: &'static str) -> Self {
        Self {
            stage,
            started: self.started,
            budget: self.budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check(&self) -> Result<()> {
        match self.budget {
            Some(budget) if self.started.elapsed() > budget => Err(Error::Timeout {
                stage: self.stage.to_string(),
                elapsed_ms: self.started.elapsed().as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn unbounded_never_expires() {
        assert!(Deadline::unbounded("search").check().is_ok());
    }

    #[test]
    fn zero_budget_expires() {
        let deadline = Deadline::new("standards", Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        let err = deadline.check().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("standards"));
    }

    #[test]
    fn for_stage_renames() {
        let deadline = Deadline::new("review", Some(Duration::ZERO)).for_stage("load");
        std::thread::sleep(Duration::from_millis(2));
        assert!(deadline.check().unwrap_err().to_string().contains("load"));
    }
}
