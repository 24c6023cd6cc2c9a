//! Stage tracking for a single prediction request.
//!
//! `Idle → Resolving → Aggregating → Composing → Done | Failed`. Any stage
//! before a terminal one may fail (a failure in `Idle` means the input was
//! rejected before any request); nothing is resumable.

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Resolving,
    Aggregating,
    Composing,
    Done,
    Failed,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    fn next(&self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Resolving),
            Stage::Resolving => Some(Stage::Aggregating),
            Stage::Aggregating => Some(Stage::Composing),
            Stage::Composing => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Resolving => "resolving",
            Stage::Aggregating => "aggregating",
            Stage::Composing => "composing",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("illegal stage transition {from} -> {to}")]
pub struct TransitionError {
    pub from: Stage,
    pub to: Stage,
}

/// Where a lifecycle failed and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub stage: Stage,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    stage: Stage,
    failure: Option<Failure>,
    visited: Vec<Stage>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            failure: None,
            visited: vec![Stage::Idle],
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn failure(&self) -> Option<Failure> {
        self.failure
    }

    /// Every stage entered so far, in order.
    pub fn visited(&self) -> &[Stage] {
        &self.visited
    }

    pub fn entered(&self, stage: Stage) -> bool {
        self.visited.contains(&stage)
    }

    /// Move to `to`, which must be the stage directly after the current one.
    pub fn advance(&mut self, to: Stage) -> Result<(), TransitionError> {
        if self.stage.next() != Some(to) {
            return Err(TransitionError {
                from: self.stage,
                to,
            });
        }
        tracing::debug!("lifecycle {} -> {}", self.stage, to);
        self.stage = to;
        self.visited.push(to);
        Ok(())
    }

    /// End the lifecycle with a failure in the current stage.
    pub fn fail(&mut self, kind: ErrorKind) -> Result<(), TransitionError> {
        if self.stage.is_terminal() {
            return Err(TransitionError {
                from: self.stage,
                to: Stage::Failed,
            });
        }
        tracing::warn!("lifecycle failed while {} ({:?})", self.stage, kind);
        self.failure = Some(Failure {
            stage: self.stage,
            kind,
        });
        self.stage = Stage::Failed;
        self.visited.push(Stage::Failed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut lc = Lifecycle::new();
        for stage in [Stage::Resolving, Stage::Aggregating, Stage::Composing, Stage::Done] {
            lc.advance(stage).unwrap();
        }
        assert_eq!(lc.stage(), Stage::Done);
        assert!(lc.stage().is_terminal());
        assert_eq!(lc.failure(), None);
        assert_eq!(lc.visited().len(), 5);
    }

    #[test]
    fn test_cannot_skip_stages() {
        let mut lc = Lifecycle::new();
        let err = lc.advance(Stage::Composing).unwrap_err();
        assert_eq!(err.from, Stage::Idle);
        assert_eq!(lc.stage(), Stage::Idle);
    }

    #[test]
    fn test_failure_records_stage() {
        let mut lc = Lifecycle::new();
        lc.advance(Stage::Resolving).unwrap();
        lc.fail(ErrorKind::CityNotFound).unwrap();

        assert_eq!(lc.stage(), Stage::Failed);
        assert_eq!(
            lc.failure(),
            Some(Failure {
                stage: Stage::Resolving,
                kind: ErrorKind::CityNotFound
            })
        );
        assert!(!lc.entered(Stage::Aggregating));
    }

    #[test]
    fn test_terminal_is_not_resumable() {
        let mut lc = Lifecycle::new();
        lc.advance(Stage::Resolving).unwrap();
        lc.fail(ErrorKind::NetworkError).unwrap();

        assert!(lc.advance(Stage::Aggregating).is_err());
        assert!(lc.fail(ErrorKind::NetworkError).is_err());
    }

    #[test]
    fn test_rejected_input_fails_from_idle() {
        let mut lc = Lifecycle::new();
        lc.fail(ErrorKind::InvalidRange).unwrap();
        assert_eq!(lc.failure().map(|f| f.stage), Some(Stage::Idle));
        assert!(!lc.entered(Stage::Resolving));
    }
}
