use std::ops::Add;
use thiserror::Error;
use crate::model::condition::Score;

pub type Index = usize;

/// A local-search move on the current selection of ships.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Add(Index),
    Remove(Index),
    /// Drop the selected `out` and take the unselected `into` in its place.
    Swap { out: Index, into: Index },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ActionError {
    #[error("node {0} does not exist")]
    InvalidNode(Index),
    #[error("node {0} is already selected")]
    AlreadySelected(Index),
    #[error("node {0} is not selected")]
    NotSelected(Index),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    ScoreDiff(Score),
    UnsatisfiedScoreDiff(Score),   // score, selection left with conflicts
    Failed(Vec<ActionError>),
}

impl ActionResult {
    pub fn score(&self) -> Option<Score> {
        match self {
            ActionResult::ScoreDiff(s) | ActionResult::UnsatisfiedScoreDiff(s) => Some(*s),
            ActionResult::Failed(_) => None,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, ActionResult::ScoreDiff(_))
    }
}

impl Add for ActionResult {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (&self, &rhs) {
            (ActionResult::ScoreDiff(s1), ActionResult::ScoreDiff(s2))
                => ActionResult::ScoreDiff(s1 + s2),
            (ActionResult::ScoreDiff(s1), ActionResult::UnsatisfiedScoreDiff(s2))
                => ActionResult::UnsatisfiedScoreDiff(s1 + s2),
            (ActionResult::UnsatisfiedScoreDiff(s1), ActionResult::UnsatisfiedScoreDiff(s2))
                => ActionResult::UnsatisfiedScoreDiff(s1 + s2),
            (ActionResult::Failed(err1), ActionResult::Failed(err2))
                => ActionResult::Failed(err1.iter().chain(err2.iter()).cloned().collect()),
            (ActionResult::Failed(err), _) | (_, ActionResult::Failed(err))
                => ActionResult::Failed(err.clone()),
            _ => rhs + self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsatisfied_is_sticky() {
        let sum = ActionResult::UnsatisfiedScoreDiff(-2.0) + ActionResult::ScoreDiff(5.0);
        assert_eq!(sum, ActionResult::UnsatisfiedScoreDiff(3.0));
        assert!(!sum.is_satisfied());
        assert_eq!(sum.score(), Some(3.0));
    }

    #[test]
    fn failures_absorb_and_accumulate() {
        let failed = ActionResult::Failed(vec![ActionError::InvalidNode(7)]);
        assert_eq!(ActionResult::ScoreDiff(1.0) + failed.clone(), failed);
        assert_eq!(failed.clone() + ActionResult::UnsatisfiedScoreDiff(1.0), failed);

        let both = failed + ActionResult::Failed(vec![ActionError::NotSelected(2)]);
        assert_eq!(
            both,
            ActionResult::Failed(vec![ActionError::InvalidNode(7), ActionError::NotSelected(2)])
        );
        assert_eq!(both.score(), None);
    }
}
