//! Player input collaborator
//!
//! Target selection and yes/no questions are the only points where an
//! activation waits on the player. Both may be cancelled.

use std::collections::VecDeque;

use crate::targeting::{TargetRequest, Targeter};
use crate::world::Position;

pub trait Prompt {
    /// Ask for an aim point; `None` means the player cancelled.
    fn choose_target(
        &mut self,
        request: &TargetRequest,
        targeter: Option<&Targeter>,
    ) -> Option<Position>;

    fn confirm(&mut self, question: &str) -> bool;
}

/// Replays canned answers.
///
/// An exhausted target queue cancels; an exhausted answer queue gives the
/// fallback answer, which is "no" unless set.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    targets: VecDeque<Option<Position>>,
    answers: VecDeque<bool>,
    fallback: bool,
    /// Every question asked, in order
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Position) -> Self {
        self.targets.push_back(Some(target));
        self
    }

    pub fn with_cancel(mut self) -> Self {
        self.targets.push_back(None);
        self
    }

    pub fn with_answer(mut self, answer: bool) -> Self {
        self.answers.push_back(answer);
        self
    }

    /// Answer every question beyond the queued ones with `answer`.
    pub fn answering(mut self, answer: bool) -> Self {
        self.fallback = answer;
        self
    }
}

impl Prompt for ScriptedPrompt {
    fn choose_target(
        &mut self,
        _request: &TargetRequest,
        _targeter: Option<&Targeter>,
    ) -> Option<Position> {
        self.targets.pop_front().flatten()
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.answers.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targeting::TargetMode;

    #[test]
    fn test_scripted_replay() {
        let request = TargetRequest {
            range: 3,
            mode: TargetMode::Any,
            needs_path: false,
            not_self: true,
        };
        let mut prompt = ScriptedPrompt::new()
            .with_target(Position::new(1, 2))
            .with_cancel()
            .with_answer(true);

        assert_eq!(prompt.choose_target(&request, None), Some(Position::new(1, 2)));
        assert_eq!(prompt.choose_target(&request, None), None);
        assert_eq!(prompt.choose_target(&request, None), None);
        assert!(prompt.confirm("Really?"));
        assert!(!prompt.confirm("Really really?"));
        assert_eq!(prompt.asked.len(), 2);
    }

    #[test]
    fn test_fallback_answer() {
        let mut prompt = ScriptedPrompt::new().with_answer(false).answering(true);
        assert!(!prompt.confirm("First?"));
        assert!(prompt.confirm("Second?"));
        assert!(prompt.confirm("Third?"));
    }
}
