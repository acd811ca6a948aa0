//! Clarification Dialogue (4.6.2): advances a `ClarificationSession`
//! through a four-state machine, producing a clarified request from the
//! user's per-ambiguity answers.

use super::types::{Ambiguity, AmbiguityKind};
use crate::error::{CascadeError, CascadeResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    PresentingChoices,
    WaitingForInput,
    ProcessingInput,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub free_text_allowed: bool,
    pub parenthetical: Option<String>,
}

fn skip_choice() -> Choice {
    Choice { id: "skip".to_string(), label: "Skip".to_string(), free_text_allowed: false, parenthetical: None }
}

/// Family-specific choice set for one ambiguity kind.
fn choices_for(kind: AmbiguityKind) -> Vec<Choice> {
    match kind {
        AmbiguityKind::UndefinedTerm => vec![
            Choice {
                id: "improve_performance".to_string(),
                label: "Improve performance".to_string(),
                free_text_allowed: false,
                parenthetical: Some("performance: speed, efficiency".to_string()),
            },
            Choice {
                id: "improve_quality".to_string(),
                label: "Improve quality".to_string(),
                free_text_allowed: false,
                parenthetical: Some("quality: correctness, reliability".to_string()),
            },
            Choice {
                id: "improve_ux".to_string(),
                label: "Improve UX".to_string(),
                free_text_allowed: false,
                parenthetical: Some("UX: usability, clarity".to_string()),
            },
            Choice {
                id: "improve_features".to_string(),
                label: "Improve features".to_string(),
                free_text_allowed: false,
                parenthetical: Some("features: functionality, capability".to_string()),
            },
            skip_choice(),
        ],
        AmbiguityKind::MissingContext | AmbiguityKind::VagueQuantifier => vec![
            Choice {
                id: "specify_number".to_string(),
                label: "Specify a number".to_string(),
                free_text_allowed: true,
                parenthetical: None,
            },
            skip_choice(),
        ],
        AmbiguityKind::AmbiguousReference | AmbiguityKind::UnclearScope | AmbiguityKind::SubjectiveCriteria => vec![
            Choice {
                id: "specify".to_string(),
                label: "Provide specifics".to_string(),
                free_text_allowed: true,
                parenthetical: None,
            },
            skip_choice(),
        ],
    }
}

#[derive(Debug, Clone)]
enum EditOp {
    ReplaceSpan(String),
    InsertAfter(String),
}

#[derive(Debug, Clone)]
struct Answer {
    choice_id: String,
    free_text: Option<String>,
}

pub struct ClarificationSession {
    ambiguities: Vec<Ambiguity>,
    answers: Vec<Option<Answer>>,
    cursor: usize,
    state: SessionState,
}

impl ClarificationSession {
    /// `ambiguities` must already be sorted (as `detect()` returns them) by
    /// confidence descending.
    pub fn new(ambiguities: Vec<Ambiguity>) -> Self {
        let len = ambiguities.len();
        Self { ambiguities, answers: vec![None; len], cursor: 0, state: SessionState::Initializing }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Begin the session, moving to `presenting_choices` for the first
    /// ambiguity (or directly to `completed` if there is nothing to ask).
    pub fn start(&mut self) {
        if self.ambiguities.is_empty() {
            self.state = SessionState::Completed;
        } else {
            self.state = SessionState::PresentingChoices;
        }
    }

    pub fn current_ambiguity(&self) -> Option<&Ambiguity> {
        self.ambiguities.get(self.cursor)
    }

    pub fn current_choices(&self) -> Vec<Choice> {
        self.current_ambiguity()
            .map(|a| choices_for(a.kind))
            .unwrap_or_default()
    }

    pub fn await_input(&mut self) -> CascadeResult<()> {
        if self.state != SessionState::PresentingChoices {
            return Err(CascadeError::Internal("await_input called outside presenting_choices".into()));
        }
        self.state = SessionState::WaitingForInput;
        Ok(())
    }

    /// Submit the user's answer for the current ambiguity and advance.
    pub fn submit_answer(&mut self, choice_id: impl Into<String>, free_text: Option<String>) -> CascadeResult<()> {
        if !matches!(self.state, SessionState::WaitingForInput | SessionState::PresentingChoices) {
            return Err(CascadeError::Internal("submit_answer called outside an open turn".into()));
        }
        self.state = SessionState::ProcessingInput;
        self.answers[self.cursor] = Some(Answer { choice_id: choice_id.into(), free_text });
        self.cursor += 1;
        if self.cursor >= self.ambiguities.len() {
            self.state = SessionState::Completed;
        } else {
            self.state = SessionState::PresentingChoices;
        }
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.state = SessionState::Cancelled;
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Build the clarified request by substituting free-text inputs into
    /// the original span, or appending family-specific contextual
    /// parentheticals for structured choices.
    pub fn clarified_request(&self, original: &str) -> CascadeResult<String> {
        if self.state != SessionState::Completed {
            return Err(CascadeError::Internal("clarified_request called before completion".into()));
        }

        let mut edits: Vec<((usize, usize), EditOp)> = Vec::new();
        for (ambiguity, answer) in self.ambiguities.iter().zip(self.answers.iter()) {
            let Some(answer) = answer else { continue };
            if answer.choice_id == "skip" {
                continue;
            }
            let choices = choices_for(ambiguity.kind);
            let Some(choice) = choices.iter().find(|c| c.id == answer.choice_id) else { continue };

            if choice.free_text_allowed {
                if let Some(text) = &answer.free_text {
                    edits.push((ambiguity.span, EditOp::ReplaceSpan(text.clone())));
                }
            } else if let Some(parenthetical) = &choice.parenthetical {
                edits.push((ambiguity.span, EditOp::InsertAfter(format!(" ({parenthetical})"))));
            }
        }

        edits.sort_by_key(|(span, _)| span.0);

        let mut output = String::with_capacity(original.len());
        let mut last_end = 0usize;
        for ((start, end), op) in edits {
            output.push_str(&original[last_end..start]);
            match op {
                EditOp::ReplaceSpan(text) => {
                    output.push_str(&text);
                }
                EditOp::InsertAfter(text) => {
                    output.push_str(&original[start..end]);
                    output.push_str(&text);
                }
            }
            last_end = end;
        }
        output.push_str(&original[last_end..]);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::ambiguity;

    #[test]
    fn skip_all_yields_input_unchanged() {
        let input = "Make it faster and better";
        let ambiguities = ambiguity::detect(input);
        let mut session = ClarificationSession::new(ambiguities);
        session.start();
        while !session.is_completed() {
            session.submit_answer("skip", None).unwrap();
        }
        assert_eq!(session.clarified_request(input).unwrap(), input);
    }

    #[test]
    fn scenario_s3_clarified_request() {
        let input = "Make it faster and better";
        let ambiguities = ambiguity::detect(input);
        assert!(ambiguities.len() >= 2);

        let mut session = ClarificationSession::new(ambiguities);
        session.start();

        // First ambiguity (highest confidence) is "it" (missing_context) -> free text "5".
        assert_eq!(session.current_ambiguity().unwrap().kind, AmbiguityKind::MissingContext);
        session.submit_answer("specify_number", Some("5".to_string())).unwrap();

        // Second ambiguity is "faster" (undefined_term) -> structured choice.
        assert_eq!(session.current_ambiguity().unwrap().kind, AmbiguityKind::UndefinedTerm);
        session.submit_answer("improve_performance", None).unwrap();

        // Remaining ambiguities (e.g. "better") are skipped.
        while !session.is_completed() {
            session.submit_answer("skip", None).unwrap();
        }

        let clarified = session.clarified_request(input).unwrap();
        assert_eq!(clarified, "Make 5 faster (performance: speed, efficiency) and better");
    }

    #[test]
    fn cancel_leaves_session_cancelled() {
        let ambiguities = ambiguity::detect("Make it faster and better");
        let mut session = ClarificationSession::new(ambiguities);
        session.start();
        session.cancel();
        assert_eq!(*session.state(), SessionState::Cancelled);
    }

    #[test]
    fn empty_ambiguities_completes_immediately() {
        let mut session = ClarificationSession::new(vec![]);
        session.start();
        assert!(session.is_completed());
    }
}
