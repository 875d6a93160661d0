//! Run state types: what one pass through the agent loop remembers and
//! how a run ends.

use crate::capability::BoundArguments;
use crate::error::Error;

/// A remote result normalised to text.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    /// A single textual payload
    Text(String),
    /// Several content parts, in the order the server returned them
    Parts(Vec<String>),
}

impl std::fmt::Display for ActionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Parts(parts) => write!(f, "[{}]", parts.join(", ")),
        }
    }
}

/// One completed action cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    /// 1-based iteration number
    pub index: usize,
    pub capability_name: String,
    pub arguments: BoundArguments,
    pub result: ActionOutput,
}

impl IterationRecord {
    /// The sentence fed back to the oracle on later iterations.
    pub fn render(&self) -> String {
        format!(
            "In iteration {} you called {} with {} parameters, and the function returned {}.",
            self.index, self.capability_name, self.arguments, self.result
        )
    }
}

/// Mutable state of a single run, owned by the agent loop.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub iteration_count: usize,
    pub last_result: Option<ActionOutput>,
    pub history: Vec<IterationRecord>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished iteration and advance the counter.
    pub fn record(&mut self, capability_name: impl Into<String>, arguments: BoundArguments, result: ActionOutput) {
        self.iteration_count += 1;
        self.last_result = Some(result.clone());
        self.history.push(IterationRecord {
            index: self.iteration_count,
            capability_name: capability_name.into(),
            arguments,
            result,
        });
    }

    /// All rendered records joined into one block of text.
    pub fn joined_history(&self) -> String {
        self.history
            .iter()
            .map(IterationRecord::render)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Why a run ended without an answer.
#[derive(Debug)]
pub enum AbortReason {
    /// The loop ran out of iterations before the oracle declared completion
    IterationCeiling { limit: usize },
    /// A stage of the cycle failed
    Fault(Error),
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IterationCeiling { limit } => {
                write!(f, "no answer after {limit} iterations")
            }
            Self::Fault(e) => write!(f, "{e}"),
        }
    }
}

/// The terminal state of a run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        answer: String,
        history: Vec<IterationRecord>,
    },
    Aborted {
        reason: AbortReason,
        history: Vec<IterationRecord>,
    },
}

impl RunOutcome {
    /// The final answer, present only for completed runs.
    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Completed { answer, .. } => Some(answer),
            Self::Aborted { .. } => None,
        }
    }

    pub fn history(&self) -> &[IterationRecord] {
        match self {
            Self::Completed { history, .. } | Self::Aborted { history, .. } => history,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
