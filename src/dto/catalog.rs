use serde::Serialize;
use utoipa::ToSchema;

use crate::state::game::Round;

/// One catalog entry as listed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoundSummary {
    /// Position in the catalog, used to load the round.
    pub index: usize,
    /// Question text.
    pub question: String,
    /// Point multiplier.
    pub multiplier: u8,
    /// Number of answer slots.
    pub answers: usize,
}

impl RoundSummary {
    /// Summarize the catalog entry at `index`.
    pub fn new(index: usize, round: &Round) -> Self {
        Self {
            index,
            question: round.question.clone(),
            multiplier: round.multiplier,
            answers: round.answers.len(),
        }
    }
}
