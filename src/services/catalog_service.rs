use crate::{dto::catalog::RoundSummary, state::SharedState};

/// List the rounds the host can load.
pub fn list_rounds(replica: &SharedState) -> Vec<RoundSummary> {
    replica
        .catalog()
        .iter()
        .enumerate()
        .map(|(index, round)| RoundSummary::new(index, round))
        .collect()
}
