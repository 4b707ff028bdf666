//! Wire form of host commands.
//!
//! Host adapters (buttons, keyboard mappers, remote panels) post loosely
//! typed JSON. Every field is optional and tolerant of the usual mistakes
//! (numbers sent as strings, lowercase team keys); [`ActionRequest::normalize`]
//! is the only place that decides whether a command is usable.

use serde::Deserialize;
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};

use crate::state::{
    action::Action,
    game::{MAX_ANSWERS, MAX_MULTIPLIER, Round, TeamId},
};

/// Command as received from a host adapter, tagged by `type`.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActionRequest {
    /// Put a round on the board.
    LoadRound {
        /// Round to copy onto the board.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        round: Option<Round>,
    },
    /// Uncover a slot.
    Reveal {
        /// Slot index, 0 to 7.
        #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
        #[serde(default)]
        index: Option<i64>,
    },
    /// Cover a slot again.
    Hide {
        /// Slot index, 0 to 7.
        #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
        #[serde(default)]
        index: Option<i64>,
    },
    /// Add a strike.
    #[serde(alias = "strike")]
    AddStrike {
        /// Team key.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        team: Option<String>,
    },
    /// Zero both teams' strikes.
    ClearStrikes,
    /// Register a buzz.
    #[serde(alias = "buzz")]
    BuzzIn {
        /// Team key.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        team: Option<String>,
    },
    /// Clear the buzzer.
    ResetBuzz,
    /// Pay the bank out.
    Award {
        /// Team key.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        team: Option<String>,
    },
    /// Freeze the bank without paying anyone.
    EndRound,
    /// Zero scores and strikes.
    ResetScores,
    /// Clear the board.
    ResetAll,
    /// Change the title.
    SetTitle {
        /// New title.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        title: Option<String>,
    },
    /// Change the title font.
    SetFont {
        /// New font name.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        font: Option<String>,
    },
    /// Change the round multiplier.
    SetMultiplier {
        /// 1 to 4; missing or zero means 1.
        #[serde_as(as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
        #[serde(default)]
        multiplier: Option<i64>,
    },
    /// Rename a team.
    SetTeamName {
        /// Team key.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        team: Option<String>,
        /// New display name.
        #[serde_as(as = "DefaultOnError")]
        #[serde(default)]
        name: Option<String>,
    },
    /// Anything with an unrecognised `type`.
    #[serde(other)]
    Unknown,
}

impl ActionRequest {
    /// Turn the request into an [`Action`], or `None` when it cannot be acted on.
    pub fn normalize(self) -> Option<Action> {
        let action = match self {
            ActionRequest::LoadRound { round } => Action::LoadRound(round?),
            ActionRequest::Reveal { index } => Action::Reveal(slot(index)?),
            ActionRequest::Hide { index } => Action::Hide(slot(index)?),
            ActionRequest::AddStrike { team } => Action::AddStrike(team_key(team)?),
            ActionRequest::ClearStrikes => Action::ClearStrikes,
            ActionRequest::BuzzIn { team } => Action::BuzzIn(team_key(team)?),
            ActionRequest::ResetBuzz => Action::ResetBuzz,
            ActionRequest::Award { team } => Action::Award(team_key(team)?),
            ActionRequest::EndRound => Action::EndRound,
            ActionRequest::ResetScores => Action::ResetScores,
            ActionRequest::ResetAll => Action::ResetAll,
            ActionRequest::SetTitle { title } => Action::SetTitle(title?.trim().to_string()),
            ActionRequest::SetFont { font } => {
                let font = font?.trim().to_string();
                if font.is_empty() {
                    return None;
                }
                Action::SetFont(font)
            }
            ActionRequest::SetMultiplier { multiplier } => {
                let value = multiplier.unwrap_or(1).clamp(1, i64::from(MAX_MULTIPLIER));
                Action::SetMultiplier(u8::try_from(value).ok()?)
            }
            ActionRequest::SetTeamName { team, name } => {
                Action::SetTeamName(team_key(team)?, name?)
            }
            ActionRequest::Unknown => return None,
        };
        Some(action)
    }
}

fn slot(index: Option<i64>) -> Option<usize> {
    usize::try_from(index?)
        .ok()
        .filter(|slot| *slot < MAX_ANSWERS)
}

fn team_key(team: Option<String>) -> Option<TeamId> {
    TeamId::parse(&team?)
}
