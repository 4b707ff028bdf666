//! Replicated game model: rounds, answers, teams and the aggregate [`GameState`].
//!
//! Every type here deserializes leniently. Missing fields fall back to their
//! defaults and malformed scalar values (a string where points are expected,
//! an unknown team key) are replaced by the default instead of failing the
//! whole snapshot, so a stale or partially written record still hydrates.

use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};
use utoipa::ToSchema;

use crate::state::bank;

/// Maximum number of answer slots on the board.
pub const MAX_ANSWERS: usize = 8;
/// Strike counter ceiling for a team.
pub const MAX_STRIKES: u8 = 3;
/// Highest accepted round multiplier.
pub const MAX_MULTIPLIER: u8 = 4;
/// Largest epoch accepted from outside the reducer (the largest integer a JSON number holds exactly).
pub const MAX_LOADED_EPOCH: u64 = (1 << 53) - 1;
/// Title shown before the host changes it.
pub const DEFAULT_TITLE: &str = "K'mmunity Klash";
/// Font shown before the host changes it.
pub const DEFAULT_FONT: &str = "bangers";

/// Key of one of the two fixed teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TeamId {
    /// Left-hand team.
    A,
    /// Right-hand team.
    B,
}

impl TeamId {
    /// Both teams, in board order.
    pub const ALL: [TeamId; 2] = [TeamId::A, TeamId::B];

    /// Parse a loosely formatted team key (`"A"`, `"b"`, `"teamA"`).
    ///
    /// Anything else yields `None` so callers can ignore the command.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a" | "teama" | "team_a" => Some(Self::A),
            "b" | "teamb" | "team_b" => Some(Self::B),
            _ => None,
        }
    }

    fn default_name(self) -> &'static str {
        match self {
            TeamId::A => "Team A",
            TeamId::B => "Team B",
        }
    }
}

/// One ranked answer slot of a round.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Answer {
    /// Text uncovered on reveal.
    #[serde_as(as = "DefaultOnError")]
    pub text: String,
    /// Points the answer is worth before the round multiplier.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub points: u32,
    /// Display flag: the answer is currently uncovered.
    #[serde_as(as = "DefaultOnError")]
    pub revealed: bool,
    /// Bank epoch in which the slot was last revealed.
    #[serde_as(as = "DefaultOnError")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_epoch: Option<u64>,
}

impl Answer {
    /// Build a covered answer.
    pub fn new(text: impl Into<String>, points: u32) -> Self {
        Self {
            text: text.into(),
            points,
            revealed: false,
            revealed_epoch: None,
        }
    }
}

/// A question with its ranked answers and point multiplier.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Round {
    /// Question read out by the host.
    #[serde_as(as = "DefaultOnError")]
    pub question: String,
    /// Point multiplier in `1..=4`.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub multiplier: u8,
    /// Up to [`MAX_ANSWERS`] answers, best first.
    #[serde_as(as = "DefaultOnError")]
    pub answers: Vec<Answer>,
}

impl Default for Round {
    fn default() -> Self {
        Self {
            question: String::new(),
            multiplier: 1,
            answers: Vec::new(),
        }
    }
}

impl Round {
    /// Build a round, clamping the multiplier and dropping answers past the board size.
    pub fn new(question: impl Into<String>, multiplier: u8, answers: Vec<Answer>) -> Self {
        Self {
            question: question.into(),
            multiplier,
            answers,
        }
        .normalized()
    }

    /// Copy of this round with every slot covered and its epoch stamp cleared.
    pub fn fresh(&self) -> Self {
        let mut round = self.clone().normalized();
        for answer in &mut round.answers {
            answer.revealed = false;
            answer.revealed_epoch = None;
        }
        round
    }

    /// Enforce the structural limits of a round.
    pub fn normalized(mut self) -> Self {
        self.multiplier = clamp_multiplier(self.multiplier);
        self.answers.truncate(MAX_ANSWERS);
        self
    }
}

/// Coerce a multiplier into `1..=4`; zero means "unset" and maps to 1.
pub fn clamp_multiplier(value: u8) -> u8 {
    value.clamp(1, MAX_MULTIPLIER)
}

/// Score and strike tracking for one team.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct Team {
    /// Display name.
    #[serde_as(as = "DefaultOnError")]
    pub name: String,
    /// Accumulated score.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub score: u64,
    /// Strikes against the team in the current round, `0..=3`.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub strikes: u8,
}

impl Team {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            strikes: 0,
        }
    }
}

/// Aggregate root replicated between the host and display processes.
///
/// `bank` is derived from the active round and `bank_epoch`; it only changes
/// through [`bank::recompute`] or when an award/freeze zeroes it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GameState {
    /// Show title.
    #[serde_as(as = "DefaultOnError")]
    pub title: String,
    /// Font used for the title on display views.
    #[serde_as(as = "DefaultOnError")]
    pub display_font: String,
    /// Round on the board, if one has been loaded.
    #[serde_as(as = "DefaultOnError")]
    pub active_round: Option<Round>,
    /// Payout boundary counter; only reveals stamped with it count toward the bank.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub bank_epoch: u64,
    /// Points waiting to be awarded.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub bank: u64,
    /// Team A.
    #[serde_as(as = "DefaultOnError")]
    pub team_a: Team,
    /// Team B.
    #[serde_as(as = "DefaultOnError")]
    pub team_b: Team,
    /// Team currently holding the buzzer register.
    #[serde_as(as = "DefaultOnError")]
    pub buzz: Option<TeamId>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(
            DEFAULT_TITLE,
            DEFAULT_FONT,
            TeamId::A.default_name(),
            TeamId::B.default_name(),
        )
    }
}

impl GameState {
    /// Session start state with the given presentation settings and no round loaded.
    pub fn new(
        title: impl Into<String>,
        display_font: impl Into<String>,
        team_a: impl Into<String>,
        team_b: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            display_font: display_font.into(),
            active_round: None,
            bank_epoch: 0,
            bank: 0,
            team_a: Team::named(team_a),
            team_b: Team::named(team_b),
            buzz: None,
        }
    }

    /// Borrow a team by key.
    pub fn team(&self, id: TeamId) -> &Team {
        match id {
            TeamId::A => &self.team_a,
            TeamId::B => &self.team_b,
        }
    }

    /// Mutably borrow a team by key.
    pub fn team_mut(&mut self, id: TeamId) -> &mut Team {
        match id {
            TeamId::A => &mut self.team_a,
            TeamId::B => &mut self.team_b,
        }
    }

    /// Start a new payout epoch. Reveals stamped with an earlier epoch stop counting.
    pub fn advance_epoch(&mut self) {
        self.bank_epoch = self.bank_epoch.saturating_add(1);
    }

    /// Restore every invariant on a state that came from outside the reducer.
    ///
    /// States produced by the reducer are already normalized, so this is the
    /// identity on them.
    pub fn normalized(mut self) -> Self {
        self.active_round = self.active_round.map(Round::normalized);
        let stamps_trusted = self.bank_epoch <= MAX_LOADED_EPOCH;
        self.bank_epoch = self.bank_epoch.min(MAX_LOADED_EPOCH);
        let epoch = self.bank_epoch;
        if let Some(round) = self.active_round.as_mut() {
            for answer in &mut round.answers {
                // stamps from an out-of-range or future epoch must never count
                if !stamps_trusted || answer.revealed_epoch.is_some_and(|stamp| stamp > epoch) {
                    answer.revealed_epoch = None;
                }
            }
        }
        for id in TeamId::ALL {
            let team = self.team_mut(id);
            team.strikes = team.strikes.min(MAX_STRIKES);
            if team.name.trim().is_empty() {
                team.name = id.default_name().to_string();
            }
        }
        self.bank = bank::recompute(self.active_round.as_ref(), self.bank_epoch);
        self
    }
}
