use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};
use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::game::GameState;

/// Version of the durable snapshot record layout.
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Kind of presentation cue carried on the bus (sound effects, flashes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    /// An answer was uncovered.
    Reveal,
    /// A strike was added.
    Strike,
    /// A team buzzed in.
    Buzz,
    /// The bank was awarded.
    Award,
    /// Scores or the whole board were reset.
    Reset,
}

/// Ephemeral cue published alongside state; never persisted nor replicated as state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Cue {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: CueKind,
    /// RFC 3339 UTC timestamp taken by the emitting replica.
    pub timestamp: String,
}

impl Cue {
    /// Stamp a cue with the current wall-clock time.
    pub fn now(kind: CueKind) -> Self {
        Self {
            kind,
            timestamp: format_system_time(SystemTime::now()),
        }
    }
}

/// Record stored in the durable snapshot slot.
///
/// `origin` and `seq` let replicas polling the slot skip snapshots they wrote
/// themselves or have already applied.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotEnvelope {
    /// Layout version, see [`SNAPSHOT_FORMAT`].
    #[serde_as(as = "DefaultOnError")]
    pub format: u32,
    /// Replica that produced the snapshot.
    #[serde_as(as = "DefaultOnError")]
    pub origin: Uuid,
    /// Per-origin sequence number of the mutation.
    #[serde_as(as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub seq: u64,
    /// Full game state.
    pub state: GameState,
}

impl Default for SnapshotEnvelope {
    fn default() -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            origin: Uuid::nil(),
            seq: 0,
            state: GameState::default(),
        }
    }
}

impl SnapshotEnvelope {
    /// Decode a stored record.
    ///
    /// Records written before the envelope existed hold a bare game state;
    /// those are accepted with a nil origin and sequence zero.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_str(raw)?;
        if value.get("state").is_some() {
            return serde_json::from_value(value);
        }

        let state = serde_json::from_value(value)?;
        Ok(Self {
            state,
            ..Self::default()
        })
    }
}

/// Message exchanged on the device-local broadcast bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BusMessage {
    /// Full replication of the sender's state.
    State {
        /// Sending replica.
        origin: Uuid,
        /// Sender's sequence number for this snapshot.
        seq: u64,
        /// Complete game state after the mutation.
        snapshot: GameState,
    },
    /// Presentation cue, not part of the replicated state.
    Event {
        /// Sending replica.
        origin: Uuid,
        /// The cue itself.
        #[serde(flatten)]
        cue: Cue,
    },
}

impl BusMessage {
    /// Replica that published the message.
    pub fn origin(&self) -> Uuid {
        match self {
            BusMessage::State { origin, .. } | BusMessage::Event { origin, .. } => *origin,
        }
    }
}

impl From<SnapshotEnvelope> for BusMessage {
    fn from(value: SnapshotEnvelope) -> Self {
        BusMessage::State {
            origin: value.origin,
            seq: value.seq,
            snapshot: value.state,
        }
    }
}

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_survives_storage_encoding() {
        let envelope = SnapshotEnvelope {
            format: SNAPSHOT_FORMAT,
            origin: Uuid::new_v4(),
            seq: 7,
            state: GameState::default(),
        };
        let raw = serde_json::to_string(&envelope).unwrap();
        assert_eq!(SnapshotEnvelope::from_json(&raw).unwrap(), envelope);
    }

    #[test]
    fn bare_legacy_state_is_accepted() {
        let raw = r#"{ "title": "Old show", "bank": 0 }"#;
        let envelope = SnapshotEnvelope::from_json(raw).unwrap();
        assert_eq!(envelope.origin, Uuid::nil());
        assert_eq!(envelope.seq, 0);
        assert_eq!(envelope.state.title, "Old show");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(SnapshotEnvelope::from_json("not json").is_err());
    }

    #[test]
    fn event_message_is_tagged() {
        let message = BusMessage::Event {
            origin: Uuid::nil(),
            cue: Cue {
                kind: CueKind::Strike,
                timestamp: "2024-01-01T00:00:00Z".into(),
            },
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["kind"], "event");
        assert_eq!(value["type"], "strike");
        assert_eq!(value["timestamp"], "2024-01-01T00:00:00Z");

        let back: BusMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }
}
