use serde::Serialize;

use crate::{
    dao::models::Cue,
    state::{ChangeSource, ReplicaEvent},
};

/// SSE event name carrying a full state snapshot.
pub const STATE_EVENT: &str = "state";
/// SSE event name carrying a presentation cue.
pub const CUE_EVENT: &str = "cue";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Render a replica notification for display renderers.
    pub fn from_replica(event: &ReplicaEvent) -> serde_json::Result<Self> {
        match event {
            ReplicaEvent::StateChanged { state, .. } => {
                Self::json(Some(STATE_EVENT.to_string()), state.as_ref())
            }
            ReplicaEvent::Cue { cue, source } => Self::json(
                Some(CUE_EVENT.to_string()),
                &CuePayload {
                    cue,
                    remote: *source == ChangeSource::Remote,
                },
            ),
        }
    }
}

#[derive(Serialize)]
struct CuePayload<'a> {
    #[serde(flatten)]
    cue: &'a Cue,
    remote: bool,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{dao::models::CueKind, state::game::GameState};

    #[test]
    fn state_event_carries_camel_case_snapshot() {
        let event = ServerEvent::from_replica(&ReplicaEvent::StateChanged {
            state: Arc::new(GameState::default()),
            source: ChangeSource::Local,
        })
        .unwrap();

        assert_eq!(event.event.as_deref(), Some(STATE_EVENT));
        let value: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(value["bankEpoch"], 0);
        assert!(value.get("teamA").is_some());
    }

    #[test]
    fn cue_event_flattens_the_cue() {
        let event = ServerEvent::from_replica(&ReplicaEvent::Cue {
            cue: Cue {
                kind: CueKind::Award,
                timestamp: "2024-05-01T20:00:00Z".into(),
            },
            source: ChangeSource::Remote,
        })
        .unwrap();

        assert_eq!(event.event.as_deref(), Some(CUE_EVENT));
        let value: serde_json::Value = serde_json::from_str(&event.data).unwrap();
        assert_eq!(value["type"], "award");
        assert_eq!(value["remote"], true);
    }
}
