//! Host command handling behind the REST routes.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    dto::action::ActionRequest,
    error::ServiceError,
    state::{Action, Role, SharedState, game::GameState},
};

fn ensure_host(replica: &SharedState) -> Result<(), ServiceError> {
    match replica.role() {
        Role::Host => Ok(()),
        Role::Display => Err(ServiceError::InvalidState(
            "display replicas do not accept actions".into(),
        )),
    }
}

/// Decode and dispatch a raw command body.
///
/// Commands that cannot be decoded or normalized are dropped and the current
/// state is returned unchanged.
pub async fn submit(
    replica: &SharedState,
    body: serde_json::Value,
) -> Result<Arc<GameState>, ServiceError> {
    ensure_host(replica)?;

    let action = serde_json::from_value::<ActionRequest>(body)
        .map_err(|err| debug!(error = %err, "undecodable action ignored"))
        .ok()
        .and_then(ActionRequest::normalize);

    match action {
        Some(action) => Ok(replica.dispatch(action).await),
        None => {
            debug!("action dropped during normalization");
            Ok(replica.current().await)
        }
    }
}

/// Copy catalog entry `index` onto the board.
pub async fn load_catalog_round(
    replica: &SharedState,
    index: usize,
) -> Result<Arc<GameState>, ServiceError> {
    ensure_host(replica)?;

    let round = replica
        .catalog()
        .get(index)
        .cloned()
        .ok_or_else(|| ServiceError::NotFound(format!("catalog round {index}")))?;

    info!(index, question = %round.question, "loading catalog round");
    Ok(replica.dispatch(Action::LoadRound(round)).await)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::{
        Replica,
        game::{Answer, Round},
    };

    fn catalog() -> Vec<Round> {
        vec![Round::new(
            "Something in a lunchbox",
            2,
            vec![Answer::new("Sandwich", 45), Answer::new("Apple", 20)],
        )]
    }

    #[tokio::test]
    async fn host_dispatches_decoded_actions() {
        let host = Replica::builder(Role::Host).with_catalog(catalog()).build();
        load_catalog_round(&host, 0).await.unwrap();

        let state = submit(&host, json!({ "type": "reveal", "index": "1" }))
            .await
            .unwrap();
        assert_eq!(state.bank, 40);
    }

    #[tokio::test]
    async fn malformed_commands_leave_state_untouched() {
        let host = Replica::builder(Role::Host).build();
        let before = host.current().await;

        for body in [
            json!({ "type": "reveal", "index": 42 }),
            json!({ "type": "award", "team": "Z" }),
            json!({ "index": 1 }),
            json!("reveal"),
        ] {
            let state = submit(&host, body).await.unwrap();
            assert_eq!(state, before);
        }
    }

    #[tokio::test]
    async fn display_rejects_actions() {
        let display = Replica::builder(Role::Display).with_catalog(catalog()).build();
        let err = submit(&display, json!({ "type": "resetAll" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(load_catalog_round(&display, 0).await.is_err());
    }

    #[tokio::test]
    async fn catalog_rounds_load_as_copies() {
        let host = Replica::builder(Role::Host).with_catalog(catalog()).build();
        load_catalog_round(&host, 0).await.unwrap();
        host.dispatch(Action::Reveal(0)).await;

        assert!(host.catalog()[0].answers.iter().all(|answer| !answer.revealed));
        assert!(matches!(
            load_catalog_round(&host, 5).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
