use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the klash replica API.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::stream,
        crate::routes::game::current_state,
        crate::routes::game::submit_action,
        crate::routes::game::list_catalog,
        crate::routes::game::load_catalog_round,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::catalog::RoundSummary,
            crate::dao::models::Cue,
            crate::dao::models::CueKind,
            crate::state::game::GameState,
            crate::state::game::Round,
            crate::state::game::Answer,
            crate::state::game::Team,
            crate::state::game::TeamId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Board state, host commands and round catalog"),
        (name = "sse", description = "Server-sent events stream for displays"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/sse",
            "/state",
            "/actions",
            "/catalog",
            "/catalog/{index}/load",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
