use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::{
    generators::{generate_display_name, generate_user_id},
    types::{CreateSessionRequest, SessionResponse},
};
use crate::shared::{AppError, AppState};

const MAX_DISPLAY_NAME_LENGTH: usize = 64;

/// HTTP handler for creating a guest session
///
/// POST /api/session
/// Returns a JWT plus the user id and display name it carries
#[instrument(name = "create_session", skip(state, request))]
pub async fn create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();

    let display_name = match request.display_name.as_deref().map(str::trim) {
        Some(name) if name.chars().count() > MAX_DISPLAY_NAME_LENGTH => {
            return Err(AppError::BadRequest(format!(
                "Display name is limited to {MAX_DISPLAY_NAME_LENGTH} characters"
            )));
        }
        Some(name) if !name.is_empty() => name.to_string(),
        _ => generate_display_name(),
    };
    let user_id = generate_user_id();

    let token = state
        .token_config
        .create_token(user_id.clone(), display_name.clone())?;

    info!(user_id = %user_id, display_name = %display_name, "Session created");

    Ok(Json(SessionResponse {
        token,
        user_id,
        display_name,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/api/session", axum::routing::post(create_session))
            .with_state(state)
    }

    async fn post(state: AppState, body: Body, json: bool) -> axum::response::Response {
        let mut request = Request::builder().method("POST").uri("/api/session");
        if json {
            request = request.header(header::CONTENT_TYPE, "application/json");
        }
        app(state)
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_session_with_generated_name() {
        let state = AppStateBuilder::new().build();

        let response = post(state.clone(), Body::empty(), false).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let session: SessionResponse = serde_json::from_slice(&body).unwrap();

        assert!(session.display_name.contains('-')); // Pet names have dashes
        assert!(session.user_id.starts_with("user-"));

        let claims = state.token_config.validate_token(&session.token).unwrap();
        assert_eq!(claims.sub, session.user_id);
        assert_eq!(claims.display_name, session.display_name);
    }

    #[tokio::test]
    async fn test_create_session_with_chosen_name() {
        let state = AppStateBuilder::new().build();

        let response = post(state, Body::from(r#"{"displayName":"  Alice "}"#), true).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let session: SessionResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(session.display_name, "Alice");
    }

    #[tokio::test]
    async fn test_overlong_display_name_is_rejected() {
        let state = AppStateBuilder::new().build();
        let body = serde_json::json!({ "displayName": "x".repeat(65) }).to_string();

        let response = post(state, Body::from(body), true).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
