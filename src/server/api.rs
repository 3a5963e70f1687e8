use super::rate_limit::{ self, ClientIp, ClientRateLimiter };
use crate::models::chat::{ ErrorResponse, RelayRequest, RelayResponse };
use crate::relay::{ ChatRelay, RelayError };

use std::sync::Arc;
use axum::{
    routing::{ get, post },
    Router,
    extract::{ rejection::JsonRejection, Extension, State },
    middleware,
    response::{ IntoResponse, Response },
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };
use uuid::Uuid;

pub const LANDING_TEXT: &str = "Server operational — use frontend to chat.";
const ANSWER_PREVIEW_CHARS: usize = 100;

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

#[derive(Clone)]
pub struct AppState {
    pub relay: ChatRelay,
    pub limiter: Arc<ClientRateLimiter>,
    pub trust_proxy: bool,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::Provider(_) | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.public_message().to_string() })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(landing_handler))
        .route("/chat", post(chat_handler))
        .route("/api/reload-persona", get(reload_persona_handler))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(cors)
        .with_state(state)
}

fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(ANSWER_PREVIEW_CHARS).collect();
    if out.len() < text.len() {
        out.push_str("...");
    }
    out
}

async fn landing_handler() -> &'static str {
    LANDING_TEXT
}

async fn chat_handler(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Response {
    let request_id = Uuid::new_v4();

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!("[{}] Malformed conversation from IP: {} ({})", request_id, ip, rejection.body_text());
            return RelayError::InvalidInput(rejection.body_text()).into_response();
        }
    };

    match request.conversation.last() {
        Some(turn) => info!("[{}] Request from IP: {} | Query: \"{}\"", request_id, ip, turn.message),
        None => warn!("[{}] Empty conversation from IP: {}", request_id, ip),
    }

    match state.relay.handle(request).await {
        Ok(message) => {
            info!("[{}] Response to IP: {} | Answer: \"{}\"", request_id, ip, preview(&message));
            (StatusCode::OK, Json(RelayResponse { message })).into_response()
        }
        Err(e) => {
            match &e {
                RelayError::InvalidInput(reason) =>
                    warn!("[{}] Rejected request from IP: {}: {}", request_id, ip, reason),
                other => error!("[{}] API Error for IP: {}: {:?}", request_id, ip, other),
            }
            e.into_response()
        }
    }
}

async fn reload_persona_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.relay.persona().reload_if_changed().await {
        Ok(true) => (StatusCode::OK, Json(ReloadResponse {
            success: true,
            message: "Persona reloaded".into(),
        })),
        Ok(false) => (StatusCode::OK, Json(ReloadResponse {
            success: true,
            message: "Persona unchanged".into(),
        })),
        Err(e) => {
            error!("Persona reload failed: {}", e);
            (StatusCode::BAD_REQUEST, Json(ReloadResponse {
                success: false,
                message: format!("Persona error: {}", e),
            }))
        }
    }
}
