use {
    axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::{HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, patch, post},
    },
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
    tracing::warn,
};

use {
    switchboard_mappings::{AutoConnect, DirectionMatrix, Error as MappingError, NewMapping},
    switchboard_platforms::PlatformType,
    switchboard_routing::Error as RoutingError,
};

use crate::state::AppState;

/// Header Telegram echoes back when a webhook was registered with a secret
/// token.
const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/telegram/{instance_id}", post(telegram_webhook))
        .route("/webhooks/chatwoot/{instance_id}", post(chatwoot_webhook))
        .route("/api/mappings", post(create_mapping))
        .route("/api/mappings/{id}", patch(update_mapping))
        .route("/api/mappings/{id}/test", post(test_mapping))
        .route("/api/instances/{id}/routing", get(routing_configuration))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// An unset or empty secret disables the check.
fn webhook_secret_matches(expected: Option<&Secret<String>>, provided: Option<&str>) -> bool {
    match expected
        .map(ExposeSecret::expose_secret)
        .filter(|s| !s.is_empty())
    {
        Some(expected) => provided == Some(expected),
        None => true,
    }
}

/// Look up the addressed instance and validate the caller-supplied secret.
async fn authorize_webhook(
    state: &AppState,
    instance_id: &str,
    provided_secret: Option<&str>,
) -> Result<(), Response> {
    let instance = match state.instances.get_active(instance_id).await {
        Ok(Some(instance)) => instance,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "unknown or inactive instance" })),
            )
                .into_response());
        },
        Err(e) => {
            warn!(instance_id, error = %e, "instance lookup failed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
        },
    };
    if !webhook_secret_matches(instance.credentials.webhook_secret.as_ref(), provided_secret) {
        warn!(instance_id, "webhook secret mismatch");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid webhook secret" })),
        )
            .into_response());
    }
    Ok(())
}

/// Map broker errors: only a structurally invalid payload is the caller's
/// fault; everything else must not make the origin platform retry-storm.
fn broker_error_response(e: RoutingError) -> Response {
    match e {
        RoutingError::InvalidPayload { .. } | RoutingError::UnsupportedOrigin(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        RoutingError::Store(_) => {
            warn!(error = %e, "routing failed on persistence");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

pub async fn telegram_webhook(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let provided = headers
        .get(TELEGRAM_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(response) = authorize_webhook(&state, &instance_id, provided).await {
        return response;
    }
    match state
        .broker
        .handle(PlatformType::Telegram, &instance_id, payload)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => broker_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatwootWebhookQuery {
    #[serde(default)]
    token: Option<String>,
}

pub async fn chatwoot_webhook(
    State(state): State<AppState>,
    Path(instance_id): Path<String>,
    Query(query): Query<ChatwootWebhookQuery>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    if let Err(response) =
        authorize_webhook(&state, &instance_id, query.token.as_deref()).await
    {
        return response;
    }
    match state
        .broker
        .handle(PlatformType::Chatwoot, &instance_id, payload)
        .await
    {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => broker_error_response(e),
    }
}

fn mapping_error_response(e: MappingError) -> Response {
    let status = match &e {
        MappingError::Validation { .. } => StatusCode::BAD_REQUEST,
        MappingError::Conflict { .. } => StatusCode::CONFLICT,
        MappingError::NotFound { .. } => StatusCode::NOT_FOUND,
        MappingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CreateMappingRequest {
    pub source_instance_id: String,
    #[serde(default)]
    pub chatwoot_instance_id: Option<String>,
    #[serde(default)]
    pub dify_instance_id: Option<String>,
    #[serde(default)]
    pub directions: DirectionMatrix,
    #[serde(default)]
    pub auto_connect: AutoConnect,
    #[serde(default)]
    pub created_by: Option<String>,
}

pub async fn create_mapping(
    State(state): State<AppState>,
    Json(request): Json<CreateMappingRequest>,
) -> Response {
    let actor = request.created_by.unwrap_or_else(|| "api".into());
    let new = NewMapping {
        source_platform: PlatformType::Telegram,
        source_instance_id: request.source_instance_id,
        chatwoot_instance_id: request.chatwoot_instance_id,
        dify_instance_id: request.dify_instance_id,
        directions: request.directions,
        auto_connect: request.auto_connect,
    };
    match state.mappings.create_mapping(new, &actor).await {
        Ok(mapping) => (StatusCode::CREATED, Json(mapping)).into_response(),
        Err(e) => mapping_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateMappingRequest {
    #[serde(default)]
    pub directions: Option<DirectionMatrix>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

pub async fn update_mapping(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateMappingRequest>,
) -> Response {
    let mut updated = None;
    if let Some(directions) = request.directions {
        match state.mappings.update_directions(&id, directions).await {
            Ok(mapping) => updated = Some(mapping),
            Err(e) => return mapping_error_response(e),
        }
    }
    if let Some(active) = request.is_active {
        match state.mappings.set_active(&id, active).await {
            Ok(mapping) => updated = Some(mapping),
            Err(e) => return mapping_error_response(e),
        }
    }
    match updated {
        Some(mapping) => Json(mapping).into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "nothing to update" })),
        )
            .into_response(),
    }
}

pub async fn test_mapping(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.mappings.test_connection(&id).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => mapping_error_response(e),
    }
}

pub async fn routing_configuration(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.mappings.get_routing_configuration(&id).await {
        Ok(config) => Json(config).into_response(),
        Err(e) => mapping_error_response(e),
    }
}
