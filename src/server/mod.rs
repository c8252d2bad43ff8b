use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

mod models;

use models::{ErrorResponse, TabStateResponse, TabUpdateRequest, TranslationsResponse};

use crate::error::TranslateError;
use crate::service::{ServiceHandle, TranslateTexts};
use crate::settings::{Settings, SettingsPatch};

/// HTTP surface for external UIs, mirroring the service's message set:
/// settings CRUD, the translate RPC, and the per-session tab state.
pub async fn run_server(handle: ServiceHandle, addr: String) -> Result<()> {
    let app = router(handle);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| "failed to bind server address")?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(handle: ServiceHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/settings", get(get_settings).post(update_settings))
        .route("/translate", post(translate))
        .route("/tabs", get(get_tabs).post(set_tab))
        .with_state(handle)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: TranslateError) -> ApiError {
    let status = match &err {
        TranslateError::Configuration(_) => StatusCode::BAD_REQUEST,
        TranslateError::Provider { .. } | TranslateError::EmptyResponse => StatusCode::BAD_GATEWAY,
        TranslateError::ServiceClosed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

async fn get_settings(State(handle): State<ServiceHandle>) -> Result<Json<Settings>, ApiError> {
    handle.get_settings().await.map(Json).map_err(api_error)
}

async fn update_settings(
    State(handle): State<ServiceHandle>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, ApiError> {
    handle
        .update_settings(patch)
        .await
        .map(Json)
        .map_err(api_error)
}

async fn translate(
    State(handle): State<ServiceHandle>,
    Json(payload): Json<TranslateTexts>,
) -> Result<Json<TranslationsResponse>, ApiError> {
    let translations = handle.translate_texts(payload).await.map_err(api_error)?;
    Ok(Json(TranslationsResponse { translations }))
}

async fn get_tabs(State(handle): State<ServiceHandle>) -> Result<Json<TabStateResponse>, ApiError> {
    let state = handle.get_tab_state().await.map_err(api_error)?;
    Ok(Json(TabStateResponse { state }))
}

async fn set_tab(
    State(handle): State<ServiceHandle>,
    Json(request): Json<TabUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    handle
        .set_tab_translation(request.tab_id, request.enabled)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
