use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use assetsync_core::{RunKind, SanitizedConfig, ServiceStatus};

use crate::metrics::{collect_dynamic_metrics, encode_metrics, PUSH_REJECTED_TOTAL};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub config_hash: String,
    #[serde(flatten)]
    pub service: ServiceStatus,
}

/// Body of a push notification from the upstream.
#[derive(Debug, Default, Deserialize)]
pub struct PushNotification {
    #[serde(default)]
    pub channel_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub kind: RunKind,
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/status
///
/// Queue state and the report of the last finished run.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        config_hash: state.config_hash().to_string(),
        service: state.status(),
    })
}

/// POST /api/v1/sync
///
/// Request a full run outside the schedule.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<TriggerResponse>), impl IntoResponse> {
    match state.service().trigger_scheduled() {
        Ok(()) => {
            info!("Manual sync requested");
            Ok((
                StatusCode::ACCEPTED,
                Json(TriggerResponse {
                    kind: RunKind::Scheduled,
                    accepted: true,
                }),
            ))
        }
        Err(e) => Err(error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
    }
}

/// POST /api/v1/push
///
/// Upstream push notification. When a channel id is configured the
/// notification must carry the same one.
pub async fn push_notification(
    State(state): State<Arc<AppState>>,
    body: Option<Json<PushNotification>>,
) -> Result<(StatusCode, Json<TriggerResponse>), impl IntoResponse> {
    let Json(notification) = body.unwrap_or_default();

    if let Some(expected) = state.settings().push_channel_id.as_deref() {
        if notification.channel_id.as_deref() != Some(expected) {
            warn!(
                channel_id = ?notification.channel_id,
                "Push notification rejected, unknown channel"
            );
            PUSH_REJECTED_TOTAL
                .with_label_values(&["channel_mismatch"])
                .inc();
            return Err(error(StatusCode::FORBIDDEN, "unknown push channel"));
        }
    }

    match state.service().trigger_push() {
        Ok(()) => {
            info!(channel_id = ?notification.channel_id, "Push sync requested");
            Ok((
                StatusCode::ACCEPTED,
                Json(TriggerResponse {
                    kind: RunKind::Push,
                    accepted: true,
                }),
            ))
        }
        Err(e) => Err(error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
