use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::db_storage::{LeadStore, VehicleStore};
use crate::errors::AppError;
use crate::intake::{self, IntakeOutcome, THANK_YOU_MESSAGE};
use crate::models::*;
use crate::scoring::{MAX_SCORE, MIN_SCORE};
use crate::sheets_client::SheetForwarder;

const DEFAULT_LEAD_LIMIT: i64 = 50;
const MAX_LEAD_LIMIT: i64 = 500;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    pub leads: Arc<dyn LeadStore>,
    pub vehicles: Arc<dyn VehicleStore>,
    /// Best-effort export of new leads to the sales sheet.
    pub sheets: SheetForwarder,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "battery-leads-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/leads
///
/// Public form intake. Honeypot hits get the same success answer as real
/// submissions.
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Json<LeadSubmissionResponse>, AppError> {
    let Json(submission) =
        body.map_err(|e| AppError::validation(format!("Invalid request body: {}", e.body_text())))?;
    let outcome = intake::submit_lead(state.leads.as_ref(), &state.sheets, submission).await?;

    if let IntakeOutcome::Accepted { lead_id, forwarded, .. } = outcome {
        tracing::debug!("Lead {} accepted (forwarded: {})", lead_id, forwarded);
    }

    Ok(Json(LeadSubmissionResponse {
        success: true,
        message: THANK_YOU_MESSAGE.to_string(),
    }))
}

/// GET /api/v1/leads
///
/// Admin listing, newest first.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<LeadListQuery>,
) -> Result<Json<Vec<Lead>>, AppError> {
    require_admin(&state.config, &headers)?;

    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<LeadStatus>()
                .map_err(|_| AppError::validation(format!("Invalid status '{}'", s)))
        })
        .transpose()?;
    let lead_type = params
        .lead_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<LeadType>()
                .map_err(|_| AppError::validation("Invalid lead type"))
        })
        .transpose()?;

    let filter = LeadFilter {
        status,
        lead_type,
        limit: params
            .limit
            .unwrap_or(DEFAULT_LEAD_LIMIT)
            .clamp(1, MAX_LEAD_LIMIT),
    };

    let leads = state.leads.list_leads(&filter).await?;
    tracing::info!("GET /leads - {} lead(s)", leads.len());
    Ok(Json(leads))
}

/// PATCH /api/v1/leads/:id
///
/// Operator revision of status, notes or score. The score is clamped to the
/// same range the scorer produces.
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<LeadUpdateRequest>,
) -> Result<Json<Lead>, AppError> {
    require_admin(&state.config, &headers)?;

    let status = body
        .status
        .as_deref()
        .map(|s| {
            s.parse::<LeadStatus>()
                .map_err(|_| AppError::validation(format!("Invalid status '{}'", s)))
        })
        .transpose()?;

    let update = LeadUpdate {
        status,
        notes: body.notes,
        score: body.score.map(|s| s.clamp(MIN_SCORE, MAX_SCORE) as i32),
    };

    let lead = state
        .leads
        .update_lead(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))?;

    tracing::info!("Lead {} updated: status={}, score={}", lead.id, lead.status, lead.score);
    Ok(Json(lead))
}

/// Gate for admin routes: `Authorization: Bearer <ADMIN_API_TOKEN>`.
fn require_admin(config: &Config, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(ref expected) = config.admin_api_token else {
        return Err(AppError::Unauthorized(
            "ADMIN_API_TOKEN not configured".to_string(),
        ));
    };

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !constant_time_compare(token.trim(), expected) {
        return Err(AppError::Unauthorized("Invalid admin token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
