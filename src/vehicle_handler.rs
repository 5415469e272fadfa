use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Query, Request, State},
    http::header,
    Json,
};
use std::sync::Arc;

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{CsvImportBody, ImportResponse, VehicleCompatibility, VehicleFilter, VehicleListQuery};
use crate::vehicle_import;

/// Largest CSV body accepted, matching the router's request limit.
pub const MAX_CSV_BYTES: usize = 5 * 1024 * 1024;

const DEFAULT_VEHICLE_LIMIT: i64 = 100;
const MAX_VEHICLE_LIMIT: i64 = 1000;

/// POST /api/v1/vehicles/import
///
/// Accepts the CSV as a multipart `file` field, as JSON `{csv}` / `{data}`,
/// or as a raw text body.
pub async fn import_vehicles(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<ImportResponse>, AppError> {
    let csv_text = read_csv_body(request).await?;
    tracing::info!("POST /vehicles/import - {} bytes", csv_text.len());

    let summary = vehicle_import::import_vehicles(state.vehicles.as_ref(), &csv_text).await?;

    Ok(Json(ImportResponse {
        success: true,
        imported: summary.imported,
        total: summary.total,
    }))
}

/// GET /api/v1/vehicles
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VehicleListQuery>,
) -> Result<Json<Vec<VehicleCompatibility>>, AppError> {
    let filter = VehicleFilter {
        brand: params
            .brand
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty()),
        limit: params
            .limit
            .unwrap_or(DEFAULT_VEHICLE_LIMIT)
            .clamp(1, MAX_VEHICLE_LIMIT),
    };

    let vehicles = state.vehicles.list_vehicles(&filter).await?;
    Ok(Json(vehicles))
}

async fn read_csv_body(request: Request) -> Result<String, AppError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        return read_multipart_file(request).await;
    }

    let bytes = to_bytes(request.into_body(), MAX_CSV_BYTES)
        .await
        .map_err(|e| AppError::validation(format!("Failed to read request body: {}", e)))?;

    if content_type.starts_with("application/json") {
        let body: CsvImportBody = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::validation(format!("Invalid JSON body: {}", e)))?;
        return body
            .csv
            .filter(|c| !c.is_empty())
            .or(body.data)
            .ok_or_else(|| AppError::validation("Missing csv content in JSON body"));
    }

    String::from_utf8(bytes.to_vec())
        .map_err(|_| AppError::validation("CSV body must be UTF-8 text"))
}

async fn read_multipart_file(request: Request) -> Result<String, AppError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            return field
                .text()
                .await
                .map_err(|e| AppError::validation(format!("Failed to read uploaded file: {}", e)));
        }
    }

    Err(AppError::validation("No file uploaded"))
}
