use reqwest::StatusCode;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::errors::AppError;
use crate::models::{payload_get, value_to_text, Lead, LeadPayload};
use crate::obs::phone_fingerprint;

/// Header order of the lead sheet. Rows must match it cell for cell.
pub const SHEET_COLUMNS: [&str; 22] = [
    "Timestamp",
    "Source",
    "Name",
    "Phone",
    "Email",
    "Query Type",
    "Message",
    "Company",
    "Contact Person",
    "Quantity",
    "Timeline",
    "Comments",
    "Vehicle Brand",
    "Vehicle Model",
    "Vehicle Variant",
    "Load (W)",
    "Backup Hours",
    "UPS Type",
    "Roof Type",
    "Roof Area",
    "Monthly Bill",
    "Extra",
];

/// Payload keys feeding the payload-backed columns, first present key wins.
/// Indexes refer to `SHEET_COLUMNS`.
const PAYLOAD_COLUMNS: &[(usize, &[&str])] = &[
    (2, &["name"]),
    (4, &["email"]),
    (6, &["message"]),
    (7, &["companyName", "company", "organisation"]),
    (8, &["contactPerson"]),
    (9, &["quantity"]),
    (10, &["timeline"]),
    (11, &["comments"]),
    (12, &["vehicleBrand", "brand"]),
    (13, &["vehicleModel", "model"]),
    (14, &["vehicleVariant", "fuelType"]),
    (15, &["loadEstimate", "totalWatts"]),
    (16, &["backupHours"]),
    (17, &["upsType"]),
    (18, &["roofType"]),
    (19, &["roofArea"]),
    (20, &["monthlyBill"]),
];

const EXTRA_COLUMN: usize = 21;

/// Why a row did not reach the sheet.
#[derive(Debug)]
pub enum ForwardError {
    /// No web app URL configured. The normal state for most deployments.
    NotConfigured,
    /// The request never completed.
    Transport(reqwest::Error),
    /// The sink answered with a non-success status.
    Status(StatusCode, String),
    /// The sink answered 2xx without `"ok": true`.
    NotAcknowledged(Value),
    /// The sink answered 2xx with a body that is not JSON.
    MalformedResponse(reqwest::Error),
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardError::NotConfigured => write!(f, "sheet forwarding not configured"),
            ForwardError::Transport(e) => write!(f, "sheet request failed: {}", e),
            ForwardError::Status(status, body) => {
                write!(f, "sheet returned {}: {}", status, body)
            }
            ForwardError::NotAcknowledged(body) => {
                write!(f, "sheet did not acknowledge row: {}", body)
            }
            ForwardError::MalformedResponse(e) => {
                write!(f, "failed to parse sheet response: {}", e)
            }
        }
    }
}

impl std::error::Error for ForwardError {}

/// Best-effort exporter of leads to a spreadsheet web app.
///
/// `forward` never fails: every problem is logged and reported as `false`.
#[derive(Clone)]
pub struct SheetForwarder {
    client: reqwest::Client,
    url: Option<String>,
    key: String,
}

impl SheetForwarder {
    /// Creates a forwarder. A `None` or blank URL disables forwarding.
    pub fn new(url: Option<String>, key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create sheet client: {}", e))
            })?;

        Ok(Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
            key,
        })
    }

    /// A forwarder with no sink.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
            key: String::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Appends the lead to the sheet. `true` only when the sink acknowledged it.
    pub async fn forward(&self, lead: &Lead) -> bool {
        match self.try_forward(lead).await {
            Ok(()) => {
                tracing::info!("✓ Lead {} forwarded to sheet", lead.id);
                true
            }
            Err(ForwardError::NotConfigured) => {
                tracing::debug!("Sheet forwarding disabled, skipping lead {}", lead.id);
                false
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️  Sheet forwarding failed for lead {} (phone #{}): {}",
                    lead.id,
                    phone_fingerprint(&lead.phone),
                    e
                );
                false
            }
        }
    }

    async fn try_forward(&self, lead: &Lead) -> Result<(), ForwardError> {
        let url = self.url.as_deref().ok_or(ForwardError::NotConfigured)?;

        let body = json!({
            "key": self.key,
            "action": "append_lead",
            "row": build_sheet_row(lead),
            "source": lead.source,
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(ForwardError::Transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ForwardError::Status(status, error_text));
        }

        let ack: Value = response
            .json()
            .await
            .map_err(ForwardError::MalformedResponse)?;

        if ack.get("ok").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            Err(ForwardError::NotAcknowledged(ack))
        }
    }
}

/// Flattens a lead into the fixed sheet row. Missing values are empty strings.
pub fn build_sheet_row(lead: &Lead) -> Vec<String> {
    let payload = lead.payload_map();
    let mut row = vec![String::new(); SHEET_COLUMNS.len()];
    let mut consumed: HashSet<&str> = HashSet::new();

    row[0] = lead.created_at.to_rfc3339();
    row[1] = lead.source.clone();
    row[3] = lead.phone.clone();
    row[5] = lead.lead_type.clone();

    for (column, keys) in PAYLOAD_COLUMNS {
        consumed.extend(keys.iter().copied());
        if let Some(value) = keys.iter().find_map(|key| payload_get(&payload, key)) {
            row[*column] = value_to_text(value);
        }
    }

    row[EXTRA_COLUMN] = extra_cell(lead.area.as_deref(), &payload, &consumed);
    row
}

/// Compact JSON of the area plus every payload key no column consumed.
fn extra_cell(area: Option<&str>, payload: &LeadPayload, consumed: &HashSet<&str>) -> String {
    let mut extra = Map::new();
    if let Some(area) = area.filter(|a| !a.is_empty()) {
        extra.insert("area".to_string(), json!(area));
    }
    for (key, value) in payload {
        if !consumed.contains(key.as_str()) && !value.is_null() {
            extra.insert(key.clone(), value.clone());
        }
    }

    if extra.is_empty() {
        String::new()
    } else {
        Value::Object(extra).to_string()
    }
}
