use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Type-specific lead fields, keyed by the form field name.
pub type LeadPayload = Map<String, Value>;

// ============ Enumerations ============

/// The form a lead originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadType {
    BatteryFinder,
    UpsProposal,
    SolarEnquiry,
    Contact,
    Enterprise,
}

impl LeadType {
    pub const ALL: [LeadType; 5] = [
        LeadType::BatteryFinder,
        LeadType::UpsProposal,
        LeadType::SolarEnquiry,
        LeadType::Contact,
        LeadType::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadType::BatteryFinder => "battery_finder",
            LeadType::UpsProposal => "ups_proposal",
            LeadType::SolarEnquiry => "solar_enquiry",
            LeadType::Contact => "contact",
            LeadType::Enterprise => "enterprise",
        }
    }
}

impl FromStr for LeadType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for LeadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-managed follow-up state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Closed,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Closed => "closed",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "closed" => Ok(LeadStatus::Closed),
            _ => Err(()),
        }
    }
}

// ============ Database Models ============

/// A prospective-customer inquiry captured from one of the site forms.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    pub phone: String,
    pub area: Option<String>,
    /// One of the `LeadType` values, stored as text.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub lead_type: String,
    pub source: String,
    pub payload: Value,
    pub score: i32,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// The payload as a map; non-object payloads read as empty.
    pub fn payload_map(&self) -> LeadPayload {
        match &self.payload {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        }
    }
}

/// A scored lead ready to be persisted.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub phone: String,
    pub area: Option<String>,
    pub lead_type: LeadType,
    pub source: String,
    pub payload: LeadPayload,
    pub score: i32,
}

/// Operator revision of an existing lead. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    pub notes: Option<String>,
    pub score: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub lead_type: Option<LeadType>,
    pub limit: i64,
}

/// Which battery fits which vehicle.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCompatibility {
    pub id: Uuid,
    pub brand: String,
    pub model: String,
    pub fuel_type: Option<String>,
    pub vehicle_segment: Option<String>,
    pub capacity_ah: Option<i32>,
    pub battery_group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Candidate vehicle row produced by the CSV import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewVehicle {
    pub brand: String,
    pub model: String,
    pub fuel_type: Option<String>,
    pub vehicle_segment: Option<String>,
    pub capacity_ah: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct VehicleFilter {
    pub brand: Option<String>,
    pub limit: i64,
}

// ============ API Request/Response Models ============

/// Body of `POST /api/v1/leads`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadSubmission {
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub area: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub lead_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    pub payload: Option<Value>,
    /// Honeypot field, hidden from humans.
    #[serde(default, deserialize_with = "lenient_text")]
    pub website: Option<String>,
}

/// Reads any JSON value as text so `"phone": 9876543210` and
/// `"phone": "9876543210"` land the same. Null reads as absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_null()).map(|v| value_to_text(&v)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeadSubmissionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LeadListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub lead_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LeadUpdateRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
    pub score: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VehicleListQuery {
    pub brand: Option<String>,
    pub limit: Option<i64>,
}

/// JSON form of the vehicle import body.
#[derive(Debug, Deserialize)]
pub struct CsvImportBody {
    pub csv: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: u64,
    pub total: usize,
}

// ============ Payload helpers ============

/// Renders a payload value as display text.
///
/// Whole floats drop the trailing `.0` so `25000.0` reads as `25000`.
/// Null renders as an empty string; arrays and objects as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_f64() {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                        format!("{}", f as i64)
                    }
                    _ => n.to_string(),
                }
            } else {
                n.to_string()
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Looks up a payload key, treating JSON null as absent.
pub fn payload_get<'a>(payload: &'a LeadPayload, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|v| !v.is_null())
}
