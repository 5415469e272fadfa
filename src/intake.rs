//! Lead intake: validate -> score -> persist -> forward.
//!
//! Validation runs before any I/O. The sheet forward happens only after the
//! lead is stored, and its outcome never reaches the caller.

use serde_json::Value;
use uuid::Uuid;

use crate::db_storage::LeadStore;
use crate::errors::AppError;
use crate::models::{LeadPayload, LeadSubmission, LeadType, NewLead};
use crate::obs::phone_fingerprint;
use crate::scoring::score_lead;
use crate::sheets_client::SheetForwarder;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing required fields: phone, type";
pub const INVALID_TYPE_MESSAGE: &str = "Invalid lead type";
pub const THANK_YOU_MESSAGE: &str = "Thank you! Our team will contact you shortly.";

/// What happened to a submission that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Stored as a new lead.
    Accepted {
        lead_id: Uuid,
        score: i32,
        forwarded: bool,
    },
    /// Bot trap tripped. Reported to the client as a success, nothing stored.
    Honeypot,
}

/// Canonical, validated form of a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLead {
    pub phone: String,
    pub area: Option<String>,
    pub lead_type: LeadType,
    pub source: String,
    pub payload: LeadPayload,
}

/// True when the hidden `website` field was filled in.
pub fn is_honeypot(submission: &LeadSubmission) -> bool {
    submission
        .website
        .as_deref()
        .is_some_and(|w| !w.is_empty())
}

/// Checks required fields and the type whitelist, then maps the submission
/// onto one row shape. Values are taken as sent: the type must match a
/// whitelist entry exactly. `source` defaults to the type; a missing or
/// non-object payload reads as empty.
pub fn normalize_submission(submission: LeadSubmission) -> Result<NormalizedLead, AppError> {
    let phone = submission.phone.filter(|p| !p.is_empty());
    let raw_type = submission.lead_type.filter(|t| !t.is_empty());

    let (Some(phone), Some(raw_type)) = (phone, raw_type) else {
        return Err(AppError::validation(MISSING_FIELDS_MESSAGE));
    };

    let lead_type = raw_type
        .parse::<LeadType>()
        .map_err(|_| AppError::validation(INVALID_TYPE_MESSAGE))?;

    let source = submission
        .source
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| lead_type.as_str().to_string());

    let payload = match submission.payload {
        Some(Value::Object(map)) => map,
        _ => LeadPayload::new(),
    };

    Ok(NormalizedLead {
        phone,
        area: submission.area.filter(|a| !a.trim().is_empty()),
        lead_type,
        source,
        payload,
    })
}

/// Runs one submission through the pipeline.
pub async fn submit_lead(
    store: &dyn LeadStore,
    forwarder: &SheetForwarder,
    submission: LeadSubmission,
) -> Result<IntakeOutcome, AppError> {
    if is_honeypot(&submission) {
        tracing::debug!("Honeypot tripped, discarding submission");
        return Ok(IntakeOutcome::Honeypot);
    }

    let lead = normalize_submission(submission)?;
    let score = score_lead(lead.lead_type.as_str(), &lead.source, &lead.payload);

    tracing::info!(
        "📨 Lead received: type={}, source={}, phone=#{}, score={}",
        lead.lead_type,
        lead.source,
        phone_fingerprint(&lead.phone),
        score
    );

    let stored = store
        .insert_lead(NewLead {
            phone: lead.phone,
            area: lead.area,
            lead_type: lead.lead_type,
            source: lead.source,
            payload: lead.payload,
            score,
        })
        .await?;

    tracing::info!("✓ Lead {} stored", stored.id);

    let forwarded = forwarder.forward(&stored).await;

    Ok(IntakeOutcome::Accepted {
        lead_id: stored.id,
        score: stored.score,
        forwarded,
    })
}
