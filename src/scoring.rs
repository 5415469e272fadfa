//! Lead priority scoring.
//!
//! A fixed additive heuristic over the lead type, source and form payload.
//! Every rule adds points to a base of 50 and the sum is clamped to
//! `[0, 100]`.

use serde_json::Value;

use crate::models::{payload_get, value_to_text, LeadPayload};

pub const BASE_SCORE: i64 = 50;
pub const MIN_SCORE: i64 = 0;
pub const MAX_SCORE: i64 = 100;

const ENTERPRISE_BONUS: i64 = 25;
const HIGH_VA_BONUS: i64 = 10;
const HIGH_VA_THRESHOLD: f64 = 5000.0;

/// Load buckets, checked from the top.
const LOAD_BUCKETS: [(u64, i64); 3] = [(20_000, 20), (10_000, 15), (5_000, 10)];

/// Computes the priority score for a lead.
///
/// Pure and deterministic. `lead_type` and `source` are taken as raw strings
/// since the source tag is free text.
pub fn score_lead(lead_type: &str, source: &str, payload: &LeadPayload) -> i32 {
    let mut score = BASE_SCORE;

    if lead_type == "enterprise" || source == "enterprise" {
        score += ENTERPRISE_BONUS;
    }

    score += org_type_bonus(payload);
    score += load_bonus(load_number(payload));

    if recommended_va(payload).is_some_and(|va| va >= HIGH_VA_THRESHOLD) {
        score += HIGH_VA_BONUS;
    }

    score.clamp(MIN_SCORE, MAX_SCORE) as i32
}

fn org_type_bonus(payload: &LeadPayload) -> i64 {
    let org_type = payload_get(payload, "orgType")
        .map(value_to_text)
        .unwrap_or_default()
        .to_lowercase();

    match org_type.as_str() {
        "datacentre" => 20,
        "factory" => 15,
        "clinic" => 10,
        _ => 0,
    }
}

fn load_bonus(load: u64) -> i64 {
    LOAD_BUCKETS
        .iter()
        .find(|(threshold, _)| load >= *threshold)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}

/// Extracts the declared load as an integer by keeping only its digits.
///
/// Unit suffixes are not interpreted: `"2 kVA"` reads as `2`. Digit runs too
/// long for `u64` saturate rather than reading as zero.
pub fn load_number(payload: &LeadPayload) -> u64 {
    let raw = payload_get(payload, "loadEstimate")
        .or_else(|| payload_get(payload, "totalWatts"))
        .map(value_to_text)
        .unwrap_or_default();

    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u64>().unwrap_or(u64::MAX)
}

/// Numeric reading of `recommendedVa`, if it has one.
fn recommended_va(payload: &LeadPayload) -> Option<f64> {
    match payload_get(payload, "recommendedVa")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}
