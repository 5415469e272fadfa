//! Vehicle compatibility CSV import.
//!
//! Flow: tokenize -> resolve columns -> expand compound cells -> dedup ->
//! bulk insert. Bad rows are skipped; only an import that produces no rows
//! at all is reported as an error.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::csv_parser::{parse_csv, CsvRow};
use crate::db_storage::VehicleStore;
use crate::errors::AppError;
use crate::models::NewVehicle;

pub const NO_ROWS_MESSAGE: &str =
    "No valid rows found in CSV. Make sure the file has a header row and at least one data row.";
pub const NO_VEHICLES_MESSAGE: &str =
    "No valid vehicles to import. Check that the CSV has brand and model columns.";

/// Canonical import columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnField {
    Brand,
    Model,
    FuelType,
    Segment,
    CapacityAh,
}

/// Accepted headers per field, in priority order. Matching ignores case
/// and surrounding whitespace. The combined "Brand + Model" layouts sit at
/// the end of the model list so a plain model column wins when present.
const COLUMN_ALIASES: &[(ColumnField, &[&str])] = &[
    (
        ColumnField::Brand,
        &["brand", "make", "vehicle_make", "Vehicle Make", "manufacturer", "vehicle_brand", "Vehicle Brand"],
    ),
    (
        ColumnField::Model,
        &["model", "vehicle_model", "Vehicle Model", "brand_model", "Brand + Model", "Brand Model", "Brand & Model"],
    ),
    (
        ColumnField::FuelType,
        &["fuel_type", "fuel", "Fuel Type", "fueltype"],
    ),
    (
        ColumnField::Segment,
        &["segment", "vehicle_segment", "Vehicle Segment", "vehicle_type", "Vehicle Type", "category"],
    ),
    (
        ColumnField::CapacityAh,
        &["capacity_ah", "capacity", "ah", "Capacity (AH)", "Battery Capacity (AH)", "battery_capacity", "Battery AH"],
    ),
];

impl ColumnField {
    pub fn aliases(self) -> &'static [&'static str] {
        COLUMN_ALIASES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

/// Trimmed value of the first non-empty column matching one of the field's
/// aliases, or an empty string.
pub fn resolve_column(row: &CsvRow, field: ColumnField) -> String {
    for alias in field.aliases() {
        let wanted = alias.to_lowercase();
        let hit = row
            .iter()
            .filter(|(header, _)| header.trim().to_lowercase() == wanted)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty());
        if let Some(value) = hit {
            return value.to_string();
        }
    }
    String::new()
}

/// One model/fuel pair unpacked from a compound cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelVariant {
    pub model: String,
    pub fuel_type: String,
}

fn trailing_parenthetical() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)\s*\(([^()]*)\)$").unwrap())
}

/// Splits a cell such as `"AUDI A3 (Petrol & Diesel), AUDI A4 (Petrol)"`
/// into one entry per model.
pub fn expand_compound_cell(cell: &str, brand: &str) -> Vec<ModelVariant> {
    let variants: Vec<ModelVariant> = cell
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match trailing_parenthetical().captures(part) {
            Some(caps) => {
                let text = caps.get(1).map_or("", |m| m.as_str()).trim();
                let fuel = caps.get(2).map_or("", |m| m.as_str()).trim();
                ModelVariant {
                    model: strip_brand_prefix(text, brand),
                    fuel_type: fuel.to_string(),
                }
            }
            None => ModelVariant {
                model: strip_brand_prefix(part, brand),
                fuel_type: String::new(),
            },
        })
        .collect();

    let trimmed = cell.trim();
    if variants.is_empty() && !trimmed.is_empty() {
        return vec![ModelVariant {
            model: trimmed.to_string(),
            fuel_type: String::new(),
        }];
    }
    variants
}

/// Removes a leading, case-insensitive copy of the brand name. Falls back
/// to the original text when nothing would be left.
fn strip_brand_prefix(text: &str, brand: &str) -> String {
    let text = text.trim();
    if brand.is_empty() {
        return text.to_string();
    }
    let stripped = strip_prefix_ignore_case(text, brand)
        .map(str::trim)
        .unwrap_or(text);

    if stripped.is_empty() {
        text.to_string()
    } else {
        stripped.to_string()
    }
}

/// `str::strip_prefix` with per-character case folding.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for wanted in prefix.chars() {
        let (_, got) = chars.next()?;
        if !got.to_lowercase().eq(wanted.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or("", |(idx, _)| &text[idx..]))
}

const SEGMENTS: &[(&str, &str)] = &[
    ("CARS", "car"),
    ("CAR", "car"),
    ("SUV", "suv"),
    ("BIKES", "bike"),
    ("BIKE", "bike"),
    ("TRUCKS", "truck"),
    ("TRUCK", "truck"),
    ("MPV", "truck"),
    ("TRACTOR", "tractor"),
];

/// Maps a free-text segment label onto `car | suv | bike | truck | tractor`.
/// Unknown labels pass through lowercased.
pub fn normalize_segment(raw: &str) -> String {
    let key = raw.trim().to_uppercase();
    SEGMENTS
        .iter()
        .find(|(label, _)| *label == key)
        .map(|(_, segment)| segment.to_string())
        .unwrap_or_else(|| raw.trim().to_lowercase())
}

/// Digits-only amp-hour parse. Empty, zero and out-of-range values are `None`.
pub fn parse_capacity(raw: &str) -> Option<i32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse::<i32>().ok().filter(|ah| *ah > 0)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Turns parsed rows into deduplicated insert candidates.
///
/// Rows without a brand are dropped. Duplicates of `brand|model|fuel_type`
/// keep their first occurrence.
pub fn build_candidates(rows: &[CsvRow]) -> Vec<NewVehicle> {
    let mut candidates = Vec::new();

    for row in rows {
        let brand = resolve_column(row, ColumnField::Brand);
        if brand.is_empty() {
            continue;
        }

        let model_cell = resolve_column(row, ColumnField::Model);
        let row_fuel = resolve_column(row, ColumnField::FuelType);
        let segment = normalize_segment(&resolve_column(row, ColumnField::Segment));
        let capacity_ah = parse_capacity(&resolve_column(row, ColumnField::CapacityAh));

        if model_cell.contains(',') {
            for variant in expand_compound_cell(&model_cell, &brand) {
                if variant.model.is_empty() {
                    continue;
                }
                candidates.push(NewVehicle {
                    brand: brand.clone(),
                    model: variant.model,
                    fuel_type: non_empty(&variant.fuel_type).or_else(|| non_empty(&row_fuel)),
                    vehicle_segment: non_empty(&segment),
                    capacity_ah,
                });
            }
        } else if !model_cell.is_empty() {
            candidates.push(NewVehicle {
                brand,
                model: model_cell,
                fuel_type: non_empty(&row_fuel),
                vehicle_segment: non_empty(&segment),
                capacity_ah,
            });
        }
    }

    dedup_candidates(candidates)
}

fn dedup_candidates(candidates: Vec<NewVehicle>) -> Vec<NewVehicle> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| {
            let key = format!(
                "{}|{}|{}",
                c.brand,
                c.model,
                c.fuel_type.as_deref().unwrap_or("")
            );
            seen.insert(key)
        })
        .collect()
}

/// Outcome of one import call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows the store reports as inserted.
    pub imported: u64,
    /// Candidates sent to the store after deduplication.
    pub total: usize,
}

/// Imports a CSV document into the vehicle store as one batch.
///
/// Deduplication is per call only; rows already in the store are not
/// checked, so overlapping imports create duplicates.
pub async fn import_vehicles(
    store: &dyn VehicleStore,
    csv_text: &str,
) -> Result<ImportSummary, AppError> {
    let rows = parse_csv(csv_text);
    if rows.is_empty() {
        return Err(AppError::validation(NO_ROWS_MESSAGE));
    }

    let candidates = build_candidates(&rows);
    if candidates.is_empty() {
        tracing::info!("Vehicle import: {} rows, no usable vehicles", rows.len());
        return Err(AppError::validation(NO_VEHICLES_MESSAGE));
    }

    tracing::info!(
        "Vehicle import: {} rows -> {} candidates",
        rows.len(),
        candidates.len()
    );

    let imported = store.bulk_insert_vehicles(&candidates).await?;

    tracing::info!("✓ Imported {}/{} vehicles", imported, candidates.len());

    Ok(ImportSummary {
        imported,
        total: candidates.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        CsvRow::new(
            pairs
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn resolves_aliases_case_insensitively() {
        let r = row(&[("Vehicle Make", "AUDI"), ("VEHICLE_MODEL", "A3")]);
        assert_eq!(resolve_column(&r, ColumnField::Brand), "AUDI");
        assert_eq!(resolve_column(&r, ColumnField::Model), "A3");
        assert_eq!(resolve_column(&r, ColumnField::FuelType), "");
    }

    #[test]
    fn resolves_headers_with_spaces_and_parens() {
        let r = row(&[(" Battery Capacity (AH) ", "65 Ah"), ("Brand + Model", "Tata Nexon")]);
        assert_eq!(resolve_column(&r, ColumnField::CapacityAh), "65 Ah");
        assert_eq!(resolve_column(&r, ColumnField::Model), "Tata Nexon");
    }

    #[test]
    fn skips_empty_matches_for_later_aliases() {
        let r = row(&[("model", ""), ("Brand + Model", "A3 (Petrol)")]);
        assert_eq!(resolve_column(&r, ColumnField::Model), "A3 (Petrol)");
        let r = row(&[("model", "Nexon"), ("Brand + Model", "A3 (Petrol)")]);
        assert_eq!(resolve_column(&r, ColumnField::Model), "Nexon");
    }

    #[test]
    fn every_field_has_aliases() {
        for field in [
            ColumnField::Brand,
            ColumnField::Model,
            ColumnField::FuelType,
            ColumnField::Segment,
            ColumnField::CapacityAh,
        ] {
            assert!(!field.aliases().is_empty());
        }
    }

    #[test]
    fn expands_compound_cell_with_brand_prefix() {
        let variants = expand_compound_cell("AUDI A3 (Petrol & Diesel), AUDI A4 (Petrol)", "AUDI");
        assert_eq!(
            variants,
            vec![
                ModelVariant { model: "A3".into(), fuel_type: "Petrol & Diesel".into() },
                ModelVariant { model: "A4".into(), fuel_type: "Petrol".into() },
            ]
        );
    }

    #[test]
    fn brand_prefix_strip_is_case_insensitive() {
        let variants = expand_compound_cell("audi Q7 (Diesel), Audi Q3", "AUDI");
        assert_eq!(variants[0].model, "Q7");
        assert_eq!(variants[1], ModelVariant { model: "Q3".into(), fuel_type: String::new() });
    }

    #[test]
    fn bare_brand_keeps_original_text() {
        let variants = expand_compound_cell("AUDI (Petrol), TT", "AUDI");
        assert_eq!(variants[0], ModelVariant { model: "AUDI".into(), fuel_type: "Petrol".into() });
        assert_eq!(variants[1].model, "TT");
    }

    #[test]
    fn cell_without_parts_falls_back_to_whole_cell() {
        assert_eq!(
            expand_compound_cell(" , ", "Tata"),
            vec![ModelVariant { model: ",".into(), fuel_type: String::new() }]
        );
        assert!(expand_compound_cell("   ", "Tata").is_empty());
    }

    #[test]
    fn prefix_strip_handles_non_ascii_brands() {
        assert_eq!(strip_prefix_ignore_case("ŠKODA Octavia", "škoda"), Some(" Octavia"));
        assert_eq!(strip_prefix_ignore_case("Škoda", "ŠKODA"), Some(""));
        assert_eq!(strip_prefix_ignore_case("Sko", "Skoda"), None);
        assert_eq!(strip_brand_prefix("ŠKODA  Kushaq", "Škoda"), "Kushaq");
        assert_eq!(strip_brand_prefix("Tatanano", "Tata"), "nano");
    }

    #[test]
    fn brand_with_regex_metacharacters() {
        let variants = expand_compound_cell("C+ Mini (EV), C+ Max", "C+");
        assert_eq!(variants[0].model, "Mini");
        assert_eq!(variants[1].model, "Max");
    }

    #[test]
    fn normalizes_segments() {
        assert_eq!(normalize_segment("SUV"), "suv");
        assert_eq!(normalize_segment(" cars "), "car");
        assert_eq!(normalize_segment("Bikes"), "bike");
        assert_eq!(normalize_segment("MPV"), "truck");
        assert_eq!(normalize_segment("Tractor"), "tractor");
        assert_eq!(normalize_segment("Three Wheeler"), "three wheeler");
        assert_eq!(normalize_segment(""), "");
    }

    #[test]
    fn normalized_segment_is_stable() {
        for raw in ["CARS", "suv", "MPV", "Van", "", "e-Rickshaw"] {
            let once = normalize_segment(raw);
            assert_eq!(normalize_segment(&once), once);
            assert_eq!(normalize_segment(&once.to_uppercase()), once);
        }
    }

    #[test]
    fn parses_capacity_digits_only() {
        assert_eq!(parse_capacity("70"), Some(70));
        assert_eq!(parse_capacity("65 Ah"), Some(65));
        assert_eq!(parse_capacity(""), None);
        assert_eq!(parse_capacity("N/A"), None);
        assert_eq!(parse_capacity("0"), None);
        assert_eq!(parse_capacity("99999999999"), None);
    }

    #[test]
    fn builds_simple_candidate() {
        let rows = parse_csv("brand,model,fuel_type,segment,capacity_ah\nTata,Nexon,Petrol,SUV,70");
        let candidates = build_candidates(&rows);
        assert_eq!(
            candidates,
            vec![NewVehicle {
                brand: "Tata".into(),
                model: "Nexon".into(),
                fuel_type: Some("Petrol".into()),
                vehicle_segment: Some("suv".into()),
                capacity_ah: Some(70),
            }]
        );
    }

    #[test]
    fn compound_cell_uses_row_fuel_as_fallback() {
        let rows = parse_csv("brand,model,fuel\nKia,\"Seltos (Diesel), Sonet\",Petrol");
        let candidates = build_candidates(&rows);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].fuel_type.as_deref(), Some("Diesel"));
        assert_eq!(candidates[1].fuel_type.as_deref(), Some("Petrol"));
        assert_eq!(candidates[1].vehicle_segment, None);
    }

    #[test]
    fn single_model_cell_is_not_expanded() {
        let rows = parse_csv("Vehicle Make,Brand + Model\nAUDI,AUDI A6 (Petrol)");
        let candidates = build_candidates(&rows);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model, "AUDI A6 (Petrol)");
        assert_eq!(candidates[0].fuel_type, None);
    }

    #[test]
    fn rows_without_brand_or_model_are_dropped() {
        let rows = parse_csv("brand,model\n,Nexon\nTata,\nKia,Seltos");
        let candidates = build_candidates(&rows);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].brand, "Kia");
    }

    #[test]
    fn dedup_is_exact_and_first_wins() {
        let rows = parse_csv(
            "brand,model,fuel_type,capacity_ah\nTata,Nexon,Petrol,70\nTata,Nexon,Petrol,80\nTata,Nexon,Diesel,70\ntata,Nexon,Petrol,70",
        );
        let candidates = build_candidates(&rows);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].capacity_ah, Some(70));
    }
}
