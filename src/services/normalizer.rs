// src/services/normalizer.rs

//! Schema-tolerant mapping from provider features to canonical records.
//!
//! The primary and mirror providers do not agree on attribute names, so each
//! canonical field is filled from the first non-blank attribute in a
//! preference chain. Normalization never fails; missing data falls back to
//! the record defaults.

use std::collections::HashSet;

use serde_json::Value;

use crate::models::{CanonicalRecord, DEFAULT_STATUS, Geometry, RawFeature, UNKNOWN_NAME};

const ID_KEYS: &[&str] = &["OBJECTID", "FID", "OBJECTID_1"];
const NAME_KEYS: &[&str] = &["NAME", "STATION_NAME"];
const ADDRESS_KEYS: &[&str] = &["ADDRESS", "ADDRESS1", "STREET"];
const CITY_KEYS: &[&str] = &["CITY"];
const STATE_KEYS: &[&str] = &["STATE", "ST"];
const ZIP_KEYS: &[&str] = &["ZIP", "ZIPCODE", "ZIP_CODE"];
const COUNTY_KEYS: &[&str] = &["COUNTY"];
const TYPE_KEYS: &[&str] = &["TYPE", "FACILITY_TYPE", "FTYPE"];
const PHONE_KEYS: &[&str] = &["TELEPHONE", "PHONE"];
const LATITUDE_KEYS: &[&str] = &["LATITUDE", "LAT"];
const LONGITUDE_KEYS: &[&str] = &["LONGITUDE", "LON"];
const STATUS_KEYS: &[&str] = &["STATUS"];

/// Map one provider feature to a canonical record.
pub fn normalize(feature: &RawFeature) -> CanonicalRecord {
    CanonicalRecord {
        id: text(feature, ID_KEYS).unwrap_or_default(),
        name: text(feature, NAME_KEYS).unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        address: text(feature, ADDRESS_KEYS).unwrap_or_default(),
        city: text(feature, CITY_KEYS).unwrap_or_default(),
        state: text(feature, STATE_KEYS).unwrap_or_default(),
        zip: text(feature, ZIP_KEYS).unwrap_or_default(),
        county: text(feature, COUNTY_KEYS).unwrap_or_default(),
        kind: text(feature, TYPE_KEYS).unwrap_or_default(),
        phone: text(feature, PHONE_KEYS).unwrap_or_default(),
        latitude: coordinate(feature, |g| g.y, LATITUDE_KEYS),
        longitude: coordinate(feature, |g| g.x, LONGITUDE_KEYS),
        status: text(feature, STATUS_KEYS).unwrap_or_else(|| DEFAULT_STATUS.to_string()),
    }
}

/// Normalize a whole download, consuming the raw features.
///
/// Later records repeating an earlier non-empty `id` are dropped, so ids stay
/// unique within the run even if the layer shifted while it was paged.
pub fn normalize_all(features: Vec<RawFeature>) -> Vec<CanonicalRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(features.len());
    let mut duplicates = 0usize;

    for feature in features {
        let record = normalize(&feature);
        if !record.id.is_empty() && !seen.insert(record.id.clone()) {
            duplicates += 1;
            continue;
        }
        records.push(record);
    }

    if duplicates > 0 {
        log::warn!("Dropped {} record(s) with duplicate ids", duplicates);
    }
    records
}

fn text(feature: &RawFeature, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| feature.attribute(key))
        .find_map(value_text)
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coordinate(
    feature: &RawFeature,
    from_geometry: fn(&Geometry) -> f64,
    keys: &[&str],
) -> Option<f64> {
    feature
        .geometry
        .as_ref()
        .map(from_geometry)
        .filter(|v| v.is_finite())
        .or_else(|| {
            keys.iter()
                .filter_map(|key| feature.attribute(key))
                .find_map(value_number)
        })
}

fn value_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}
