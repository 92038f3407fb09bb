//! Flat tabular (CSV) encoding of canonical records.
//!
//! Every field is wrapped in double quotes and embedded quotes are doubled,
//! so any text survives a round trip through [`parse_line`].

use crate::models::CanonicalRecord;

/// Column order of `stations.csv`.
pub const HEADER: [&str; 12] = [
    "id", "name", "address", "city", "state", "zip", "county", "type", "phone", "latitude",
    "longitude", "status",
];

/// Quote one field.
pub fn encode_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quote and join one row.
pub fn encode_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| encode_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Cells of one record, in [`HEADER`] order.
pub fn record_fields(record: &CanonicalRecord) -> [String; 12] {
    let coordinate = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default();
    [
        record.id.clone(),
        record.name.clone(),
        record.address.clone(),
        record.city.clone(),
        record.state.clone(),
        record.zip.clone(),
        record.county.clone(),
        record.kind.clone(),
        record.phone.clone(),
        coordinate(record.latitude),
        coordinate(record.longitude),
        record.status.clone(),
    ]
}

/// Header row plus one row per record, newline-terminated.
pub fn to_csv(records: &[CanonicalRecord]) -> String {
    let mut out = encode_row(&HEADER);
    out.push('\n');
    for record in records {
        out.push_str(&encode_row(&record_fields(record)));
        out.push('\n');
    }
    out
}

/// Split one CSV row back into its fields.
///
/// Accepts quoted and bare fields; a doubled quote inside a quoted field
/// yields one literal quote.
pub fn parse_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
