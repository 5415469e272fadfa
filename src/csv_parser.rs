//! Parse CSV text (comma-separated values with a header row).
//!
//! The tokenizer is deliberately small:
//! - records end at `\n` (a preceding `\r` is dropped) unless a quote is open;
//! - a `"` toggles the quoted state and is never part of the value, so a
//!   doubled `""` is *not* unescaped to a single quote;
//! - every field is trimmed;
//! - blank lines are ignored.
//!
//! With fewer than two records (a header and at least one data row) the
//! result is empty.

/// One data row: header/value pairs in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRow {
    fields: Vec<(String, String)>,
}

impl CsvRow {
    pub fn new(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }

    /// Value of the first column whose header is exactly `header`.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Header/value pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn parse_csv(text: &str) -> Vec<CsvRow> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = split_records(text).into_iter().filter(|r| !is_blank(r));

    let Some(headers) = records.next() else {
        return Vec::new();
    };

    records
        .map(|values| {
            let fields = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), values.get(i).cloned().unwrap_or_default()))
                .collect();
            CsvRow::new(fields)
        })
        .collect()
}

fn is_blank(record: &[String]) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn split_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in text.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(take_field(&mut current)),
            '\n' if !in_quotes => {
                if current.ends_with('\r') {
                    current.pop();
                }
                fields.push(take_field(&mut current));
                records.push(std::mem::take(&mut fields));
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() || !fields.is_empty() {
        fields.push(take_field(&mut current));
        records.push(fields);
    }

    records
}

fn take_field(current: &mut String) -> String {
    let value = current.trim().to_string();
    current.clear();
    value
}
