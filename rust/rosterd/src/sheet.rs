//! Delimited-text spreadsheet codec: a header row naming the columns, then
//! one record per row. Quoted fields may hold commas, doubled quotes and newlines.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A single data row keyed by header name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    cells: HashMap<String, String>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.trim().to_string(), value.into());
    }

    /// Trimmed cell text; `None` for absent or blank cells.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

impl Sheet {
    pub fn keyed_rows(&self) -> Vec<SheetRow> {
        self.rows
            .iter()
            .map(|fields| {
                let mut row = SheetRow::new();
                for (i, header) in self.headers.iter().enumerate() {
                    if let Some(v) = fields.get(i) {
                        row.set(header, v.clone());
                    }
                }
                row
            })
            .collect()
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        push_record(&mut out, &self.headers);
        for row in &self.rows {
            push_record(&mut out, row);
        }
        out
    }
}

fn push_record(out: &mut String, fields: &[String]) {
    let line = fields
        .iter()
        .map(|f| csv_quote(f))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Always-quoted field, for exports whose consumers expect text columns in quotes.
pub fn csv_force_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Split CSV text into records. Blank lines outside quotes are skipped.
pub fn parse_csv_records(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records: Vec<Vec<String>> = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    buf.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                buf.push(ch);
            }
            continue;
        }
        match ch {
            '"' => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut buf)),
            '\r' => {}
            '\n' => {
                fields.push(std::mem::take(&mut buf));
                if !(fields.len() == 1 && fields[0].trim().is_empty()) {
                    records.push(std::mem::take(&mut fields));
                } else {
                    fields.clear();
                }
            }
            _ => buf.push(ch),
        }
    }
    if !buf.is_empty() || !fields.is_empty() {
        fields.push(buf);
        if !(fields.len() == 1 && fields[0].trim().is_empty()) {
            records.push(fields);
        }
    }
    records
}

/// First record is the header row. Empty input yields an empty sheet.
pub fn parse_sheet(text: &str) -> Sheet {
    let mut records = parse_csv_records(text).into_iter();
    let Some(headers) = records.next() else {
        return Sheet::default();
    };
    Sheet {
        headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
        rows: records.collect(),
    }
}
