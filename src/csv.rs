use std::collections::HashMap;

pub const LOCATION_HEADERS: [&str; 3] = ["Province", "District", "Municipality"];
pub const QUESTION_HEADERS: [&str; 7] = [
    "Question",
    "Option A",
    "Option B",
    "Option C",
    "Option D",
    "Correct Answer",
    "Marks",
];

/// One data line keyed by header label.
#[derive(Debug, Clone)]
pub struct CsvRow {
    fields: HashMap<String, String>,
}

impl CsvRow {
    pub fn get(&self, header: &str) -> Option<&str> {
        self.fields.get(header).map(|s| s.as_str())
    }

    /// First field whose header starts with `prefix`. The answer column is labelled
    /// `Correct Answer` or `Correct Answer (0-3)` depending on where the file came from.
    pub fn get_prefixed(&self, prefix: &str) -> Option<&str> {
        if let Some(v) = self.get(prefix) {
            return Some(v);
        }
        let mut keys = self
            .fields
            .keys()
            .filter(|k| k.starts_with(prefix))
            .collect::<Vec<_>>();
        keys.sort();
        keys.first().and_then(|k| self.get(k))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

impl CsvTable {
    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    pub fn has_header_prefix(&self, prefix: &str) -> bool {
        self.headers.iter().any(|h| h.starts_with(prefix))
    }

    pub fn missing_headers<'h>(&self, required: &[&'h str]) -> Vec<&'h str> {
        required
            .iter()
            .copied()
            .filter(|h| !self.has_header(h))
            .collect()
    }
}

/// First record is the header; blank lines are skipped.
pub fn parse_table(text: &str) -> CsvTable {
    let mut records = parse_records(text.trim_start_matches('\u{feff}')).into_iter();
    let Some(header_record) = records.next() else {
        return CsvTable::default();
    };
    let headers = header_record
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for values in records {
        let mut fields = HashMap::new();
        for (h, v) in headers.iter().zip(values) {
            if h.is_empty() {
                continue;
            }
            fields.entry(h.clone()).or_insert(v);
        }
        rows.push(CsvRow { fields });
    }

    CsvTable { headers, rows }
}

/// Splits `text` into records of fields. Commas and line breaks inside quotes are part of
/// the field; `""` inside quotes is a literal quote. Unquoted blank lines yield no record.
pub fn parse_records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut saw_quote = false;
    let mut chars = text.chars().peekable();

    let mut end_record = |record: &mut Vec<String>, field: &mut String, saw_quote: &mut bool| {
        record.push(std::mem::take(field));
        let blank = !*saw_quote && record.len() == 1 && record[0].trim().is_empty();
        let done = std::mem::take(record);
        if !blank {
            records.push(done);
        }
        *saw_quote = false;
    };

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => {
                quoted = !quoted;
                saw_quote = true;
            }
            ',' if !quoted => record.push(std::mem::take(&mut field)),
            '\r' if !quoted => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_record(&mut record, &mut field, &mut saw_quote);
            }
            '\n' if !quoted => end_record(&mut record, &mut field, &mut saw_quote),
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !record.is_empty() || saw_quote {
        end_record(&mut record, &mut field, &mut saw_quote);
    }
    records
}

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn render(headers: &[&str], rows: &[&[&str]]) -> String {
    let mut out = headers
        .iter()
        .map(|h| csv_quote(h))
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');
    for row in rows {
        out.push_str(
            &row.iter()
                .map(|v| csv_quote(v))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }
    out
}

pub fn location_sample_csv() -> String {
    render(
        &LOCATION_HEADERS,
        &[
            &["Bagmati Province", "Kathmandu", "Kathmandu Metropolitan City"],
            &["Bagmati Province", "Kathmandu", "Lalitpur Metropolitan City"],
            &["Gandaki Province", "Kaski", "Pokhara Metropolitan City"],
        ],
    )
}

pub fn question_sample_csv() -> String {
    render(
        &QUESTION_HEADERS,
        &[
            &[
                "What is the capital of Nepal?",
                "Kathmandu",
                "Pokhara",
                "Lalitpur",
                "Bhaktapur",
                "0",
                "1",
            ],
            &[
                "Which gas is most abundant in Earth's atmosphere?",
                "Oxygen",
                "Nitrogen",
                "Carbon Dioxide",
                "Hydrogen",
                "1",
                "2",
            ],
            &["What is 5 + 7?", "10", "11", "12", "13", "2", "1"],
        ],
    )
}
