use super::{ImportError, ImportSummary};
use crate::csv::CsvRow;
use crate::model::{total_points, QuestionRecord, QuestionSet, MAX_POINTS};
use std::num::IntErrorKind;
use crate::store::Store;
use tracing::{info, warn};

/// Raw question line as read from the upload; nothing is validated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRow {
    pub question: String,
    pub options: [String; 4],
    pub answer: String,
    pub points: String,
}

impl QuestionRow {
    pub fn from_csv(row: &CsvRow) -> Self {
        let field = |h: &str| row.get(h).unwrap_or("").trim().to_string();
        Self {
            question: field("Question"),
            options: [
                field("Option A"),
                field("Option B"),
                field("Option C"),
                field("Option D"),
            ],
            answer: row
                .get_prefixed("Correct Answer")
                .unwrap_or("")
                .trim()
                .to_string(),
            points: field("Marks"),
        }
    }

    /// `None` when the row is malformed: empty question or option text, an answer
    /// selector that is not an integer in `0..=3`, or points above `MAX_POINTS`.
    pub fn to_record(&self) -> Option<QuestionRecord> {
        if self.question.trim().is_empty() || self.options.iter().any(|o| o.trim().is_empty()) {
            return None;
        }
        let answer = parse_answer(&self.answer)?;
        Some(QuestionRecord {
            question: self.question.clone(),
            options: self.options.clone(),
            answer,
            points: parse_points(&self.points)?,
        })
    }
}

pub fn parse_answer(raw: &str) -> Option<u8> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| (0..=3).contains(n))
        .map(|n| n as u8)
}

/// Missing, unparseable and non-positive values all fall back to 1. `None` when the value
/// is above `MAX_POINTS`.
pub fn parse_points(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > MAX_POINTS => None,
        Ok(n) if n > 0 => Some(n),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => None,
        _ => Some(1),
    }
}

/// Picks the rows that would be appended to `set`, in input order.
///
/// Invalid rows are counted. Once the set is full the first further valid row marks the
/// result as truncated and everything after it is dropped uncounted.
pub fn plan_append(set: &QuestionSet, rows: &[QuestionRow]) -> (Vec<QuestionRecord>, ImportSummary) {
    let room = set.remaining_capacity();
    let mut accepted = Vec::new();
    let mut summary = ImportSummary::default();

    for row in rows {
        let Some(record) = row.to_record() else {
            summary.error_count += 1;
            continue;
        };
        if accepted.len() >= room {
            summary.truncated = true;
            break;
        }
        accepted.push(record);
    }

    summary.accepted_count = accepted.len();
    (accepted, summary)
}

/// Appends the valid rows to `set` and persists the result with one update.
///
/// The stored total is recomputed from the full resulting sequence. When the write fails
/// nothing from this run is committed.
pub fn import_questions<S: Store>(
    store: &mut S,
    set: &QuestionSet,
    rows: &[QuestionRow],
) -> Result<ImportSummary, ImportError> {
    let (accepted, summary) = plan_append(set, rows);
    if accepted.is_empty() {
        info!(set_id = %set.id, errors = summary.error_count, "question import added nothing");
        return Ok(summary);
    }

    let mut questions = Vec::with_capacity(set.questions.len() + accepted.len());
    questions.extend(set.questions.iter().cloned());
    questions.extend(accepted);
    let total = total_points(&questions);

    if let Err(source) = store.update_question_set(&set.id, &questions, total) {
        warn!(set_id = %set.id, error = %source, "question import write failed");
        return Err(ImportError::Store {
            completed_rows: 0,
            source,
        });
    }

    info!(
        set_id = %set.id,
        accepted = summary.accepted_count,
        errors = summary.error_count,
        truncated = summary.truncated,
        total_points = total,
        "question import finished"
    );
    Ok(summary)
}
