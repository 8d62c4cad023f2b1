use serde::{Deserialize, Serialize};

/// Categories offered by the test-preparation screen.
pub const TEST_PREP_CATEGORIES: [&str; 5] = ["ioe", "loksewa", "cee", "sat", "other"];

/// Upper bound for a single question's points.
pub const MAX_POINTS: i64 = 1000;

/// One level of the Province > District > Municipality hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Province,
    District,
    Municipality,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Province, Tier::District, Tier::Municipality];

    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim().to_ascii_lowercase().as_str() {
            "province" | "provinces" => Some(Tier::Province),
            "district" | "districts" => Some(Tier::District),
            "municipality" | "municipalities" => Some(Tier::Municipality),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Province => "province",
            Tier::District => "district",
            Tier::Municipality => "municipality",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Tier::Province => "provinces",
            Tier::District => "districts",
            Tier::Municipality => "municipalities",
        }
    }

    /// Column holding the enclosing tier's id. Provinces are roots.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            Tier::Province => None,
            Tier::District => Some("province_id"),
            Tier::Municipality => Some("district_id"),
        }
    }

    pub fn parent(self) -> Option<Tier> {
        match self {
            Tier::Province => None,
            Tier::District => Some(Tier::Province),
            Tier::Municipality => Some(Tier::District),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedNode {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub options: [String; 4],
    pub answer: u8,
    pub points: i64,
}

impl QuestionRecord {
    /// Builds a record from an IPC `question` object:
    /// `{question, options: [4 strings], answer: 0..=3, points?}`.
    pub fn from_json(v: &serde_json::Value) -> Result<Self, String> {
        let Some(obj) = v.as_object() else {
            return Err("question must be an object".to_string());
        };
        let question = obj
            .get("question")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if question.is_empty() {
            return Err("question text must not be empty".to_string());
        }

        let options = obj
            .get("options")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "options must be an array of 4 strings".to_string())?;
        if options.len() != 4 {
            return Err("options must be an array of 4 strings".to_string());
        }
        let mut opts: [String; 4] = Default::default();
        for (slot, raw) in opts.iter_mut().zip(options) {
            let Some(s) = raw.as_str() else {
                return Err("options must be an array of 4 strings".to_string());
            };
            if s.trim().is_empty() {
                return Err("option text must not be empty".to_string());
            }
            *slot = s.to_string();
        }

        let answer = match obj.get("answer").and_then(|v| v.as_i64()) {
            Some(n) if (0..=3).contains(&n) => n as u8,
            _ => return Err("answer must be an integer in 0..=3".to_string()),
        };

        let points = match obj.get("points") {
            None => 1,
            Some(v) if v.is_null() => 1,
            Some(v) => match v.as_i64() {
                Some(n) if (1..=MAX_POINTS).contains(&n) => n,
                _ => return Err(format!("points must be an integer in 1..={}", MAX_POINTS)),
            },
        };

        Ok(Self {
            question,
            options: opts,
            answer,
            points,
        })
    }
}

/// Saturates instead of overflowing; points are capped at `MAX_POINTS` on the way in.
pub fn total_points(questions: &[QuestionRecord]) -> i64 {
    questions
        .iter()
        .fold(0i64, |acc, q| acc.saturating_add(q.points))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SetKind {
    /// MCQ bank test bound to a class and subject.
    SubjectTest,
    /// Entrance-exam style set bound to a category and a duration.
    TestPrep,
}

impl SetKind {
    pub fn parse(s: &str) -> Option<SetKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject_test" => Some(SetKind::SubjectTest),
            "test_prep" => Some(SetKind::TestPrep),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SetKind::SubjectTest => "subject_test",
            SetKind::TestPrep => "test_prep",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub id: String,
    pub kind: SetKind,
    pub name: String,
    pub class_name: Option<String>,
    pub subject: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<i64>,
    pub declared_capacity: i64,
    pub questions: Vec<QuestionRecord>,
    pub total_points: i64,
    pub created_at: String,
}

impl QuestionSet {
    pub fn remaining_capacity(&self) -> usize {
        let cap = usize::try_from(self.declared_capacity).unwrap_or(0);
        cap.saturating_sub(self.questions.len())
    }
}
