use crate::db;
use crate::error::StoreError;
use crate::model::{NamedNode, QuestionRecord, QuestionSet, SetKind, Tier};
use rusqlite::{params_from_iter, types::Value, Connection, OptionalExtension};
use uuid::Uuid;

/// Persistence collaborator used by the importers.
///
/// Every call is a synchronous request/response against the backing store. Writes are
/// visible to later reads immediately; nothing is batched.
pub trait Store {
    fn create_node(
        &mut self,
        tier: Tier,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<String, StoreError>;

    fn read_nodes(&self, tier: Tier) -> Result<Vec<NamedNode>, StoreError>;

    /// Removes the node and every descendant below it.
    fn delete_node(&mut self, tier: Tier, id: &str) -> Result<(), StoreError>;

    fn read_question_set(&self, id: &str) -> Result<Option<QuestionSet>, StoreError>;

    /// Replaces the question sequence and total of an existing set in place.
    fn update_question_set(
        &mut self,
        id: &str,
        questions: &[QuestionRecord],
        total_points: i64,
    ) -> Result<(), StoreError>;
}

const SET_COLUMNS: &str = "id, kind, name, class_name, subject, category, duration_minutes,
    declared_capacity, questions_json, total_points, created_at";

#[derive(Debug, Clone, Default)]
pub struct SetFilter {
    pub kind: Option<SetKind>,
    pub class_name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewQuestionSet {
    pub kind: SetKind,
    pub name: String,
    pub class_name: Option<String>,
    pub subject: Option<String>,
    pub category: Option<String>,
    pub duration_minutes: Option<i64>,
    pub declared_capacity: i64,
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn create_question_set(&mut self, set: &NewQuestionSet) -> Result<QuestionSet, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = db::now_timestamp();
        self.conn.execute(
            "INSERT INTO question_sets(id, kind, name, class_name, subject, category,
                duration_minutes, declared_capacity, questions_json, total_points, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?, '[]', 0, ?)",
            (
                &id,
                set.kind.as_str(),
                &set.name,
                &set.class_name,
                &set.subject,
                &set.category,
                set.duration_minutes,
                set.declared_capacity,
                &created_at,
            ),
        )?;
        Ok(QuestionSet {
            id,
            kind: set.kind,
            name: set.name.clone(),
            class_name: set.class_name.clone(),
            subject: set.subject.clone(),
            category: set.category.clone(),
            duration_minutes: set.duration_minutes,
            declared_capacity: set.declared_capacity,
            questions: Vec::new(),
            total_points: 0,
            created_at,
        })
    }

    /// Newest first.
    pub fn list_question_sets(&self, filter: &SetFilter) -> Result<Vec<QuestionSet>, StoreError> {
        let mut sql = format!("SELECT {} FROM question_sets WHERE 1 = 1", SET_COLUMNS);
        let mut binds: Vec<Value> = Vec::new();
        if let Some(kind) = filter.kind {
            sql.push_str(" AND kind = ?");
            binds.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(class_name) = filter.class_name.as_ref() {
            sql.push_str(" AND class_name = ?");
            binds.push(Value::Text(class_name.clone()));
        }
        if let Some(category) = filter.category.as_ref() {
            sql.push_str(" AND category = ?");
            binds.push(Value::Text(category.clone()));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(binds), raw_question_set)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(|(set, json)| decode_questions(set, &json)).collect()
    }

    pub fn delete_question_set(&mut self, id: &str) -> Result<(), StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM question_sets WHERE id = ?", [id])?;
        if n == 0 {
            return Err(StoreError::NotFound {
                kind: "question set",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

fn raw_question_set(r: &rusqlite::Row<'_>) -> rusqlite::Result<(QuestionSet, String)> {
    let kind: String = r.get(1)?;
    let set = QuestionSet {
        id: r.get(0)?,
        kind: SetKind::parse(&kind).unwrap_or(SetKind::SubjectTest),
        name: r.get(2)?,
        class_name: r.get(3)?,
        subject: r.get(4)?,
        category: r.get(5)?,
        duration_minutes: r.get(6)?,
        declared_capacity: r.get(7)?,
        questions: Vec::new(),
        total_points: r.get(9)?,
        created_at: r.get(10)?,
    };
    Ok((set, r.get(8)?))
}

fn decode_questions(mut set: QuestionSet, json: &str) -> Result<QuestionSet, StoreError> {
    set.questions = serde_json::from_str(json)?;
    Ok(set)
}

impl Store for SqliteStore<'_> {
    fn create_node(
        &mut self,
        tier: Tier,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let created_at = db::now_timestamp();
        match (tier.parent_column(), parent_id) {
            (None, _) => {
                let sql = format!(
                    "INSERT INTO {}(id, name, created_at) VALUES(?, ?, ?)",
                    tier.table()
                );
                self.conn.execute(&sql, (&id, name, &created_at))?;
            }
            (Some(col), Some(parent)) => {
                let sql = format!(
                    "INSERT INTO {}(id, name, {}, created_at) VALUES(?, ?, ?, ?)",
                    tier.table(),
                    col
                );
                self.conn.execute(&sql, (&id, name, parent, &created_at))?;
            }
            (Some(_), None) => return Err(StoreError::MissingParent(tier.as_str())),
        }
        Ok(id)
    }

    fn read_nodes(&self, tier: Tier) -> Result<Vec<NamedNode>, StoreError> {
        let sql = format!(
            "SELECT id, name, {} FROM {} ORDER BY rowid",
            tier.parent_column().unwrap_or("NULL"),
            tier.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let nodes = stmt
            .query_map([], |r| {
                Ok(NamedNode {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    parent_id: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    fn delete_node(&mut self, tier: Tier, id: &str) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        // Children first; there is no ON DELETE CASCADE.
        match tier {
            Tier::Province => {
                tx.execute(
                    "DELETE FROM municipalities
                     WHERE district_id IN (SELECT id FROM districts WHERE province_id = ?)",
                    [id],
                )?;
                tx.execute("DELETE FROM districts WHERE province_id = ?", [id])?;
            }
            Tier::District => {
                tx.execute("DELETE FROM municipalities WHERE district_id = ?", [id])?;
            }
            Tier::Municipality => {}
        }

        let sql = format!("DELETE FROM {} WHERE id = ?", tier.table());
        let n = tx.execute(&sql, [id])?;
        if n == 0 {
            tx.rollback()?;
            return Err(StoreError::NotFound {
                kind: tier.as_str(),
                id: id.to_string(),
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn read_question_set(&self, id: &str) -> Result<Option<QuestionSet>, StoreError> {
        let sql = format!("SELECT {} FROM question_sets WHERE id = ?", SET_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, [id], raw_question_set)
            .optional()?;
        raw.map(|(set, json)| decode_questions(set, &json)).transpose()
    }

    fn update_question_set(
        &mut self,
        id: &str,
        questions: &[QuestionRecord],
        total_points: i64,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(questions)?;
        let n = self.conn.execute(
            "UPDATE question_sets SET questions_json = ?, total_points = ? WHERE id = ?",
            (&json, total_points, id),
        )?;
        if n == 0 {
            return Err(StoreError::NotFound {
                kind: "question set",
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
