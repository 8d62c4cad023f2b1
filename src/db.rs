use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "tayari.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    conn
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            faculty TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS faculties(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // Student accounts mirrored from sign-up. Blocking is a flag plus a status label.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT,
            class_name TEXT NOT NULL,
            faculty TEXT,
            blocked INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_class ON subjects(class_name)",
        [],
    )?;

    // Location hierarchy. Names are unique within the parent scope only.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS provinces(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS districts(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            province_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(province_id) REFERENCES provinces(id),
            UNIQUE(province_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS municipalities(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            district_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(district_id) REFERENCES districts(id),
            UNIQUE(district_id, name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_districts_province ON districts(province_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_municipalities_district ON municipalities(district_id)",
        [],
    )?;

    // Questions live inside their set as one JSON document so a set update is a single write.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS question_sets(
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            name TEXT NOT NULL,
            class_name TEXT,
            subject TEXT,
            category TEXT,
            duration_minutes INTEGER,
            declared_capacity INTEGER NOT NULL,
            questions_json TEXT NOT NULL DEFAULT '[]',
            total_points INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_question_sets_kind ON question_sets(kind)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS daily_mcqs(
            id TEXT PRIMARY KEY,
            class_name TEXT NOT NULL,
            question TEXT NOT NULL,
            options_json TEXT NOT NULL,
            answer INTEGER NOT NULL,
            points INTEGER NOT NULL DEFAULT 1,
            date TEXT NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_daily_mcqs_class ON daily_mcqs(class_name)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS notices(
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Calendar date in `YYYY-MM-DD`, UTC.
pub fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Accepts `YYYY-MM-DD` only.
pub fn parse_date_ymd(s: &str) -> Option<String> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn count_rows(conn: &Connection, table: &str) -> rusqlite::Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    conn.query_row(&sql, [], |r| r.get(0))
}
