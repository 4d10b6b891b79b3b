//! Database schema management.

use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS research_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    topic TEXT,
    status TEXT NOT NULL DEFAULT 'queued',
    created_at TEXT NOT NULL,
    completed_at TEXT,
    result_content TEXT,
    error_message TEXT,
    execution_time INTEGER,
    job_id TEXT
);

CREATE INDEX IF NOT EXISTS idx_research_results_created ON research_results(created_at);
CREATE INDEX IF NOT EXISTS idx_research_results_status ON research_results(status);
"#;
