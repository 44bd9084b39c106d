use crate::db::models::{Joke, Message, Role, Session};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection, Result as DbResult, Row};
use uuid::Uuid;

pub struct DbService;

// Timestamps are selected AS VARCHAR; DuckDB renders them without a zone.
fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return ts;
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

const MESSAGE_COLUMNS: &str = "id, session_id, role, content, CAST(created_at AS VARCHAR)";
const JOKE_COLUMNS: &str = "id, comedian, category, content, CAST(created_at AS VARCHAR)";

impl DbService {
    fn row_to_session(row: &Row) -> DbResult<Session> {
        Ok(Session {
            id: row.get(0)?,
            persona_id: row.get(1)?,
            created_at: parse_timestamp(&row.get::<_, String>(2)?),
            updated_at: parse_timestamp(&row.get::<_, String>(3)?),
        })
    }

    fn row_to_message(row: &Row) -> DbResult<Message> {
        Ok(Message {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            created_at: parse_timestamp(&row.get::<_, String>(4)?),
        })
    }

    fn row_to_joke(row: &Row) -> DbResult<Joke> {
        Ok(Joke {
            id: row.get(0)?,
            comedian: row.get(1)?,
            category: row.get(2)?,
            content: row.get(3)?,
            created_at: parse_timestamp(&row.get::<_, String>(4)?),
        })
    }

    // --- Session Operations ---

    pub fn insert_session(conn: &Connection, persona_id: &str) -> DbResult<Session> {
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO sessions (id, persona_id) VALUES (?, ?)",
            params![id, persona_id],
        )?;

        Self::get_session(conn, &id)?.ok_or(duckdb::Error::QueryReturnedNoRows)
    }

    pub fn get_session(conn: &Connection, id: &str) -> DbResult<Option<Session>> {
        let mut stmt = conn.prepare(
            "SELECT id, persona_id, CAST(created_at AS VARCHAR), CAST(updated_at AS VARCHAR) FROM sessions WHERE id = ?",
        )?;
        let mut rows = stmt.query_map(params![id], Self::row_to_session)?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    // --- Message Operations ---

    pub fn insert_message(conn: &Connection, session_id: &str, role: Role, content: &str) -> DbResult<Message> {
        conn.execute(
            "INSERT INTO messages (session_id, role, content) VALUES (?, ?, ?)",
            params![session_id, role.as_str(), content],
        )?;

        conn.execute(
            "UPDATE sessions SET updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![session_id],
        )?;

        // Callers hold the connection lock, so the newest row for the session is ours
        conn.query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_id = ? ORDER BY id DESC LIMIT 1"),
            params![session_id],
            Self::row_to_message,
        )
    }

    /// The newest `limit` messages of a session, returned oldest first.
    pub fn recent_messages(conn: &Connection, session_id: &str, limit: usize) -> DbResult<Vec<Message>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM (
                SELECT * FROM messages WHERE session_id = ? ORDER BY id DESC LIMIT ?
             ) ORDER BY id ASC"
        ))?;

        // DuckDB rejects a negative LIMIT, so oversized values saturate
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![session_id, limit], Self::row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    // --- Joke Operations ---

    pub fn find_joke(conn: &Connection, comedian: &str, category: &str) -> DbResult<Option<Joke>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {JOKE_COLUMNS} FROM jokes WHERE comedian = ? AND category = ? LIMIT 1"
        ))?;
        let mut rows = stmt.query_map(params![comedian, category], Self::row_to_joke)?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn insert_joke(conn: &Connection, comedian: &str, category: &str, content: &str) -> DbResult<Joke> {
        conn.execute(
            "INSERT INTO jokes (comedian, category, content) VALUES (?, ?, ?)",
            params![comedian, category, content],
        )?;

        conn.query_row(
            &format!("SELECT {JOKE_COLUMNS} FROM jokes ORDER BY id DESC LIMIT 1"),
            [],
            Self::row_to_joke,
        )
    }

    pub fn count_jokes(conn: &Connection, comedian: &str, category: &str) -> DbResult<usize> {
        conn.query_row(
            "SELECT COUNT(*) FROM jokes WHERE comedian = ? AND category = ?",
            params![comedian, category],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as usize)
    }
}
