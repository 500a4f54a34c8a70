use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::error::{Error, Result};
use crate::phrase::{Formality, Phrase, PhraseId};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS phrases (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        prompt_text TEXT NOT NULL,
        target_text TEXT NOT NULL,
        target_pronunciation TEXT NOT NULL,
        literal_gloss TEXT,
        formality TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        last_reviewed_at INTEGER,
        next_due_at INTEGER NOT NULL,
        ease_factor REAL NOT NULL,
        interval_days REAL NOT NULL,
        repetition_count INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_phrases_next_due_at ON phrases(next_due_at);
    CREATE TABLE IF NOT EXISTS usage (
        day TEXT PRIMARY KEY,
        count INTEGER NOT NULL
    );
"#;

const SELECT_PHRASE: &str = r#"
    SELECT id, prompt_text, target_text, target_pronunciation, literal_gloss, formality,
           created_at, last_reviewed_at, next_due_at, ease_factor, interval_days, repetition_count
    FROM phrases
"#;

/// Phrase collection backed by SQLite, one row per phrase keyed by id.
#[derive(Debug)]
pub struct PhraseDb {
    conn: Connection,
}

impl PhraseDb {
    /// Opens (and creates if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn insert(&self, phrase: &Phrase) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO phrases
            (id, prompt_text, target_text, target_pronunciation, literal_gloss, formality,
             created_at, last_reviewed_at, next_due_at, ease_factor, interval_days, repetition_count)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                phrase.id.to_string(),
                phrase.prompt_text,
                phrase.target_text,
                phrase.target_pronunciation,
                phrase.literal_gloss,
                phrase.formality.to_string(),
                phrase.created_at.timestamp_millis(),
                phrase.last_reviewed_at.map(|t| t.timestamp_millis()),
                phrase.next_due_at.timestamp_millis(),
                phrase.ease_factor,
                phrase.interval_days,
                phrase.repetition_count,
            ],
        )?;
        info!("added phrase {}", phrase.id);
        Ok(())
    }

    /// Writes back the review metadata of one phrase
    pub fn save_review(&self, phrase: &Phrase) -> Result<()> {
        let updated = Self::update_review(&self.conn, phrase)?;
        if updated == 0 {
            return Err(Error::PhraseNotFound(phrase.id.to_string()));
        }
        Ok(())
    }

    /// Writes back review metadata for several phrases in one transaction
    pub fn save_reviews<'p, I>(&mut self, phrases: I) -> Result<()>
    where
        I: IntoIterator<Item = &'p Phrase>,
    {
        let tx = self.conn.transaction()?;
        for phrase in phrases {
            Self::update_review(&tx, phrase)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn update_review(conn: &Connection, phrase: &Phrase) -> Result<usize> {
        Ok(conn.execute(
            r#"
            UPDATE phrases
            SET last_reviewed_at = ?2, next_due_at = ?3, ease_factor = ?4,
                interval_days = ?5, repetition_count = ?6
            WHERE id = ?1
            "#,
            params![
                phrase.id.to_string(),
                phrase.last_reviewed_at.map(|t| t.timestamp_millis()),
                phrase.next_due_at.timestamp_millis(),
                phrase.ease_factor,
                phrase.interval_days,
                phrase.repetition_count,
            ],
        )?)
    }

    /// All phrases in creation order; this is the collection order used to
    /// break ties between equally due phrases.
    pub fn load_all(&self) -> Result<Vec<Phrase>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_PHRASE} ORDER BY created_at ASC, seq ASC"))?;
        let rows = stmt.query_map([], phrase_from_row)?;

        let mut phrases = Vec::new();
        for phrase in rows {
            phrases.push(phrase?);
        }
        Ok(phrases)
    }

    pub fn get(&self, id: &PhraseId) -> Result<Option<Phrase>> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_PHRASE} WHERE id = ?1"))?;
        Ok(stmt
            .query_row([id.to_string()], phrase_from_row)
            .optional()?)
    }

    /// Resolves an id or a unique id prefix, as typed on the command line
    pub fn resolve_prefix(&self, prefix: &str) -> Result<PhraseId> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(Error::PhraseNotFound(prefix));
        }
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM phrases WHERE id LIKE ?1 || '%' LIMIT 2")?;
        let ids = stmt
            .query_map([&prefix], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        match ids.as_slice() {
            [] => Err(Error::PhraseNotFound(prefix)),
            [only] => only
                .parse()
                .map_err(|_| Error::PhraseNotFound(only.clone())),
            _ => Err(Error::AmbiguousId(prefix)),
        }
    }

    pub fn delete(&self, id: &PhraseId) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM phrases WHERE id = ?1", [id.to_string()])?;
        if deleted == 0 {
            return Err(Error::PhraseNotFound(id.to_string()));
        }
        info!("deleted phrase {id}");
        Ok(())
    }

    /// Removes every phrase, returning how many were deleted
    pub fn delete_all(&self) -> Result<usize> {
        let deleted = self.conn.execute("DELETE FROM phrases", [])?;
        info!("deleted all {deleted} phrases");
        Ok(deleted)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM phrases", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of phrases created on `day` (`%Y-%m-%d`, local time)
    pub fn usage_on(&self, day: &str) -> Result<u32> {
        let count: Option<u32> = self
            .conn
            .query_row("SELECT count FROM usage WHERE day = ?1", [day], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// Increments the counter for `day`, dropping older days
    pub fn record_usage(&self, day: &str) -> Result<u32> {
        self.conn
            .execute("DELETE FROM usage WHERE day <> ?1", [day])?;
        self.conn.execute(
            r#"
            INSERT INTO usage (day, count) VALUES (?1, 1)
            ON CONFLICT(day) DO UPDATE SET count = count + 1
            "#,
            [day],
        )?;
        self.usage_on(day)
    }
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(idx, millis)
    })
}

fn phrase_from_row(row: &Row) -> rusqlite::Result<Phrase> {
    let id: String = row.get(0)?;
    let id = id.parse::<PhraseId>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let formality: String = row.get(5)?;
    let formality = Formality::from_str(&formality, false).map_err(|_| {
        rusqlite::Error::InvalidColumnType(5, "formality".to_string(), rusqlite::types::Type::Text)
    })?;
    let last_reviewed_at = match row.get::<_, Option<i64>>(7)? {
        Some(_) => Some(timestamp(row, 7)?),
        None => None,
    };

    Ok(Phrase {
        id,
        prompt_text: row.get(1)?,
        target_text: row.get(2)?,
        target_pronunciation: row.get(3)?,
        literal_gloss: row.get(4)?,
        formality,
        created_at: timestamp(row, 6)?,
        last_reviewed_at,
        next_due_at: timestamp(row, 8)?,
        ease_factor: row.get(9)?,
        interval_days: row.get(10)?,
        repetition_count: row.get(11)?,
    })
}
